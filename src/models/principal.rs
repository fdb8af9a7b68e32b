// src/models/principal.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'admins' table. Maintainers share the same shape in their
/// own table; both are distinct principal types from students.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    #[serde(skip)]
    pub password: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'maintainers' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Maintainer {
    pub id: i64,
    pub username: String,
    #[serde(skip)]
    pub password: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for admin and maintainer logins, and for the superadmin env check.
#[derive(Debug, Deserialize, Validate)]
pub struct PrincipalLoginRequest {
    #[validate(length(min = 1, max = 100))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for creating an admin or maintainer account (superadmin only).
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePrincipalRequest {
    #[validate(length(
        min = 3,
        max = 100,
        message = "Username length must be between 3 and 100 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password length must be between 8 and 128 characters."
    ))]
    pub password: String,
}
