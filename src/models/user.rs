// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    pub name: String,

    /// Unique student email, used as the login identifier.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// Unique mobile number.
    pub mobile: String,

    pub school: String,
    pub rollno: String,
    pub branch: String,
    pub address: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Profile data returned to the current user.
#[derive(Debug, Serialize, FromRow)]
pub struct MeResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub school: String,
    pub rollno: String,
    pub branch: String,
    pub address: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Roster entry for the admin user list (no password hash).
#[derive(Debug, Serialize, FromRow)]
pub struct UserListItem {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub school: String,
    pub rollno: String,
    pub branch: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for student registration.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters."
    ))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email address."))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password length must be between 8 and 128 characters."
    ))]
    pub password: String,
    #[validate(length(
        min = 10,
        max = 15,
        message = "Mobile number must be between 10 and 15 digits."
    ))]
    pub mobile: String,
    #[validate(length(min = 1, max = 100))]
    pub school: String,
    #[validate(length(min = 1, max = 50))]
    pub rollno: String,
    #[validate(length(min = 1, max = 100))]
    pub branch: String,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for partial profile updates. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub school: Option<String>,
    pub rollno: Option<String>,
    pub branch: Option<String>,
    pub address: Option<String>,
}

/// DTO for requesting a password reset token.
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

/// DTO for completing a password reset.
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub token: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}
