// src/handlers/super_admin.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::principal::CreatePrincipalRequest,
    utils::hash::hash_password,
};

async fn create_principal(
    pool: &PgPool,
    table: &str,
    payload: &CreatePrincipalRequest,
) -> Result<i64, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    // `table` is one of two compile-time constants, never client input.
    sqlx::query_scalar::<_, i64>(&format!(
        "INSERT INTO {table} (username, password) VALUES ($1, $2) RETURNING id"
    ))
    .bind(&payload.username)
    .bind(&hashed_password)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict(format!("Username '{}' already exists", payload.username))
        } else {
            tracing::error!("Failed to create {}: {:?}", table, e);
            AppError::from(e)
        }
    })
}

/// Creates an admin account.
/// Superadmin only.
pub async fn create_admin(
    State(pool): State<PgPool>,
    Json(payload): Json<CreatePrincipalRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = create_principal(&pool, "admins", &payload).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Creates a maintainer account.
/// Superadmin only.
pub async fn create_maintainer(
    State(pool): State<PgPool>,
    Json(payload): Json<CreatePrincipalRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = create_principal(&pool, "maintainers", &payload).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Lists maintainer usernames.
/// Superadmin only.
pub async fn list_maintainers(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let usernames =
        sqlx::query_scalar::<_, String>("SELECT username FROM maintainers ORDER BY username")
            .fetch_all(&pool)
            .await?;

    Ok(Json(serde_json::json!({ "maintainers": usernames })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetSubmissionsRequest {
    #[validate(email(message = "Email is required to reset user submissions"))]
    pub email: String,
}

/// Wipes a user's submission ledger so they can retake the quiz.
/// Superadmin only.
pub async fn reset_user_submissions(
    State(pool): State<PgPool>,
    Json(payload): Json<ResetSubmissionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let result = sqlx::query("DELETE FROM user_submissions WHERE user_id = $1")
        .bind(user_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to reset submissions: {:?}", e);
            AppError::from(e)
        })?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!(
            "Successfully reset {} submissions for {}",
            result.rows_affected(),
            payload.email
        )
    })))
}
