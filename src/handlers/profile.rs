// src/handlers/profile.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        document::{DocumentCategory, RegisterDocumentRequest, UploadedDocument},
        user::{MeResponse, UpdateProfileRequest},
    },
    utils::jwt::{Claims, ROLE_USER},
};

/// Resolves the claims to a students-table id.
///
/// Admin and maintainer ids come from their own tables; letting them through
/// here would read whichever student happens to share the numeric id.
fn student_id(claims: &Claims) -> Result<i64, AppError> {
    if claims.role != ROLE_USER {
        return Err(AppError::Forbidden(
            "Only student accounts have a profile".to_string(),
        ));
    }
    claims.principal_id()
}

/// Get the current user's profile.
pub async fn get_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = student_id(&claims)?;

    let me = sqlx::query_as::<_, MeResponse>(
        "SELECT id, name, email, mobile, school, rollno, branch, address, created_at
         FROM users
         WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(me))
}

/// Updates profile fields. Fields are optional; present ones are applied
/// one at a time.
pub async fn update_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = student_id(&claims)?;

    // Check existence
    sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    if let Some(name) = payload.name {
        sqlx::query("UPDATE users SET name = $1, updated_at = NOW() WHERE id = $2")
            .bind(name)
            .bind(user_id)
            .execute(&pool)
            .await?;
    }

    if let Some(mobile) = payload.mobile {
        sqlx::query("UPDATE users SET mobile = $1, updated_at = NOW() WHERE id = $2")
            .bind(mobile)
            .bind(user_id)
            .execute(&pool)
            .await
            .map_err(|e| {
                if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
                    AppError::Conflict("Mobile number already in use".to_string())
                } else {
                    AppError::from(e)
                }
            })?;
    }

    if let Some(school) = payload.school {
        sqlx::query("UPDATE users SET school = $1, updated_at = NOW() WHERE id = $2")
            .bind(school)
            .bind(user_id)
            .execute(&pool)
            .await?;
    }

    if let Some(rollno) = payload.rollno {
        sqlx::query("UPDATE users SET rollno = $1, updated_at = NOW() WHERE id = $2")
            .bind(rollno)
            .bind(user_id)
            .execute(&pool)
            .await?;
    }

    if let Some(branch) = payload.branch {
        sqlx::query("UPDATE users SET branch = $1, updated_at = NOW() WHERE id = $2")
            .bind(branch)
            .bind(user_id)
            .execute(&pool)
            .await?;
    }

    if let Some(address) = payload.address {
        sqlx::query("UPDATE users SET address = $1, updated_at = NOW() WHERE id = $2")
            .bind(address)
            .bind(user_id)
            .execute(&pool)
            .await?;
    }

    Ok(StatusCode::OK)
}

/// Registers an uploaded document's object-storage metadata for the current
/// user. The document-type label is classified by substring match; the byte
/// transfer itself happens outside this service.
pub async fn register_document(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<RegisterDocumentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = student_id(&claims)?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let category = DocumentCategory::classify(&payload.document_type);

    let document = sqlx::query_as::<_, UploadedDocument>(
        "INSERT INTO upload_files
             (user_id, document_type, category, file_url, file_name, file_key,
              file_size, mime_type)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING id, user_id, document_type, category, file_url, file_name, file_key,
                   file_size, mime_type, verified, rejected, rejection_reason, created_at",
    )
    .bind(user_id)
    .bind(&payload.document_type)
    .bind(category.as_str())
    .bind(&payload.file_url)
    .bind(&payload.file_name)
    .bind(&payload.file_key)
    .bind(payload.file_size)
    .bind(&payload.mime_type)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to register document: {:?}", e);
        AppError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(document)))
}

/// Lists the current user's documents with their verification state.
pub async fn list_my_documents(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = student_id(&claims)?;

    let documents = sqlx::query_as::<_, UploadedDocument>(
        "SELECT id, user_id, document_type, category, file_url, file_name, file_key,
                file_size, mime_type, verified, rejected, rejection_reason, created_at
         FROM upload_files
         WHERE user_id = $1
         ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(documents))
}
