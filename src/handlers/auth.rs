// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, http::header, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::{Config, RESET_TOKEN_TTL_SECS},
    error::AppError,
    models::{
        principal::{Admin, Maintainer, PrincipalLoginRequest},
        user::{
            ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, User,
        },
    },
    utils::{
        hash::{hash_password, verify_password},
        jwt::{
            Claims, PURPOSE_PASSWORD_RESET, ROLE_ADMIN, ROLE_MAINTAINER, ROLE_SUPERADMIN,
            ROLE_USER, session_cookie, sign_jwt, verify_jwt,
        },
        notify::SharedNotifier,
    },
};

/// Registers a new student.
///
/// Hashes the password with Argon2 before storing it.
/// Returns 201 Created and the user object (password hash excluded).
pub async fn register(
    State(pool): State<PgPool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (name, email, password, mobile, school, rollno, branch, address)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING id, name, email, password, mobile, school, rollno, branch, address,
                   created_at, updated_at",
    )
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&hashed_password)
    .bind(&payload.mobile)
    .bind(&payload.school)
    .bind(&payload.rollno)
    .bind(&payload.branch)
    .bind(&payload.address)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        // Postgres error code for unique violation is 23505
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict("A user with this email or mobile already exists".to_string())
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a student and issues a session token.
///
/// The token carries role and profile claims and is returned both in the
/// body and as an HTTP-only 'token' cookie.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT id, name, email, password, mobile, school, rollno, branch, address,
                created_at, updated_at
         FROM users
         WHERE email = $1",
    )
    .bind(&payload.email)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::from(e)
    })?
    .ok_or(AppError::AuthError("User not found".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Invalid password".to_string()));
    }

    let claims = Claims::new(user.id, ROLE_USER, config.jwt_expiration)?
        .with_profile(&user.name, &user.email);
    let token = sign_jwt(&claims, &config.jwt_secret)?;
    let cookie = session_cookie(&token, &config);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "token": token,
            "type": "Bearer",
            "role": ROLE_USER,
        })),
    ))
}

/// Authenticates an admin against the 'admins' table.
pub async fn admin_login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<PrincipalLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let admin = sqlx::query_as::<_, Admin>(
        "SELECT id, username, password, created_at FROM admins WHERE username = $1",
    )
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::AuthError("Admin not found".to_string()))?;

    if !verify_password(&payload.password, &admin.password)? {
        return Err(AppError::AuthError("Invalid password".to_string()));
    }

    let claims = Claims::new(admin.id, ROLE_ADMIN, config.jwt_expiration)?;
    let token = sign_jwt(&claims, &config.jwt_secret)?;
    let cookie = session_cookie(&token, &config);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "token": token,
            "type": "Bearer",
            "role": ROLE_ADMIN,
        })),
    ))
}

/// Authenticates a maintainer against the 'maintainers' table.
pub async fn maintainer_login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<PrincipalLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let maintainer = sqlx::query_as::<_, Maintainer>(
        "SELECT id, username, password, created_at FROM maintainers WHERE username = $1",
    )
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::AuthError("Maintainer not found".to_string()))?;

    if !verify_password(&payload.password, &maintainer.password)? {
        return Err(AppError::AuthError("Invalid password".to_string()));
    }

    let claims = Claims::new(maintainer.id, ROLE_MAINTAINER, config.jwt_expiration)?;
    let token = sign_jwt(&claims, &config.jwt_secret)?;
    let cookie = session_cookie(&token, &config);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "token": token,
            "type": "Bearer",
            "role": ROLE_MAINTAINER,
        })),
    ))
}

/// Authenticates the superadmin against static environment credentials.
/// There is no superadmin row in the database.
pub async fn super_admin_login(
    State(config): State<Config>,
    Json(payload): Json<PrincipalLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (expected_user, expected_pass) = match (
        &config.super_admin_username,
        &config.super_admin_password,
    ) {
        (Some(u), Some(p)) => (u, p),
        _ => {
            return Err(AppError::AuthError(
                "Superadmin login is not configured".to_string(),
            ));
        }
    };

    if &payload.username != expected_user || &payload.password != expected_pass {
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let claims = Claims::new(0, ROLE_SUPERADMIN, config.jwt_expiration)?;
    let token = sign_jwt(&claims, &config.jwt_secret)?;
    let cookie = session_cookie(&token, &config);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "token": token,
            "type": "Bearer",
            "role": ROLE_SUPERADMIN,
        })),
    ))
}

/// Issues a short-lived password-reset token for the given email and hands
/// it to the configured notifier for delivery.
///
/// Always answers success so the endpoint cannot be used to enumerate
/// registered emails. The token only opens `reset_password`, never a session.
pub async fn forgot_password(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(notifier): State<SharedNotifier>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT id, name, email, password, mobile, school, rollno, branch, address,
                created_at, updated_at
         FROM users
         WHERE email = $1",
    )
    .bind(&payload.email)
    .fetch_optional(&pool)
    .await?;

    if let Some(user) = user {
        let claims = Claims::new(user.id, ROLE_USER, RESET_TOKEN_TTL_SECS)?
            .with_purpose(PURPOSE_PASSWORD_RESET);
        let token = sign_jwt(&claims, &config.jwt_secret)?;
        notifier.deliver_reset_token(&user.email, &token);
        tracing::info!(user_id = user.id, "Password reset token issued");
    }

    Ok(Json(json!({ "success": true })))
}

/// Completes a password reset: verifies the purpose-scoped token and stores
/// the new Argon2 hash.
pub async fn reset_password(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let claims = verify_jwt(&payload.token, &config.jwt_secret)?;
    if claims.purpose.as_deref() != Some(PURPOSE_PASSWORD_RESET) {
        return Err(AppError::AuthError(
            "Not a password reset token".to_string(),
        ));
    }

    let user_id = claims.principal_id()?;
    let hashed = hash_password(&payload.new_password)?;

    let result = sqlx::query("UPDATE users SET password = $1, updated_at = NOW() WHERE id = $2")
        .bind(&hashed)
        .bind(user_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Password updated successfully"
    })))
}
