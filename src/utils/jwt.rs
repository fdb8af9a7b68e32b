// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MAINTAINER: &str = "maintainer";
pub const ROLE_SUPERADMIN: &str = "superadmin";

/// Purpose claim carried by password-reset tokens. Tokens with a purpose
/// never pass the auth middleware, so a leaked reset link cannot become a
/// session.
pub const PURPOSE_PASSWORD_RESET: &str = "password-reset";

/// JWT claims: the principal's id, role and a few profile fields the UI
/// renders without a round trip.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - stores the principal id (as string).
    pub sub: String,
    /// One of 'user', 'admin', 'maintainer', 'superadmin'.
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Set only on special-purpose tokens (password reset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    pub fn new(id: i64, role: &str, ttl_seconds: u64) -> Result<Self, AppError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
            .as_secs() as usize;

        Ok(Claims {
            sub: id.to_string(),
            role: role.to_owned(),
            name: None,
            email: None,
            purpose: None,
            exp: now + ttl_seconds as usize,
        })
    }

    pub fn with_profile(mut self, name: &str, email: &str) -> Self {
        self.name = Some(name.to_owned());
        self.email = Some(email.to_owned());
        self
    }

    pub fn with_purpose(mut self, purpose: &str) -> Self {
        self.purpose = Some(purpose.to_owned());
        self
    }

    /// Principal id parsed back out of the subject claim.
    pub fn principal_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Malformed token subject".to_string()))
    }
}

/// Signs the claims into a compact JWT.
pub fn sign_jwt(claims: &Claims, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies signature and expiry, returning the claims.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Pulls the session token out of a request: 'Authorization: Bearer <token>'
/// first, then the HTTP-only 'token' cookie the login handlers set.
fn extract_token(req: &Request<Body>) -> Option<String> {
    if let Some(header) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        if let Some(token) = header.strip_prefix("Bearer ") {
            return Some(token.to_owned());
        }
    }

    let cookies = req
        .headers()
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())?;

    cookies
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix("token="))
        .map(str::to_owned)
}

/// Axum middleware: authentication.
///
/// Validates the session token and injects `Claims` into the request
/// extensions for handlers to use. Special-purpose tokens are rejected.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_token(&req).ok_or(StatusCode::UNAUTHORIZED)?;

    match verify_jwt(&token, &config.jwt_secret) {
        Ok(claims) if claims.purpose.is_none() => {
            req.extensions_mut().insert(claims);
            Ok(next.run(req).await)
        }
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

fn require_role(req: &Request<Body>, allowed: &[&str]) -> Result<(), StatusCode> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if allowed.contains(&claims.role.as_str()) {
        Ok(())
    } else {
        Err(StatusCode::FORBIDDEN)
    }
}

/// Axum middleware: admin authorization. Superadmins pass everywhere an
/// admin does. Must be layered AFTER `auth_middleware`.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    require_role(&req, &[ROLE_ADMIN, ROLE_SUPERADMIN])?;
    Ok(next.run(req).await)
}

/// Axum middleware: maintainer authorization (document review).
pub async fn maintainer_middleware(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    require_role(&req, &[ROLE_MAINTAINER, ROLE_ADMIN, ROLE_SUPERADMIN])?;
    Ok(next.run(req).await)
}

/// Axum middleware: superadmin-only routes.
pub async fn superadmin_middleware(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    require_role(&req, &[ROLE_SUPERADMIN])?;
    Ok(next.run(req).await)
}

/// Builds the Set-Cookie value for a freshly issued session token.
/// HTTP-only, path '/', Max-Age bound to the token expiry; Secure outside
/// development.
pub fn session_cookie(token: &str, config: &Config) -> String {
    let mut cookie = format!(
        "token={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        token, config.jwt_expiration
    );
    if config.secure_cookies {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn sign_and_verify_round_trip_preserves_claims() {
        let claims = Claims::new(42, ROLE_USER, 600)
            .unwrap()
            .with_profile("Asha", "asha@example.com");
        let token = sign_jwt(&claims, SECRET).unwrap();

        let decoded = verify_jwt(&token, SECRET).unwrap();
        assert_eq!(decoded.sub, "42");
        assert_eq!(decoded.principal_id().unwrap(), 42);
        assert_eq!(decoded.role, ROLE_USER);
        assert_eq!(decoded.name.as_deref(), Some("Asha"));
        assert_eq!(decoded.email.as_deref(), Some("asha@example.com"));
        assert!(decoded.purpose.is_none());
    }

    #[test]
    fn verification_fails_with_wrong_secret() {
        let claims = Claims::new(1, ROLE_ADMIN, 600).unwrap();
        let token = sign_jwt(&claims, SECRET).unwrap();
        assert!(verify_jwt(&token, "another-secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // Backdate exp past the default 60s leeway.
        let mut claims = Claims::new(1, ROLE_USER, 0).unwrap();
        claims.exp = claims.exp.saturating_sub(120);
        let token = sign_jwt(&claims, SECRET).unwrap();
        assert!(verify_jwt(&token, SECRET).is_err());
    }

    #[test]
    fn purpose_claim_survives_the_round_trip() {
        let claims = Claims::new(7, ROLE_USER, 600)
            .unwrap()
            .with_purpose(PURPOSE_PASSWORD_RESET);
        let token = sign_jwt(&claims, SECRET).unwrap();
        let decoded = verify_jwt(&token, SECRET).unwrap();
        assert_eq!(decoded.purpose.as_deref(), Some(PURPOSE_PASSWORD_RESET));
    }
}
