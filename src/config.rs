// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Default session lifetime: 30 days, matching the portal's cookie max-age.
const DEFAULT_JWT_EXPIRATION_SECS: u64 = 60 * 60 * 24 * 30;

/// Password-reset tokens are short-lived.
pub const RESET_TOKEN_TTL_SECS: u64 = 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Session token lifetime in seconds; also the cookie Max-Age.
    pub jwt_expiration: u64,
    pub rust_log: String,
    /// Mark session cookies Secure (set in production).
    pub secure_cookies: bool,
    /// Optional admin account seeded at startup.
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    /// Superadmin has no database row; credentials come straight from env.
    pub super_admin_username: Option<String>,
    pub super_admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_JWT_EXPIRATION_SECS);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let secure_cookies = env::var("APP_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            secure_cookies,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            super_admin_username: env::var("SUPER_ADMIN_USERNAME").ok(),
            super_admin_password: env::var("SUPER_ADMIN_PASSWORD").ok(),
        }
    }
}
