use axum::extract::FromRef;
use sqlx::PgPool;

use crate::config::Config;
use crate::utils::notify::SharedNotifier;

/// Shared application state; handlers extract the pool, config or the
/// reset-token notifier through the FromRef impls below.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub notifier: SharedNotifier,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for SharedNotifier {
    fn from_ref(state: &AppState) -> Self {
        state.notifier.clone()
    }
}
