use axum::http::HeaderMap;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db::Cache;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub cache: Cache,
    pub config: Config,
}

impl AppState {
    pub fn new(pool: SqlitePool, cache: Cache, config: Config) -> Self {
        Self {
            pool,
            cache,
            config,
        }
    }
}

/// Per-request API keys: request headers override server configuration
#[derive(Debug, Clone)]
pub struct ApiKeys {
    pub anthropic: String,
    pub tmdb: String,
}

impl ApiKeys {
    pub fn from_headers(headers: &HeaderMap, config: &Config) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        Self {
            anthropic: header("x-anthropic-key").unwrap_or_else(|| config.anthropic_api_key.clone()),
            tmdb: header("x-tmdb-key").unwrap_or_else(|| config.tmdb_api_key.clone()),
        }
    }
}

/// User identity as asserted by the fronting auth proxy; defaults to the
/// single-tenant user
pub fn current_user(headers: &HeaderMap) -> i64 {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(1)
}
