use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};

use crate::models::MediaKind;

/// Keys for cached catalog lookups
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Best-match search result for (kind, title, year)
    Search {
        kind: MediaKind,
        title: String,
        year: Option<i32>,
    },
    /// External (IMDB) id for a catalog entry
    ExternalIds { kind: MediaKind, tmdb_id: String },
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Search { kind, title, year } => {
                let year = year.map(|y| y.to_string()).unwrap_or_default();
                write!(f, "catalog:search:{}:{}:{}", kind, year, title.to_lowercase())
            }
            CacheKey::ExternalIds { kind, tmdb_id } => {
                write!(f, "catalog:ids:{}:{}", kind, tmdb_id)
            }
        }
    }
}

/// Read-through Redis cache for catalog lookups
///
/// Redis being down must never fail a lookup: reads degrade to a miss and
/// writes are fire-and-forget.
#[derive(Clone)]
pub struct Cache {
    client: redis::Client,
}

impl Cache {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    pub fn connect(redis_url: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client: redis::Client::open(redis_url)?,
        })
    }

    /// Fetch a cached value; any Redis failure is a miss
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::debug!(error = %e, "Cache unavailable, treating as miss");
                return None;
            }
        };

        let raw: Option<String> = match conn.get(key.to_string()).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "Cache read failed");
                return None;
            }
        };

        raw.and_then(|s| serde_json::from_str(&s).ok())
    }

    /// Store a value without blocking the caller on Redis
    pub fn put<T: Serialize>(&self, key: &CacheKey, value: &T, ttl_secs: u64) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(_) => return,
        };
        let client = self.client.clone();
        let key = key.to_string();

        tokio::spawn(async move {
            match client.get_multiplexed_async_connection().await {
                Ok(mut conn) => {
                    if let Err(e) = conn.set_ex::<_, _, ()>(&key, payload, ttl_secs).await {
                        tracing::debug!(key = %key, error = %e, "Cache write failed");
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Cache unavailable, skipping write");
                }
            }
        });
    }
}
