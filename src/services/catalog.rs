/// TMDB catalog client
///
/// Resolves a (title, year, kind) candidate to a best-match summary. Two
/// endpoints per match: a fuzzy search for the entry itself, then the
/// external-ids endpoint for the IMDB id. Both are fronted by the Redis
/// cache and both degrade to "no match" on any failure: the pipeline's
/// resilience contract forbids a lookup error from crossing this boundary.
use async_trait::async_trait;
use std::time::Duration;

use crate::db::{Cache, CacheKey};
use crate::error::{AppError, AppResult};
use crate::models::{CatalogMatch, MediaKind, TmdbExternalIds, TmdbSearchHit, TmdbSearchResponse};

const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";
const CALL_TIMEOUT: Duration = Duration::from_secs(10);
const SEARCH_CACHE_TTL: u64 = 86_400; // 1 day
const IDS_CACHE_TTL: u64 = 604_800; // 1 week

/// Boundary to the title-metadata catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Best-match lookup. `None` covers both "no match" and any transport
    /// or API failure.
    async fn lookup(
        &self,
        title: &str,
        year: Option<i32>,
        kind: MediaKind,
    ) -> Option<CatalogMatch>;
}

#[derive(Clone)]
pub struct TmdbClient {
    http_client: reqwest::Client,
    api_key: String,
    api_url: String,
    cache: Cache,
}

impl TmdbClient {
    pub fn new(cache: Cache, api_key: String, api_url: String) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(CALL_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            api_key,
            api_url,
            cache,
        }
    }

    fn search_path(kind: MediaKind) -> &'static str {
        match kind {
            MediaKind::Film => "search/movie",
            MediaKind::Series => "search/tv",
        }
    }

    /// TMDB names the year filter differently per media kind
    fn year_param(kind: MediaKind) -> &'static str {
        match kind {
            MediaKind::Film => "year",
            MediaKind::Series => "first_air_date_year",
        }
    }

    fn detail_segment(kind: MediaKind) -> &'static str {
        match kind {
            MediaKind::Film => "movie",
            MediaKind::Series => "tv",
        }
    }

    fn round_rating(value: f64) -> f64 {
        (value * 10.0).round() / 10.0
    }

    fn convert_hit(hit: TmdbSearchHit, imdb_id: Option<String>) -> CatalogMatch {
        CatalogMatch {
            tmdb_id: hit.id.to_string(),
            imdb_id,
            poster_url: hit
                .poster_path
                .map(|path| format!("{TMDB_IMAGE_BASE}{path}"))
                .unwrap_or_default(),
            overview: hit.overview.unwrap_or_default(),
            rating: hit.vote_average.map(Self::round_rating),
        }
    }

    async fn fetch_search(
        &self,
        title: &str,
        year: Option<i32>,
        kind: MediaKind,
    ) -> AppResult<Option<TmdbSearchHit>> {
        let url = format!("{}/{}", self.api_url, Self::search_path(kind));
        let mut query: Vec<(&str, String)> = vec![
            ("api_key", self.api_key.clone()),
            ("query", title.to_string()),
        ];
        if let Some(year) = year {
            query.push((Self::year_param(kind), year.to_string()));
        }

        let response = self.http_client.get(&url).query(&query).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB returned status {}: {}",
                status, body
            )));
        }

        let parsed: TmdbSearchResponse = response.json().await?;
        Ok(parsed.results.into_iter().next())
    }

    /// IMDB id for a catalog entry, cached; failures degrade to `None`
    async fn external_imdb_id(&self, tmdb_id: &str, kind: MediaKind) -> Option<String> {
        let key = CacheKey::ExternalIds {
            kind,
            tmdb_id: tmdb_id.to_string(),
        };
        if let Some(imdb_id) = self.cache.get::<String>(&key).await {
            return Some(imdb_id);
        }

        match self.fetch_external_ids(tmdb_id, kind).await {
            Ok(Some(imdb_id)) => {
                self.cache.put(&key, &imdb_id, IDS_CACHE_TTL);
                Some(imdb_id)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(tmdb_id = %tmdb_id, error = %e, "External id fetch failed");
                None
            }
        }
    }

    async fn fetch_external_ids(
        &self,
        tmdb_id: &str,
        kind: MediaKind,
    ) -> AppResult<Option<String>> {
        let url = format!(
            "{}/{}/{}/external_ids",
            self.api_url,
            Self::detail_segment(kind),
            tmdb_id
        );
        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB returned status {}: {}",
                status, body
            )));
        }

        let ids: TmdbExternalIds = response.json().await?;
        Ok(ids.imdb_id.filter(|id| !id.is_empty()))
    }
}

#[async_trait]
impl CatalogProvider for TmdbClient {
    async fn lookup(
        &self,
        title: &str,
        year: Option<i32>,
        kind: MediaKind,
    ) -> Option<CatalogMatch> {
        if self.api_key.is_empty() {
            tracing::warn!("TMDB API key is not set, skipping enrichment");
            return None;
        }

        let key = CacheKey::Search {
            kind,
            title: title.to_string(),
            year,
        };
        if let Some(found) = self.cache.get::<CatalogMatch>(&key).await {
            return Some(found);
        }

        let hit = match self.fetch_search(title, year, kind).await {
            Ok(Some(hit)) => hit,
            Ok(None) => {
                tracing::debug!(title = %title, kind = %kind, "No catalog match");
                return None;
            }
            Err(e) => {
                tracing::warn!(title = %title, error = %e, "Catalog search failed");
                return None;
            }
        };

        let tmdb_id = hit.id.to_string();
        let imdb_id = self.external_imdb_id(&tmdb_id, kind).await;
        let found = Self::convert_hit(hit, imdb_id);
        self.cache.put(&key, &found, SEARCH_CACHE_TTL);

        tracing::info!(
            title = %title,
            tmdb_id = %found.tmdb_id,
            rating = ?found.rating,
            "Catalog match"
        );

        Some(found)
    }
}
