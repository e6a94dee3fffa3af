//! AI collection generation endpoint.
//!
//! POST /api/collections/generate streams SSE events: `progress` after each
//! candidate lookup, then a single terminal `complete` (after the result is
//! persisted) or `error`. When rating filtering under-delivers, `complete`
//! reports fewer items than requested.

use axum::{
    extract::State,
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    db::store,
    error::{AppError, AppResult},
    models::{GenerateEvent, MediaKind},
    routes::state::{current_user, ApiKeys, AppState},
    services::{
        catalog::TmdbClient,
        generator::GenerationRequest,
        lineage,
        model::AnthropicClient,
        pipeline,
    },
};

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default = "default_count")]
    pub count: usize,
    /// Overrides the model's suggested collection name
    #[serde(default)]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub media_kind: MediaKind,
    #[serde(default)]
    pub min_rating: Option<f64>,
    /// Derive from an existing collection: titles anywhere in its lineage
    /// are excluded from the new one
    #[serde(default)]
    pub parent_id: Option<i64>,
}

fn default_count() -> usize {
    10
}

fn sse_event(kind: &'static str, payload: &serde_json::Value) -> Result<Event, Infallible> {
    Ok(Event::default().event(kind).data(payload.to_string()))
}

pub async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<GenerateRequest>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let user_id = current_user(&headers);
    let keys = ApiKeys::from_headers(&headers, &state.config);

    if req.prompt.trim().is_empty() {
        return Err(AppError::InvalidInput("Prompt cannot be empty".to_string()));
    }
    if req.count < 1 {
        return Err(AppError::InvalidInput(
            "count must be at least 1".to_string(),
        ));
    }
    if let Some(min_rating) = req.min_rating {
        if !(0.0..=10.0).contains(&min_rating) {
            return Err(AppError::InvalidInput(
                "min_rating must be between 0 and 10".to_string(),
            ));
        }
    }
    // Fail fast, before any network call
    if keys.anthropic.is_empty() {
        return Err(AppError::Config(
            "Anthropic API key is not set".to_string(),
        ));
    }

    let exclude_titles = match req.parent_id {
        Some(parent_id) => {
            if store::fetch_collection(&state.pool, parent_id, user_id)
                .await?
                .is_none()
            {
                return Err(AppError::NotFound(
                    "Source collection not found".to_string(),
                ));
            }
            lineage::lineage_titles(&state.pool, parent_id, user_id).await?
        }
        None => BTreeSet::new(),
    };

    tracing::info!(
        user_id,
        count = req.count,
        kind = %req.media_kind,
        min_rating = ?req.min_rating,
        parent_id = ?req.parent_id,
        excluded = exclude_titles.len(),
        "Starting collection generation"
    );

    let model = Arc::new(AnthropicClient::new(
        keys.anthropic,
        state.config.anthropic_api_url.clone(),
        state.config.anthropic_model.clone(),
    ));
    let catalog = Arc::new(TmdbClient::new(
        state.cache.clone(),
        keys.tmdb,
        state.config.tmdb_api_url.clone(),
    ));

    let generation = GenerationRequest {
        prompt: req.prompt,
        count: req.count,
        media_kind: req.media_kind,
        min_rating: req.min_rating,
        exclude_titles,
    };

    let pool = state.pool.clone();
    let name_override = req
        .collection_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());
    let parent_id = req.parent_id;
    let media_kind = req.media_kind;
    let min_rating = req.min_rating;

    let events = pipeline::generate(model, catalog, generation);
    let stream = async_stream::stream! {
        let mut events = Box::pin(events);
        while let Some(event) = events.next().await {
            match event {
                GenerateEvent::Progress { found, needed } => {
                    yield sse_event("progress", &json!({ "found": found, "needed": needed }));
                }
                GenerateEvent::Complete(result) => {
                    let name = name_override
                        .clone()
                        .unwrap_or_else(|| result.name.clone());
                    match store::persist_generated(
                        &pool, &result, &name, user_id, parent_id, media_kind, min_rating,
                    )
                    .await
                    {
                        Ok((collection, outcome)) => {
                            yield sse_event("complete", &json!({
                                "id": collection.id,
                                "name": collection.name,
                                "added": outcome.added,
                                "skipped": outcome.skipped,
                            }));
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to persist generated collection");
                            yield sse_event("error", &json!({ "message": e.to_string() }));
                        }
                    }
                }
                GenerateEvent::Error { message } => {
                    yield sse_event("error", &json!({ "message": message }));
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    ))
}
