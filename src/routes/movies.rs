use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;

use crate::{
    db::store::{self, AddedMovie, BatchAddOutcome, MovieSearchResult},
    error::{AppError, AppResult},
    models::MovieCreate,
    routes::state::{current_user, AppState},
};

#[derive(Debug, Deserialize)]
pub struct BatchAddRequest {
    pub movies: Vec<MovieCreate>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
}

pub async fn add(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(collection_id): Path<i64>,
    Json(data): Json<MovieCreate>,
) -> AppResult<Json<AddedMovie>> {
    let user_id = current_user(&headers);
    let added = store::add_movie_to_collection(&state.pool, collection_id, &data, user_id).await?;
    Ok(Json(added))
}

pub async fn add_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(collection_id): Path<i64>,
    Json(data): Json<BatchAddRequest>,
) -> AppResult<Json<BatchAddOutcome>> {
    let user_id = current_user(&headers);
    let outcome =
        store::add_movies_batch(&state.pool, collection_id, &data.movies, user_id).await?;

    tracing::info!(
        collection_id,
        added = outcome.added,
        skipped = outcome.skipped,
        "Batch add completed"
    );

    Ok(Json(outcome))
}

pub async fn remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((collection_id, movie_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    let user_id = current_user(&headers);
    if store::remove_movie_from_collection(&state.pool, collection_id, movie_id, user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(
            "Movie not found in collection".to_string(),
        ))
    }
}

pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<MovieSearchResult>>> {
    if params.q.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Search query cannot be empty".to_string(),
        ));
    }
    let user_id = current_user(&headers);
    let results = store::search_movies(&state.pool, params.q.trim(), user_id).await?;
    Ok(Json(results))
}
