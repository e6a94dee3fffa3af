use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::{
    db::store,
    error::{AppError, AppResult},
    models::{Collection, CollectionCreate, CollectionDetail, CollectionSummary, CollectionUpdate},
    routes::state::{current_user, AppState},
};

pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<CollectionSummary>>> {
    let user_id = current_user(&headers);
    let collections = store::list_collections(&state.pool, user_id).await?;
    Ok(Json(collections))
}

pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(data): Json<CollectionCreate>,
) -> AppResult<(StatusCode, Json<Collection>)> {
    if data.name.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Collection name cannot be empty".to_string(),
        ));
    }
    let user_id = current_user(&headers);
    let collection = store::create_collection(&state.pool, &data, user_id).await?;

    tracing::info!(
        collection_id = collection.id,
        name = %collection.name,
        "Collection created"
    );

    Ok((StatusCode::CREATED, Json(collection)))
}

pub async fn detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(collection_id): Path<i64>,
) -> AppResult<Json<CollectionDetail>> {
    let user_id = current_user(&headers);
    store::fetch_collection_detail(&state.pool, collection_id, user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Collection not found".to_string()))
}

pub async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(collection_id): Path<i64>,
    Json(data): Json<CollectionUpdate>,
) -> AppResult<Json<Collection>> {
    let user_id = current_user(&headers);
    store::update_collection(&state.pool, collection_id, &data, user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Collection not found".to_string()))
}

pub async fn remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(collection_id): Path<i64>,
) -> AppResult<StatusCode> {
    let user_id = current_user(&headers);
    if store::delete_collection(&state.pool, collection_id, user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Collection not found".to_string()))
    }
}
