use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod collections;
pub mod generate;
pub mod movies;
pub mod state;

pub use state::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api
fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/collections",
            get(collections::list).post(collections::create),
        )
        .route("/collections/generate", post(generate::generate))
        .route(
            "/collections/:id",
            get(collections::detail)
                .put(collections::update)
                .delete(collections::remove),
        )
        .route("/collections/:id/movies", post(movies::add))
        .route("/collections/:id/movies/batch", post(movies::add_batch))
        .route(
            "/collections/:id/movies/:movie_id",
            axum::routing::delete(movies::remove),
        )
        .route("/movies/search", get(movies::search))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
