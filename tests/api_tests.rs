use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;

use reelvault::config::Config;
use reelvault::db::Cache;
use reelvault::routes::{create_router, AppState};

fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        redis_url: "redis://localhost:6379".to_string(),
        anthropic_api_key: String::new(),
        anthropic_api_url: "http://invalid.localdomain".to_string(),
        anthropic_model: "test-model".to_string(),
        tmdb_api_key: String::new(),
        tmdb_api_url: "http://invalid.localdomain".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
    }
}

async fn create_test_server() -> TestServer {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!().run(&pool).await.unwrap();

    let cache = Cache::connect("redis://localhost:6379").unwrap();
    let state = AppState::new(pool, cache, test_config());
    TestServer::new(create_router(state)).unwrap()
}

fn user_header(user_id: &'static str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-user-id"),
        HeaderValue::from_static(user_id),
    )
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server().await;
    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_create_and_list_collections() {
    let server = create_test_server().await;

    let response = server
        .post("/api/collections")
        .json(&json!({
            "name": "Sci-Fi Classics",
            "description": "The greats",
            "media_kind": "film"
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let created: serde_json::Value = response.json();
    assert_eq!(created["name"], "Sci-Fi Classics");
    assert_eq!(created["media_kind"], "film");

    let response = server.get("/api/collections").await;
    response.assert_status_ok();
    let collections: Vec<serde_json::Value> = response.json();
    assert_eq!(collections.len(), 1);
    assert_eq!(collections[0]["name"], "Sci-Fi Classics");
    assert_eq!(collections[0]["movie_count"], 0);
    assert_eq!(collections[0]["poster_urls"], json!([]));
}

#[tokio::test]
async fn test_duplicate_collection_name_conflicts() {
    let server = create_test_server().await;

    let body = json!({ "name": "Noir" });
    server.post("/api/collections").json(&body).await;
    let response = server.post("/api/collections").json(&body).await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_empty_collection_name_rejected() {
    let server = create_test_server().await;
    let response = server
        .post("/api/collections")
        .json(&json!({ "name": "   " }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_collection_is_404() {
    let server = create_test_server().await;
    let response = server.get("/api/collections/999").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_movie_and_fetch_detail() {
    let server = create_test_server().await;

    let response = server
        .post("/api/collections")
        .json(&json!({ "name": "Heist Films" }))
        .await;
    let collection: serde_json::Value = response.json();
    let id = collection["id"].as_i64().unwrap();

    let response = server
        .post(&format!("/api/collections/{id}/movies"))
        .json(&json!({
            "title": "Heat",
            "year": 1995,
            "imdb_id": "tt0113277",
            "rating": 8.3
        }))
        .await;
    response.assert_status_ok();
    let added: serde_json::Value = response.json();
    assert_eq!(added["added"], true);
    assert_eq!(added["movie"]["title"], "Heat");

    // Adding the same item again links nothing new
    let response = server
        .post(&format!("/api/collections/{id}/movies"))
        .json(&json!({ "title": "Heat", "imdb_id": "tt0113277" }))
        .await;
    let again: serde_json::Value = response.json();
    assert_eq!(again["added"], false);

    let response = server.get(&format!("/api/collections/{id}")).await;
    response.assert_status_ok();
    let detail: serde_json::Value = response.json();
    assert_eq!(detail["movie_count"], 1);
    assert_eq!(detail["movies"][0]["title"], "Heat");
    assert_eq!(detail["movies"][0]["rating"], 8.3);
}

#[tokio::test]
async fn test_media_kind_mismatch_rejected() {
    let server = create_test_server().await;

    let response = server
        .post("/api/collections")
        .json(&json!({ "name": "Films Only", "media_kind": "film" }))
        .await;
    let collection: serde_json::Value = response.json();
    let id = collection["id"].as_i64().unwrap();

    let response = server
        .post(&format!("/api/collections/{id}/movies"))
        .json(&json!({ "title": "Severance", "media_kind": "series" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_batch_add_reports_counts() {
    let server = create_test_server().await;

    let response = server
        .post("/api/collections")
        .json(&json!({ "name": "Sci-Fi" }))
        .await;
    let collection: serde_json::Value = response.json();
    let id = collection["id"].as_i64().unwrap();

    let response = server
        .post(&format!("/api/collections/{id}/movies/batch"))
        .json(&json!({
            "movies": [
                { "title": "Alien", "imdb_id": "tt0078748" },
                { "title": "Aliens", "imdb_id": "tt0090605" },
                { "title": "Alien", "imdb_id": "tt0078748" }
            ]
        }))
        .await;
    response.assert_status_ok();
    let outcome: serde_json::Value = response.json();
    assert_eq!(outcome["added"], 2);
    assert_eq!(outcome["skipped"], 1);
    assert_eq!(outcome["total"], 3);
}

#[tokio::test]
async fn test_remove_movie_from_collection() {
    let server = create_test_server().await;

    let response = server
        .post("/api/collections")
        .json(&json!({ "name": "Temp" }))
        .await;
    let collection: serde_json::Value = response.json();
    let id = collection["id"].as_i64().unwrap();

    let response = server
        .post(&format!("/api/collections/{id}/movies"))
        .json(&json!({ "title": "Heat", "imdb_id": "tt0113277" }))
        .await;
    let added: serde_json::Value = response.json();
    let movie_id = added["movie"]["id"].as_i64().unwrap();

    let response = server
        .delete(&format!("/api/collections/{id}/movies/{movie_id}"))
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    let response = server
        .delete(&format!("/api/collections/{id}/movies/{movie_id}"))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_and_delete_collection() {
    let server = create_test_server().await;

    let response = server
        .post("/api/collections")
        .json(&json!({ "name": "Old Name" }))
        .await;
    let collection: serde_json::Value = response.json();
    let id = collection["id"].as_i64().unwrap();

    let response = server
        .put(&format!("/api/collections/{id}"))
        .json(&json!({ "name": "New Name" }))
        .await;
    response.assert_status_ok();
    let updated: serde_json::Value = response.json();
    assert_eq!(updated["name"], "New Name");

    let response = server.delete(&format!("/api/collections/{id}")).await;
    response.assert_status(StatusCode::NO_CONTENT);

    let response = server.get(&format!("/api/collections/{id}")).await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_movie_search_reports_collection_membership() {
    let server = create_test_server().await;

    let response = server
        .post("/api/collections")
        .json(&json!({ "name": "Space" }))
        .await;
    let collection: serde_json::Value = response.json();
    let id = collection["id"].as_i64().unwrap();

    server
        .post(&format!("/api/collections/{id}/movies"))
        .json(&json!({ "title": "Alien", "imdb_id": "tt0078748" }))
        .await;

    let response = server.get("/api/movies/search?q=ali").await;
    response.assert_status_ok();
    let results: Vec<serde_json::Value> = response.json();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["movie"]["title"], "Alien");
    assert_eq!(results[0]["collections"], json!(["Space"]));
}

#[tokio::test]
async fn test_collections_scoped_by_user_header() {
    let server = create_test_server().await;

    server
        .post("/api/collections")
        .json(&json!({ "name": "Mine" }))
        .await;

    let (name, value) = user_header("2");
    let response = server
        .get("/api/collections")
        .add_header(name, value)
        .await;
    response.assert_status_ok();
    let collections: Vec<serde_json::Value> = response.json();
    assert!(collections.is_empty());
}

#[tokio::test]
async fn test_generate_requires_model_key() {
    let server = create_test_server().await;
    let response = server
        .post("/api/collections/generate")
        .json(&json!({ "prompt": "sci-fi classics", "count": 3 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generate_rejects_zero_count() {
    let server = create_test_server().await;
    let (name, value) = (
        HeaderName::from_static("x-anthropic-key"),
        HeaderValue::from_static("user-supplied-key"),
    );
    let response = server
        .post("/api/collections/generate")
        .add_header(name, value)
        .json(&json!({ "prompt": "sci-fi classics", "count": 0 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generate_rejects_out_of_scale_rating() {
    let server = create_test_server().await;
    let (name, value) = (
        HeaderName::from_static("x-anthropic-key"),
        HeaderValue::from_static("user-supplied-key"),
    );
    let response = server
        .post("/api/collections/generate")
        .add_header(name, value)
        .json(&json!({ "prompt": "sci-fi classics", "min_rating": 11.0 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generate_unknown_parent_is_404() {
    let server = create_test_server().await;
    let (name, value) = (
        HeaderName::from_static("x-anthropic-key"),
        HeaderValue::from_static("user-supplied-key"),
    );
    let response = server
        .post("/api/collections/generate")
        .add_header(name, value)
        .json(&json!({ "prompt": "more like this", "parent_id": 999 }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}
