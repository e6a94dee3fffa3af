//! Persistence for collections and their items.
//!
//! Collections are scoped by `user_id` on every read and write. Generated
//! collections additionally record the lineage link (`parent_id`) and the
//! rating threshold they were produced with.

use chrono::Utc;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use crate::models::{
    Collection, CollectionCreate, CollectionDetail, CollectionSummary, CollectionUpdate,
    GenerationResult, MediaKind, Movie, MovieCreate,
};

/// Attempts made to find a free name before giving up on a duplicate
const NAME_RETRY_LIMIT: u32 = 20;

/// Posters shown on a collection card
const CARD_POSTER_LIMIT: usize = 4;

/// Outcome of a batch item insert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchAddOutcome {
    pub added: usize,
    pub skipped: usize,
    pub total: usize,
}

/// A single item added to a collection, with whether it was newly linked
#[derive(Debug, Serialize)]
pub struct AddedMovie {
    pub movie: Movie,
    pub added: bool,
}

/// A title-search hit and the caller's collections containing it
#[derive(Debug, Serialize)]
pub struct MovieSearchResult {
    pub movie: Movie,
    pub collections: Vec<String>,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

// --- Collections ---

pub async fn create_collection(
    pool: &SqlitePool,
    data: &CollectionCreate,
    user_id: i64,
) -> AppResult<Collection> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO collections (name, description, media_kind, user_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.media_kind)
    .bind(user_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await;

    let result = result.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("A collection named \"{}\" already exists", data.name))
        } else {
            e.into()
        }
    })?;

    fetch_collection(pool, result.last_insert_rowid(), user_id)
        .await?
        .ok_or_else(|| AppError::Internal("collection missing after insert".to_string()))
}

pub async fn fetch_collection(
    pool: &SqlitePool,
    collection_id: i64,
    user_id: i64,
) -> AppResult<Option<Collection>> {
    let collection = sqlx::query_as::<_, Collection>(
        "SELECT * FROM collections WHERE id = ? AND user_id = ?",
    )
    .bind(collection_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(collection)
}

pub async fn find_collection_by_name(
    pool: &SqlitePool,
    name: &str,
    user_id: i64,
) -> AppResult<Option<Collection>> {
    let collection = sqlx::query_as::<_, Collection>(
        "SELECT * FROM collections WHERE name = ? AND user_id = ?",
    )
    .bind(name)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(collection)
}

pub async fn list_collections(
    pool: &SqlitePool,
    user_id: i64,
) -> AppResult<Vec<CollectionSummary>> {
    let rows = sqlx::query(
        "SELECT c.id, c.name, c.description, c.media_kind, c.created_at, c.updated_at,
                COUNT(cm.id) AS movie_count
         FROM collections c
         LEFT JOIN collection_movies cm ON cm.collection_id = c.id
         WHERE c.user_id = ?
         GROUP BY c.id
         ORDER BY c.name",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut summaries: Vec<CollectionSummary> = rows
        .into_iter()
        .map(|row| {
            Ok(CollectionSummary {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                description: row.try_get("description")?,
                media_kind: row.try_get("media_kind")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
                movie_count: row.try_get("movie_count")?,
                poster_urls: Vec::new(),
            })
        })
        .collect::<Result<_, sqlx::Error>>()?;

    // One query for all card posters rather than one per collection
    if !summaries.is_empty() {
        let placeholders = vec!["?"; summaries.len()].join(", ");
        let sql = format!(
            "SELECT cm.collection_id, m.poster_url
             FROM collection_movies cm
             JOIN movies m ON m.id = cm.movie_id
             WHERE cm.collection_id IN ({placeholders}) AND m.poster_url != ''
             ORDER BY cm.collection_id, cm.sort_order"
        );
        let mut query = sqlx::query(&sql);
        for summary in &summaries {
            query = query.bind(summary.id);
        }

        let mut posters: HashMap<i64, Vec<String>> = HashMap::new();
        for row in query.fetch_all(pool).await? {
            let collection_id: i64 = row.try_get("collection_id")?;
            let urls = posters.entry(collection_id).or_default();
            if urls.len() < CARD_POSTER_LIMIT {
                urls.push(row.try_get("poster_url")?);
            }
        }
        for summary in &mut summaries {
            if let Some(urls) = posters.remove(&summary.id) {
                summary.poster_urls = urls;
            }
        }
    }

    Ok(summaries)
}

pub async fn fetch_collection_detail(
    pool: &SqlitePool,
    collection_id: i64,
    user_id: i64,
) -> AppResult<Option<CollectionDetail>> {
    let Some(collection) = fetch_collection(pool, collection_id, user_id).await? else {
        return Ok(None);
    };

    let movies = sqlx::query_as::<_, Movie>(
        "SELECT m.* FROM movies m
         JOIN collection_movies cm ON cm.movie_id = m.id
         WHERE cm.collection_id = ?
         ORDER BY cm.sort_order, cm.added_at",
    )
    .bind(collection_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(CollectionDetail {
        id: collection.id,
        name: collection.name,
        description: collection.description,
        media_kind: collection.media_kind,
        min_rating: collection.min_rating,
        parent_id: collection.parent_id,
        created_at: collection.created_at,
        updated_at: collection.updated_at,
        movie_count: movies.len(),
        movies,
    }))
}

pub async fn update_collection(
    pool: &SqlitePool,
    collection_id: i64,
    data: &CollectionUpdate,
    user_id: i64,
) -> AppResult<Option<Collection>> {
    let Some(collection) = fetch_collection(pool, collection_id, user_id).await? else {
        return Ok(None);
    };

    let name = data.name.as_deref().unwrap_or(&collection.name);
    let description = data
        .description
        .as_deref()
        .unwrap_or(&collection.description);

    sqlx::query("UPDATE collections SET name = ?, description = ?, updated_at = ? WHERE id = ?")
        .bind(name)
        .bind(description)
        .bind(Utc::now())
        .bind(collection_id)
        .execute(pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("A collection named \"{name}\" already exists"))
            } else {
                e.into()
            }
        })?;

    fetch_collection(pool, collection_id, user_id).await
}

pub async fn delete_collection(
    pool: &SqlitePool,
    collection_id: i64,
    user_id: i64,
) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM collections WHERE id = ? AND user_id = ?")
        .bind(collection_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// --- Movies ---

/// Find an existing movie by IMDB id, then TMDB id, or create a new one.
/// Known fields are refreshed when new data is provided.
pub async fn find_or_create_movie(pool: &SqlitePool, data: &MovieCreate) -> AppResult<Movie> {
    let mut existing: Option<Movie> = None;
    if let Some(imdb_id) = data.imdb_id.as_deref().filter(|s| !s.is_empty()) {
        existing = sqlx::query_as::<_, Movie>("SELECT * FROM movies WHERE imdb_id = ?")
            .bind(imdb_id)
            .fetch_optional(pool)
            .await?;
    }
    if existing.is_none() {
        if let Some(tmdb_id) = data.tmdb_id.as_deref().filter(|s| !s.is_empty()) {
            existing = sqlx::query_as::<_, Movie>("SELECT * FROM movies WHERE tmdb_id = ?")
                .bind(tmdb_id)
                .fetch_optional(pool)
                .await?;
        }
    }

    if let Some(movie) = existing {
        let title = if data.title.is_empty() {
            &movie.title
        } else {
            &data.title
        };
        let year = data.year.or(movie.year);
        let overview = if data.overview.is_empty() {
            &movie.overview
        } else {
            &data.overview
        };
        let poster_url = if data.poster_url.is_empty() {
            &movie.poster_url
        } else {
            &data.poster_url
        };
        let rating = data.rating.or(movie.rating);
        let imdb_id = movie.imdb_id.clone().or_else(|| data.imdb_id.clone());
        let tmdb_id = movie.tmdb_id.clone().or_else(|| data.tmdb_id.clone());

        sqlx::query(
            "UPDATE movies
             SET title = ?, year = ?, overview = ?, poster_url = ?, rating = ?, imdb_id = ?, tmdb_id = ?
             WHERE id = ?",
        )
        .bind(title)
        .bind(year)
        .bind(overview)
        .bind(poster_url)
        .bind(rating)
        .bind(imdb_id)
        .bind(tmdb_id)
        .bind(movie.id)
        .execute(pool)
        .await?;

        return fetch_movie(pool, movie.id)
            .await?
            .ok_or_else(|| AppError::Internal("movie missing after update".to_string()));
    }

    let result = sqlx::query(
        "INSERT INTO movies (title, year, imdb_id, tmdb_id, overview, poster_url, rating, media_kind, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&data.title)
    .bind(data.year)
    .bind(data.imdb_id.as_deref().filter(|s| !s.is_empty()))
    .bind(data.tmdb_id.as_deref().filter(|s| !s.is_empty()))
    .bind(&data.overview)
    .bind(&data.poster_url)
    .bind(data.rating)
    .bind(data.media_kind)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    fetch_movie(pool, result.last_insert_rowid())
        .await?
        .ok_or_else(|| AppError::Internal("movie missing after insert".to_string()))
}

async fn fetch_movie(pool: &SqlitePool, movie_id: i64) -> AppResult<Option<Movie>> {
    let movie = sqlx::query_as::<_, Movie>("SELECT * FROM movies WHERE id = ?")
        .bind(movie_id)
        .fetch_optional(pool)
        .await?;
    Ok(movie)
}

pub async fn add_movie_to_collection(
    pool: &SqlitePool,
    collection_id: i64,
    data: &MovieCreate,
    user_id: i64,
) -> AppResult<AddedMovie> {
    let collection = fetch_collection(pool, collection_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Collection not found".to_string()))?;

    if data.media_kind != collection.media_kind {
        return Err(AppError::InvalidInput(format!(
            "Cannot add a {} to a {} collection",
            data.media_kind, collection.media_kind
        )));
    }

    let movie = find_or_create_movie(pool, data).await?;

    let linked = sqlx::query(
        "SELECT id FROM collection_movies WHERE collection_id = ? AND movie_id = ?",
    )
    .bind(collection_id)
    .bind(movie.id)
    .fetch_optional(pool)
    .await?;
    if linked.is_some() {
        return Ok(AddedMovie {
            movie,
            added: false,
        });
    }

    let max_order: Option<i64> =
        sqlx::query("SELECT MAX(sort_order) AS max_order FROM collection_movies WHERE collection_id = ?")
            .bind(collection_id)
            .fetch_one(pool)
            .await?
            .try_get("max_order")?;

    sqlx::query(
        "INSERT INTO collection_movies (collection_id, movie_id, sort_order, added_at)
         VALUES (?, ?, ?, ?)",
    )
    .bind(collection_id)
    .bind(movie.id)
    .bind(max_order.unwrap_or(0) + 1)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(AddedMovie { movie, added: true })
}

/// Add multiple items, preserving input order. Duplicates are skipped.
pub async fn add_movies_batch(
    pool: &SqlitePool,
    collection_id: i64,
    movies: &[MovieCreate],
    user_id: i64,
) -> AppResult<BatchAddOutcome> {
    let mut added = 0;
    let mut skipped = 0;
    for data in movies {
        if add_movie_to_collection(pool, collection_id, data, user_id)
            .await?
            .added
        {
            added += 1;
        } else {
            skipped += 1;
        }
    }
    Ok(BatchAddOutcome {
        added,
        skipped,
        total: movies.len(),
    })
}

pub async fn remove_movie_from_collection(
    pool: &SqlitePool,
    collection_id: i64,
    movie_id: i64,
    user_id: i64,
) -> AppResult<bool> {
    if fetch_collection(pool, collection_id, user_id).await?.is_none() {
        return Ok(false);
    }
    let result = sqlx::query(
        "DELETE FROM collection_movies WHERE collection_id = ? AND movie_id = ?",
    )
    .bind(collection_id)
    .bind(movie_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Search items by title substring, reporting which of the caller's
/// collections each hit belongs to
pub async fn search_movies(
    pool: &SqlitePool,
    query: &str,
    user_id: i64,
) -> AppResult<Vec<MovieSearchResult>> {
    let pattern = format!("%{}%", query);
    let movies = sqlx::query_as::<_, Movie>(
        "SELECT * FROM movies WHERE title LIKE ? ORDER BY title LIMIT 50",
    )
    .bind(&pattern)
    .fetch_all(pool)
    .await?;

    let mut results = Vec::with_capacity(movies.len());
    for movie in movies {
        let collections = sqlx::query(
            "SELECT c.name FROM collections c
             JOIN collection_movies cm ON cm.collection_id = c.id
             WHERE cm.movie_id = ? AND c.user_id = ?
             ORDER BY c.name",
        )
        .bind(movie.id)
        .bind(user_id)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| row.try_get("name"))
        .collect::<Result<Vec<String>, _>>()?;

        results.push(MovieSearchResult { movie, collections });
    }
    Ok(results)
}

// --- Lineage ---

/// The collection and every ancestor reachable through `parent_id`, nearest
/// first. Iterative with a visited guard so a corrupt parent link cannot
/// loop forever.
pub async fn ancestor_chain(
    pool: &SqlitePool,
    collection_id: i64,
    user_id: i64,
) -> AppResult<Vec<i64>> {
    let mut chain = Vec::new();
    let mut visited = std::collections::HashSet::new();
    let mut cursor = Some(collection_id);

    while let Some(id) = cursor {
        if !visited.insert(id) {
            tracing::warn!(collection_id = id, "Cycle in collection lineage, stopping walk");
            break;
        }
        let row = sqlx::query("SELECT parent_id FROM collections WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        let Some(row) = row else { break };
        chain.push(id);
        cursor = row.try_get("parent_id")?;
    }

    Ok(chain)
}

/// Titles of every item in a collection, as stored
pub async fn titles_in(pool: &SqlitePool, collection_id: i64) -> AppResult<Vec<String>> {
    let titles = sqlx::query(
        "SELECT m.title FROM movies m
         JOIN collection_movies cm ON cm.movie_id = m.id
         WHERE cm.collection_id = ?",
    )
    .bind(collection_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| row.try_get("title"))
    .collect::<Result<Vec<String>, _>>()?;
    Ok(titles)
}

// --- Generated collections ---

/// Persist a finished generation run: create the collection (retrying
/// duplicate names with a " (n)" suffix) and insert its items in pipeline
/// order.
pub async fn persist_generated(
    pool: &SqlitePool,
    result: &GenerationResult,
    name: &str,
    user_id: i64,
    parent_id: Option<i64>,
    media_kind: MediaKind,
    min_rating: Option<f64>,
) -> AppResult<(Collection, BatchAddOutcome)> {
    let mut collection = None;
    for attempt in 0..NAME_RETRY_LIMIT {
        let try_name = if attempt == 0 {
            name.to_string()
        } else {
            format!("{} ({})", name, attempt + 1)
        };
        let now = Utc::now();
        let inserted = sqlx::query(
            "INSERT INTO collections
             (name, description, media_kind, min_rating, parent_id, user_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&try_name)
        .bind(&result.description)
        .bind(media_kind)
        .bind(min_rating)
        .bind(parent_id)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await;

        match inserted {
            Ok(done) => {
                collection = fetch_collection(pool, done.last_insert_rowid(), user_id).await?;
                break;
            }
            Err(e) if is_unique_violation(&e) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    let collection = collection.ok_or_else(|| {
        AppError::Conflict(format!(
            "A collection named \"{name}\" already exists. Try a different prompt."
        ))
    })?;

    let movies: Vec<MovieCreate> = result.items.iter().cloned().map(MovieCreate::from).collect();
    let outcome = add_movies_batch(pool, collection.id, &movies, user_id).await?;

    tracing::info!(
        collection_id = collection.id,
        name = %collection.name,
        added = outcome.added,
        "Persisted generated collection"
    );

    Ok((collection, outcome))
}
