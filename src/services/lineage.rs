//! Lineage exclusion: titles already present anywhere in a collection's
//! ancestor chain.
//!
//! The set is advisory: it is handed to the candidate generator as a
//! negative instruction, and the final result is not re-checked against it.

use sqlx::SqlitePool;
use std::collections::BTreeSet;

use crate::db::store;
use crate::error::AppResult;

/// Normalized form used for exclusion comparisons
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Titles in the collection and every ancestor up to the root of its lineage
pub async fn lineage_titles(
    pool: &SqlitePool,
    collection_id: i64,
    user_id: i64,
) -> AppResult<BTreeSet<String>> {
    let mut titles = BTreeSet::new();
    for id in store::ancestor_chain(pool, collection_id, user_id).await? {
        for title in store::titles_in(pool, id).await? {
            titles.insert(normalize_title(&title));
        }
    }

    tracing::debug!(
        collection_id,
        titles = titles.len(),
        "Resolved lineage exclusion set"
    );

    Ok(titles)
}
