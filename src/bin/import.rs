//! Import a JSON file of items into a collection.
//!
//! Usage: import <file.json> <collection-name> [film|series]
//!
//! The file holds an array of items in the same shape the batch-add
//! endpoint accepts. The collection is created if it does not exist.

use tracing_subscriber::EnvFilter;

use reelvault::config::Config;
use reelvault::db::{self, store};
use reelvault::models::{CollectionCreate, MediaKind, MovieCreate};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: import <file.json> <collection-name> [film|series]");
        std::process::exit(2);
    }
    let path = &args[1];
    let name = &args[2];
    let media_kind = match args.get(3).map(String::as_str) {
        Some("series") => MediaKind::Series,
        _ => MediaKind::Film,
    };

    let raw = std::fs::read_to_string(path)?;
    let mut movies: Vec<MovieCreate> = serde_json::from_str(&raw)?;
    for movie in &mut movies {
        movie.media_kind = media_kind;
    }

    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    let user_id = 1;

    let collection = match store::find_collection_by_name(&pool, name, user_id).await? {
        Some(existing) => {
            if existing.media_kind != media_kind {
                anyhow::bail!(
                    "collection \"{}\" holds {}s, not {}s",
                    name,
                    existing.media_kind,
                    media_kind
                );
            }
            existing
        }
        None => {
            store::create_collection(
                &pool,
                &CollectionCreate {
                    name: name.clone(),
                    description: String::new(),
                    media_kind,
                },
                user_id,
            )
            .await?
        }
    };

    let outcome = store::add_movies_batch(&pool, collection.id, &movies, user_id).await?;

    println!(
        "{}: {} added, {} skipped ({} total)",
        collection.name, outcome.added, outcome.skipped, outcome.total
    );

    Ok(())
}
