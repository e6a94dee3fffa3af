use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of media a collection holds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type, Default)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Film,
    Series,
}

impl MediaKind {
    /// Label used when talking to the model ("movie" / "TV show")
    pub fn item_label(&self) -> &'static str {
        match self {
            MediaKind::Film => "movie",
            MediaKind::Series => "TV show",
        }
    }

    /// Key under which the model returns the candidate list
    pub fn items_key(&self) -> &'static str {
        match self {
            MediaKind::Film => "movies",
            MediaKind::Series => "shows",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Film => write!(f, "film"),
            MediaKind::Series => write!(f, "series"),
        }
    }
}

/// A stored movie or TV show
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub imdb_id: Option<String>,
    pub tmdb_id: Option<String>,
    pub overview: String,
    pub poster_url: String,
    pub rating: Option<f64>,
    pub media_kind: MediaKind,
    pub created_at: DateTime<Utc>,
}

/// A stored collection row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub media_kind: MediaKind,
    /// Rating threshold the collection was generated with, if any
    pub min_rating: Option<f64>,
    pub parent_id: Option<i64>,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Collection listing entry with aggregate fields
#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub media_kind: MediaKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub movie_count: i64,
    /// Up to four poster URLs for the collection card
    pub poster_urls: Vec<String>,
}

/// A collection with its items, in stored order
#[derive(Debug, Clone, Serialize)]
pub struct CollectionDetail {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub media_kind: MediaKind,
    pub min_rating: Option<f64>,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub movie_count: usize,
    pub movies: Vec<Movie>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionCreate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub media_kind: MediaKind,
}

#[derive(Debug, Deserialize)]
pub struct CollectionUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Payload for adding or importing a single item
#[derive(Debug, Clone, Deserialize)]
pub struct MovieCreate {
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub tmdb_id: Option<String>,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_url: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub media_kind: MediaKind,
}
