use serde::{Deserialize, Serialize};

use super::media::{MediaKind, MovieCreate};

/// A (title, year) candidate as proposed by the model, before enrichment
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawCandidate {
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
}

/// Best-match summary returned by the catalog for one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogMatch {
    pub tmdb_id: String,
    pub imdb_id: Option<String>,
    pub poster_url: String,
    pub overview: String,
    /// Catalog rating on a 0-10 scale, rounded to one decimal
    pub rating: Option<f64>,
}

/// A candidate after the catalog lookup
///
/// `tmdb_id` present means the lookup matched and the enrichment fields are
/// populated; absent means title/year/kind only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedCandidate {
    pub title: String,
    pub year: Option<i32>,
    pub media_kind: MediaKind,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_url: String,
    pub tmdb_id: Option<String>,
    pub imdb_id: Option<String>,
    pub rating: Option<f64>,
}

impl EnrichedCandidate {
    /// Candidate for which the catalog produced no match
    pub fn unmatched(raw: RawCandidate, media_kind: MediaKind) -> Self {
        Self {
            title: raw.title,
            year: raw.year,
            media_kind,
            overview: String::new(),
            poster_url: String::new(),
            tmdb_id: None,
            imdb_id: None,
            rating: None,
        }
    }

    /// Candidate merged with its catalog match
    pub fn matched(raw: RawCandidate, media_kind: MediaKind, found: CatalogMatch) -> Self {
        Self {
            title: raw.title,
            year: raw.year,
            media_kind,
            overview: found.overview,
            poster_url: found.poster_url,
            tmdb_id: Some(found.tmdb_id),
            imdb_id: found.imdb_id,
            rating: found.rating,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.tmdb_id.is_some()
    }
}

impl From<EnrichedCandidate> for MovieCreate {
    fn from(c: EnrichedCandidate) -> Self {
        MovieCreate {
            title: c.title,
            year: c.year,
            imdb_id: c.imdb_id,
            tmdb_id: c.tmdb_id,
            overview: c.overview,
            poster_url: c.poster_url,
            rating: c.rating,
            media_kind: c.media_kind,
        }
    }
}

/// Finished output of a generation run, ready for persistence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    pub name: String,
    pub description: String,
    /// Items in the model's relevance order, minus filtered entries
    pub items: Vec<EnrichedCandidate>,
}

/// One event in the generation progress stream
///
/// Zero or more `Progress` events followed by exactly one terminal
/// `Complete` or `Error`.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerateEvent {
    Progress { found: usize, needed: usize },
    Complete(GenerationResult),
    Error { message: String },
}

impl GenerateEvent {
    /// Wire-level event name for the SSE stream
    pub fn event_type(&self) -> &'static str {
        match self {
            GenerateEvent::Progress { .. } => "progress",
            GenerateEvent::Complete(_) => "complete",
            GenerateEvent::Error { .. } => "error",
        }
    }
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Response from GET /search/movie and /search/tv
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSearchResponse {
    #[serde(default)]
    pub results: Vec<TmdbSearchHit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSearchHit {
    pub id: i64,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
}

/// Response from GET /{movie,tv}/{id}/external_ids
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbExternalIds {
    #[serde(default)]
    pub imdb_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matched_candidate_carries_all_enrichment_fields() {
        let raw = RawCandidate {
            title: "Blade Runner".to_string(),
            year: Some(1982),
        };
        let found = CatalogMatch {
            tmdb_id: "78".to_string(),
            imdb_id: Some("tt0083658".to_string()),
            poster_url: "https://image.tmdb.org/t/p/w500/blade.jpg".to_string(),
            overview: "A blade runner must pursue replicants.".to_string(),
            rating: Some(7.9),
        };

        let c = EnrichedCandidate::matched(raw, MediaKind::Film, found);
        assert!(c.is_matched());
        assert_eq!(c.tmdb_id.as_deref(), Some("78"));
        assert_eq!(c.imdb_id.as_deref(), Some("tt0083658"));
        assert_eq!(c.rating, Some(7.9));
        assert!(!c.overview.is_empty());
    }

    #[test]
    fn unmatched_candidate_has_no_enrichment_fields() {
        let raw = RawCandidate {
            title: "Obscure Film".to_string(),
            year: None,
        };

        let c = EnrichedCandidate::unmatched(raw, MediaKind::Series);
        assert!(!c.is_matched());
        assert_eq!(c.tmdb_id, None);
        assert_eq!(c.imdb_id, None);
        assert_eq!(c.rating, None);
        assert_eq!(c.overview, "");
        assert_eq!(c.poster_url, "");
    }

    #[test]
    fn tmdb_search_hit_deserialization() {
        let json = r#"{
            "id": 78,
            "overview": "A blade runner must pursue replicants.",
            "poster_path": "/blade.jpg",
            "vote_average": 7.9
        }"#;

        let hit: TmdbSearchHit = serde_json::from_str(json).unwrap();
        assert_eq!(hit.id, 78);
        assert_eq!(hit.poster_path.as_deref(), Some("/blade.jpg"));
        assert_eq!(hit.vote_average, Some(7.9));
    }

    #[test]
    fn tmdb_search_response_tolerates_missing_results() {
        let resp: TmdbSearchResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.results.is_empty());
    }

    #[test]
    fn event_types_match_wire_names() {
        assert_eq!(
            GenerateEvent::Progress { found: 0, needed: 3 }.event_type(),
            "progress"
        );
        assert_eq!(
            GenerateEvent::Error {
                message: "boom".to_string()
            }
            .event_type(),
            "error"
        );
    }
}
