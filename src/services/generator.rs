//! Candidate generation: prompt construction and strict parsing of the
//! model's reply.
//!
//! The model is asked for a single JSON object (name, description, and a
//! candidate list keyed by media kind) in relevance order. The reply is
//! untrusted: a wrapping code fence is stripped, then the shape is parsed
//! strictly and anything that does not match fails the invocation as
//! invalid model output.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::error::{AppError, AppResult};
use crate::models::{MediaKind, RawCandidate};
use crate::services::model::ChatModel;

/// Extra candidates requested up front when rating filtering is active,
/// compensating for expected attrition
const OVERFETCH_MARGIN: usize = 5;

/// Inputs for one generation run
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Number of items the finished collection should hold
    pub count: usize,
    pub media_kind: MediaKind,
    /// Minimum catalog rating (0-10) an item must clear, if set
    pub min_rating: Option<f64>,
    /// Normalized titles the model must not propose (lineage exclusion)
    pub exclude_titles: BTreeSet<String>,
}

/// Parsed, validated model output
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCollection {
    pub name: String,
    pub description: String,
    pub candidates: Vec<RawCandidate>,
}

#[derive(Debug, Deserialize)]
struct ModelPayload {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    movies: Option<Vec<RawCandidate>>,
    #[serde(default)]
    shows: Option<Vec<RawCandidate>>,
}

/// Candidates to request from the model, including the overfetch margin
pub fn effective_count(req: &GenerationRequest) -> usize {
    match req.min_rating {
        Some(_) => req.count + OVERFETCH_MARGIN,
        None => req.count,
    }
}

pub fn system_prompt(req: &GenerationRequest) -> String {
    let label = req.media_kind.item_label();
    let key = req.media_kind.items_key();
    let sample_title = match req.media_kind {
        MediaKind::Film => "Movie Title",
        MediaKind::Series => "TV Show Title",
    };

    let mut prompt = format!(
        r#"You are a {label} expert. The user will describe a {label} collection they want.
Return a JSON object with exactly this structure:
{{
  "name": "Collection Name",
  "description": "A brief description of the collection",
  "{key}": [
    {{"title": "{sample_title}", "year": 1999}},
    ...
  ]
}}

Rules:
- Return ONLY valid JSON, no markdown fences, no extra text
- The "{key}" array must contain exactly the number of {label}s requested
- Each {label} must have "title" (string) and "year" (integer)
- Only include real, well-known {label}s that match the user's request
- Order {label}s by relevance to the prompt"#
    );

    if let Some(min_rating) = req.min_rating {
        let _ = write!(
            prompt,
            "\n- Only include {label}s with a strong reputation — aim for titles generally rated {min_rating}+ on TMDB/IMDb"
        );
    }

    if !req.exclude_titles.is_empty() {
        let listed = req
            .exclude_titles
            .iter()
            .map(|t| format!("\"{t}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = write!(
            prompt,
            "\n- Never include any of these titles the user already has: {listed}"
        );
    }

    prompt
}

pub fn user_message(req: &GenerationRequest) -> String {
    let plural = match req.media_kind {
        MediaKind::Film => "movies",
        MediaKind::Series => "TV shows",
    };
    format!(
        "{}\n\nPlease return exactly {} {}.",
        req.prompt,
        effective_count(req),
        plural
    )
}

/// Strip a wrapping markdown code fence, if present
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let Some((_, rest)) = trimmed.split_once('\n') else {
        return trimmed;
    };
    let rest = rest.trim_end();
    match rest.strip_suffix("```") {
        Some(inner) => inner.trim_end(),
        None => rest,
    }
}

/// Parse the model's reply into a validated candidate list
///
/// The list is read from the key matching the requested media kind, with
/// `movies` accepted as a fallback key since models sometimes ignore the
/// `shows` naming.
pub fn parse_response(raw: &str, kind: MediaKind) -> AppResult<ParsedCollection> {
    let body = strip_code_fences(raw);
    let payload: ModelPayload = serde_json::from_str(body)
        .map_err(|e| AppError::ModelOutput(format!("response is not the expected JSON shape: {e}")))?;

    let candidates = match kind {
        MediaKind::Film => payload.movies,
        MediaKind::Series => payload.shows.or(payload.movies),
    }
    .ok_or_else(|| {
        AppError::ModelOutput(format!(
            "response is missing the \"{}\" list",
            kind.items_key()
        ))
    })?;

    if candidates.is_empty() {
        return Err(AppError::ModelOutput(
            "response contained no candidates".to_string(),
        ));
    }

    Ok(ParsedCollection {
        name: payload.name,
        description: payload.description,
        candidates,
    })
}

/// Run the single model call and validate its output
pub async fn generate_candidates(
    model: &dyn ChatModel,
    req: &GenerationRequest,
) -> AppResult<ParsedCollection> {
    let system = system_prompt(req);
    let user = user_message(req);

    tracing::debug!(
        requested = effective_count(req),
        kind = %req.media_kind,
        excluded = req.exclude_titles.len(),
        "Requesting candidates from model"
    );

    let raw = model.complete(&system, &user).await?;
    parse_response(&raw, req.media_kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(kind: MediaKind, min_rating: Option<f64>) -> GenerationRequest {
        GenerationRequest {
            prompt: "sci-fi classics".to_string(),
            count: 10,
            media_kind: kind,
            min_rating,
            exclude_titles: BTreeSet::new(),
        }
    }

    #[test]
    fn overfetch_only_applies_with_rating_filter() {
        assert_eq!(effective_count(&request(MediaKind::Film, None)), 10);
        assert_eq!(effective_count(&request(MediaKind::Film, Some(7.0))), 15);
    }

    #[test]
    fn system_prompt_uses_media_kind_vocabulary() {
        let films = system_prompt(&request(MediaKind::Film, None));
        assert!(films.contains("movie expert"));
        assert!(films.contains("\"movies\": ["));

        let shows = system_prompt(&request(MediaKind::Series, None));
        assert!(shows.contains("TV show expert"));
        assert!(shows.contains("\"shows\": ["));
    }

    #[test]
    fn system_prompt_includes_rating_rule_only_when_set() {
        let plain = system_prompt(&request(MediaKind::Film, None));
        assert!(!plain.contains("strong reputation"));

        let rated = system_prompt(&request(MediaKind::Film, Some(7.5)));
        assert!(rated.contains("rated 7.5+"));
    }

    #[test]
    fn system_prompt_forbids_excluded_titles() {
        let mut req = request(MediaKind::Film, None);
        req.exclude_titles.insert("dune".to_string());
        req.exclude_titles.insert("arrival".to_string());

        let prompt = system_prompt(&req);
        assert!(prompt.contains("Never include any of these titles"));
        // BTreeSet iteration keeps the listing deterministic
        assert!(prompt.contains("\"arrival\", \"dune\""));
    }

    #[test]
    fn user_message_asks_for_effective_count() {
        let msg = user_message(&request(MediaKind::Film, Some(7.0)));
        assert!(msg.contains("exactly 15 movies"));

        let msg = user_message(&request(MediaKind::Series, None));
        assert!(msg.contains("exactly 10 TV shows"));
    }

    #[test]
    fn parse_accepts_plain_json() {
        let raw = r#"{"name": "Classics", "description": "Old favorites", "movies": [{"title": "Alien", "year": 1979}]}"#;
        let parsed = parse_response(raw, MediaKind::Film).unwrap();
        assert_eq!(parsed.name, "Classics");
        assert_eq!(parsed.description, "Old favorites");
        assert_eq!(
            parsed.candidates,
            vec![RawCandidate {
                title: "Alien".to_string(),
                year: Some(1979)
            }]
        );
    }

    #[test]
    fn parse_strips_code_fences() {
        let raw = "```json\n{\"name\": \"Classics\", \"movies\": [{\"title\": \"Alien\", \"year\": 1979}]}\n```";
        let parsed = parse_response(raw, MediaKind::Film).unwrap();
        assert_eq!(parsed.candidates.len(), 1);
        // Missing description defaults to empty
        assert_eq!(parsed.description, "");
    }

    #[test]
    fn parse_strips_leading_fence_without_trailing() {
        let raw = "```json\n{\"name\": \"X\", \"movies\": [{\"title\": \"Alien\"}]}";
        assert!(parse_response(raw, MediaKind::Film).is_ok());
    }

    #[test]
    fn parse_rejects_malformed_json() {
        let err = parse_response("not json at all", MediaKind::Film).unwrap_err();
        assert!(matches!(err, AppError::ModelOutput(_)));
    }

    #[test]
    fn parse_rejects_missing_name() {
        let raw = r#"{"movies": [{"title": "Alien", "year": 1979}]}"#;
        let err = parse_response(raw, MediaKind::Film).unwrap_err();
        assert!(matches!(err, AppError::ModelOutput(_)));
    }

    #[test]
    fn parse_rejects_missing_items_list() {
        let raw = r#"{"name": "Classics", "description": "no list here"}"#;
        let err = parse_response(raw, MediaKind::Film).unwrap_err();
        assert!(matches!(err, AppError::ModelOutput(_)));
    }

    #[test]
    fn parse_rejects_wrong_item_shape() {
        let raw = r#"{"name": "Classics", "movies": ["Alien", "Blade Runner"]}"#;
        assert!(parse_response(raw, MediaKind::Film).is_err());
    }

    #[test]
    fn parse_rejects_empty_candidate_list() {
        let raw = r#"{"name": "Classics", "movies": []}"#;
        let err = parse_response(raw, MediaKind::Film).unwrap_err();
        assert!(matches!(err, AppError::ModelOutput(_)));
    }

    #[test]
    fn parse_falls_back_to_movies_key_for_series() {
        let raw = r#"{"name": "Prestige TV", "movies": [{"title": "The Wire", "year": 2002}]}"#;
        let parsed = parse_response(raw, MediaKind::Series).unwrap();
        assert_eq!(parsed.candidates[0].title, "The Wire");
    }

    #[test]
    fn parse_tolerates_missing_year() {
        let raw = r#"{"name": "X", "movies": [{"title": "Alien"}]}"#;
        let parsed = parse_response(raw, MediaKind::Film).unwrap();
        assert_eq!(parsed.candidates[0].year, None);
    }
}
