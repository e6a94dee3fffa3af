//! Generation pipeline: candidates from the model, enrichment against the
//! catalog, rating filtering, and a single-pass progress stream.
//!
//! The stream yields zero or more `Progress` events followed by exactly one
//! terminal `Complete` or `Error`. Candidate lookups run one at a time in
//! model order: relevance order must survive end to end, and serial calls
//! keep one caller's credentials inside third-party rate limits. The stream
//! is lazy, so a consumer that disconnects stops the run before the next
//! lookup starts.

use futures::Stream;
use std::sync::Arc;

use crate::models::{EnrichedCandidate, GenerateEvent, GenerationResult};
use crate::services::catalog::CatalogProvider;
use crate::services::generator::{self, GenerationRequest};
use crate::services::model::ChatModel;

/// Rating comparisons use the catalog's one-decimal scale
fn clears_threshold(rating: Option<f64>, min_rating: f64) -> bool {
    match rating {
        Some(rating) => (rating * 10.0).round() / 10.0 >= min_rating,
        None => false,
    }
}

/// Whether a candidate counts toward the requested total: matched, and past
/// the rating bar when one is set
fn counts_as_found(candidate: &EnrichedCandidate, min_rating: Option<f64>) -> bool {
    match min_rating {
        Some(min) => clears_threshold(candidate.rating, min),
        None => candidate.is_matched(),
    }
}

/// Retain candidates past the rating bar (when set) and trim to the
/// requested count. A short result is returned as-is: there is no second
/// round-trip to the model.
fn filter_and_trim(
    candidates: Vec<EnrichedCandidate>,
    min_rating: Option<f64>,
    count: usize,
) -> Vec<EnrichedCandidate> {
    let mut items: Vec<EnrichedCandidate> = match min_rating {
        Some(min) => candidates
            .into_iter()
            .filter(|c| clears_threshold(c.rating, min))
            .collect(),
        None => candidates,
    };
    items.truncate(count);
    items
}

/// Run one generation invocation as a forward-only event stream
pub fn generate(
    model: Arc<dyn ChatModel>,
    catalog: Arc<dyn CatalogProvider>,
    req: GenerationRequest,
) -> impl Stream<Item = GenerateEvent> {
    async_stream::stream! {
        let parsed = match generator::generate_candidates(model.as_ref(), &req).await {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Candidate generation failed");
                yield GenerateEvent::Error {
                    message: e.to_string(),
                };
                return;
            }
        };

        // Per-candidate failures degrade to an unenriched item; they never
        // abort the run.
        let mut enriched = Vec::with_capacity(parsed.candidates.len());
        let mut found = 0usize;
        for raw in parsed.candidates {
            let candidate = match catalog.lookup(&raw.title, raw.year, req.media_kind).await {
                Some(matched) => EnrichedCandidate::matched(raw, req.media_kind, matched),
                None => EnrichedCandidate::unmatched(raw, req.media_kind),
            };
            if counts_as_found(&candidate, req.min_rating) {
                found = (found + 1).min(req.count);
            }
            enriched.push(candidate);
            yield GenerateEvent::Progress {
                found,
                needed: req.count,
            };
        }

        let items = filter_and_trim(enriched, req.min_rating, req.count);

        tracing::info!(
            name = %parsed.name,
            items = items.len(),
            requested = req.count,
            "Generation finished"
        );

        yield GenerateEvent::Complete(GenerationResult {
            name: parsed.name,
            description: parsed.description,
            items,
        });
    }
}
