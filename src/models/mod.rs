pub mod generate;
pub mod media;

pub use generate::{
    CatalogMatch, EnrichedCandidate, GenerateEvent, GenerationResult, RawCandidate,
    TmdbExternalIds, TmdbSearchHit, TmdbSearchResponse,
};
pub use media::{
    Collection, CollectionCreate, CollectionDetail, CollectionSummary, CollectionUpdate,
    MediaKind, Movie, MovieCreate,
};
