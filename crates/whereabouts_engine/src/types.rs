use thiserror::Error;
use whereabouts_core::{CharacterId, EpisodeId};

/// Failure of a single remote lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connection, timeout, or other network-level failure.
    #[error("transport failure for {url}: {message}")]
    Transport { url: String, message: String },
    #[error("http status {status} for {url}")]
    HttpStatus { url: String, status: u16 },
    /// The body came back but did not match the expected shape.
    #[error("invalid response body for {url}: {message}")]
    Validation { url: String, message: String },
}

/// Failure of one aggregation run, tagged with where in the walk it happened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    #[error("episode listing page {page} failed: {source}")]
    Page { page: u32, source: FetchError },
    #[error("episode {id} failed: {source}")]
    Episode { id: EpisodeId, source: FetchError },
    #[error("character {id} failed: {source}")]
    Character { id: CharacterId, source: FetchError },
    /// The character record resolved, but its location reference did not.
    #[error("location lookup for character {character_id} failed: {source}")]
    ReferenceResolution {
        character_id: CharacterId,
        source: FetchError,
    },
}
