//! Evidence sources
//!
//! An evidence source answers one question: given a track, which songwriter
//! and publisher credits might apply, and how sure is the source itself?
//! Sources never decide acceptance; that is the tiers' job. Source failures
//! are recoverable by contract; the tier boundary absorbs them as "no
//! candidates".

pub mod acoustid;
pub mod fuzzy;
pub mod musicbrainz;
pub mod resolver;

pub use acoustid::AcoustIdSource;
pub use fuzzy::FuzzySearchSource;
pub use musicbrainz::MusicBrainzSource;
pub use resolver::EntityResolver;

use crate::models::{Candidate, Track};
use async_trait::async_trait;
use thiserror::Error;

/// Evidence source errors. All variants are tier-local and recoverable.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network or configuration failure
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// Upstream rate limit hit
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Response arrived but could not be interpreted
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// One identification capability (metadata database, fuzzy search,
/// audio fingerprint, ...) consulted by a tier.
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    /// Stable identifier used for provenance, weighting and configuration
    fn id(&self) -> &'static str;

    /// Return zero or more candidates for the track. An empty vec is a
    /// legitimate "no evidence" answer, not an error.
    async fn find_candidates(&self, track: &Track) -> SourceResult<Vec<Candidate>>;
}
