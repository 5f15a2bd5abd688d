//! Confidence scoring: name matching, candidate merging, publisher fallbacks

pub mod names;
pub mod publisher;
pub mod scorer;

pub use names::{name_similarity, normalize_name};
pub use publisher::{resolve_publisher, ResolvedPublisher};
pub use scorer::ConfidenceScorer;
