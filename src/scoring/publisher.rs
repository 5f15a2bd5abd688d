//! Publisher resolution
//!
//! Publisher evidence degrades in reliability: a direct work-to-publisher
//! relation beats a publisher-typed entity linked to the work, which beats a
//! publisher seen on other works by the same artist. The levels are an
//! explicit ordered list of pure selection functions evaluated with early
//! exit, so the fallback control flow is visible in one place.

use crate::models::{Candidate, PublisherRelation};
use crate::scoring::names::normalize_name;

/// Confidence multiplier for artist-catalog publishers (indirect evidence)
const ARTIST_CATALOG_FACTOR: f64 = 0.6;

/// A resolved publisher with its derived confidence
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPublisher {
    pub name: String,
    pub confidence: f64,
    pub relation: PublisherRelation,
}

type FallbackFn = fn(&[Candidate]) -> Option<ResolvedPublisher>;

/// Resolve the publisher for one tier attempt from the publisher-role
/// candidates. Returns the strongest available level, or None when no
/// publisher evidence exists.
pub fn resolve_publisher(candidates: &[Candidate]) -> Option<ResolvedPublisher> {
    const FALLBACKS: [FallbackFn; 3] = [direct_work, linked_entity, artist_catalog];

    FALLBACKS.iter().find_map(|fallback| fallback(candidates))
}

fn best_at_level(
    candidates: &[Candidate],
    level: PublisherRelation,
    factor: f64,
) -> Option<ResolvedPublisher> {
    candidates
        .iter()
        .filter(|c| c.publisher_relation == Some(level) && !normalize_name(&c.name).is_empty())
        .max_by(|a, b| {
            a.source_confidence
                .partial_cmp(&b.source_confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|c| ResolvedPublisher {
            name: c.name.clone(),
            confidence: (c.source_confidence * factor).clamp(0.0, 1.0),
            relation: level,
        })
}

fn direct_work(candidates: &[Candidate]) -> Option<ResolvedPublisher> {
    best_at_level(candidates, PublisherRelation::DirectWork, 1.0)
}

fn linked_entity(candidates: &[Candidate]) -> Option<ResolvedPublisher> {
    best_at_level(candidates, PublisherRelation::LinkedEntity, 1.0)
}

fn artist_catalog(candidates: &[Candidate]) -> Option<ResolvedPublisher> {
    best_at_level(candidates, PublisherRelation::ArtistCatalog, ARTIST_CATALOG_FACTOR)
}
