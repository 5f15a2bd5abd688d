//! Fuzzy search evidence source
//!
//! Tier 2 re-queries MusicBrainz with a relaxed query (no exact phrase
//! constraints) and re-scores the results through the entity resolver, so
//! catalogs with noisy titles ("Unforgettable (Remastered 2000)") or artist
//! variants still find their work.

use crate::models::{Candidate, Track};
use crate::sources::musicbrainz::MusicBrainzSource;
use crate::sources::resolver::EntityResolver;
use crate::sources::{EvidenceSource, SourceError, SourceResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Relaxed matches never reach full confidence on their own
const RELAXED_FACTOR: f64 = 0.85;

/// Recordings fetched in full per fuzzy query
const MAX_RECORDING_LOOKUPS: usize = 3;

/// Search hits below this blended entity score are discarded outright
const MIN_MATCH_SCORE: f64 = 0.65;

pub struct FuzzySearchSource {
    mb: Arc<MusicBrainzSource>,
    resolver: EntityResolver,
}

impl FuzzySearchSource {
    pub fn new(mb: Arc<MusicBrainzSource>) -> Self {
        Self {
            mb,
            resolver: EntityResolver::default(),
        }
    }

    /// Blend of title and artist entity-resolution scores for a search hit
    fn match_score(&self, track: &Track, title: &str, artist: &str) -> f64 {
        let title_score = self.resolver.predict(&track.title, title);
        let artist_score = self.resolver.predict(&track.artist_name, artist);
        0.6 * title_score + 0.4 * artist_score
    }
}

#[async_trait]
impl EvidenceSource for FuzzySearchSource {
    fn id(&self) -> &'static str {
        "fuzzy"
    }

    async fn find_candidates(&self, track: &Track) -> SourceResult<Vec<Candidate>> {
        // Unquoted terms let the search engine match token-by-token
        let query = format!("{} {}", track.title, track.artist_name);
        let results = self.mb.search_recordings(&query, 10).await?;

        let mut scored: Vec<(String, f64)> = results
            .iter()
            .map(|r| {
                let artist = r
                    .artist_credit
                    .first()
                    .map(|ac| ac.name.as_str())
                    .unwrap_or("");
                (r.id.clone(), self.match_score(track, &r.title, artist))
            })
            .filter(|(_, score)| *score >= MIN_MATCH_SCORE)
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut candidates = Vec::new();
        for (mbid, score) in scored.into_iter().take(MAX_RECORDING_LOOKUPS) {
            let full = match self.mb.lookup_recording(&mbid).await {
                Ok(full) => full,
                Err(SourceError::InvalidResponse(_)) => continue,
                Err(e) => return Err(e),
            };
            let confidence = (score * RELAXED_FACTOR).clamp(0.0, 1.0);
            candidates.extend(self.mb.candidates_from_recording(&full, confidence, self.id()));
        }

        tracing::debug!(
            track_id = track.track_id,
            candidates = candidates.len(),
            "Fuzzy search evidence gathered"
        );
        Ok(candidates)
    }
}
