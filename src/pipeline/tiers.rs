//! Tier strategies
//!
//! Each tier consults its evidence sources, scores whatever came back, and
//! decides acceptance against its configured threshold. Source failures and
//! per-call timeouts are absorbed here; only malformed evidence propagates.

use crate::error::Result;
use crate::models::{Candidate, CreditSet, IdentificationAttempt, IdentificationStatus, Track};
use crate::scoring::ConfidenceScorer;
use crate::sources::EvidenceSource;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Minimum evidence confidence when the track was resolved through its ISRC
const ISRC_CONFIDENCE_FLOOR: f64 = 0.9;

/// Result of one tier execution on one track
#[derive(Debug, Clone)]
pub struct TierOutcome {
    /// Whether the tier's threshold was met
    pub accepted: bool,
    pub credit_set: CreditSet,
    /// Audit row for this execution, appended regardless of acceptance
    pub attempt: IdentificationAttempt,
}

/// One rung of the identification cascade
#[async_trait]
pub trait TierStrategy: Send + Sync {
    /// Stable tier identifier, used as `source_used` on attempt rows
    fn name(&self) -> &'static str;

    /// Status a track gets when this tier accepts
    fn accepted_status(&self) -> IdentificationStatus;

    /// Whether the tier can run on this track at all. Inapplicable tiers are
    /// skipped silently (no attempt row).
    fn applies(&self, _track: &Track) -> bool {
        true
    }

    /// Execute the tier. Returns `Err` only for malformed evidence; source
    /// trouble yields an unaccepted outcome instead.
    async fn attempt(&self, track: &Track) -> Result<TierOutcome>;
}

/// Query every source under a per-call timeout, absorbing failures
async fn collect_candidates(
    sources: &[Arc<dyn EvidenceSource>],
    track: &Track,
    timeout: Duration,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for source in sources {
        match tokio::time::timeout(timeout, source.find_candidates(track)).await {
            Ok(Ok(found)) => {
                tracing::debug!(
                    track_id = track.track_id,
                    source = source.id(),
                    count = found.len(),
                    "Source returned candidates"
                );
                candidates.extend(found);
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    track_id = track.track_id,
                    source = source.id(),
                    error = %e,
                    "Source failed, treating as no candidates"
                );
            }
            Err(_) => {
                tracing::warn!(
                    track_id = track.track_id,
                    source = source.id(),
                    timeout_secs = timeout.as_secs(),
                    "Source timed out, treating as no candidates"
                );
            }
        }
    }
    candidates
}

fn describe_query(track: &Track, by_isrc: bool) -> String {
    if by_isrc {
        if let Some(isrc) = &track.isrc {
            return format!("isrc={}", isrc);
        }
    }
    format!("title=\"{}\" artist=\"{}\"", track.title, track.artist_name)
}

fn outcome(
    tier_name: &'static str,
    track: &Track,
    query: String,
    credit_set: CreditSet,
    threshold: f64,
) -> TierOutcome {
    let accepted = !credit_set.is_empty() && credit_set.confidence >= threshold;
    let result = if credit_set.is_empty() {
        "No results found".to_string()
    } else {
        serde_json::to_string(&credit_set).unwrap_or_else(|_| "No results found".to_string())
    };
    let attempt = IdentificationAttempt::new(
        track.track_id,
        tier_name,
        query,
        result,
        credit_set.confidence,
    );
    TierOutcome {
        accepted,
        credit_set,
        attempt,
    }
}

/// Tier 1: direct metadata lookup (ISRC when present, else title + artist)
pub struct MetadataTier {
    sources: Vec<Arc<dyn EvidenceSource>>,
    scorer: Arc<ConfidenceScorer>,
    threshold: f64,
    timeout: Duration,
}

impl MetadataTier {
    pub fn new(
        sources: Vec<Arc<dyn EvidenceSource>>,
        scorer: Arc<ConfidenceScorer>,
        threshold: f64,
        timeout: Duration,
    ) -> Self {
        Self {
            sources,
            scorer,
            threshold,
            timeout,
        }
    }
}

#[async_trait]
impl TierStrategy for MetadataTier {
    fn name(&self) -> &'static str {
        "tier1_metadata"
    }

    fn accepted_status(&self) -> IdentificationStatus {
        IdentificationStatus::IdentifiedTier1
    }

    async fn attempt(&self, track: &Track) -> Result<TierOutcome> {
        let mut candidates = collect_candidates(&self.sources, track, self.timeout).await;

        // An ISRC match is near-authoritative regardless of what the source
        // reported for its own lookup path
        if track.isrc.is_some() {
            for candidate in &mut candidates {
                if candidate.source_confidence < ISRC_CONFIDENCE_FLOOR {
                    candidate.source_confidence = ISRC_CONFIDENCE_FLOOR;
                }
            }
        }

        let credit_set = self.scorer.score(&candidates, track)?;
        Ok(outcome(
            self.name(),
            track,
            describe_query(track, track.isrc.is_some()),
            credit_set,
            self.threshold,
        ))
    }
}

/// Tier 2: relaxed fuzzy matching over the same metadata
pub struct EnhancedTier {
    sources: Vec<Arc<dyn EvidenceSource>>,
    scorer: Arc<ConfidenceScorer>,
    threshold: f64,
    timeout: Duration,
}

impl EnhancedTier {
    pub fn new(
        sources: Vec<Arc<dyn EvidenceSource>>,
        scorer: Arc<ConfidenceScorer>,
        threshold: f64,
        timeout: Duration,
    ) -> Self {
        Self {
            sources,
            scorer,
            threshold,
            timeout,
        }
    }
}

#[async_trait]
impl TierStrategy for EnhancedTier {
    fn name(&self) -> &'static str {
        "tier2_enhanced"
    }

    fn accepted_status(&self) -> IdentificationStatus {
        IdentificationStatus::IdentifiedTier2
    }

    async fn attempt(&self, track: &Track) -> Result<TierOutcome> {
        let candidates = collect_candidates(&self.sources, track, self.timeout).await;
        let credit_set = self.scorer.score(&candidates, track)?;
        Ok(outcome(
            self.name(),
            track,
            describe_query(track, false),
            credit_set,
            self.threshold,
        ))
    }
}

/// Tier 3: audio fingerprint lookup. Only applies when the track has a
/// resolvable local audio file.
pub struct AudioTier {
    sources: Vec<Arc<dyn EvidenceSource>>,
    scorer: Arc<ConfidenceScorer>,
    threshold: f64,
    timeout: Duration,
}

impl AudioTier {
    pub fn new(
        sources: Vec<Arc<dyn EvidenceSource>>,
        scorer: Arc<ConfidenceScorer>,
        threshold: f64,
        timeout: Duration,
    ) -> Self {
        Self {
            sources,
            scorer,
            threshold,
            timeout,
        }
    }
}

#[async_trait]
impl TierStrategy for AudioTier {
    fn name(&self) -> &'static str {
        "tier3_audio"
    }

    fn accepted_status(&self) -> IdentificationStatus {
        IdentificationStatus::IdentifiedTier3
    }

    fn applies(&self, track: &Track) -> bool {
        track
            .audio_path
            .as_deref()
            .is_some_and(|p| Path::new(p).exists())
    }

    async fn attempt(&self, track: &Track) -> Result<TierOutcome> {
        let candidates = collect_candidates(&self.sources, track, self.timeout).await;
        let credit_set = self.scorer.score(&candidates, track)?;
        let query = format!(
            "fingerprint audio_path=\"{}\"",
            track.audio_path.as_deref().unwrap_or_default()
        );
        Ok(outcome(self.name(), track, query, credit_set, self.threshold))
    }
}

/// Tier 4: routes the track to human review. Never accepts.
pub struct ManualReviewTier;

#[async_trait]
impl TierStrategy for ManualReviewTier {
    fn name(&self) -> &'static str {
        "manual_review"
    }

    fn accepted_status(&self) -> IdentificationStatus {
        IdentificationStatus::ManualReview
    }

    async fn attempt(&self, track: &Track) -> Result<TierOutcome> {
        let attempt = IdentificationAttempt::new(
            track.track_id,
            self.name(),
            describe_query(track, false),
            "Routed to manual review".to_string(),
            0.0,
        );
        Ok(TierOutcome {
            accepted: false,
            credit_set: CreditSet::empty(),
            attempt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScorerConfig;
    use crate::models::CandidateRole;
    use crate::sources::{SourceError, SourceResult};

    struct FixedSource {
        id: &'static str,
        candidates: Vec<Candidate>,
    }

    #[async_trait]
    impl EvidenceSource for FixedSource {
        fn id(&self) -> &'static str {
            self.id
        }
        async fn find_candidates(&self, _track: &Track) -> SourceResult<Vec<Candidate>> {
            Ok(self.candidates.clone())
        }
    }

    struct StalledSource;

    #[async_trait]
    impl EvidenceSource for StalledSource {
        fn id(&self) -> &'static str {
            "stalled"
        }
        async fn find_candidates(&self, _track: &Track) -> SourceResult<Vec<Candidate>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl EvidenceSource for FailingSource {
        fn id(&self) -> &'static str {
            "failing"
        }
        async fn find_candidates(&self, _track: &Track) -> SourceResult<Vec<Candidate>> {
            Err(SourceError::Unavailable("connection refused".into()))
        }
    }

    fn scorer() -> Arc<ConfidenceScorer> {
        Arc::new(ConfidenceScorer::new(ScorerConfig::default()))
    }

    fn track_with_isrc() -> Track {
        let mut track = Track::new("Yesterday", "The Beatles");
        track.track_id = 1;
        track.isrc = Some("GBAYE6500521".to_string());
        track
    }

    #[tokio::test]
    async fn isrc_floor_lifts_weak_evidence() {
        let source = Arc::new(FixedSource {
            id: "musicbrainz",
            candidates: vec![Candidate::new(
                "Paul McCartney",
                CandidateRole::Composer,
                0.4,
                "musicbrainz",
            )],
        });
        let tier = MetadataTier::new(vec![source], scorer(), 0.7, Duration::from_secs(5));
        let outcome = tier.attempt(&track_with_isrc()).await.unwrap();
        assert!(outcome.accepted, "floored ISRC evidence should clear 0.7");
        assert!(outcome.credit_set.confidence >= 0.9);
    }

    #[tokio::test]
    async fn source_failure_becomes_unaccepted_outcome() {
        let tier = MetadataTier::new(
            vec![Arc::new(FailingSource)],
            scorer(),
            0.7,
            Duration::from_secs(5),
        );
        let outcome = tier.attempt(&track_with_isrc()).await.unwrap();
        assert!(!outcome.accepted);
        assert!(outcome.credit_set.is_empty());
        assert_eq!(outcome.attempt.result, "No results found");
    }

    #[tokio::test]
    async fn source_timeout_becomes_unaccepted_outcome() {
        let tier = MetadataTier::new(
            vec![Arc::new(StalledSource)],
            scorer(),
            0.7,
            Duration::from_millis(50),
        );
        let outcome = tier.attempt(&track_with_isrc()).await.unwrap();
        assert!(!outcome.accepted);
        assert!(outcome.credit_set.is_empty());
        assert_eq!(outcome.attempt.result, "No results found");
    }

    #[tokio::test]
    async fn timed_out_source_does_not_block_other_sources() {
        let fixed = Arc::new(FixedSource {
            id: "musicbrainz",
            candidates: vec![Candidate::new(
                "Paul McCartney",
                CandidateRole::Composer,
                0.95,
                "musicbrainz",
            )],
        });
        let tier = MetadataTier::new(
            vec![Arc::new(StalledSource), fixed],
            scorer(),
            0.7,
            Duration::from_millis(50),
        );
        let outcome = tier.attempt(&track_with_isrc()).await.unwrap();
        assert!(outcome.accepted, "evidence from the live source still counts");
    }

    #[tokio::test]
    async fn audio_tier_does_not_apply_without_audio() {
        let tier = AudioTier::new(vec![], scorer(), 0.6, Duration::from_secs(5));
        let track = Track::new("Song", "Someone");
        assert!(!tier.applies(&track));

        let mut with_missing = track.clone();
        with_missing.audio_path = Some("/no/such/file.flac".to_string());
        assert!(!tier.applies(&with_missing));
    }

    #[tokio::test]
    async fn manual_review_never_accepts() {
        let tier = ManualReviewTier;
        let outcome = tier.attempt(&track_with_isrc()).await.unwrap();
        assert!(!outcome.accepted);
        assert_eq!(tier.accepted_status(), IdentificationStatus::ManualReview);
    }
}
