//! Identification cascade
//!
//! Drives one track through the configured tiers in order. Acceptance
//! persists credits before the status flip, so an accepted status always has
//! its credit rows on disk. Exhaustion routes to manual review carrying the
//! best confidence any tier observed.

use crate::db::RecordStore;
use crate::error::Result;
use crate::models::{
    CreditSet, IdentificationStatus, SongwriterCredit, Track,
};
use crate::pipeline::tiers::{ManualReviewTier, TierStrategy};
use std::sync::Arc;

/// One cascade rung with its config-driven enablement
pub struct TierSlot {
    pub strategy: Arc<dyn TierStrategy>,
    pub enabled: bool,
}

/// Terminal result of identifying one track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackResolution {
    pub status: IdentificationStatus,
    pub confidence: f64,
}

pub struct IdentificationCascade {
    tiers: Vec<TierSlot>,
    manual_review: ManualReviewTier,
    store: Arc<dyn RecordStore>,
}

impl IdentificationCascade {
    pub fn new(tiers: Vec<TierSlot>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            tiers,
            manual_review: ManualReviewTier,
            store,
        }
    }

    /// Identify one track, always reaching a terminal status.
    ///
    /// Returns `Err` only for malformed evidence (or storage failure); all
    /// source-side trouble was already absorbed at the tier boundary.
    pub async fn identify(&self, track: &Track) -> Result<TrackResolution> {
        let mut best_confidence: f64 = 0.0;

        for slot in &self.tiers {
            let tier = slot.strategy.as_ref();

            if !slot.enabled {
                let attempt = crate::models::IdentificationAttempt::new(
                    track.track_id,
                    tier.name(),
                    String::new(),
                    "Tier disabled".to_string(),
                    0.0,
                );
                self.store.append_attempt(&attempt).await?;
                continue;
            }

            if !tier.applies(track) {
                tracing::debug!(
                    track_id = track.track_id,
                    tier = tier.name(),
                    "Tier not applicable, skipping"
                );
                continue;
            }

            let outcome = tier.attempt(track).await?;
            self.store.append_attempt(&outcome.attempt).await?;
            best_confidence = best_confidence.max(outcome.credit_set.confidence);

            if outcome.accepted {
                let status = tier.accepted_status();
                let confidence = outcome.credit_set.confidence;
                self.accept(track, tier.name(), &outcome.credit_set).await?;
                self.store
                    .update_track_status(track.track_id, status, confidence)
                    .await?;
                tracing::info!(
                    track_id = track.track_id,
                    tier = tier.name(),
                    confidence,
                    "Track identified"
                );
                return Ok(TrackResolution { status, confidence });
            }
        }

        // Exhausted: route to review with the best confidence observed
        let outcome = self.manual_review.attempt(track).await?;
        self.store.append_attempt(&outcome.attempt).await?;
        self.store
            .update_track_status(
                track.track_id,
                IdentificationStatus::ManualReview,
                best_confidence,
            )
            .await?;
        tracing::info!(
            track_id = track.track_id,
            best_confidence,
            "Track routed to manual review"
        );
        Ok(TrackResolution {
            status: IdentificationStatus::ManualReview,
            confidence: best_confidence,
        })
    }

    /// Persist the accepted credit set (overwrite semantics live in the store)
    async fn accept(&self, track: &Track, tier_name: &str, credit_set: &CreditSet) -> Result<()> {
        let credits: Vec<SongwriterCredit> = credit_set
            .entries
            .iter()
            .map(|entry| SongwriterCredit {
                track_id: track.track_id,
                songwriter_name: entry.name.clone(),
                role: entry.role,
                share_percentage: entry.share_percentage,
                publisher_name: entry.publisher.clone(),
                source_of_info: tier_name.to_string(),
                confidence_score: entry.confidence,
            })
            .collect();
        self.store.save_credits(&credits).await
    }
}
