//! Batch identification
//!
//! Sequential loop over a job's pending tracks. One track failing never
//! aborts the batch; it increments the error counter and the loop moves on.

use crate::models::{BatchStats, IdentificationStatus, Track};
use crate::pipeline::cascade::IdentificationCascade;

pub struct BatchRunner {
    cascade: IdentificationCascade,
}

impl BatchRunner {
    pub fn new(cascade: IdentificationCascade) -> Self {
        Self { cascade }
    }

    /// Identify every track, accumulating per-tier counters
    pub async fn run(&self, tracks: &[Track]) -> BatchStats {
        let mut stats = BatchStats::default();

        for track in tracks {
            stats.total_processed += 1;
            match self.cascade.identify(track).await {
                Ok(resolution) => match resolution.status {
                    IdentificationStatus::IdentifiedTier1 => stats.tier1_identified += 1,
                    IdentificationStatus::IdentifiedTier2 => stats.tier2_identified += 1,
                    IdentificationStatus::IdentifiedTier3 => stats.tier3_identified += 1,
                    IdentificationStatus::ManualReview => stats.manual_review += 1,
                    IdentificationStatus::Pending => {}
                },
                Err(e) => {
                    stats.errors += 1;
                    tracing::error!(
                        track_id = track.track_id,
                        error = %e,
                        "Track identification failed"
                    );
                }
            }
        }

        tracing::info!(
            total = stats.total_processed,
            tier1 = stats.tier1_identified,
            tier2 = stats.tier2_identified,
            tier3 = stats.tier3_identified,
            manual_review = stats.manual_review,
            errors = stats.errors,
            "Batch identification complete"
        );
        stats
    }
}
