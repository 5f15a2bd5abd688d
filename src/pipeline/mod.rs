//! Identification pipeline
//!
//! Tier strategies wrap evidence sources and decide acceptance against their
//! thresholds; the cascade drives one track through the tiers to a terminal
//! status; the batch runner drives a whole catalog's pending tracks.

pub mod batch;
pub mod cascade;
pub mod tiers;

pub use batch::BatchRunner;
pub use cascade::{IdentificationCascade, TierSlot};
pub use tiers::{TierOutcome, TierStrategy};

use crate::config::{PipelineConfig, TierConfig};
use crate::scoring::ConfidenceScorer;
use crate::sources::EvidenceSource;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Evidence sources available to the tiers, keyed by their stable id
pub type SourceRegistry = HashMap<String, Arc<dyn EvidenceSource>>;

/// Wire the configured tiers to their sources.
///
/// Unknown source names log a warning and are ignored; a tier with no
/// resolvable sources still runs (and finds nothing), keeping the cascade
/// shape independent of which sources are configured.
pub fn build_tiers(
    config: &PipelineConfig,
    registry: &SourceRegistry,
    scorer: Arc<ConfidenceScorer>,
) -> Vec<TierSlot> {
    let timeout = Duration::from_secs(config.sources.timeout_secs);

    vec![
        TierSlot {
            strategy: Arc::new(tiers::MetadataTier::new(
                resolve_sources("tier1", &config.tier1, registry),
                scorer.clone(),
                config.tier1.confidence_threshold,
                timeout,
            )),
            enabled: config.tier1.enabled,
        },
        TierSlot {
            strategy: Arc::new(tiers::EnhancedTier::new(
                resolve_sources("tier2", &config.tier2, registry),
                scorer.clone(),
                config.tier2.confidence_threshold,
                timeout,
            )),
            enabled: config.tier2.enabled,
        },
        TierSlot {
            strategy: Arc::new(tiers::AudioTier::new(
                resolve_sources("tier3", &config.tier3, registry),
                scorer,
                config.tier3.confidence_threshold,
                timeout,
            )),
            enabled: config.tier3.enabled,
        },
    ]
}

fn resolve_sources(
    tier: &str,
    config: &TierConfig,
    registry: &SourceRegistry,
) -> Vec<Arc<dyn EvidenceSource>> {
    let mut sources = Vec::new();
    for name in &config.sources {
        match registry.get(name) {
            Some(source) => sources.push(Arc::clone(source)),
            None => {
                tracing::warn!(tier, source = %name, "Unknown evidence source name, ignoring");
            }
        }
    }
    sources
}
