//! Configuration for songwriter-id
//!
//! The pipeline is fully driven by an immutable `PipelineConfig` value loaded
//! once at startup and passed into the cascade and scheduler at construction.
//! Concurrent jobs therefore cannot observe each other's configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Complete service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub scheduler: SchedulerConfig,
    pub tier1: TierConfig,
    pub tier2: TierConfig,
    pub tier3: TierConfig,
    pub scorer: ScorerConfig,
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address for the HTTP surface
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5750".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/songwriter.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Directory holding job and status files (the durable queue)
    pub jobs_dir: String,
    /// Bounded sleep between scans of an empty jobs directory
    pub poll_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            jobs_dir: "data/jobs".to_string(),
            poll_interval_secs: 5,
        }
    }
}

/// Per-tier identification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    pub enabled: bool,
    /// Minimum aggregate confidence for this tier to accept
    pub confidence_threshold: f64,
    /// Evidence source names consulted by this tier
    pub sources: Vec<String>,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            confidence_threshold: 0.7,
            sources: Vec::new(),
        }
    }
}

impl TierConfig {
    fn with_threshold(threshold: f64, sources: &[&str]) -> Self {
        Self {
            enabled: true,
            confidence_threshold: threshold,
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Policy for share percentages that do not sum to 100 per role-class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharePolicy {
    /// Accept values as reported by the source
    Accept,
    /// Rescale an over-allocated role-class down to 100
    Clamp,
    /// Keep the values but log a warning
    Flag,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Bonus applied when two or more independent sources agree on a credit
    pub agreement_bonus: f64,
    /// Per-source confidence multipliers (source_id -> weight, default 1.0)
    pub weights: HashMap<String, f64>,
    pub share_policy: SharePolicy,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            agreement_bonus: 0.10,
            weights: HashMap::new(),
            share_policy: SharePolicy::Accept,
        }
    }
}

impl ScorerConfig {
    /// Weight for a source, defaulting to 1.0 when unconfigured
    pub fn weight(&self, source_id: &str) -> f64 {
        self.weights.get(source_id).copied().unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Per-call timeout for evidence source queries
    pub timeout_secs: u64,
    /// AcoustID API key (tier 3 is skipped for fingerprint lookups without it)
    pub acoustid_api_key: Option<String>,
    /// MusicBrainz web service base URL (override for testing)
    pub musicbrainz_base_url: Option<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            acoustid_api_key: None,
            musicbrainz_base_url: None,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            scheduler: SchedulerConfig::default(),
            tier1: TierConfig::with_threshold(0.7, &["musicbrainz"]),
            tier2: TierConfig::with_threshold(0.5, &["fuzzy"]),
            tier3: TierConfig::with_threshold(0.6, &["acoustid"]),
            scorer: ScorerConfig::default(),
            sources: SourcesConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Built-in defaults matching the documented tier thresholds
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file, falling back to builtin defaults
    /// when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(
                config = %path.display(),
                "Configuration file not found, using default settings"
            );
            return Ok(Self::builtin());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read config failed: {}", e)))?;
        let config: PipelineConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse config failed: {}", e)))?;

        config.validate()?;
        tracing::info!(config = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Validate threshold ranges
    pub fn validate(&self) -> Result<()> {
        for (name, tier) in [
            ("tier1", &self.tier1),
            ("tier2", &self.tier2),
            ("tier3", &self.tier3),
        ] {
            if !(0.0..=1.0).contains(&tier.confidence_threshold) {
                return Err(Error::Config(format!(
                    "{}.confidence_threshold out of range: {}",
                    name, tier.confidence_threshold
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.scorer.agreement_bonus) {
            return Err(Error::Config(format!(
                "scorer.agreement_bonus out of range: {}",
                self.scorer.agreement_bonus
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_defaults_match_documented_thresholds() {
        let config = PipelineConfig::builtin();
        assert_eq!(config.tier1.confidence_threshold, 0.7);
        assert_eq!(config.tier2.confidence_threshold, 0.5);
        assert_eq!(config.tier3.confidence_threshold, 0.6);
        assert!(config.tier1.enabled);
        assert_eq!(config.scheduler.poll_interval_secs, 5);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [tier2]
            enabled = false

            [scorer]
            agreement_bonus = 0.2
            share_policy = "clamp"

            [scorer.weights]
            musicbrainz = 0.9
            "#,
        )
        .unwrap();

        assert!(!config.tier2.enabled);
        assert_eq!(config.scorer.agreement_bonus, 0.2);
        assert_eq!(config.scorer.share_policy, SharePolicy::Clamp);
        assert_eq!(config.scorer.weight("musicbrainz"), 0.9);
        assert_eq!(config.scorer.weight("acoustid"), 1.0);
        // untouched sections keep defaults
        assert_eq!(config.scheduler.jobs_dir, "data/jobs");
        assert_eq!(config.tier1.sources, vec!["musicbrainz"]);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [tier1]
            confidence_threshold = 1.5
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }
}
