//! Track records (one row per catalog entry)

use serde::{Deserialize, Serialize};

/// Where a track stands in the identification cascade.
///
/// Mutated only by the cascade (and by human review, which is outside this
/// service). Tracks are never deleted here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentificationStatus {
    Pending,
    IdentifiedTier1,
    IdentifiedTier2,
    IdentifiedTier3,
    ManualReview,
}

impl IdentificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::IdentifiedTier1 => "identified_tier1",
            Self::IdentifiedTier2 => "identified_tier2",
            Self::IdentifiedTier3 => "identified_tier3",
            Self::ManualReview => "manual_review",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "identified_tier1" => Some(Self::IdentifiedTier1),
            "identified_tier2" => Some(Self::IdentifiedTier2),
            "identified_tier3" => Some(Self::IdentifiedTier3),
            "manual_review" => Some(Self::ManualReview),
            _ => None,
        }
    }
}

/// A music track in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub track_id: i64,
    pub title: String,
    pub artist_name: String,
    pub release_title: Option<String>,
    /// Duration as imported from the catalog (free-form, e.g. "3:41")
    pub duration: Option<String>,
    /// Normalized ISRC (12 uppercase alphanumerics) when the catalog carried one
    pub isrc: Option<String>,
    /// Resolved path to a local audio file, when available (enables tier 3)
    pub audio_path: Option<String>,
    pub identification_status: IdentificationStatus,
    /// Aggregate confidence of the accepted result, or the best observed
    /// confidence for manual_review tracks
    pub confidence_score: f64,
}

impl Track {
    /// New pending track, not yet persisted (track_id assigned on insert)
    pub fn new(title: impl Into<String>, artist_name: impl Into<String>) -> Self {
        Self {
            track_id: 0,
            title: title.into(),
            artist_name: artist_name.into(),
            release_title: None,
            duration: None,
            isrc: None,
            audio_path: None,
            identification_status: IdentificationStatus::Pending,
            confidence_score: 0.0,
        }
    }
}
