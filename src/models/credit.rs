//! Evidence and credit contracts
//!
//! `Candidate` is the ephemeral output of an evidence source; the scorer
//! folds candidates into a `CreditSet`, which on acceptance becomes durable
//! `SongwriterCredit` rows. Every tier execution is audited through an
//! append-only `IdentificationAttempt`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role a credited person or entity played on a work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateRole {
    Composer,
    Lyricist,
    Writer,
    Arranger,
    Producer,
    Publisher,
}

impl CandidateRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Composer => "composer",
            Self::Lyricist => "lyricist",
            Self::Writer => "writer",
            Self::Arranger => "arranger",
            Self::Producer => "producer",
            Self::Publisher => "publisher",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "composer" => Some(Self::Composer),
            "lyricist" => Some(Self::Lyricist),
            "writer" => Some(Self::Writer),
            "arranger" => Some(Self::Arranger),
            "producer" => Some(Self::Producer),
            "publisher" => Some(Self::Publisher),
            _ => None,
        }
    }
}

/// Provenance level for a publisher candidate, strongest first.
///
/// The scorer's fallback chain tries these in declaration order and stops at
/// the first level that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublisherRelation {
    /// Direct work-to-publisher relationship
    DirectWork,
    /// Publisher-typed entity linked to the same work
    LinkedEntity,
    /// Publisher found on other works by the same artist
    ArtistCatalog,
}

/// One unverified piece of songwriter/publisher evidence from a single source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub role: CandidateRole,
    /// Confidence reported by the source, [0.0, 1.0]
    pub source_confidence: f64,
    /// Which evidence source produced this candidate
    pub source_id: String,
    /// Opaque source response fragment, kept for audit
    pub raw_payload: serde_json::Value,
    /// Title of the recording the source matched, when the source resolved a
    /// recording rather than a direct work lookup
    pub matched_title: Option<String>,
    pub matched_artist: Option<String>,
    pub matched_release: Option<String>,
    pub share_percentage: Option<f64>,
    /// Set for publisher-role candidates only
    pub publisher_relation: Option<PublisherRelation>,
}

impl Candidate {
    pub fn new(
        name: impl Into<String>,
        role: CandidateRole,
        source_confidence: f64,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role,
            source_confidence,
            source_id: source_id.into(),
            raw_payload: serde_json::Value::Null,
            matched_title: None,
            matched_artist: None,
            matched_release: None,
            share_percentage: None,
            publisher_relation: None,
        }
    }

    pub fn with_matched_recording(
        mut self,
        title: impl Into<String>,
        artist: impl Into<String>,
        release: Option<String>,
    ) -> Self {
        self.matched_title = Some(title.into());
        self.matched_artist = Some(artist.into());
        self.matched_release = release;
        self
    }

    pub fn with_publisher_relation(mut self, relation: PublisherRelation) -> Self {
        self.publisher_relation = Some(relation);
        self
    }
}

/// One scored, deduplicated credit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditEntry {
    pub name: String,
    pub role: CandidateRole,
    pub share_percentage: Option<f64>,
    pub publisher: Option<String>,
    /// Aggregate confidence for this entry, [0.0, 1.0]
    pub confidence: f64,
    /// Sources that contributed to this entry
    pub sources: Vec<String>,
}

/// Scored output of merging candidates for one tier attempt
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreditSet {
    pub entries: Vec<CreditEntry>,
    /// Set-level aggregate confidence: mean of entry confidences, 0.0 when empty
    pub confidence: f64,
}

impl CreditSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Immutable audit record of one tier try on one track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentificationAttempt {
    pub track_id: i64,
    /// Tier/source identifier, e.g. "tier1_metadata"
    pub source_used: String,
    /// Human-readable description of the query that was performed
    pub query_performed: String,
    /// Serialized CreditSet, or a short note when nothing was found
    pub result: String,
    pub confidence_score: f64,
    pub attempted_at: DateTime<Utc>,
}

impl IdentificationAttempt {
    pub fn new(
        track_id: i64,
        source_used: impl Into<String>,
        query_performed: impl Into<String>,
        result: impl Into<String>,
        confidence_score: f64,
    ) -> Self {
        Self {
            track_id,
            source_used: source_used.into(),
            query_performed: query_performed.into(),
            result: result.into(),
            confidence_score,
            attempted_at: Utc::now(),
        }
    }
}

/// Durable accepted credit row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongwriterCredit {
    pub track_id: i64,
    pub songwriter_name: String,
    pub role: CandidateRole,
    pub share_percentage: Option<f64>,
    pub publisher_name: Option<String>,
    /// Tier/source that produced this credit
    pub source_of_info: String,
    pub confidence_score: f64,
}
