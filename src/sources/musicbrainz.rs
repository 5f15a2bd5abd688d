//! MusicBrainz evidence source
//!
//! Queries the MusicBrainz web service for writer and publisher credits.
//! Lookup strategy: ISRC when the track carries one, otherwise a recording
//! search on title + artist; matched recordings are then fetched with work
//! relations and the artist/label relations on those works yield candidates.
//!
//! MusicBrainz allows one request per second for anonymous clients, enforced
//! here with a client-side rate limiter.

use crate::config::SourcesConfig;
use crate::models::{Candidate, CandidateRole, PublisherRelation, Track};
use crate::sources::{EvidenceSource, SourceError, SourceResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const DEFAULT_BASE_URL: &str = "https://musicbrainz.org/ws/2";
const USER_AGENT: &str = "songwriter-id/0.1.0 (https://github.com/songwriter-id)";
const RATE_LIMIT_MS: u64 = 1000;

/// Recordings fetched in full (with work relations) per track query
const MAX_RECORDING_LOOKUPS: usize = 3;

/// Rate limiter enforcing a minimum interval between requests
pub(crate) struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub(crate) fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    pub(crate) async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

// ---------------------------------------------------------------------------
// Wire types (subset of the MusicBrainz JSON schema we consume)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MbRecording {
    pub id: String,
    pub title: String,
    /// Search score (0-100), present on search results only
    pub score: Option<i32>,
    #[serde(rename = "artist-credit", default)]
    pub artist_credit: Vec<MbArtistCredit>,
    #[serde(default)]
    pub releases: Option<Vec<MbRelease>>,
    #[serde(default)]
    pub relations: Option<Vec<MbRelation>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MbArtistCredit {
    pub name: String,
    pub artist: MbArtistRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MbArtistRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MbRelease {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MbRelation {
    #[serde(rename = "type")]
    pub relation_type: String,
    #[serde(default)]
    pub work: Option<MbWork>,
    #[serde(default)]
    pub artist: Option<MbArtistRef>,
    #[serde(default)]
    pub label: Option<MbLabelRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MbWork {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub relations: Option<Vec<MbRelation>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MbLabelRef {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub label_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    recordings: Vec<MbRecording>,
}

#[derive(Debug, Deserialize)]
struct IsrcResponse {
    #[serde(default)]
    recordings: Vec<MbRecording>,
}

#[derive(Debug, Deserialize)]
struct WorkBrowseResponse {
    #[serde(default)]
    works: Vec<MbWork>,
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

pub struct MusicBrainzSource {
    http_client: reqwest::Client,
    rate_limiter: RateLimiter,
    base_url: String,
}

impl MusicBrainzSource {
    pub fn new(config: &SourcesConfig) -> SourceResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::new(RATE_LIMIT_MS),
            base_url: config
                .musicbrainz_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> SourceResult<T> {
        self.rate_limiter.wait().await;

        tracing::debug!(url = %url, "Querying MusicBrainz");
        let response = self
            .http_client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 503 {
            return Err(SourceError::RateLimited);
        }
        if status.as_u16() == 404 {
            // Entity not found is "no evidence", surfaced by the caller
            return Err(SourceError::InvalidResponse("not found".to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Unavailable(format!(
                "MusicBrainz returned {}: {}",
                status, body
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))
    }

    /// Recordings for an ISRC (treated as near-certain matches)
    async fn recordings_by_isrc(&self, isrc: &str) -> SourceResult<Vec<MbRecording>> {
        let url = format!("{}/isrc/{}", self.base_url, isrc);
        let params = [("inc", "artist-credits"), ("fmt", "json")];
        match self.get_json::<IsrcResponse>(&url, &params).await {
            Ok(response) => Ok(response.recordings),
            Err(SourceError::InvalidResponse(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Search recordings by title + artist
    pub(crate) async fn search_recordings(
        &self,
        query: &str,
        limit: usize,
    ) -> SourceResult<Vec<MbRecording>> {
        let url = format!("{}/recording", self.base_url);
        let limit = limit.to_string();
        let params = [("query", query), ("limit", &limit), ("fmt", "json")];
        Ok(self
            .get_json::<SearchResponse>(&url, &params)
            .await?
            .recordings)
    }

    /// Fetch one recording with its work-level credit relations
    pub(crate) async fn lookup_recording(&self, mbid: &str) -> SourceResult<MbRecording> {
        let url = format!("{}/recording/{}", self.base_url, mbid);
        let params = [
            (
                "inc",
                "artist-credits+releases+work-rels+work-level-rels+artist-rels+label-rels",
            ),
            ("fmt", "json"),
        ];
        self.get_json(&url, &params).await
    }

    /// Publishers on other works by the same artist (fallback evidence)
    async fn browse_artist_work_publishers(
        &self,
        artist_mbid: &str,
    ) -> SourceResult<Vec<Candidate>> {
        let url = format!("{}/work", self.base_url);
        let params = [
            ("artist", artist_mbid),
            ("inc", "label-rels"),
            ("limit", "20"),
            ("fmt", "json"),
        ];
        let works = self
            .get_json::<WorkBrowseResponse>(&url, &params)
            .await?
            .works;

        let mut candidates = Vec::new();
        for work in &works {
            for relation in work.relations.iter().flatten() {
                if let Some(label) = publisher_label(relation) {
                    candidates.push(
                        Candidate::new(&label.name, CandidateRole::Publisher, 0.9, "musicbrainz")
                            .with_publisher_relation(PublisherRelation::ArtistCatalog),
                    );
                }
            }
        }
        Ok(candidates)
    }

    /// Extract credit candidates from a fully-fetched recording
    pub(crate) fn candidates_from_recording(
        &self,
        recording: &MbRecording,
        match_confidence: f64,
        source_id: &str,
    ) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        let matched_artist = recording
            .artist_credit
            .first()
            .map(|ac| ac.name.clone())
            .unwrap_or_default();
        let matched_release = recording
            .releases
            .as_ref()
            .and_then(|r| r.first())
            .map(|r| r.title.clone());

        let mut push = |name: &str, role: CandidateRole, relation: Option<PublisherRelation>| {
            let mut candidate = Candidate::new(name, role, match_confidence, source_id)
                .with_matched_recording(
                    &recording.title,
                    &matched_artist,
                    matched_release.clone(),
                );
            candidate.publisher_relation = relation;
            candidate.raw_payload = serde_json::json!({
                "recording_mbid": recording.id,
                "recording_title": recording.title,
            });
            candidates.push(candidate);
        };

        for relation in recording.relations.iter().flatten() {
            // Recording-level artist relations (e.g. producer)
            if let (Some(role), Some(artist)) =
                (map_role(&relation.relation_type), relation.artist.as_ref())
            {
                push(&artist.name, role, None);
            }

            // Work-level relations carry the writer and publisher credits
            if let Some(ref work) = relation.work {
                for work_rel in work.relations.iter().flatten() {
                    if let (Some(role), Some(artist)) =
                        (map_role(&work_rel.relation_type), work_rel.artist.as_ref())
                    {
                        push(&artist.name, role, None);
                    }
                    if let Some(label) = publisher_label(work_rel) {
                        let relation_level =
                            if work_rel.relation_type.to_lowercase().contains("publish") {
                                PublisherRelation::DirectWork
                            } else {
                                PublisherRelation::LinkedEntity
                            };
                        push(&label.name, CandidateRole::Publisher, Some(relation_level));
                    }
                }
            }
        }

        candidates
    }
}

#[async_trait]
impl EvidenceSource for MusicBrainzSource {
    fn id(&self) -> &'static str {
        "musicbrainz"
    }

    async fn find_candidates(&self, track: &Track) -> SourceResult<Vec<Candidate>> {
        let recordings = match track.isrc {
            Some(ref isrc) => {
                let recordings = self.recordings_by_isrc(isrc).await?;
                // ISRC is the primary identifier: matches are near-certain
                recordings
                    .into_iter()
                    .map(|r| (r, 0.95))
                    .collect::<Vec<_>>()
            }
            None => {
                let query = format!(
                    "artist:\"{}\" AND recording:\"{}\"",
                    track.artist_name, track.title
                );
                self.search_recordings(&query, 5)
                    .await?
                    .into_iter()
                    .map(|r| {
                        let confidence = (r.score.unwrap_or(0) as f64 / 100.0).clamp(0.0, 1.0);
                        (r, confidence)
                    })
                    .filter(|(_, c)| *c > 0.0)
                    .collect()
            }
        };

        let mut candidates = Vec::new();
        let mut artist_mbid: Option<String> = None;

        for (recording, match_confidence) in recordings.into_iter().take(MAX_RECORDING_LOOKUPS) {
            let full = match self.lookup_recording(&recording.id).await {
                Ok(full) => full,
                Err(SourceError::InvalidResponse(_)) => continue,
                Err(e) => return Err(e),
            };
            if artist_mbid.is_none() {
                artist_mbid = full.artist_credit.first().map(|ac| ac.artist.id.clone());
            }
            candidates.extend(self.candidates_from_recording(&full, match_confidence, self.id()));
        }

        // No publisher evidence on the matched works: fall back to the
        // artist's wider catalog at reduced provenance
        let has_publisher = candidates
            .iter()
            .any(|c| c.role == CandidateRole::Publisher);
        if !has_publisher {
            if let Some(ref mbid) = artist_mbid {
                match self.browse_artist_work_publishers(mbid).await {
                    Ok(fallback) => candidates.extend(fallback),
                    Err(e) => {
                        tracing::warn!(error = %e, "Artist catalog publisher browse failed");
                    }
                }
            }
        }

        tracing::debug!(
            track_id = track.track_id,
            candidates = candidates.len(),
            "MusicBrainz evidence gathered"
        );
        Ok(candidates)
    }
}

/// Map a MusicBrainz relation type onto a credit role
pub(crate) fn map_role(relation_type: &str) -> Option<CandidateRole> {
    match relation_type.to_lowercase().as_str() {
        "composer" => Some(CandidateRole::Composer),
        "lyricist" => Some(CandidateRole::Lyricist),
        "writer" => Some(CandidateRole::Writer),
        "arranger" => Some(CandidateRole::Arranger),
        "producer" => Some(CandidateRole::Producer),
        _ => None,
    }
}

fn publisher_label(relation: &MbRelation) -> Option<&MbLabelRef> {
    let label = relation.label.as_ref()?;
    let by_relation = relation.relation_type.to_lowercase().contains("publish");
    let by_label_type = label
        .label_type
        .as_deref()
        .map(|t| t.to_lowercase().contains("publish"))
        .unwrap_or(false);
    if by_relation || by_label_type {
        Some(label)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_types_map_to_roles() {
        assert_eq!(map_role("composer"), Some(CandidateRole::Composer));
        assert_eq!(map_role("Lyricist"), Some(CandidateRole::Lyricist));
        assert_eq!(map_role("performance"), None);
    }

    #[test]
    fn work_publisher_relations_become_direct_work_candidates() {
        let recording: MbRecording = serde_json::from_value(serde_json::json!({
            "id": "rec-1",
            "title": "Unforgettable",
            "artist-credit": [{"name": "Nat King Cole", "artist": {"id": "a-1", "name": "Nat King Cole"}}],
            "releases": [{"title": "Unforgettable"}],
            "relations": [{
                "type": "performance",
                "work": {
                    "id": "w-1",
                    "title": "Unforgettable",
                    "relations": [
                        {"type": "composer", "artist": {"id": "a-2", "name": "Irving Gordon"}},
                        {"type": "publishing", "label": {"id": "l-1", "name": "Bourne Co.", "type": "Publisher"}}
                    ]
                }
            }]
        }))
        .unwrap();

        let source = MusicBrainzSource::new(&crate::config::SourcesConfig::default()).unwrap();
        let candidates = source.candidates_from_recording(&recording, 0.95, "musicbrainz");

        let composer = candidates
            .iter()
            .find(|c| c.role == CandidateRole::Composer)
            .unwrap();
        assert_eq!(composer.name, "Irving Gordon");
        assert_eq!(composer.matched_title.as_deref(), Some("Unforgettable"));

        let publisher = candidates
            .iter()
            .find(|c| c.role == CandidateRole::Publisher)
            .unwrap();
        assert_eq!(publisher.name, "Bourne Co.");
        assert_eq!(
            publisher.publisher_relation,
            Some(PublisherRelation::DirectWork)
        );
    }
}
