//! AcoustID evidence source (tier 3, audio content)
//!
//! Fingerprints the track's local audio file with the Chromaprint `fpcalc`
//! tool, looks the fingerprint up against the AcoustID service, then pulls
//! credit relations for the matched recordings from MusicBrainz. Requires an
//! AcoustID API key; without one the source reports itself unavailable.

use crate::config::SourcesConfig;
use crate::models::{Candidate, Track};
use crate::sources::musicbrainz::MusicBrainzSource;
use crate::sources::{EvidenceSource, SourceError, SourceResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const ACOUSTID_LOOKUP_URL: &str = "https://api.acoustid.org/v2/lookup";

/// AcoustID matches below this score are noise
const MIN_MATCH_SCORE: f64 = 0.5;

/// Matched recordings fetched in full per lookup
const MAX_RECORDING_LOOKUPS: usize = 2;

#[derive(Debug, Deserialize)]
struct FpcalcOutput {
    duration: f64,
    fingerprint: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    status: String,
    #[serde(default)]
    results: Vec<LookupResult>,
}

#[derive(Debug, Deserialize)]
struct LookupResult {
    score: f64,
    #[serde(default)]
    recordings: Vec<LookupRecording>,
}

#[derive(Debug, Deserialize)]
struct LookupRecording {
    id: String,
}

pub struct AcoustIdSource {
    http_client: reqwest::Client,
    api_key: String,
    mb: Arc<MusicBrainzSource>,
}

impl AcoustIdSource {
    pub fn new(config: &SourcesConfig, mb: Arc<MusicBrainzSource>) -> SourceResult<Self> {
        let api_key = config
            .acoustid_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                SourceError::Unavailable("AcoustID API key not configured".to_string())
            })?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            mb,
        })
    }

    /// Run `fpcalc -json` on the audio file
    async fn fingerprint(&self, audio_path: &Path) -> SourceResult<FpcalcOutput> {
        let output = tokio::process::Command::new("fpcalc")
            .arg("-json")
            .arg(audio_path)
            .output()
            .await
            .map_err(|e| SourceError::Unavailable(format!("fpcalc not runnable: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SourceError::Unavailable(format!(
                "fpcalc failed for {}: {}",
                audio_path.display(),
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| SourceError::InvalidResponse(format!("fpcalc output: {}", e)))
    }

    async fn lookup(&self, fingerprint: &FpcalcOutput) -> SourceResult<LookupResponse> {
        let response = self
            .http_client
            .get(ACOUSTID_LOOKUP_URL)
            .query(&[
                ("client", self.api_key.as_str()),
                ("meta", "recordingids"),
                ("duration", &format!("{}", fingerprint.duration.round() as i64)),
                ("fingerprint", &fingerprint.fingerprint),
            ])
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        if response.status().as_u16() == 429 {
            return Err(SourceError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(SourceError::Unavailable(format!(
                "AcoustID returned {}",
                response.status()
            )));
        }

        let body: LookupResponse = response
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;
        if body.status != "ok" {
            return Err(SourceError::InvalidResponse(format!(
                "AcoustID status: {}",
                body.status
            )));
        }
        Ok(body)
    }
}

#[async_trait]
impl EvidenceSource for AcoustIdSource {
    fn id(&self) -> &'static str {
        "acoustid"
    }

    async fn find_candidates(&self, track: &Track) -> SourceResult<Vec<Candidate>> {
        let audio_path = match track.audio_path {
            // Tier 3 skips tracks without audio before calling; this guards
            // against direct use
            None => return Ok(Vec::new()),
            Some(ref p) => Path::new(p),
        };

        let fingerprint = self.fingerprint(audio_path).await?;
        let lookup = self.lookup(&fingerprint).await?;

        // Strongest fingerprint match first
        let mut matches: Vec<(String, f64)> = lookup
            .results
            .iter()
            .filter(|r| r.score >= MIN_MATCH_SCORE)
            .flat_map(|r| r.recordings.iter().map(move |rec| (rec.id.clone(), r.score)))
            .collect();
        matches.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut candidates = Vec::new();
        for (mbid, score) in matches.into_iter().take(MAX_RECORDING_LOOKUPS) {
            let full = match self.mb.lookup_recording(&mbid).await {
                Ok(full) => full,
                Err(SourceError::InvalidResponse(_)) => continue,
                Err(e) => return Err(e),
            };
            let confidence = score.clamp(0.0, 1.0);
            candidates.extend(self.mb.candidates_from_recording(&full, confidence, self.id()));
        }

        tracing::debug!(
            track_id = track.track_id,
            candidates = candidates.len(),
            "AcoustID evidence gathered"
        );
        Ok(candidates)
    }
}
