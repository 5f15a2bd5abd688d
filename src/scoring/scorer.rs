//! Confidence Scorer
//!
//! Folds candidates from one or more evidence sources into a single scored
//! `CreditSet` for one tier attempt. Variants of the same name merge through
//! normalization; agreement between independent sources earns a bonus; when
//! a source matched a recording rather than the work itself, textual
//! similarity between the matched recording and the track tempers the score.

use crate::config::{ScorerConfig, SharePolicy};
use crate::error::{Error, Result};
use crate::models::{
    Candidate, CandidateRole, CreditEntry, CreditSet, PublisherRelation, Track,
};
use crate::scoring::names::{name_similarity, normalize_name};
use crate::scoring::publisher::resolve_publisher;
use std::collections::BTreeMap;

/// Weight of the source-reported confidence when a similarity term applies
const BASE_WEIGHT: f64 = 0.7;
/// Weight of the textual similarity term
const SIMILARITY_WEIGHT: f64 = 0.3;

/// Relative weights of the similarity components (title / artist / release);
/// absent components are renormalized away.
const TITLE_SHARE: f64 = 0.5;
const ARTIST_SHARE: f64 = 0.3;
const RELEASE_SHARE: f64 = 0.2;

pub struct ConfidenceScorer {
    config: ScorerConfig,
}

impl ConfidenceScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    /// Score candidates for one track.
    ///
    /// Never fails for "no evidence": an empty or fully-filtered candidate
    /// list yields an empty `CreditSet` at confidence 0.0. Fails with
    /// `Error::MalformedEvidence` only when a candidate violates the data
    /// contract (empty name, confidence outside [0,1] or NaN).
    pub fn score(&self, candidates: &[Candidate], track: &Track) -> Result<CreditSet> {
        for candidate in candidates {
            validate_candidate(candidate)?;
        }

        let (publisher_candidates, credit_candidates): (Vec<&Candidate>, Vec<&Candidate>) =
            candidates
                .iter()
                .partition(|c| c.role == CandidateRole::Publisher);

        // Group by normalized (name, role) so name variants merge
        let mut groups: BTreeMap<(String, &'static str), Vec<&Candidate>> = BTreeMap::new();
        for candidate in credit_candidates {
            groups
                .entry((normalize_name(&candidate.name), candidate.role.as_str()))
                .or_default()
                .push(candidate);
        }

        let mut entries: Vec<CreditEntry> = groups
            .into_values()
            .map(|group| self.score_group(&group, track))
            .collect();

        // Publisher candidates without an explicit provenance level are
        // treated as entity-linked evidence
        let leveled: Vec<Candidate> = publisher_candidates
            .iter()
            .map(|c| {
                let mut c = (*c).clone();
                if c.publisher_relation.is_none() {
                    c.publisher_relation = Some(PublisherRelation::LinkedEntity);
                }
                c
            })
            .collect();
        let publisher = resolve_publisher(&leveled);

        if let Some(ref publisher) = publisher {
            for entry in &mut entries {
                entry.publisher = Some(publisher.name.clone());
            }
            entries.push(CreditEntry {
                name: publisher.name.clone(),
                role: CandidateRole::Publisher,
                share_percentage: None,
                publisher: None,
                confidence: publisher.confidence,
                sources: leveled
                    .iter()
                    .filter(|c| normalize_name(&c.name) == normalize_name(&publisher.name))
                    .map(|c| c.source_id.clone())
                    .collect(),
            });
        }

        self.apply_share_policy(&mut entries, track);

        // Strongest credits first; stable tiebreak on name for determinism
        entries.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });

        let confidence = if entries.is_empty() {
            0.0
        } else {
            entries.iter().map(|e| e.confidence).sum::<f64>() / entries.len() as f64
        };

        Ok(CreditSet {
            entries,
            confidence: confidence.clamp(0.0, 1.0),
        })
    }

    fn score_group(&self, group: &[&Candidate], track: &Track) -> CreditEntry {
        // Best weighted source confidence in the group
        let base = group
            .iter()
            .map(|c| (c.source_confidence * self.config.weight(&c.source_id)).clamp(0.0, 1.0))
            .fold(0.0_f64, f64::max);

        let mut sources: Vec<String> = group.iter().map(|c| c.source_id.clone()).collect();
        sources.sort();
        sources.dedup();
        let agreement = if sources.len() >= 2 {
            self.config.agreement_bonus
        } else {
            0.0
        };

        // Best similarity among candidates that matched a recording
        let similarity = group
            .iter()
            .filter_map(|c| recording_similarity(c, track))
            .fold(None::<f64>, |acc, s| Some(acc.map_or(s, |a| a.max(s))));

        let confidence = match similarity {
            Some(sim) => base * BASE_WEIGHT + sim * SIMILARITY_WEIGHT + agreement,
            None => base + agreement,
        }
        .clamp(0.0, 1.0);

        // Representative candidate: highest source confidence wins the
        // display name and share
        let best = group
            .iter()
            .max_by(|a, b| {
                a.source_confidence
                    .partial_cmp(&b.source_confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .expect("group is never empty");

        let share_percentage = group
            .iter()
            .filter_map(|c| c.share_percentage)
            .next();

        CreditEntry {
            name: best.name.clone(),
            role: best.role,
            share_percentage,
            publisher: None,
            confidence,
            sources,
        }
    }

    /// Enforce the configured policy on per-role-class share totals
    fn apply_share_policy(&self, entries: &mut [CreditEntry], track: &Track) {
        if self.config.share_policy == SharePolicy::Accept {
            return;
        }

        let mut totals: BTreeMap<&'static str, f64> = BTreeMap::new();
        for entry in entries.iter() {
            if let Some(share) = entry.share_percentage {
                *totals.entry(entry.role.as_str()).or_default() += share;
            }
        }

        for (role, total) in totals {
            if total <= 100.0 {
                continue;
            }
            match self.config.share_policy {
                SharePolicy::Flag => {
                    tracing::warn!(
                        track_id = track.track_id,
                        role = role,
                        total = total,
                        "Share percentages over-allocated for role"
                    );
                }
                SharePolicy::Clamp => {
                    let factor = 100.0 / total;
                    for entry in entries.iter_mut() {
                        if entry.role.as_str() == role {
                            if let Some(share) = entry.share_percentage {
                                entry.share_percentage = Some(share * factor);
                            }
                        }
                    }
                }
                SharePolicy::Accept => unreachable!(),
            }
        }
    }
}

/// Similarity between a candidate's matched recording and the track, or None
/// when the candidate came from a direct work lookup.
fn recording_similarity(candidate: &Candidate, track: &Track) -> Option<f64> {
    let mut weighted = 0.0;
    let mut weight_total = 0.0;

    if let Some(ref title) = candidate.matched_title {
        weighted += name_similarity(title, &track.title) * TITLE_SHARE;
        weight_total += TITLE_SHARE;
    }
    if let Some(ref artist) = candidate.matched_artist {
        weighted += name_similarity(artist, &track.artist_name) * ARTIST_SHARE;
        weight_total += ARTIST_SHARE;
    }
    if let (Some(release), Some(track_release)) =
        (&candidate.matched_release, &track.release_title)
    {
        weighted += name_similarity(release, track_release) * RELEASE_SHARE;
        weight_total += RELEASE_SHARE;
    }

    if weight_total == 0.0 {
        None
    } else {
        Some(weighted / weight_total)
    }
}

fn validate_candidate(candidate: &Candidate) -> Result<()> {
    if candidate.name.trim().is_empty() {
        return Err(Error::MalformedEvidence(format!(
            "empty candidate name from source '{}'",
            candidate.source_id
        )));
    }
    if candidate.source_confidence.is_nan()
        || !(0.0..=1.0).contains(&candidate.source_confidence)
    {
        return Err(Error::MalformedEvidence(format!(
            "source confidence out of range from '{}': {}",
            candidate.source_id, candidate.source_confidence
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Track;

    fn scorer() -> ConfidenceScorer {
        ConfidenceScorer::new(ScorerConfig::default())
    }

    fn track() -> Track {
        let mut t = Track::new("Unforgettable", "Nat King Cole");
        t.track_id = 1;
        t
    }

    #[test]
    fn empty_candidates_yield_empty_set_not_error() {
        let set = scorer().score(&[], &track()).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.confidence, 0.0);
    }

    #[test]
    fn name_variants_merge_into_one_entry() {
        let candidates = vec![
            Candidate::new("Irving Berlin", CandidateRole::Composer, 0.8, "musicbrainz"),
            Candidate::new("Irving 'Berlin'", CandidateRole::Composer, 0.7, "fuzzy"),
        ];
        let set = scorer().score(&candidates, &track()).unwrap();
        assert_eq!(set.entries.len(), 1);
        let entry = &set.entries[0];
        assert_eq!(entry.sources, vec!["fuzzy", "musicbrainz"]);
        // two agreeing sources earn the bonus on top of the best confidence
        assert!((entry.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn same_source_twice_earns_no_agreement_bonus() {
        let candidates = vec![
            Candidate::new("Irving Berlin", CandidateRole::Composer, 0.8, "musicbrainz"),
            Candidate::new("Irving Berlin", CandidateRole::Composer, 0.6, "musicbrainz"),
        ];
        let set = scorer().score(&candidates, &track()).unwrap();
        assert!((set.entries[0].confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn matched_recording_similarity_tempers_confidence() {
        let candidate = Candidate::new("Nelson Riddle", CandidateRole::Arranger, 0.6, "fuzzy")
            .with_matched_recording("Unforgettable", "Nat 'King' Cole", None);
        let set = scorer().score(&[candidate], &track()).unwrap();
        // 0.6 * 0.7 + 1.0 * 0.3 = 0.72
        assert!((set.entries[0].confidence - 0.72).abs() < 1e-9);
    }

    #[test]
    fn poor_recording_match_lowers_the_aggregate() {
        let candidate = Candidate::new("Somebody Else", CandidateRole::Writer, 0.9, "fuzzy")
            .with_matched_recording("Completely Different Song", "Another Band", None);
        let set = scorer().score(&[candidate], &track()).unwrap();
        assert!(set.entries[0].confidence < 0.9);
    }

    #[test]
    fn aggregate_confidence_stays_in_range() {
        let candidates = vec![
            Candidate::new("A Writer", CandidateRole::Writer, 1.0, "musicbrainz"),
            Candidate::new("A Writer", CandidateRole::Writer, 1.0, "fuzzy"),
            Candidate::new("A Writer", CandidateRole::Writer, 1.0, "acoustid"),
        ];
        let set = scorer().score(&candidates, &track()).unwrap();
        assert!(set.confidence <= 1.0);
        assert!(set.entries.iter().all(|e| (0.0..=1.0).contains(&e.confidence)));
    }

    #[test]
    fn resolved_publisher_is_stamped_on_writer_entries() {
        let candidates = vec![
            Candidate::new("Irving Berlin", CandidateRole::Composer, 0.9, "musicbrainz"),
            Candidate::new("Bourne Co.", CandidateRole::Publisher, 0.9, "musicbrainz")
                .with_publisher_relation(PublisherRelation::DirectWork),
        ];
        let set = scorer().score(&candidates, &track()).unwrap();
        let composer = set
            .entries
            .iter()
            .find(|e| e.role == CandidateRole::Composer)
            .unwrap();
        assert_eq!(composer.publisher.as_deref(), Some("Bourne Co."));
        assert!(set
            .entries
            .iter()
            .any(|e| e.role == CandidateRole::Publisher && e.name == "Bourne Co."));
    }

    #[test]
    fn malformed_confidence_is_rejected() {
        let candidate = Candidate::new("X", CandidateRole::Writer, 1.5, "musicbrainz");
        let err = scorer().score(&[candidate], &track()).unwrap_err();
        assert!(matches!(err, Error::MalformedEvidence(_)));

        let nameless = Candidate::new("   ", CandidateRole::Writer, 0.5, "musicbrainz");
        assert!(matches!(
            scorer().score(&[nameless], &track()),
            Err(Error::MalformedEvidence(_))
        ));
    }

    #[test]
    fn clamp_policy_rescales_overallocated_shares() {
        let mut config = ScorerConfig::default();
        config.share_policy = SharePolicy::Clamp;
        let scorer = ConfidenceScorer::new(config);

        let mut a = Candidate::new("Writer A", CandidateRole::Writer, 0.8, "musicbrainz");
        a.share_percentage = Some(80.0);
        let mut b = Candidate::new("Writer B", CandidateRole::Writer, 0.8, "musicbrainz");
        b.share_percentage = Some(70.0);

        let set = scorer.score(&[a, b], &track()).unwrap();
        let total: f64 = set
            .entries
            .iter()
            .filter_map(|e| e.share_percentage)
            .sum();
        assert!((total - 100.0).abs() < 1e-9);
    }
}
