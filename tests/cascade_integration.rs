//! Integration tests for the identification cascade against a scratch
//! database, with stubbed evidence sources standing in for the network.

use async_trait::async_trait;
use songwriter_id::config::ScorerConfig;
use songwriter_id::db::{self, SqliteRecordStore};
use songwriter_id::models::{Candidate, CandidateRole, IdentificationStatus, Track};
use songwriter_id::pipeline::tiers::{EnhancedTier, MetadataTier};
use songwriter_id::pipeline::{BatchRunner, IdentificationCascade, TierSlot};
use songwriter_id::scoring::ConfidenceScorer;
use songwriter_id::sources::{EvidenceSource, SourceResult};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

struct StaticSource {
    id: &'static str,
    candidates: Vec<Candidate>,
}

#[async_trait]
impl EvidenceSource for StaticSource {
    fn id(&self) -> &'static str {
        self.id
    }

    async fn find_candidates(&self, _track: &Track) -> SourceResult<Vec<Candidate>> {
        Ok(self.candidates.clone())
    }
}

async fn scratch_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    db::init_tables(&pool).await.unwrap();
    pool
}

fn scorer() -> Arc<ConfidenceScorer> {
    Arc::new(ConfidenceScorer::new(ScorerConfig::default()))
}

fn tier1(candidates: Vec<Candidate>, enabled: bool) -> TierSlot {
    TierSlot {
        strategy: Arc::new(MetadataTier::new(
            vec![Arc::new(StaticSource {
                id: "musicbrainz",
                candidates,
            })],
            scorer(),
            0.7,
            Duration::from_secs(5),
        )),
        enabled,
    }
}

fn tier2(candidates: Vec<Candidate>, enabled: bool) -> TierSlot {
    TierSlot {
        strategy: Arc::new(EnhancedTier::new(
            vec![Arc::new(StaticSource {
                id: "fuzzy",
                candidates,
            })],
            scorer(),
            0.5,
            Duration::from_secs(5),
        )),
        enabled,
    }
}

async fn insert_track(pool: &SqlitePool, isrc: Option<&str>) -> Track {
    let mut track = Track::new("Yesterday", "The Beatles");
    track.isrc = isrc.map(|s| s.to_string());
    let id = db::tracks::insert_track(pool, &track).await.unwrap();
    track.track_id = id;
    track
}

#[tokio::test]
async fn isrc_track_is_accepted_at_tier_one() {
    let pool = scratch_pool().await;
    let track = insert_track(&pool, Some("GBAYE6500521")).await;

    let cascade = IdentificationCascade::new(
        vec![tier1(
            vec![Candidate::new(
                "Paul McCartney",
                CandidateRole::Composer,
                0.95,
                "musicbrainz",
            )],
            true,
        )],
        Arc::new(SqliteRecordStore::new(pool.clone())),
    );

    let resolution = cascade.identify(&track).await.unwrap();
    assert_eq!(resolution.status, IdentificationStatus::IdentifiedTier1);
    assert!(resolution.confidence >= 0.9, "ISRC-backed evidence should score >= 0.9");

    let stored = db::tracks::load_track(&pool, track.track_id).await.unwrap().unwrap();
    assert_eq!(stored.identification_status, IdentificationStatus::IdentifiedTier1);

    let credits = db::credits::load_credits(&pool, track.track_id).await.unwrap();
    assert_eq!(credits.len(), 1);
    assert_eq!(credits[0].songwriter_name, "Paul McCartney");
    assert_eq!(credits[0].source_of_info, "tier1_metadata");

    let attempts = db::credits::load_attempts(&pool, track.track_id).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].source_used, "tier1_metadata");
}

#[tokio::test]
async fn tier_two_accepts_after_tier_one_misses() {
    let pool = scratch_pool().await;
    let track = insert_track(&pool, None).await;

    let fuzzy_hit = Candidate::new("John Lennon", CandidateRole::Composer, 0.6, "fuzzy")
        .with_matched_recording("Yesterday", "The Beatles", None);

    let cascade = IdentificationCascade::new(
        vec![tier1(vec![], true), tier2(vec![fuzzy_hit], true)],
        Arc::new(SqliteRecordStore::new(pool.clone())),
    );

    let resolution = cascade.identify(&track).await.unwrap();
    assert_eq!(resolution.status, IdentificationStatus::IdentifiedTier2);
    // 0.6 base * 0.7 + exact recording similarity * 0.3 = 0.72
    assert!((resolution.confidence - 0.72).abs() < 1e-9);

    let attempts = db::credits::load_attempts(&pool, track.track_id).await.unwrap();
    let tiers: Vec<&str> = attempts.iter().map(|a| a.source_used.as_str()).collect();
    assert_eq!(tiers, vec!["tier1_metadata", "tier2_enhanced"]);
}

#[tokio::test]
async fn exhaustion_routes_to_manual_review_with_best_confidence() {
    let pool = scratch_pool().await;
    let track = insert_track(&pool, None).await;

    // Below the 0.5 tier-2 threshold, but still the best observation
    let weak = Candidate::new("Someone Wrong", CandidateRole::Composer, 0.3, "fuzzy");

    let cascade = IdentificationCascade::new(
        vec![tier1(vec![], true), tier2(vec![weak], true)],
        Arc::new(SqliteRecordStore::new(pool.clone())),
    );

    let resolution = cascade.identify(&track).await.unwrap();
    assert_eq!(resolution.status, IdentificationStatus::ManualReview);
    assert!((resolution.confidence - 0.3).abs() < 1e-9);

    let stored = db::tracks::load_track(&pool, track.track_id).await.unwrap().unwrap();
    assert_eq!(stored.identification_status, IdentificationStatus::ManualReview);
    assert!((stored.confidence_score - 0.3).abs() < 1e-9);

    // No credits were accepted
    let credits = db::credits::load_credits(&pool, track.track_id).await.unwrap();
    assert!(credits.is_empty());

    let attempts = db::credits::load_attempts(&pool, track.track_id).await.unwrap();
    let tiers: Vec<&str> = attempts.iter().map(|a| a.source_used.as_str()).collect();
    assert_eq!(tiers, vec!["tier1_metadata", "tier2_enhanced", "manual_review"]);
}

#[tokio::test]
async fn disabled_tier_records_an_attempt_row() {
    let pool = scratch_pool().await;
    let track = insert_track(&pool, None).await;

    let cascade = IdentificationCascade::new(
        vec![tier1(vec![], false), tier2(vec![], true)],
        Arc::new(SqliteRecordStore::new(pool.clone())),
    );

    cascade.identify(&track).await.unwrap();

    let attempts = db::credits::load_attempts(&pool, track.track_id).await.unwrap();
    assert_eq!(attempts[0].source_used, "tier1_metadata");
    assert_eq!(attempts[0].result, "Tier disabled");
}

#[tokio::test]
async fn rerun_overwrites_credits_instead_of_duplicating() {
    let pool = scratch_pool().await;
    let track = insert_track(&pool, Some("GBAYE6500521")).await;
    let store = Arc::new(SqliteRecordStore::new(pool.clone()));

    let first = IdentificationCascade::new(
        vec![tier1(
            vec![Candidate::new("Paul McCartney", CandidateRole::Composer, 0.95, "musicbrainz")],
            true,
        )],
        Arc::clone(&store) as _,
    );
    first.identify(&track).await.unwrap();

    let second = IdentificationCascade::new(
        vec![tier1(
            vec![
                Candidate::new("Paul McCartney", CandidateRole::Composer, 0.95, "musicbrainz"),
                Candidate::new("John Lennon", CandidateRole::Composer, 0.95, "musicbrainz"),
            ],
            true,
        )],
        store,
    );
    second.identify(&track).await.unwrap();

    let credits = db::credits::load_credits(&pool, track.track_id).await.unwrap();
    assert_eq!(credits.len(), 2, "second run replaces, never appends");

    // The audit trail keeps both runs
    let attempts = db::credits::load_attempts(&pool, track.track_id).await.unwrap();
    assert_eq!(attempts.len(), 2);
}

#[tokio::test]
async fn malformed_evidence_counts_as_batch_error() {
    let pool = scratch_pool().await;
    let good = insert_track(&pool, Some("GBAYE6500521")).await;
    let mut bad = Track::new("Broken", "Evidence");
    bad.track_id = db::tracks::insert_track(&pool, &bad).await.unwrap();

    // Empty candidate name violates the evidence contract
    let cascade = IdentificationCascade::new(
        vec![tier1(
            vec![
                Candidate::new("", CandidateRole::Composer, 0.95, "musicbrainz"),
            ],
            true,
        )],
        Arc::new(SqliteRecordStore::new(pool.clone())),
    );

    let runner = BatchRunner::new(cascade);
    let stats = runner.run(&[good, bad]).await;

    assert_eq!(stats.total_processed, 2);
    assert_eq!(stats.errors, 2);
    assert_eq!(stats.manual_review, 0);
}
