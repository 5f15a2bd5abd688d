//! songwriter-id - Songwriter Credit Identification Service
//!
//! Imports publisher catalogs, identifies songwriter credits through a
//! tiered evidence pipeline (metadata, fuzzy matching, audio fingerprint),
//! and routes whatever clears no tier to manual review.

use anyhow::Result;
use songwriter_id::config::PipelineConfig;
use songwriter_id::ingest::CatalogImporter;
use songwriter_id::jobs::{JobScheduler, JobStore};
use songwriter_id::pipeline::{self, BatchRunner, IdentificationCascade, SourceRegistry};
use songwriter_id::scoring::ConfidenceScorer;
use songwriter_id::sources::{AcoustIdSource, FuzzySearchSource, MusicBrainzSource};
use songwriter_id::AppState;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting songwriter-id service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Config path from env, falling back to the working directory
    let config_path = std::env::var("SONGWRITER_ID_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("songwriter-id.toml"));
    let config = PipelineConfig::load(&config_path)?;
    config.validate()?;

    // Open or create the database
    let db_path = Path::new(&config.database.path);
    info!("Database: {}", db_path.display());
    let db_pool = songwriter_id::db::init_database_pool(db_path).await?;

    // Durable job queue
    let job_store = Arc::new(JobStore::new(&config.scheduler.jobs_dir)?);
    info!("Jobs directory: {}", config.scheduler.jobs_dir);

    // Evidence sources and the cascade
    let registry = build_source_registry(&config);
    let scorer = Arc::new(ConfidenceScorer::new(config.scorer.clone()));
    let tiers = pipeline::build_tiers(&config, &registry, scorer);
    let record_store = Arc::new(songwriter_id::db::SqliteRecordStore::new(db_pool.clone()));
    let cascade = IdentificationCascade::new(tiers, record_store);
    let runner = BatchRunner::new(cascade);
    let importer = CatalogImporter::new(db_pool.clone());

    // Scheduler loop
    let cancel = CancellationToken::new();
    let scheduler = JobScheduler::new(
        Arc::clone(&job_store),
        importer,
        runner,
        db_pool.clone(),
        Duration::from_secs(config.scheduler.poll_interval_secs),
    );
    let scheduler_handle = tokio::spawn(scheduler.run(cancel.clone()));

    // HTTP surface
    let state = AppState::new(db_pool, job_store);
    let app = songwriter_id::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!("Listening on http://{}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the scheduler and let an in-flight job record its outcome
    cancel.cancel();
    let _ = scheduler_handle.await;

    Ok(())
}

/// Instantiate every evidence source the configuration allows.
///
/// AcoustID is omitted (with a warning) when no API key is configured;
/// tier 3 then simply finds nothing.
fn build_source_registry(config: &PipelineConfig) -> SourceRegistry {
    let mut registry = SourceRegistry::new();

    match MusicBrainzSource::new(&config.sources) {
        Ok(mb) => {
            let mb = Arc::new(mb);
            registry.insert(
                "fuzzy".to_string(),
                Arc::new(FuzzySearchSource::new(Arc::clone(&mb))) as _,
            );
            match AcoustIdSource::new(&config.sources, Arc::clone(&mb)) {
                Ok(acoustid) => {
                    registry.insert("acoustid".to_string(), Arc::new(acoustid) as _);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "AcoustID source unavailable");
                }
            }
            registry.insert("musicbrainz".to_string(), mb as _);
        }
        Err(e) => {
            tracing::warn!(error = %e, "MusicBrainz source unavailable");
        }
    }

    registry
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
