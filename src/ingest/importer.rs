//! Bulk catalog import with dedup
//!
//! Dedup checks ISRC first (the reliable identifier), then exact
//! title + artist. Existing rows are backfilled with fields the earlier
//! delivery lacked rather than overwritten.

use crate::db;
use crate::error::Result;
use crate::ingest::normalizer;
use crate::ingest::parser::{CatalogParser, RawTrack};
use crate::models::Track;
use sqlx::SqlitePool;
use std::path::Path;

/// Outcome of one catalog import
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub parsed: usize,
    pub added: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Importer for adding catalog rows to the track table
pub struct CatalogImporter {
    pool: SqlitePool,
    parser: CatalogParser,
}

impl CatalogImporter {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            parser: CatalogParser::new(),
        }
    }

    /// Parse, normalize and import one catalog file
    pub async fn import_catalog(
        &self,
        catalog_path: &Path,
        audio_base_path: Option<&Path>,
    ) -> Result<ImportReport> {
        let rows = self.parser.parse_file(catalog_path, audio_base_path)?;
        let mut report = ImportReport {
            parsed: rows.len(),
            ..Default::default()
        };

        // Each row lands in exactly one bucket: added, skipped (dedup), or errored
        for (idx, raw) in rows.iter().enumerate() {
            match self.import_row(raw).await {
                Ok(true) => report.added += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    report
                        .errors
                        .push(format!("Row {}: {}", idx + 1, e));
                    tracing::warn!(row = idx + 1, error = %e, "Failed to import catalog row");
                }
            }
        }

        tracing::info!(
            catalog = %catalog_path.display(),
            parsed = report.parsed,
            added = report.added,
            skipped = report.skipped,
            errors = report.errors.len(),
            "Catalog import complete"
        );
        Ok(report)
    }

    /// Import one row; Ok(true) when a new track was inserted
    async fn import_row(&self, raw: &RawTrack) -> Result<bool> {
        let Some(track) = normalizer::normalize_track(raw) else {
            return Err(crate::error::Error::InvalidInput(
                "Missing required title/artist".to_string(),
            ));
        };

        if let Some(existing) = self.find_existing(&track).await? {
            self.backfill(&existing, &track).await?;
            return Ok(false);
        }

        db::tracks::insert_track(&self.pool, &track).await?;
        Ok(true)
    }

    async fn find_existing(&self, track: &Track) -> Result<Option<Track>> {
        if let Some(isrc) = &track.isrc {
            if let Some(found) = db::tracks::find_by_isrc(&self.pool, isrc).await? {
                return Ok(Some(found));
            }
        }
        Ok(db::tracks::find_by_title_artist(&self.pool, &track.title, &track.artist_name).await?)
    }

    /// Fill fields the stored row is missing but the new delivery has
    async fn backfill(&self, existing: &Track, incoming: &Track) -> Result<()> {
        let mut updated = existing.clone();
        let mut changed = false;

        if updated.release_title.is_none() && incoming.release_title.is_some() {
            updated.release_title = incoming.release_title.clone();
            changed = true;
        }
        if updated.duration.is_none() && incoming.duration.is_some() {
            updated.duration = incoming.duration.clone();
            changed = true;
        }
        if updated.audio_path.is_none() && incoming.audio_path.is_some() {
            updated.audio_path = incoming.audio_path.clone();
            changed = true;
        }
        if updated.isrc.is_none() && incoming.isrc.is_some() {
            updated.isrc = incoming.isrc.clone();
            changed = true;
        }

        if changed {
            sqlx::query(
                r#"
                UPDATE tracks
                SET release_title = ?, duration = ?, audio_path = ?, isrc = ?,
                    updated_at = CURRENT_TIMESTAMP
                WHERE track_id = ?
                "#,
            )
            .bind(&updated.release_title)
            .bind(&updated.duration)
            .bind(&updated.audio_path)
            .bind(&updated.isrc)
            .bind(updated.track_id)
            .execute(&self.pool)
            .await?;
            tracing::debug!(track_id = updated.track_id, "Backfilled existing track");
        }
        Ok(())
    }
}
