//! Track persistence

use crate::models::{IdentificationStatus, Track};
use crate::error::Result;
use sqlx::{Row, SqlitePool};

fn track_from_row(row: &sqlx::sqlite::SqliteRow) -> Track {
    let status_str: String = row.get("identification_status");
    Track {
        track_id: row.get("track_id"),
        title: row.get("title"),
        artist_name: row.get("artist_name"),
        release_title: row.get("release_title"),
        duration: row.get("duration"),
        isrc: row.get("isrc"),
        audio_path: row.get("audio_path"),
        identification_status: IdentificationStatus::parse(&status_str)
            .unwrap_or(IdentificationStatus::Pending),
        confidence_score: row.get("confidence_score"),
    }
}

/// Insert a track, returning its assigned id
pub async fn insert_track(pool: &SqlitePool, track: &Track) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO tracks (
            title, artist_name, release_title, duration, isrc, audio_path,
            identification_status, confidence_score
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&track.title)
    .bind(&track.artist_name)
    .bind(&track.release_title)
    .bind(&track.duration)
    .bind(&track.isrc)
    .bind(&track.audio_path)
    .bind(track.identification_status.as_str())
    .bind(track.confidence_score)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Load one track by id
pub async fn load_track(pool: &SqlitePool, track_id: i64) -> Result<Option<Track>> {
    let row = sqlx::query("SELECT * FROM tracks WHERE track_id = ?")
        .bind(track_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(track_from_row))
}

/// Find an existing track by ISRC
pub async fn find_by_isrc(pool: &SqlitePool, isrc: &str) -> Result<Option<Track>> {
    let row = sqlx::query("SELECT * FROM tracks WHERE isrc = ?")
        .bind(isrc)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(track_from_row))
}

/// Find an existing track by exact title + artist
pub async fn find_by_title_artist(
    pool: &SqlitePool,
    title: &str,
    artist_name: &str,
) -> Result<Option<Track>> {
    let row = sqlx::query("SELECT * FROM tracks WHERE title = ? AND artist_name = ?")
        .bind(title)
        .bind(artist_name)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(track_from_row))
}

/// All tracks awaiting identification, oldest first
pub async fn load_pending_tracks(pool: &SqlitePool) -> Result<Vec<Track>> {
    let rows = sqlx::query(
        "SELECT * FROM tracks WHERE identification_status = 'pending' ORDER BY track_id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(track_from_row).collect())
}

/// Flip a track's identification status and confidence
pub async fn update_track_status(
    pool: &SqlitePool,
    track_id: i64,
    status: IdentificationStatus,
    confidence: f64,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE tracks
        SET identification_status = ?, confidence_score = ?, updated_at = CURRENT_TIMESTAMP
        WHERE track_id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(confidence)
    .bind(track_id)
    .execute(pool)
    .await?;

    Ok(())
}
