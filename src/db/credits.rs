//! Credit and attempt persistence

use crate::models::{CandidateRole, IdentificationAttempt, SongwriterCredit};
use crate::error::Result;
use sqlx::{Row, SqlitePool};

/// Replace a track's credits with the given set.
///
/// Re-identification overwrites: all existing rows for the track are deleted
/// inside the same transaction that inserts the new ones.
pub async fn save_credits(pool: &SqlitePool, credits: &[SongwriterCredit]) -> Result<()> {
    if credits.is_empty() {
        return Ok(());
    }
    let track_id = credits[0].track_id;

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM songwriter_credits WHERE track_id = ?")
        .bind(track_id)
        .execute(&mut *tx)
        .await?;

    for credit in credits {
        sqlx::query(
            r#"
            INSERT INTO songwriter_credits (
                track_id, songwriter_name, role, share_percentage,
                publisher_name, source_of_info, confidence_score
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(credit.track_id)
        .bind(&credit.songwriter_name)
        .bind(credit.role.as_str())
        .bind(credit.share_percentage)
        .bind(&credit.publisher_name)
        .bind(&credit.source_of_info)
        .bind(credit.confidence_score)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::debug!(track_id, count = credits.len(), "Saved songwriter credits");
    Ok(())
}

/// All stored credits for a track
pub async fn load_credits(pool: &SqlitePool, track_id: i64) -> Result<Vec<SongwriterCredit>> {
    let rows = sqlx::query(
        r#"
        SELECT track_id, songwriter_name, role, share_percentage,
               publisher_name, source_of_info, confidence_score
        FROM songwriter_credits
        WHERE track_id = ?
        ORDER BY confidence_score DESC, songwriter_name
        "#,
    )
    .bind(track_id)
    .fetch_all(pool)
    .await?;

    let mut credits = Vec::with_capacity(rows.len());
    for row in &rows {
        let role_str: String = row.get("role");
        credits.push(SongwriterCredit {
            track_id: row.get("track_id"),
            songwriter_name: row.get("songwriter_name"),
            role: CandidateRole::parse(&role_str).unwrap_or(CandidateRole::Writer),
            share_percentage: row.get("share_percentage"),
            publisher_name: row.get("publisher_name"),
            source_of_info: row.get("source_of_info"),
            confidence_score: row.get("confidence_score"),
        });
    }
    Ok(credits)
}

/// Append one identification attempt (attempts are never updated or deleted)
pub async fn append_attempt(pool: &SqlitePool, attempt: &IdentificationAttempt) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO identification_attempts (
            track_id, source_used, query_performed, result,
            confidence_score, attempted_at
        ) VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(attempt.track_id)
    .bind(&attempt.source_used)
    .bind(&attempt.query_performed)
    .bind(&attempt.result)
    .bind(attempt.confidence_score)
    .bind(attempt.attempted_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// All attempts recorded for a track, oldest first
pub async fn load_attempts(pool: &SqlitePool, track_id: i64) -> Result<Vec<IdentificationAttempt>> {
    let rows = sqlx::query(
        r#"
        SELECT track_id, source_used, query_performed, result,
               confidence_score, attempted_at
        FROM identification_attempts
        WHERE track_id = ?
        ORDER BY attempt_id
        "#,
    )
    .bind(track_id)
    .fetch_all(pool)
    .await?;

    let mut attempts = Vec::with_capacity(rows.len());
    for row in &rows {
        let attempted_at: String = row.get("attempted_at");
        attempts.push(IdentificationAttempt {
            track_id: row.get("track_id"),
            source_used: row.get("source_used"),
            query_performed: row.get("query_performed"),
            result: row.get("result"),
            confidence_score: row.get("confidence_score"),
            attempted_at: chrono::DateTime::parse_from_rfc3339(&attempted_at)
                .map(|t| t.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::Utc::now()),
        });
    }
    Ok(attempts)
}
