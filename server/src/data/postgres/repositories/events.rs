//! File event log operations
//!
//! The event log is append-only; rows are inserted and never touched again.

use sqlx::PgPool;

use crate::data::postgres::PostgresError;
use crate::data::types::FileEvent;

/// Append a lifecycle event for a file
pub async fn update_file_event_log(
    pool: &PgPool,
    file_id: &str,
    event: FileEvent,
    correlation_id: &str,
    user: &str,
    details: &str,
    message: &str,
) -> Result<(), PostgresError> {
    let result = sqlx::query(
        "INSERT INTO sda.file_event_log (file_id, event, correlation_id, user_id, details, message)
         VALUES ($1::uuid, $2, $3, $4, $5, $6)",
    )
    .bind(file_id)
    .bind(event.as_str())
    .bind(correlation_id)
    .bind(user)
    .bind(details)
    .bind(message)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(PostgresError::ZeroRows);
    }

    Ok(())
}

/// File id for a correlation id, from the event log
pub async fn get_file_id(pool: &PgPool, correlation_id: &str) -> Result<String, PostgresError> {
    let id: uuid::Uuid = sqlx::query_scalar(
        "SELECT DISTINCT file_id FROM sda.file_event_log WHERE correlation_id = $1",
    )
    .bind(correlation_id)
    .fetch_one(pool)
    .await?;

    Ok(id.to_string())
}

/// Latest event for a correlation id; this IS the file's current status
pub async fn get_file_status(pool: &PgPool, correlation_id: &str) -> Result<String, PostgresError> {
    let status: String = sqlx::query_scalar(
        "SELECT event FROM sda.file_event_log WHERE correlation_id = $1 ORDER BY id DESC LIMIT 1",
    )
    .bind(correlation_id)
    .fetch_one(pool)
    .await?;

    Ok(status)
}

/// Correlation id in use for a user/path pair not yet part of any dataset.
///
/// Admin-triggered commands use this so their messages join the file's
/// existing conversation instead of starting a new one.
pub async fn get_corr_id(pool: &PgPool, user: &str, path: &str) -> Result<String, PostgresError> {
    let corr_id: String = sqlx::query_scalar(
        "SELECT DISTINCT correlation_id FROM sda.file_event_log e
         RIGHT JOIN sda.files f ON e.file_id = f.id
         WHERE f.submission_file_path = $1 AND f.submission_user = $2
         AND NOT EXISTS (SELECT file_id FROM sda.file_dataset WHERE file_id = f.id)",
    )
    .bind(path)
    .bind(user)
    .fetch_one(pool)
    .await?;

    Ok(corr_id)
}
