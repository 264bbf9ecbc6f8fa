//! File row operations
//!
//! Multi-row writes go through the `sda.*` stored procedures so the field
//! update and its log event commit together.

use sqlx::PgPool;

use crate::data::postgres::PostgresError;
use crate::data::types::{AccessionCheck, ChecksumSource, FileInfo, SubmissionFileInfo};

/// Create-or-update a file row and append a `registered` event.
///
/// Idempotent at the row level: re-registering the same (user, path) pair
/// reuses the row but still appends a fresh event.
pub async fn register_file(
    pool: &PgPool,
    upload_path: &str,
    upload_user: &str,
) -> Result<String, PostgresError> {
    let file_id: uuid::Uuid = sqlx::query_scalar("SELECT sda.register_file($1, $2)")
        .bind(upload_path)
        .bind(upload_user)
        .fetch_one(pool)
        .await?;

    Ok(file_id.to_string())
}

/// Persist the Crypt4GH header, hex-encoded at rest.
///
/// Stored before any re-encryption step that might fail, so a replay can
/// use this copy instead of re-reading the object from storage.
pub async fn store_header(
    pool: &PgPool,
    header: &[u8],
    file_id: &str,
) -> Result<(), PostgresError> {
    let result = sqlx::query("UPDATE sda.files SET header = $1 WHERE id = $2::uuid")
        .bind(hex::encode(header))
        .bind(file_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(PostgresError::ZeroRows);
    }

    Ok(())
}

/// Retrieve the stored Crypt4GH header
pub async fn get_header(pool: &PgPool, file_id: &str) -> Result<Vec<u8>, PostgresError> {
    let hex_string: String = sqlx::query_scalar("SELECT header FROM sda.files WHERE id = $1::uuid")
        .bind(file_id)
        .fetch_one(pool)
        .await?;

    Ok(hex::decode(hex_string)?)
}

/// Retrieve the stored Crypt4GH header by accession id
pub async fn get_header_for_stable_id(
    pool: &PgPool,
    stable_id: &str,
) -> Result<Vec<u8>, PostgresError> {
    let hex_string: String =
        sqlx::query_scalar("SELECT header FROM sda.files WHERE stable_id = $1")
            .bind(stable_id)
            .fetch_one(pool)
            .await?;

    Ok(hex::decode(hex_string)?)
}

/// Record the archive location, size and encrypted checksum, and append an
/// `archived` event.
pub async fn set_archived(
    pool: &PgPool,
    file: &FileInfo,
    file_id: &str,
    correlation_id: &str,
) -> Result<(), PostgresError> {
    sqlx::query("SELECT sda.set_archived($1::uuid, $2, $3, $4, $5, $6)")
        .bind(file_id)
        .bind(correlation_id)
        .bind(&file.path)
        .bind(file.size)
        .bind(&file.checksum)
        .bind("SHA256")
        .execute(pool)
        .await?;

    Ok(())
}

/// Record the decrypted size and checksums, and append a `verified` event
pub async fn set_verified(
    pool: &PgPool,
    file: &FileInfo,
    file_id: &str,
    correlation_id: &str,
) -> Result<(), PostgresError> {
    sqlx::query("SELECT sda.set_verified($1::uuid, $2, $3, $4, $5, $6, $7)")
        .bind(file_id)
        .bind(correlation_id)
        .bind(&file.checksum)
        .bind("SHA256")
        .bind(file.decrypted_size)
        .bind(&file.decrypted_checksum)
        .bind("SHA256")
        .execute(pool)
        .await?;

    Ok(())
}

/// Assign the stable accession id to a file
pub async fn set_accession_id(
    pool: &PgPool,
    accession_id: &str,
    file_id: &str,
) -> Result<(), PostgresError> {
    let result = sqlx::query("UPDATE sda.files SET stable_id = $1 WHERE id = $2::uuid")
        .bind(accession_id)
        .bind(file_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(PostgresError::ZeroRows);
    }

    Ok(())
}

/// Distinguish "accession already on this file" from "taken by another
/// file" before assigning.
pub async fn check_accession_id_exists(
    pool: &PgPool,
    accession_id: &str,
    file_id: &str,
) -> Result<AccessionCheck, PostgresError> {
    let same: i64 =
        sqlx::query_scalar("SELECT COUNT(id) FROM sda.files WHERE stable_id = $1 AND id = $2::uuid")
            .bind(accession_id)
            .bind(file_id)
            .fetch_one(pool)
            .await?;

    if same > 0 {
        return Ok(AccessionCheck::Same);
    }

    let taken: i64 = sqlx::query_scalar("SELECT COUNT(id) FROM sda.files WHERE stable_id = $1")
        .bind(accession_id)
        .fetch_one(pool)
        .await?;

    if taken > 0 {
        return Ok(AccessionCheck::Duplicate);
    }

    Ok(AccessionCheck::Available)
}

/// Inbox path for an accessioned file
pub async fn get_inbox_path(pool: &PgPool, stable_id: &str) -> Result<String, PostgresError> {
    let path: String =
        sqlx::query_scalar("SELECT submission_file_path FROM sda.files WHERE stable_id = $1")
            .bind(stable_id)
            .fetch_one(pool)
            .await?;

    Ok(path)
}

/// Archive path for an accessioned file
pub async fn get_archive_path(pool: &PgPool, stable_id: &str) -> Result<String, PostgresError> {
    let path: String =
        sqlx::query_scalar("SELECT archive_file_path FROM sda.files WHERE stable_id = $1")
            .bind(stable_id)
            .fetch_one(pool)
            .await?;

    Ok(path)
}

/// Archive location and size of a file
pub async fn get_archived(pool: &PgPool, file_id: &str) -> Result<(String, i64), PostgresError> {
    let row: (String, i64) = sqlx::query_as(
        "SELECT archive_file_path, archive_file_size FROM sda.files WHERE id = $1::uuid",
    )
    .bind(file_id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Archive facts for a file: path, size, and the checksums recorded by the
/// archive and verify stages.
pub async fn get_file_info(pool: &PgPool, file_id: &str) -> Result<FileInfo, PostgresError> {
    let (path, size, decrypted_size): (Option<String>, Option<i64>, Option<i64>) = sqlx::query_as(
        "SELECT archive_file_path, archive_file_size, decrypted_file_size
         FROM sda.files WHERE id = $1::uuid",
    )
    .bind(file_id)
    .fetch_one(pool)
    .await?;

    let (checksum, decrypted_checksum): (Option<String>, Option<String>) = sqlx::query_as(
        "SELECT MAX(checksum) FILTER (WHERE source = $2),
                MAX(checksum) FILTER (WHERE source = $3)
         FROM sda.checksums WHERE file_id = $1::uuid",
    )
    .bind(file_id)
    .bind(ChecksumSource::Archived.as_str())
    .bind(ChecksumSource::Unencrypted.as_str())
    .fetch_one(pool)
    .await?;

    Ok(FileInfo {
        path: path.unwrap_or_default(),
        size: size.unwrap_or_default(),
        checksum: checksum.unwrap_or_default(),
        decrypted_size: decrypted_size.unwrap_or_default(),
        decrypted_checksum: decrypted_checksum.unwrap_or_default(),
    })
}

/// Facts another site needs to sync an accessioned file
pub async fn get_sync_data(
    pool: &PgPool,
    stable_id: &str,
) -> Result<crate::data::types::SyncData, PostgresError> {
    let (user, file_path): (String, String) = sqlx::query_as(
        "SELECT submission_user, submission_file_path FROM sda.files WHERE stable_id = $1",
    )
    .bind(stable_id)
    .fetch_one(pool)
    .await?;

    let checksum: String = sqlx::query_scalar(
        "SELECT checksum FROM sda.checksums
         WHERE source = $2
         AND file_id = (SELECT id FROM sda.files WHERE stable_id = $1)",
    )
    .bind(stable_id)
    .bind(ChecksumSource::Unencrypted.as_str())
    .fetch_one(pool)
    .await?;

    Ok(crate::data::types::SyncData {
        user,
        file_path,
        checksum,
    })
}

/// All files a user submitted that are not yet part of any dataset, each
/// annotated with its latest lifecycle event.
pub async fn get_user_files(
    pool: &PgPool,
    user: &str,
) -> Result<Vec<SubmissionFileInfo>, PostgresError> {
    let rows: Vec<(String, Option<String>, chrono::DateTime<chrono::Utc>)> = sqlx::query_as(
        "SELECT f.submission_file_path, e.event, f.created_at FROM sda.files f
         LEFT JOIN (
             SELECT DISTINCT ON (file_id) file_id, started_at, event
             FROM sda.file_event_log ORDER BY file_id, started_at DESC, id DESC
         ) e ON f.id = e.file_id
         WHERE f.submission_user = $1
         AND f.id NOT IN (
             SELECT f.id FROM sda.files f
             RIGHT JOIN sda.file_dataset d ON f.id = d.file_id
         )",
    )
    .bind(user)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(inbox_path, status, created_at)| SubmissionFileInfo {
            inbox_path,
            status: status.unwrap_or_default(),
            created_at,
        })
        .collect())
}

/// All users with at least one file not yet attached to a dataset
pub async fn list_active_users(pool: &PgPool) -> Result<Vec<String>, PostgresError> {
    let users: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT submission_user FROM sda.files
         WHERE id NOT IN (
             SELECT f.id FROM sda.files f
             RIGHT JOIN sda.file_dataset d ON f.id = d.file_id
         )
         ORDER BY submission_user ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(users)
}
