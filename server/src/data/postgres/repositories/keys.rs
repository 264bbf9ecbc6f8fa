//! Encryption key registry operations
//!
//! The key used to encrypt a file's header is recorded so it stays
//! discoverable long after ingestion.

use sqlx::PgPool;

use crate::data::postgres::PostgresError;

/// Register a key hash with its description
pub async fn add_key_hash(
    pool: &PgPool,
    key_hash: &str,
    description: &str,
) -> Result<(), PostgresError> {
    let result = sqlx::query(
        "INSERT INTO sda.encryption_keys (key_hash, description) VALUES ($1, $2)
         ON CONFLICT DO NOTHING",
    )
    .bind(key_hash)
    .bind(description)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(PostgresError::KeyHashExists);
    }

    Ok(())
}

/// Point a file at the key that encrypted its header.
/// The key must already be registered.
pub async fn set_key_hash(pool: &PgPool, key_hash: &str, file_id: &str) -> Result<(), PostgresError> {
    let registered: String =
        sqlx::query_scalar("SELECT key_hash FROM sda.encryption_keys WHERE key_hash = $1")
            .bind(key_hash)
            .fetch_one(pool)
            .await
            .map_err(|e| {
                PostgresError::Config(format!("keyhash not present in database: {}", e))
            })?;

    let result = sqlx::query("UPDATE sda.files SET key_hash = $1 WHERE id = $2::uuid")
        .bind(registered)
        .bind(file_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(PostgresError::ZeroRows);
    }

    tracing::debug!(file_id = %file_id, "Key hash set for file");
    Ok(())
}
