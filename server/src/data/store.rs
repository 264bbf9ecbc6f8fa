//! The file store: retrying facade over the repositories
//!
//! Every operation here is two-layered. The inner layer is a single
//! repository attempt; the outer layer pings (and if needed rebuilds) the
//! connection pool before each attempt and retries with delays of
//! 2, 4, 8, 16 and 32 seconds. Errors that cannot succeed on retry (a
//! lookup with no rows, an already-registered key hash) short-circuit.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::core::config::DbConfig;
use crate::core::constants::{RETRY_BASE_DELAY_SECS, RETRY_TIMES};
use crate::data::postgres::repositories::{datasets, events, files, keys};
use crate::data::postgres::{PostgresError, PostgresService};
use crate::data::types::{
    AccessionCheck, DatasetEvent, FileEvent, FileInfo, SubmissionFileInfo, SyncData,
};

/// Minimum schema version required by `register_file`
const REGISTER_FILE_MIN_VERSION: i32 = 4;

pub struct FileStore {
    db: Arc<PostgresService>,
    /// Schema version read at startup; operations refuse to run below
    /// their minimum.
    version: i32,
}

impl FileStore {
    pub async fn init(config: &DbConfig) -> Result<Self, PostgresError> {
        let db = PostgresService::init(config).await?;
        let version = db.schema_version().await?;
        Ok(Self {
            db: Arc::new(db),
            version,
        })
    }

    pub fn schema_version(&self) -> i32 {
        self.version
    }

    pub async fn ping(&self) -> Result<(), PostgresError> {
        self.db.ping().await
    }

    /// Ping and rebuild the pool if it stopped answering
    pub async fn check_and_reconnect(&self) {
        self.db.check_and_reconnect().await;
    }

    pub async fn close(&self) {
        self.db.close().await;
    }

    /// Retry loop shared by the mutating and worker-facing reads:
    /// reconnect-if-needed before each attempt, exponential backoff
    /// between attempts, short-circuit on definitive errors.
    async fn with_retry<T, F, Fut>(&self, mut op: F) -> Result<T, PostgresError>
    where
        F: FnMut(PgPool) -> Fut,
        Fut: Future<Output = Result<T, PostgresError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.db.check_and_reconnect().await;
            let pool = self.db.pool().await;
            match op(pool).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_definitive() => return Err(e),
                Err(e) => {
                    if attempt >= RETRY_TIMES {
                        return Err(e);
                    }
                    let delay = Duration::from_secs(RETRY_BASE_DELAY_SECS) * 2u32.pow(attempt);
                    tracing::warn!(
                        error = %e,
                        attempt,
                        delay_secs = delay.as_secs(),
                        "Store operation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// One attempt, but still behind the reconnect check
    async fn single<T, F, Fut>(&self, op: F) -> Result<T, PostgresError>
    where
        F: FnOnce(PgPool) -> Fut,
        Fut: Future<Output = Result<T, PostgresError>>,
    {
        self.db.check_and_reconnect().await;
        let pool = self.db.pool().await;
        op(pool).await
    }

    // ==================== Files ====================

    /// Create-or-update a file row and append a `registered` event
    pub async fn register_file(
        &self,
        upload_path: &str,
        upload_user: &str,
    ) -> Result<String, PostgresError> {
        if self.version < REGISTER_FILE_MIN_VERSION {
            return Err(PostgresError::SchemaVersion {
                required: REGISTER_FILE_MIN_VERSION,
                found: self.version,
            });
        }

        self.single(|pool| async move {
            files::register_file(&pool, upload_path, upload_user).await
        })
        .await
    }

    /// Append a lifecycle event
    pub async fn update_file_event_log(
        &self,
        file_id: &str,
        event: FileEvent,
        correlation_id: &str,
        user: &str,
        details: &str,
        message: &str,
    ) -> Result<(), PostgresError> {
        self.with_retry(|pool| async move {
            events::update_file_event_log(&pool, file_id, event, correlation_id, user, details, message)
                .await
        })
        .await
    }

    pub async fn store_header(&self, header: &[u8], file_id: &str) -> Result<(), PostgresError> {
        self.with_retry(|pool| async move { files::store_header(&pool, header, file_id).await })
            .await
    }

    pub async fn get_header(&self, file_id: &str) -> Result<Vec<u8>, PostgresError> {
        self.with_retry(|pool| async move { files::get_header(&pool, file_id).await })
            .await
    }

    pub async fn get_header_for_stable_id(
        &self,
        stable_id: &str,
    ) -> Result<Vec<u8>, PostgresError> {
        self.single(|pool| async move { files::get_header_for_stable_id(&pool, stable_id).await })
            .await
    }

    pub async fn set_archived(
        &self,
        file: &FileInfo,
        file_id: &str,
        correlation_id: &str,
    ) -> Result<(), PostgresError> {
        self.with_retry(|pool| async move {
            files::set_archived(&pool, file, file_id, correlation_id).await
        })
        .await
    }

    pub async fn set_verified(
        &self,
        file: &FileInfo,
        file_id: &str,
        correlation_id: &str,
    ) -> Result<(), PostgresError> {
        self.with_retry(|pool| async move {
            files::set_verified(&pool, file, file_id, correlation_id).await
        })
        .await
    }

    pub async fn set_accession_id(
        &self,
        accession_id: &str,
        file_id: &str,
    ) -> Result<(), PostgresError> {
        self.with_retry(|pool| async move {
            files::set_accession_id(&pool, accession_id, file_id).await
        })
        .await
    }

    pub async fn check_accession_id_exists(
        &self,
        accession_id: &str,
        file_id: &str,
    ) -> Result<AccessionCheck, PostgresError> {
        self.with_retry(|pool| async move {
            files::check_accession_id_exists(&pool, accession_id, file_id).await
        })
        .await
    }

    // ==================== Projections ====================

    pub async fn get_file_id(&self, correlation_id: &str) -> Result<String, PostgresError> {
        self.with_retry(|pool| async move { events::get_file_id(&pool, correlation_id).await })
            .await
    }

    pub async fn get_file_status(&self, correlation_id: &str) -> Result<String, PostgresError> {
        self.with_retry(|pool| async move { events::get_file_status(&pool, correlation_id).await })
            .await
    }

    pub async fn get_file_info(&self, file_id: &str) -> Result<FileInfo, PostgresError> {
        self.with_retry(|pool| async move { files::get_file_info(&pool, file_id).await })
            .await
    }

    pub async fn get_inbox_path(&self, stable_id: &str) -> Result<String, PostgresError> {
        self.with_retry(|pool| async move { files::get_inbox_path(&pool, stable_id).await })
            .await
    }

    pub async fn get_archive_path(&self, stable_id: &str) -> Result<String, PostgresError> {
        self.with_retry(|pool| async move { files::get_archive_path(&pool, stable_id).await })
            .await
    }

    pub async fn get_archived(&self, file_id: &str) -> Result<(String, i64), PostgresError> {
        self.with_retry(|pool| async move { files::get_archived(&pool, file_id).await })
            .await
    }

    pub async fn get_sync_data(&self, stable_id: &str) -> Result<SyncData, PostgresError> {
        self.with_retry(|pool| async move { files::get_sync_data(&pool, stable_id).await })
            .await
    }

    pub async fn get_user_files(
        &self,
        user: &str,
    ) -> Result<Vec<SubmissionFileInfo>, PostgresError> {
        self.with_retry(|pool| async move { files::get_user_files(&pool, user).await })
            .await
    }

    pub async fn list_active_users(&self) -> Result<Vec<String>, PostgresError> {
        self.single(|pool| async move { files::list_active_users(&pool).await })
            .await
    }

    /// Correlation id for a user/path pair not yet part of any dataset
    pub async fn get_corr_id(&self, user: &str, path: &str) -> Result<String, PostgresError> {
        self.with_retry(|pool| async move { events::get_corr_id(&pool, user, path).await })
            .await
    }

    // ==================== Datasets ====================

    pub async fn map_files_to_dataset(
        &self,
        dataset_id: &str,
        accession_ids: &[String],
    ) -> Result<(), PostgresError> {
        self.with_retry(|pool| async move {
            datasets::map_files_to_dataset(&pool, dataset_id, accession_ids).await
        })
        .await
    }

    pub async fn update_dataset_event(
        &self,
        dataset_id: &str,
        event: DatasetEvent,
        message: &str,
    ) -> Result<(), PostgresError> {
        self.with_retry(|pool| async move {
            datasets::update_dataset_event(&pool, dataset_id, event, message).await
        })
        .await
    }

    pub async fn get_dataset_status(&self, dataset_id: &str) -> Result<String, PostgresError> {
        self.with_retry(|pool| async move {
            datasets::get_dataset_status(&pool, dataset_id).await
        })
        .await
    }

    pub async fn dataset_exists(&self, dataset_id: &str) -> Result<bool, PostgresError> {
        self.with_retry(|pool| async move {
            datasets::check_if_dataset_exists(&pool, dataset_id).await
        })
        .await
    }

    // ==================== Key registry ====================

    pub async fn add_key_hash(
        &self,
        key_hash: &str,
        description: &str,
    ) -> Result<(), PostgresError> {
        self.with_retry(|pool| async move { keys::add_key_hash(&pool, key_hash, description).await })
            .await
    }

    pub async fn set_key_hash(&self, key_hash: &str, file_id: &str) -> Result<(), PostgresError> {
        self.single(|pool| async move { keys::set_key_hash(&pool, key_hash, file_id).await })
            .await
    }
}

#[cfg(test)]
mod tests {
    // FileStore tests exercise SQL against the sda schema and require a
    // running PostgreSQL instance; they are run as integration tests.
}
