//! Dataset operations

use sqlx::PgPool;

use crate::data::postgres::PostgresError;
use crate::data::types::DatasetEvent;

/// Map a set of accessioned files to a dataset.
///
/// The dataset row is created on first use. The mapping inserts run in one
/// transaction: if any accession fails to resolve, the whole call rolls
/// back and no mapping row survives.
pub async fn map_files_to_dataset(
    pool: &PgPool,
    dataset_id: &str,
    accession_ids: &[String],
) -> Result<(), PostgresError> {
    sqlx::query("INSERT INTO sda.datasets (stable_id) VALUES ($1) ON CONFLICT DO NOTHING")
        .bind(dataset_id)
        .execute(pool)
        .await?;

    let mut transaction = pool.begin().await?;

    for accession_id in accession_ids {
        let file_id: uuid::Uuid =
            match sqlx::query_scalar("SELECT id FROM sda.files WHERE stable_id = $1")
                .bind(accession_id)
                .fetch_one(&mut *transaction)
                .await
            {
                Ok(id) => id,
                Err(e) => {
                    tracing::error!(accession_id = %accession_id, error = %e, "Accession lookup failed");
                    transaction.rollback().await?;
                    return Err(e.into());
                }
            };

        if let Err(e) = sqlx::query(
            "INSERT INTO sda.file_dataset (file_id, dataset_id)
             SELECT $1, id FROM sda.datasets WHERE stable_id = $2
             ON CONFLICT DO NOTHING",
        )
        .bind(file_id)
        .bind(dataset_id)
        .execute(&mut *transaction)
        .await
        {
            tracing::error!(error = %e, "Dataset mapping insert failed");
            transaction.rollback().await?;
            return Err(e.into());
        }
    }

    transaction.commit().await?;
    Ok(())
}

/// Append a dataset lifecycle event
pub async fn update_dataset_event(
    pool: &PgPool,
    dataset_id: &str,
    event: DatasetEvent,
    message: &str,
) -> Result<(), PostgresError> {
    let result = sqlx::query(
        "INSERT INTO sda.dataset_event_log (dataset_id, event, message) VALUES ($1, $2, $3)",
    )
    .bind(dataset_id)
    .bind(event.as_str())
    .bind(message)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(PostgresError::ZeroRows);
    }

    Ok(())
}

/// Latest event for a dataset
pub async fn get_dataset_status(pool: &PgPool, dataset_id: &str) -> Result<String, PostgresError> {
    let status: String = sqlx::query_scalar(
        "SELECT event FROM sda.dataset_event_log WHERE dataset_id = $1 ORDER BY id DESC LIMIT 1",
    )
    .bind(dataset_id)
    .fetch_one(pool)
    .await?;

    Ok(status)
}

/// Whether a dataset is already registered
pub async fn check_if_dataset_exists(
    pool: &PgPool,
    dataset_id: &str,
) -> Result<bool, PostgresError> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT id FROM sda.datasets WHERE stable_id = $1)")
            .bind(dataset_id)
            .fetch_one(pool)
            .await?;

    Ok(exists)
}
