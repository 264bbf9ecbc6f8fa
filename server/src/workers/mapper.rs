//! Dataset mapper
//!
//! Consumes `mapping` and `release` messages. The mapper is the single
//! writer of dataset state: the admin API only publishes the command.

use std::sync::Arc;

use async_trait::async_trait;

use super::{MessageHandler, Outcome};
use crate::broker::Message;
use crate::data::{DatasetEvent, FileStore, PostgresError};

pub struct MapperHandler {
    store: Arc<FileStore>,
}

impl MapperHandler {
    pub fn new(store: Arc<FileStore>) -> Self {
        Self { store }
    }

    async fn map(&self, dataset_id: &str, accession_ids: &[String]) -> Outcome {
        match self.store.map_files_to_dataset(dataset_id, accession_ids).await {
            Ok(()) => {}
            // an accession that resolves to no file cannot succeed on retry
            Err(PostgresError::Database(sqlx::Error::RowNotFound)) => {
                return Outcome::Reject {
                    reason: format!(
                        "mapping of dataset {} failed: unknown accession id",
                        dataset_id
                    ),
                    file_id: None,
                };
            }
            Err(e) => {
                return Outcome::Retry {
                    reason: e.to_string(),
                };
            }
        }

        match self
            .store
            .update_dataset_event(dataset_id, DatasetEvent::Registered, "{}")
            .await
        {
            // the mapping itself is idempotent, so a redelivery that only
            // needs the event row can retry safely
            Ok(()) => Outcome::Success { publish: None },
            Err(e) => Outcome::Retry {
                reason: e.to_string(),
            },
        }
    }

    async fn release(&self, dataset_id: &str) -> Outcome {
        match self.store.dataset_exists(dataset_id).await {
            Ok(true) => {}
            Ok(false) => {
                return Outcome::Reject {
                    reason: format!("cannot release unknown dataset {}", dataset_id),
                    file_id: None,
                };
            }
            Err(e) => {
                return Outcome::Retry {
                    reason: e.to_string(),
                };
            }
        }

        match self.store.get_dataset_status(dataset_id).await {
            // already released: a redelivery, ack and move on
            Ok(status) if status == DatasetEvent::Released.as_str() => {
                tracing::debug!(dataset_id, "Dataset already released");
                return Outcome::Success { publish: None };
            }
            Ok(_) => {}
            // no event row yet is fine, the mapping may predate event logging
            Err(PostgresError::Database(sqlx::Error::RowNotFound)) => {}
            Err(e) => {
                return Outcome::Retry {
                    reason: e.to_string(),
                };
            }
        }

        match self
            .store
            .update_dataset_event(dataset_id, DatasetEvent::Released, "{}")
            .await
        {
            Ok(()) => Outcome::Success { publish: None },
            Err(e) => Outcome::Retry {
                reason: e.to_string(),
            },
        }
    }
}

#[async_trait]
impl MessageHandler for MapperHandler {
    fn name(&self) -> &'static str {
        "mapper"
    }

    fn input_schema(&self, message_type: &str) -> Option<&'static str> {
        match message_type {
            "mapping" => Some("dataset-mapping"),
            "release" => Some("dataset-release"),
            _ => None,
        }
    }

    async fn handle(&self, message: &Message, _correlation_id: &str) -> Outcome {
        match message {
            Message::Mapping {
                dataset_id,
                accession_ids,
            } => self.map(dataset_id, accession_ids).await,
            Message::Release { dataset_id } => self.release(dataset_id).await,
            _ => Outcome::Reject {
                reason: "mapper received a message it does not handle".to_string(),
                file_id: None,
            },
        }
    }
}
