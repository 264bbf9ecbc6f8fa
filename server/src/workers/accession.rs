//! Accession assigner
//!
//! Consumes `accession` messages, writes the stable id onto the verified
//! file, appends the terminal `ready` event and emits the completion
//! message. Redeliveries are recognized through the pre-assignment check
//! and acked without a second write.

use std::sync::Arc;

use async_trait::async_trait;

use super::{MessageHandler, Outcome};
use crate::broker::{Checksum, Message};
use crate::data::{AccessionCheck, FileEvent, FileStore, PostgresError};

pub struct AccessionHandler {
    store: Arc<FileStore>,
}

impl AccessionHandler {
    pub fn new(store: Arc<FileStore>) -> Self {
        Self { store }
    }

    async fn assign(
        &self,
        accession_id: &str,
        user: &str,
        filepath: &str,
        decrypted_checksums: &[Checksum],
        correlation_id: &str,
    ) -> Outcome {
        let file_id = match self.store.get_file_id(correlation_id).await {
            Ok(id) => id,
            Err(PostgresError::Database(sqlx::Error::RowNotFound)) => {
                return Outcome::Reject {
                    reason: format!("no file known for correlation id {}", correlation_id),
                    file_id: None,
                };
            }
            Err(e) => {
                return Outcome::Retry {
                    reason: e.to_string(),
                };
            }
        };

        let status = match self.store.get_file_status(correlation_id).await {
            Ok(status) => status,
            Err(e) => {
                return Outcome::Retry {
                    reason: e.to_string(),
                };
            }
        };

        let completion = Message::IngestionCompletion {
            user: user.to_string(),
            filepath: filepath.to_string(),
            accession_id: accession_id.to_string(),
            decrypted_checksums: decrypted_checksums.to_vec(),
        };

        // A redelivery after the ready event only needs the completion
        // message re-emitted.
        if status == FileEvent::Ready.as_str() {
            if let Ok(AccessionCheck::Same) = self
                .store
                .check_accession_id_exists(accession_id, &file_id)
                .await
            {
                tracing::debug!(file_id, accession_id, "Accession already assigned");
                return Outcome::Success {
                    publish: Some(completion),
                };
            }
        }

        match FileEvent::parse(&status) {
            Some(event) if event.admits_accession() => {}
            _ => {
                return Outcome::Reject {
                    reason: format!("file in state '{}' cannot take an accession", status),
                    file_id: Some(file_id),
                };
            }
        }

        match self
            .store
            .check_accession_id_exists(accession_id, &file_id)
            .await
        {
            Ok(AccessionCheck::Available) => {
                if let Err(e) = self.store.set_accession_id(accession_id, &file_id).await {
                    return match e {
                        PostgresError::ZeroRows => Outcome::Reject {
                            reason: e.to_string(),
                            file_id: Some(file_id),
                        },
                        _ => Outcome::Retry {
                            reason: e.to_string(),
                        },
                    };
                }
            }
            Ok(AccessionCheck::Same) => {
                tracing::debug!(file_id, accession_id, "Accession already on this file");
            }
            Ok(AccessionCheck::Duplicate) => {
                return Outcome::Reject {
                    reason: format!("accession id {} is already taken", accession_id),
                    file_id: Some(file_id),
                };
            }
            Err(e) => {
                return Outcome::Retry {
                    reason: e.to_string(),
                };
            }
        }

        if let Err(e) = self
            .store
            .update_file_event_log(&file_id, FileEvent::Ready, correlation_id, user, "{}", "{}")
            .await
        {
            return Outcome::Retry {
                reason: e.to_string(),
            };
        }

        Outcome::Success {
            publish: Some(completion),
        }
    }
}

#[async_trait]
impl MessageHandler for AccessionHandler {
    fn name(&self) -> &'static str {
        "accession"
    }

    fn input_schema(&self, message_type: &str) -> Option<&'static str> {
        match message_type {
            "accession" => Some("ingestion-accession"),
            _ => None,
        }
    }

    async fn handle(&self, message: &Message, correlation_id: &str) -> Outcome {
        match message {
            Message::Accession {
                accession_id,
                user,
                filepath,
                decrypted_checksums,
            } => {
                self.assign(accession_id, user, filepath, decrypted_checksums, correlation_id)
                    .await
            }
            _ => Outcome::Reject {
                reason: "accession worker received a message it does not handle".to_string(),
                file_id: None,
            },
        }
    }
}
