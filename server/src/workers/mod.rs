//! Worker skeleton
//!
//! Every broker consumer follows the same protocol:
//!
//! 1. Pull a delivery from its queue.
//! 2. Validate the body against the input schema for its `type`.
//!    Invalid bodies are dropped (nack without requeue), never re-queued.
//! 3. Resolve the correlation id from the envelope; mint one if this
//!    worker is the first to see the file.
//! 4. Run the handler, which uses the store's retrying operations.
//! 5. Publish the next-stage message (schema-validated) and only then
//!    ack the input. A worker dying between the work and the publish
//!    costs a redelivery, never lost state.
//! 6. Transient failures are returned to the queue after a bounded
//!    pause; non-recoverable ones append an `error` event and are acked
//!    so they cannot loop forever.

pub mod accession;
pub mod mapper;

pub use accession::AccessionHandler;
pub use mapper::MapperHandler;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use lapin::message::Delivery;
use lapin::options::{BasicAckOptions, BasicNackOptions};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::broker::{Broker, Message};
use crate::core::constants::WORKER_REQUEUE_PAUSE_SECS;
use crate::data::{FileEvent, FileStore};
use crate::schemas::SchemaRegistry;

/// What a handler decided about one delivery
#[derive(Debug)]
pub enum Outcome {
    /// Work is done; optionally emit the next stage's message, then ack
    Success { publish: Option<Message> },
    /// Transient failure (database blip, broker hiccup); nack-requeue
    /// after a bounded pause
    Retry { reason: String },
    /// Non-recoverable failure; append an `error` event when the file is
    /// known, then ack so the message never loops
    Reject {
        reason: String,
        file_id: Option<String>,
    },
}

#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Consumer tag and log identity
    fn name(&self) -> &'static str;

    /// Input schema for a message `type` this worker accepts;
    /// `None` means the delivery is dropped.
    fn input_schema(&self, message_type: &str) -> Option<&'static str>;

    async fn handle(&self, message: &Message, correlation_id: &str) -> Outcome;
}

/// Drives one queue through a handler with the ack discipline above
pub struct Worker {
    broker: Arc<Broker>,
    store: Arc<FileStore>,
    registry: Arc<SchemaRegistry>,
    queue: String,
}

impl Worker {
    pub fn new(
        broker: Arc<Broker>,
        store: Arc<FileStore>,
        registry: Arc<SchemaRegistry>,
        queue: impl Into<String>,
    ) -> Self {
        Self {
            broker,
            store,
            registry,
            queue: queue.into(),
        }
    }

    /// Spawn the consumer loop; it stops when the shutdown signal fires
    pub fn spawn(
        self,
        handler: Arc<dyn MessageHandler>,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run(handler, shutdown).await;
        })
    }

    async fn run(&self, handler: Arc<dyn MessageHandler>, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                return;
            }

            let mut consumer = match self.broker.consume(&self.queue, handler.name()).await {
                Ok(consumer) => consumer,
                Err(e) => {
                    tracing::warn!(
                        worker = handler.name(),
                        error = %e,
                        "Failed to start consumer, retrying"
                    );
                    tokio::select! {
                        _ = shutdown.changed() => return,
                        _ = tokio::time::sleep(Duration::from_secs(5)) => continue,
                    }
                }
            };

            tracing::info!(worker = handler.name(), queue = %self.queue, "Worker consuming");

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            tracing::debug!(worker = handler.name(), "Worker shutting down");
                            return;
                        }
                    }
                    delivery = consumer.next() => {
                        match delivery {
                            Some(Ok(delivery)) => self.process(&*handler, delivery).await,
                            Some(Err(e)) => {
                                tracing::warn!(worker = handler.name(), error = %e, "Consumer error, restarting");
                                break;
                            }
                            None => {
                                tracing::warn!(worker = handler.name(), "Consumer stream ended, restarting");
                                break;
                            }
                        }
                    }
                }
            }
        }
    }

    async fn process(&self, handler: &dyn MessageHandler, delivery: Delivery) {
        let value: serde_json::Value = match serde_json::from_slice(&delivery.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(worker = handler.name(), error = %e, "Dropping unparseable message");
                Self::nack_drop(&delivery).await;
                return;
            }
        };

        let Some(message_type) = value.get("type").and_then(|t| t.as_str()) else {
            tracing::error!(worker = handler.name(), "Dropping message without a type");
            Self::nack_drop(&delivery).await;
            return;
        };

        let Some(schema) = handler.input_schema(message_type) else {
            tracing::error!(
                worker = handler.name(),
                message_type,
                "Dropping message of unexpected type"
            );
            Self::nack_drop(&delivery).await;
            return;
        };

        if let Err(e) = self.registry.validate(schema, &value) {
            tracing::error!(worker = handler.name(), error = %e, "Dropping invalid message");
            Self::nack_drop(&delivery).await;
            return;
        }

        let message: Message = match serde_json::from_value(value.clone()) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(worker = handler.name(), error = %e, "Dropping undecodable message");
                Self::nack_drop(&delivery).await;
                return;
            }
        };

        let correlation_id = delivery
            .properties
            .correlation_id()
            .as_ref()
            .map(|s| s.as_str().to_string())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        match handler.handle(&message, &correlation_id).await {
            Outcome::Success { publish } => {
                if let Some(next) = publish {
                    if let Err(e) = self.broker.publish(&next, &correlation_id).await {
                        tracing::error!(
                            worker = handler.name(),
                            correlation_id,
                            error = %e,
                            "Publish of next-stage message failed, requeueing input"
                        );
                        Self::nack_requeue(&delivery).await;
                        return;
                    }
                }
                Self::ack(&delivery).await;
            }
            Outcome::Retry { reason } => {
                tracing::warn!(
                    worker = handler.name(),
                    correlation_id,
                    reason,
                    "Transient failure, requeueing after pause"
                );
                tokio::time::sleep(Duration::from_secs(WORKER_REQUEUE_PAUSE_SECS)).await;
                Self::nack_requeue(&delivery).await;
            }
            Outcome::Reject { reason, file_id } => {
                tracing::error!(
                    worker = handler.name(),
                    correlation_id,
                    reason,
                    "Rejecting message"
                );
                if let Some(file_id) = file_id {
                    let raw = String::from_utf8_lossy(&delivery.data);
                    if let Err(e) = self
                        .store
                        .update_file_event_log(
                            &file_id,
                            FileEvent::Error,
                            &correlation_id,
                            message.user().unwrap_or_default(),
                            &reason,
                            &raw,
                        )
                        .await
                    {
                        tracing::error!(error = %e, "Failed to append error event");
                    }
                }
                Self::ack(&delivery).await;
            }
        }
    }

    async fn ack(delivery: &Delivery) {
        if let Err(e) = delivery.acker.ack(BasicAckOptions::default()).await {
            tracing::error!(error = %e, "Ack failed");
        }
    }

    async fn nack_requeue(delivery: &Delivery) {
        let options = BasicNackOptions {
            requeue: true,
            ..Default::default()
        };
        if let Err(e) = delivery.acker.nack(options).await {
            tracing::error!(error = %e, "Nack (requeue) failed");
        }
    }

    async fn nack_drop(delivery: &Delivery) {
        let options = BasicNackOptions {
            requeue: false,
            ..Default::default()
        };
        if let Err(e) = delivery.acker.nack(options).await {
            tracing::error!(error = %e, "Nack (drop) failed");
        }
    }
}
