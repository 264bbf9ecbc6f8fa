//! AMQP broker adapter
//!
//! A typed message client with three guarantees:
//!
//! 1. **Validated publish**: every message is checked against its named
//!    schema before it leaves the process; invalid messages fail locally.
//! 2. **Manual-ack consumption**: deliveries arrive with a prefetch
//!    limit and are resolved with exactly one of ack, nack-requeue or
//!    nack-drop by the consumer.
//! 3. **Self-healing connection**: a closed connection or channel is
//!    rebuilt on the next health check or publish; a failed publish is
//!    retried once after reconnect.
//!
//! Publishes target the configured exchange with a per-message routing
//! key. Queues are declared by the broker's own definitions, never here.

pub mod error;
pub mod messages;

pub use error::BrokerError;
pub use messages::{Checksum, Message};

use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, BasicQosOptions, ConfirmSelectOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer};
use tokio::sync::RwLock;

use crate::core::config::BrokerConfig;
use crate::schemas::SchemaRegistry;

struct Inner {
    connection: Connection,
    channel: Channel,
}

pub struct Broker {
    config: BrokerConfig,
    registry: std::sync::Arc<SchemaRegistry>,
    inner: RwLock<Inner>,
}

impl Broker {
    /// Connect and open a publish channel with confirms enabled
    pub async fn connect(
        config: BrokerConfig,
        registry: std::sync::Arc<SchemaRegistry>,
    ) -> Result<Self, BrokerError> {
        let inner = Self::build(&config).await?;
        tracing::debug!(host = %config.host, vhost = %config.vhost, "Broker connected");
        Ok(Self {
            config,
            registry,
            inner: RwLock::new(inner),
        })
    }

    async fn build(config: &BrokerConfig) -> Result<Inner, BrokerError> {
        let connection =
            Connection::connect(&config.uri(), ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;
        Ok(Inner {
            connection,
            channel,
        })
    }

    pub async fn connection_ok(&self) -> bool {
        self.inner.read().await.connection.status().connected()
    }

    pub async fn channel_ok(&self) -> bool {
        self.inner.read().await.channel.status().connected()
    }

    /// Rebuild whatever part of the connection has gone away.
    /// Cheap when everything is healthy.
    pub async fn ensure_connected(&self) -> Result<(), BrokerError> {
        {
            let inner = self.inner.read().await;
            if inner.connection.status().connected() && inner.channel.status().connected() {
                return Ok(());
            }
        }

        let mut inner = self.inner.write().await;
        // Re-check under the write lock; another task may have won the race.
        if inner.connection.status().connected() && inner.channel.status().connected() {
            return Ok(());
        }

        if !inner.connection.status().connected() {
            tracing::warn!("Broker connection lost, reconnecting");
            *inner = Self::build(&self.config).await?;
        } else {
            tracing::warn!("Broker channel lost, reopening");
            let channel = inner.connection.create_channel().await?;
            channel
                .confirm_select(ConfirmSelectOptions::default())
                .await?;
            inner.channel = channel;
        }

        tracing::info!("Broker connection restored");
        Ok(())
    }

    /// Validate and publish a message; retried once after a reconnect.
    ///
    /// The correlation id travels as a message property so every consumer
    /// joins the same conversation about the file.
    pub async fn publish(
        &self,
        message: &Message,
        correlation_id: &str,
    ) -> Result<(), BrokerError> {
        let value = serde_json::to_value(message)?;
        self.registry.validate(message.schema_name(), &value)?;
        let payload = serde_json::to_vec(&value)?;

        match self
            .publish_raw(message.routing_key(), &payload, correlation_id)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(error = %e, "Publish failed, reconnecting for one retry");
                self.ensure_connected().await?;
                self.publish_raw(message.routing_key(), &payload, correlation_id)
                    .await
            }
        }
    }

    async fn publish_raw(
        &self,
        routing_key: &str,
        payload: &[u8],
        correlation_id: &str,
    ) -> Result<(), BrokerError> {
        let channel = self.inner.read().await.channel.clone();

        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_correlation_id(correlation_id.into())
            .with_delivery_mode(2);

        let confirm = channel
            .basic_publish(
                &self.config.exchange,
                routing_key,
                BasicPublishOptions::default(),
                payload,
                properties,
            )
            .await?
            .await?;

        if let lapin::publisher_confirm::Confirmation::Nack(_) = confirm {
            return Err(BrokerError::Nacked);
        }

        tracing::debug!(routing_key, correlation_id, "Message published");
        Ok(())
    }

    /// Start a manual-ack consumer on a queue with the configured prefetch
    pub async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> Result<Consumer, BrokerError> {
        self.ensure_connected().await?;
        let channel = self.inner.read().await.channel.clone();

        channel
            .basic_qos(self.config.prefetch, BasicQosOptions::default())
            .await?;

        let consumer = channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        tracing::debug!(queue, consumer_tag, "Consumer started");
        Ok(consumer)
    }

    /// Close the channel and the connection. Unacked deliveries return to
    /// their queues.
    pub async fn close(&self) {
        let inner = self.inner.read().await;
        if let Err(e) = inner.channel.close(200, "shutdown").await {
            tracing::warn!(error = %e, "Broker channel close failed");
        }
        if let Err(e) = inner.connection.close(200, "shutdown").await {
            tracing::warn!(error = %e, "Broker connection close failed");
        }
        tracing::debug!("Broker closed");
    }
}

#[cfg(test)]
mod tests {
    // Broker connection tests require a running AMQP broker
    // and are typically run as integration tests
}
