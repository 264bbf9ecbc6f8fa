//! Broker error types

use thiserror::Error;

use crate::schemas::SchemaError;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("broker rejected the publish")]
    Nacked,
}

impl BrokerError {
    /// Validation failures are local and definitive; nothing was sent.
    pub fn is_schema_violation(&self) -> bool {
        matches!(self, Self::Schema(_))
    }
}
