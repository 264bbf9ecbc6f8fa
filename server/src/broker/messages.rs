//! Typed pipeline messages
//!
//! Every message on the wire is JSON with a `type` discriminator. The enum
//! ties each variant to the schema it must satisfy and the routing key it
//! travels on, so a handler cannot publish a message past the wrong
//! validator.

use serde::{Deserialize, Serialize};

use crate::core::constants::{
    ROUTING_KEY_ACCESSION, ROUTING_KEY_COMPLETED, ROUTING_KEY_INGEST, ROUTING_KEY_MAPPINGS,
};

/// A checksum of the decrypted payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Checksum {
    #[serde(rename = "type")]
    pub hash_type: String,
    pub value: String,
}

impl Checksum {
    pub fn sha256(value: impl Into<String>) -> Self {
        Self {
            hash_type: "sha256".to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Message {
    /// Tell the ingest worker to pick a file up from the inbox
    #[serde(rename = "ingest")]
    Ingest { user: String, filepath: String },

    /// Assign a stable accession id to a verified file
    #[serde(rename = "accession")]
    Accession {
        accession_id: String,
        user: String,
        filepath: String,
        decrypted_checksums: Vec<Checksum>,
    },

    /// Map a set of accessions into a dataset
    #[serde(rename = "mapping")]
    Mapping {
        dataset_id: String,
        accession_ids: Vec<String>,
    },

    /// Release a dataset for download
    #[serde(rename = "release")]
    Release { dataset_id: String },

    /// A file finished the ingestion pipeline
    #[serde(rename = "ingestion-completion")]
    IngestionCompletion {
        user: String,
        filepath: String,
        accession_id: String,
        decrypted_checksums: Vec<Checksum>,
    },
}

impl Message {
    /// Schema this message is validated against, on publish and on consume
    pub fn schema_name(&self) -> &'static str {
        match self {
            Self::Ingest { .. } => "ingestion-trigger",
            Self::Accession { .. } => "ingestion-accession",
            Self::Mapping { .. } => "dataset-mapping",
            Self::Release { .. } => "dataset-release",
            Self::IngestionCompletion { .. } => "ingestion-completion",
        }
    }

    /// Routing key on the configured exchange
    pub fn routing_key(&self) -> &'static str {
        match self {
            Self::Ingest { .. } => ROUTING_KEY_INGEST,
            Self::Accession { .. } => ROUTING_KEY_ACCESSION,
            Self::Mapping { .. } | Self::Release { .. } => ROUTING_KEY_MAPPINGS,
            Self::IngestionCompletion { .. } => ROUTING_KEY_COMPLETED,
        }
    }

    /// The submitting user, when the message carries one
    pub fn user(&self) -> Option<&str> {
        match self {
            Self::Ingest { user, .. }
            | Self::Accession { user, .. }
            | Self::IngestionCompletion { user, .. } => Some(user),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn ingest_wire_format() {
        let msg = Message::Ingest {
            user: "test.user@example.com".to_string(),
            filepath: "inbox/user/file-1.c4gh".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type":"ingest","user":"test.user@example.com","filepath":"inbox/user/file-1.c4gh"})
        );
        assert_eq!(msg.schema_name(), "ingestion-trigger");
        assert_eq!(msg.routing_key(), "ingest");
    }

    #[test]
    fn accession_wire_format() {
        let msg = Message::Accession {
            accession_id: "API:accession-id-01".to_string(),
            user: "dummy".to_string(),
            filepath: "/inbox/dummy/file11.c4gh".to_string(),
            decrypted_checksums: vec![Checksum::sha256("cafef00d")],
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "accession");
        assert_eq!(value["decrypted_checksums"][0]["type"], "sha256");

        let parsed: Message = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn release_and_mapping_share_a_routing_key() {
        let mapping = Message::Mapping {
            dataset_id: "API:dataset-01".to_string(),
            accession_ids: vec!["a".to_string(), "b".to_string()],
        };
        let release = Message::Release {
            dataset_id: "API:dataset-01".to_string(),
        };
        assert_eq!(mapping.routing_key(), "mappings");
        assert_eq!(release.routing_key(), "mappings");
        assert_ne!(mapping.schema_name(), release.schema_name());
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result: Result<Message, _> =
            serde_json::from_value(json!({"type":"greeting","hello":"world"}));
        assert!(result.is_err());
    }
}
