//! JSON schema registry
//!
//! Every message is validated twice: once before it leaves the process and
//! once when it is consumed. Schemas are loaded from a configured
//! directory; pointing the path at `schemas/isolated` or
//! `schemas/federated` selects the site profile. There is no schema
//! negotiation between sites: a profile mismatch surfaces as a validation
//! failure on the receiving side and the message is dropped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use jsonschema::Validator;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("unknown message schema: {0}")]
    Unknown(String),

    #[error("message failed validation against {schema}: {detail}")]
    Invalid { schema: String, detail: String },

    #[error("failed to load schema {name}: {detail}")]
    Load { name: String, detail: String },

    #[error("failed to read schemas directory {}: {source}", path.display())]
    Dir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Compiled validators, keyed by schema file stem
pub struct SchemaRegistry {
    schemas: HashMap<String, Validator>,
    path: PathBuf,
}

impl SchemaRegistry {
    /// Compile every `<name>.json` in the directory
    pub fn load(dir: &Path) -> Result<Self, SchemaError> {
        let entries = std::fs::read_dir(dir).map_err(|source| SchemaError::Dir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut schemas = HashMap::new();
        for entry in entries {
            let entry = entry.map_err(|source| SchemaError::Dir {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();

            let raw = std::fs::read_to_string(&path).map_err(|e| SchemaError::Load {
                name: name.clone(),
                detail: e.to_string(),
            })?;
            let schema: Value = serde_json::from_str(&raw).map_err(|e| SchemaError::Load {
                name: name.clone(),
                detail: e.to_string(),
            })?;
            let validator = jsonschema::validator_for(&schema).map_err(|e| SchemaError::Load {
                name: name.clone(),
                detail: e.to_string(),
            })?;

            schemas.insert(name, validator);
        }

        tracing::debug!(path = %dir.display(), count = schemas.len(), "Schemas loaded");
        Ok(Self {
            schemas,
            path: dir.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate an instance against a named schema
    pub fn validate(&self, name: &str, instance: &Value) -> Result<(), SchemaError> {
        let validator = self
            .schemas
            .get(name)
            .ok_or_else(|| SchemaError::Unknown(name.to_string()))?;

        validator
            .validate(instance)
            .map_err(|e| SchemaError::Invalid {
                schema: name.to_string(),
                detail: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn registry(profile: &str) -> SchemaRegistry {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("schemas")
            .join(profile);
        SchemaRegistry::load(&dir).unwrap()
    }

    #[test]
    fn isolated_accepts_canonical_payloads() {
        let reg = registry("isolated");

        reg.validate(
            "ingestion-trigger",
            &json!({"type":"ingest","user":"test.user@example.com","filepath":"inbox/user/file-1.c4gh"}),
        )
        .unwrap();

        reg.validate(
            "ingestion-accession",
            &json!({
                "type":"accession",
                "accession_id":"5fe7b660-afea-4c3a-88a9-3daabf055ebb",
                "user":"test.user@example.com",
                "filepath":"inbox/user/file-1.c4gh",
                "decrypted_checksums":[{"type":"sha256","value":"82e4e60e7beb3db2e06a00a079788f7d71f75b61a4b75f28c4c942703dabb6d6"}]
            }),
        )
        .unwrap();

        reg.validate(
            "dataset-mapping",
            &json!({
                "type":"mapping",
                "dataset_id":"cd532362-e06e-4460-8490-b9ce64b8d9e7",
                "accession_ids":["5fe7b660-afea-4c3a-88a9-3daabf055ebb"]
            }),
        )
        .unwrap();

        reg.validate(
            "dataset-release",
            &json!({"type":"release","dataset_id":"cd532362-e06e-4460-8490-b9ce64b8d9e7"}),
        )
        .unwrap();
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let reg = registry("isolated");
        let err = reg
            .validate("ingestion-trigger", &json!({"type":"ingest","user":"u"}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::Invalid { .. }));
    }

    #[test]
    fn empty_user_is_rejected() {
        let reg = registry("isolated");
        assert!(
            reg.validate(
                "ingestion-trigger",
                &json!({"type":"ingest","user":"","filepath":"inbox/user/file-1.c4gh"}),
            )
            .is_err()
        );
    }

    #[test]
    fn wrong_discriminator_is_rejected() {
        let reg = registry("isolated");
        assert!(
            reg.validate(
                "dataset-release",
                &json!({"type":"mapping","dataset_id":"cd532362"}),
            )
            .is_err()
        );
    }

    #[test]
    fn unknown_schema_name() {
        let reg = registry("isolated");
        let err = reg.validate("no-such-schema", &json!({})).unwrap_err();
        assert!(matches!(err, SchemaError::Unknown(_)));
    }

    #[test]
    fn federated_requires_accession_format() {
        let reg = registry("federated");

        // free-form ids pass the isolated profile but not the federated one
        assert!(
            reg.validate(
                "ingestion-accession",
                &json!({
                    "type":"accession",
                    "accession_id":"API:accession-id-01",
                    "user":"dummy",
                    "filepath":"/inbox/dummy/file11.c4gh",
                    "decrypted_checksums":[{"type":"sha256","value":"deadbeef"}]
                }),
            )
            .is_err()
        );

        reg.validate(
            "ingestion-accession",
            &json!({
                "type":"accession",
                "accession_id":"EGAF00000000001",
                "user":"dummy",
                "filepath":"/inbox/dummy/file11.c4gh",
                "decrypted_checksums":[{"type":"sha256","value":"deadbeef"}]
            }),
        )
        .unwrap();
    }

    #[test]
    fn federated_requires_dataset_format() {
        let reg = registry("federated");
        assert!(
            reg.validate(
                "dataset-mapping",
                &json!({
                    "type":"mapping",
                    "dataset_id":"API:dataset-01",
                    "accession_ids":["EGAF00000000001"]
                }),
            )
            .is_err()
        );

        reg.validate(
            "dataset-mapping",
            &json!({
                "type":"mapping",
                "dataset_id":"EGAD00000000001",
                "accession_ids":["EGAF00000000001","EGAF00000000002"]
            }),
        )
        .unwrap();
    }
}
