//! Domain types shared by the store, the workers and the API

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// File lifecycle events, the closed set accepted by `sda.file_event_log`.
///
/// The latest event per file defines its current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEvent {
    Registered,
    Uploaded,
    Submitted,
    Ingested,
    Archived,
    Verified,
    BackedUp,
    Ready,
    Disabled,
    Enabled,
    Error,
}

impl FileEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Uploaded => "uploaded",
            Self::Submitted => "submitted",
            Self::Ingested => "ingested",
            Self::Archived => "archived",
            Self::Verified => "verified",
            Self::BackedUp => "backed up",
            Self::Ready => "ready",
            Self::Disabled => "disabled",
            Self::Enabled => "enabled",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "registered" => Some(Self::Registered),
            "uploaded" => Some(Self::Uploaded),
            "submitted" => Some(Self::Submitted),
            "ingested" => Some(Self::Ingested),
            "archived" => Some(Self::Archived),
            "verified" => Some(Self::Verified),
            "backed up" => Some(Self::BackedUp),
            "ready" => Some(Self::Ready),
            "disabled" => Some(Self::Disabled),
            "enabled" => Some(Self::Enabled),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Whether a file with this latest event may be assigned an accession.
    /// Only a verified payload (or one already backed up) qualifies.
    pub fn admits_accession(&self) -> bool {
        matches!(self, Self::Verified | Self::BackedUp)
    }
}

impl fmt::Display for FileEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dataset lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetEvent {
    Registered,
    Released,
    Deprecated,
}

impl DatasetEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Released => "released",
            Self::Deprecated => "deprecated",
        }
    }
}

impl fmt::Display for DatasetEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a checksum was computed. A file carries at most one per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumSource {
    Uploaded,
    Archived,
    Unencrypted,
}

impl ChecksumSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "UPLOADED",
            Self::Archived => "ARCHIVED",
            Self::Unencrypted => "UNENCRYPTED",
        }
    }
}

/// Result of the pre-assignment accession lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessionCheck {
    /// Already assigned to this very file; assigning again is a no-op
    Same,
    /// Taken by another file; assigning would violate uniqueness
    Duplicate,
    /// Unused
    Available,
}

/// Archive-side facts about a file, written by `set_archived` and
/// `set_verified` and read back when building pipeline messages.
#[derive(Debug, Clone, Default)]
pub struct FileInfo {
    /// Archive path of the encrypted payload
    pub path: String,
    /// Size of the encrypted payload in the archive
    pub size: i64,
    /// SHA256 of the encrypted payload
    pub checksum: String,
    pub decrypted_size: i64,
    pub decrypted_checksum: String,
}

/// A submitter-visible file listing entry: inbox path annotated with the
/// latest lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmissionFileInfo {
    pub inbox_path: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Facts another site needs to sync an accessioned file
#[derive(Debug, Clone, Serialize)]
pub struct SyncData {
    pub user: String,
    pub file_path: String,
    pub checksum: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_round_trip() {
        for event in [
            FileEvent::Registered,
            FileEvent::Uploaded,
            FileEvent::Submitted,
            FileEvent::Ingested,
            FileEvent::Archived,
            FileEvent::Verified,
            FileEvent::BackedUp,
            FileEvent::Ready,
            FileEvent::Disabled,
            FileEvent::Enabled,
            FileEvent::Error,
        ] {
            assert_eq!(FileEvent::parse(event.as_str()), Some(event));
        }
        assert_eq!(FileEvent::parse("unknown"), None);
        assert_eq!(FileEvent::BackedUp.as_str(), "backed up");
    }

    #[test]
    fn checksum_source_names() {
        assert_eq!(ChecksumSource::Uploaded.as_str(), "UPLOADED");
        assert_eq!(ChecksumSource::Archived.as_str(), "ARCHIVED");
        assert_eq!(ChecksumSource::Unencrypted.as_str(), "UNENCRYPTED");
    }

    #[test]
    fn accession_admissibility() {
        assert!(FileEvent::Verified.admits_accession());
        assert!(FileEvent::BackedUp.admits_accession());
        assert!(!FileEvent::Uploaded.admits_accession());
        assert!(!FileEvent::Error.admits_accession());
    }
}
