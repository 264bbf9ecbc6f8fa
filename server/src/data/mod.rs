//! Data layer: the event-logged file store
//!
//! PostgreSQL is the single source of truth for pipeline progress. Every
//! lifecycle transition is an appended row in `sda.file_event_log`; the
//! current status of a file is always derived from the latest event, never
//! stored as a mutable column. Nothing here is cached in process memory,
//! because broker redelivery can happen at any time.

pub mod postgres;
pub mod store;
pub mod types;

pub use postgres::{PostgresError, PostgresService};
pub use store::FileStore;
pub use types::{
    AccessionCheck, ChecksumSource, DatasetEvent, FileEvent, FileInfo, SubmissionFileInfo,
    SyncData,
};
