//! PostgreSQL error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PostgresError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration {version} ({name}) failed: {error}")]
    MigrationFailed {
        version: i32,
        name: String,
        error: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("database ping timed out")]
    PingTimeout,

    #[error("something went wrong with the query zero rows were changed")]
    ZeroRows,

    #[error("key hash already exists or no rows were updated")]
    KeyHashExists,

    #[error("database schema v{required} required, found v{found}")]
    SchemaVersion { required: i32, found: i32 },

    #[error("invalid hex in stored header: {0}")]
    InvalidHeader(#[from] hex::FromHexError),
}

impl PostgresError {
    /// Errors whose outcome cannot change on a retry. The store's retry
    /// loops short-circuit on these instead of sleeping through the
    /// backoff schedule.
    pub fn is_definitive(&self) -> bool {
        matches!(
            self,
            Self::Database(sqlx::Error::RowNotFound)
                | Self::KeyHashExists
                | Self::SchemaVersion { .. }
                | Self::InvalidHeader(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rows_message() {
        assert_eq!(
            PostgresError::ZeroRows.to_string(),
            "something went wrong with the query zero rows were changed"
        );
    }

    #[test]
    fn definitive_classification() {
        assert!(PostgresError::Database(sqlx::Error::RowNotFound).is_definitive());
        assert!(PostgresError::KeyHashExists.is_definitive());
        assert!(
            PostgresError::SchemaVersion {
                required: 4,
                found: 2
            }
            .is_definitive()
        );
        assert!(!PostgresError::ZeroRows.is_definitive());
        assert!(!PostgresError::PingTimeout.is_definitive());
    }
}
