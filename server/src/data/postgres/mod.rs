//! PostgreSQL database service
//!
//! Centralized connection management for the `sda` schema:
//! - Connection pooling with bounded acquire timeout
//! - A ping probe with a one second deadline, shared by readiness checks
//! - Pool rebuild when the ping fails, so callers can
//!   check-and-reconnect before every attempt
//!
//! All schema definitions and migrations are managed here.

pub mod error;
mod migrations;
pub mod repositories;
pub mod schema;

pub use error::PostgresError;
pub use sqlx::PgPool;

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use tokio::sync::RwLock;

use crate::core::config::DbConfig;
use crate::core::constants::{
    DB_DEFAULT_ACQUIRE_TIMEOUT_SECS, DB_DEFAULT_MAX_CONNECTIONS, DB_PING_TIMEOUT_SECS,
};

/// PostgreSQL database service
///
/// Created once at startup and shared across the API and all consumers.
/// The pool lives behind a lock so a failed ping can swap in a rebuilt
/// pool without interrupting concurrent readers.
pub struct PostgresService {
    options: PgConnectOptions,
    pool: RwLock<PgPool>,
}

impl PostgresService {
    /// Initialize the service, run migrations, and report the schema version
    pub async fn init(config: &DbConfig) -> Result<Self, PostgresError> {
        let ssl_mode = PgSslMode::from_str(&config.sslmode)
            .map_err(|_| PostgresError::Config(format!("invalid sslmode: {}", config.sslmode)))?;

        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
            .ssl_mode(ssl_mode);

        let pool = Self::build_pool(options.clone()).await?;
        migrations::run_migrations(&pool).await?;

        tracing::debug!(
            host = %config.host,
            database = %config.database,
            "PostgresService initialized"
        );
        Ok(Self {
            options,
            pool: RwLock::new(pool),
        })
    }

    async fn build_pool(options: PgConnectOptions) -> Result<PgPool, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(DB_DEFAULT_MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(DB_DEFAULT_ACQUIRE_TIMEOUT_SECS))
            .connect_with(options)
            .await?;
        Ok(pool)
    }

    /// A clone of the current pool, cheap to hand out per operation
    pub async fn pool(&self) -> PgPool {
        self.pool.read().await.clone()
    }

    /// Ping the database with a short deadline
    pub async fn ping(&self) -> Result<(), PostgresError> {
        let pool = self.pool().await;
        match tokio::time::timeout(
            Duration::from_secs(DB_PING_TIMEOUT_SECS),
            sqlx::query("SELECT 1").execute(&pool),
        )
        .await
        {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(PostgresError::PingTimeout),
        }
    }

    /// Ping and, if the pool is no longer answering, rebuild it.
    ///
    /// Run before every store attempt: a database restart then costs one
    /// failed ping instead of a poisoned pool for the rest of the process.
    pub async fn check_and_reconnect(&self) {
        if self.ping().await.is_ok() {
            return;
        }

        tracing::warn!("Database ping failed, rebuilding connection pool");
        match Self::build_pool(self.options.clone()).await {
            Ok(new_pool) => {
                let mut guard = self.pool.write().await;
                let old = std::mem::replace(&mut *guard, new_pool);
                drop(guard);
                old.close().await;
                tracing::info!("Database connection pool rebuilt");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to rebuild database connection pool");
            }
        }
    }

    /// Schema version recorded in the database
    pub async fn schema_version(&self) -> Result<i32, PostgresError> {
        let pool = self.pool().await;
        migrations::current_version(&pool).await
    }

    /// Close the connection pool gracefully. A subsequent ping observes
    /// the pool as closed.
    pub async fn close(&self) {
        self.pool.read().await.close().await;
        tracing::debug!("PostgreSQL pool closed");
    }
}

#[cfg(test)]
mod tests {
    // PostgreSQL tests require a running PostgreSQL instance
    // and are typically run as integration tests
}
