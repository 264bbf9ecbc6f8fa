//! PostgreSQL migration management
//!
//! Handles schema initialization and versioned migrations.

use sqlx::PgPool;

use super::error::PostgresError;
use super::schema::{SCHEMA, SCHEMA_VERSION};

/// Run all pending migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), PostgresError> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = 'sda'
            AND table_name = 'dbschema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        tracing::debug!("Applying initial schema v{}", SCHEMA_VERSION);
        apply_initial_schema(pool).await?;
        return Ok(());
    }

    let current_version: Option<i32> =
        sqlx::query_scalar("SELECT MAX(version) FROM sda.dbschema_version")
            .fetch_one(pool)
            .await?;

    match current_version {
        None => {
            tracing::debug!("Applying initial schema v{}", SCHEMA_VERSION);
            apply_initial_schema(pool).await?;
        }
        Some(v) if v < SCHEMA_VERSION => {
            tracing::debug!("Migrating schema from v{} to v{}", v, SCHEMA_VERSION);
            for version in (v + 1)..=SCHEMA_VERSION {
                apply_versioned_migration(pool, version).await?;
            }
        }
        Some(v) if v > SCHEMA_VERSION => {
            tracing::warn!(
                "Schema version {} is newer than application version {}. This may cause issues.",
                v,
                SCHEMA_VERSION
            );
        }
        _ => {
            tracing::debug!("Schema is up to date (v{})", SCHEMA_VERSION);
        }
    }

    Ok(())
}

/// Current schema version as recorded in the database
pub async fn current_version(pool: &PgPool) -> Result<i32, PostgresError> {
    let version: Option<i32> = sqlx::query_scalar("SELECT MAX(version) FROM sda.dbschema_version")
        .fetch_one(pool)
        .await?;
    Ok(version.unwrap_or(0))
}

/// Apply the initial schema
async fn apply_initial_schema(pool: &PgPool) -> Result<(), PostgresError> {
    sqlx::query(SCHEMA).execute(pool).await?;

    sqlx::query(
        "INSERT INTO sda.dbschema_version (version, description)
         VALUES ($1, 'Initial schema')
         ON CONFLICT (version) DO NOTHING",
    )
    .bind(SCHEMA_VERSION)
    .execute(pool)
    .await?;

    tracing::debug!("Schema v{} applied successfully", SCHEMA_VERSION);
    Ok(())
}

/// Apply a specific versioned migration
///
/// Add new migrations here as the schema evolves. Versions at or below
/// `SCHEMA_VERSION` of the initial release are covered by the SCHEMA
/// constant.
#[allow(unused_variables, clippy::match_single_binding)]
async fn apply_versioned_migration(pool: &PgPool, version: i32) -> Result<(), PostgresError> {
    let (name, sql): (&str, &str) = match version {
        // Example:
        // 5 => ("add_some_column", "ALTER TABLE sda.files ..."),
        _ => {
            return Err(PostgresError::MigrationFailed {
                version,
                name: "unknown".to_string(),
                error: format!("No migration defined for version {}", version),
            });
        }
    };

    #[allow(unreachable_code)]
    {
        sqlx::query(sql)
            .execute(pool)
            .await
            .map_err(|e| PostgresError::MigrationFailed {
                version,
                name: name.to_string(),
                error: e.to_string(),
            })?;

        sqlx::query("INSERT INTO sda.dbschema_version (version, description) VALUES ($1, $2)")
            .bind(version)
            .bind(name)
            .execute(pool)
            .await?;

        tracing::debug!("Migration v{} ({}) applied", version, name);
        Ok(())
    }
}
