use std::{path::Path, str::FromStr};

use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use tokio::fs;

use crate::{AnvylError, AnvylResult};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

static MIGRATOR: Migrator = sqlx::migrate!("lib/store/migrations");

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Opens (creating if necessary) the inventory database and runs migrations.
///
/// Only the infrastructure service calls this; every other process talks to
/// the inventory through the HTTP API.
pub async fn init_db(db_path: &Path) -> AnvylResult<Pool<Sqlite>> {
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))
        .map_err(AnvylError::custom)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    MIGRATOR.run(&pool).await?;

    Ok(pool)
}

/// Opens an in-memory database with the full schema applied.
///
/// A single connection is used so every caller sees the same database.
pub async fn init_memory_db() -> AnvylResult<Pool<Sqlite>> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(AnvylError::custom)?
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    MIGRATOR.run(&pool).await?;

    Ok(pool)
}

/// Classifies a database error against the store's constraint set.
///
/// Unique-index violations become `Conflict`, foreign-key violations become
/// `NotFound` (the referenced row is missing); everything else passes through.
pub(crate) fn classify_db_error(error: sqlx::Error, context: &str) -> AnvylError {
    if let sqlx::Error::Database(ref db_error) = error {
        match db_error.kind() {
            sqlx::error::ErrorKind::UniqueViolation => {
                return AnvylError::Conflict(context.to_string());
            }
            sqlx::error::ErrorKind::ForeignKeyViolation => {
                return AnvylError::NotFound(context.to_string());
            }
            _ => {}
        }
    }

    AnvylError::Database(error)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_apply_to_fresh_db() {
        let pool = init_memory_db().await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('hosts', 'containers')",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        assert_eq!(tables.len(), 2);
    }

    #[tokio::test]
    async fn test_init_db_creates_file_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("db.sqlite");

        let pool = init_db(&db_path).await.unwrap();
        drop(pool);

        assert!(db_path.exists());
    }
}
