//! Embedded SQL migrations and runner.
//!
//! Migrations are stored as `&str` constants and executed in order. A
//! `schema_migrations` table tracks which versions have been applied.
//!
//! The versions mirror how the `locations` table grew in deployed
//! environments: image columns arrived after the table, and the thumbnail
//! column after that. Databases stopped at an older version are still served;
//! see [`crate::schema`].

use rusqlite::Connection;
use lp_core::{Error, Result};

/// V1: location records with a legacy on-disk image reference.
const V1_INITIAL: &str = r#"
CREATE TABLE locations (
    id         INTEGER PRIMARY KEY,
    name       TEXT NOT NULL,
    latitude   REAL,
    longitude  REAL,
    image_path TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// V2: inline image payload and its MIME type.
const V2_IMAGE_DATA: &str = r#"
ALTER TABLE locations ADD COLUMN image_data BLOB;
ALTER TABLE locations ADD COLUMN image_type TEXT;
"#;

/// V3: thumbnail rendition.
const V3_THUMBNAIL: &str = r#"
ALTER TABLE locations ADD COLUMN thumbnail BLOB;
"#;

const MIGRATIONS: &[(i64, &str)] = &[(1, V1_INITIAL), (2, V2_IMAGE_DATA), (3, V3_THUMBNAIL)];

/// Latest schema version known to this build.
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|&(v, _)| v).unwrap_or(0)
}

/// Apply every pending migration.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    run_migrations_to(conn, latest_version())
}

/// Apply pending migrations up to and including `target`.
pub fn run_migrations_to(conn: &Connection, target: i64) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .map_err(|e| Error::database(format!("Failed to create schema_migrations: {e}")))?;

    let applied = current_version(conn)?;
    for &(version, sql) in MIGRATIONS
        .iter()
        .filter(|(v, _)| *v > applied && *v <= target)
    {
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        tx.execute_batch(sql)
            .map_err(|e| Error::database(format!("Migration V{version} failed: {e}")))?;

        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [version],
        )
        .map_err(|e| Error::database(e.to_string()))?;

        tx.commit().map_err(|e| Error::database(e.to_string()))?;

        tracing::debug!("Applied migration V{version}");
    }

    tracing::debug!("Schema at V{}", current_version(conn)?);
    Ok(())
}

/// Highest applied migration version, 0 for a fresh database.
pub fn current_version(conn: &Connection) -> Result<i64> {
    let exists: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_migrations'",
            [],
            |row| row.get(0),
        )
        .map_err(|e| Error::database(e.to_string()))?;
    if !exists {
        return Ok(0);
    }

    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}
