//! Embedded SQL migrations.
//!
//! Migrations are embedded at compile time and applied idempotently; each
//! applied migration records a checksum that is verified on later runs so a
//! silently edited migration file is caught instead of half-applied.

use protoreg_core::digest::shake256;
use rusqlite::Connection;

use crate::errors::{checksum_mismatch, from_rusqlite, migration_error, Result};

/// Migration metadata
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

/// Get all embedded migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_initial_schema",
        sql: include_str!("../migrations/001_initial_schema.sql"),
    }]
}

/// Apply all pending migrations to the database
pub fn apply_migrations(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY,
            migration_id TEXT NOT NULL UNIQUE,
            applied_at INTEGER NOT NULL,
            checksum TEXT NOT NULL
        )",
        [],
    )
    .map_err(|e| from_rusqlite("create_schema_version", e))?;

    for migration in get_migrations() {
        apply_migration(conn, migration.id, migration.sql)?;
    }

    Ok(())
}

fn apply_migration(conn: &mut Connection, migration_id: &str, sql: &str) -> Result<()> {
    let checksum = compute_checksum(sql);

    let applied: Option<String> = conn
        .query_row(
            "SELECT checksum FROM schema_version WHERE migration_id = ?1",
            [migration_id],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(from_rusqlite("query_schema_version", other)),
        })?;

    if let Some(recorded) = applied {
        if recorded != checksum {
            return Err(checksum_mismatch(migration_id, &recorded, &checksum));
        }
        return Ok(());
    }

    let tx = conn
        .transaction()
        .map_err(|e| from_rusqlite("migration_begin", e))?;

    tx.execute_batch(sql)
        .map_err(|e| migration_error(migration_id, &e.to_string()))?;

    tx.execute(
        "INSERT INTO schema_version (migration_id, applied_at, checksum) VALUES (?1, ?2, ?3)",
        rusqlite::params![migration_id, chrono::Utc::now().timestamp_millis(), checksum],
    )
    .map_err(|e| from_rusqlite("record_migration", e))?;

    tx.commit().map_err(|e| from_rusqlite("migration_commit", e))
}

fn compute_checksum(sql: &str) -> String {
    hex::encode(shake256(sql.as_bytes()))
}
