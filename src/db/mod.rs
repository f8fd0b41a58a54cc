pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

/// Open (or create) the ELIZA database at the given path with schema
/// initialized and migrations applied.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // WAL keeps readers unblocked while a turn is being saved
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open an in-memory database with schema and migrations applied.
pub fn open_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;
    Ok(conn)
}

/// Result of [`check_database_health`].
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub schema_version: u32,
    pub character_count: i64,
    pub history_count: i64,
    pub memory_count: i64,
    /// History or memory rows whose character row is missing.
    pub orphan_records: i64,
    pub integrity_ok: bool,
    pub integrity_details: String,
}

/// Run SQLite's integrity check and count records per table.
pub fn check_database_health(conn: &Connection) -> rusqlite::Result<HealthReport> {
    let schema_version = migrations::get_schema_version(conn)?;

    let count = |table: &str| -> rusqlite::Result<i64> {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
    };

    let orphan_records: i64 = conn.query_row(
        "SELECT
            (SELECT COUNT(*) FROM chat_histories h
                WHERE NOT EXISTS (SELECT 1 FROM characters c WHERE c.name = h.name))
          + (SELECT COUNT(*) FROM memory_banks m
                WHERE NOT EXISTS (SELECT 1 FROM characters c WHERE c.name = m.name))",
        [],
        |row| row.get(0),
    )?;

    let integrity_details: String =
        conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;

    Ok(HealthReport {
        schema_version,
        character_count: count("characters")?,
        history_count: count("chat_histories")?,
        memory_count: count("memory_banks")?,
        orphan_records,
        integrity_ok: integrity_details == "ok",
        integrity_details,
    })
}
