//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the pkgsearch database.
//! Crawl entries, snapshots and actions are stored as binary records
//! (see [`crate::model::codec`]); the `schedule_at` column duplicates the
//! entry's schedule time in Unix milliseconds so due entries can be found
//! through an index.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Scheduling record per package import path
CREATE TABLE IF NOT EXISTS package_entries (
    name TEXT PRIMARY KEY,
    schedule_at INTEGER NOT NULL,
    entry BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_package_entries_schedule ON package_entries(schedule_at);

-- Scheduling record per person id
CREATE TABLE IF NOT EXISTS person_entries (
    name TEXT PRIMARY KEY,
    schedule_at INTEGER NOT NULL,
    entry BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_person_entries_schedule ON person_entries(schedule_at);

-- Latest snapshot per package
CREATE TABLE IF NOT EXISTS docs (
    path TEXT PRIMARY KEY,
    doc BLOB NOT NULL,
    updated_at TEXT NOT NULL
);

-- Index actions, in the order they were produced
CREATE TABLE IF NOT EXISTS actions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    path TEXT NOT NULL,
    action BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_actions_run ON actions(run_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
