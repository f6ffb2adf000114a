//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::model::{BinaryRecord, CrawlResultAction, CrawlingEntry, Package};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{EntryKind, RunRecord, RunStatus, StorageStats};
use crate::SearchError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SearchError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SearchError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for tests and dry runs)
    pub fn new_in_memory() -> Result<Self, SearchError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn read_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
        Ok(RunRecord {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            config_hash: row.get(3)?,
            status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                .unwrap_or(RunStatus::Running),
        })
    }

    fn count(&self, table: &str) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?;
        Ok(count as u64)
    }
}

fn decode<T: BinaryRecord>(key: &str, bytes: &[u8]) -> StorageResult<T> {
    T::from_bytes(bytes).map_err(|source| StorageError::Corrupt {
        key: key.to_string(),
        source,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                Self::read_run,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                Self::read_run,
            )
            .optional()?;

        Ok(run)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Completed.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Crawl Entries =====

    fn get_entry(&self, kind: EntryKind, key: &str) -> StorageResult<Option<CrawlingEntry>> {
        let blob: Option<Vec<u8>> = self
            .conn
            .query_row(
                &format!("SELECT entry FROM {} WHERE name = ?1", kind.table()),
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        blob.map(|bytes| decode(key, &bytes)).transpose()
    }

    fn put_entry(
        &mut self,
        kind: EntryKind,
        key: &str,
        entry: &CrawlingEntry,
    ) -> StorageResult<()> {
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (name, schedule_at, entry) VALUES (?1, ?2, ?3)",
                kind.table()
            ),
            params![key, entry.schedule_time.timestamp_millis(), entry.to_bytes()],
        )?;
        Ok(())
    }

    fn ensure_entry(
        &mut self,
        kind: EntryKind,
        key: &str,
        entry: &CrawlingEntry,
    ) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} (name, schedule_at, entry) VALUES (?1, ?2, ?3)",
                kind.table()
            ),
            params![key, entry.schedule_time.timestamp_millis(), entry.to_bytes()],
        )?;
        Ok(inserted > 0)
    }

    fn delete_entry(&mut self, kind: EntryKind, key: &str) -> StorageResult<()> {
        self.conn.execute(
            &format!("DELETE FROM {} WHERE name = ?1", kind.table()),
            params![key],
        )?;
        Ok(())
    }

    fn due_entries(
        &self,
        kind: EntryKind,
        now: DateTime<Utc>,
    ) -> StorageResult<Vec<(String, CrawlingEntry)>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT name, entry FROM {} WHERE schedule_at <= ?1 ORDER BY schedule_at, name",
            kind.table()
        ))?;

        let rows = stmt.query_map(params![now.timestamp_millis()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (key, bytes) = row?;
            let entry = decode(&key, &bytes)?;
            entries.push((key, entry));
        }

        Ok(entries)
    }

    // ===== Package Snapshots =====

    fn get_doc(&self, path: &str) -> StorageResult<Option<Package>> {
        let blob: Option<Vec<u8>> = self
            .conn
            .query_row("SELECT doc FROM docs WHERE path = ?1", params![path], |row| {
                row.get(0)
            })
            .optional()?;

        blob.map(|bytes| decode(path, &bytes)).transpose()
    }

    fn put_doc(&mut self, package: &Package) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO docs (path, doc, updated_at) VALUES (?1, ?2, ?3)",
            params![package.package, package.to_bytes(), now],
        )?;
        Ok(())
    }

    fn delete_doc(&mut self, path: &str) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM docs WHERE path = ?1", params![path])?;
        Ok(())
    }

    // ===== Index Actions =====

    fn append_action(
        &mut self,
        run_id: i64,
        path: &str,
        action: &CrawlResultAction,
    ) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO actions (run_id, path, action) VALUES (?1, ?2, ?3)",
            params![run_id, path, action.to_bytes()],
        )?;
        Ok(())
    }

    fn actions_for_run(&self, run_id: i64) -> StorageResult<Vec<(String, CrawlResultAction)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT path, action FROM actions WHERE run_id = ?1 ORDER BY id")?;

        let rows = stmt.query_map(params![run_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;

        let mut actions = Vec::new();
        for row in rows {
            let (path, bytes) = row?;
            let action = decode(&path, &bytes)?;
            actions.push((path, action));
        }

        Ok(actions)
    }

    // ===== Statistics =====

    fn stats(&self) -> StorageResult<StorageStats> {
        Ok(StorageStats {
            packages: self.count(EntryKind::Package.table())?,
            persons: self.count(EntryKind::Person.table())?,
            docs: self.count("docs")?,
            actions: self.count("actions")?,
            runs: self.count("runs")?,
        })
    }
}
