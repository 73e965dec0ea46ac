use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::CounterError;

/// Key under which the artifact counter is stored
pub const IMAGE_COUNTER: &str = "image_counter";

/// The CounterStore persists integer counters in a small SQLite database.
/// It hands out the index used to name each generated artifact, so the
/// value must survive restarts and only ever grow.
pub struct CounterStore {
    conn: Connection,
    db_path: PathBuf,
}

impl CounterStore {
    /// Open (or create) the counter database at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self, CounterError> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CounterError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(db_path)?;

        info!("📁 Counter store opened at: {}", db_path.display());

        let store = CounterStore {
            conn,
            db_path: db_path.to_path_buf(),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Default location of the counter database
    /// - Linux: ~/.local/share/evolution-kiosk/counter.db
    /// - macOS: ~/Library/Application Support/evolution-kiosk/counter.db
    /// - Windows: %APPDATA%\evolution-kiosk\counter.db
    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        path.push("evolution-kiosk");
        path.push("counter.db");
        path
    }

    fn init_schema(&self) -> Result<(), CounterError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS counters (
                key             TEXT PRIMARY KEY,
                value           INTEGER NOT NULL,
                updated_at      INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Last persisted value of the artifact counter (0 if never used)
    pub fn current(&self) -> Result<i64, CounterError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM counters WHERE key = ?1",
                [IMAGE_COUNTER],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.unwrap_or(0))
    }

    /// Increment the artifact counter and return the new value.
    ///
    /// The read-modify-write runs in one immediate transaction; the value
    /// counts as used only once the commit succeeds.
    pub fn next(&mut self) -> Result<i64, CounterError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let last: i64 = tx
            .query_row(
                "SELECT value FROM counters WHERE key = ?1",
                [IMAGE_COUNTER],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(0);
        let next = last + 1;

        tx.execute(
            "INSERT INTO counters (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![IMAGE_COUNTER, next, Utc::now().timestamp()],
        )?;
        tx.commit()?;

        debug!("Artifact counter advanced to {}", next);
        Ok(next)
    }
}

impl std::fmt::Debug for CounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}
