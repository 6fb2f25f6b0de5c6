use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::app::chapter::{Chapter, validate_chapters};

pub(crate) const COLLECTION_KEY: &str = "chapters";
pub(crate) const CURSOR_KEY: &str = "activeIndex";

/// Durable key-value slot for the session. The whole chapter collection is
/// serialized under a single well-known key and written through on every
/// state change.
pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Ok(Self { conn })
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS session_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM session_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            r#"
            INSERT INTO session_state (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value, now],
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn save_raw_for_tests(&self, key: &str, value: &str) -> Result<()> {
        self.set(key, value)
    }

    pub(crate) fn updated_at(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT updated_at FROM session_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Restores the persisted collection, falling back to the seed when the
    /// slot is absent, unparseable, or fails validation. Corrupt state means
    /// "start fresh", never a crash.
    pub(crate) fn load_chapters(&self, seed: &[Chapter]) -> Vec<Chapter> {
        let raw = match self.get(COLLECTION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return seed.to_vec(),
            Err(err) => {
                eprintln!("Warning: failed to read persisted chapters: {err}; starting fresh");
                return seed.to_vec();
            }
        };
        match serde_json::from_str::<Vec<Chapter>>(&raw) {
            Ok(chapters) if validate_chapters(&chapters) => chapters,
            _ => seed.to_vec(),
        }
    }

    pub(crate) fn save_chapters(&self, chapters: &[Chapter]) -> Result<()> {
        let raw = serde_json::to_string(chapters).context("failed to serialize chapters")?;
        self.set(COLLECTION_KEY, &raw)
            .context("failed to persist chapter progress")
    }

    /// The navigation cursor survives process exit in its own slot; an
    /// unusable value degrades to the first chapter.
    pub(crate) fn load_cursor(&self) -> usize {
        let raw = match self.get(CURSOR_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return 0,
            Err(err) => {
                eprintln!("Warning: failed to read active chapter index: {err}; starting fresh");
                return 0;
            }
        };
        raw.parse().unwrap_or(0)
    }

    pub(crate) fn save_cursor(&self, active_index: usize) -> Result<()> {
        self.set(CURSOR_KEY, &active_index.to_string())
            .context("failed to persist active chapter index")
    }
}
