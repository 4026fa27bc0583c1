//! Local SQLite cache holding the most recent archive.
//!
//! Uses two fixed keys so a later `publish` or `git-sync` run can pick up
//! the archive without re-exporting.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::{AppError, ArchiveDocument, Result};

/// Key for the serialized archive.
pub const JSON_DATA_KEY: &str = "json_data";

/// Key for the archive's file name.
pub const BACKUP_FILENAME_KEY: &str = "backup_filename";

/// Key/value cache backed by SQLite.
pub struct ArchiveCache {
    conn: Connection,
}

impl ArchiveCache {
    /// Opens or creates the cache database.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or schema creation fails.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create cache directory", e))?;
        }

        let conn = Connection::open(path).map_err(AppError::cache)?;
        let cache = Self { conn };
        cache.init_schema()?;

        Ok(cache)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(AppError::cache)?;
        let cache = Self { conn };
        cache.init_schema()?;
        Ok(cache)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r"
            CREATE TABLE IF NOT EXISTS cache (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
            )
            .map_err(AppError::cache)
    }

    /// Set a key, replacing any previous value.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO cache (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value],
            )
            .map_err(AppError::cache)?;
        Ok(())
    }

    /// Get a key's value.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM cache WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .map_err(AppError::cache)
    }

    /// Store the latest archive under the fixed keys.
    pub fn store_archive(&self, document: &ArchiveDocument) -> Result<()> {
        self.set(JSON_DATA_KEY, &document.json)?;
        self.set(BACKUP_FILENAME_KEY, &document.file_name)?;
        tracing::debug!(file_name = %document.file_name, "Archive cached");
        Ok(())
    }

    /// Cached archive JSON and, if recorded, its file name.
    pub fn archive(&self) -> Result<Option<(String, Option<String>)>> {
        let Some(json) = self.get(JSON_DATA_KEY)? else {
            return Ok(None);
        };
        Ok(Some((json, self.get(BACKUP_FILENAME_KEY)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_cache() {
        let cache = ArchiveCache::open_in_memory().unwrap();
        assert!(cache.archive().unwrap().is_none());
    }

    #[test]
    fn test_store_and_load_archive() {
        let cache = ArchiveCache::open_in_memory().unwrap();
        let doc = ArchiveDocument {
            file_name: "gpt-backup-2024-01-01-00-00-00.json".into(),
            json: "[]".into(),
        };

        cache.store_archive(&doc).unwrap();

        let (json, name) = cache.archive().unwrap().unwrap();
        assert_eq!(json, "[]");
        assert_eq!(name.as_deref(), Some("gpt-backup-2024-01-01-00-00-00.json"));
    }

    #[test]
    fn test_overwrite_keeps_latest() {
        let cache = ArchiveCache::open_in_memory().unwrap();
        cache.set(JSON_DATA_KEY, "[1]").unwrap();
        cache.set(JSON_DATA_KEY, "[2]").unwrap();

        assert_eq!(cache.get(JSON_DATA_KEY).unwrap().as_deref(), Some("[2]"));
        assert!(cache.get(BACKUP_FILENAME_KEY).unwrap().is_none());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.db");

        ArchiveCache::open(&path)
            .unwrap()
            .set(BACKUP_FILENAME_KEY, "a.json")
            .unwrap();

        let reopened = ArchiveCache::open(&path).unwrap();
        assert_eq!(reopened.get(BACKUP_FILENAME_KEY).unwrap().as_deref(), Some("a.json"));
    }
}
