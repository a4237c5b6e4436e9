//! Storage layer for clipsentry.
//!
//! This module provides `SQLite`-based persistent storage for clipboard
//! history. Each history row keeps the original and redacted text side by
//! side, with the pass's mask mappings in a child table so a stored item can
//! be fully reconstructed later.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::redact::RedactionMapping;
use crate::snapshot::ClipboardSnapshot;

/// One stored clipboard item with its redaction record.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct HistoryEntry {
    /// Unique identifier (assigned by storage).
    pub id: Option<i64>,
    /// When the item was observed.
    pub timestamp: DateTime<Utc>,
    /// Process that owned the foreground window at copy time.
    pub source_process: String,
    /// The text as copied.
    pub original_text: String,
    /// The redacted variant produced by the pipeline.
    pub redacted_text: String,
    /// BLAKE3 hash of the original text, used for deduplication.
    pub content_hash: String,
    /// The pass's mask mappings, in insertion order.
    pub mappings: Vec<RedactionMapping>,
}

impl HistoryEntry {
    /// Create an entry timestamped now.
    #[must_use]
    pub fn new(
        original_text: String,
        redacted_text: String,
        source_process: String,
        mappings: Vec<RedactionMapping>,
    ) -> Self {
        let content_hash = ClipboardSnapshot::compute_hash(&original_text);
        Self {
            id: None,
            timestamp: Utc::now(),
            source_process,
            original_text,
            redacted_text,
            content_hash,
            mappings,
        }
    }
}

/// Storage engine for clipboard history.
///
/// Provides persistent storage using `SQLite` with support for:
/// - History insertion with deduplication by content hash
/// - Retrieval of entries together with their mask mappings
/// - Automatic pruning by age and by entry count
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema
    /// initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL for concurrent reads, foreign keys for the mappings cascade
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a history entry together with its mappings.
    ///
    /// Returns the assigned ID, or `None` if the entry was deduplicated
    /// (an entry with the same original text already exists).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn add_entry(&self, entry: &HistoryEntry) -> Result<Option<i64>> {
        if self.exists_by_hash(&entry.content_hash)? {
            debug!(
                "Skipping duplicate history entry with hash {}",
                &entry.content_hash[..16]
            );
            return Ok(None);
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r"
            INSERT INTO history (timestamp, source_process, original_text, redacted_text, content_hash)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![
                entry.timestamp.to_rfc3339(),
                entry.source_process,
                entry.original_text,
                entry.redacted_text,
                entry.content_hash,
            ],
        )?;
        let id = tx.last_insert_rowid();

        for mapping in &entry.mappings {
            tx.execute(
                r"
                INSERT INTO mask_mappings (history_id, original_text, masked_text, category, position)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
                params![
                    id,
                    mapping.original,
                    mapping.masked,
                    mapping.category,
                    i64::try_from(mapping.order).unwrap_or(i64::MAX),
                ],
            )?;
        }
        tx.commit()?;

        debug!("Inserted history entry with id {}", id);
        Ok(Some(id))
    }

    /// Check if an entry with the given hash already exists.
    fn exists_by_hash(&self, hash: &str) -> Result<bool> {
        let count: i32 = self.conn.query_row(
            "SELECT COUNT(*) FROM history WHERE content_hash = ?1",
            [hash],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Get a history entry by its ID, mappings included.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: i64) -> Result<Option<HistoryEntry>> {
        let entry = self
            .conn
            .query_row(
                r"
                SELECT id, timestamp, source_process, original_text, redacted_text, content_hash
                FROM history WHERE id = ?1
                ",
                [id],
                Self::row_to_entry,
            )
            .optional()?;

        match entry {
            Some(mut entry) => {
                entry.mappings = self.mappings_for(id)?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Get the most recent history entries, mappings included.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_history(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, timestamp, source_process, original_text, redacted_text, content_hash
            FROM history ORDER BY timestamp DESC LIMIT ?1
            ",
        )?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut entries = stmt
            .query_map([limit_i64], Self::row_to_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for entry in &mut entries {
            if let Some(id) = entry.id {
                entry.mappings = self.mappings_for(id)?;
            }
        }
        Ok(entries)
    }

    /// Load the mappings belonging to one history row.
    fn mappings_for(&self, history_id: i64) -> Result<Vec<RedactionMapping>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT original_text, masked_text, category, position
            FROM mask_mappings WHERE history_id = ?1 ORDER BY position ASC
            ",
        )?;

        let mappings = stmt
            .query_map([history_id], |row| {
                let position: i64 = row.get(3)?;
                Ok(RedactionMapping {
                    original: row.get(0)?,
                    masked: row.get(1)?,
                    category: row.get(2)?,
                    order: usize::try_from(position).unwrap_or(usize::MAX),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(mappings)
    }

    /// Count total history entries in storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete a history entry by ID, cascading to its mappings.
    ///
    /// Returns `true` if an entry was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM history WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    /// Delete the entire history.
    ///
    /// Returns the number of entries deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn clear_history(&self) -> Result<usize> {
        let affected = self.conn.execute("DELETE FROM history", [])?;
        if affected > 0 {
            info!("Cleared {} history entries", affected);
        }
        Ok(affected)
    }

    /// Prune entries older than the given duration.
    ///
    /// Returns the number of entries deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn prune_older_than(&self, max_age: Duration) -> Result<usize> {
        let cutoff = Utc::now() - max_age;
        let cutoff_str = cutoff.to_rfc3339();

        let affected = self
            .conn
            .execute("DELETE FROM history WHERE timestamp < ?1", [cutoff_str])?;

        if affected > 0 {
            info!("Pruned {} old history entries", affected);
        }
        Ok(affected)
    }

    /// Prune entries to keep only the most recent N.
    ///
    /// Returns the number of entries deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn prune_keep_recent(&self, keep_count: usize) -> Result<usize> {
        let keep_i64 = i64::try_from(keep_count).unwrap_or(i64::MAX);
        let affected = self.conn.execute(
            r"
            DELETE FROM history WHERE id NOT IN (
                SELECT id FROM history ORDER BY timestamp DESC LIMIT ?1
            )
            ",
            [keep_i64],
        )?;

        if affected > 0 {
            info!("Pruned {} entries to keep {} recent", affected, keep_count);
        }
        Ok(affected)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let total_entries = self.count()?;

        let oldest: Option<String> = self
            .conn
            .query_row(
                "SELECT timestamp FROM history ORDER BY timestamp ASC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let newest: Option<String> = self
            .conn
            .query_row(
                "SELECT timestamp FROM history ORDER BY timestamp DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let oldest_entry = oldest
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        let newest_entry = newest
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_entries,
            oldest_entry,
            newest_entry,
            db_size_bytes,
        })
    }

    /// Convert a database row to a `HistoryEntry` without its mappings.
    fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<HistoryEntry> {
        let id: i64 = row.get(0)?;
        let timestamp_str: String = row.get(1)?;
        let source_process: Option<String> = row.get(2)?;
        let original_text: String = row.get(3)?;
        let redacted_text: String = row.get(4)?;
        let content_hash: String = row.get(5)?;

        let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
            .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

        Ok(HistoryEntry {
            id: Some(id),
            timestamp,
            source_process: source_process.unwrap_or_default(),
            original_text,
            redacted_text,
            content_hash,
            mappings: Vec::new(),
        })
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Total number of history entries stored.
    pub total_entries: i64,
    /// Timestamp of the oldest entry.
    pub oldest_entry: Option<DateTime<Utc>>,
    /// Timestamp of the newest entry.
    pub newest_entry: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(original: &str, redacted: &str) -> HistoryEntry {
        HistoryEntry::new(
            original.to_string(),
            redacted.to_string(),
            "testapp".to_string(),
            Vec::new(),
        )
    }

    fn entry_with_mappings(original: &str) -> HistoryEntry {
        HistoryEntry::new(
            original.to_string(),
            "redacted variant".to_string(),
            "testapp".to_string(),
            vec![
                RedactionMapping {
                    original: "alice@example.com".to_string(),
                    masked: "al***@example.com".to_string(),
                    category: "EMAIL".to_string(),
                    order: 0,
                },
                RedactionMapping {
                    original: "555-1234".to_string(),
                    masked: "****1234".to_string(),
                    category: "PHONE".to_string(),
                    order: 1,
                },
            ],
        )
    }

    #[test]
    fn test_open_in_memory() {
        let storage = Storage::open_in_memory().unwrap();
        assert_eq!(storage.count().unwrap(), 0);
    }

    #[test]
    fn test_add_and_get_entry() {
        let storage = Storage::open_in_memory().unwrap();
        let id = storage
            .add_entry(&entry("original text", "redacted text"))
            .unwrap()
            .unwrap();

        let loaded = storage.get(id).unwrap().unwrap();
        assert_eq!(loaded.original_text, "original text");
        assert_eq!(loaded.redacted_text, "redacted text");
        assert_eq!(loaded.source_process, "testapp");
        assert!(loaded.mappings.is_empty());
    }

    #[test]
    fn test_mappings_roundtrip() {
        let storage = Storage::open_in_memory().unwrap();
        let original = entry_with_mappings("text with alice@example.com and 555-1234");
        let id = storage.add_entry(&original).unwrap().unwrap();

        let loaded = storage.get(id).unwrap().unwrap();
        assert_eq!(loaded.mappings, original.mappings);
    }

    #[test]
    fn test_duplicate_entry_skipped() {
        let storage = Storage::open_in_memory().unwrap();
        assert!(storage.add_entry(&entry("same", "x")).unwrap().is_some());
        assert!(storage.add_entry(&entry("same", "y")).unwrap().is_none());
        assert_eq!(storage.count().unwrap(), 1);
    }

    #[test]
    fn test_get_history_recent_first() {
        let storage = Storage::open_in_memory().unwrap();
        let mut first = entry("first", "f");
        first.timestamp = Utc::now() - Duration::from_secs(10);
        storage.add_entry(&first).unwrap();
        storage.add_entry(&entry("second", "s")).unwrap();

        let history = storage.get_history(10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].original_text, "second");
        assert_eq!(history[1].original_text, "first");
    }

    #[test]
    fn test_get_history_respects_limit() {
        let storage = Storage::open_in_memory().unwrap();
        for i in 0..5 {
            storage.add_entry(&entry(&format!("item {i}"), "r")).unwrap();
        }
        assert_eq!(storage.get_history(3).unwrap().len(), 3);
    }

    #[test]
    fn test_get_missing_entry() {
        let storage = Storage::open_in_memory().unwrap();
        assert!(storage.get(12345).unwrap().is_none());
    }

    #[test]
    fn test_delete_cascades_to_mappings() {
        let storage = Storage::open_in_memory().unwrap();
        let id = storage
            .add_entry(&entry_with_mappings("to be deleted"))
            .unwrap()
            .unwrap();

        assert!(storage.delete(id).unwrap());
        assert!(storage.get(id).unwrap().is_none());

        let orphan_count: i64 = storage
            .conn
            .query_row("SELECT COUNT(*) FROM mask_mappings", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphan_count, 0);
    }

    #[test]
    fn test_clear_history() {
        let storage = Storage::open_in_memory().unwrap();
        storage.add_entry(&entry("one", "r")).unwrap();
        storage.add_entry(&entry("two", "r")).unwrap();

        assert_eq!(storage.clear_history().unwrap(), 2);
        assert_eq!(storage.count().unwrap(), 0);
    }

    #[test]
    fn test_prune_older_than() {
        let storage = Storage::open_in_memory().unwrap();
        let mut old = entry("ancient", "r");
        old.timestamp = Utc::now() - Duration::from_secs(90 * 24 * 3600);
        storage.add_entry(&old).unwrap();
        storage.add_entry(&entry("fresh", "r")).unwrap();

        let pruned = storage.prune_older_than(Duration::from_secs(30 * 24 * 3600)).unwrap();
        assert_eq!(pruned, 1);
        assert_eq!(storage.get_history(10).unwrap()[0].original_text, "fresh");
    }

    #[test]
    fn test_prune_keep_recent() {
        let storage = Storage::open_in_memory().unwrap();
        for i in 0..5 {
            let mut e = entry(&format!("item {i}"), "r");
            e.timestamp = Utc::now() - Duration::from_secs(100 - i);
            storage.add_entry(&e).unwrap();
        }

        let pruned = storage.prune_keep_recent(2).unwrap();
        assert_eq!(pruned, 3);
        assert_eq!(storage.count().unwrap(), 2);
    }

    #[test]
    fn test_stats() {
        let storage = Storage::open_in_memory().unwrap();
        storage.add_entry(&entry("content", "r")).unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.total_entries, 1);
        assert!(stats.oldest_entry.is_some());
        assert!(stats.newest_entry.is_some());
        assert_eq!(stats.db_size_bytes, 0);
    }
}
