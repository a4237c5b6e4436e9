//! `SQLite` schema definitions for clipsentry.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the history table.
pub const CREATE_HISTORY_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    source_process TEXT,
    original_text TEXT NOT NULL,
    redacted_text TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the mask-mappings child table.
pub const CREATE_MAPPINGS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS mask_mappings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    history_id INTEGER NOT NULL REFERENCES history(id) ON DELETE CASCADE,
    original_text TEXT NOT NULL,
    masked_text TEXT NOT NULL,
    category TEXT NOT NULL,
    position INTEGER NOT NULL
)
";

/// SQL statement to create an index on timestamp for efficient queries.
pub const CREATE_TIMESTAMP_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_history_timestamp ON history(timestamp DESC)
";

/// SQL statement to create an index on `content_hash` for deduplication.
pub const CREATE_HASH_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_history_hash ON history(content_hash)
";

/// SQL statement to create an index on `source_process` for filtering.
pub const CREATE_PROCESS_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_history_process ON history(source_process)
";

/// SQL statement to create an index on `history_id` for mapping lookups.
pub const CREATE_MAPPING_PARENT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_mappings_history ON mask_mappings(history_id)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_HISTORY_TABLE,
    CREATE_MAPPINGS_TABLE,
    CREATE_TIMESTAMP_INDEX,
    CREATE_HASH_INDEX,
    CREATE_PROCESS_INDEX,
    CREATE_MAPPING_PARENT_INDEX,
    CREATE_METADATA_TABLE,
];
