//! Per-tick clipboard observation record.
//!
//! A [`ClipboardSnapshot`] is created on every monitor tick from whatever the
//! clipboard and foreground-window queries returned. It is ephemeral: the
//! monitor consumes it within the same tick and only derived values (state
//! fields, history rows) outlive it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single observation of the clipboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardSnapshot {
    /// The clipboard text as read this tick.
    pub raw_text: String,

    /// Name of the process that owned the foreground window at read time.
    /// `"unknown"` when the platform query failed.
    pub source_process: String,

    /// Title of the foreground window at read time. Empty when the platform
    /// query failed.
    pub window_title: String,

    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// BLAKE3 hash of `raw_text`, used for history deduplication.
    pub content_hash: String,
}

impl ClipboardSnapshot {
    /// Create a snapshot taken now.
    #[must_use]
    pub fn new(raw_text: String, source_process: String, window_title: String) -> Self {
        let content_hash = Self::compute_hash(&raw_text);
        Self {
            raw_text,
            source_process,
            window_title,
            timestamp: Utc::now(),
            content_hash,
        }
    }

    /// Compute the BLAKE3 hash of the given content.
    #[must_use]
    pub fn compute_hash(content: &str) -> String {
        blake3::hash(content.as_bytes()).to_hex().to_string()
    }

    /// Check whether the snapshot carries no text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw_text.is_empty()
    }
}
