//! Error types for clipsentry.
//!
//! The governing policy is "never lose or corrupt the user's clipboard
//! content": nothing in the core escalates to a crash, and the monitor loop
//! treats every error here as a reason to log and continue. The variants
//! exist so callers can tell a transient platform hiccup from a real bug.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for clipsentry operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Platform Errors ===
    /// Clipboard or foreground-window query failed; retried next tick.
    #[error("transient platform I/O failure: {0}")]
    TransientIo(String),

    // === Storage Errors ===
    /// Failed to open or create the history database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Redaction Errors ===
    /// A user-supplied pattern failed to compile. Only that pattern is
    /// skipped; the rest of the pass still applies.
    #[error("invalid custom regex pattern '{pattern}': {message}")]
    RegexCompile {
        /// The offending pattern.
        pattern: String,
        /// The compile error text.
        message: String,
    },

    /// The length-loss guard tripped; the whole pass is discarded and the
    /// original text returned.
    #[error("redaction pass discarded: output shrank below {limit_percent}% of input")]
    ReconstructionIntegrity {
        /// Minimum acceptable output length as a percentage of input.
        limit_percent: u8,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An operation timed out.
    #[error("operation timed out: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
    },

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for clipsentry operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl From<clipsentry_platform::PlatformError> for Error {
    fn from(err: clipsentry_platform::PlatformError) -> Self {
        Self::TransientIo(err.to_string())
    }
}

impl Error {
    /// Create a transient platform I/O error.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::TransientIo(message.into())
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a regex compile error for a user pattern.
    #[must_use]
    pub fn regex_compile(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RegexCompile {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Check if this error should be retried on the next tick instead of
    /// being surfaced.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientIo(_))
    }

    /// Check if this error is the reconstruction length guard.
    #[must_use]
    pub fn is_integrity_guard(&self) -> bool {
        matches!(self, Self::ReconstructionIntegrity { .. })
    }
}
