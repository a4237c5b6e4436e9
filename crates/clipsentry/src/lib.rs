//! `clipsentry` - Clipboard content arbitration with reversible redaction
//!
//! This library watches the system clipboard, produces a redacted variant of
//! every copied item through a multi-stage masking pipeline, and decides per
//! foreground application whether it sees the original or the redacted
//! content. Redactions are recorded as reversible mappings so a re-copied
//! masked value can be reconstructed.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod redact;
pub mod snapshot;
pub mod state;
pub mod storage;
pub mod trust;

pub use config::{Config, SharedConfig};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use monitor::{ClipboardMonitor, MonitorHandle};
pub use redact::{RedactionMapping, RedactionOutcome, RedactionPipeline};
pub use snapshot::ClipboardSnapshot;
pub use state::{ExposedVariant, SharedState, StateSnapshot};
pub use storage::{HistoryEntry, Storage, StorageStats};
pub use trust::TrustEvaluator;
