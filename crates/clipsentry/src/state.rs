//! Shared clipboard state.
//!
//! The monitor task is the sole writer of [`ClipboardState`]. Everything
//! else in the process (CLI queries, tests) goes through [`SharedState`] and
//! receives an owned [`StateSnapshot`]; no reference into the live state
//! ever escapes the mutex.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::redact::RedactionMapping;

/// Which variant of the clipboard content the system currently exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposedVariant {
    /// The clipboard holds the text as the user copied it.
    #[default]
    Original,
    /// The clipboard holds the redacted variant.
    Redacted,
}

/// The monitor's working record of the last clipboard item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipboardState {
    /// The text most recently seen on the clipboard, whichever variant.
    pub last_observed_text: String,
    /// The original text of the current clipboard item.
    pub last_original_text: String,
    /// The redacted variant of the current clipboard item.
    pub last_redacted_text: String,
    /// Process that owned the foreground window when the item was copied.
    pub last_source_process: String,
    /// Mapping list from the current item's redaction pass.
    pub current_mappings: Vec<RedactionMapping>,
    /// Which variant the clipboard currently holds.
    pub exposed_variant: ExposedVariant,
}

/// An owned copy of the state at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    /// See [`ClipboardState::last_observed_text`].
    pub last_observed_text: String,
    /// See [`ClipboardState::last_original_text`].
    pub last_original_text: String,
    /// See [`ClipboardState::last_redacted_text`].
    pub last_redacted_text: String,
    /// See [`ClipboardState::last_source_process`].
    pub last_source_process: String,
    /// See [`ClipboardState::current_mappings`].
    pub current_mappings: Vec<RedactionMapping>,
    /// See [`ClipboardState::exposed_variant`].
    pub exposed_variant: ExposedVariant,
}

impl From<&ClipboardState> for StateSnapshot {
    fn from(state: &ClipboardState) -> Self {
        Self {
            last_observed_text: state.last_observed_text.clone(),
            last_original_text: state.last_original_text.clone(),
            last_redacted_text: state.last_redacted_text.clone(),
            last_source_process: state.last_source_process.clone(),
            current_mappings: state.current_mappings.clone(),
            exposed_variant: state.exposed_variant,
        }
    }
}

/// Mutex-guarded handle over the clipboard state.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<ClipboardState>>,
}

impl SharedState {
    /// Create a handle over fresh, empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take an owned snapshot.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned, which only happens after a panic in
    /// the monitor task.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot::from(&*self.inner.lock().expect("state lock poisoned"))
    }

    /// Mutate the state under the lock. Only the monitor task calls this.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    pub(crate) fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut ClipboardState) -> R,
    {
        f(&mut self.inner.lock().expect("state lock poisoned"))
    }
}
