//! Foreground-application trust decisions.
//!
//! The monitor asks [`TrustEvaluator::is_trusted`] once per unchanged tick
//! with the current foreground window title. The evaluator derives a
//! candidate program name from the title and matches it against the
//! configured application list. The evaluator holds no state of its own: it
//! reads the application list from the configuration snapshot it is built
//! from, so edits to the list take effect on the next tick.

use tracing::trace;

use crate::config::TrustedApp;

/// Decides whether the foreground application may see original clipboard
/// content.
#[derive(Debug, Clone)]
pub struct TrustEvaluator {
    /// Registered applications, sorted longest name first so the most
    /// specific registration wins a substring match.
    apps: Vec<TrustedApp>,
}

impl TrustEvaluator {
    /// Build an evaluator over the given application list.
    #[must_use]
    pub fn new(mut apps: Vec<TrustedApp>) -> Self {
        apps.sort_by(|a, b| b.name.len().cmp(&a.name.len()));
        Self { apps }
    }

    /// Decide trust for the window carrying `window_title`.
    ///
    /// An empty derived program name (OS chrome, desktop shells, failed
    /// queries that yielded bare separators) is treated as trusted so the
    /// clipboard is not rewritten while no real application holds focus. An
    /// unrecognized program is untrusted.
    #[must_use]
    pub fn is_trusted(&self, window_title: &str) -> bool {
        let program = derive_program_name(window_title);
        if program.is_empty() {
            trace!("empty program name derived from {window_title:?}, treating as trusted");
            return true;
        }

        let program_lower = program.to_lowercase();
        for app in &self.apps {
            let name_lower = app.name.to_lowercase();
            if name_lower.is_empty() {
                continue;
            }
            if program_lower.contains(&name_lower) || name_lower.contains(&program_lower) {
                if app.deleted {
                    trace!(app = %app.name, "matched a deleted entry, untrusted");
                    return false;
                }
                trace!(app = %app.name, enabled = app.enabled, "matched trusted-app entry");
                return app.enabled;
            }
        }

        trace!(%program, "no trusted-app entry matched, untrusted");
        false
    }
}

/// Derive a candidate program name from a window title.
///
/// Window titles commonly end with the application name after the last
/// `" - "` separator (`"report.txt - Notepad"`). Keep the part after the last
/// separator, then strip a short trailing extension left over from titles
/// that are bare file names (`"notes.txt"` becomes `"notes"`).
#[must_use]
pub fn derive_program_name(window_title: &str) -> String {
    let tail = match window_title.rfind(" - ") {
        Some(idx) => &window_title[idx + 3..],
        None => window_title,
    };
    let tail = tail.trim();

    // Strip a trailing ".ext" only when it looks like a file extension, not
    // a dotted product name like "Microsoft Word 365.2". This is deliberately
    // narrower than stripping at the last dot unconditionally: suffixes longer
    // than four characters or containing non-alphanumerics stay put.
    if let Some(dot) = tail.rfind('.') {
        let ext = &tail[dot + 1..];
        if !ext.is_empty() && ext.len() <= 4 && ext.chars().all(char::is_alphanumeric) {
            return tail[..dot].trim().to_string();
        }
    }
    tail.to_string()
}
