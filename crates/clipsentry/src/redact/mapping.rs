//! Reversible redaction mappings.
//!
//! Every masking decision made during a pipeline pass is recorded as a
//! [`RedactionMapping`]. The list is replaced wholesale per clipboard item
//! and is what makes a later unmask pass possible. Admission into the list
//! is guarded: one mapping per distinct original text, and originals that
//! already look like mask output (the should-erase denylist) are rejected so
//! a second pass over masked text never stacks placeholders.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// A single original-to-masked substitution recorded during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionMapping {
    /// The text that was replaced.
    pub original: String,
    /// What it was replaced with.
    pub masked: String,
    /// Which stage produced the mapping (`"Code"`, `"EMAIL"`, `"PHONE"`,
    /// `"NER"`, `"CUSTOM_REGEX (<pattern>)"`).
    pub category: String,
    /// Insertion order within the pass, starting at 0.
    pub order: usize,
}

/// The mapping list for one pipeline pass, with admission control.
#[derive(Debug, Clone, Default)]
pub struct MappingList {
    mappings: Vec<RedactionMapping>,
    deny_patterns: Vec<String>,
}

impl MappingList {
    /// Create an empty list with the given should-erase denylist.
    ///
    /// `deny_patterns` are substring patterns; an original containing any of
    /// them is refused admission.
    #[must_use]
    pub fn new(deny_patterns: Vec<String>) -> Self {
        Self {
            mappings: Vec::new(),
            deny_patterns,
        }
    }

    /// Try to record a substitution.
    ///
    /// Returns `false` without recording when the original already has a
    /// mapping this pass or matches the should-erase denylist. Callers must
    /// only perform the textual replacement when this returns `true`.
    pub fn try_add(&mut self, original: &str, masked: &str, category: &str) -> bool {
        if self.mappings.iter().any(|m| m.original == original) {
            trace!(%original, "duplicate original, mapping refused");
            return false;
        }
        if self
            .deny_patterns
            .iter()
            .any(|pattern| !pattern.is_empty() && original.contains(pattern))
        {
            trace!(%original, "original matches should-erase denylist, mapping refused");
            return false;
        }

        let order = self.mappings.len();
        self.mappings.push(RedactionMapping {
            original: original.to_string(),
            masked: masked.to_string(),
            category: category.to_string(),
            order,
        });
        true
    }

    /// The recorded mappings in insertion order.
    #[must_use]
    pub fn mappings(&self) -> &[RedactionMapping] {
        &self.mappings
    }

    /// Consume the list, returning the recorded mappings.
    #[must_use]
    pub fn into_mappings(self) -> Vec<RedactionMapping> {
        self.mappings
    }

    /// Number of recorded mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Whether any mapping has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// Reverse-apply a mapping list to `candidate`.
///
/// Longest masked token first, so `PARAMETER_NAME_1_1_2` is consumed before
/// a shorter label could match inside it. Each masked token is turned into a
/// pattern whose trailing digit run becomes a digit wildcard, tolerating
/// renumbering between passes. A substitution only happens while the
/// mapping's original text is still present verbatim in
/// `original_reference`; this bounds, but does not eliminate, the damage
/// when distinct originals collapse to the same wildcard. Best-effort by
/// construction, not an exact inverse.
#[must_use]
pub fn unmask(candidate: &str, original_reference: &str, mappings: &[RedactionMapping]) -> String {
    let mut sorted: Vec<&RedactionMapping> = mappings.iter().collect();
    sorted.sort_by(|a, b| b.masked.len().cmp(&a.masked.len()));

    let mut result = candidate.to_string();
    for mapping in sorted {
        if mapping.masked.is_empty() || mapping.original.is_empty() {
            continue;
        }
        if !original_reference.contains(&mapping.original) {
            trace!(masked = %mapping.masked, "original no longer in reference, skipping");
            continue;
        }

        let pattern = wildcard_pattern(mapping.masked.trim_end());
        let regex = match Regex::new(&pattern) {
            Ok(r) => r,
            Err(e) => {
                warn!(%pattern, error = %e, "unmask pattern failed to compile, skipping");
                continue;
            }
        };

        let ranges: Vec<(usize, usize)> = regex
            .find_iter(&result)
            .map(|m| (m.start(), m.end()))
            .collect();
        for (start, end) in ranges.into_iter().rev() {
            result.replace_range(start..end, &mapping.original);
        }
    }
    result
}

/// Build a regex source matching `masked` with its trailing digit run
/// replaced by a digit wildcard (`PERSON1` matches `PERSON7`,
/// `METHOD_NAME_1_2` matches `METHOD_NAME_1_9`).
fn wildcard_pattern(masked: &str) -> String {
    let trimmed_len = masked.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if trimmed_len == masked.len() {
        regex::escape(masked)
    } else {
        format!("{}\\d+", regex::escape(&masked[..trimmed_len]))
    }
}

/// Fraction of mappings whose masked token appears in `text`.
///
/// The monitor uses this to recognize a re-copy of previously masked
/// content: a high ratio means the new clipboard text is mostly made of the
/// previous pass's placeholders.
#[must_use]
pub fn masked_token_ratio(mappings: &[RedactionMapping], text: &str) -> f64 {
    if mappings.is_empty() {
        return 0.0;
    }
    let hits = mappings
        .iter()
        .filter(|m| !m.masked.is_empty() && text.contains(m.masked.trim_end()))
        .count();
    #[allow(clippy::cast_precision_loss)]
    {
        hits as f64 / mappings.len() as f64
    }
}
