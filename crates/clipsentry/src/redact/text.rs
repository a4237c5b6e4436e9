//! Prose redaction: named entities, email addresses, phone numbers.
//!
//! Text segments go through three passes in a fixed order. Named entities
//! come first so that an address like `alice@acme.com` is still intact when
//! the email pass looks for it. Each pass records its substitutions in the
//! shared mapping list; refused mappings leave the text untouched.

use std::collections::BTreeMap;

use regex::Regex;
use tracing::{trace, warn};

use super::mapping::MappingList;
use crate::config::{MaskStyle, RedactionConfig};

/// Matches most common email address shapes.
const EMAIL_PATTERN: &str = r"[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+";

/// Matches international and separator-heavy phone number shapes.
const PHONE_PATTERN: &str =
    r"\+?\d{1,4}?[-.\s]?\(?\d{1,3}?\)?[-.\s]?\d{1,4}[-.\s]?\d{1,4}[-.\s]?\d{1,9}";

/// A synchronous named-entity recognizer.
///
/// The returned map goes from entity text to its replacement label with a
/// per-label ordinal already applied (`"Alice Smith" -> "PERSON1"`).
/// Implementations are expected to swallow their own failures and return an
/// empty map; absence of a backend means the NER pass is a no-op.
pub trait NerBackend: Send + Sync {
    /// Find entities in `text` and propose replacements.
    fn analyze_entities(&self, text: &str) -> BTreeMap<String, String>;
}

/// Mask an email address according to `style`.
///
/// `Partial` keeps the first two characters of the local part and the full
/// domain; local parts of one or two characters are fully starred.
#[must_use]
pub fn mask_email(email: &str, style: MaskStyle, defined_text: &str) -> String {
    match style {
        MaskStyle::None => email.to_string(),
        MaskStyle::Asterisk => "*".repeat(email.chars().count()),
        MaskStyle::DefinedText => {
            if defined_text.is_empty() {
                "[MASKED_EMAIL]".to_string()
            } else {
                defined_text.to_string()
            }
        }
        MaskStyle::Partial => match email.split_once('@') {
            Some((local, domain)) => {
                let chars: Vec<char> = local.chars().collect();
                let masked_local = if chars.len() > 2 {
                    let kept: String = chars[..2].iter().collect();
                    format!("{kept}{}", "*".repeat(chars.len() - 2))
                } else {
                    "*".repeat(chars.len())
                };
                format!("{masked_local}@{domain}")
            }
            None => "*".repeat(email.chars().count()),
        },
    }
}

/// Mask a phone number according to `style`.
///
/// `Partial` keeps the trailing four characters visible.
#[must_use]
pub fn mask_phone(phone: &str, style: MaskStyle, defined_text: &str) -> String {
    match style {
        MaskStyle::None => phone.to_string(),
        MaskStyle::Asterisk => "*".repeat(phone.chars().count()),
        MaskStyle::DefinedText => {
            if defined_text.is_empty() {
                "[MASKED_PHONE]".to_string()
            } else {
                defined_text.to_string()
            }
        }
        MaskStyle::Partial => {
            let chars: Vec<char> = phone.chars().collect();
            if chars.len() > 4 {
                let tail: String = chars[chars.len() - 4..].iter().collect();
                format!("{}{tail}", "*".repeat(chars.len() - 4))
            } else {
                "*".repeat(chars.len())
            }
        }
    }
}

/// Redacts prose segments.
pub struct TextRedactor {
    email_regex: Option<Regex>,
    phone_regex: Option<Regex>,
    ner: Option<Box<dyn NerBackend>>,
}

impl std::fmt::Debug for TextRedactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRedactor")
            .field("ner", &self.ner.is_some())
            .finish_non_exhaustive()
    }
}

impl TextRedactor {
    /// Build a redactor without a NER backend.
    #[must_use]
    pub fn new() -> Self {
        let compile = |source: &str| match Regex::new(source) {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!(pattern = source, error = %e, "builtin pattern failed to compile");
                None
            }
        };
        Self {
            email_regex: compile(EMAIL_PATTERN),
            phone_regex: compile(PHONE_PATTERN),
            ner: None,
        }
    }

    /// Attach a NER backend.
    #[must_use]
    pub fn with_ner(mut self, ner: Box<dyn NerBackend>) -> Self {
        self.ner = Some(ner);
        self
    }

    /// Run the prose passes over `text` in order: entities, emails, phones.
    #[must_use]
    pub fn redact(
        &self,
        text: &str,
        config: &RedactionConfig,
        mappings: &mut MappingList,
    ) -> String {
        let mut result = text.to_string();

        if config.ner_enabled && text.len() >= config.min_len_ner {
            result = self.redact_entities(&result, config, mappings);
        }
        self.redact_contacts(&result, config, mappings)
    }

    /// Run only the email and phone passes.
    ///
    /// Code segments get this pass as well; an address pasted into source
    /// code is as sensitive as one in prose.
    #[must_use]
    pub fn redact_contacts(
        &self,
        text: &str,
        config: &RedactionConfig,
        mappings: &mut MappingList,
    ) -> String {
        let mut result = text.to_string();
        if config.email_enabled && config.email_mask_style != MaskStyle::None {
            result = self.redact_emails(&result, config, mappings);
        }
        if config.phone_enabled && config.phone_mask_style != MaskStyle::None {
            result = self.redact_phones(&result, config, mappings);
        }
        result
    }

    fn redact_entities(
        &self,
        text: &str,
        config: &RedactionConfig,
        mappings: &mut MappingList,
    ) -> String {
        let Some(ner) = &self.ner else {
            return text.to_string();
        };

        let mut result = text.to_string();
        for (original, replacement) in ner.analyze_entities(text) {
            if !label_enabled(&replacement, &config.ner_labels) {
                trace!(%replacement, "entity label not enabled, skipping");
                continue;
            }
            if mappings.try_add(&original, &replacement, "NER") {
                result = result.replace(&original, &replacement);
            }
        }
        result
    }

    fn redact_emails(
        &self,
        text: &str,
        config: &RedactionConfig,
        mappings: &mut MappingList,
    ) -> String {
        let Some(regex) = &self.email_regex else {
            return text.to_string();
        };

        let matches: Vec<String> = regex.find_iter(text).map(|m| m.as_str().to_string()).collect();
        let mut result = text.to_string();
        for email in matches {
            let masked = mask_email(&email, config.email_mask_style, &config.email_defined_text);
            if mappings.try_add(&email, &masked, "EMAIL") {
                result = result.replace(&email, &masked);
            }
        }
        result
    }

    fn redact_phones(
        &self,
        text: &str,
        config: &RedactionConfig,
        mappings: &mut MappingList,
    ) -> String {
        let Some(regex) = &self.phone_regex else {
            return text.to_string();
        };

        let matches: Vec<String> = regex.find_iter(text).map(|m| m.as_str().to_string()).collect();
        let mut result = text.to_string();
        for phone in matches {
            let masked = mask_phone(&phone, config.phone_mask_style, &config.phone_defined_text);
            if mappings.try_add(&phone, &masked, "PHONE") {
                result = result.replace(&phone, &masked);
            }
        }
        result
    }
}

impl Default for TextRedactor {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a replacement label (with its trailing ordinal) is in the
/// enabled-label list.
fn label_enabled(replacement: &str, labels: &[String]) -> bool {
    let base = replacement.trim_end_matches(|c: char| c.is_ascii_digit());
    labels.iter().any(|l| l == base)
}
