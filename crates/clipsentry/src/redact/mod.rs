//! The redaction pipeline.
//!
//! Turning clipboard text into its redacted variant goes through six stages:
//! segmentation, code-identifier redaction for code segments, prose
//! redaction (entities, emails, phones) for text segments with the email
//! and phone passes also applied to code segments, offset-based
//! reconstruction, a global custom-regex pass, and a length guard that
//! discards a pass which destroyed too much of the input. Each stage is
//! gated by configuration; the pipeline takes the configuration as an
//! argument so callers can hand it a fresh snapshot per invocation.

pub mod classifier;
pub mod code;
pub mod mapping;
pub mod segment;
pub mod text;

use regex::Regex;
use tracing::{debug, warn};

pub use classifier::{ClassifierBackend, HeuristicClassifier, Prediction};
pub use code::{CodeRedactor, Language};
pub use mapping::{masked_token_ratio, unmask, MappingList, RedactionMapping};
pub use segment::{Segment, SegmentKind, Segmenter};
pub use text::{mask_email, mask_phone, NerBackend, TextRedactor};

use crate::config::RedactionConfig;

/// Placeholder prefixes that mark text as already-masked code output.
const CODE_PLACEHOLDER_PREFIXES: [&str; 4] = [
    "METHOD_NAME_",
    "PARAMETER_NAME_",
    "PARAMETER_TYPE_",
    "RETURN_TYPE_",
];

/// Output of one pipeline pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RedactionOutcome {
    /// The redacted text. Equal to the input when nothing matched or the
    /// length guard tripped.
    pub redacted: String,
    /// Substitutions performed, in insertion order. Empty when the guard
    /// tripped.
    pub mappings: Vec<RedactionMapping>,
    /// Whether the length guard discarded the pass.
    pub guard_tripped: bool,
}

/// The multi-stage redaction pipeline.
pub struct RedactionPipeline {
    segmenter: Segmenter,
    code: CodeRedactor,
    text: TextRedactor,
}

impl std::fmt::Debug for RedactionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedactionPipeline").finish_non_exhaustive()
    }
}

impl Default for RedactionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl RedactionPipeline {
    /// Build a pipeline with the heuristic classifier and no NER backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            segmenter: Segmenter::heuristic_only(),
            code: CodeRedactor::new(),
            text: TextRedactor::new(),
        }
    }

    /// Use a custom primary classifier instead of the heuristic.
    #[must_use]
    pub fn with_classifier(mut self, backend: Box<dyn ClassifierBackend>) -> Self {
        self.segmenter = Segmenter::new(backend);
        self
    }

    /// Attach a NER backend for the entity pass.
    #[must_use]
    pub fn with_ner(mut self, ner: Box<dyn NerBackend>) -> Self {
        self.text = self.text.with_ner(ner);
        self
    }

    /// Run a full pass over `input`.
    #[must_use]
    pub fn redact(&self, input: &str, config: &RedactionConfig) -> RedactionOutcome {
        let mut mappings = MappingList::new(deny_patterns(config));

        let segments = self.segmenter.segment(input);
        let mut result = String::with_capacity(input.len());
        let mut cursor = 0;
        for segment in &segments {
            result.push_str(&input[cursor..segment.start_offset]);
            result.push_str(&self.redact_segment(segment, config, &mut mappings));
            cursor = segment.end_offset;
        }
        result.push_str(&input[cursor..]);

        if config.custom_regex_enabled && input.len() >= config.min_len_custom_regex {
            result = apply_custom_patterns(&result, config, &mut mappings);
        }

        // A pass that destroyed more than half the input is assumed broken
        // and discarded wholesale.
        if result.len() * 2 < input.len() {
            warn!(
                input_len = input.len(),
                output_len = result.len(),
                "redaction shrank text below half its length, returning original"
            );
            return RedactionOutcome {
                redacted: input.to_string(),
                mappings: Vec::new(),
                guard_tripped: true,
            };
        }

        debug!(
            segments = segments.len(),
            mappings = mappings.len(),
            "redaction pass complete"
        );
        RedactionOutcome {
            redacted: result,
            mappings: mappings.into_mappings(),
            guard_tripped: false,
        }
    }

    fn redact_segment(
        &self,
        segment: &Segment,
        config: &RedactionConfig,
        mappings: &mut MappingList,
    ) -> String {
        match segment.kind {
            SegmentKind::Code => {
                let redacted =
                    if config.code_enabled && segment.content.trim().len() >= config.min_len_code {
                        self.code
                            .redact(&segment.content, &config.code_targets, mappings)
                    } else {
                        segment.content.clone()
                    };
                // Emails and phones are masked on both sides of the
                // classifier; a misclassified block must not leak them.
                self.text.redact_contacts(&redacted, config, mappings)
            }
            SegmentKind::Text => self.text.redact(&segment.content, config, mappings),
        }
    }
}

/// Build the should-erase denylist for one pass: enabled NER labels plus
/// the code placeholder prefixes.
fn deny_patterns(config: &RedactionConfig) -> Vec<String> {
    let mut patterns: Vec<String> = config.ner_labels.clone();
    patterns.extend(CODE_PLACEHOLDER_PREFIXES.iter().map(ToString::to_string));
    patterns
}

/// The global custom-regex pass over the reassembled text.
///
/// Matches are spliced in reverse position order so earlier spans stay
/// valid; the per-pattern counter only advances on admitted mappings. A
/// malformed pattern is skipped on its own, the rest still run.
fn apply_custom_patterns(
    input: &str,
    config: &RedactionConfig,
    mappings: &mut MappingList,
) -> String {
    let mut result = input.to_string();
    for pattern_config in &config.custom_patterns {
        if !pattern_config.enabled {
            continue;
        }
        let regex = match Regex::new(&pattern_config.pattern) {
            Ok(regex) => regex,
            Err(e) => {
                warn!(pattern = %pattern_config.pattern, error = %e, "skipping malformed custom pattern");
                continue;
            }
        };

        let matches: Vec<(usize, usize, String)> = regex
            .find_iter(&result)
            .map(|m| (m.start(), m.end(), m.as_str().to_string()))
            .collect();

        let mut count = 0usize;
        for (start, end, original) in matches.into_iter().rev() {
            let replacement = format!("{}{count} ", pattern_config.replacement);
            let category = format!("CUSTOM_REGEX ({})", pattern_config.pattern);
            if mappings.try_add(&original, &replacement, &category) {
                result.replace_range(start..end, &replacement);
                count += 1;
            }
        }
    }
    result
}
