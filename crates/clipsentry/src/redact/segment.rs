//! Text segmentation for the redaction pipeline.
//!
//! Clipboard payloads routinely mix prose and pasted code, and the two need
//! different redactors. The segmenter splits text on blank lines, breaks up
//! oversized blocks line by line, and classifies each piece as code or
//! prose. Segments carry byte offsets into the original text so the
//! pipeline can splice redacted content back without disturbing the
//! separators between segments.

use regex::Regex;
use tracing::warn;

use super::classifier::{ClassifierBackend, HeuristicClassifier, CONFIDENCE_OVERRIDE};

/// Blocks longer than this are split line by line before classification.
pub const MAX_BLOCK_LEN: usize = 500;

/// What kind of content a segment holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Source code; routed to the code redactor.
    Code,
    /// Prose; routed to NER/email/phone redactors.
    Text,
}

/// One classified piece of the input text.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// The classification verdict.
    pub kind: SegmentKind,
    /// The segment's content, exactly as sliced from the input.
    pub content: String,
    /// Byte offset of the segment start in the input.
    pub start_offset: usize,
    /// Byte offset one past the segment end in the input.
    pub end_offset: usize,
    /// Confidence of the verdict, after any heuristic override.
    pub confidence: f64,
}

/// Splits and classifies clipboard text.
pub struct Segmenter {
    primary: Box<dyn ClassifierBackend>,
    heuristic: HeuristicClassifier,
    block_splitter: Option<Regex>,
}

impl std::fmt::Debug for Segmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segmenter").finish_non_exhaustive()
    }
}

impl Segmenter {
    /// Build a segmenter around the given primary classifier.
    #[must_use]
    pub fn new(primary: Box<dyn ClassifierBackend>) -> Self {
        let block_splitter = match Regex::new(r"\n\s*\n") {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!(error = %e, "block splitter failed to compile, treating input as one block");
                None
            }
        };
        Self {
            primary,
            heuristic: HeuristicClassifier::new(),
            block_splitter,
        }
    }

    /// Build a segmenter that classifies purely heuristically.
    #[must_use]
    pub fn heuristic_only() -> Self {
        Self::new(Box::new(HeuristicClassifier::new()))
    }

    /// Split `text` into classified segments.
    ///
    /// Whitespace-only blocks produce no segment; they are preserved by the
    /// offset-based reconstruction in the pipeline.
    #[must_use]
    pub fn segment(&self, text: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        for (start, block) in self.split_blocks(text) {
            if block.len() > MAX_BLOCK_LEN {
                let mut line_start = start;
                for line in block.split('\n') {
                    self.push_segment(&mut segments, line_start, line);
                    line_start += line.len() + 1;
                }
            } else {
                self.push_segment(&mut segments, start, block);
            }
        }
        segments
    }

    /// Split on blank lines, yielding `(byte offset, block)` pairs.
    fn split_blocks<'t>(&self, text: &'t str) -> Vec<(usize, &'t str)> {
        let Some(splitter) = &self.block_splitter else {
            return vec![(0, text)];
        };
        let mut blocks = Vec::new();
        let mut prev = 0;
        for separator in splitter.find_iter(text) {
            blocks.push((prev, &text[prev..separator.start()]));
            prev = separator.end();
        }
        blocks.push((prev, &text[prev..]));
        blocks
    }

    fn push_segment(&self, segments: &mut Vec<Segment>, start: usize, content: &str) {
        if content.trim().is_empty() {
            return;
        }

        let prediction = self.primary.predict_with_confidence(content.trim());
        let (is_code, confidence) = if prediction.confidence < CONFIDENCE_OVERRIDE {
            // Low-confidence verdicts are overridden by the rule-based count.
            let fallback = self.heuristic.predict_with_confidence(content.trim());
            (fallback.is_code, fallback.confidence)
        } else {
            (prediction.is_code, prediction.confidence)
        };

        segments.push(Segment {
            kind: if is_code {
                SegmentKind::Code
            } else {
                SegmentKind::Text
            },
            content: content.to_string(),
            start_offset: start,
            end_offset: start + content.len(),
            confidence,
        });
    }
}
