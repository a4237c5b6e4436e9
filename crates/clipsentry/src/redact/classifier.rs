//! Code/prose classification.
//!
//! The segmenter asks a [`ClassifierBackend`] whether a block of text is
//! source code. The shipped implementation weighs code indicators against
//! prose indicators; a trained model can be plugged in through the same
//! trait and is expected to swallow its own failures (a backend that cannot
//! decide should report low confidence, which routes the block through the
//! heuristic).

use regex::Regex;
use tracing::warn;

/// The classification verdict for one block of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Whether the block looks like source code.
    pub is_code: bool,
    /// Confidence in `[0.5, 1.0]`; below [`CONFIDENCE_OVERRIDE`] the caller
    /// falls back to the rule-based heuristic.
    pub confidence: f64,
}

/// Below this confidence the heuristic classifier overrides the primary
/// backend's verdict.
pub const CONFIDENCE_OVERRIDE: f64 = 0.7;

/// A synchronous code/prose classifier.
pub trait ClassifierBackend: Send + Sync {
    /// Classify `text` as code or prose with a confidence score.
    fn predict_with_confidence(&self, text: &str) -> Prediction;
}

/// Minimum weighted score for a block to count as code.
const CODE_THRESHOLD: f64 = 0.3;

/// Discount applied to the prose ratio before it is subtracted from the
/// code ratio. Prose indicators also fire on comments and string literals
/// inside genuine code, so they count at half strength.
const PROSE_WEIGHT: f64 = 0.5;

/// Regex sources that each vote for "this is code".
const CODE_INDICATOR_PATTERNS: &[&str] = &[
    // Definitions and declarations
    r"\b(def|function|class|interface|struct|enum)\s+\w+",
    r"\b(public|private|protected|static|final|abstract)\s+\w+",
    r"\b(int|float|double|char|bool|string|void|var|let|const)\s+\w+",
    // Control flow
    r"\b(if|else|elif|for|while|do|switch|case|try|catch|finally)\s*\(",
    r"\b(return|break|continue|throw|yield|await|async)\b",
    // Punctuation density
    r"[{}();]",
    r"[=+\-*/%<>!&|^~]",
    r"[\[\]]",
    // Comments
    r"(?m)//.*$",
    r"(?s)/\*.*?\*/",
    r"(?m)#.*$",
    // Imports
    r"\b(import|from|include|using|namespace|package)\s+",
    // String literals
    r#"["'`].*["'`]"#,
    // Numbers, assignments, calls
    r"\b\d+\.?\d*\b",
    r"\b[a-zA-Z_]\w*\s*[=\(]",
];

/// Regex sources that each vote for "this is prose".
const PROSE_INDICATOR_PATTERNS: &[&str] = &[
    // Articles, conjunctions, prepositions
    r"(?i)\b(the|a|an|and|or|but|of|in|on|at|to|from|with|for)\b",
    // Pronouns
    r"(?i)\b(you|he|she|it|we|they|me|him|her|us|them|my|your|our)\b",
    // Demonstratives and question words
    r"(?i)\b(this|that|these|those|there|here|what|which|who|when|where)\b",
    // Auxiliary verbs
    r"(?i)\b(is|are|was|were|be|been|have|has|had|will|would|should|could|can)\b",
    // Conversational verbs
    r"(?i)\b(call|write|see|note|meet|send|ask|tell|please)\b",
    // Capitalized words
    r"\b[A-Z][a-z]+\b",
    // Sentence-ending punctuation
    r"[.!?](\s|$)",
    // Comma in running text
    r",\s+[a-z]",
];

/// Rule-based classifier weighing code indicators against prose indicators.
#[derive(Debug)]
pub struct HeuristicClassifier {
    code_indicators: Vec<Regex>,
    prose_indicators: Vec<Regex>,
}

impl HeuristicClassifier {
    /// Compile both indicator tables.
    ///
    /// A pattern that fails to compile is dropped with a warning; the
    /// classifier still works with the remaining indicators.
    #[must_use]
    pub fn new() -> Self {
        Self {
            code_indicators: compile_indicators(CODE_INDICATOR_PATTERNS, "code"),
            prose_indicators: compile_indicators(PROSE_INDICATOR_PATTERNS, "prose"),
        }
    }

    /// The code ratio minus the discounted prose ratio.
    fn weighted_score(&self, text: &str) -> f64 {
        hit_ratio(&self.code_indicators, text) - PROSE_WEIGHT * hit_ratio(&self.prose_indicators, text)
    }

    /// Whether `text` crosses the code threshold.
    #[must_use]
    pub fn contains_code(&self, text: &str) -> bool {
        if self.code_indicators.is_empty() {
            return false;
        }
        self.weighted_score(text) >= CODE_THRESHOLD
    }
}

fn compile_indicators(sources: &[&str], table: &str) -> Vec<Regex> {
    sources
        .iter()
        .filter_map(|source| match Regex::new(source) {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!(pattern = source, table, error = %e, "indicator failed to compile");
                None
            }
        })
        .collect()
}

/// Fraction of indicators that fire in `text`.
fn hit_ratio(indicators: &[Regex], text: &str) -> f64 {
    if indicators.is_empty() {
        return 0.0;
    }
    let hits = indicators.iter().filter(|regex| regex.is_match(text)).count();
    #[allow(clippy::cast_precision_loss)]
    let ratio = hits as f64 / indicators.len() as f64;
    ratio
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierBackend for HeuristicClassifier {
    fn predict_with_confidence(&self, text: &str) -> Prediction {
        let score = self.weighted_score(text);
        let is_code = !self.code_indicators.is_empty() && score >= CODE_THRESHOLD;
        // Confidence grows with the distance from the threshold, normalized
        // into [0.5, 1.0].
        let confidence = (0.5 + (score - CODE_THRESHOLD).abs()).min(1.0);
        Prediction {
            is_code,
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_block_classified_as_code() {
        let classifier = HeuristicClassifier::new();
        let code = "def process(items):\n    total = items[0] + 1  # running total\n    return total";
        assert!(classifier.contains_code(code));

        let prediction = classifier.predict_with_confidence(code);
        assert!(prediction.is_code);
        assert!(prediction.confidence >= 0.5);
    }

    #[test]
    fn test_prose_classified_as_text() {
        let classifier = HeuristicClassifier::new();
        let prose = "The quarterly meeting has been moved to Thursday afternoon";
        assert!(!classifier.contains_code(prose));
        assert!(!classifier.predict_with_confidence(prose).is_code);
    }

    #[test]
    fn test_punctuated_prose_classified_as_text() {
        // Symbol-dense prose fires several code indicators; the prose
        // indicators have to outvote them.
        let classifier = HeuristicClassifier::new();
        let prose = "Contact (urgent!) = john.doe@example.com, call 42 'now' #asap";
        assert!(!classifier.contains_code(prose));
        assert!(!classifier.predict_with_confidence(prose).is_code);
    }

    #[test]
    fn test_confidence_bounds() {
        let classifier = HeuristicClassifier::new();
        for text in ["", "plain words only here", "fn main() { let x = 1; }"] {
            let p = classifier.predict_with_confidence(text);
            assert!(p.confidence >= 0.5 && p.confidence <= 1.0, "text: {text:?}");
        }
    }

    #[test]
    fn test_all_indicators_compile() {
        let classifier = HeuristicClassifier::new();
        assert_eq!(classifier.code_indicators.len(), CODE_INDICATOR_PATTERNS.len());
        assert_eq!(classifier.prose_indicators.len(), PROSE_INDICATOR_PATTERNS.len());
    }

    #[test]
    fn test_empty_text_is_not_code() {
        let classifier = HeuristicClassifier::new();
        assert!(!classifier.contains_code(""));
    }
}
