//! Code identifier redaction.
//!
//! Code segments carry project-internal vocabulary: method names, parameter
//! names, type annotations. This module sniffs the likely language of a
//! segment, runs the language's ordered extraction rules, and replaces each
//! extracted identifier with a positional placeholder (`METHOD_NAME_1_2` is
//! the second match of the first method-name rule). Reserved words of the
//! language are never replaced.

use std::collections::HashMap;

use regex::Regex;
use tracing::{trace, warn};

use super::mapping::MappingList;
use crate::config::CodeTarget;

/// Languages the redactor has extraction rules for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// Python. Also the fallback when nothing else matches.
    Python,
    /// JavaScript.
    JavaScript,
    /// Java.
    Java,
    /// C and C++.
    Cpp,
    /// C#.
    CSharp,
    /// Go.
    Go,
    /// Ruby.
    Ruby,
    /// TypeScript.
    TypeScript,
}

impl Language {
    /// All known languages, in detection order.
    pub const ALL: [Language; 8] = [
        Language::Python,
        Language::JavaScript,
        Language::Java,
        Language::Cpp,
        Language::CSharp,
        Language::Go,
        Language::Ruby,
        Language::TypeScript,
    ];

    /// Lowercase tag for logging.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::CSharp => "csharp",
            Self::Go => "go",
            Self::Ruby => "ruby",
            Self::TypeScript => "typescript",
        }
    }

    /// Keyword pattern whose presence suggests this language.
    fn detection_pattern(self) -> &'static str {
        match self {
            Self::Python => r"\bdef\s+\w+\s*\(|import\s+\w+|from\s+\w+",
            Self::JavaScript => r"\bfunction\s+\w+\s*\(|const\s+\w+|let\s+\w+",
            Self::Java => r"\bpublic\s+class|\bprivate\s+\w+|\bprotected\s+\w+",
            Self::Cpp => r"#include\s*<|std::|namespace\s+\w+",
            Self::CSharp => r"\bnamespace\s+\w+|\bpublic\s+class|\busing\s+System",
            Self::Go => r"\bfunc\s+\w+\s*\(|package\s+\w+",
            Self::Ruby => r"\bdef\s+\w+\s*\(|class\s+\w+|module\s+\w+",
            Self::TypeScript => r"\binterface\s+\w+|\btype\s+\w+|\bimport\s+\w+",
        }
    }

    /// Reserved words never used as replacement targets. Only languages
    /// with curated lists filter; the rest pass everything through.
    fn reserved_words(self) -> &'static [&'static str] {
        match self {
            Self::Python => &[
                "def", "class", "import", "from", "if", "else", "elif", "for", "while", "try",
                "except", "with", "as", "return", "pass", "break", "continue", "raise", "yield",
                "lambda", "and", "or", "not", "in", "is",
            ],
            Self::JavaScript => &[
                "function", "var", "let", "const", "if", "else", "for", "while", "try", "catch",
                "class", "import", "export", "return", "break", "continue", "throw", "yield",
                "async", "await", "new", "delete", "typeof", "instanceof",
            ],
            Self::Java => &[
                "public", "private", "protected", "static", "final", "abstract", "class",
                "interface", "enum", "extends", "implements", "return", "break", "continue",
                "throw", "try", "catch", "finally", "if", "else", "for", "while", "switch", "case",
            ],
            Self::Cpp => &[
                "int", "float", "double", "char", "bool", "string", "void", "class", "struct",
                "namespace", "using", "return", "break", "continue", "throw", "try", "catch",
                "if", "else", "for", "while", "switch", "case",
            ],
            _ => &[],
        }
    }

    fn is_reserved(self, word: &str) -> bool {
        let lower = word.to_lowercase();
        self.reserved_words().iter().any(|w| *w == lower)
    }
}

/// Ordered extraction-rule sources for one language and target.
fn rule_sources(language: Language, target: CodeTarget) -> &'static [&'static str] {
    use CodeTarget::{MethodNames, ParameterNames, ParameterTypes, ReturnTypes};
    use Language::{Cpp, CSharp, Go, Java, JavaScript, Python, Ruby, TypeScript};

    match (language, target) {
        (Python, MethodNames) => &[r"\bdef\s+(\w+)\s*\(", r"\bclass\s+(\w+)"],
        (Python, ParameterNames) => &[
            r"\bdef\s+\w+\s*\(([^)]*)\)",
            r"\bclass\s+\w+\s*\(([^)]*)\)",
        ],
        (Python, ParameterTypes) => &[r":\s*(\w+)\s*[=)]", r"->\s*(\w+)"],
        (Python, ReturnTypes) => &[r"->\s*(\w+)"],

        (JavaScript, MethodNames) => &[
            r"\bfunction\s+(\w+)\s*\(",
            r"\b(\w+)\s*\([^)]*\)\s*\{",
            r"\b(\w+)\s*:\s*function\s*\(",
        ],
        (JavaScript, ParameterNames) => &[
            r"\bfunction\s+\w+\s*\(([^)]*)\)",
            r"\b(\w+)\s*\(([^)]*)\)\s*\{",
        ],
        (JavaScript, ParameterTypes | ReturnTypes) => &[r":\s*(\w+)\s*[=)]"],

        (Java, MethodNames) => &[
            r"\b(public|private|protected|static|final|abstract)?\s*\w+\s+(\w+)\s*\(",
            r"\bclass\s+(\w+)",
        ],
        (Java, ParameterNames) => &[r"\b\w+\s+\w+\s*\(([^)]*)\)"],
        (Java, ParameterTypes) => {
            &[r"\b(int|float|double|char|boolean|String|void|long|short|byte|List|Map|Set)\b"]
        }
        (Java, ReturnTypes) => {
            &[r"\b(public|private|protected|static|final|abstract)?\s*(\w+)\s+\w+\s*\("]
        }

        (Cpp, MethodNames) => &[r"\b\w+\s+(\w+)\s*\(", r"\bclass\s+(\w+)"],
        (Cpp, ParameterNames) => &[r"\b\w+\s+\w+\s*\(([^)]*)\)"],
        (Cpp, ParameterTypes) => {
            &[r"\b(int|float|double|char|bool|string|void|long|short|unsigned)\b"]
        }
        (Cpp, ReturnTypes) => &[r"\b(\w+)\s+\w+\s*\("],

        (CSharp, MethodNames) => &[
            r"\b(public|private|protected|internal)?\s*\w+\s+(\w+)\s*\(",
            r"\bclass\s+(\w+)",
        ],
        (CSharp, ParameterNames) => &[r"\b\w+\s+\w+\s*\(([^)]*)\)"],
        (CSharp, ParameterTypes) => {
            &[r"\b(int|float|double|char|bool|string|void|long|short|byte|List|Dictionary|HashSet)\b"]
        }
        (CSharp, ReturnTypes) => {
            &[r"\b(public|private|protected|internal)?\s*(\w+)\s+\w+\s*\("]
        }

        (Go, MethodNames) => &[r"\bfunc\s+(\w+)\s*\(", r"\bfunc\s*\([^)]*\)\s*(\w+)\s*\("],
        (Go, ParameterNames) => &[r"\bfunc\s+\w+\s*\(([^)]*)\)"],
        (Go, ParameterTypes) => &[r"\b(int|float64|float32|string|bool|byte|rune)\b"],
        (Go, ReturnTypes) => &[r"\bfunc\s+\w+\s*\([^)]*\)\s*(\w+)"],

        (Ruby, MethodNames) => &[r"\bdef\s+(\w+)", r"\bclass\s+(\w+)"],
        (Ruby, ParameterNames) => &[r"\bdef\s+\w+\s*\(([^)]*)\)"],
        // Ruby has no type annotations to extract
        (Ruby, ParameterTypes | ReturnTypes) => &[],

        (TypeScript, MethodNames) => &[
            r"\bfunction\s+(\w+)\s*\(",
            r"\b(\w+)\s*\([^)]*\)\s*:\s*\w+",
        ],
        (TypeScript, ParameterNames) => &[r"\bfunction\s+\w+\s*\(([^)]*)\)"],
        (TypeScript, ParameterTypes | ReturnTypes) => &[r":\s*(\w+)\s*[=)]"],
    }
}

/// Placeholder prefix for a target.
fn placeholder_prefix(target: CodeTarget) -> &'static str {
    match target {
        CodeTarget::MethodNames => "METHOD_NAME",
        CodeTarget::ParameterNames => "PARAMETER_NAME",
        CodeTarget::ParameterTypes => "PARAMETER_TYPE",
        CodeTarget::ReturnTypes => "RETURN_TYPE",
    }
}

const ALL_TARGETS: [CodeTarget; 4] = [
    CodeTarget::MethodNames,
    CodeTarget::ParameterNames,
    CodeTarget::ParameterTypes,
    CodeTarget::ReturnTypes,
];

/// Compiled rule table for one language.
#[derive(Debug, Default)]
struct LanguageRules {
    by_target: HashMap<CodeTarget, Vec<Regex>>,
}

/// Redacts identifiers out of code segments.
#[derive(Debug)]
pub struct CodeRedactor {
    detectors: Vec<(Language, Regex)>,
    registries: HashMap<Language, LanguageRules>,
}

impl CodeRedactor {
    /// Compile the detection and extraction tables.
    ///
    /// Individual patterns that fail to compile are dropped with a warning.
    #[must_use]
    pub fn new() -> Self {
        let mut detectors = Vec::new();
        for language in Language::ALL {
            match Regex::new(language.detection_pattern()) {
                Ok(regex) => detectors.push((language, regex)),
                Err(e) => warn!(
                    language = language.as_str(),
                    error = %e,
                    "language detection pattern failed to compile"
                ),
            }
        }

        let mut registries = HashMap::new();
        for language in Language::ALL {
            let mut rules = LanguageRules::default();
            for target in ALL_TARGETS {
                // Parameter-name rules capture raw lists; matching is
                // case-sensitive there and case-insensitive elsewhere.
                let flags = if target == CodeTarget::ParameterNames {
                    ""
                } else {
                    "(?i)"
                };
                let compiled = rule_sources(language, target)
                    .iter()
                    .filter_map(|source| match Regex::new(&format!("{flags}{source}")) {
                        Ok(regex) => Some(regex),
                        Err(e) => {
                            warn!(
                                language = language.as_str(),
                                pattern = source,
                                error = %e,
                                "extraction rule failed to compile"
                            );
                            None
                        }
                    })
                    .collect();
                rules.by_target.insert(target, compiled);
            }
            registries.insert(language, rules);
        }

        Self {
            detectors,
            registries,
        }
    }

    /// Guess the language of a code segment. Python is the fallback.
    #[must_use]
    pub fn detect_language(&self, text: &str) -> Language {
        for (language, regex) in &self.detectors {
            if regex.is_match(text) {
                return *language;
            }
        }
        Language::Python
    }

    /// Redact the enabled targets out of `text`, recording mappings.
    ///
    /// Replacements refused by the mapping list (duplicates, denylisted
    /// originals) are not applied to the text either.
    #[must_use]
    pub fn redact(&self, text: &str, targets: &[CodeTarget], mappings: &mut MappingList) -> String {
        let language = self.detect_language(text);
        trace!(language = language.as_str(), "redacting code segment");

        let mut replacements: Vec<(String, String)> = Vec::new();
        for target in targets {
            self.extract(text, language, *target, &mut replacements);
        }

        let mut result = text.to_string();
        for (original, replacement) in replacements {
            if mappings.try_add(&original, &replacement, "Code") {
                result = result.replace(&original, &replacement);
            }
        }
        result
    }

    fn rules(&self, language: Language, target: CodeTarget) -> &[Regex] {
        self.registries
            .get(&language)
            .and_then(|r| r.by_target.get(&target))
            .map_or(&[], Vec::as_slice)
    }

    fn extract(
        &self,
        text: &str,
        language: Language,
        target: CodeTarget,
        replacements: &mut Vec<(String, String)>,
    ) {
        let prefix = placeholder_prefix(target);
        for (i, regex) in self.rules(language, target).iter().enumerate() {
            for (j, captures) in regex.captures_iter(text).enumerate() {
                match target {
                    CodeTarget::MethodNames => {
                        // Rules with an optional leading modifier group put
                        // the name in the second group.
                        let name = captures
                            .get(1)
                            .filter(|m| !m.as_str().is_empty())
                            .or_else(|| captures.get(2))
                            .map(|m| m.as_str());
                        if let Some(name) = name {
                            if !name.is_empty() && !language.is_reserved(name) {
                                push_unique(
                                    replacements,
                                    name,
                                    format!("{prefix}_{}_{}", i + 1, j + 1),
                                );
                            }
                        }
                    }
                    CodeTarget::ParameterNames => {
                        let Some(params) = captures.get(1).map(|m| m.as_str()) else {
                            continue;
                        };
                        for (k, param) in params
                            .split(',')
                            .map(str::trim)
                            .filter(|p| !p.is_empty())
                            .enumerate()
                        {
                            // The name is the last word of the declaration
                            // ("int count" or a bare "count").
                            if let Some(name) = param.split_whitespace().last() {
                                if !language.is_reserved(name) {
                                    push_unique(
                                        replacements,
                                        name,
                                        format!("{prefix}_{}_{}_{}", i + 1, j + 1, k + 1),
                                    );
                                }
                            }
                        }
                    }
                    CodeTarget::ParameterTypes => {
                        if let Some(name) = captures.get(1).map(|m| m.as_str()) {
                            if !name.is_empty() {
                                push_unique(
                                    replacements,
                                    name,
                                    format!("{prefix}_{}_{}", i + 1, j + 1),
                                );
                            }
                        }
                    }
                    CodeTarget::ReturnTypes => {
                        if let Some(name) = captures.get(1).map(|m| m.as_str()) {
                            if !name.is_empty() && !language.is_reserved(name) {
                                push_unique(
                                    replacements,
                                    name,
                                    format!("{prefix}_{}_{}", i + 1, j + 1),
                                );
                            }
                        }
                    }
                }
            }
        }
    }
}

impl Default for CodeRedactor {
    fn default() -> Self {
        Self::new()
    }
}

/// First extraction of an identifier wins.
fn push_unique(replacements: &mut Vec<(String, String)>, original: &str, replacement: String) {
    if !replacements.iter().any(|(o, _)| o == original) {
        replacements.push((original.to_string(), replacement));
    }
}
