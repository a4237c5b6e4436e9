//! End-to-end tests driving the redaction pipeline, trust evaluation, and the
//! monitor state machine through the public API.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use clipsentry::config::{CustomPattern, RedactionConfig, TrustedApp};
use clipsentry::monitor::{ActiveWindowInfo, ClipboardIo, ClipboardMonitor};
use clipsentry::redact::{unmask, NerBackend, RedactionPipeline};
use clipsentry::state::{ExposedVariant, SharedState};
use clipsentry::{Config, SharedConfig, TrustEvaluator};

fn default_redaction() -> RedactionConfig {
    RedactionConfig::default()
}

#[test]
fn email_in_prose_is_partially_masked() {
    let pipeline = RedactionPipeline::new();
    let outcome = pipeline.redact("Contact me at john.doe@example.com", &default_redaction());

    assert_eq!(outcome.redacted, "Contact me at jo******@example.com");
    assert_eq!(outcome.mappings.len(), 1);
    assert_eq!(outcome.mappings[0].original, "john.doe@example.com");
    assert_eq!(outcome.mappings[0].category, "EMAIL");
    assert!(!outcome.guard_tripped);
}

#[test]
fn trusted_app_matches_window_title_with_extension() {
    let evaluator = TrustEvaluator::new(vec![TrustedApp::new("Visual Studio Code")]);
    assert!(evaluator.is_trusted("My Project - Visual Studio Code.exe"));
}

#[test]
fn empty_window_title_is_fail_open() {
    let evaluator = TrustEvaluator::new(vec![TrustedApp::new("SomeApp")]);
    assert!(evaluator.is_trusted(""));
}

#[test]
fn custom_pattern_replaces_capitals_block() {
    let mut cfg = default_redaction();
    cfg.min_len_custom_regex = 0;
    cfg.custom_patterns = vec![CustomPattern {
        pattern: "^[A-Z]+$".to_string(),
        replacement: "CAPITAL".to_string(),
        enabled: true,
    }];

    let pipeline = RedactionPipeline::new();
    let outcome = pipeline.redact("HELLO", &cfg);

    assert_eq!(outcome.redacted, "CAPITAL0 ");
    assert_eq!(outcome.mappings.len(), 1);
    assert_eq!(outcome.mappings[0].original, "HELLO");
    assert_eq!(outcome.mappings[0].masked, "CAPITAL0 ");
}

#[test]
fn partial_email_round_trips_through_unmask() {
    let input = "Please reach me at sarah.connor@skynet.net for details";
    let pipeline = RedactionPipeline::new();
    let outcome = pipeline.redact(input, &default_redaction());
    assert_ne!(outcome.redacted, input);

    let restored = unmask(&outcome.redacted, input, &outcome.mappings);
    assert_eq!(restored, input);
}

#[test]
fn length_guard_returns_original_when_output_collapses() {
    let mut cfg = default_redaction();
    cfg.min_len_custom_regex = 0;
    cfg.custom_patterns = vec![CustomPattern {
        pattern: "(?s)^.+$".to_string(),
        replacement: String::new(),
        enabled: true,
    }];

    let input = "an ordinary sentence that should survive a broken pattern";
    let pipeline = RedactionPipeline::new();
    let outcome = pipeline.redact(input, &cfg);

    assert!(outcome.guard_tripped);
    assert_eq!(outcome.redacted, input);
    assert!(outcome.mappings.is_empty());
}

#[test]
fn placeholders_are_never_re_masked() {
    let snippet = "def update_totals(amounts):\n    total = 0\n    first = amounts[0]\n    total = first + 1\n    # accumulate\n    return total";
    let pipeline = RedactionPipeline::new();
    let cfg = default_redaction();

    let first_pass = pipeline.redact(snippet, &cfg);
    assert!(first_pass.redacted.contains("METHOD_NAME_1_1"));

    let second_pass = pipeline.redact(&first_pass.redacted, &cfg);
    assert_eq!(second_pass.redacted, first_pass.redacted);
    for mapping in &second_pass.mappings {
        assert!(
            !mapping.original.contains("METHOD_NAME")
                && !mapping.original.contains("PARAMETER_NAME"),
            "placeholder was re-masked: {mapping:?}"
        );
    }
}

#[test]
fn trust_decision_reflects_config_changes_immediately() {
    let mut config = Config::default();
    config.trust.apps = vec![TrustedApp::new("Notepad")];
    let shared = SharedConfig::new(config);

    let before = TrustEvaluator::new(shared.snapshot().trust.apps);
    assert!(before.is_trusted("Draft - Notepad"));

    shared.update(|cfg| cfg.trust.apps[0].enabled = false);

    let after = TrustEvaluator::new(shared.snapshot().trust.apps);
    assert!(!after.is_trusted("Draft - Notepad"));
}

struct ScriptedNer;

impl NerBackend for ScriptedNer {
    fn analyze_entities(&self, text: &str) -> BTreeMap<String, String> {
        let mut entities = BTreeMap::new();
        if text.contains("Alice Winters") {
            entities.insert("Alice Winters".to_string(), "PERSON1".to_string());
        }
        entities
    }
}

#[test]
fn ner_labels_survive_a_second_pass_unchanged() {
    let pipeline = RedactionPipeline::new().with_ner(Box::new(ScriptedNer));
    let cfg = default_redaction();

    let first_pass = pipeline.redact("Alice Winters joined the meeting today", &cfg);
    assert!(first_pass.redacted.contains("PERSON1"));

    let second_pass = pipeline.redact(&first_pass.redacted, &cfg);
    assert!(second_pass
        .mappings
        .iter()
        .all(|m| !m.original.starts_with("PERSON")));
}

struct FakeClipboard {
    content: Mutex<String>,
}

impl FakeClipboard {
    fn new(initial: &str) -> Self {
        Self {
            content: Mutex::new(initial.to_string()),
        }
    }

    fn current(&self) -> String {
        self.content.lock().unwrap().clone()
    }
}

impl ClipboardIo for FakeClipboard {
    fn read(&self) -> clipsentry::Result<String> {
        Ok(self.content.lock().unwrap().clone())
    }

    fn write(&self, text: &str) -> clipsentry::Result<()> {
        *self.content.lock().unwrap() = text.to_string();
        Ok(())
    }
}

struct FakeWindow {
    process: Mutex<String>,
    title: Mutex<String>,
}

impl FakeWindow {
    fn new(process: &str, title: &str) -> Self {
        Self {
            process: Mutex::new(process.to_string()),
            title: Mutex::new(title.to_string()),
        }
    }

    fn focus(&self, process: &str, title: &str) {
        *self.process.lock().unwrap() = process.to_string();
        *self.title.lock().unwrap() = title.to_string();
    }
}

impl ActiveWindowInfo for FakeWindow {
    fn active_process_name(&self) -> String {
        self.process.lock().unwrap().clone()
    }

    fn active_window_title(&self) -> String {
        self.title.lock().unwrap().clone()
    }
}

#[test]
fn source_process_always_sees_the_original() {
    let original = "Contact me at john.doe@example.com";
    let clipboard = Arc::new(FakeClipboard::new(original));
    let window = Arc::new(FakeWindow::new("editor", "Draft - editor"));
    let state = SharedState::new();
    let monitor = ClipboardMonitor::new(
        clipboard.clone(),
        window.clone(),
        SharedConfig::new(Config::default()),
        state.clone(),
    );

    // Copy happens in "editor", which is not on the trusted list.
    monitor.tick();
    let snapshot = state.snapshot();
    assert_eq!(snapshot.exposed_variant, ExposedVariant::Original);
    assert_eq!(clipboard.current(), original);

    // Still focused on the copying process: the original stays exposed.
    monitor.tick();
    assert_eq!(state.snapshot().exposed_variant, ExposedVariant::Original);
    assert_eq!(clipboard.current(), original);

    // An untrusted foreign process gets the redacted variant.
    window.focus("mailer", "Inbox - mailer");
    monitor.tick();
    let snapshot = state.snapshot();
    assert_eq!(snapshot.exposed_variant, ExposedVariant::Redacted);
    assert_eq!(clipboard.current(), "Contact me at jo******@example.com");

    // Returning to the copying process restores the original.
    window.focus("editor", "Draft - editor");
    monitor.tick();
    assert_eq!(state.snapshot().exposed_variant, ExposedVariant::Original);
    assert_eq!(clipboard.current(), original);
}
