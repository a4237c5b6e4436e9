//! The clipboard monitor loop.
//!
//! One background task polls the clipboard and foreground window at a fixed
//! cadence and arbitrates, per tick, which variant of the clipboard content
//! the foreground application gets to see. The monitor is the sole writer of
//! the shared [`ClipboardState`](crate::state::ClipboardState); everything
//! it needs from the outside world comes in through the [`ClipboardIo`] and
//! [`ActiveWindowInfo`] traits so the whole loop can be driven by fakes in
//! tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::SharedConfig;
use crate::error::{Error, Result};
use crate::redact::{masked_token_ratio, unmask, RedactionPipeline};
use crate::snapshot::ClipboardSnapshot;
use crate::state::{ExposedVariant, SharedState};
use crate::storage::{HistoryEntry, Storage};
use crate::trust::TrustEvaluator;

/// Fraction of the previous pass's masked tokens that must reappear in newly
/// copied text before it is treated as a re-copy of masked content.
pub const UNMASK_RATIO: f64 = 0.7;

/// How long `stop` waits for an in-flight tick to finish.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Clipboard access as the monitor sees it.
pub trait ClipboardIo: Send + Sync {
    /// Read the current clipboard text. An empty clipboard reads as an
    /// empty string.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform clipboard is unavailable this tick.
    fn read(&self) -> Result<String>;

    /// Replace the clipboard text.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform clipboard is unavailable this tick.
    fn write(&self, text: &str) -> Result<()>;
}

/// Best-effort foreground window queries.
///
/// Implementations return sentinel values instead of failing: `"unknown"`
/// for the process name and an empty string for the title.
pub trait ActiveWindowInfo: Send + Sync {
    /// Name of the process owning the foreground window.
    fn active_process_name(&self) -> String;

    /// Title of the foreground window.
    fn active_window_title(&self) -> String;
}

/// The background clipboard monitor.
pub struct ClipboardMonitor {
    clipboard: Arc<dyn ClipboardIo>,
    window: Arc<dyn ActiveWindowInfo>,
    pipeline: RedactionPipeline,
    config: SharedConfig,
    state: SharedState,
    storage: Option<Storage>,
}

impl std::fmt::Debug for ClipboardMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipboardMonitor")
            .field("storage", &self.storage.is_some())
            .finish_non_exhaustive()
    }
}

impl ClipboardMonitor {
    /// Build a monitor over the given clipboard and window sources.
    #[must_use]
    pub fn new(
        clipboard: Arc<dyn ClipboardIo>,
        window: Arc<dyn ActiveWindowInfo>,
        config: SharedConfig,
        state: SharedState,
    ) -> Self {
        Self {
            clipboard,
            window,
            pipeline: RedactionPipeline::new(),
            config,
            state,
            storage: None,
        }
    }

    /// Attach history persistence.
    #[must_use]
    pub fn with_storage(mut self, storage: Storage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Use a custom redaction pipeline (external classifier or NER backend).
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: RedactionPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Run one poll iteration.
    ///
    /// Any failure inside a tick is logged and absorbed; the next tick
    /// starts from a clean slate.
    pub fn tick(&self) {
        let config = self.config.snapshot();

        let text = match self.clipboard.read() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "clipboard read failed, retrying next tick");
                return;
            }
        };
        let observation = ClipboardSnapshot::new(
            text,
            self.window.active_process_name(),
            self.window.active_window_title(),
        );
        if observation.is_empty() {
            return;
        }

        let previous = self.state.snapshot();
        if observation.raw_text == previous.last_observed_text {
            self.handle_unchanged(
                &config,
                &previous,
                &observation.source_process,
                &observation.window_title,
            );
        } else {
            self.handle_changed(
                &config,
                &previous,
                observation.raw_text,
                &observation.source_process,
            );
        }
    }

    /// New clipboard content: unmask a re-copy if needed, run the pipeline,
    /// persist, and leave the original on the clipboard.
    fn handle_changed(
        &self,
        config: &crate::config::Config,
        previous: &crate::state::StateSnapshot,
        text: String,
        process: &str,
    ) {
        let mut original = text.clone();

        // A copy made from already-redacted content is recognized by its
        // placeholder density and reversed before anything else.
        if !config.monitor.unmask_manual
            && !previous.current_mappings.is_empty()
            && masked_token_ratio(&previous.current_mappings, &original) >= UNMASK_RATIO
        {
            debug!("new clipboard text looks like a re-copy of masked content, unmasking");
            original = unmask(&original, &previous.last_original_text, &previous.current_mappings);
        }

        if config.monitor.disable_masking {
            self.persist(HistoryEntry::new(
                original.clone(),
                original.clone(),
                process.to_string(),
                Vec::new(),
            ));
            self.commit_changed(original.clone(), original, process, Vec::new(), &text);
            return;
        }

        let outcome = self.pipeline.redact(&original, &config.redaction);
        debug!(
            mappings = outcome.mappings.len(),
            guard_tripped = outcome.guard_tripped,
            "processed new clipboard item"
        );

        self.persist(HistoryEntry::new(
            original.clone(),
            outcome.redacted.clone(),
            process.to_string(),
            outcome.mappings.clone(),
        ));
        self.commit_changed(original, outcome.redacted, process, outcome.mappings, &text);
    }

    /// Write the post-pipeline state and restore the original text to the
    /// clipboard when unmasking rewrote it.
    fn commit_changed(
        &self,
        original: String,
        redacted: String,
        process: &str,
        mappings: Vec<crate::redact::RedactionMapping>,
        as_read: &str,
    ) {
        if original != as_read {
            if let Err(e) = self.clipboard.write(&original) {
                warn!(error = %e, "failed to restore unmasked text to clipboard");
            }
        }

        self.state.update(|state| {
            state.last_observed_text = original.clone();
            state.last_original_text = original;
            state.last_redacted_text = redacted;
            state.last_source_process = process.to_string();
            state.current_mappings = mappings;
            state.exposed_variant = ExposedVariant::Original;
        });
    }

    /// Unchanged clipboard content: decide which variant the foreground
    /// application should see and swap only when it differs.
    fn handle_unchanged(
        &self,
        config: &crate::config::Config,
        previous: &crate::state::StateSnapshot,
        process: &str,
        title: &str,
    ) {
        if config.monitor.disable_masking {
            return;
        }

        let desired = if process == previous.last_source_process {
            ExposedVariant::Original
        } else if TrustEvaluator::new(config.trust.apps.clone()).is_trusted(title) {
            ExposedVariant::Original
        } else {
            ExposedVariant::Redacted
        };

        if desired == previous.exposed_variant {
            return;
        }

        let payload = match desired {
            ExposedVariant::Original => previous.last_original_text.clone(),
            ExposedVariant::Redacted => previous.last_redacted_text.clone(),
        };

        if payload != previous.last_observed_text {
            if let Err(e) = self.clipboard.write(&payload) {
                warn!(error = %e, "clipboard write failed, keeping previous variant");
                return;
            }
        }

        debug!(?desired, %process, "swapped exposed clipboard variant");
        self.state.update(|state| {
            state.exposed_variant = desired;
            state.last_observed_text = payload;
        });
    }

    /// Record a history entry, absorbing storage failures.
    fn persist(&self, entry: HistoryEntry) {
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.add_entry(&entry) {
                error!(error = %e, "failed to persist history entry");
            }
        }
    }

    /// Spawn the poll loop onto the tokio runtime.
    #[must_use]
    pub fn spawn(self) -> MonitorHandle {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&stop_signal);

        let task = tokio::spawn(async move {
            info!("clipboard monitor started");
            while !stop.load(Ordering::SeqCst) {
                let interval = self.config.snapshot().poll_interval();
                self.tick();
                tokio::time::sleep(interval).await;
            }
            info!("clipboard monitor stopped");
        });

        MonitorHandle { stop_signal, task }
    }
}

/// Handle over a running monitor task.
#[derive(Debug)]
pub struct MonitorHandle {
    stop_signal: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Signal the loop to stop without waiting for it.
    pub fn request_stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Whether the loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the monitor and wait for the in-flight tick to finish.
    ///
    /// # Errors
    ///
    /// Returns a timeout error if the task does not exit within the bounded
    /// wait.
    pub async fn stop(self) -> Result<()> {
        self.stop_signal.store(true, Ordering::SeqCst);
        match tokio::time::timeout(STOP_TIMEOUT, self.task).await {
            Ok(_) => Ok(()),
            Err(_) => Err(Error::Timeout {
                operation: "monitor shutdown".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::config::{Config, TrustedApp};

    /// In-memory clipboard recording every write.
    #[derive(Default)]
    struct FakeClipboard {
        content: Mutex<String>,
        writes: Mutex<Vec<String>>,
    }

    impl FakeClipboard {
        fn set(&self, text: &str) {
            *self.content.lock().unwrap() = text.to_string();
        }

        fn get(&self) -> String {
            self.content.lock().unwrap().clone()
        }

        fn write_count(&self) -> usize {
            self.writes.lock().unwrap().len()
        }
    }

    impl ClipboardIo for FakeClipboard {
        fn read(&self) -> Result<String> {
            Ok(self.get())
        }

        fn write(&self, text: &str) -> Result<()> {
            *self.content.lock().unwrap() = text.to_string();
            self.writes.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    /// Foreground window controlled by the test.
    #[derive(Default)]
    struct FakeWindow {
        process: Mutex<String>,
        title: Mutex<String>,
    }

    impl FakeWindow {
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

    struct Rig {
        clipboard: Arc<FakeClipboard>,
        window: Arc<FakeWindow>,
        monitor: ClipboardMonitor,
        state: SharedState,
        config: SharedConfig,
    }

    fn rig(config: Config) -> Rig {
        let clipboard = Arc::new(FakeClipboard::default());
        let window = Arc::new(FakeWindow::default());
        let state = SharedState::new();
        let shared_config = SharedConfig::new(config);
        let monitor = ClipboardMonitor::new(
            Arc::clone(&clipboard) as Arc<dyn ClipboardIo>,
            Arc::clone(&window) as Arc<dyn ActiveWindowInfo>,
            shared_config.clone(),
            state.clone(),
        );
        Rig {
            clipboard,
            window,
            monitor,
            state,
            config: shared_config,
        }
    }

    fn config_with_trusted(name: &str) -> Config {
        let mut config = Config::default();
        config.trust.apps.push(TrustedApp::new(name));
        config
    }

    #[test]
    fn test_changed_tick_records_and_keeps_original() {
        let r = rig(Config::default());
        r.window.focus("editor", "notes - Editor");
        r.clipboard.set("write to alice@example.com please");

        r.monitor.tick();

        let snapshot = r.state.snapshot();
        assert_eq!(snapshot.last_original_text, "write to alice@example.com please");
        assert!(snapshot.last_redacted_text.contains("al***@example.com"));
        assert_eq!(snapshot.last_source_process, "editor");
        assert_eq!(snapshot.exposed_variant, ExposedVariant::Original);
        // The clipboard still holds the original after a copy.
        assert_eq!(r.clipboard.get(), "write to alice@example.com please");
        assert_eq!(r.clipboard.write_count(), 0);
    }

    #[test]
    fn test_untrusted_foreground_sees_redacted() {
        let r = rig(Config::default());
        r.window.focus("editor", "notes - Editor");
        r.clipboard.set("write to alice@example.com please");
        r.monitor.tick();

        // Focus moves to an unregistered app; the redacted variant goes up.
        r.window.focus("badapp", "scratch - BadApp");
        r.monitor.tick();

        let snapshot = r.state.snapshot();
        assert_eq!(snapshot.exposed_variant, ExposedVariant::Redacted);
        assert!(r.clipboard.get().contains("al***@example.com"));
    }

    #[test]
    fn test_source_process_sees_original_again() {
        let r = rig(Config::default());
        r.window.focus("editor", "notes - Editor");
        r.clipboard.set("write to alice@example.com please");
        r.monitor.tick();

        r.window.focus("badapp", "scratch - BadApp");
        r.monitor.tick();
        assert_eq!(r.state.snapshot().exposed_variant, ExposedVariant::Redacted);

        // Back in the app that made the copy: original is restored.
        r.window.focus("editor", "notes - Editor");
        r.monitor.tick();
        assert_eq!(r.state.snapshot().exposed_variant, ExposedVariant::Original);
        assert_eq!(r.clipboard.get(), "write to alice@example.com please");
    }

    #[test]
    fn test_trusted_app_sees_original() {
        let r = rig(config_with_trusted("GoodApp"));
        r.window.focus("editor", "notes - Editor");
        r.clipboard.set("write to alice@example.com please");
        r.monitor.tick();

        r.window.focus("goodapp", "scratch - GoodApp");
        r.monitor.tick();
        assert_eq!(r.state.snapshot().exposed_variant, ExposedVariant::Original);
        assert_eq!(r.clipboard.get(), "write to alice@example.com please");
    }

    #[test]
    fn test_variant_swap_is_idempotent() {
        let r = rig(Config::default());
        r.window.focus("editor", "notes - Editor");
        r.clipboard.set("write to alice@example.com please");
        r.monitor.tick();

        r.window.focus("badapp", "scratch - BadApp");
        r.monitor.tick();
        let writes_after_swap = r.clipboard.write_count();

        // Same foreground app on the next ticks: no further writes.
        r.monitor.tick();
        r.monitor.tick();
        assert_eq!(r.clipboard.write_count(), writes_after_swap);
    }

    #[test]
    fn test_trust_change_applies_next_tick() {
        let r = rig(Config::default());
        r.window.focus("editor", "notes - Editor");
        r.clipboard.set("write to alice@example.com please");
        r.monitor.tick();

        r.window.focus("viewer", "doc - Viewer");
        r.monitor.tick();
        assert_eq!(r.state.snapshot().exposed_variant, ExposedVariant::Redacted);

        // Registering the app takes effect on the very next tick.
        r.config
            .update(|c| c.trust.apps.push(TrustedApp::new("Viewer")));
        r.monitor.tick();
        assert_eq!(r.state.snapshot().exposed_variant, ExposedVariant::Original);
    }

    #[test]
    fn test_recopy_of_masked_text_is_unmasked() {
        let r = rig(Config::default());
        r.window.focus("editor", "notes - Editor");
        r.clipboard.set("write to alice@example.com please");
        r.monitor.tick();

        let redacted = r.state.snapshot().last_redacted_text;
        assert_ne!(redacted, "write to alice@example.com please");

        // The user copies the masked text from an untrusted viewer.
        r.clipboard.set(&redacted);
        r.window.focus("viewer", "doc - Viewer");
        r.monitor.tick();

        let snapshot = r.state.snapshot();
        assert_eq!(snapshot.last_original_text, "write to alice@example.com please");
        // The clipboard was rewritten with the reconstructed original.
        assert_eq!(r.clipboard.get(), "write to alice@example.com please");
    }

    #[test]
    fn test_disable_masking_records_without_redaction() {
        let mut config = Config::default();
        config.monitor.disable_masking = true;
        let r = rig(config);
        r.window.focus("editor", "notes - Editor");
        r.clipboard.set("write to alice@example.com please");
        r.monitor.tick();

        let snapshot = r.state.snapshot();
        assert_eq!(snapshot.last_redacted_text, "write to alice@example.com please");
        assert!(snapshot.current_mappings.is_empty());

        // Unchanged branch is a no-op while masking is disabled.
        r.window.focus("badapp", "scratch - BadApp");
        r.monitor.tick();
        assert_eq!(r.state.snapshot().exposed_variant, ExposedVariant::Original);
        assert_eq!(r.clipboard.write_count(), 0);
    }

    #[test]
    fn test_empty_clipboard_is_skipped() {
        let r = rig(Config::default());
        r.window.focus("editor", "notes - Editor");
        r.clipboard.set("");
        r.monitor.tick();
        assert!(r.state.snapshot().last_original_text.is_empty());
    }

    #[tokio::test]
    async fn test_spawn_and_stop() {
        let mut config = Config::default();
        config.monitor.poll_interval_ms = 10;
        let r = rig(config);
        r.clipboard.set("plain text content");
        r.window.focus("editor", "notes - Editor");

        let handle = r.monitor.spawn();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        handle.stop().await.expect("monitor failed to stop");
        assert_eq!(r.state.snapshot().last_original_text, "plain text content");
    }
}
