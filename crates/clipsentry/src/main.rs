//! `clipsentry` - CLI and daemon entry point.
//!
//! This binary runs the clipboard monitor and provides commands for one-shot
//! redaction, history inspection, trusted-application management, and
//! configuration.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::Read as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use clipsentry::cli::{Cli, Command, ConfigCommand, HistoryCommand, TrustCommand};
use clipsentry::config::TrustedApp;
use clipsentry::monitor::{ActiveWindowInfo, ClipboardIo, ClipboardMonitor};
use clipsentry::redact::RedactionPipeline;
use clipsentry::state::SharedState;
use clipsentry::storage::Storage;
use clipsentry::trust::TrustEvaluator;
use clipsentry::{init_logging, Config, SharedConfig};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    // Execute the command
    match cli.command {
        Command::Monitor(monitor_cmd) => handle_monitor(config, monitor_cmd.no_history),
        Command::Redact(redact_cmd) => handle_redact(&config, redact_cmd.text, redact_cmd.json),
        Command::History(history_cmd) => handle_history(&config, history_cmd),
        Command::Trust(trust_cmd) => handle_trust(cli.config, config, trust_cmd),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

/// Clipboard adapter over the platform crate.
#[derive(Debug)]
struct SystemClipboardIo {
    inner: clipsentry_platform::SystemClipboard,
}

impl ClipboardIo for SystemClipboardIo {
    fn read(&self) -> clipsentry::Result<String> {
        Ok(self.inner.read_text()?)
    }

    fn write(&self, text: &str) -> clipsentry::Result<()> {
        Ok(self.inner.write_text(text)?)
    }
}

/// Active-window adapter over the platform crate.
#[derive(Debug)]
struct SystemWindowInfo;

impl ActiveWindowInfo for SystemWindowInfo {
    fn active_process_name(&self) -> String {
        clipsentry_platform::active_process_name()
    }

    fn active_window_title(&self) -> String {
        clipsentry_platform::active_window_title()
    }
}

fn handle_monitor(config: Config, no_history: bool) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        println!("clipsentry monitor starting");
        println!("Poll interval: {:?}", config.poll_interval());

        let storage = if no_history {
            None
        } else {
            let storage = Storage::open(config.database_path())
                .context("failed to open history database")?;
            if let Some(max_age) = config.max_age() {
                let pruned = storage.prune_older_than(max_age)?;
                if pruned > 0 {
                    println!("Pruned {pruned} expired history entries");
                }
            }
            if config.storage.max_entries > 0 {
                storage.prune_keep_recent(config.storage.max_entries)?;
            }
            println!("History database: {}", storage.path().display());
            Some(storage)
        };

        let clipboard = Arc::new(SystemClipboardIo {
            inner: clipsentry_platform::SystemClipboard::new(),
        });
        let window = Arc::new(SystemWindowInfo);

        let shared_config = SharedConfig::new(config);
        let state = SharedState::new();

        let mut monitor =
            ClipboardMonitor::new(clipboard, window, shared_config, state);
        if let Some(storage) = storage {
            monitor = monitor.with_storage(storage);
        }

        let handle = monitor.spawn();
        println!("Monitoring clipboard. Press Ctrl-C to stop.");

        tokio::signal::ctrl_c().await?;
        println!("Stopping...");
        handle.stop().await?;
        println!("Stopped.");
        Ok(())
    })
}

fn handle_redact(config: &Config, text: Option<String>, json: bool) -> Result<()> {
    let input = match text {
        Some(text) => text,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let pipeline = RedactionPipeline::new();
    let outcome = pipeline.redact(&input, &config.redaction);

    if json {
        let output = serde_json::json!({
            "redacted": outcome.redacted,
            "mappings": outcome.mappings,
            "guard_tripped": outcome.guard_tripped,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", outcome.redacted);
        if !outcome.redacted.ends_with('\n') {
            println!();
        }
        if !outcome.mappings.is_empty() {
            eprintln!("({} substitutions)", outcome.mappings.len());
        }
    }
    Ok(())
}

fn handle_history(config: &Config, cmd: HistoryCommand) -> Result<()> {
    let storage = Storage::open(config.database_path())
        .context("failed to open history database")?;
    match cmd {
        HistoryCommand::Show { limit, json } => {
            let entries = storage.get_history(limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No history entries.");
            } else {
                for entry in &entries {
                    let id = entry.id.unwrap_or(0);
                    println!(
                        "[{id}] {} from {}",
                        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        entry.source_process
                    );
                    println!("  original: {}", preview(&entry.original_text));
                    println!("  redacted: {}", preview(&entry.redacted_text));
                    if !entry.mappings.is_empty() {
                        println!("  mappings: {}", entry.mappings.len());
                    }
                }
            }
        }
        HistoryCommand::Clear { yes } => {
            if yes {
                let removed = storage.clear_history()?;
                println!("Removed {removed} history entries.");
            } else {
                println!("This will delete all clipboard history.");
                println!("Use --yes to confirm.");
            }
        }
        HistoryCommand::Stats { json } => {
            let stats = storage.stats()?;
            if json {
                let output = serde_json::json!({
                    "total_entries": stats.total_entries,
                    "oldest_entry": stats.oldest_entry,
                    "newest_entry": stats.newest_entry,
                    "db_size_bytes": stats.db_size_bytes,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("History statistics");
                println!("------------------");
                println!("Entries:  {}", stats.total_entries);
                if let Some(oldest) = stats.oldest_entry {
                    println!("Oldest:   {}", oldest.format("%Y-%m-%d %H:%M:%S"));
                }
                if let Some(newest) = stats.newest_entry {
                    println!("Newest:   {}", newest.format("%Y-%m-%d %H:%M:%S"));
                }
                println!("Size:     {} bytes", stats.db_size_bytes);
            }
        }
    }
    Ok(())
}

fn handle_trust(config_path: Option<PathBuf>, mut config: Config, cmd: TrustCommand) -> Result<()> {
    match cmd {
        TrustCommand::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&config.trust.apps)?);
            } else if config.trust.apps.is_empty() {
                println!("No trusted applications registered.");
            } else {
                for app in &config.trust.apps {
                    let status = if app.deleted {
                        "removed"
                    } else if app.enabled {
                        "trusted"
                    } else {
                        "disabled"
                    };
                    println!("{:<30} {status}", app.name);
                }
            }
        }
        TrustCommand::Add { name } => {
            let existing = config
                .trust
                .apps
                .iter_mut()
                .find(|app| app.name.eq_ignore_ascii_case(&name));
            match existing {
                Some(app) => {
                    app.enabled = true;
                    app.deleted = false;
                }
                None => config.trust.apps.push(TrustedApp::new(name.clone())),
            }
            save_config(&config, config_path)?;
            println!("Registered \"{name}\" as trusted.");
        }
        TrustCommand::Remove { name } => {
            let existing = config
                .trust
                .apps
                .iter_mut()
                .find(|app| app.name.eq_ignore_ascii_case(&name));
            match existing {
                Some(app) => {
                    app.deleted = true;
                    save_config(&config, config_path)?;
                    println!("Removed \"{name}\" from trusted applications.");
                }
                None => println!("No trusted application named \"{name}\"."),
            }
        }
        TrustCommand::Check { title } => {
            let evaluator = TrustEvaluator::new(config.trust.apps.clone());
            if evaluator.is_trusted(&title) {
                println!("trusted");
            } else {
                println!("untrusted");
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Monitor]");
                println!("  Poll interval (ms): {}", config.monitor.poll_interval_ms);
                println!("  Masking disabled:   {}", config.monitor.disable_masking);
                println!("  Manual unmask only: {}", config.monitor.unmask_manual);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Max entries:        {}", config.storage.max_entries);
                println!("  Max age (days):     {}", config.storage.max_age_days);
                println!();
                println!("[Redaction]");
                println!("  Email masking:      {}", config.redaction.email_enabled);
                println!("  Phone masking:      {}", config.redaction.phone_enabled);
                println!("  Code masking:       {}", config.redaction.code_enabled);
                println!("  Entity masking:     {}", config.redaction.ner_enabled);
                println!(
                    "  Custom patterns:    {}",
                    config.redaction.custom_patterns.len()
                );
                println!();
                println!("[Trust]");
                println!("  Applications:       {}", config.trust.apps.len());
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

/// Write the configuration back to its TOML file.
fn save_config(config: &Config, config_path: Option<PathBuf>) -> Result<()> {
    let path = config_path.unwrap_or_else(Config::default_config_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, toml::to_string_pretty(config)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// First line of the text, truncated for display.
fn preview(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or("");
    let mut out: String = first_line.chars().take(60).collect();
    if out.len() < first_line.len() || text.lines().count() > 1 {
        out.push_str("...");
    }
    out
}
