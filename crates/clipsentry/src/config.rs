//! Configuration management for clipsentry.
//!
//! Configuration loading and validation uses figment, layering TOML config
//! files and environment variables over defaults. A [`SharedConfig`] handle
//! hands out owned snapshots so the settings surface can be edited while the
//! monitor is running: the pipeline takes a fresh snapshot per invocation and
//! never caches one across ticks.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "clipsentry";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "history.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `CLIPSENTRY_`, section and field
///    separated by a double underscore, e.g. `CLIPSENTRY_MONITOR__POLL_INTERVAL_MS`)
/// 2. TOML config file at `~/.config/clipsentry/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Monitor loop configuration.
    pub monitor: MonitorConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Redaction pipeline configuration.
    pub redaction: RedactionConfig,
    /// Trusted-application configuration.
    pub trust: TrustConfig,
}

/// Monitor-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Interval between clipboard polls in milliseconds.
    pub poll_interval_ms: u64,
    /// Disable all masking: history is still recorded but the clipboard is
    /// never rewritten.
    pub disable_masking: bool,
    /// Disable the automatic un-redaction of re-copied masked values.
    pub unmask_manual: bool,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the history database file.
    /// Defaults to `~/.local/share/clipsentry/history.db`
    pub database_path: Option<PathBuf>,
    /// Maximum number of history entries to retain. 0 for unlimited.
    pub max_entries: usize,
    /// Maximum age of history entries to retain in days. 0 for unlimited.
    pub max_age_days: u32,
}

/// How a matched email or phone number is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskStyle {
    /// Leave the match untouched.
    None,
    /// Replace every character with an asterisk.
    Asterisk,
    /// Replace the whole match with a configured fixed string.
    DefinedText,
    /// Keep a recognizable fragment: first two characters of an email local
    /// part plus the full domain, or the trailing four digits of a phone.
    #[default]
    Partial,
}

/// Which code constructs the code redactor extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeTarget {
    /// Method and function names.
    MethodNames,
    /// Parameter names in signatures.
    ParameterNames,
    /// Parameter type annotations.
    ParameterTypes,
    /// Return type annotations.
    ReturnTypes,
}

/// A user-supplied redaction pattern applied globally after reassembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomPattern {
    /// The regex to match.
    pub pattern: String,
    /// Replacement base; matches become `{replacement}{counter} `.
    pub replacement: String,
    /// Whether this pattern participates in the pass.
    pub enabled: bool,
}

impl Default for CustomPattern {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            replacement: String::new(),
            enabled: true,
        }
    }
}

/// Redaction pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionConfig {
    /// Enable email masking.
    pub email_enabled: bool,
    /// How emails are masked.
    pub email_mask_style: MaskStyle,
    /// Fixed replacement for `MaskStyle::DefinedText` emails.
    pub email_defined_text: String,
    /// Enable phone-number masking.
    pub phone_enabled: bool,
    /// How phone numbers are masked.
    pub phone_mask_style: MaskStyle,
    /// Fixed replacement for `MaskStyle::DefinedText` phones.
    pub phone_defined_text: String,
    /// Enable code-identifier redaction.
    pub code_enabled: bool,
    /// Which code constructs are redacted.
    pub code_targets: Vec<CodeTarget>,
    /// Enable NER-backed entity redaction.
    pub ner_enabled: bool,
    /// Entity labels the NER stage may emit; these also feed the
    /// should-erase denylist so already-masked labels are never re-masked.
    pub ner_labels: Vec<String>,
    /// Enable the global custom-regex pass.
    pub custom_regex_enabled: bool,
    /// User-supplied patterns for the global pass.
    pub custom_patterns: Vec<CustomPattern>,
    /// Minimum segment length before code redaction applies.
    pub min_len_code: usize,
    /// Minimum segment length before NER redaction applies.
    pub min_len_ner: usize,
    /// Minimum text length before the custom-regex pass applies.
    pub min_len_custom_regex: usize,
}

/// A configured trusted application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustedApp {
    /// Program name matched against derived window-title names.
    pub name: String,
    /// Whether trust is currently granted.
    pub enabled: bool,
    /// Soft-delete flag; a deleted entry is untrusted regardless of
    /// `enabled`.
    pub deleted: bool,
}

impl Default for TrustedApp {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            deleted: false,
        }
    }
}

impl TrustedApp {
    /// Create an enabled, non-deleted entry.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Trusted-application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// The registered applications.
    pub apps: Vec<TrustedApp>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            disable_masking: false,
            unmask_manual: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Resolved to the default at runtime
            max_entries: 10_000,
            max_age_days: 30,
        }
    }
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            email_enabled: true,
            email_mask_style: MaskStyle::Partial,
            email_defined_text: String::new(),
            phone_enabled: true,
            phone_mask_style: MaskStyle::Partial,
            phone_defined_text: String::new(),
            code_enabled: true,
            code_targets: vec![
                CodeTarget::MethodNames,
                CodeTarget::ParameterNames,
                CodeTarget::ParameterTypes,
                CodeTarget::ReturnTypes,
            ],
            ner_enabled: true,
            ner_labels: default_ner_labels(),
            custom_regex_enabled: true,
            custom_patterns: Vec::new(),
            min_len_code: 20,
            min_len_ner: 15,
            min_len_custom_regex: 20,
        }
    }
}

/// Default entity labels recognized by the NER stage.
fn default_ner_labels() -> Vec<String> {
    [
        "PERSON", "ORG", "GPE", "DATE", "LOC", "PRODUCT", "EVENT", "MONEY", "TIME", "CARDINAL",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            // Double underscore separates sections from field names, so
            // snake_case fields stay addressable: CLIPSENTRY_MONITOR__POLL_INTERVAL_MS.
            .merge(Env::prefixed("CLIPSENTRY_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// A malformed custom regex is deliberately not a validation failure:
    /// the pipeline skips only the offending pattern at apply time, so a bad
    /// pattern edited into the settings never blocks startup.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.monitor.poll_interval_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "poll_interval_ms must be greater than 0".to_string(),
            });
        }

        for app in &self.trust.apps {
            if app.name.trim().is_empty() {
                return Err(Error::ConfigValidation {
                    message: "trusted app entries must have a non-empty name".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the poll interval as a Duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.monitor.poll_interval_ms)
    }

    /// Get the max history age as a Duration.
    #[must_use]
    pub fn max_age(&self) -> Option<Duration> {
        if self.storage.max_age_days == 0 {
            None
        } else {
            Some(Duration::from_secs(
                u64::from(self.storage.max_age_days) * 24 * 60 * 60,
            ))
        }
    }
}

/// Shared configuration handle.
///
/// The settings surface may edit the configuration while the monitor runs.
/// Writers replace or mutate under the lock; the pipeline calls
/// [`SharedConfig::snapshot`] once per invocation and works on the owned
/// copy, so a concurrent edit is picked up on the very next call.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<Config>>,
}

impl SharedConfig {
    /// Wrap a configuration in a shared handle.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Take an owned snapshot of the current configuration.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned, which only happens after a panic in a
    /// writer closure.
    #[must_use]
    pub fn snapshot(&self) -> Config {
        self.inner.read().expect("config lock poisoned").clone()
    }

    /// Replace the configuration wholesale.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn replace(&self, config: Config) {
        *self.inner.write().expect("config lock poisoned") = config;
    }

    /// Mutate the configuration in place.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn update<F: FnOnce(&mut Config)>(&self, f: F) {
        f(&mut self.inner.write().expect("config lock poisoned"));
    }
}
