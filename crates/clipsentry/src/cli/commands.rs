//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Monitor command arguments.
#[derive(Debug, Args)]
pub struct MonitorCommand {
    /// Run without recording clipboard history
    #[arg(long)]
    pub no_history: bool,
}

/// Redact command arguments.
#[derive(Debug, Args)]
pub struct RedactCommand {
    /// Text to redact (reads stdin when omitted)
    pub text: Option<String>,

    /// Output the result and mappings as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// History commands.
#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// Show recent history entries
    Show {
        /// Maximum number of entries
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Delete the entire history
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show storage statistics
    Stats {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Trusted-application commands.
#[derive(Debug, Subcommand)]
pub enum TrustCommand {
    /// List registered applications
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Register an application as trusted
    Add {
        /// Program name to trust
        name: String,
    },

    /// Remove (soft-delete) a registered application
    Remove {
        /// Program name to remove
        name: String,
    },

    /// Evaluate trust for a window title
    Check {
        /// The window title to evaluate
        title: String,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_command_debug() {
        let cmd = MonitorCommand { no_history: true };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("no_history"));
    }

    #[test]
    fn test_redact_command_debug() {
        let cmd = RedactCommand {
            text: Some("sample".to_string()),
            json: false,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("sample"));
    }

    #[test]
    fn test_history_command_debug() {
        let cmd = HistoryCommand::Show {
            limit: 20,
            json: false,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }

    #[test]
    fn test_trust_command_debug() {
        let cmd = TrustCommand::Add {
            name: "Notepad".to_string(),
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Notepad"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
