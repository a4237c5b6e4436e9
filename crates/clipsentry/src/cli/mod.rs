//! Command-line interface for clipsentry.
//!
//! This module provides the CLI structure and command handlers for the
//! `clipsentry` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, HistoryCommand, MonitorCommand, RedactCommand, TrustCommand};

/// clipsentry - Arbitrate what other applications see on your clipboard
///
/// A background service that watches the clipboard, produces a redacted
/// variant of every copied item, and decides per foreground application
/// whether it gets the original or the redacted content.
#[derive(Debug, Parser)]
#[command(name = "clipsentry")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the clipboard monitor in the foreground
    Monitor(MonitorCommand),

    /// Redact a piece of text once and print the result
    Redact(RedactCommand),

    /// Inspect or clear clipboard history
    #[command(subcommand)]
    History(HistoryCommand),

    /// Manage trusted applications
    #[command(subcommand)]
    Trust(TrustCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "clipsentry");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_levels() {
        let parse = |args: &[&str]| Cli::try_parse_from(args).unwrap();

        assert_eq!(
            parse(&["clipsentry", "monitor"]).verbosity(),
            crate::logging::Verbosity::Normal
        );
        assert_eq!(
            parse(&["clipsentry", "-v", "monitor"]).verbosity(),
            crate::logging::Verbosity::Verbose
        );
        assert_eq!(
            parse(&["clipsentry", "-vv", "monitor"]).verbosity(),
            crate::logging::Verbosity::Trace
        );
        assert_eq!(
            parse(&["clipsentry", "-q", "monitor"]).verbosity(),
            crate::logging::Verbosity::Quiet
        );
    }

    #[test]
    fn test_parse_monitor() {
        let cli = Cli::try_parse_from(["clipsentry", "monitor"]).unwrap();
        assert!(matches!(cli.command, Command::Monitor(_)));
    }

    #[test]
    fn test_parse_redact_with_text() {
        let cli = Cli::try_parse_from(["clipsentry", "redact", "some text", "--json"]).unwrap();
        match cli.command {
            Command::Redact(cmd) => {
                assert_eq!(cmd.text.as_deref(), Some("some text"));
                assert!(cmd.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_history_show() {
        let cli = Cli::try_parse_from(["clipsentry", "history", "show", "--limit", "5"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::History(HistoryCommand::Show { limit: 5, .. })
        ));
    }

    #[test]
    fn test_parse_trust_add() {
        let cli = Cli::try_parse_from(["clipsentry", "trust", "add", "Notepad"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Trust(TrustCommand::Add { .. })
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let cli =
            Cli::try_parse_from(["clipsentry", "-c", "/custom/config.toml", "monitor"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }
}
