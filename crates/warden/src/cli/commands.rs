//! CLI command definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Warden - security and audit layer for admin-only AI chat
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(about = "Security and audit layer for admin-only AI chat", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Read configuration from this file instead of the layered defaults
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run text through the input sanitizer
    Sanitize {
        /// Text to sanitize
        text: String,

        /// Override sanitizer.max_length
        #[arg(long)]
        max_length: Option<usize>,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Check an address against the IP allow-list
    CheckIp {
        /// Address to check
        address: String,

        /// Allow-list entry (repeatable); replaces the configured list and enables the gate
        #[arg(long = "allow")]
        allow: Vec<String>,
    },

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Audit log commands
    #[command(subcommand)]
    Audit(AuditCommands),
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
}

/// Audit log subcommands
#[derive(Subcommand, Debug)]
pub enum AuditCommands {
    /// List records for a principal, newest first
    List {
        /// Principal ID
        principal: String,

        /// Audit log file (defaults to audit.log_path)
        #[arg(long)]
        log: Option<PathBuf>,

        /// Maximum number of records to display
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// List FAILURE and ERROR records for a principal, newest first
    Failures {
        /// Principal ID
        principal: String,

        /// Audit log file (defaults to audit.log_path)
        #[arg(long)]
        log: Option<PathBuf>,

        /// Maximum number of records to display
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Verify the hash chain of an audit log
    Verify {
        /// Audit log file (defaults to audit.log_path)
        #[arg(long)]
        log: Option<PathBuf>,
    },
}

/// Output format options
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormat {
    /// Human-readable format
    Human,
    /// JSON format
    Json,
}
