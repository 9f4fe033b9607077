//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the warden binary.

mod audit;
mod commands;
mod inspect;

pub use audit::handle_audit_command;
pub use commands::{Cli, Commands};
pub use inspect::{check_ip_command, handle_config_command, sanitize_command};
