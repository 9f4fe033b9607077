//! Warden CLI binary.
//!
//! This binary provides operator access to Warden's security layer:
//! - Try inputs against the sanitizer
//! - Check addresses against the IP allow-list
//! - Show the effective configuration
//! - Inspect and verify the audit log

use clap::Parser;
use warden::{LogFormat, WardenConfig, init_tracing};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{
        Cli, Commands, check_ip_command, handle_audit_command, handle_config_command,
        sanitize_command,
    };

    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize tracing
    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_tracing(cli.verbose, format);

    let config = match &cli.config {
        Some(path) => WardenConfig::from_file(path)?,
        None => WardenConfig::load()?,
    };

    // Execute the requested command
    match cli.command {
        Commands::Sanitize {
            text,
            max_length,
            format,
        } => {
            sanitize_command(&config, &text, max_length, format)?;
        }

        Commands::CheckIp { address, allow } => {
            if !check_ip_command(&config, &address, allow)? {
                std::process::exit(1);
            }
        }

        Commands::Config(config_cmd) => {
            handle_config_command(&config, config_cmd)?;
        }

        Commands::Audit(audit_cmd) => {
            if !handle_audit_command(&config, audit_cmd).await? {
                std::process::exit(2);
            }
        }
    }

    Ok(())
}
