//! Sanitizer, IP gate and configuration command handlers.

use super::commands::{ConfigCommands, OutputFormat};
use std::collections::BTreeSet;
use warden::{
    IpGate, IpWhitelistConfig, JsonError, Sanitizer, SanitizerConfig, WardenConfig, WardenError,
    WardenResult,
};

/// Sanitize `text` and print the result and findings.
pub fn sanitize_command(
    config: &WardenConfig,
    text: &str,
    max_length: Option<usize>,
    format: OutputFormat,
) -> WardenResult<()> {
    let sanitizer_config = match max_length {
        Some(max_length) => SanitizerConfig::default().with_max_length(max_length),
        None => config.sanitizer().clone(),
    };
    let result = Sanitizer::new(&sanitizer_config).sanitize(text);

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result)
                .map_err(|e| WardenError::from(JsonError::new(e.to_string())))?;
            println!("{}", json);
        }
        OutputFormat::Human => {
            println!("{}", result.text());
            println!("{:-<80}", "");
            if result.findings().is_empty() {
                println!("No findings");
            }
            for finding in result.findings() {
                println!("{:<18} {}", finding.kind(), finding.excerpt());
            }
            println!(
                "Verdict: {}",
                if result.is_rejected() {
                    "REJECTED"
                } else {
                    "ACCEPTED"
                }
            );
        }
    }

    Ok(())
}

/// Check `address` and report whether it passes.
///
/// Returns whether the address was allowed.
pub fn check_ip_command(
    config: &WardenConfig,
    address: &str,
    allow: Vec<String>,
) -> WardenResult<bool> {
    let whitelist = if allow.is_empty() {
        config.ip_whitelist().clone()
    } else {
        IpWhitelistConfig::default()
            .with_enabled(true)
            .with_allowed_ips(allow.into_iter().collect::<BTreeSet<_>>())
    };

    let gate = IpGate::from_config(&whitelist)
        .map_err(|e| WardenError::from(warden::ConfigError::new(e.kind().to_string())))?;

    match gate.check(address) {
        Ok(()) => {
            println!("{}: allowed", address);
            Ok(true)
        }
        Err(e) => {
            println!("{}: rejected ({})", address, e.kind());
            Ok(false)
        }
    }
}

/// Handle configuration commands.
pub fn handle_config_command(config: &WardenConfig, cmd: ConfigCommands) -> WardenResult<()> {
    match cmd {
        ConfigCommands::Show => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}
