//! Audit log command handlers.

use super::commands::{AuditCommands, OutputFormat};
use std::path::PathBuf;
use warden::{
    AuditRecord, AuditSink, ConfigError, JsonError, JsonlAuditSink, WardenConfig, WardenError,
    WardenResult,
};

/// Handle audit log commands.
///
/// Returns whether the command found the log in a healthy state; only
/// `verify` can report otherwise.
pub async fn handle_audit_command(config: &WardenConfig, cmd: AuditCommands) -> WardenResult<bool> {
    match cmd {
        AuditCommands::List {
            principal,
            log,
            limit,
            format,
        } => {
            let sink = open_log(config, log)?;
            let records = sink.list_by_principal(&principal).await?;
            print_records(&principal, records, limit, format)?;
            Ok(true)
        }

        AuditCommands::Failures {
            principal,
            log,
            limit,
            format,
        } => {
            let sink = open_log(config, log)?;
            let records = sink.list_failures(&principal).await?;
            print_records(&principal, records, limit, format)?;
            Ok(true)
        }

        AuditCommands::Verify { log } => {
            let sink = open_log(config, log)?;
            let verification = sink.verify().await?;
            println!("Log: {}", sink.path().display());
            println!("Entries: {}", verification.total_entries());
            if verification.is_intact() {
                println!("Chain intact");
                return Ok(true);
            }
            if let Some(sequence) = verification.first_break_at() {
                println!("First broken link at sequence {}", sequence);
            }
            if !verification.missing_sequences().is_empty() {
                println!("Missing sequences: {:?}", verification.missing_sequences());
            }
            Ok(false)
        }
    }
}

fn open_log(config: &WardenConfig, log: Option<PathBuf>) -> WardenResult<JsonlAuditSink> {
    let path = log
        .or_else(|| config.audit().log_path().clone())
        .ok_or_else(|| {
            WardenError::from(ConfigError::new(
                "No audit log given: pass --log or set audit.log_path",
            ))
        })?;
    if !path.exists() {
        return Err(ConfigError::new(format!("Audit log {} does not exist", path.display())).into());
    }
    JsonlAuditSink::open(path)
}

fn print_records(
    principal: &str,
    records: Vec<AuditRecord>,
    limit: usize,
    format: OutputFormat,
) -> WardenResult<()> {
    let total = records.len();
    let shown: Vec<AuditRecord> = records.into_iter().take(limit).collect();

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&shown)
                .map_err(|e| WardenError::from(JsonError::new(e.to_string())))?;
            println!("{}", json);
        }
        OutputFormat::Human => {
            println!("Audit records for '{}':", principal);
            println!("{:-<80}", "");
            for record in &shown {
                println!(
                    "{}  {:<28} {:<8} {:<17} {}ms",
                    record.created_at().format("%Y-%m-%d %H:%M:%S"),
                    record.action(),
                    record.outcome(),
                    record.final_state(),
                    record.duration_ms()
                );
                if let Some(resource_id) = record.resource_id() {
                    println!("    resource: {}", resource_id);
                }
                if !record.detail().is_empty() {
                    println!("    detail:   {}", record.detail());
                }
            }
            println!("{:-<80}", "");
            println!("Showing {} of {} records", shown.len(), total);
        }
    }

    Ok(())
}
