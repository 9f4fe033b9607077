//! Audit sink selection.

use std::sync::Arc;
use tracing::info;
use warden_error::WardenResult;
use warden_interface::AuditSink;
use warden_security::AuditConfig;
use warden_storage::{InMemoryAuditSink, JsonlAuditSink};

/// Open the configured audit sink.
///
/// A JSONL file when `audit.log_path` is set, otherwise an in-memory log
/// that lives as long as the process.
pub fn open_audit_sink(config: &AuditConfig) -> WardenResult<Arc<dyn AuditSink>> {
    match config.log_path() {
        Some(path) => Ok(Arc::new(JsonlAuditSink::open(path)?)),
        None => {
            info!("No audit.log_path configured, keeping audit records in memory");
            Ok(Arc::new(InMemoryAuditSink::new()))
        }
    }
}
