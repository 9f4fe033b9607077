//! Audit recording on top of an injected sink.
//!
//! A failed write never fails the request being audited: it is logged on
//! the `warden::operational` target and counted instead.

use crate::{SecurityError, SecurityErrorKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};
use warden_core::AuditRecord;
use warden_error::WardenResult;
use warden_interface::AuditSink;

/// Tracing target for failures operators must act on.
pub const OPERATIONAL_TARGET: &str = "warden::operational";

/// Writes audit records and reads them back.
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
    write_failures: AtomicU64,
}

impl AuditRecorder {
    /// Create a recorder over the given sink.
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            write_failures: AtomicU64::new(0),
        }
    }

    /// Persist a record, escalating failures to the operational log.
    #[instrument(
        skip(self, record),
        fields(
            record_id = %record.id(),
            principal_id = %record.principal_id(),
            action = %record.action(),
            outcome = %record.outcome()
        )
    )]
    pub async fn record(&self, record: AuditRecord) {
        match self.sink.append(&record).await {
            Ok(()) => debug!("Audit record written"),
            Err(e) => {
                let failures = self.write_failures.fetch_add(1, Ordering::Relaxed) + 1;
                let failure = SecurityError::new(SecurityErrorKind::AuditWriteFailure(e.to_string()));
                error!(
                    target: OPERATIONAL_TARGET,
                    record_id = %record.id(),
                    principal_id = %record.principal_id(),
                    action = %record.action(),
                    outcome = %record.outcome(),
                    write_failures = failures,
                    error = %failure,
                    "Audit record could not be persisted"
                );
            }
        }
    }

    /// Persist a record on its own task.
    ///
    /// The write completes even if the caller stops polling the handle.
    pub fn record_detached(self: &Arc<Self>, record: AuditRecord) -> JoinHandle<()> {
        let recorder = Arc::clone(self);
        tokio::spawn(async move { recorder.record(record).await })
    }

    /// Number of records that could not be persisted.
    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    /// Every record for a principal, newest first.
    pub async fn list_by_principal(&self, principal_id: &str) -> WardenResult<Vec<AuditRecord>> {
        let mut records = self.sink.list_by_principal(principal_id).await?;
        newest_first(&mut records);
        Ok(records)
    }

    /// FAILURE and ERROR records for a principal, newest first.
    pub async fn list_failures(&self, principal_id: &str) -> WardenResult<Vec<AuditRecord>> {
        let mut records = self.sink.list_failures(principal_id).await?;
        records.retain(|r| r.outcome().is_failure());
        newest_first(&mut records);
        Ok(records)
    }
}

/// Stable so sink order breaks timestamp ties.
fn newest_first(records: &mut [AuditRecord]) {
    records.sort_by(|a, b| b.created_at().cmp(a.created_at()));
}

impl std::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRecorder")
            .field("write_failures", &self.write_failures())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::{AuditAction, AuditOutcome, RequestState};
    use warden_storage::InMemoryAuditSink;

    fn record(principal_id: &str, outcome: AuditOutcome) -> AuditRecord {
        AuditRecord::builder()
            .principal_id(principal_id)
            .action(AuditAction::ConversationsListed)
            .outcome(outcome)
            .final_state(RequestState::Succeeded)
            .build()
            .expect("complete record")
    }

    #[tokio::test]
    async fn test_record_and_list() {
        let sink = Arc::new(InMemoryAuditSink::new());
        let recorder = AuditRecorder::new(sink.clone());

        recorder.record(record("admin-1", AuditOutcome::Success)).await;
        recorder.record(record("admin-1", AuditOutcome::Failure)).await;
        recorder.record(record("admin-2", AuditOutcome::Error)).await;

        assert_eq!(sink.len(), 3);
        assert_eq!(recorder.list_by_principal("admin-1").await.expect("list").len(), 2);

        let failures = recorder.list_failures("admin-1").await.expect("list");
        assert_eq!(failures.len(), 1);
        assert_eq!(*failures[0].outcome(), AuditOutcome::Failure);
        assert_eq!(recorder.write_failures(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_is_counted_not_raised() {
        let sink = Arc::new(InMemoryAuditSink::new());
        sink.set_unavailable(true);
        let recorder = AuditRecorder::new(sink.clone());

        recorder.record(record("admin-1", AuditOutcome::Success)).await;
        recorder.record(record("admin-1", AuditOutcome::Success)).await;

        assert_eq!(recorder.write_failures(), 2);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_record_detached_completes() {
        let sink = Arc::new(InMemoryAuditSink::new());
        let recorder = Arc::new(AuditRecorder::new(sink.clone()));

        recorder
            .record_detached(record("admin-1", AuditOutcome::Error))
            .await
            .expect("task joins");

        assert_eq!(sink.len(), 1);
    }
}
