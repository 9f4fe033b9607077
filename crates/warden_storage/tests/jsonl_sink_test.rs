//! Tests for the JSON Lines audit sink.

use warden_core::{AuditAction, AuditOutcome, AuditRecord, RequestState};
use warden_interface::AuditSink;
use warden_storage::{JsonlAuditSink, StorageErrorKind};
use warden_error::WardenErrorKind;

fn record(principal: &str, action: AuditAction, outcome: AuditOutcome) -> AuditRecord {
    AuditRecord::builder()
        .principal_id(principal)
        .action(action)
        .outcome(outcome)
        .final_state(if outcome == AuditOutcome::Success {
            RequestState::Succeeded
        } else {
            RequestState::Received
        })
        .source_ip("10.0.0.1")
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_append_and_list() {
    let dir = tempfile::tempdir().unwrap();
    let sink = JsonlAuditSink::open(dir.path().join("audit.jsonl")).unwrap();

    sink.append(&record("admin-1", AuditAction::ChatMessageSent, AuditOutcome::Success))
        .await
        .unwrap();
    sink.append(&record("admin-1", AuditAction::IpRejected, AuditOutcome::Failure))
        .await
        .unwrap();
    sink.append(&record("admin-2", AuditAction::ChatError, AuditOutcome::Error))
        .await
        .unwrap();

    let records = sink.list_by_principal("admin-1").await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[0].created_at() >= records[1].created_at());

    let failures = sink.list_failures("admin-1").await.unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(*failures[0].action(), AuditAction::IpRejected);
}

#[tokio::test]
async fn test_nested_directory_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs/admin/audit.jsonl");
    let sink = JsonlAuditSink::open(&path).unwrap();

    sink.append(&record("admin-1", AuditAction::ConversationsListed, AuditOutcome::Success))
        .await
        .unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn test_reopen_continues_chain() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");

    {
        let sink = JsonlAuditSink::open(&path).unwrap();
        sink.append(&record("admin-1", AuditAction::ChatMessageSent, AuditOutcome::Success))
            .await
            .unwrap();
        sink.append(&record("admin-1", AuditAction::ChatMessageSent, AuditOutcome::Success))
            .await
            .unwrap();
    }

    let sink = JsonlAuditSink::open(&path).unwrap();
    sink.append(&record("admin-1", AuditAction::ConversationDeleted, AuditOutcome::Success))
        .await
        .unwrap();

    let entries = sink.read_all().await.unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(*entries[2].sequence(), 2);
    assert!(sink.verify().await.unwrap().is_intact());
}

#[tokio::test]
async fn test_tampered_file_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let sink = JsonlAuditSink::open(&path).unwrap();

    for _ in 0..3 {
        sink.append(&record("admin-1", AuditAction::RateLimitExceeded, AuditOutcome::Failure))
            .await
            .unwrap();
    }

    let contents = std::fs::read_to_string(&path).unwrap();
    let tampered = contents.replacen("RATE_LIMIT_EXCEEDED", "CHAT_MESSAGE_SENT", 1);
    std::fs::write(&path, tampered).unwrap();

    let verification = sink.verify().await.unwrap();
    assert!(!verification.is_intact());
    assert_eq!(*verification.first_break_at(), Some(0));
}

#[tokio::test]
async fn test_corrupted_line_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    std::fs::write(&path, "{not json}\n").unwrap();

    let err = match JsonlAuditSink::open(&path) {
        Ok(_) => panic!("corrupted log should not open"),
        Err(e) => e,
    };
    match err.kind() {
        WardenErrorKind::Storage(storage) => {
            assert!(matches!(storage.kind(), StorageErrorKind::Corrupted { line: 1, .. }));
        }
        other => panic!("unexpected error: {}", other),
    }
}
