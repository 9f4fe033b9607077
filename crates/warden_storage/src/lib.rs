//! Tamper-evident audit storage for Warden.
//!
//! Every backend in this crate seals records into a SHA-256 hash chain on
//! append: each [`SealedAuditRecord`] carries a sequence number, the hash of
//! its predecessor and its own hash. Editing, deleting or reordering a
//! persisted line breaks [`verify_chain`].
//!
//! # Backends
//!
//! - [`JsonlAuditSink`] - append-only JSON Lines file, one sealed record per line
//! - [`InMemoryAuditSink`] - process-local log for tests and ephemeral deployments
//!
//! The crate also ships in-memory collaborator doubles
//! ([`InMemoryDirectory`], [`InMemoryConversations`]) used by tests and the
//! CLI demo.
//!
//! # Example
//!
//! ```rust
//! use warden_core::{AuditAction, AuditOutcome, AuditRecord, RequestState};
//! use warden_interface::AuditSink;
//! use warden_storage::InMemoryAuditSink;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sink = InMemoryAuditSink::new();
//! let record = AuditRecord::builder()
//!     .principal_id("admin-1")
//!     .action(AuditAction::ConversationsListed)
//!     .outcome(AuditOutcome::Success)
//!     .final_state(RequestState::Succeeded)
//!     .build()?;
//!
//! sink.append(&record).await?;
//! assert_eq!(sink.list_by_principal("admin-1").await?.len(), 1);
//! assert!(sink.verify_chain().is_intact());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod chain;
mod jsonl;
mod memory;

pub use chain::{ChainState, ChainVerification, GENESIS_HASH, SealedAuditRecord, verify_chain};
pub use jsonl::JsonlAuditSink;
pub use memory::{InMemoryAuditSink, InMemoryConversations, InMemoryDirectory};
pub use warden_error::{StorageError, StorageErrorKind};

use warden_core::AuditRecord;

/// Sort records newest first, breaking timestamp ties by sequence.
pub(crate) fn newest_first(mut sealed: Vec<&SealedAuditRecord>) -> Vec<AuditRecord> {
    sealed.sort_by(|a, b| {
        b.record()
            .created_at()
            .cmp(a.record().created_at())
            .then_with(|| b.sequence().cmp(a.sequence()))
    });
    sealed.into_iter().map(|s| s.record().clone()).collect()
}
