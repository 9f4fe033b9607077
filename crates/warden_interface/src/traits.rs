//! Collaborator traits.

use crate::{ChatMessage, ChatReply, ConversationSummary};
use async_trait::async_trait;
use warden_core::{AuditRecord, Principal};
use warden_error::WardenResult;

/// Resolves principal IDs to their current role and account status.
#[async_trait]
pub trait IdentityOracle: Send + Sync {
    /// Look up a principal.
    ///
    /// Returns `Ok(None)` when the ID is unknown.
    async fn resolve_principal(&self, principal_id: &str) -> WardenResult<Option<Principal>>;
}

/// Reports who owns a conversation.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Owner principal ID of a conversation, or `Ok(None)` when it does not exist.
    async fn owner_of(&self, resource_id: &str) -> WardenResult<Option<String>>;
}

/// Append-only persistent store for audit records.
///
/// Implementations must never rewrite or drop a record once `append`
/// returned `Ok`.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Durably append one record.
    async fn append(&self, record: &AuditRecord) -> WardenResult<()>;

    /// All records for a principal, newest first.
    async fn list_by_principal(&self, principal_id: &str) -> WardenResult<Vec<AuditRecord>>;

    /// FAILURE and ERROR records for a principal, newest first.
    async fn list_failures(&self, principal_id: &str) -> WardenResult<Vec<AuditRecord>> {
        let records = self.list_by_principal(principal_id).await?;
        Ok(records
            .into_iter()
            .filter(|r| r.outcome().is_failure())
            .collect())
    }
}

/// The chat subsystem the security layer guards.
///
/// Calls reach this trait only after the policy pipeline admitted the
/// request; message text has already been sanitized.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send a message, optionally continuing an existing conversation.
    async fn send_message(
        &self,
        principal: &Principal,
        conversation_id: Option<&str>,
        message: &str,
    ) -> WardenResult<ChatReply>;

    /// Conversations visible to the principal.
    async fn list_conversations(&self, principal: &Principal)
    -> WardenResult<Vec<ConversationSummary>>;

    /// Messages of one conversation, oldest first.
    async fn conversation_history(
        &self,
        principal: &Principal,
        conversation_id: &str,
    ) -> WardenResult<Vec<ChatMessage>>;

    /// Delete a conversation and its messages.
    async fn delete_conversation(
        &self,
        principal: &Principal,
        conversation_id: &str,
    ) -> WardenResult<()>;
}
