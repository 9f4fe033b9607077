//! In-memory audit sink and collaborator doubles.

use crate::{ChainState, ChainVerification, SealedAuditRecord, newest_first, verify_chain};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;
use warden_core::{AuditRecord, Principal};
use warden_error::{BackendError, StorageError, StorageErrorKind, WardenResult};
use warden_interface::{
    AuditSink, ChatBackend, ChatMessage, ChatReply, ChatRole, ConversationStore,
    ConversationSummary, IdentityOracle,
};

#[derive(Debug, Default)]
struct MemoryLog {
    chain: ChainState,
    entries: Vec<SealedAuditRecord>,
}

/// Process-local, hash-chained audit log.
///
/// Can be switched into an unavailable state to exercise audit-write
/// failure handling.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    log: RwLock<MemoryLog>,
    unavailable: AtomicBool,
}

impl InMemoryAuditSink {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent appends fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Every sealed record in append order.
    pub fn sealed_entries(&self) -> Vec<SealedAuditRecord> {
        self.read_log().entries.clone()
    }

    /// Every record in append order.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.read_log()
            .entries
            .iter()
            .map(|s| s.record().clone())
            .collect()
    }

    /// Number of records appended.
    pub fn len(&self) -> usize {
        self.read_log().entries.len()
    }

    /// Whether nothing was appended yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Verify the hash chain of everything appended so far.
    pub fn verify_chain(&self) -> ChainVerification {
        verify_chain(&self.read_log().entries)
    }

    fn read_log(&self) -> std::sync::RwLockReadGuard<'_, MemoryLog> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.log.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    #[tracing::instrument(skip(self, record), fields(record_id = %record.id(), action = %record.action()))]
    async fn append(&self, record: &AuditRecord) -> WardenResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::new(StorageErrorKind::Unavailable(
                "in-memory audit sink switched off".to_string(),
            ))
            .into());
        }

        let mut log = self.log.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let sealed = log.chain.seal(record.clone())?;
        log.chain.advance(&sealed);
        tracing::debug!(sequence = sealed.sequence(), "Appended audit record");
        log.entries.push(sealed);
        Ok(())
    }

    async fn list_by_principal(&self, principal_id: &str) -> WardenResult<Vec<AuditRecord>> {
        let log = self.read_log();
        Ok(newest_first(
            log.entries
                .iter()
                .filter(|s| s.record().principal_id() == principal_id)
                .collect(),
        ))
    }
}

/// In-memory identity oracle.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    principals: RwLock<HashMap<String, Principal>>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a principal.
    pub fn upsert(&self, principal: Principal) {
        self.principals
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(principal.id().clone(), principal);
    }

    /// Remove a principal.
    pub fn remove(&self, principal_id: &str) -> Option<Principal> {
        self.principals
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(principal_id)
    }
}

impl FromIterator<Principal> for InMemoryDirectory {
    fn from_iter<I: IntoIterator<Item = Principal>>(iter: I) -> Self {
        let directory = Self::new();
        for principal in iter {
            directory.upsert(principal);
        }
        directory
    }
}

#[async_trait]
impl IdentityOracle for InMemoryDirectory {
    async fn resolve_principal(&self, principal_id: &str) -> WardenResult<Option<Principal>> {
        Ok(self
            .principals
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(principal_id)
            .cloned())
    }
}

#[derive(Debug, Clone)]
struct Conversation {
    owner_id: String,
    title: String,
    messages: Vec<ChatMessage>,
    updated_at: chrono::DateTime<Utc>,
}

/// In-memory conversation store and echoing chat backend.
///
/// Replies repeat the message back; it stands in for the AI model in tests
/// and in the CLI demo.
#[derive(Debug, Default)]
pub struct InMemoryConversations {
    conversations: RwLock<HashMap<String, Conversation>>,
    failing: AtomicBool,
}

impl InMemoryConversations {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty conversation owned by `owner_id`.
    pub fn insert(&self, conversation_id: impl Into<String>, owner_id: impl Into<String>) {
        let conversation_id = conversation_id.into();
        let conversation = Conversation {
            owner_id: owner_id.into(),
            title: conversation_id.clone(),
            messages: Vec::new(),
            updated_at: Utc::now(),
        };
        self.write().insert(conversation_id, conversation);
    }

    /// Whether a conversation exists.
    pub fn contains(&self, conversation_id: &str) -> bool {
        self.read().contains_key(conversation_id)
    }

    /// Make every backend call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> WardenResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BackendError::new("chat backend", "model unavailable").into());
        }
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Conversation>> {
        self.conversations
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Conversation>> {
        self.conversations
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversations {
    async fn owner_of(&self, resource_id: &str) -> WardenResult<Option<String>> {
        Ok(self.read().get(resource_id).map(|c| c.owner_id.clone()))
    }
}

#[async_trait]
impl ChatBackend for InMemoryConversations {
    async fn send_message(
        &self,
        principal: &Principal,
        conversation_id: Option<&str>,
        message: &str,
    ) -> WardenResult<ChatReply> {
        self.check_available()?;

        let conversation_id = conversation_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let reply = format!("Received: {}", message);
        let now = Utc::now();

        let mut conversations = self.write();
        let conversation = conversations
            .entry(conversation_id.clone())
            .or_insert_with(|| Conversation {
                owner_id: principal.id().clone(),
                title: message.chars().take(40).collect(),
                messages: Vec::new(),
                updated_at: now,
            });
        conversation.messages.push(ChatMessage {
            role: ChatRole::User,
            content: message.to_string(),
            sent_at: now,
        });
        conversation.messages.push(ChatMessage {
            role: ChatRole::Assistant,
            content: reply.clone(),
            sent_at: now,
        });
        conversation.updated_at = now;

        Ok(ChatReply {
            conversation_id,
            content: reply,
        })
    }

    async fn list_conversations(
        &self,
        principal: &Principal,
    ) -> WardenResult<Vec<ConversationSummary>> {
        self.check_available()?;

        let mut summaries: Vec<ConversationSummary> = self
            .read()
            .iter()
            .filter(|(_, c)| principal.role().bypasses_ownership() || &c.owner_id == principal.id())
            .map(|(id, c)| ConversationSummary {
                id: id.clone(),
                owner_id: c.owner_id.clone(),
                title: c.title.clone(),
                message_count: c.messages.len(),
                updated_at: c.updated_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(summaries)
    }

    async fn conversation_history(
        &self,
        _principal: &Principal,
        conversation_id: &str,
    ) -> WardenResult<Vec<ChatMessage>> {
        self.check_available()?;

        self.read()
            .get(conversation_id)
            .map(|c| c.messages.clone())
            .ok_or_else(|| {
                BackendError::new(
                    "chat backend",
                    format!("conversation '{}' not found", conversation_id),
                )
                .into()
            })
    }

    async fn delete_conversation(
        &self,
        _principal: &Principal,
        conversation_id: &str,
    ) -> WardenResult<()> {
        self.check_available()?;

        match self.write().remove(conversation_id) {
            Some(_) => Ok(()),
            None => Err(BackendError::new(
                "chat backend",
                format!("conversation '{}' not found", conversation_id),
            )
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::{AuditAction, AuditOutcome, RequestState, Role};

    fn record(principal: &str, outcome: AuditOutcome) -> AuditRecord {
        AuditRecord::builder()
            .principal_id(principal)
            .action(AuditAction::ChatMessageSent)
            .outcome(outcome)
            .final_state(RequestState::Succeeded)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_failures_filters_success() {
        let sink = InMemoryAuditSink::new();
        sink.append(&record("admin-1", AuditOutcome::Success)).await.unwrap();
        sink.append(&record("admin-1", AuditOutcome::Failure)).await.unwrap();
        sink.append(&record("admin-1", AuditOutcome::Error)).await.unwrap();
        sink.append(&record("admin-2", AuditOutcome::Failure)).await.unwrap();

        let failures = sink.list_failures("admin-1").await.unwrap();
        assert_eq!(failures.len(), 2);
        assert!(failures.iter().all(|r| r.outcome().is_failure()));
        assert_eq!(sink.list_by_principal("admin-1").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unavailable_sink_rejects_appends() {
        let sink = InMemoryAuditSink::new();
        sink.set_unavailable(true);
        assert!(sink.append(&record("admin-1", AuditOutcome::Success)).await.is_err());
        assert!(sink.is_empty());

        sink.set_unavailable(false);
        sink.append(&record("admin-1", AuditOutcome::Success)).await.unwrap();
        assert_eq!(sink.len(), 1);
        assert!(sink.verify_chain().is_intact());
    }

    #[tokio::test]
    async fn test_directory_lookup() {
        let directory: InMemoryDirectory =
            [Principal::active("admin-1", Role::Admin)].into_iter().collect();

        let found = directory.resolve_principal("admin-1").await.unwrap();
        assert_eq!(found.map(|p| *p.role()), Some(Role::Admin));
        assert!(directory.resolve_principal("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_chat_round_trip() {
        let conversations = InMemoryConversations::new();
        let admin = Principal::active("admin-1", Role::Admin);

        let reply = conversations.send_message(&admin, None, "hello").await.unwrap();
        assert_eq!(reply.content, "Received: hello");
        assert_eq!(
            conversations.owner_of(&reply.conversation_id).await.unwrap(),
            Some("admin-1".to_string())
        );

        let history = conversations
            .conversation_history(&admin, &reply.conversation_id)
            .await
            .unwrap();
        assert_eq!(history.len(), 2);

        conversations
            .delete_conversation(&admin, &reply.conversation_id)
            .await
            .unwrap();
        assert!(!conversations.contains(&reply.conversation_id));
    }

    #[tokio::test]
    async fn test_listing_respects_ownership() {
        let conversations = InMemoryConversations::new();
        conversations.insert("conv-a", "admin-1");
        conversations.insert("conv-b", "admin-2");

        let admin = Principal::active("admin-1", Role::Admin);
        let root = Principal::active("root", Role::SuperAdmin);

        assert_eq!(conversations.list_conversations(&admin).await.unwrap().len(), 1);
        assert_eq!(conversations.list_conversations(&root).await.unwrap().len(), 2);
    }
}
