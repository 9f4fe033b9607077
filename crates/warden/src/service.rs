//! The guarded admin chat surface.

use std::sync::Arc;
use tracing::instrument;
use warden_core::{AuditRecord, Operation, RequestContext};
use warden_error::WardenResult;
use warden_interface::{
    AuditSink, ChatBackend, ChatMessage, ChatReply, ConversationStore, ConversationSummary,
    IdentityOracle,
};
use warden_security::{PolicyOrchestrator, PrivilegedRequest, SecurityResult, WardenConfig};

/// Admin-only chat operations, each run through the policy pipeline.
///
/// | Operation | Checks | Success / error action |
/// |---|---|---|
/// | `send_chat_message` | IP, role, resource (if named), rate, sanitize | CHAT_MESSAGE_SENT / CHAT_ERROR |
/// | `list_conversations` | IP, role, rate | CONVERSATIONS_LISTED / CHAT_ERROR |
/// | `conversation_history` | IP, role, resource, rate | CONVERSATION_VIEWED / CHAT_ERROR |
/// | `delete_conversation` | IP, role, resource, rate | CONVERSATION_DELETED / CONVERSATION_DELETE_FAILED |
#[derive(Clone)]
pub struct AdminChatService {
    orchestrator: Arc<PolicyOrchestrator>,
    backend: Arc<dyn ChatBackend>,
}

impl AdminChatService {
    /// Create a service from an existing orchestrator.
    pub fn new(orchestrator: Arc<PolicyOrchestrator>, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            orchestrator,
            backend,
        }
    }

    /// Wire the service from configuration and collaborators.
    pub fn from_config(
        config: &WardenConfig,
        identity: Arc<dyn IdentityOracle>,
        conversations: Arc<dyn ConversationStore>,
        backend: Arc<dyn ChatBackend>,
        sink: Arc<dyn AuditSink>,
    ) -> SecurityResult<Self> {
        let orchestrator =
            PolicyOrchestrator::from_config(config, identity, conversations, sink)?;
        Ok(Self::new(Arc::new(orchestrator), backend))
    }

    /// The policy orchestrator.
    pub fn orchestrator(&self) -> &Arc<PolicyOrchestrator> {
        &self.orchestrator
    }

    /// Send a message, optionally into an existing conversation.
    #[instrument(skip(self, context, message), fields(principal_id = %context.principal_id()))]
    pub async fn send_chat_message(
        &self,
        context: RequestContext,
        conversation_id: Option<&str>,
        message: &str,
    ) -> SecurityResult<ChatReply> {
        let mut request =
            PrivilegedRequest::new(context, Operation::SendChatMessage).with_input(message);
        if let Some(conversation_id) = conversation_id {
            request = request.with_resource(conversation_id);
        }

        let backend = &self.backend;
        self.orchestrator
            .execute(request, |admitted| async move {
                let (principal, input) = admitted.into_parts();
                backend
                    .send_message(&principal, conversation_id, input.as_deref().unwrap_or_default())
                    .await
            })
            .await
    }

    /// List conversations visible to the caller.
    #[instrument(skip(self, context), fields(principal_id = %context.principal_id()))]
    pub async fn list_conversations(
        &self,
        context: RequestContext,
    ) -> SecurityResult<Vec<ConversationSummary>> {
        let request = PrivilegedRequest::new(context, Operation::ListConversations);
        let backend = &self.backend;
        self.orchestrator
            .execute(request, |admitted| async move {
                backend.list_conversations(admitted.principal()).await
            })
            .await
    }

    /// Messages of one conversation, oldest first.
    #[instrument(skip(self, context), fields(principal_id = %context.principal_id()))]
    pub async fn conversation_history(
        &self,
        context: RequestContext,
        conversation_id: &str,
    ) -> SecurityResult<Vec<ChatMessage>> {
        let request = PrivilegedRequest::new(context, Operation::ViewConversationHistory)
            .with_resource(conversation_id);
        let backend = &self.backend;
        self.orchestrator
            .execute(request, |admitted| async move {
                backend
                    .conversation_history(admitted.principal(), conversation_id)
                    .await
            })
            .await
    }

    /// Delete one conversation.
    #[instrument(skip(self, context), fields(principal_id = %context.principal_id()))]
    pub async fn delete_conversation(
        &self,
        context: RequestContext,
        conversation_id: &str,
    ) -> SecurityResult<()> {
        let request = PrivilegedRequest::new(context, Operation::DeleteConversation)
            .with_resource(conversation_id);
        let backend = &self.backend;
        self.orchestrator
            .execute(request, |admitted| async move {
                backend
                    .delete_conversation(admitted.principal(), conversation_id)
                    .await
            })
            .await
    }

    /// Audit records for a principal, newest first.
    pub async fn audit_trail(&self, principal_id: &str) -> WardenResult<Vec<AuditRecord>> {
        self.orchestrator.recorder().list_by_principal(principal_id).await
    }

    /// FAILURE and ERROR audit records for a principal, newest first.
    pub async fn audit_failures(&self, principal_id: &str) -> WardenResult<Vec<AuditRecord>> {
        self.orchestrator.recorder().list_failures(principal_id).await
    }
}

impl std::fmt::Debug for AdminChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminChatService")
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}
