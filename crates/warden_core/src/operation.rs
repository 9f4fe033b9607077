//! Privileged operations and request lifecycle states.

use crate::AuditAction;
use serde::{Deserialize, Serialize};

/// A privileged operation guarded by the policy orchestrator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    /// POST chat-message
    SendChatMessage,
    /// GET list-conversations
    ListConversations,
    /// GET conversation-history
    ViewConversationHistory,
    /// DELETE conversation
    DeleteConversation,
}

impl Operation {
    /// Action recorded when the operation runs to completion.
    pub fn success_action(self) -> AuditAction {
        match self {
            Operation::SendChatMessage => AuditAction::ChatMessageSent,
            Operation::ListConversations => AuditAction::ConversationsListed,
            Operation::ViewConversationHistory => AuditAction::ConversationViewed,
            Operation::DeleteConversation => AuditAction::ConversationDeleted,
        }
    }

    /// Action recorded when the wrapped operation itself fails.
    pub fn error_action(self) -> AuditAction {
        match self {
            Operation::DeleteConversation => AuditAction::ConversationDeleteFailed,
            _ => AuditAction::ChatError,
        }
    }

    /// Whether the operation must name the conversation it touches.
    pub fn requires_resource(self) -> bool {
        matches!(
            self,
            Operation::ViewConversationHistory | Operation::DeleteConversation
        )
    }

    /// Whether the operation carries free text that must be sanitized.
    pub fn carries_input(self) -> bool {
        self == Operation::SendChatMessage
    }
}

/// Where a request is in the policy pipeline.
///
/// Transitions happen strictly in declaration order up to `Executing`;
/// `Succeeded` and `Failed` are terminal.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestState {
    /// Request accepted by the orchestrator
    Received,
    /// Source address passed the allow-list
    IpChecked,
    /// Principal holds an elevated role
    RoleChecked,
    /// Principal may touch the named resource
    ResourceChecked,
    /// Rate-limit token consumed
    RateChecked,
    /// Input cleaned
    Sanitized,
    /// Wrapped operation running
    Executing,
    /// Wrapped operation completed
    Succeeded,
    /// Request rejected or failed
    Failed,
}

impl RequestState {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Succeeded | RequestState::Failed)
    }
}

/// Transport-level facts about the caller of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct RequestContext {
    /// Authenticated principal ID
    principal_id: String,
    /// Caller's source address as received
    source_ip: String,
    /// Caller's user-agent header
    user_agent: String,
}

impl RequestContext {
    /// Create a request context.
    pub fn new(
        principal_id: impl Into<String>,
        source_ip: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            principal_id: principal_id.into(),
            source_ip: source_ip.into(),
            user_agent: user_agent.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_error_action() {
        assert_eq!(
            Operation::DeleteConversation.error_action(),
            AuditAction::ConversationDeleteFailed
        );
        assert_eq!(Operation::SendChatMessage.error_action(), AuditAction::ChatError);
    }

    #[test]
    fn test_resource_requirements() {
        assert!(!Operation::SendChatMessage.requires_resource());
        assert!(!Operation::ListConversations.requires_resource());
        assert!(Operation::ViewConversationHistory.requires_resource());
        assert!(Operation::DeleteConversation.requires_resource());
    }

    #[test]
    fn test_only_chat_carries_input() {
        use strum::IntoEnumIterator;
        let carrying: Vec<Operation> = Operation::iter().filter(|op| op.carries_input()).collect();
        assert_eq!(carrying, vec![Operation::SendChatMessage]);
    }

    #[test]
    fn test_state_order() {
        assert!(RequestState::Received < RequestState::IpChecked);
        assert!(RequestState::RateChecked < RequestState::Sanitized);
        assert!(RequestState::Failed.is_terminal());
        assert!(!RequestState::Executing.is_terminal());
    }
}
