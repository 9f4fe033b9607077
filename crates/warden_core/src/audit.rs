//! Audit record types.

use crate::RequestState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a privileged-action attempt amounted to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Chat message forwarded and answered
    ChatMessageSent,
    /// Chat backend failed
    ChatError,
    /// Chat message rejected by the sanitizer
    ChatBlocked,
    /// Conversation list returned
    ConversationsListed,
    /// Conversation history returned
    ConversationViewed,
    /// Conversation deleted
    ConversationDeleted,
    /// Conversation deletion failed in the backend
    ConversationDeleteFailed,
    /// Resource ownership check failed
    AccessDenied,
    /// Source address not on the allow-list
    IpRejected,
    /// Rate limit exhausted
    RateLimitExceeded,
    /// Principal unknown, inactive or under-privileged
    RoleValidationFailed,
}

/// Outcome status of an audited attempt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOutcome {
    /// Operation ran and completed
    Success,
    /// Policy rejected the request before execution
    Failure,
    /// Operation ran and failed, or was cancelled
    Error,
}

impl AuditOutcome {
    /// FAILURE or ERROR.
    pub fn is_failure(self) -> bool {
        !matches!(self, AuditOutcome::Success)
    }
}

/// Immutable record of one privileged-action attempt.
///
/// Fields are only readable; records are built once through
/// [`AuditRecordBuilder`] and never changed afterwards.
///
/// # Examples
///
/// ```
/// use warden_core::{AuditAction, AuditOutcome, AuditRecordBuilder, RequestState};
///
/// let record = AuditRecordBuilder::default()
///     .principal_id("admin-1")
///     .action(AuditAction::ConversationDeleted)
///     .resource_id("conv-9")
///     .outcome(AuditOutcome::Success)
///     .final_state(RequestState::Succeeded)
///     .build()
///     .unwrap();
///
/// assert_eq!(record.principal_id(), "admin-1");
/// assert_eq!(record.resource_id().as_deref(), Some("conv-9"));
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[builder(setter(into), build_fn(private, name = "build_internal"))]
pub struct AuditRecord {
    /// Unique record ID
    #[builder(default = "Uuid::new_v4()")]
    id: Uuid,
    /// Principal that attempted the action
    principal_id: String,
    /// What was attempted
    action: AuditAction,
    /// Conversation or other resource involved
    #[builder(setter(into, strip_option), default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resource_id: Option<String>,
    /// Free-text detail (denial reason, error message)
    #[builder(default)]
    #[serde(default)]
    detail: String,
    /// Caller's source address
    #[builder(default)]
    #[serde(default)]
    source_ip: String,
    /// Caller's user agent
    #[builder(default)]
    #[serde(default)]
    user_agent: String,
    /// Outcome status
    outcome: AuditOutcome,
    /// State the request stopped in
    final_state: RequestState,
    /// Whether the sanitizer changed the caller's input
    #[builder(default)]
    #[serde(default)]
    input_flagged: bool,
    /// Processing time in milliseconds
    #[builder(default)]
    #[serde(default)]
    duration_ms: u64,
    /// When the request reached its terminal state
    #[builder(default = "Utc::now()")]
    created_at: DateTime<Utc>,
}

impl AuditRecordBuilder {
    /// Build the AuditRecord.
    ///
    /// # Errors
    ///
    /// Returns error if principal, action, outcome or final state is missing.
    pub fn build(&self) -> Result<AuditRecord, String> {
        self.build_internal().map_err(|e| e.to_string())
    }
}

impl AuditRecord {
    /// Start building a record.
    pub fn builder() -> AuditRecordBuilder {
        AuditRecordBuilder::default()
    }
}
