//! Chat payload types exchanged with the guarded backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatRole {
    /// The administrator
    User,
    /// The AI model
    Assistant,
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote it
    pub role: ChatRole,
    /// Message text
    pub content: String,
    /// When it was stored
    pub sent_at: DateTime<Utc>,
}

/// The model's answer to a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Conversation the exchange belongs to (new or continued)
    pub conversation_id: String,
    /// Response text
    pub content: String,
}

/// Listing entry for a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Conversation ID
    pub id: String,
    /// Owning principal
    pub owner_id: String,
    /// Display title
    pub title: String,
    /// Number of stored messages
    pub message_count: usize,
    /// Last activity
    pub updated_at: DateTime<Utc>,
}
