//! Trait definitions for the collaborators the Warden security layer wraps.
//!
//! The security layer never talks to a database, a directory service or an
//! AI model directly. It consumes these traits instead, so deployments plug
//! in their own backends and tests plug in doubles.

mod traits;
mod types;

pub use traits::{AuditSink, ChatBackend, ConversationStore, IdentityOracle};
pub use types::{ChatMessage, ChatReply, ChatRole, ConversationSummary};
