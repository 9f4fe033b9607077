//! Warden - security and audit layer for an admin-only AI chat service.
//!
//! Warden wraps every privileged chat operation in a fixed policy pipeline
//! (IP allow-list, role check, ownership check, rate limit, input
//! sanitization) and writes exactly one tamper-evident audit record per
//! request.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use warden::{AdminChatService, RequestContext, WardenConfig, open_audit_sink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WardenConfig::load()?;
//!     let sink = open_audit_sink(config.audit())?;
//!     let service = AdminChatService::from_config(&config, directory, store, backend, sink)?;
//!
//!     let context = RequestContext::new("admin-1", "10.0.0.1", "admin-console/2.3");
//!     let reply = service.send_chat_message(context, None, "Summarise today's tickets").await?;
//!     println!("{}", reply.content);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `warden_error` - Error types
//! - `warden_core` - Principals, roles, operations, audit records
//! - `warden_interface` - Collaborator traits (identity, conversations, audit sink, chat backend)
//! - `warden_storage` - Hash-chained audit sinks and in-memory collaborators
//! - `warden_security` - Sanitizer, rate limiter, access validator, IP gate, orchestrator
//!
//! This crate (`warden`) re-exports everything for convenience.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod logging;
mod service;
mod sink;

pub use logging::{LogFormat, init_tracing};
pub use service::AdminChatService;
pub use sink::open_audit_sink;

pub use warden_core::*;
pub use warden_error::*;
pub use warden_interface::*;
pub use warden_security::*;
pub use warden_storage::{
    ChainVerification, InMemoryAuditSink, InMemoryConversations, InMemoryDirectory,
    JsonlAuditSink, SealedAuditRecord, verify_chain,
};
