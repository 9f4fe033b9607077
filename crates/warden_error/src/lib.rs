//! Error types for the Warden admin security layer.
//!
//! This crate holds the errors raised by collaborators and storage backends:
//! the identity oracle, the conversation store, the audit sinks and the
//! configuration loader. Policy rejections live with the policy code in
//! `warden_security`.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use warden_error::{BackendError, WardenResult};
//!
//! fn lookup_owner() -> WardenResult<String> {
//!     Err(BackendError::new("conversation store", "connection refused"))?
//! }
//!
//! assert!(lookup_owner().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod config;
mod error;
mod json;
mod storage;

pub use backend::BackendError;
pub use config::ConfigError;
pub use error::{WardenError, WardenErrorKind, WardenResult};
pub use json::JsonError;
pub use storage::{StorageError, StorageErrorKind};
