//! Core data types for the Warden admin security layer.
//!
//! This crate provides the vocabulary shared by every Warden crate: who is
//! acting ([`Principal`], [`Role`]), what they are attempting
//! ([`Operation`], [`RequestContext`]), how far the request got
//! ([`RequestState`]) and what was written down about it ([`AuditRecord`]).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod audit;
mod operation;
mod principal;
mod role;
mod sanitization;

pub use audit::{AuditAction, AuditOutcome, AuditRecord, AuditRecordBuilder};
pub use operation::{Operation, RequestContext, RequestState};
pub use principal::Principal;
pub use role::Role;
pub use sanitization::{FindingKind, SanitizationFinding, SanitizationResult};
