//! Policy enforcement and audit layer for privileged admin operations.
//!
//! Every privileged request runs through a fixed pipeline before the
//! wrapped operation is allowed to execute:
//!
//! 1. **IP Gate** - Source address must be on the allow-list when enabled
//! 2. **Access Validator** - Principal must be an active ADMIN or SUPER_ADMIN,
//!    and must own the conversation unless SUPER_ADMIN
//! 3. **Rate Limiter** - Per-principal minute and hour token buckets
//! 4. **Sanitizer** - Free text is cleaned and injection signatures rejected
//!
//! The [`PolicyOrchestrator`] drives the pipeline and writes exactly one
//! audit record per request through the [`AuditRecorder`].

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod access;
mod audit;
mod config;
mod error;
mod ip_gate;
mod orchestrator;
mod rate_limit;
mod sanitizer;

pub use access::AccessValidator;
pub use audit::{AuditRecorder, OPERATIONAL_TARGET};
pub use config::{AuditConfig, IpWhitelistConfig, RateLimitConfig, SanitizerConfig, WardenConfig};
pub use error::{SecurityError, SecurityErrorKind, SecurityResult};
pub use ip_gate::{IpGate, check_ip};
pub use orchestrator::{Admitted, PolicyOrchestrator, PrivilegedRequest};
pub use rate_limit::{RateLimiter, RateWindow, RemainingTokens};
pub use sanitizer::Sanitizer;
