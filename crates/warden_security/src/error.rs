//! Security error types.

use crate::RateWindow;

/// Specific security error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum SecurityErrorKind {
    /// Source address not on the allow-list
    #[display("Source address '{}' rejected: {}", address, reason)]
    IpRejected {
        /// Address as received
        address: String,
        /// Reason for rejection
        reason: String,
    },

    /// Principal unknown, inactive or below ADMIN
    #[display("Role validation failed for '{}': {}", principal_id, reason)]
    RoleInsufficient {
        /// Principal that was checked
        principal_id: String,
        /// Reason for denial
        reason: String,
    },

    /// Principal may not touch the resource
    #[display("Access to '{}' denied for '{}': {}", resource, principal_id, reason)]
    ResourceAccessDenied {
        /// Principal that was checked
        principal_id: String,
        /// Resource that was denied
        resource: String,
        /// Reason for denial
        reason: String,
    },

    /// Rate limit exhausted
    #[display(
        "Rate limit exceeded for '{}': {} per {} (retry after {}s)",
        principal_id,
        limit,
        window,
        retry_after_secs
    )]
    RateLimitExceeded {
        /// Principal that was throttled
        principal_id: String,
        /// Window whose bucket was empty
        window: RateWindow,
        /// Capacity of that window
        limit: u32,
        /// Seconds until a token is available
        retry_after_secs: u64,
    },

    /// Input matched an injection signature
    #[display("Input rejected: {}", reason)]
    SanitizationFlagged {
        /// Signatures that matched
        reason: String,
    },

    /// The wrapped operation failed
    #[display("Upstream execution failed: {}", _0)]
    UpstreamExecution(String),

    /// An audit record could not be persisted
    #[display("Audit write failed: {}", _0)]
    AuditWriteFailure(String),

    /// Configuration error
    #[display("Configuration error: {}", _0)]
    Configuration(String),
}

impl SecurityErrorKind {
    /// Whether this is a policy rejection raised before execution.
    pub fn is_policy_rejection(&self) -> bool {
        matches!(
            self,
            SecurityErrorKind::IpRejected { .. }
                | SecurityErrorKind::RoleInsufficient { .. }
                | SecurityErrorKind::ResourceAccessDenied { .. }
                | SecurityErrorKind::RateLimitExceeded { .. }
                | SecurityErrorKind::SanitizationFlagged { .. }
        )
    }
}

/// Security error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Security Error: {} at line {} in {}", kind, line, file)]
pub struct SecurityError {
    /// The specific error kind
    pub kind: SecurityErrorKind,
    /// Line number where error occurred
    pub line: u32,
    /// File where error occurred
    pub file: &'static str,
}

impl SecurityError {
    /// Create a new security error with location tracking.
    #[track_caller]
    pub fn new(kind: SecurityErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &SecurityErrorKind {
        &self.kind
    }
}

/// Result type for security operations.
pub type SecurityResult<T> = Result<T, SecurityError>;

impl From<warden_error::ConfigError> for SecurityError {
    #[track_caller]
    fn from(err: warden_error::ConfigError) -> Self {
        SecurityError::new(SecurityErrorKind::Configuration(err.message))
    }
}
