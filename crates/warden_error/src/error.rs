//! Top-level error wrapper types.

use crate::{BackendError, ConfigError, JsonError, StorageError};

/// Every error a Warden collaborator or backend can produce.
///
/// # Examples
///
/// ```
/// use warden_error::{WardenError, ConfigError};
///
/// let err: WardenError = ConfigError::new("missing [rate_limit]").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum WardenErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Audit storage error
    #[from(StorageError)]
    Storage(StorageError),
    /// External collaborator error
    #[from(BackendError)]
    Backend(BackendError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
}

/// Warden error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Warden Error: {}", _0)]
pub struct WardenError(Box<WardenErrorKind>);

impl WardenError {
    /// Create a new error from a kind.
    pub fn new(kind: WardenErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &WardenErrorKind {
        &self.0
    }
}

impl<T> From<T> for WardenError
where
    T: Into<WardenErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Warden collaborator and storage operations.
pub type WardenResult<T> = std::result::Result<T, WardenError>;
