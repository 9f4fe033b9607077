//! Errors raised by external collaborators.

/// Failure reported by an external collaborator (identity oracle,
/// conversation store, chat backend).
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Backend Error ({}): {} at line {} in {}", backend, message, line, file)]
pub struct BackendError {
    /// Which collaborator failed
    pub backend: String,
    /// Error message
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl BackendError {
    /// Create a new BackendError for the named collaborator.
    ///
    /// # Examples
    ///
    /// ```
    /// use warden_error::BackendError;
    ///
    /// let err = BackendError::new("identity oracle", "timeout after 5s");
    /// assert_eq!(err.backend, "identity oracle");
    /// assert!(err.to_string().contains("timeout"));
    /// ```
    #[track_caller]
    pub fn new(backend: impl Into<String>, message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            backend: backend.into(),
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
