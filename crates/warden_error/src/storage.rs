//! Audit storage error types.

/// Kinds of audit storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StorageErrorKind {
    /// Failed to create the log directory
    #[display("Failed to create log directory: {}", _0)]
    DirectoryCreation(String),
    /// Failed to open the log file
    #[display("Failed to open log file: {}", _0)]
    FileOpen(String),
    /// Failed to append to the log
    #[display("Failed to write audit log: {}", _0)]
    FileWrite(String),
    /// Failed to read the log
    #[display("Failed to read audit log: {}", _0)]
    FileRead(String),
    /// A persisted entry could not be decoded
    #[display("Corrupted audit entry at line {}: {}", line, reason)]
    Corrupted {
        /// 1-based line number in the log
        line: usize,
        /// Decoder message
        reason: String,
    },
    /// Storage backend refuses writes
    #[display("Storage unavailable: {}", _0)]
    Unavailable(String),
}

/// Storage error with location tracking.
///
/// # Examples
///
/// ```
/// use warden_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::Unavailable("disk full".to_string()));
/// assert!(format!("{}", err).contains("disk full"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The kind of error that occurred
    pub kind: StorageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StorageError {
    /// Create a new storage error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &StorageErrorKind {
        &self.kind
    }
}
