//! Errors from loading or validating Warden settings.

use std::fmt;

/// Settings that could not be read or that failed validation.
///
/// `key` names the offending setting (`rate_limit.idle_ttl_secs`) when the
/// failure is tied to one; load failures leave it empty.
#[derive(Debug, Clone, derive_more::Error)]
pub struct ConfigError {
    /// Dotted path of the offending setting
    pub key: Option<String>,
    /// What went wrong
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Create an error not tied to a single setting.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self::located(None, message.into())
    }

    /// Create an error for the named setting.
    ///
    /// # Examples
    ///
    /// ```
    /// use warden_error::ConfigError;
    ///
    /// let err = ConfigError::for_key("sanitizer.max_length", "must be greater than zero");
    /// assert_eq!(err.key.as_deref(), Some("sanitizer.max_length"));
    /// assert!(err.to_string().starts_with("Configuration Error [sanitizer.max_length]"));
    /// ```
    #[track_caller]
    pub fn for_key(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::located(Some(key.into()), message.into())
    }

    #[track_caller]
    fn located(key: Option<String>, message: String) -> Self {
        let location = std::panic::Location::caller();
        Self {
            key,
            message,
            line: location.line(),
            file: location.file(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration Error")?;
        if let Some(key) = &self.key {
            write!(f, " [{}]", key)?;
        }
        write!(f, ": {} at line {} in {}", self.message, self.line, self.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_is_caller() {
        let err = ConfigError::new("unreadable");
        assert!(err.file.ends_with("config.rs"));
        assert!(err.key.is_none());
        assert!(err.to_string().starts_with("Configuration Error: unreadable at line"));
    }
}
