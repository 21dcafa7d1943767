//! Error types and result aliases for Silo.
//!
//! This module defines the shared error types used across all Silo components.
//! Errors are structured for programmatic handling: the reconcile driver needs
//! to tell transient infrastructure failures apart from permanent ones, so
//! retryability is a property of the variant, not of the call site.

/// The result type used throughout Silo.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Silo operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required configuration option is missing or invalid at startup.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },

    /// An upload notification could not be parsed into a complete event.
    ///
    /// Partial metadata is never emitted for a malformed notification; the
    /// whole notification is rejected.
    #[error("malformed notification: {message}")]
    MalformedNotification {
        /// Description of what made the notification malformed.
        message: String,
    },

    /// A durable-store operation failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// An object or record was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Publishing an outbound event failed.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a new malformed-notification error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedNotification {
            message: message.into(),
        }
    }

    /// Creates a new storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new storage error with a source cause.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true when the failure is plausibly transient infrastructure
    /// unavailability, in which case the same operation may be retried.
    ///
    /// `NotFound` is retryable: the stores involved are eventually consistent,
    /// so an object known to exist can still be briefly invisible to a reader.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. } | Self::NotFound(_) | Self::Transport { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(Error::storage("store offline").is_retryable());
        assert!(Error::NotFound("manifest".into()).is_retryable());
        assert!(Error::transport("bus unreachable").is_retryable());

        assert!(!Error::config("missing suffix").is_retryable());
        assert!(!Error::InvalidInput("bad manifest encoding".into()).is_retryable());
        assert!(!Error::malformed("no timestamp").is_retryable());
    }

    #[test]
    fn storage_error_preserves_source() {
        let cause = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = Error::storage_with_source("read failed", cause);
        assert!(std::error::Error::source(&err).is_some());
    }
}
