//! Error types shared by the adapter crates.

use thiserror::Error;

/// Result alias used across the kit.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Errors produced by the kit and its adapters.
///
/// Underlying library errors are carried as boxed sources; the variant
/// decides how the broker subscriber treats a failure (retry, skip, stop).
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Envelope could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(String),

    /// JSON serialization failure outside the envelope path
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Message content is malformed; the message is skipped, not retried
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Transient failure, safe to retry with backoff
    #[error("Retryable error: {message}")]
    Retryable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Unrecoverable failure, terminates the processing loop
    #[error("Fatal error: {message}")]
    Fatal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl AdapterError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec(message.into())
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    pub fn retryable(message: impl Into<String>) -> Self {
        Self::Retryable {
            message: message.into(),
            source: None,
        }
    }

    pub fn retryable_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Retryable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
            source: None,
        }
    }

    pub fn fatal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Fatal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether the subscriber loop may retry the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. })
    }

    /// Whether the message itself is broken and should be skipped
    /// (or routed to the dead-letter topic).
    pub fn is_invalid_data(&self) -> bool {
        matches!(self, Self::InvalidData { .. } | Self::Codec(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(AdapterError::retryable("timeout").is_retryable());
        assert!(!AdapterError::retryable("timeout").is_invalid_data());

        assert!(AdapterError::invalid_data("bad payload").is_invalid_data());
        assert!(!AdapterError::invalid_data("bad payload").is_retryable());

        assert!(AdapterError::codec("truncated envelope").is_invalid_data());
        assert!(!AdapterError::fatal("broker gone").is_retryable());
    }

    #[test]
    fn test_source_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = AdapterError::retryable_with_source("publish failed", io);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("publish failed"));
    }
}
