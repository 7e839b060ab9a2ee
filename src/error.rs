//! Error types for connection caching and request handling

use thiserror::Error;

/// Errors surfaced by a connection slot
///
/// `Clone` so the slot can keep the most recent failure for diagnostics while
/// handing the same value back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// The connection target is absent or empty
    #[error("{0} not set")]
    ConfigurationMissing(String),

    /// Opening the connection failed (malformed target, unreachable host, auth)
    #[error("failed to connect to {store}: {reason}")]
    ConnectionFailed { store: &'static str, reason: String },

    /// The liveness probe failed or timed out
    #[error("failed to ping {store}: {reason}")]
    HealthCheckFailed { store: &'static str, reason: String },
}

impl ConnectionError {
    /// Whether calling again without operator action can succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ConnectionError::ConfigurationMissing(_))
    }
}

/// Errors returned by the Lambda handler
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("document store error: {0}")]
    Document(#[from] mongodb::error::Error),

    #[error("key-value store error: {0}")]
    KeyValue(#[from] redis::RedisError),
}
