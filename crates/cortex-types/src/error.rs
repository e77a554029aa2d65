//! Error types for the cortex cognitive architecture.

use thiserror::Error;

/// Error kinds a caller of the cognitive core can observe.
///
/// Backend- and algorithm-local failures are captured by the engine that owns
/// them and only escalate here when the engine itself cannot make progress
/// (see `ReasoningExhausted`).
#[derive(Error, Debug)]
pub enum CortexError {
    /// IO related errors
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Lifecycle misuse: a call made outside its required state.
    #[error("Lifecycle violation: {0}")]
    LifecycleViolation(String),

    /// Invalid or empty caller input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A pluggable backend failed locally; callers only see this if no
    /// backend produced a usable result (see `ReasoningExhausted`).
    #[error("Backend failure: {0}")]
    BackendFailure(String),

    /// All selected reasoning backends failed; nothing to synthesize.
    #[error("Reasoning exhausted: no backend produced a result")]
    ReasoningExhausted,

    /// Caller cancelled the operation via its cancellation token.
    #[error("Operation cancelled")]
    Cancelled,

    /// The per-call deadline elapsed before completion.
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// A bounded resource could not accept more entries.
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// Lookup by id or key found nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Lock acquisition errors
    #[error("Lock error: {0}")]
    LockError(String),

    /// Generic error with custom message
    #[error("Error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for CortexError {
    fn from(error: serde_json::Error) -> Self {
        CortexError::Serialization {
            source: Box::new(error),
        }
    }
}

impl From<toml::de::Error> for CortexError {
    fn from(error: toml::de::Error) -> Self {
        CortexError::ConfigError(format!("failed to parse config: {}", error))
    }
}

impl From<toml::ser::Error> for CortexError {
    fn from(error: toml::ser::Error) -> Self {
        CortexError::ConfigError(format!("failed to serialize config: {}", error))
    }
}

impl From<std::num::ParseIntError> for CortexError {
    fn from(error: std::num::ParseIntError) -> Self {
        CortexError::InvalidInput(format!("failed to parse integer: {}", error))
    }
}

impl From<std::num::ParseFloatError> for CortexError {
    fn from(error: std::num::ParseFloatError) -> Self {
        CortexError::InvalidInput(format!("failed to parse float: {}", error))
    }
}

impl From<anyhow::Error> for CortexError {
    fn from(error: anyhow::Error) -> Self {
        CortexError::Other(format!("{}", error))
    }
}

/// Result type used throughout the cortex workspace.
pub type Result<T> = std::result::Result<T, CortexError>;
