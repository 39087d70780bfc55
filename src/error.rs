//! Error types for mapping configuration and execution

use thiserror::Error;

/// Errors that can occur while configuring or running mappings
#[derive(Error, Debug)]
pub enum MappingError {
    /// Malformed fluent-API usage
    #[error("{0}")]
    Configuration(String),

    /// No mapping registered for the requested key pair
    #[error(
        "Could not find mapping with a source of {source_key} and a destination of {destination_key}"
    )]
    Lookup {
        source_key: String,
        destination_key: String,
    },

    /// Synchronous mapping requested for a mapping that needs the asynchronous engine
    #[error(
        "Impossible to use asynchronous mapping using the synchronous map call; use the asynchronous call instead."
    )]
    Mode,

    /// Structural mismatch reported by the validator
    #[error("{0}")]
    Validation(String),

    /// An asynchronous transformation step reported a failure
    #[error("Transformation of '{property}' failed: {reason}")]
    Transformation { property: String, reason: String },

    /// Nested class mapping went deeper than the configured limit
    #[error("Mapping '{key}' exceeded the maximum nesting depth of {depth}")]
    MaxDepthExceeded { key: String, depth: usize },

    /// The asynchronous engine finished without delivering a result
    #[error("Asynchronous mapping completed without delivering a result")]
    CompletionLost,

    /// JSON conversion error
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MappingError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn lookup(source_key: impl Into<String>, destination_key: impl Into<String>) -> Self {
        Self::Lookup {
            source_key: source_key.into(),
            destination_key: destination_key.into(),
        }
    }
}

/// Result type for mapping operations
pub type MappingResult<T> = Result<T, MappingError>;
