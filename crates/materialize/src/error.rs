//! Error types for the materialization layer
//!
//! Configuration problems (unknown models, unresolvable relation targets,
//! runaway include nesting) are fatal and returned to the caller as-is.
//! Malformed input covers data that is neither a row nor a list of rows.

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for materialization operations
pub type MaterializeResult<T> = Result<T, MaterializeError>;

/// Error types for materialization
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// Model or relation is misconfigured
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Materializer configuration failed validation
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Model name is not known to the registry or connector
    #[error("Unknown model '{0}'")]
    UnknownModel(String),

    /// Include nesting went past the configured ceiling
    #[error("Include depth {depth} exceeds the configured maximum of {max}")]
    DepthExceeded { depth: usize, max: usize },

    /// Include names a relation the model does not declare (strict policy only)
    #[error("Model '{model}' has no relation named '{relation}'")]
    UnknownRelation { model: String, relation: String },

    /// Input data has the wrong shape
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Connector failed to normalize a row
    #[error("Connector error: {0}")]
    Connector(String),

    /// Model factory failed to construct an instance
    #[error("Factory error: {0}")]
    Factory(String),

    /// Filter or row (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MaterializeError {
    /// Create a configuration error
    pub fn configuration<T: ToString>(msg: T) -> Self {
        Self::Configuration(msg.to_string())
    }

    /// Create a malformed input error
    pub fn malformed<T: ToString>(msg: T) -> Self {
        Self::MalformedInput(msg.to_string())
    }

    /// True for the fatal configuration family of errors
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::Config(_)
                | Self::UnknownModel(_)
                | Self::DepthExceeded { .. }
                | Self::UnknownRelation { .. }
        )
    }

    /// True when the caller handed in data of the wrong shape
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, Self::MalformedInput(_))
    }
}
