//! Materializer configuration
//!
//! Defaults are safe for production. Values can be overridden from the
//! environment with `MaterializeConfig::from_env`.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Environment variable holding the include depth ceiling
pub const MAX_DEPTH_ENV: &str = "ELIF_MATERIALIZE_MAX_DEPTH";

/// Environment variable holding the unknown relation policy
pub const UNKNOWN_RELATIONS_ENV: &str = "ELIF_MATERIALIZE_UNKNOWN_RELATIONS";

/// What to do when an include names a relation the model does not declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownRelationPolicy {
    /// Ignore the directive
    #[default]
    Skip,
    /// Ignore the directive and log a warning
    Warn,
    /// Fail the whole materialization
    Error,
}

impl FromStr for UnknownRelationPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(ConfigError::InvalidValue {
                field: "unknown_relations".to_string(),
                value: s.to_string(),
                expected: "one of: skip, warn, error".to_string(),
            }),
        }
    }
}

/// Configuration for materialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterializeConfig {
    /// Maximum nesting of included relations
    pub max_depth: usize,
    /// Handling of include directives that name undeclared relations
    pub unknown_relations: UnknownRelationPolicy,
    /// Use a relation's default scope for includes that carry no scope
    pub apply_default_scopes: bool,
}

impl Default for MaterializeConfig {
    fn default() -> Self {
        Self {
            max_depth: 32,
            unknown_relations: UnknownRelationPolicy::Skip,
            apply_default_scopes: false,
        }
    }
}

impl MaterializeConfig {
    /// Set the include depth ceiling
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the unknown relation policy
    pub fn with_unknown_relations(mut self, policy: UnknownRelationPolicy) -> Self {
        self.unknown_relations = policy;
        self
    }

    /// Opt in to relation default scopes for unscoped includes
    pub fn with_default_scopes(mut self, apply: bool) -> Self {
        self.apply_default_scopes = apply;
        self
    }

    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(depth_str) = env::var(MAX_DEPTH_ENV) {
            config.max_depth = depth_str.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "max_depth".to_string(),
                value: depth_str.clone(),
                expected: "a positive integer".to_string(),
            })?;
        }

        if let Ok(policy_str) = env::var(UNKNOWN_RELATIONS_ENV) {
            config.unknown_relations = policy_str.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_depth".to_string(),
                value: self.max_depth.to_string(),
                expected: "a positive integer".to_string(),
            });
        }

        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: '{value}', expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
}
