//! Provisioning errors
//!
//! Validation failures are raised before any remote call. Provisioning
//! failures name the resource that failed and carry the provider's rejection
//! reason unmodified.

use crate::aws::error::find_aws_error;
use stackline_common::{ResourceKind, ValidationError};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisionError {
    /// Contract violation detected locally; nothing was sent
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Provider rejected or failed a creation/update call
    #[error("{kind} '{name}' failed: {reason}")]
    Provisioning {
        kind: ResourceKind,
        name: String,
        /// Provider error code, when the provider sent one
        code: Option<String>,
        /// Provider rejection message, verbatim
        reason: String,
    },

    /// Resource was accepted but did not become ready in time
    #[error("{kind} '{name}' not ready after {waited:?}")]
    Timeout {
        kind: ResourceKind,
        name: String,
        waited: Duration,
    },

    /// Run was cancelled while waiting on a resource
    #[error("cancelled while waiting for {kind} '{name}'")]
    Cancelled { kind: ResourceKind, name: String },
}

impl ProvisionError {
    /// Build a provisioning failure from a provider error.
    ///
    /// SDK failures report the provider's code and message; anything else
    /// reports the root cause.
    pub fn provider(kind: ResourceKind, name: &str, err: &anyhow::Error) -> Self {
        let (code, reason) = match find_aws_error(err) {
            Some(aws) => (aws.code().map(str::to_string), aws.message().to_string()),
            None => (None, err.root_cause().to_string()),
        };
        ProvisionError::Provisioning {
            kind,
            name: name.to_string(),
            code,
            reason,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ProvisionError::Validation(_))
    }

    /// Kind and name of the resource that failed, if the error concerns one
    pub fn resource(&self) -> Option<(ResourceKind, &str)> {
        match self {
            ProvisionError::Provisioning { kind, name, .. }
            | ProvisionError::Timeout { kind, name, .. }
            | ProvisionError::Cancelled { kind, name } => Some((*kind, name)),
            ProvisionError::Validation(_) => None,
        }
    }

    /// Operator suggestion for known provider codes
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            ProvisionError::Provisioning {
                code: Some(code), ..
            } => crate::aws::classify_aws_error(Some(code), None).suggestion(),
            _ => None,
        }
    }
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse JSON configuration
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Failed to read configuration file
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration values out of range
    #[error("Invalid config: {0}")]
    Invalid(#[from] garde::Report),
}

impl ConfigError {
    /// Create an IO error with path context
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
