//! Delivery and configuration errors
//!
//! [`DeliveryError`] never leaves the shipper: it is handed to the diagnostic
//! sink and the event is dropped.

use aws_sdk_cloudwatchlogs::error::{DisplayErrorContext, ProvideErrorMetadata};
use thiserror::Error;

/// Known CloudWatch Logs error codes for throttling
const THROTTLING_CODES: &[&str] = &["ThrottlingException", "Throttling", "LimitExceededException"];

/// Known CloudWatch Logs error codes for a missing log group or stream
const NOT_FOUND_CODES: &[&str] = &["ResourceNotFoundException"];

/// Why a log event (or batch) was not delivered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Log store is rate limiting this stream
    #[error("log store throttled the submission: {message}")]
    Throttled { message: String },

    /// Log group or stream does not exist
    #[error("log destination not found: {message}")]
    DestinationNotFound { message: String },

    /// Log store rejected the submission
    #[error("log store rejected the submission: {message}")]
    Rejected {
        code: Option<String>,
        message: String,
    },

    /// Log store accepted the call but dropped some events
    #[error(
        "log store dropped events (too new from {too_new_start:?}, too old until {too_old_end:?}, expired until {expired_end:?})"
    )]
    PartiallyRejected {
        too_new_start: Option<i32>,
        too_old_end: Option<i32>,
        expired_end: Option<i32>,
    },

    /// Event could not be encoded for the log store
    #[error("invalid log event: {0}")]
    InvalidEvent(String),

    /// Log store panicked while handling the submission
    #[error("log store panicked: {message}")]
    StorePanicked { message: String },

    /// Background worker is no longer running
    #[error("log shipper worker has stopped")]
    WorkerStopped,
}

impl DeliveryError {
    /// Classify an SDK error by its error code, keeping the raw message.
    pub fn from_sdk<E>(err: E) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error,
    {
        let code = err.code().map(str::to_string);
        let message = err
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

        match code.as_deref() {
            Some(c) if THROTTLING_CODES.contains(&c) => DeliveryError::Throttled { message },
            Some(c) if NOT_FOUND_CODES.contains(&c) => {
                DeliveryError::DestinationNotFound { message }
            }
            _ => DeliveryError::Rejected { code, message },
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
