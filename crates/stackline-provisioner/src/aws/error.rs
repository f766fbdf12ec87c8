//! AWS error classification
//!
//! SDK errors are converted to [`AwsError`] at the client boundary using the
//! `.code()` of `ProvideErrorMetadata`. Every variant keeps the provider's raw
//! code and message so a failed resource can be reported verbatim.

use aws_sdk_ecs::error::{DisplayErrorContext, ProvideErrorMetadata};
use thiserror::Error;

/// AWS error categories
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AwsError {
    /// Referenced resource does not exist
    #[error("{code}: {message}")]
    NotFound { code: String, message: String },

    /// A resource with the same name already exists
    #[error("{code}: {message}")]
    AlreadyExists { code: String, message: String },

    /// Rate limit exceeded
    #[error("{code}: {message}")]
    Throttled { code: String, message: String },

    /// Account or resource quota reached
    #[error("{code}: {message}")]
    QuotaExceeded { code: String, message: String },

    /// Request was well-formed but the provider refused the configuration
    #[error("{code}: {message}")]
    InvalidRequest { code: String, message: String },

    /// Any other SDK error, with the code when the provider sent one
    #[error("{}", match code { Some(c) => format!("{c}: {message}"), None => message.clone() })]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    /// Convert an SDK error, keeping the provider's code and message.
    pub fn from_sdk<E>(err: E) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error,
    {
        let message = err
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
        classify_aws_error(err.code(), Some(&message))
    }

    /// Raw provider error code, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            AwsError::NotFound { code, .. }
            | AwsError::AlreadyExists { code, .. }
            | AwsError::Throttled { code, .. }
            | AwsError::QuotaExceeded { code, .. }
            | AwsError::InvalidRequest { code, .. } => Some(code),
            AwsError::Sdk { code, .. } => code.as_deref(),
        }
    }

    /// Raw provider message
    pub fn message(&self) -> &str {
        match self {
            AwsError::NotFound { message, .. }
            | AwsError::AlreadyExists { message, .. }
            | AwsError::Throttled { message, .. }
            | AwsError::QuotaExceeded { message, .. }
            | AwsError::InvalidRequest { message, .. }
            | AwsError::Sdk { message, .. } => message,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, AwsError::AlreadyExists { .. })
    }

    /// Get a user-friendly suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<&'static str> {
        self.code().and_then(suggestion_for_code)
    }
}

/// Known ECS/ELBv2/EC2 error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &[
    "ClusterNotFoundException",
    "ServiceNotFoundException",
    "LoadBalancerNotFound",
    "TargetGroupNotFound",
    "ListenerNotFound",
    "InvalidVpcID.NotFound",
    "InvalidSubnetID.NotFound",
];

/// Known error codes for "already exists" conditions
const ALREADY_EXISTS_CODES: &[&str] = &[
    "DuplicateLoadBalancerName",
    "DuplicateTargetGroupName",
    "DuplicateListener",
    "ResourceAlreadyExistsException",
];

/// Known error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
];

/// Known error codes for exhausted quotas
const QUOTA_CODES: &[&str] = &[
    "TooManyLoadBalancers",
    "TooManyTargetGroups",
    "TooManyListeners",
    "TooManyTags",
    "LimitExceededException",
];

/// Known error codes for configurations the provider refuses
const INVALID_REQUEST_CODES: &[&str] = &[
    "InvalidConfigurationRequest",
    "InvalidParameterException",
    "ClientException",
    "ValidationError",
    "IncompatibleProtocols",
    "InvalidSubnet",
    "InvalidScheme",
];

/// Classify an AWS SDK error using the error code.
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("Unknown error").to_string();

    let Some(c) = code else {
        return AwsError::Sdk {
            code: None,
            message,
        };
    };
    let code = c.to_string();

    if NOT_FOUND_CODES.contains(&c) {
        AwsError::NotFound { code, message }
    } else if ALREADY_EXISTS_CODES.contains(&c) {
        AwsError::AlreadyExists { code, message }
    } else if THROTTLING_CODES.contains(&c) {
        AwsError::Throttled { code, message }
    } else if QUOTA_CODES.contains(&c) {
        AwsError::QuotaExceeded { code, message }
    } else if INVALID_REQUEST_CODES.contains(&c) {
        AwsError::InvalidRequest { code, message }
    } else {
        AwsError::Sdk {
            code: Some(code),
            message,
        }
    }
}

/// Find the [`AwsError`] in an anyhow error chain, if the failure came from the SDK.
pub fn find_aws_error(error: &anyhow::Error) -> Option<&AwsError> {
    error.chain().find_map(|cause| cause.downcast_ref::<AwsError>())
}

/// Error code to user-friendly suggestion mapping
const SUGGESTIONS: &[(&str, &str)] = &[
    (
        "TooManyLoadBalancers",
        "Delete unused load balancers or request a limit increase via the Service Quotas console.",
    ),
    (
        "TooManyTargetGroups",
        "Delete unused target groups or request a limit increase via the Service Quotas console.",
    ),
    (
        "TooManyListeners",
        "The load balancer already has the maximum number of listeners.",
    ),
    (
        "DuplicateLoadBalancerName",
        "A load balancer with this name exists with a different configuration. Pick another name.",
    ),
    (
        "DuplicateTargetGroupName",
        "A target group with this name exists with a different configuration. Pick another name.",
    ),
    (
        "DuplicateListener",
        "The load balancer already has a listener on this port.",
    ),
    (
        "InvalidSubnet",
        "Public load balancers need subnets in at least two availability zones.",
    ),
    (
        "ClientException",
        "Check the image reference and that the execution role can pull it.",
    ),
    (
        "Throttling",
        "AWS API rate limit hit. Wait and re-run.",
    ),
    (
        "ThrottlingException",
        "AWS API rate limit hit. Wait and re-run.",
    ),
    (
        "RequestLimitExceeded",
        "AWS API rate limit hit. Wait and re-run.",
    ),
];

fn suggestion_for_code(code: &str) -> Option<&'static str> {
    SUGGESTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| *s)
}
