//! Health-check policy attached to target groups
//!
//! The provider runs the probes and decides target health. The only contract
//! on this side is to never attach a policy whose parameters contradict each
//! other. A policy is immutable once attached; changing it means replacing
//! the target group.

use crate::defaults::{
    DEFAULT_HEALTH_CHECK_INTERVAL, DEFAULT_HEALTH_CHECK_MATCHER, DEFAULT_HEALTH_CHECK_PATH,
    DEFAULT_HEALTH_CHECK_TIMEOUT, DEFAULT_HEALTHY_THRESHOLD, DEFAULT_UNHEALTHY_THRESHOLD,
};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Application-layer protocol for listeners, target groups and probes
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    #[default]
    #[strum(serialize = "HTTP")]
    Http,
    #[strum(serialize = "HTTPS")]
    Https,
}

/// How the provider probes targets and judges their health
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthCheckPolicy {
    /// Request path probed on each target
    pub path: String,
    /// Probe protocol
    pub protocol: Protocol,
    /// HTTP codes counted as success (e.g. "200" or "200-299")
    pub success_matcher: String,
    /// Seconds between probes
    pub interval_seconds: u32,
    /// Seconds without a response before a probe fails
    pub timeout_seconds: u32,
    /// Consecutive successes before an unhealthy target becomes healthy
    pub healthy_threshold: u32,
    /// Consecutive failures before a healthy target becomes unhealthy
    pub unhealthy_threshold: u32,
}

impl Default for HealthCheckPolicy {
    fn default() -> Self {
        Self {
            path: DEFAULT_HEALTH_CHECK_PATH.to_string(),
            protocol: Protocol::Http,
            success_matcher: DEFAULT_HEALTH_CHECK_MATCHER.to_string(),
            interval_seconds: DEFAULT_HEALTH_CHECK_INTERVAL,
            timeout_seconds: DEFAULT_HEALTH_CHECK_TIMEOUT,
            healthy_threshold: DEFAULT_HEALTHY_THRESHOLD,
            unhealthy_threshold: DEFAULT_UNHEALTHY_THRESHOLD,
        }
    }
}

impl HealthCheckPolicy {
    /// Check internal consistency of the policy.
    ///
    /// Requires `timeout_seconds < interval_seconds` and both thresholds ≥ 1.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout_seconds >= self.interval_seconds {
            return Err(ValidationError::TimeoutNotBelowInterval {
                timeout_seconds: self.timeout_seconds,
                interval_seconds: self.interval_seconds,
            });
        }
        if self.healthy_threshold < 1 {
            return Err(ValidationError::ThresholdTooLow {
                threshold: "healthy",
                value: self.healthy_threshold,
            });
        }
        if self.unhealthy_threshold < 1 {
            return Err(ValidationError::ThresholdTooLow {
                threshold: "unhealthy",
                value: self.unhealthy_threshold,
            });
        }
        Ok(())
    }
}
