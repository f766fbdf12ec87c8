//! stackline-common - Shared topology types
//!
//! This crate provides the declarations shared by the provisioner and the
//! log shipper, without any AWS SDK dependencies to keep it lightweight.
//!
//! ## Modules
//!
//! - [`defaults`]: Default configuration values
//! - [`error`]: Local validation errors, raised before any remote call
//! - [`health_check`]: Health-check policy attached to target groups
//! - [`resource_kind`]: Resource kinds and their creation ordering
//! - [`state`]: Per-resource provisioning lifecycle
//! - [`tags`]: Resource tag constants for discovery
//! - [`topology`]: Declarative topology documents

pub mod defaults;
pub mod error;
pub mod health_check;
pub mod resource_kind;
pub mod state;
pub mod tags;
pub mod topology;

// Re-export commonly used types
pub use error::ValidationError;
pub use health_check::{HealthCheckPolicy, Protocol};
pub use resource_kind::ResourceKind;
pub use state::ResourceState;
pub use topology::{
    ClusterSpec, ContainerBinding, LoadBalancerSpec, RoutingEntry, ServiceSpec, TargetGroupSpec,
    TargetType, TopologySpec,
};

/// Get the current timestamp in milliseconds since UNIX epoch.
///
/// Returns 0 if system time is before the epoch (should never happen in practice).
#[inline]
pub fn timestamp_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
