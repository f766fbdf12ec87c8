//! Provider seam between the provisioner and a cloud API
//!
//! The [`Provider`] trait is the only place the provisioner touches the
//! remote system. Handles returned from it carry opaque provider identifiers
//! (ARNs) and are what dependent resources are created against.

use anyhow::Result;
use stackline_common::{ContainerBinding, HealthCheckPolicy, LoadBalancerSpec, TargetGroupSpec};

/// Created compute cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeCluster {
    pub name: String,
    pub arn: String,
    /// Provider status when last read (e.g. "ACTIVE")
    pub status: String,
}

impl ComputeCluster {
    /// Statuses under which an existing cluster is adopted instead of created
    pub const REUSABLE_STATUSES: &'static [&'static str] = &["ACTIVE", "PROVISIONING"];

    /// Statuses under which the name is free to be created again
    pub const RETIRED_STATUSES: &'static [&'static str] = &["INACTIVE"];

    pub fn is_reusable(&self) -> bool {
        Self::REUSABLE_STATUSES.contains(&self.status.as_str())
    }

    pub fn is_retired(&self) -> bool {
        Self::RETIRED_STATUSES.contains(&self.status.as_str())
    }
}

/// Provider-reported load balancer state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadBalancerState {
    Provisioning,
    Active,
    ActiveImpaired,
    Failed { reason: Option<String> },
    Unknown(String),
}

impl std::fmt::Display for LoadBalancerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provisioning => f.write_str("provisioning"),
            Self::Active => f.write_str("active"),
            Self::ActiveImpaired => f.write_str("active_impaired"),
            Self::Failed { reason: Some(reason) } => write!(f, "failed ({reason})"),
            Self::Failed { reason: None } => f.write_str("failed"),
            Self::Unknown(state) => f.write_str(state),
        }
    }
}

impl LoadBalancerState {
    /// Serving traffic (possibly degraded)
    pub fn is_serving(&self) -> bool {
        matches!(self, Self::Active | Self::ActiveImpaired)
    }
}

/// Created load balancer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancer {
    pub name: String,
    pub arn: String,
    /// Provider-assigned DNS name; read-only
    pub dns_name: String,
    pub external: bool,
    pub state: LoadBalancerState,
}

/// Created target group, attached to its load balancer through a listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetGroup {
    pub name: String,
    pub arn: String,
    pub port: u16,
    pub health_check: HealthCheckPolicy,
    pub load_balancer_arn: String,
    pub listener_arn: String,
}

/// Registration of one service container with a created target group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRoute {
    pub target_group_arn: String,
    pub container_name: String,
    pub container_port: u16,
}

/// Everything needed to create a managed service once its dependencies exist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRequest {
    pub name: String,
    pub cluster_arn: String,
    pub bindings: Vec<ContainerBinding>,
    pub routes: Vec<ServiceRoute>,
    pub desired_count: u32,
}

/// Created managed service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedService {
    pub name: String,
    pub arn: String,
    pub cluster_arn: String,
    pub task_definition_arn: String,
    pub desired_count: u32,
}

/// Provider-reported health of one registered target
#[derive(Debug, Clone, PartialEq, Eq, strum::EnumString, strum::AsRefStr)]
pub enum TargetHealthState {
    #[strum(serialize = "initial")]
    Initial,
    #[strum(serialize = "healthy")]
    Healthy,
    #[strum(serialize = "unhealthy")]
    Unhealthy,
    #[strum(serialize = "draining")]
    Draining,
    #[strum(serialize = "unused")]
    Unused,
    #[strum(serialize = "unavailable")]
    Unavailable,
    /// State this build does not know, kept verbatim
    #[strum(default)]
    Other(String),
}

impl TargetHealthState {
    /// Map the provider's state string, keeping unknown values as-is
    pub fn from_provider(state: &str) -> Self {
        match state.parse() {
            Ok(known) => known,
            Err(_) => Self::Other(state.to_string()),
        }
    }
}

impl std::fmt::Display for TargetHealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Other(state) => f.write_str(state),
            known => f.write_str(known.as_ref()),
        }
    }
}

/// One target as the provider sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetHealth {
    pub target_id: String,
    pub port: Option<u16>,
    pub state: TargetHealthState,
    /// Provider's reason code, verbatim
    pub reason: Option<String>,
    pub description: Option<String>,
}

/// Remote operations the provisioner needs.
///
/// Note: parameters are owned where mockall needs them to be.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait Provider: Send + Sync {
    /// Look up a cluster by name, in any status
    async fn find_cluster(&self, name: &str) -> Result<Option<ComputeCluster>>;

    /// Create a cluster
    async fn create_cluster(&self, name: &str) -> Result<ComputeCluster>;

    /// Create a load balancer
    async fn create_load_balancer(&self, spec: LoadBalancerSpec) -> Result<LoadBalancer>;

    /// Read the current state and address of a load balancer
    async fn describe_load_balancer(&self, arn: &str) -> Result<LoadBalancer>;

    /// Create a target group and the listener forwarding to it
    async fn create_target_group(
        &self,
        spec: TargetGroupSpec,
        load_balancer_arn: &str,
    ) -> Result<TargetGroup>;

    /// Register the service's task definition and create the service
    async fn create_service(&self, request: ServiceRequest) -> Result<ManagedService>;

    /// Change a service's replica count
    async fn update_desired_count(
        &self,
        cluster_arn: &str,
        service_name: &str,
        desired_count: u32,
    ) -> Result<()>;

    /// Per-target health of a target group
    async fn describe_target_health(&self, target_group_arn: &str) -> Result<Vec<TargetHealth>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(status: &str) -> ComputeCluster {
        ComputeCluster {
            name: "c1".to_string(),
            arn: "arn:aws:ecs:us-east-2:123456789012:cluster/c1".to_string(),
            status: status.to_string(),
        }
    }

    #[test]
    fn test_cluster_status_classes() {
        assert!(cluster("ACTIVE").is_reusable());
        assert!(cluster("PROVISIONING").is_reusable());
        assert!(cluster("INACTIVE").is_retired());
        for status in ["DEPROVISIONING", "FAILED"] {
            assert!(!cluster(status).is_reusable());
            assert!(!cluster(status).is_retired());
        }
    }

    #[test]
    fn test_target_health_state_kept_verbatim() {
        assert_eq!(
            TargetHealthState::from_provider("healthy"),
            TargetHealthState::Healthy
        );
        let other = TargetHealthState::from_provider("warming");
        assert_eq!(other, TargetHealthState::Other("warming".to_string()));
        assert_eq!(other.to_string(), "warming");
        assert_eq!(TargetHealthState::Draining.to_string(), "draining");
    }

    #[test]
    fn test_load_balancer_serving_states() {
        assert!(LoadBalancerState::Active.is_serving());
        assert!(LoadBalancerState::ActiveImpaired.is_serving());
        assert!(!LoadBalancerState::Provisioning.is_serving());
        assert!(!LoadBalancerState::Failed { reason: None }.is_serving());
    }
}
