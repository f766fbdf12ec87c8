//! Local validation errors
//!
//! Every variant is detectable without contacting the provider. They are
//! raised before any remote call and are never retried.

use crate::resource_kind::ResourceKind;
use crate::state::ResourceState;
use thiserror::Error;

/// Locally detected contract violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Health check would time out no sooner than the next probe starts
    #[error(
        "health check timeout ({timeout_seconds}s) must be less than its interval ({interval_seconds}s)"
    )]
    TimeoutNotBelowInterval {
        timeout_seconds: u32,
        interval_seconds: u32,
    },

    /// Healthy/unhealthy threshold is zero
    #[error("{threshold} threshold must be at least 1, got {value}")]
    ThresholdTooLow { threshold: &'static str, value: u32 },

    /// Port outside 1..=65535
    #[error("{kind} '{name}' has invalid port {port}")]
    InvalidPort {
        kind: ResourceKind,
        name: String,
        port: u16,
    },

    /// Resource declared without a name
    #[error("{kind} name cannot be empty")]
    EmptyName { kind: ResourceKind },

    /// Service declared without containers
    #[error("service '{service}' declares no containers")]
    NoContainers { service: String },

    /// Two containers in the same service share a name
    #[error("service '{service}' declares container '{container_name}' more than once")]
    DuplicateContainer {
        service: String,
        container_name: String,
    },

    /// Routing entry names a container the service does not declare
    #[error("service '{service}' routes to unknown container '{container_name}'")]
    UnknownContainer {
        service: String,
        container_name: String,
    },

    /// Routing entry port differs from the container's port
    #[error(
        "service '{service}' routes to container '{container_name}' on port {routed_port}, but the container listens on {container_port}"
    )]
    PortMismatch {
        service: String,
        container_name: String,
        container_port: u16,
        routed_port: u16,
    },

    /// Same routing entry listed twice
    #[error("service '{service}' routes ({target_group}, {container_name}, {container_port}) twice")]
    DuplicateRouting {
        service: String,
        target_group: String,
        container_name: String,
        container_port: u16,
    },

    /// Two resources of the same kind share a name
    #[error("{kind} '{name}' is declared more than once")]
    DuplicateResource { kind: ResourceKind, name: String },

    /// Two target groups want a listener on the same load-balancer port
    #[error(
        "target-group '{target_group}' needs listener port {port} on load-balancer '{load_balancer}', already used by target-group '{existing}'"
    )]
    DuplicateListener {
        load_balancer: String,
        port: u16,
        target_group: String,
        existing: String,
    },

    /// Declaration refers to a resource that is not declared
    #[error("{kind} '{name}' references undeclared {target_kind} '{target}'")]
    UnknownReference {
        kind: ResourceKind,
        name: String,
        target_kind: ResourceKind,
        target: String,
    },

    /// Declaration refers to a resource kind it cannot depend on
    #[error("{kind} '{name}' cannot depend on {target_kind} '{target}'")]
    IllegalDependency {
        kind: ResourceKind,
        name: String,
        target_kind: ResourceKind,
        target: String,
    },

    /// Dependency graph contains a cycle
    #[error("dependency cycle between: {}", resources.join(", "))]
    DependencyCycle { resources: Vec<String> },

    /// Creation requested before a dependency reached `Ready`
    #[error("{kind} '{name}' depends on {dependency_kind} '{dependency}', which is {state}")]
    DependencyNotReady {
        kind: ResourceKind,
        name: String,
        dependency_kind: ResourceKind,
        dependency: String,
        state: ResourceState,
    },

    /// Resource was used before it reached `Ready`
    #[error("{kind} '{name}' is {state}, not ready")]
    NotReady {
        kind: ResourceKind,
        name: String,
        state: ResourceState,
    },

    /// Creation already failed in this run; not resubmitted
    #[error("{kind} '{name}' already failed in this run and will not be resubmitted")]
    AlreadyFailed { kind: ResourceKind, name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ValidationError::TimeoutNotBelowInterval {
                timeout_seconds: 30,
                interval_seconds: 30
            }
            .to_string(),
            "health check timeout (30s) must be less than its interval (30s)"
        );
        assert_eq!(
            ValidationError::ThresholdTooLow {
                threshold: "healthy",
                value: 0
            }
            .to_string(),
            "healthy threshold must be at least 1, got 0"
        );
        assert_eq!(
            ValidationError::EmptyName {
                kind: ResourceKind::Cluster
            }
            .to_string(),
            "cluster name cannot be empty"
        );
    }

    #[test]
    fn test_dependency_not_ready_display() {
        let err = ValidationError::DependencyNotReady {
            kind: ResourceKind::TargetGroup,
            name: "tg1".to_string(),
            dependency_kind: ResourceKind::LoadBalancer,
            dependency: "lb1".to_string(),
            state: ResourceState::Declared,
        };
        assert_eq!(
            err.to_string(),
            "target-group 'tg1' depends on load-balancer 'lb1', which is declared"
        );
    }

    #[test]
    fn test_duplicate_listener_display() {
        let err = ValidationError::DuplicateListener {
            load_balancer: "lb1".to_string(),
            port: 80,
            target_group: "tg2".to_string(),
            existing: "tg1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "target-group 'tg2' needs listener port 80 on load-balancer 'lb1', already used by target-group 'tg1'"
        );
    }

    #[test]
    fn test_cycle_display() {
        let err = ValidationError::DependencyCycle {
            resources: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "dependency cycle between: a, b");
    }
}
