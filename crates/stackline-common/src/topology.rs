//! Declarative topology documents
//!
//! A [`TopologySpec`] names every resource of a deployment and the references
//! between them. References are by name; the provisioner resolves them to
//! provider handles once the referenced resource is ready.

use crate::defaults::{default_desired_count, default_external, default_listener_port};
use crate::error::ValidationError;
use crate::health_check::{HealthCheckPolicy, Protocol};
use crate::resource_kind::ResourceKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How a target group addresses its targets
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
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    /// Targets registered by IP address (required for awsvpc tasks)
    #[default]
    #[strum(serialize = "ip")]
    Ip,
    /// Targets registered by instance ID
    #[strum(serialize = "instance")]
    Instance,
}

/// Compute cluster declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterSpec {
    pub name: String,
}

/// Load balancer declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadBalancerSpec {
    pub name: String,
    /// Request a publicly routable address
    #[serde(default = "default_external")]
    pub external: bool,
}

/// Target group declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetGroupSpec {
    pub name: String,
    /// Port targets receive traffic on
    pub port: u16,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub target_type: TargetType,
    #[serde(default)]
    pub health_check: HealthCheckPolicy,
    /// Name of the owning load balancer
    pub load_balancer: String,
    /// Load balancer port forwarding into this group
    #[serde(default = "default_listener_port")]
    pub listener_port: u16,
}

impl TargetGroupSpec {
    /// Validate the declaration on its own, without looking at other resources.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name(ResourceKind::TargetGroup, &self.name)?;
        if self.port == 0 {
            return Err(ValidationError::InvalidPort {
                kind: ResourceKind::TargetGroup,
                name: self.name.clone(),
                port: self.port,
            });
        }
        if self.listener_port == 0 {
            return Err(ValidationError::InvalidPort {
                kind: ResourceKind::LoadBalancer,
                name: self.load_balancer.clone(),
                port: self.listener_port,
            });
        }
        self.health_check.validate()
    }
}

/// One container of a managed service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerBinding {
    pub container_name: String,
    /// Image to run (e.g. "repo:latest"); pullability is checked by the provider
    pub image_reference: String,
    pub container_port: u16,
}

/// Registration of a service container with a target group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingEntry {
    /// Name of the target group
    pub target_group: String,
    pub container_name: String,
    pub container_port: u16,
}

/// Managed service declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSpec {
    pub name: String,
    /// Name of the cluster the service runs in
    pub cluster: String,
    pub bindings: Vec<ContainerBinding>,
    #[serde(default)]
    pub routing: Vec<RoutingEntry>,
    #[serde(default = "default_desired_count")]
    pub desired_count: u32,
}

impl ServiceSpec {
    /// Validate the declaration on its own, without looking at other resources.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name(ResourceKind::Service, &self.name)?;
        validate_bindings(&self.name, &self.bindings)?;
        validate_routing(&self.name, &self.bindings, &self.routing)
    }
}

/// Check that a service declares at least one container, with unique names
/// and valid ports.
pub fn validate_bindings(
    service: &str,
    bindings: &[ContainerBinding],
) -> Result<(), ValidationError> {
    if bindings.is_empty() {
        return Err(ValidationError::NoContainers {
            service: service.to_string(),
        });
    }

    let mut seen = HashSet::new();
    for binding in bindings {
        if binding.container_port == 0 {
            return Err(ValidationError::InvalidPort {
                kind: ResourceKind::Service,
                name: service.to_string(),
                port: binding.container_port,
            });
        }
        if !seen.insert(binding.container_name.as_str()) {
            return Err(ValidationError::DuplicateContainer {
                service: service.to_string(),
                container_name: binding.container_name.clone(),
            });
        }
    }
    Ok(())
}

/// Check that every routing entry names a declared container on that
/// container's port, and that no entry repeats.
pub fn validate_routing(
    service: &str,
    bindings: &[ContainerBinding],
    routing: &[RoutingEntry],
) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for entry in routing {
        let binding = bindings
            .iter()
            .find(|b| b.container_name == entry.container_name)
            .ok_or_else(|| ValidationError::UnknownContainer {
                service: service.to_string(),
                container_name: entry.container_name.clone(),
            })?;

        if binding.container_port != entry.container_port {
            return Err(ValidationError::PortMismatch {
                service: service.to_string(),
                container_name: entry.container_name.clone(),
                container_port: binding.container_port,
                routed_port: entry.container_port,
            });
        }

        if !seen.insert(entry) {
            return Err(ValidationError::DuplicateRouting {
                service: service.to_string(),
                target_group: entry.target_group.clone(),
                container_name: entry.container_name.clone(),
                container_port: entry.container_port,
            });
        }
    }
    Ok(())
}

/// Reject empty resource names
pub fn require_name(kind: ResourceKind, name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName { kind });
    }
    Ok(())
}

/// A complete deployment: every resource and the references between them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TopologySpec {
    pub clusters: Vec<ClusterSpec>,
    pub load_balancers: Vec<LoadBalancerSpec>,
    pub target_groups: Vec<TargetGroupSpec>,
    pub services: Vec<ServiceSpec>,
}

impl TopologySpec {
    /// Total number of declared resources
    pub fn len(&self) -> usize {
        self.clusters.len() + self.load_balancers.len() + self.target_groups.len() + self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cluster(&self, name: &str) -> Option<&ClusterSpec> {
        self.clusters.iter().find(|c| c.name == name)
    }

    pub fn load_balancer(&self, name: &str) -> Option<&LoadBalancerSpec> {
        self.load_balancers.iter().find(|lb| lb.name == name)
    }

    pub fn target_group(&self, name: &str) -> Option<&TargetGroupSpec> {
        self.target_groups.iter().find(|tg| tg.name == name)
    }

    pub fn service(&self, name: &str) -> Option<&ServiceSpec> {
        self.services.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn web_binding() -> ContainerBinding {
        ContainerBinding {
            container_name: "web".to_string(),
            image_reference: "repo:latest".to_string(),
            container_port: 8080,
        }
    }

    fn route(container: &str, port: u16) -> RoutingEntry {
        RoutingEntry {
            target_group: "tg1".to_string(),
            container_name: container.to_string(),
            container_port: port,
        }
    }

    #[test]
    fn test_matching_routing_accepted() {
        assert!(validate_routing("s1", &[web_binding()], &[route("web", 8080)]).is_ok());
    }

    #[test]
    fn test_unknown_container_rejected() {
        let err = validate_routing("s1", &[web_binding()], &[route("api", 8080)]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownContainer {
                service: "s1".to_string(),
                container_name: "api".to_string()
            }
        );
    }

    #[test]
    fn test_port_mismatch_rejected() {
        let err = validate_routing("s1", &[web_binding()], &[route("web", 9090)]).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::PortMismatch {
                container_port: 8080,
                routed_port: 9090,
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_routing_rejected() {
        let err = validate_routing(
            "s1",
            &[web_binding()],
            &[route("web", 8080), route("web", 8080)],
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateRouting { .. }));
    }

    #[test]
    fn test_bindings_must_be_unique_and_present() {
        assert!(matches!(
            validate_bindings("s1", &[]),
            Err(ValidationError::NoContainers { .. })
        ));
        assert!(matches!(
            validate_bindings("s1", &[web_binding(), web_binding()]),
            Err(ValidationError::DuplicateContainer { .. })
        ));
    }

    #[test]
    fn test_target_group_port_zero_rejected() {
        let tg = TargetGroupSpec {
            name: "tg1".to_string(),
            port: 0,
            protocol: Protocol::Http,
            target_type: TargetType::Ip,
            health_check: HealthCheckPolicy::default(),
            load_balancer: "lb1".to_string(),
            listener_port: 80,
        };
        assert!(matches!(
            tg.validate(),
            Err(ValidationError::InvalidPort { port: 0, .. })
        ));
    }

    #[test]
    fn test_deserialize_topology() {
        let json = r#"{
            "clusters": [{"name": "c1"}],
            "load_balancers": [{"name": "lb1"}],
            "target_groups": [{"name": "tg1", "port": 8080, "load_balancer": "lb1"}],
            "services": [{
                "name": "s1",
                "cluster": "c1",
                "bindings": [{"container_name": "web", "image_reference": "repo:latest", "container_port": 8080}],
                "routing": [{"target_group": "tg1", "container_name": "web", "container_port": 8080}]
            }]
        }"#;
        let topology: TopologySpec = serde_json::from_str(json).unwrap();
        assert_eq!(topology.len(), 4);
        assert!(topology.load_balancer("lb1").unwrap().external);
        let tg = topology.target_group("tg1").unwrap();
        assert_eq!(tg.target_type, TargetType::Ip);
        assert_eq!(tg.listener_port, 80);
        assert_eq!(topology.service("s1").unwrap().desired_count, 2);
        assert!(topology.service("s1").unwrap().validate().is_ok());
    }
}
