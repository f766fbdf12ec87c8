//! Resource dependency graph
//!
//! Resources are nodes keyed by kind and name; an edge `a -> b` means `a`
//! cannot be created until `b` is ready. [`DependencyGraph::tiers`] orders the
//! graph into tiers with Kahn's algorithm: every resource's dependencies sit
//! in strictly earlier tiers, and resources within a tier are independent.

use stackline_common::{ResourceKind, TopologySpec, ValidationError};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A declared resource, identified by kind and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Directed acyclic graph over resource declarations
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// node -> resources it depends on
    edges: BTreeMap<ResourceRef, BTreeSet<ResourceRef>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for a topology, validating every declaration and
    /// reference on the way. Nothing here contacts the provider.
    pub fn from_topology(topology: &TopologySpec) -> Result<Self, ValidationError> {
        let mut graph = Self::new();

        for cluster in &topology.clusters {
            stackline_common::topology::require_name(ResourceKind::Cluster, &cluster.name)?;
            graph.add_resource(ResourceRef::new(ResourceKind::Cluster, &cluster.name))?;
        }
        for lb in &topology.load_balancers {
            stackline_common::topology::require_name(ResourceKind::LoadBalancer, &lb.name)?;
            graph.add_resource(ResourceRef::new(ResourceKind::LoadBalancer, &lb.name))?;
        }
        let mut listeners: BTreeMap<(&str, u16), &str> = BTreeMap::new();
        for tg in &topology.target_groups {
            tg.validate()?;
            graph.add_resource(ResourceRef::new(ResourceKind::TargetGroup, &tg.name))?;
            if let Some(existing) =
                listeners.insert((tg.load_balancer.as_str(), tg.listener_port), tg.name.as_str())
            {
                return Err(ValidationError::DuplicateListener {
                    load_balancer: tg.load_balancer.clone(),
                    port: tg.listener_port,
                    target_group: tg.name.clone(),
                    existing: existing.to_string(),
                });
            }
        }
        for service in &topology.services {
            service.validate()?;
            graph.add_resource(ResourceRef::new(ResourceKind::Service, &service.name))?;
        }

        for tg in &topology.target_groups {
            graph.add_dependency(
                &ResourceRef::new(ResourceKind::TargetGroup, &tg.name),
                ResourceRef::new(ResourceKind::LoadBalancer, &tg.load_balancer),
            )?;
        }
        for service in &topology.services {
            let node = ResourceRef::new(ResourceKind::Service, &service.name);
            graph.add_dependency(
                &node,
                ResourceRef::new(ResourceKind::Cluster, &service.cluster),
            )?;
            for entry in &service.routing {
                graph.add_dependency(
                    &node,
                    ResourceRef::new(ResourceKind::TargetGroup, &entry.target_group),
                )?;
            }
        }

        Ok(graph)
    }

    /// Add a resource with no dependencies yet
    pub fn add_resource(&mut self, node: ResourceRef) -> Result<(), ValidationError> {
        if self.edges.contains_key(&node) {
            return Err(ValidationError::DuplicateResource {
                kind: node.kind,
                name: node.name,
            });
        }
        self.edges.insert(node, BTreeSet::new());
        Ok(())
    }

    /// Record that `node` depends on `dependency`. Both must be declared and
    /// the dependency must be of a kind `node` may depend on.
    pub fn add_dependency(
        &mut self,
        node: &ResourceRef,
        dependency: ResourceRef,
    ) -> Result<(), ValidationError> {
        if !self.edges.contains_key(&dependency) {
            return Err(ValidationError::UnknownReference {
                kind: node.kind,
                name: node.name.clone(),
                target_kind: dependency.kind,
                target: dependency.name,
            });
        }
        if !node.kind.may_depend_on().contains(&dependency.kind) {
            return Err(ValidationError::IllegalDependency {
                kind: node.kind,
                name: node.name.clone(),
                target_kind: dependency.kind,
                target: dependency.name,
            });
        }
        let Some(deps) = self.edges.get_mut(node) else {
            return Err(ValidationError::UnknownReference {
                kind: dependency.kind,
                name: dependency.name,
                target_kind: node.kind,
                target: node.name.clone(),
            });
        };
        deps.insert(dependency);
        Ok(())
    }

    pub fn contains(&self, node: &ResourceRef) -> bool {
        self.edges.contains_key(node)
    }

    /// Direct dependencies of a resource
    pub fn dependencies(&self, node: &ResourceRef) -> impl Iterator<Item = &ResourceRef> {
        self.edges.get(node).into_iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Group resources into creation tiers.
    ///
    /// Tier `n` holds every resource whose dependencies all sit in tiers
    /// `0..n`. Within a tier, resources are sorted by kind then name.
    pub fn tiers(&self) -> Result<Vec<Vec<ResourceRef>>, ValidationError> {
        let mut remaining: BTreeMap<&ResourceRef, usize> = self
            .edges
            .iter()
            .map(|(node, deps)| (node, deps.len()))
            .collect();

        let mut dependents: BTreeMap<&ResourceRef, Vec<&ResourceRef>> = BTreeMap::new();
        for (node, deps) in &self.edges {
            for dep in deps {
                dependents.entry(dep).or_default().push(node);
            }
        }

        let mut tiers = Vec::new();
        let mut ready: Vec<&ResourceRef> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(node, _)| *node)
            .collect();

        while !ready.is_empty() {
            for node in &ready {
                remaining.remove(node);
            }

            let mut next = BTreeSet::new();
            for node in &ready {
                for dependent in dependents.get(node).into_iter().flatten() {
                    if let Some(count) = remaining.get_mut(dependent) {
                        *count -= 1;
                        if *count == 0 {
                            next.insert(*dependent);
                        }
                    }
                }
            }

            tiers.push(ready.into_iter().cloned().collect());
            ready = next.into_iter().collect();
        }

        if !remaining.is_empty() {
            return Err(ValidationError::DependencyCycle {
                resources: remaining.keys().map(|node| node.to_string()).collect(),
            });
        }
        Ok(tiers)
    }

    /// Flattened creation order
    pub fn order(&self) -> Result<Vec<ResourceRef>, ValidationError> {
        Ok(self.tiers()?.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackline_common::{ClusterSpec, LoadBalancerSpec};
    use stackline_test_utils::topology::{scenario_a, scenario_b};

    fn r(kind: ResourceKind, name: &str) -> ResourceRef {
        ResourceRef::new(kind, name)
    }

    #[test]
    fn test_scenario_a_tiers() {
        let graph = DependencyGraph::from_topology(&scenario_a()).unwrap();
        assert_eq!(graph.len(), 4);

        let tiers = graph.tiers().unwrap();
        assert_eq!(
            tiers,
            vec![
                vec![
                    r(ResourceKind::Cluster, "c1"),
                    r(ResourceKind::LoadBalancer, "lb1")
                ],
                vec![r(ResourceKind::TargetGroup, "tg1")],
                vec![r(ResourceKind::Service, "s1")],
            ]
        );

        let deps: Vec<_> = graph
            .dependencies(&r(ResourceKind::Service, "s1"))
            .cloned()
            .collect();
        assert_eq!(
            deps,
            vec![
                r(ResourceKind::Cluster, "c1"),
                r(ResourceKind::TargetGroup, "tg1")
            ]
        );
    }

    #[test]
    fn test_scenario_b_rejected_while_building() {
        let err = DependencyGraph::from_topology(&scenario_b()).unwrap_err();
        assert!(matches!(err, ValidationError::PortMismatch { routed_port: 9090, .. }));
    }

    #[test]
    fn test_unknown_load_balancer_reference() {
        let mut topology = scenario_a();
        topology.target_groups[0].load_balancer = "missing".to_string();

        let err = DependencyGraph::from_topology(&topology).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownReference {
                kind: ResourceKind::TargetGroup,
                name: "tg1".to_string(),
                target_kind: ResourceKind::LoadBalancer,
                target: "missing".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_cluster_reference() {
        let mut topology = scenario_a();
        topology.clusters.clear();
        assert!(matches!(
            DependencyGraph::from_topology(&topology),
            Err(ValidationError::UnknownReference {
                target_kind: ResourceKind::Cluster,
                ..
            })
        ));
    }

    #[test]
    fn test_duplicate_resource() {
        let mut topology = scenario_a();
        topology.load_balancers.push(LoadBalancerSpec {
            name: "lb1".to_string(),
            external: false,
        });
        assert!(matches!(
            DependencyGraph::from_topology(&topology),
            Err(ValidationError::DuplicateResource {
                kind: ResourceKind::LoadBalancer,
                ..
            })
        ));
    }

    #[test]
    fn test_same_name_different_kind_is_fine() {
        let mut topology = scenario_a();
        topology.clusters.push(ClusterSpec {
            name: "lb1".to_string(),
        });
        assert!(DependencyGraph::from_topology(&topology).is_ok());
    }

    #[test]
    fn test_illegal_dependency() {
        let mut graph = DependencyGraph::new();
        let lb = r(ResourceKind::LoadBalancer, "lb1");
        let svc = r(ResourceKind::Service, "s1");
        graph.add_resource(lb.clone()).unwrap();
        graph.add_resource(svc.clone()).unwrap();

        assert!(matches!(
            graph.add_dependency(&svc, lb.clone()),
            Err(ValidationError::IllegalDependency { .. })
        ));
        assert!(matches!(
            graph.add_dependency(&lb, svc),
            Err(ValidationError::IllegalDependency { .. })
        ));
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = DependencyGraph::new();
        let a = r(ResourceKind::TargetGroup, "a");
        let b = r(ResourceKind::TargetGroup, "b");
        let lb = r(ResourceKind::LoadBalancer, "lb1");
        graph.add_resource(lb.clone()).unwrap();
        graph.add_resource(a.clone()).unwrap();
        graph.add_resource(b.clone()).unwrap();
        graph.add_dependency(&a, lb).unwrap();
        // add_dependency never allows same-kind edges; insert directly
        graph.edges.get_mut(&a).unwrap().insert(b.clone());
        graph.edges.get_mut(&b).unwrap().insert(a.clone());

        let err = graph.tiers().unwrap_err();
        assert_eq!(
            err,
            ValidationError::DependencyCycle {
                resources: vec!["target-group/a".to_string(), "target-group/b".to_string()]
            }
        );
    }

    #[test]
    fn test_empty_graph() {
        let graph = DependencyGraph::from_topology(&TopologySpec::default()).unwrap();
        assert!(graph.is_empty());
        assert!(graph.tiers().unwrap().is_empty());
    }

    #[test]
    fn test_order_respects_dependencies() {
        let graph = DependencyGraph::from_topology(&scenario_a()).unwrap();
        let order = graph.order().unwrap();
        for (i, node) in order.iter().enumerate() {
            for dep in graph.dependencies(node) {
                let pos = order.iter().position(|n| n == dep).unwrap();
                assert!(pos < i, "{dep} must come before {node}");
            }
        }
    }
}
