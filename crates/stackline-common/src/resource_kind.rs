//! Resource kinds and creation ordering
//!
//! Provides a consistent creation tier across the dependency graph and the
//! provisioner. Resources must be created in dependency order: a target group
//! cannot attach to a load balancer that does not exist yet.

/// Types of resources declared in a topology
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::AsRefStr,
)]
pub enum ResourceKind {
    /// Compute cluster (no dependencies)
    #[strum(serialize = "cluster")]
    Cluster,
    /// Load balancer (no dependencies)
    #[strum(serialize = "load-balancer")]
    LoadBalancer,
    /// Target group (attaches to a load balancer)
    #[strum(serialize = "target-group")]
    TargetGroup,
    /// Managed service (runs in a cluster, registers with target groups)
    #[strum(serialize = "service")]
    Service,
}

impl ResourceKind {
    /// Get creation tier (lower number = create first)
    ///
    /// - 0: Clusters and load balancers (independent of each other)
    /// - 1: Target groups (need their load balancer)
    /// - 2: Services (need their cluster and every routed target group)
    pub fn creation_tier(self) -> u8 {
        match self {
            ResourceKind::Cluster => 0,
            ResourceKind::LoadBalancer => 0,
            ResourceKind::TargetGroup => 1,
            ResourceKind::Service => 2,
        }
    }

    /// Kinds this kind may depend on
    pub fn may_depend_on(self) -> &'static [ResourceKind] {
        match self {
            ResourceKind::Cluster | ResourceKind::LoadBalancer => &[],
            ResourceKind::TargetGroup => &[ResourceKind::LoadBalancer],
            ResourceKind::Service => &[ResourceKind::Cluster, ResourceKind::TargetGroup],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependencies_are_in_earlier_tiers() {
        for kind in [
            ResourceKind::Cluster,
            ResourceKind::LoadBalancer,
            ResourceKind::TargetGroup,
            ResourceKind::Service,
        ] {
            for dep in kind.may_depend_on() {
                assert!(
                    dep.creation_tier() < kind.creation_tier(),
                    "{dep} must be created before {kind}"
                );
            }
        }
    }

    #[test]
    fn test_independent_roots() {
        assert_eq!(
            ResourceKind::Cluster.creation_tier(),
            ResourceKind::LoadBalancer.creation_tier()
        );
        assert!(ResourceKind::Cluster.may_depend_on().is_empty());
        assert!(ResourceKind::LoadBalancer.may_depend_on().is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(ResourceKind::TargetGroup.to_string(), "target-group");
        assert_eq!(ResourceKind::Service.as_ref(), "service");
    }
}
