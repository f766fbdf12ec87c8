//! Canonical topologies for provisioner tests
//!
//! Scenario A is the reference deployment: one cluster, one public load
//! balancer, one target group on 8080 and a two-replica web service routed
//! through it. Scenario B breaks only the routing port.

use stackline_common::{
    ClusterSpec, ContainerBinding, HealthCheckPolicy, LoadBalancerSpec, Protocol, RoutingEntry,
    ServiceSpec, TargetGroupSpec, TargetType, TopologySpec,
};

/// Policy `{path "/", matcher "200", interval 30, timeout 5, healthy 3, unhealthy 3}`
pub fn web_health_check() -> HealthCheckPolicy {
    HealthCheckPolicy {
        path: "/".to_string(),
        protocol: Protocol::Http,
        success_matcher: "200".to_string(),
        interval_seconds: 30,
        timeout_seconds: 5,
        healthy_threshold: 3,
        unhealthy_threshold: 3,
    }
}

/// `{web, repo:latest, 8080}`
pub fn web_binding() -> ContainerBinding {
    ContainerBinding {
        container_name: "web".to_string(),
        image_reference: "repo:latest".to_string(),
        container_port: 8080,
    }
}

/// Scenario A: `c1`, `lb1`, `tg1` and `s1` fully wired
pub fn scenario_a() -> TopologySpec {
    scenario_with_routed_port(8080)
}

/// Scenario B: as A, but `s1` routes to port 9090 which no container listens on
pub fn scenario_b() -> TopologySpec {
    scenario_with_routed_port(9090)
}

fn scenario_with_routed_port(port: u16) -> TopologySpec {
    TopologySpec {
        clusters: vec![ClusterSpec {
            name: "c1".to_string(),
        }],
        load_balancers: vec![LoadBalancerSpec {
            name: "lb1".to_string(),
            external: true,
        }],
        target_groups: vec![TargetGroupSpec {
            name: "tg1".to_string(),
            port: 8080,
            protocol: Protocol::Http,
            target_type: TargetType::Ip,
            health_check: web_health_check(),
            load_balancer: "lb1".to_string(),
            listener_port: 80,
        }],
        services: vec![ServiceSpec {
            name: "s1".to_string(),
            cluster: "c1".to_string(),
            bindings: vec![web_binding()],
            routing: vec![RoutingEntry {
                target_group: "tg1".to_string(),
                container_name: "web".to_string(),
                container_port: port,
            }],
            desired_count: 2,
        }],
    }
}
