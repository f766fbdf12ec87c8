//! Single-service deployment configuration
//!
//! A [`DeployConfig`] describes the common case of one cluster, one load
//! balancer, one target group and one service. [`DeployConfig::topology`]
//! expands it into a [`TopologySpec`] for the provisioner; the remaining
//! fields configure the AWS provider.

use crate::aws::TaskSettings;
use crate::error::ConfigError;
use garde::Validate;
use serde::{Deserialize, Serialize};
use stackline_common::defaults::{
    default_cluster_name, default_container_name, default_container_port, default_desired_count,
    default_external, default_listener_port, default_load_balancer_name, default_region,
    default_service_name, default_target_group_name, default_task_cpu, default_task_memory,
};
use stackline_common::{
    ClusterSpec, ContainerBinding, HealthCheckPolicy, LoadBalancerSpec, Protocol, RoutingEntry,
    ServiceSpec, TargetGroupSpec, TargetType, TopologySpec,
};
use std::path::Path;

/// Upper bound on replicas accepted from configuration
pub const MAX_DESIRED_COUNT: u32 = 1_000;

/// Deployment of one load-balanced container service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct DeployConfig {
    /// AWS region to deploy into
    #[serde(default = "default_region")]
    #[garde(length(min = 1))]
    pub region: String,

    /// Container image, e.g. `<account>.dkr.ecr.<region>.amazonaws.com/app:latest`
    #[garde(length(min = 1))]
    pub image_reference: String,

    #[serde(default = "default_cluster_name")]
    #[garde(length(min = 1, max = 255))]
    pub cluster_name: String,

    /// Load balancer name (ELB limits these to 32 characters)
    #[serde(default = "default_load_balancer_name")]
    #[garde(length(min = 1, max = 32))]
    pub load_balancer_name: String,

    /// Target group name (ELB limits these to 32 characters)
    #[serde(default = "default_target_group_name")]
    #[garde(length(min = 1, max = 32))]
    pub target_group_name: String,

    #[serde(default = "default_service_name")]
    #[garde(length(min = 1, max = 255))]
    pub service_name: String,

    #[serde(default = "default_container_name")]
    #[garde(length(min = 1, max = 255))]
    pub container_name: String,

    /// Port the container listens on, also the target group port
    #[serde(default = "default_container_port")]
    #[garde(range(min = 1))]
    pub container_port: u16,

    /// Port the load balancer accepts traffic on
    #[serde(default = "default_listener_port")]
    #[garde(range(min = 1))]
    pub listener_port: u16,

    /// Number of service replicas
    #[serde(default = "default_desired_count")]
    #[garde(range(max = MAX_DESIRED_COUNT))]
    pub desired_count: u32,

    /// Whether the load balancer gets a public address
    #[serde(default = "default_external")]
    #[garde(skip)]
    pub external: bool,

    #[serde(default)]
    #[garde(skip)]
    pub target_type: TargetType,

    #[serde(default)]
    #[garde(skip)]
    pub health_check: HealthCheckPolicy,

    /// Fargate task CPU units
    #[serde(default = "default_task_cpu")]
    #[garde(length(min = 1))]
    pub task_cpu: String,

    /// Fargate task memory (MiB)
    #[serde(default = "default_task_memory")]
    #[garde(length(min = 1))]
    pub task_memory: String,

    /// Role the ECS agent uses to pull images and write logs
    #[serde(default)]
    #[garde(skip)]
    pub execution_role_arn: Option<String>,

    /// Subnets for the load balancer and tasks (empty = default VPC)
    #[serde(default)]
    #[garde(skip)]
    pub subnet_ids: Vec<String>,

    #[serde(default)]
    #[garde(skip)]
    pub security_group_ids: Vec<String>,

    /// Give tasks a public IP (needed to pull images without a NAT)
    #[serde(default = "default_assign_public_ip")]
    #[garde(skip)]
    pub assign_public_ip: bool,
}

fn default_assign_public_ip() -> bool {
    true
}

impl DeployConfig {
    /// Defaults for everything except the image
    pub fn new(image_reference: impl Into<String>) -> Self {
        Self {
            region: default_region(),
            image_reference: image_reference.into(),
            cluster_name: default_cluster_name(),
            load_balancer_name: default_load_balancer_name(),
            target_group_name: default_target_group_name(),
            service_name: default_service_name(),
            container_name: default_container_name(),
            container_port: default_container_port(),
            listener_port: default_listener_port(),
            desired_count: default_desired_count(),
            external: default_external(),
            target_type: TargetType::default(),
            health_check: HealthCheckPolicy::default(),
            task_cpu: default_task_cpu(),
            task_memory: default_task_memory(),
            execution_role_arn: None,
            subnet_ids: Vec::new(),
            security_group_ids: Vec::new(),
            assign_public_ip: default_assign_public_ip(),
        }
    }

    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.check()?;
        Ok(config)
    }

    /// Validate field ranges, e.g. after applying command-line overrides
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;
        Ok(())
    }

    /// Read, parse and validate a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        Self::from_json(&json)
    }

    /// Fargate task settings for the provider
    pub fn task_settings(&self) -> TaskSettings {
        TaskSettings {
            cpu: self.task_cpu.clone(),
            memory: self.task_memory.clone(),
            execution_role_arn: self.execution_role_arn.clone(),
            assign_public_ip: self.assign_public_ip,
        }
    }

    /// Expand into a four-resource topology
    pub fn topology(&self) -> TopologySpec {
        TopologySpec {
            clusters: vec![ClusterSpec {
                name: self.cluster_name.clone(),
            }],
            load_balancers: vec![LoadBalancerSpec {
                name: self.load_balancer_name.clone(),
                external: self.external,
            }],
            target_groups: vec![TargetGroupSpec {
                name: self.target_group_name.clone(),
                port: self.container_port,
                protocol: Protocol::Http,
                target_type: self.target_type,
                health_check: self.health_check.clone(),
                load_balancer: self.load_balancer_name.clone(),
                listener_port: self.listener_port,
            }],
            services: vec![ServiceSpec {
                name: self.service_name.clone(),
                cluster: self.cluster_name.clone(),
                bindings: vec![ContainerBinding {
                    container_name: self.container_name.clone(),
                    image_reference: self.image_reference.clone(),
                    container_port: self.container_port,
                }],
                routing: vec![RoutingEntry {
                    target_group: self.target_group_name.clone(),
                    container_name: self.container_name.clone(),
                    container_port: self.container_port,
                }],
                desired_count: self.desired_count,
            }],
        }
    }
}
