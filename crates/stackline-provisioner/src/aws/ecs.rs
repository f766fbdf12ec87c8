//! ECS cluster, task definition and service management

use crate::aws::context::AwsContext;
use crate::aws::error::AwsError;
use crate::aws::network::NetworkConfig;
use crate::provider::{ComputeCluster, ManagedService, ServiceRequest};
use anyhow::{Context, Result};
use aws_sdk_ecs::{
    Client,
    types::{
        AssignPublicIp, AwsVpcConfiguration, Compatibility, ContainerDefinition, LaunchType,
        LoadBalancer as EcsLoadBalancer, NetworkConfiguration, NetworkMode, PortMapping, Tag,
        TransportProtocol,
    },
};
use stackline_common::ContainerBinding;
use tracing::{debug, info};

/// Fargate task sizing and permissions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSettings {
    /// CPU units (e.g. "256")
    pub cpu: String,
    /// Memory in MiB (e.g. "512")
    pub memory: String,
    /// Role ECS uses to pull the image and write logs
    pub execution_role_arn: Option<String>,
    /// Give tasks a public IP (needed to pull from public registries without NAT)
    pub assign_public_ip: bool,
}

/// ECS client for clusters and services
pub struct EcsClient {
    client: Client,
}

impl EcsClient {
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ecs_client(),
        }
    }

    /// Look up a cluster by name. ECS reports unknown names as failures,
    /// not errors, so a missing cluster is `Ok(None)`.
    pub async fn find_cluster(&self, name: &str) -> Result<Option<ComputeCluster>> {
        let response = self
            .client
            .describe_clusters()
            .clusters(name)
            .send()
            .await
            .map_err(AwsError::from_sdk)
            .with_context(|| format!("Failed to describe cluster {name}"))?;

        let cluster = response
            .clusters()
            .iter()
            .find(|c| c.cluster_name() == Some(name))
            .map(|c| ComputeCluster {
                name: name.to_string(),
                arn: c.cluster_arn().unwrap_or_default().to_string(),
                status: c.status().unwrap_or_default().to_string(),
            });

        debug!(cluster = %name, found = cluster.is_some(), "Looked up cluster");
        Ok(cluster)
    }

    /// Create a cluster
    pub async fn create_cluster(&self, name: &str, tags: Vec<Tag>) -> Result<ComputeCluster> {
        let response = self
            .client
            .create_cluster()
            .cluster_name(name)
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(AwsError::from_sdk)
            .with_context(|| format!("Failed to create cluster {name}"))?;

        let cluster = response
            .cluster()
            .context("CreateCluster returned no cluster")?;
        let arn = cluster
            .cluster_arn()
            .context("CreateCluster returned no cluster ARN")?;

        info!(cluster = %name, arn, "Created cluster");
        Ok(ComputeCluster {
            name: name.to_string(),
            arn: arn.to_string(),
            status: cluster.status().unwrap_or("ACTIVE").to_string(),
        })
    }

    /// Register a Fargate task definition for the service's containers.
    ///
    /// The family is the service name, so re-registering adds a revision.
    pub async fn register_task_definition(
        &self,
        family: &str,
        bindings: &[ContainerBinding],
        settings: &TaskSettings,
        tags: Vec<Tag>,
    ) -> Result<String> {
        let containers = bindings.iter().map(container_definition).collect();

        let response = self
            .client
            .register_task_definition()
            .family(family)
            .network_mode(NetworkMode::Awsvpc)
            .requires_compatibilities(Compatibility::Fargate)
            .cpu(&settings.cpu)
            .memory(&settings.memory)
            .set_execution_role_arn(settings.execution_role_arn.clone())
            .set_container_definitions(Some(containers))
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(AwsError::from_sdk)
            .with_context(|| format!("Failed to register task definition {family}"))?;

        let arn = response
            .task_definition()
            .and_then(|td| td.task_definition_arn())
            .context("RegisterTaskDefinition returned no ARN")?;

        debug!(family, arn, "Registered task definition");
        Ok(arn.to_string())
    }

    /// Create a Fargate service registered with its target groups
    pub async fn create_service(
        &self,
        request: &ServiceRequest,
        task_definition_arn: &str,
        network: &NetworkConfig,
        settings: &TaskSettings,
        tags: Vec<Tag>,
    ) -> Result<ManagedService> {
        let vpc = AwsVpcConfiguration::builder()
            .set_subnets(Some(network.subnet_ids.clone()))
            .set_security_groups(if network.security_group_ids.is_empty() {
                None
            } else {
                Some(network.security_group_ids.clone())
            })
            .assign_public_ip(if settings.assign_public_ip {
                AssignPublicIp::Enabled
            } else {
                AssignPublicIp::Disabled
            })
            .build()
            .context("Invalid awsvpc configuration")?;

        let load_balancers = request
            .routes
            .iter()
            .map(|route| {
                EcsLoadBalancer::builder()
                    .target_group_arn(&route.target_group_arn)
                    .container_name(&route.container_name)
                    .container_port(i32::from(route.container_port))
                    .build()
            })
            .collect();

        let response = self
            .client
            .create_service()
            .cluster(&request.cluster_arn)
            .service_name(&request.name)
            .task_definition(task_definition_arn)
            .desired_count(replicas(request.desired_count)?)
            .launch_type(LaunchType::Fargate)
            .set_load_balancers(Some(load_balancers))
            .network_configuration(
                NetworkConfiguration::builder()
                    .awsvpc_configuration(vpc)
                    .build(),
            )
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(AwsError::from_sdk)
            .with_context(|| format!("Failed to create service {}", request.name))?;

        let arn = response
            .service()
            .and_then(|s| s.service_arn())
            .context("CreateService returned no service ARN")?;

        info!(
            service = %request.name,
            arn,
            desired_count = request.desired_count,
            "Created service"
        );
        Ok(ManagedService {
            name: request.name.clone(),
            arn: arn.to_string(),
            cluster_arn: request.cluster_arn.clone(),
            task_definition_arn: task_definition_arn.to_string(),
            desired_count: request.desired_count,
        })
    }

    /// Change a service's desired replica count
    pub async fn update_desired_count(
        &self,
        cluster_arn: &str,
        service_name: &str,
        desired_count: u32,
    ) -> Result<()> {
        self.client
            .update_service()
            .cluster(cluster_arn)
            .service(service_name)
            .desired_count(replicas(desired_count)?)
            .send()
            .await
            .map_err(AwsError::from_sdk)
            .with_context(|| format!("Failed to scale service {service_name}"))?;

        info!(service = %service_name, desired_count, "Updated desired count");
        Ok(())
    }
}

/// ECS resource tags from key/value pairs
pub fn ecs_tags(pairs: &[(&'static str, String)]) -> Vec<Tag> {
    pairs
        .iter()
        .map(|(key, value)| Tag::builder().key(*key).value(value).build())
        .collect()
}

fn container_definition(binding: &ContainerBinding) -> ContainerDefinition {
    ContainerDefinition::builder()
        .name(&binding.container_name)
        .image(&binding.image_reference)
        .essential(true)
        .port_mappings(
            PortMapping::builder()
                .container_port(i32::from(binding.container_port))
                .protocol(TransportProtocol::Tcp)
                .build(),
        )
        .build()
}

fn replicas(desired_count: u32) -> Result<i32> {
    i32::try_from(desired_count)
        .with_context(|| format!("desired count {desired_count} is out of range"))
}
