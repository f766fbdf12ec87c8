//! [`Provider`] backed by ECS and ELBv2

use crate::aws::context::AwsContext;
use crate::aws::ecs::{EcsClient, TaskSettings, ecs_tags};
use crate::aws::elb::{ElbClient, elb_tags};
use crate::aws::network::{NetworkClient, NetworkConfig};
use crate::provider::{
    ComputeCluster, LoadBalancer, ManagedService, Provider, ServiceRequest, TargetGroup,
    TargetHealth,
};
use anyhow::Result;
use stackline_common::tags::standard_tags;
use stackline_common::{LoadBalancerSpec, TargetGroupSpec};

/// AWS implementation of the provider seam.
///
/// Network placement is resolved once at construction; every resource of the
/// deployment shares it.
pub struct AwsProvider {
    ecs: EcsClient,
    elb: ElbClient,
    network: NetworkConfig,
    task: TaskSettings,
    deployment_id: String,
}

impl AwsProvider {
    /// Build clients from a loaded context and resolve network placement.
    ///
    /// Empty `subnet_ids` means "discover the default VPC".
    pub async fn new(
        ctx: &AwsContext,
        subnet_ids: &[String],
        security_group_ids: &[String],
        task: TaskSettings,
        deployment_id: impl Into<String>,
    ) -> Result<Self> {
        let network = NetworkClient::from_context(ctx)
            .resolve(subnet_ids, security_group_ids)
            .await?;
        Ok(Self::with_network(ctx, network, task, deployment_id))
    }

    /// Build clients with already-resolved placement
    pub fn with_network(
        ctx: &AwsContext,
        network: NetworkConfig,
        task: TaskSettings,
        deployment_id: impl Into<String>,
    ) -> Self {
        Self {
            ecs: EcsClient::from_context(ctx),
            elb: ElbClient::from_context(ctx),
            network,
            task,
            deployment_id: deployment_id.into(),
        }
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn deployment_id(&self) -> &str {
        &self.deployment_id
    }

    fn tags(&self) -> Vec<(&'static str, String)> {
        standard_tags(&self.deployment_id)
    }
}

impl Provider for AwsProvider {
    async fn find_cluster(&self, name: &str) -> Result<Option<ComputeCluster>> {
        self.ecs.find_cluster(name).await
    }

    async fn create_cluster(&self, name: &str) -> Result<ComputeCluster> {
        self.ecs.create_cluster(name, ecs_tags(&self.tags())).await
    }

    async fn create_load_balancer(&self, spec: LoadBalancerSpec) -> Result<LoadBalancer> {
        self.elb
            .create_load_balancer(&spec, &self.network, elb_tags(&self.tags())?)
            .await
    }

    async fn describe_load_balancer(&self, arn: &str) -> Result<LoadBalancer> {
        self.elb.describe_load_balancer(arn).await
    }

    async fn create_target_group(
        &self,
        spec: TargetGroupSpec,
        load_balancer_arn: &str,
    ) -> Result<TargetGroup> {
        let arn = self
            .elb
            .create_target_group(&spec, &self.network.vpc_id, elb_tags(&self.tags())?)
            .await?;
        let listener_arn = self
            .elb
            .create_listener(
                load_balancer_arn,
                &arn,
                spec.listener_port,
                elb_tags(&self.tags())?,
            )
            .await?;

        Ok(TargetGroup {
            name: spec.name,
            arn,
            port: spec.port,
            health_check: spec.health_check,
            load_balancer_arn: load_balancer_arn.to_string(),
            listener_arn,
        })
    }

    async fn create_service(&self, request: ServiceRequest) -> Result<ManagedService> {
        let task_definition_arn = self
            .ecs
            .register_task_definition(
                &request.name,
                &request.bindings,
                &self.task,
                ecs_tags(&self.tags()),
            )
            .await?;
        self.ecs
            .create_service(
                &request,
                &task_definition_arn,
                &self.network,
                &self.task,
                ecs_tags(&self.tags()),
            )
            .await
    }

    async fn update_desired_count(
        &self,
        cluster_arn: &str,
        service_name: &str,
        desired_count: u32,
    ) -> Result<()> {
        self.ecs
            .update_desired_count(cluster_arn, service_name, desired_count)
            .await
    }

    async fn describe_target_health(&self, target_group_arn: &str) -> Result<Vec<TargetHealth>> {
        self.elb.describe_target_health(target_group_arn).await
    }
}
