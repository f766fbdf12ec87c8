//! Region-scoped SDK configuration for one deployment
//!
//! Every AWS call a deployment makes (cluster and service on ECS, the load
//! balancer and target groups on ELBv2, subnet discovery on EC2) runs in the
//! deployment's region. `AwsContext` loads that configuration once and the
//! stackline clients are built from it.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use std::sync::Arc;

/// SDK configuration for the region a deployment targets.
///
/// Cloning shares the loaded configuration.
///
/// ```ignore
/// let ctx = AwsContext::new(&deployment.region).await;
/// let provider = AwsProvider::new(&ctx, &subnets, &groups, task, deployment_id).await?;
/// let scaler = EcsClient::from_context(&ctx);
/// ```
#[derive(Clone)]
pub struct AwsContext {
    config: Arc<SdkConfig>,
    region: String,
}

impl AwsContext {
    /// Load configuration for `region`. Credentials resolve through the
    /// SDK's default chain; a missing credential only surfaces on the first
    /// call.
    pub async fn new(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Self {
            config: Arc::new(config),
            region: region.to_string(),
        }
    }

    pub fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Clusters, task definitions and services
    pub fn ecs_client(&self) -> aws_sdk_ecs::Client {
        aws_sdk_ecs::Client::new(self.sdk_config())
    }

    /// Load balancers, target groups and listeners
    pub fn elb_client(&self) -> aws_sdk_elasticloadbalancingv2::Client {
        aws_sdk_elasticloadbalancingv2::Client::new(self.sdk_config())
    }

    /// Default VPC and subnet lookup
    pub fn ec2_client(&self) -> aws_sdk_ec2::Client {
        aws_sdk_ec2::Client::new(self.sdk_config())
    }
}

impl std::fmt::Debug for AwsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsContext")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}
