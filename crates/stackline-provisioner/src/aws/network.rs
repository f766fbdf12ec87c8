//! VPC and subnet discovery
//!
//! Load balancers, target groups and awsvpc services all need a VPC and
//! subnets. When none are configured, the account's default VPC and its
//! default-for-AZ subnets are used.

use crate::aws::context::AwsContext;
use crate::aws::error::AwsError;
use anyhow::{Context, Result, bail};
use aws_sdk_ec2::{Client, types::Filter};
use tracing::{debug, info};

/// Network placement shared by every resource of a deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub vpc_id: String,
    pub subnet_ids: Vec<String>,
    /// Security groups for load balancer and tasks (empty = VPC default)
    pub security_group_ids: Vec<String>,
}

/// EC2 client used only for network lookups
pub struct NetworkClient {
    client: Client,
}

impl NetworkClient {
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ec2_client(),
        }
    }

    /// Resolve placement from explicit subnets, or discover the default VPC.
    pub async fn resolve(
        &self,
        subnet_ids: &[String],
        security_group_ids: &[String],
    ) -> Result<NetworkConfig> {
        let network = if subnet_ids.is_empty() {
            let vpc_id = self.default_vpc().await?;
            let subnet_ids = self.default_subnets(&vpc_id).await?;
            NetworkConfig {
                vpc_id,
                subnet_ids,
                security_group_ids: security_group_ids.to_vec(),
            }
        } else {
            NetworkConfig {
                vpc_id: self.vpc_of_subnet(&subnet_ids[0]).await?,
                subnet_ids: subnet_ids.to_vec(),
                security_group_ids: security_group_ids.to_vec(),
            }
        };

        info!(
            vpc_id = %network.vpc_id,
            subnets = network.subnet_ids.len(),
            "Resolved network placement"
        );
        Ok(network)
    }

    /// Find the account's default VPC in this region
    pub async fn default_vpc(&self) -> Result<String> {
        let response = self
            .client
            .describe_vpcs()
            .filters(Filter::builder().name("is-default").values("true").build())
            .send()
            .await
            .map_err(AwsError::from_sdk)
            .context("Failed to describe VPCs")?;

        let Some(vpc_id) = response.vpcs().first().and_then(|v| v.vpc_id()) else {
            bail!("No default VPC in this region; configure subnet IDs explicitly");
        };
        debug!(vpc_id, "Found default VPC");
        Ok(vpc_id.to_string())
    }

    /// Default-for-AZ subnets of a VPC, sorted for stable ordering
    pub async fn default_subnets(&self, vpc_id: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .describe_subnets()
            .filters(Filter::builder().name("vpc-id").values(vpc_id).build())
            .filters(
                Filter::builder()
                    .name("default-for-az")
                    .values("true")
                    .build(),
            )
            .send()
            .await
            .map_err(AwsError::from_sdk)
            .context("Failed to describe subnets")?;

        let mut subnets: Vec<String> = response
            .subnets()
            .iter()
            .filter_map(|s| s.subnet_id().map(str::to_string))
            .collect();
        subnets.sort();

        if subnets.is_empty() {
            bail!("VPC {vpc_id} has no default subnets; configure subnet IDs explicitly");
        }
        Ok(subnets)
    }

    async fn vpc_of_subnet(&self, subnet_id: &str) -> Result<String> {
        let response = self
            .client
            .describe_subnets()
            .subnet_ids(subnet_id)
            .send()
            .await
            .map_err(AwsError::from_sdk)
            .with_context(|| format!("Failed to describe subnet {subnet_id}"))?;

        response
            .subnets()
            .first()
            .and_then(|s| s.vpc_id())
            .map(str::to_string)
            .with_context(|| format!("Subnet {subnet_id} has no VPC"))
    }
}
