//! Application load balancer, target group and listener management

use crate::aws::context::AwsContext;
use crate::aws::error::AwsError;
use crate::aws::network::NetworkConfig;
use crate::provider::{LoadBalancer, LoadBalancerState, TargetHealth, TargetHealthState};
use anyhow::{Context, Result};
use aws_sdk_elasticloadbalancingv2::{
    Client,
    types::{
        Action, ActionTypeEnum, LoadBalancer as ElbLoadBalancer, LoadBalancerSchemeEnum,
        LoadBalancerStateEnum, LoadBalancerTypeEnum, Matcher, ProtocolEnum, Tag, TargetTypeEnum,
    },
};
use stackline_common::{LoadBalancerSpec, Protocol, TargetGroupSpec, TargetType};
use tracing::{debug, info};

/// ELBv2 client for load balancers and their target groups
pub struct ElbClient {
    client: Client,
}

impl ElbClient {
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.elb_client(),
        }
    }

    /// Create an application load balancer in the given subnets
    pub async fn create_load_balancer(
        &self,
        spec: &LoadBalancerSpec,
        network: &NetworkConfig,
        tags: Vec<Tag>,
    ) -> Result<LoadBalancer> {
        let scheme = if spec.external {
            LoadBalancerSchemeEnum::InternetFacing
        } else {
            LoadBalancerSchemeEnum::Internal
        };

        let response = self
            .client
            .create_load_balancer()
            .name(&spec.name)
            .r#type(LoadBalancerTypeEnum::Application)
            .scheme(scheme)
            .set_subnets(Some(network.subnet_ids.clone()))
            .set_security_groups(if network.security_group_ids.is_empty() {
                None
            } else {
                Some(network.security_group_ids.clone())
            })
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(AwsError::from_sdk)
            .with_context(|| format!("Failed to create load balancer {}", spec.name))?;

        let lb = response
            .load_balancers()
            .first()
            .context("CreateLoadBalancer returned no load balancer")?;
        let handle = load_balancer_handle(&spec.name, lb)?;

        info!(
            load_balancer = %spec.name,
            arn = %handle.arn,
            external = spec.external,
            "Created load balancer"
        );
        Ok(handle)
    }

    /// Read a load balancer's current state and DNS name
    pub async fn describe_load_balancer(&self, arn: &str) -> Result<LoadBalancer> {
        let response = self
            .client
            .describe_load_balancers()
            .load_balancer_arns(arn)
            .send()
            .await
            .map_err(AwsError::from_sdk)
            .with_context(|| format!("Failed to describe load balancer {arn}"))?;

        let lb = response
            .load_balancers()
            .first()
            .with_context(|| format!("Load balancer {arn} not found"))?;
        let name = lb.load_balancer_name().unwrap_or_default().to_string();
        let handle = load_balancer_handle(&name, lb)?;

        debug!(arn, state = %handle.state, "Described load balancer");
        Ok(handle)
    }

    /// Create a target group with its health check attached
    pub async fn create_target_group(
        &self,
        spec: &TargetGroupSpec,
        vpc_id: &str,
        tags: Vec<Tag>,
    ) -> Result<String> {
        let policy = &spec.health_check;
        let response = self
            .client
            .create_target_group()
            .name(&spec.name)
            .protocol(protocol(spec.protocol))
            .port(i32::from(spec.port))
            .vpc_id(vpc_id)
            .target_type(match spec.target_type {
                TargetType::Ip => TargetTypeEnum::Ip,
                TargetType::Instance => TargetTypeEnum::Instance,
            })
            .health_check_enabled(true)
            .health_check_path(&policy.path)
            .health_check_protocol(protocol(policy.protocol))
            .health_check_interval_seconds(seconds(policy.interval_seconds)?)
            .health_check_timeout_seconds(seconds(policy.timeout_seconds)?)
            .healthy_threshold_count(seconds(policy.healthy_threshold)?)
            .unhealthy_threshold_count(seconds(policy.unhealthy_threshold)?)
            .matcher(Matcher::builder().http_code(&policy.success_matcher).build())
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(AwsError::from_sdk)
            .with_context(|| format!("Failed to create target group {}", spec.name))?;

        let arn = response
            .target_groups()
            .first()
            .and_then(|tg| tg.target_group_arn())
            .context("CreateTargetGroup returned no target group ARN")?;

        info!(target_group = %spec.name, arn, port = spec.port, "Created target group");
        Ok(arn.to_string())
    }

    /// Create a listener on the load balancer forwarding to a target group
    pub async fn create_listener(
        &self,
        load_balancer_arn: &str,
        target_group_arn: &str,
        port: u16,
        tags: Vec<Tag>,
    ) -> Result<String> {
        let forward = Action::builder()
            .r#type(ActionTypeEnum::Forward)
            .target_group_arn(target_group_arn)
            .build();

        let response = self
            .client
            .create_listener()
            .load_balancer_arn(load_balancer_arn)
            .protocol(ProtocolEnum::Http)
            .port(i32::from(port))
            .default_actions(forward)
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(AwsError::from_sdk)
            .with_context(|| format!("Failed to create listener on port {port}"))?;

        let arn = response
            .listeners()
            .first()
            .and_then(|l| l.listener_arn())
            .context("CreateListener returned no listener ARN")?;

        info!(listener = %arn, port, target_group = %target_group_arn, "Created listener");
        Ok(arn.to_string())
    }

    /// Per-target health as reported by the load balancer
    pub async fn describe_target_health(&self, target_group_arn: &str) -> Result<Vec<TargetHealth>> {
        let response = self
            .client
            .describe_target_health()
            .target_group_arn(target_group_arn)
            .send()
            .await
            .map_err(AwsError::from_sdk)
            .with_context(|| format!("Failed to describe target health of {target_group_arn}"))?;

        let targets = response
            .target_health_descriptions()
            .iter()
            .map(|desc| {
                let target = desc.target();
                let health = desc.target_health();
                TargetHealth {
                    target_id: target
                        .and_then(|t| t.id())
                        .map(str::to_string)
                        .unwrap_or_default(),
                    port: target
                        .and_then(|t| t.port())
                        .and_then(|p| u16::try_from(p).ok()),
                    state: health
                        .and_then(|h| h.state())
                        .map(|s| TargetHealthState::from_provider(s.as_str()))
                        .unwrap_or_else(|| TargetHealthState::Other("unknown".to_string())),
                    reason: health
                        .and_then(|h| h.reason())
                        .map(|r| r.as_str().to_string()),
                    description: health
                        .and_then(|h| h.description())
                        .map(str::to_string),
                }
            })
            .collect();

        Ok(targets)
    }
}

/// ELBv2 resource tags from key/value pairs
pub fn elb_tags(pairs: &[(&'static str, String)]) -> Result<Vec<Tag>> {
    pairs
        .iter()
        .map(|(key, value)| {
            Ok(Tag::builder().key(*key).value(value).build())
        })
        .collect()
}

fn load_balancer_handle(name: &str, lb: &ElbLoadBalancer) -> Result<LoadBalancer> {
    let arn = lb
        .load_balancer_arn()
        .context("Load balancer has no ARN")?
        .to_string();
    let state = match lb.state() {
        Some(state) => match state.code() {
            Some(LoadBalancerStateEnum::Active) => LoadBalancerState::Active,
            Some(LoadBalancerStateEnum::ActiveImpaired) => LoadBalancerState::ActiveImpaired,
            Some(LoadBalancerStateEnum::Provisioning) => LoadBalancerState::Provisioning,
            Some(LoadBalancerStateEnum::Failed) => LoadBalancerState::Failed {
                reason: state.reason().map(str::to_string),
            },
            Some(other) => LoadBalancerState::Unknown(other.as_str().to_string()),
            None => LoadBalancerState::Provisioning,
        },
        None => LoadBalancerState::Provisioning,
    };

    Ok(LoadBalancer {
        name: name.to_string(),
        arn,
        dns_name: lb.dns_name().unwrap_or_default().to_string(),
        external: lb.scheme() == Some(&LoadBalancerSchemeEnum::InternetFacing),
        state,
    })
}

fn protocol(protocol: Protocol) -> ProtocolEnum {
    match protocol {
        Protocol::Http => ProtocolEnum::Http,
        Protocol::Https => ProtocolEnum::Https,
    }
}

fn seconds(value: u32) -> Result<i32> {
    i32::try_from(value).with_context(|| format!("value {value} is out of range"))
}
