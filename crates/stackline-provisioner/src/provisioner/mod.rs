//! Dependency-ordered provisioning
//!
//! [`Provisioner`] creates resources through a [`Provider`] and records each
//! one in a [`ResourceLedger`]. Every operation validates locally first: a
//! malformed declaration or a dependency that is not `Ready` is a
//! [`ValidationError`] and never reaches the provider. Remote failures are
//! terminal for the resource and are not retried; resources created before a
//! failure are left in place.

use crate::error::ProvisionError;
use crate::graph::{DependencyGraph, ResourceRef};
use crate::ledger::{ResourceLedger, ResourceRecord, Tracked};
use crate::provider::{
    ComputeCluster, LoadBalancer, LoadBalancerState, ManagedService, Provider, ServiceRequest,
    ServiceRoute, TargetGroup, TargetHealth,
};
use crate::wait::{WaitConfig, WaitOutcome, wait_until};
use chrono::{DateTime, Utc};
use stackline_common::defaults::default_listener_port;
use stackline_common::topology::require_name;
use stackline_common::{
    ContainerBinding, HealthCheckPolicy, LoadBalancerSpec, Protocol, ResourceKind, ResourceState,
    RoutingEntry, ServiceSpec, TargetGroupSpec, TargetType, TopologySpec, ValidationError,
};
use std::collections::BTreeMap;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};


/// Outcome of a full topology run
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Every resource touched by the run
    pub resources: Vec<ResourceRecord>,
    /// Public address of each external load balancer, by name
    pub addresses: BTreeMap<String, String>,
}

impl ProvisionReport {
    /// Address of the only external load balancer, when there is exactly one
    pub fn address(&self) -> Option<&str> {
        match self.addresses.len() {
            1 => self.addresses.values().next().map(String::as_str),
            _ => None,
        }
    }
}

/// Creates resources in dependency order against a provider
pub struct Provisioner<P> {
    provider: P,
    ledger: ResourceLedger,
    wait: WaitConfig,
    cancel: CancellationToken,
}

impl<P: Provider> Provisioner<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            ledger: ResourceLedger::new(),
            wait: WaitConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Override how long to wait for load balancers to become active
    pub fn with_wait_config(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    /// Stop waiting when `cancel` fires. In-flight creation calls still complete.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    /// Lifecycle state of a resource in this run
    pub fn state(&self, kind: ResourceKind, name: &str) -> ResourceState {
        self.ledger.state(kind, name)
    }

    /// Create a cluster, or adopt an existing one with the same name.
    ///
    /// An existing cluster that is neither reusable nor retired is reported
    /// as a provisioning failure.
    pub async fn create_cluster(&self, name: &str) -> Result<ComputeCluster, ProvisionError> {
        require_name(ResourceKind::Cluster, name)?;

        self.submit(name, async {
            let existing = self
                .provider
                .find_cluster(name)
                .await
                .map_err(|e| ProvisionError::provider(ResourceKind::Cluster, name, &e))?;

            match existing {
                Some(cluster) if cluster.is_reusable() => {
                    info!(cluster = %name, status = %cluster.status, "Adopting existing cluster");
                    Ok(cluster)
                }
                Some(cluster) if !cluster.is_retired() => Err(ProvisionError::Provisioning {
                    kind: ResourceKind::Cluster,
                    name: name.to_string(),
                    code: None,
                    reason: format!(
                        "cluster {} already exists with status {}",
                        cluster.arn, cluster.status
                    ),
                }),
                _ => self
                    .provider
                    .create_cluster(name)
                    .await
                    .map_err(|e| ProvisionError::provider(ResourceKind::Cluster, name, &e)),
            }
        })
        .await
    }

    /// Create a load balancer; `external` requests a public address.
    pub async fn create_load_balancer(
        &self,
        name: &str,
        external: bool,
    ) -> Result<LoadBalancer, ProvisionError> {
        self.create_load_balancer_from(&LoadBalancerSpec {
            name: name.to_string(),
            external,
        })
        .await
    }

    pub async fn create_load_balancer_from(
        &self,
        spec: &LoadBalancerSpec,
    ) -> Result<LoadBalancer, ProvisionError> {
        require_name(ResourceKind::LoadBalancer, &spec.name)?;

        self.submit(&spec.name, async {
            self.provider
                .create_load_balancer(spec.clone())
                .await
                .map_err(|e| ProvisionError::provider(ResourceKind::LoadBalancer, &spec.name, &e))
        })
        .await
    }

    /// Create a target group attached to `load_balancer`.
    ///
    /// The health-check policy is validated before anything is sent, and the
    /// load balancer must be `Ready` in this run. Targets are addressed by IP
    /// and the listener uses the default port, which no other target group on
    /// the same load balancer may already hold.
    pub async fn create_target_group(
        &self,
        name: &str,
        port: u16,
        protocol: Protocol,
        health_check: HealthCheckPolicy,
        load_balancer: &LoadBalancer,
    ) -> Result<TargetGroup, ProvisionError> {
        let spec = TargetGroupSpec {
            name: name.to_string(),
            port,
            protocol,
            target_type: TargetType::default(),
            health_check,
            load_balancer: load_balancer.name.clone(),
            listener_port: default_listener_port(),
        };
        self.create_target_group_from(&spec, load_balancer).await
    }

    pub async fn create_target_group_from(
        &self,
        spec: &TargetGroupSpec,
        load_balancer: &LoadBalancer,
    ) -> Result<TargetGroup, ProvisionError> {
        spec.validate()?;
        if spec.load_balancer != load_balancer.name {
            return Err(ValidationError::UnknownReference {
                kind: ResourceKind::TargetGroup,
                name: spec.name.clone(),
                target_kind: ResourceKind::LoadBalancer,
                target: spec.load_balancer.clone(),
            }
            .into());
        }
        let lb: LoadBalancer =
            self.require_ready(ResourceKind::TargetGroup, &spec.name, &load_balancer.name)?;
        self.ledger
            .claim_listener(&lb.name, spec.listener_port, &spec.name)?;

        self.submit(&spec.name, async {
            self.provider
                .create_target_group(spec.clone(), &lb.arn)
                .await
                .map_err(|e| ProvisionError::provider(ResourceKind::TargetGroup, &spec.name, &e))
        })
        .await
    }

    /// Create a service in `cluster`, registered with the routed target groups.
    ///
    /// Routing is checked against the bindings first; the cluster and every
    /// routed target group must be `Ready` in this run.
    pub async fn create_managed_service(
        &self,
        name: &str,
        cluster: &ComputeCluster,
        bindings: &[ContainerBinding],
        routing: &[RoutingEntry],
        desired_count: u32,
    ) -> Result<ManagedService, ProvisionError> {
        let spec = ServiceSpec {
            name: name.to_string(),
            cluster: cluster.name.clone(),
            bindings: bindings.to_vec(),
            routing: routing.to_vec(),
            desired_count,
        };
        self.create_managed_service_from(&spec, cluster).await
    }

    pub async fn create_managed_service_from(
        &self,
        spec: &ServiceSpec,
        cluster: &ComputeCluster,
    ) -> Result<ManagedService, ProvisionError> {
        spec.validate()?;
        if spec.cluster != cluster.name {
            return Err(ValidationError::UnknownReference {
                kind: ResourceKind::Service,
                name: spec.name.clone(),
                target_kind: ResourceKind::Cluster,
                target: spec.cluster.clone(),
            }
            .into());
        }
        let cluster: ComputeCluster =
            self.require_ready(ResourceKind::Service, &spec.name, &cluster.name)?;

        let routes = spec
            .routing
            .iter()
            .map(|entry| {
                let tg: TargetGroup =
                    self.require_ready(ResourceKind::Service, &spec.name, &entry.target_group)?;
                Ok(ServiceRoute {
                    target_group_arn: tg.arn,
                    container_name: entry.container_name.clone(),
                    container_port: entry.container_port,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let request = ServiceRequest {
            name: spec.name.clone(),
            cluster_arn: cluster.arn,
            bindings: spec.bindings.clone(),
            routes,
            desired_count: spec.desired_count,
        };

        self.submit(&spec.name, async {
            self.provider
                .create_service(request)
                .await
                .map_err(|e| ProvisionError::provider(ResourceKind::Service, &spec.name, &e))
        })
        .await
    }

    /// Wait for a ready load balancer to become active and return its
    /// provider-assigned address.
    pub async fn export_address(&self, load_balancer: &LoadBalancer) -> Result<String, ProvisionError> {
        let lb: LoadBalancer = self.ledger.ready(&load_balancer.name).ok_or_else(|| {
            ValidationError::NotReady {
                kind: ResourceKind::LoadBalancer,
                name: load_balancer.name.clone(),
                state: self.ledger.state(ResourceKind::LoadBalancer, &load_balancer.name),
            }
        })?;

        if lb.state.is_serving() && !lb.dns_name.is_empty() {
            return Ok(lb.dns_name);
        }

        let provider = &self.provider;
        let name = lb.name.as_str();
        let arn = lb.arn.as_str();
        let outcome = wait_until(&self.wait, Some(&self.cancel), name, || async move {
            let current = provider
                .describe_load_balancer(arn)
                .await
                .map_err(|e| ProvisionError::provider(ResourceKind::LoadBalancer, name, &e))?;

            if let LoadBalancerState::Failed { reason } = &current.state {
                return Err(ProvisionError::Provisioning {
                    kind: ResourceKind::LoadBalancer,
                    name: name.to_string(),
                    code: None,
                    reason: reason
                        .clone()
                        .unwrap_or_else(|| "load balancer entered failed state".to_string()),
                });
            }
            if current.state.is_serving() && !current.dns_name.is_empty() {
                Ok(Some(current))
            } else {
                debug!(load_balancer = %name, state = %current.state, "Load balancer not active yet");
                Ok(None)
            }
        })
        .await?;

        match outcome {
            WaitOutcome::Ready(current) => {
                let address = current.dns_name.clone();
                self.ledger.update(name, current);
                info!(load_balancer = %name, address = %address, "Load balancer active");
                Ok(address)
            }
            WaitOutcome::TimedOut { waited, .. } => Err(ProvisionError::Timeout {
                kind: ResourceKind::LoadBalancer,
                name: name.to_string(),
                waited,
            }),
            WaitOutcome::Cancelled => Err(ProvisionError::Cancelled {
                kind: ResourceKind::LoadBalancer,
                name: name.to_string(),
            }),
        }
    }

    /// Change a service's replica count.
    ///
    /// Services created in this run must be `Ready`; services created
    /// elsewhere are scaled as given.
    pub async fn scale_service(
        &self,
        service: &ManagedService,
        desired_count: u32,
    ) -> Result<ManagedService, ProvisionError> {
        require_name(ResourceKind::Service, &service.name)?;
        let state = self.ledger.state(ResourceKind::Service, &service.name);
        if matches!(state, ResourceState::Submitting | ResourceState::Failed) {
            return Err(ValidationError::NotReady {
                kind: ResourceKind::Service,
                name: service.name.clone(),
                state,
            }
            .into());
        }

        self.provider
            .update_desired_count(&service.cluster_arn, &service.name, desired_count)
            .await
            .map_err(|e| ProvisionError::provider(ResourceKind::Service, &service.name, &e))?;

        let scaled = ManagedService {
            desired_count,
            ..service.clone()
        };
        self.ledger.update(&service.name, scaled.clone());
        info!(
            service = %service.name,
            from = service.desired_count,
            to = desired_count,
            "Scaled service"
        );
        Ok(scaled)
    }

    /// Provider-reported health of every target in a target group
    pub async fn target_health(
        &self,
        target_group: &TargetGroup,
    ) -> Result<Vec<TargetHealth>, ProvisionError> {
        self.provider
            .describe_target_health(&target_group.arn)
            .await
            .map_err(|e| ProvisionError::provider(ResourceKind::TargetGroup, &target_group.name, &e))
    }

    /// Provision a whole topology.
    ///
    /// The topology is validated and ordered before any remote call. Tiers
    /// run in order; resources within a tier are created concurrently. The
    /// first failed tier ends the run with that tier's first error, leaving
    /// everything already created in place.
    pub async fn provision(&self, topology: &TopologySpec) -> Result<ProvisionReport, ProvisionError> {
        let started_at = Utc::now();
        let graph = DependencyGraph::from_topology(topology)?;
        let tiers = graph.tiers()?;
        info!(resources = graph.len(), tiers = tiers.len(), "Provisioning topology");

        for (index, tier) in tiers.iter().enumerate() {
            debug!(tier = index, size = tier.len(), "Starting tier");
            let results =
                futures::future::join_all(tier.iter().map(|node| self.create_node(topology, node)))
                    .await;

            let mut errors = results.into_iter().filter_map(Result::err);
            if let Some(first) = errors.next() {
                for other in errors {
                    warn!(error = %other, "Additional failure in the same tier");
                }
                return Err(first);
            }
        }

        let mut addresses = BTreeMap::new();
        for spec in topology.load_balancers.iter().filter(|lb| lb.external) {
            let Some(lb) = self.ledger.ready::<LoadBalancer>(&spec.name) else {
                continue;
            };
            let address = self.export_address(&lb).await?;
            addresses.insert(spec.name.clone(), address);
        }

        Ok(ProvisionReport {
            started_at,
            finished_at: Utc::now(),
            resources: self.ledger.snapshot(),
            addresses,
        })
    }

    /// Create one graph node from its declaration
    async fn create_node(
        &self,
        topology: &TopologySpec,
        node: &ResourceRef,
    ) -> Result<(), ProvisionError> {
        let undeclared = || ValidationError::UnknownReference {
            kind: node.kind,
            name: node.name.clone(),
            target_kind: node.kind,
            target: node.name.clone(),
        };

        match node.kind {
            ResourceKind::Cluster => {
                self.create_cluster(&node.name).await?;
            }
            ResourceKind::LoadBalancer => {
                let spec = topology.load_balancer(&node.name).ok_or_else(undeclared)?;
                self.create_load_balancer_from(spec).await?;
            }
            ResourceKind::TargetGroup => {
                let spec = topology.target_group(&node.name).ok_or_else(undeclared)?;
                let lb: LoadBalancer =
                    self.require_ready(ResourceKind::TargetGroup, &spec.name, &spec.load_balancer)?;
                self.create_target_group_from(spec, &lb).await?;
            }
            ResourceKind::Service => {
                let spec = topology.service(&node.name).ok_or_else(undeclared)?;
                let cluster: ComputeCluster =
                    self.require_ready(ResourceKind::Service, &spec.name, &spec.cluster)?;
                self.create_managed_service_from(spec, &cluster).await?;
            }
        }
        Ok(())
    }

    /// Handle of a dependency, which must be `Ready` in this run
    fn require_ready<T: Tracked>(
        &self,
        kind: ResourceKind,
        name: &str,
        dependency: &str,
    ) -> Result<T, ValidationError> {
        self.ledger
            .ready(dependency)
            .ok_or_else(|| ValidationError::DependencyNotReady {
                kind,
                name: name.to_string(),
                dependency_kind: T::KIND,
                dependency: dependency.to_string(),
                state: self.ledger.state(T::KIND, dependency),
            })
    }

    /// Run `create` for a resource unless it is already ready, recording the
    /// outcome in the ledger
    async fn submit<T, Fut>(&self, name: &str, create: Fut) -> Result<T, ProvisionError>
    where
        T: Tracked,
        Fut: Future<Output = Result<T, ProvisionError>>,
    {
        if let Some(existing) = self.ledger.begin::<T>(name)? {
            debug!(kind = %T::KIND, name, "Already ready, reusing");
            return Ok(existing);
        }

        match create.await {
            Ok(created) => {
                self.ledger.complete(name, created.clone());
                info!(kind = %T::KIND, name, "Ready");
                Ok(created)
            }
            Err(err) => {
                let reason = match &err {
                    ProvisionError::Provisioning { reason, .. } => reason.clone(),
                    other => other.to_string(),
                };
                error!(kind = %T::KIND, name, reason = %reason, "Failed");
                self.ledger.fail(T::KIND, name, reason);
                Err(err)
            }
        }
    }
}
