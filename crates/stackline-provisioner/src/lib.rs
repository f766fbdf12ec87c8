//! stackline-provisioner - Dependency-ordered AWS provisioning
//!
//! This crate creates a load-balanced container service (cluster, load
//! balancer, target group with listener, and Fargate service) in dependency
//! order, and exports the load balancer's public address.
//!
//! ## Modules
//!
//! - [`aws`]: ECS, ELBv2 and EC2 clients and the [`AwsProvider`]
//! - [`config`]: Single-service deployment configuration
//! - [`error`]: Provisioning and configuration errors
//! - [`graph`]: Dependency graph and tiered creation order
//! - [`ledger`]: Per-resource lifecycle records
//! - [`provider`]: Resource handles and the [`Provider`] seam
//! - [`provisioner`]: The [`Provisioner`] itself
//! - [`wait`]: Backoff polling with cancellation

pub mod aws;
pub mod config;
pub mod error;
pub mod graph;
pub mod ledger;
pub mod provider;
pub mod provisioner;
pub mod wait;

pub use aws::AwsProvider;
pub use config::DeployConfig;
pub use error::{ConfigError, ProvisionError};
pub use graph::{DependencyGraph, ResourceRef};
pub use ledger::{ResourceHandle, ResourceLedger, ResourceRecord};
pub use provider::{
    ComputeCluster, LoadBalancer, LoadBalancerState, ManagedService, Provider, TargetGroup,
    TargetHealth, TargetHealthState,
};
pub use provisioner::{ProvisionReport, Provisioner};
pub use wait::WaitConfig;
