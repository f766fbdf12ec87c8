//! AWS client modules for the provisioner
//!
//! This module provides wrappers around AWS SDK clients for:
//! - ECS: Clusters, task definitions and services
//! - ELBv2: Load balancers, target groups, listeners and target health
//! - EC2: Default VPC and subnet discovery
//!
//! [`AwsProvider`] combines them behind the [`crate::Provider`] trait.

pub mod context;
pub mod ecs;
pub mod elb;
pub mod error;
pub mod network;
pub mod provider;

pub use context::AwsContext;
pub use ecs::{EcsClient, TaskSettings};
pub use elb::ElbClient;
pub use error::{AwsError, classify_aws_error, find_aws_error};
pub use network::{NetworkClient, NetworkConfig};
pub use provider::AwsProvider;
