//! stackline: provision a load-balanced container service on AWS
//!
//! `provision` creates the cluster, load balancer, target group and service in
//! dependency order and prints the public URL. `plan` validates and orders a
//! deployment without contacting AWS.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stackline_common::TopologySpec;
use stackline_common::defaults::{default_region, default_task_cpu, default_task_memory};
use stackline_provisioner::aws::{AwsContext, EcsClient, ElbClient, TaskSettings};
use stackline_provisioner::{
    AwsProvider, DependencyGraph, DeployConfig, ProvisionError, Provisioner, WaitConfig,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "stackline")]
#[command(about = "Provision a load-balanced container service on AWS")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

/// Where the deployment comes from
#[derive(clap::Args, Debug)]
struct SourceArgs {
    /// JSON deployment config (flags override its values)
    #[arg(long, conflicts_with = "topology")]
    config: Option<String>,

    /// JSON topology document with any number of resources
    #[arg(long)]
    topology: Option<String>,

    /// Container image (required without --config or --topology)
    #[arg(long, env = "STACKLINE_IMAGE")]
    image: Option<String>,

    /// Number of service replicas
    #[arg(long)]
    desired_count: Option<u32>,
}

/// Arguments for the provision command (extracted to reduce enum size)
#[derive(clap::Args, Debug)]
struct ProvisionArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// AWS region (default: us-east-2)
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// Comma-separated subnet IDs (uses the default VPC if not specified)
    #[arg(long, value_delimiter = ',')]
    subnet_ids: Vec<String>,

    /// Comma-separated security group IDs
    #[arg(long, value_delimiter = ',')]
    security_group_ids: Vec<String>,

    /// Task execution role ARN
    #[arg(long)]
    execution_role_arn: Option<String>,

    /// Seconds to wait for the load balancer to become active
    #[arg(long, default_value = "600")]
    wait_timeout: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create every resource and print the service URL
    Provision(Box<ProvisionArgs>),

    /// Validate a deployment and print its creation order
    Plan(SourceArgs),

    /// Change a service's replica count
    Scale {
        /// AWS region
        #[arg(long, env = "AWS_REGION", default_value = "us-east-2")]
        region: String,

        /// Cluster name or ARN
        #[arg(long)]
        cluster: String,

        /// Service name
        #[arg(long)]
        service: String,

        /// New replica count
        #[arg(long)]
        count: u32,
    },

    /// Show provider-reported health of a target group's targets
    Health {
        /// AWS region
        #[arg(long, env = "AWS_REGION", default_value = "us-east-2")]
        region: String,

        /// Target group ARN
        #[arg(long)]
        target_group_arn: String,
    },
}

/// Everything a provision run needs, from either source
struct Deployment {
    region: String,
    topology: TopologySpec,
    subnet_ids: Vec<String>,
    security_group_ids: Vec<String>,
    task: TaskSettings,
}

impl SourceArgs {
    /// Load the deployment config, applying flag overrides
    fn deploy_config(&self) -> Result<DeployConfig> {
        let mut config = match (&self.config, &self.image) {
            (Some(path), _) => DeployConfig::from_file(path)?,
            (None, Some(image)) => DeployConfig::new(image.clone()),
            (None, None) => anyhow::bail!("one of --config, --topology or --image is required"),
        };
        if let (Some(_), Some(image)) = (&self.config, &self.image) {
            config.image_reference = image.clone();
        }
        if let Some(count) = self.desired_count {
            config.desired_count = count;
        }
        config.check()?;
        Ok(config)
    }

    /// Load a topology document, applying the replica override to every service
    fn topology_file(&self, path: &str) -> Result<TopologySpec> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read topology file '{path}'"))?;
        let mut topology: TopologySpec = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse topology file '{path}'"))?;
        if let Some(count) = self.desired_count {
            for service in &mut topology.services {
                service.desired_count = count;
            }
        }
        Ok(topology)
    }

    fn topology(&self) -> Result<TopologySpec> {
        match &self.topology {
            Some(path) => self.topology_file(path),
            None => Ok(self.deploy_config()?.topology()),
        }
    }
}

impl ProvisionArgs {
    fn into_deployment(self) -> Result<Deployment> {
        let mut deployment = match &self.source.topology {
            Some(path) => Deployment {
                region: default_region(),
                topology: self.source.topology_file(path)?,
                subnet_ids: Vec::new(),
                security_group_ids: Vec::new(),
                task: TaskSettings {
                    cpu: default_task_cpu(),
                    memory: default_task_memory(),
                    execution_role_arn: None,
                    assign_public_ip: true,
                },
            },
            None => {
                let config = self.source.deploy_config()?;
                Deployment {
                    region: config.region.clone(),
                    topology: config.topology(),
                    subnet_ids: config.subnet_ids.clone(),
                    security_group_ids: config.security_group_ids.clone(),
                    task: config.task_settings(),
                }
            }
        };

        if let Some(region) = self.region {
            deployment.region = region;
        }
        if !self.subnet_ids.is_empty() {
            deployment.subnet_ids = self.subnet_ids;
        }
        if !self.security_group_ids.is_empty() {
            deployment.security_group_ids = self.security_group_ids;
        }
        if self.execution_role_arn.is_some() {
            deployment.task.execution_role_arn = self.execution_role_arn;
        }
        Ok(deployment)
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();
    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if let Some(hint) = e
        .downcast_ref::<ProvisionError>()
        .and_then(ProvisionError::suggestion)
    {
        let _ = writeln!(stderr, "\n\x1b[36mHint:\x1b[0m {hint}");
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    match Args::parse().command {
        Command::Provision(args) => handle_provision(*args).await,
        Command::Plan(source) => handle_plan(&source),
        Command::Scale {
            region,
            cluster,
            service,
            count,
        } => {
            let ctx = AwsContext::new(&region).await;
            EcsClient::from_context(&ctx)
                .update_desired_count(&cluster, &service, count)
                .await?;
            println!("{service}: desired count {count}");
            Ok(())
        }
        Command::Health {
            region,
            target_group_arn,
        } => handle_health(&region, &target_group_arn).await,
    }
}

/// Handle the provision command
async fn handle_provision(args: ProvisionArgs) -> Result<()> {
    let wait = WaitConfig {
        timeout: Duration::from_secs(args.wait_timeout),
        ..Default::default()
    };
    let deployment = args.into_deployment()?;

    // Fail on a bad topology before resolving any AWS state
    DependencyGraph::from_topology(&deployment.topology)?.tiers()?;

    let deployment_id = uuid::Uuid::now_v7().to_string();
    info!(
        region = %deployment.region,
        deployment_id = %deployment_id,
        resources = deployment.topology.len(),
        "Starting deployment"
    );

    let ctx = AwsContext::new(&deployment.region).await;
    let provider = AwsProvider::new(
        &ctx,
        &deployment.subnet_ids,
        &deployment.security_group_ids,
        deployment.task,
        deployment_id,
    )
    .await?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after in-flight calls complete");
            on_signal.cancel();
        }
    });

    let provisioner = Provisioner::new(provider)
        .with_wait_config(wait)
        .with_cancellation(cancel);
    let report = provisioner.provision(&deployment.topology).await?;

    info!(
        resources = report.resources.len(),
        elapsed_secs = (report.finished_at - report.started_at).num_seconds(),
        "Deployment complete"
    );
    for (name, address) in &report.addresses {
        println!("{name}: http://{address}");
    }
    Ok(())
}

/// Handle the plan command
fn handle_plan(source: &SourceArgs) -> Result<()> {
    let topology = source.topology()?;
    let graph = DependencyGraph::from_topology(&topology)?;
    let tiers = graph.tiers()?;

    println!("{} resources in {} tiers", graph.len(), tiers.len());
    for (index, tier) in tiers.iter().enumerate() {
        let names: Vec<String> = tier.iter().map(ToString::to_string).collect();
        println!("  {index}: {}", names.join(", "));
    }
    Ok(())
}

/// Handle the health command
async fn handle_health(region: &str, target_group_arn: &str) -> Result<()> {
    let ctx = AwsContext::new(region).await;
    let targets = ElbClient::from_context(&ctx)
        .describe_target_health(target_group_arn)
        .await?;

    if targets.is_empty() {
        println!("No targets registered.");
        return Ok(());
    }

    println!("{:<20} {:<6} {:<12} {:<30}", "TARGET", "PORT", "STATE", "REASON");
    println!("{}", "-".repeat(70));
    for target in &targets {
        println!(
            "{:<20} {:<6} {:<12} {:<30}",
            target.target_id,
            target.port.map(|p| p.to_string()).unwrap_or_default(),
            target.state.to_string(),
            target.reason.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
