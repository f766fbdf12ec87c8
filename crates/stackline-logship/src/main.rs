//! stackline-logship: forward stdin lines to CloudWatch Logs
//!
//! Each line read from stdin is recorded as one log event. Delivery failures
//! are reported on stderr through tracing and never stop the forwarder.

use anyhow::Result;
use clap::Parser;
use stackline_logship::{CloudWatchLogStore, LogShipper, ShipperConfig, TracingDiagnostics};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "stackline-logship")]
#[command(about = "Forward stdin lines to a CloudWatch Logs stream")]
#[command(version)]
struct Args {
    /// JSON config file (flags override its values)
    #[arg(long)]
    config: Option<String>,

    /// AWS region (default: us-east-2)
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// Log group name (default: /stackline/service)
    #[arg(long, env = "STACKLINE_LOG_GROUP")]
    log_group: Option<String>,

    /// Log stream name (default: app)
    #[arg(long, env = "STACKLINE_LOG_STREAM")]
    log_stream: Option<String>,

    /// Maximum queued lines sent per call
    #[arg(long)]
    batch_size: Option<usize>,

    /// Create the log group and stream if missing
    #[arg(long)]
    create_destination: bool,
}

impl Args {
    fn into_config(self) -> Result<ShipperConfig> {
        let mut config = match &self.config {
            Some(path) => ShipperConfig::from_file(path)?,
            None => ShipperConfig::default(),
        };
        if let Some(region) = self.region {
            config.region = region;
        }
        if let Some(log_group) = self.log_group {
            config.log_group = log_group;
        }
        if let Some(log_stream) = self.log_stream {
            config.log_stream = log_stream;
        }
        if let Some(size) = self.batch_size {
            config.max_batch_size = size;
        }
        config.create_destination |= self.create_destination;

        config.check()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Args::parse().into_config()?;
    info!(
        region = %config.region,
        log_group = %config.log_group,
        log_stream = %config.log_stream,
        "Starting stackline-logship"
    );

    let store = CloudWatchLogStore::new(&config.region).await;
    if config.create_destination {
        store
            .ensure_destination(&config.log_group, &config.log_stream)
            .await?;
    }

    let shipper = LogShipper::spawn(store, TracingDiagnostics, &config);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut count = 0u64;
    while let Some(line) = lines.next_line().await? {
        shipper.record(line);
        count += 1;
    }

    info!(lines = count, "Reached end of input, draining");
    shipper.shutdown().await;
    Ok(())
}
