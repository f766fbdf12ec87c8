//! CloudWatch Logs store

use crate::error::DeliveryError;
use crate::event::LogEvent;
use crate::store::LogStore;
use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_cloudwatchlogs::Client;
use aws_sdk_cloudwatchlogs::error::ProvideErrorMetadata;
use aws_sdk_cloudwatchlogs::types::InputLogEvent;
use tokio::sync::Mutex;
use tracing::debug;

const ALREADY_EXISTS_CODE: &str = "ResourceAlreadyExistsException";

/// CloudWatch Logs client for shipping application log lines
pub struct CloudWatchLogStore {
    client: Client,
    sequence_token: Mutex<Option<String>>,
}

impl CloudWatchLogStore {
    /// Create a store for `region`, loading credentials from the environment
    pub async fn new(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self::from_sdk_config(&config)
    }

    /// Create a store from an already-loaded SDK config
    pub fn from_sdk_config(config: &SdkConfig) -> Self {
        Self::from_client(Client::new(config))
    }

    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            sequence_token: Mutex::new(None),
        }
    }

    /// Create the log group and stream, ignoring ones that already exist
    pub async fn ensure_destination(&self, log_group: &str, log_stream: &str) -> Result<()> {
        match self
            .client
            .create_log_group()
            .log_group_name(log_group)
            .send()
            .await
        {
            Ok(_) => debug!(log_group = %log_group, "Created log group"),
            Err(e) if e.code() == Some(ALREADY_EXISTS_CODE) => {}
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create log group {log_group}"));
            }
        }

        match self
            .client
            .create_log_stream()
            .log_group_name(log_group)
            .log_stream_name(log_stream)
            .send()
            .await
        {
            Ok(_) => debug!(log_group = %log_group, log_stream = %log_stream, "Created log stream"),
            Err(e) if e.code() == Some(ALREADY_EXISTS_CODE) => {}
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to create log stream {log_stream}"));
            }
        }

        Ok(())
    }
}

impl LogStore for CloudWatchLogStore {
    async fn put_log_events(&self, events: &[LogEvent]) -> Result<(), DeliveryError> {
        let Some(first) = events.first() else {
            return Ok(());
        };

        let input = events
            .iter()
            .map(|event| {
                InputLogEvent::builder()
                    .timestamp(event.timestamp)
                    .message(&event.message)
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DeliveryError::InvalidEvent(e.to_string()))?;

        let mut token = self.sequence_token.lock().await;

        let mut request = self
            .client
            .put_log_events()
            .log_group_name(first.log_group.as_ref())
            .log_stream_name(first.log_stream.as_ref())
            .set_log_events(Some(input));

        if let Some(ref t) = *token {
            request = request.sequence_token(t);
        }

        let response = request.send().await.map_err(DeliveryError::from_sdk)?;

        // Update sequence token for next call
        *token = response.next_sequence_token().map(|s| s.to_string());

        if let Some(rejected) = response.rejected_log_events_info() {
            let too_new_start = rejected.too_new_log_event_start_index();
            let too_old_end = rejected.too_old_log_event_end_index();
            let expired_end = rejected.expired_log_event_end_index();
            if too_new_start.is_some() || too_old_end.is_some() || expired_end.is_some() {
                return Err(DeliveryError::PartiallyRejected {
                    too_new_start,
                    too_old_end,
                    expired_end,
                });
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for CloudWatchLogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudWatchLogStore").finish_non_exhaustive()
    }
}
