//! Side channel for delivery failures
//!
//! Failed submissions surface here and nowhere else. The default sink writes
//! a `warn!` line to the process's own tracing output; tests and embedders
//! can route failures into a channel instead.

use crate::error::DeliveryError;
use crate::event::LogEvent;
use tokio::sync::mpsc;
use tracing::warn;

/// A log event that could not be delivered, with the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub event: LogEvent,
    pub error: DeliveryError,
}

/// Receiver of delivery failures. Called once per undelivered event.
///
/// Implementations must not block: they run on the shipper's worker task, or
/// on the caller's thread when the worker is gone.
pub trait DiagnosticSink: Send + Sync {
    fn delivery_failed(&self, event: &LogEvent, error: &DeliveryError);
}

/// Reports failures through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn delivery_failed(&self, event: &LogEvent, error: &DeliveryError) {
        warn!(
            log_group = %event.log_group,
            log_stream = %event.log_stream,
            timestamp = event.timestamp,
            error = %error,
            "Failed to deliver log event"
        );
    }
}

impl DiagnosticSink for mpsc::UnboundedSender<DeliveryFailure> {
    fn delivery_failed(&self, event: &LogEvent, error: &DeliveryError) {
        // Receiver may be gone; nothing left to report to
        let _ = self.send(DeliveryFailure {
            event: event.clone(),
            error: error.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn event() -> LogEvent {
        LogEvent {
            timestamp: 42,
            message: "hello".to_string(),
            log_group: Arc::from("/stackline/test"),
            log_stream: Arc::from("unit"),
        }
    }

    #[test]
    fn test_channel_sink_forwards_failure() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.delivery_failed(&event(), &DeliveryError::WorkerStopped);

        let failure = rx.try_recv().unwrap();
        assert_eq!(failure.event, event());
        assert_eq!(failure.error, DeliveryError::WorkerStopped);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_ignores_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        tx.delivery_failed(&event(), &DeliveryError::WorkerStopped);
    }

    #[test]
    fn test_tracing_sink_does_not_panic() {
        TracingDiagnostics.delivery_failed(&event(), &DeliveryError::InvalidEvent("empty".into()));
    }
}
