//! The shipper handle and its background worker
//!
//! `record()` stamps the message, pushes it onto an unbounded channel and
//! returns. A worker task drains the channel and submits events to the log
//! store, one batch at a time, in channel order. Failures stop at the worker:
//! each undelivered event is reported to the diagnostic sink exactly once and
//! then dropped. Nothing is retried. A store call that panics counts as a
//! failed submission; the worker keeps draining.

use crate::config::ShipperConfig;
use crate::diagnostics::DiagnosticSink;
use crate::error::DeliveryError;
use crate::event::{LogEvent, TimestampClock};
use crate::store::LogStore;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Handle used by application code to ship log lines
///
/// Dropping the handle closes the queue; the worker still submits whatever
/// was already recorded, as long as the runtime keeps running.
pub struct LogShipper {
    /// Held while stamping and enqueueing, so queue order is timestamp order
    tx: Mutex<mpsc::UnboundedSender<LogEvent>>,
    log_group: Arc<str>,
    log_stream: Arc<str>,
    clock: TimestampClock,
    diagnostics: Arc<dyn DiagnosticSink>,
    worker: JoinHandle<()>,
    shutdown_timeout: Duration,
}

impl LogShipper {
    /// Start a worker for `store` and return the handle feeding it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<S, D>(store: S, diagnostics: D, config: &ShipperConfig) -> Self
    where
        S: LogStore,
        D: DiagnosticSink + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let diagnostics: Arc<dyn DiagnosticSink> = Arc::new(diagnostics);

        let worker = ShipperWorker {
            store,
            rx,
            diagnostics: diagnostics.clone(),
            max_batch_size: config.max_batch_size.max(1),
        };
        let worker = tokio::spawn(worker.run());

        debug!(
            log_group = %config.log_group,
            log_stream = %config.log_stream,
            max_batch_size = config.max_batch_size,
            "Started log shipper"
        );

        Self {
            tx: Mutex::new(tx),
            log_group: Arc::from(config.log_group.as_str()),
            log_stream: Arc::from(config.log_stream.as_str()),
            clock: TimestampClock::new(),
            diagnostics,
            worker,
            shutdown_timeout: config.shutdown_timeout(),
        }
    }

    /// Ship one message. Never blocks on the log store and never fails.
    ///
    /// Safe to call from many threads at once.
    pub fn record(&self, message: impl Into<String>) {
        let message = message.into();

        let sent = {
            let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
            tx.send(LogEvent {
                timestamp: self.clock.next(),
                message,
                log_group: self.log_group.clone(),
                log_stream: self.log_stream.clone(),
            })
        };

        if let Err(mpsc::error::SendError(event)) = sent {
            self.diagnostics
                .delivery_failed(&event, &DeliveryError::WorkerStopped);
        }
    }

    pub fn log_group(&self) -> &str {
        &self.log_group
    }

    pub fn log_stream(&self) -> &str {
        &self.log_stream
    }

    /// Stop accepting events and wait (bounded) for the queue to drain.
    ///
    /// Events still queued when the timeout expires are lost, exactly as if
    /// the process had exited.
    pub async fn shutdown(self) {
        let Self {
            tx,
            worker,
            shutdown_timeout,
            ..
        } = self;
        drop(tx);

        match tokio::time::timeout(shutdown_timeout, worker).await {
            Ok(Ok(())) => debug!("Log shipper drained"),
            Ok(Err(e)) if e.is_panic() => warn!("Log shipper worker panicked: {:?}", e),
            Ok(Err(e)) => warn!(error = ?e, "Log shipper worker failed"),
            Err(_) => warn!(
                timeout_secs = shutdown_timeout.as_secs(),
                "Timed out waiting for log shipper to drain"
            ),
        }
    }
}

/// Background task submitting queued events to the store
struct ShipperWorker<S> {
    store: S,
    rx: mpsc::UnboundedReceiver<LogEvent>,
    diagnostics: Arc<dyn DiagnosticSink>,
    max_batch_size: usize,
}

impl<S: LogStore> ShipperWorker<S> {
    /// Run until every handle is dropped and the queue is empty
    async fn run(mut self) {
        let mut delivered = 0usize;
        let mut failed = 0usize;

        while let Some(first) = self.rx.recv().await {
            let mut batch = vec![first];
            while batch.len() < self.max_batch_size {
                match self.rx.try_recv() {
                    Ok(event) => batch.push(event),
                    Err(_) => break,
                }
            }

            let submitted = AssertUnwindSafe(self.store.put_log_events(&batch))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    Err(DeliveryError::StorePanicked {
                        message: panic_message(payload.as_ref()),
                    })
                });

            match submitted {
                Ok(()) => {
                    delivered += batch.len();
                    debug!(count = batch.len(), "Delivered log events");
                }
                Err(error) => {
                    failed += batch.len();
                    for event in &batch {
                        self.diagnostics.delivery_failed(event, &error);
                    }
                }
            }
        }

        info!(delivered, failed, "Log shipper stopped");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
