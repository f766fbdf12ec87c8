//! In-memory log stores for shipper tests

#![allow(dead_code)]

use stackline_logship::{DeliveryError, LogEvent, LogStore, ShipperConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Config pointing at a test stream
pub fn test_config() -> ShipperConfig {
    ShipperConfig {
        log_group: "/stackline/test".to_string(),
        log_stream: "shipper".to_string(),
        ..Default::default()
    }
}

/// Store that keeps every batch it receives
#[derive(Clone, Default)]
pub struct RecordingStore {
    batches: Arc<Mutex<Vec<Vec<LogEvent>>>>,
}

impl RecordingStore {
    pub fn batches(&self) -> Vec<Vec<LogEvent>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.batches().into_iter().flatten().collect()
    }
}

impl LogStore for RecordingStore {
    async fn put_log_events(&self, events: &[LogEvent]) -> Result<(), DeliveryError> {
        self.batches.lock().unwrap().push(events.to_vec());
        Ok(())
    }
}

/// Store that sleeps before accepting each batch
#[derive(Clone, Default)]
pub struct DelayedStore {
    pub delay: Duration,
    pub inner: RecordingStore,
}

impl LogStore for DelayedStore {
    async fn put_log_events(&self, events: &[LogEvent]) -> Result<(), DeliveryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.put_log_events(events).await
    }
}

/// Store that rejects every batch
#[derive(Clone, Default)]
pub struct FailingStore {
    pub calls: Arc<AtomicUsize>,
}

impl LogStore for FailingStore {
    async fn put_log_events(&self, _events: &[LogEvent]) -> Result<(), DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DeliveryError::Rejected {
            code: Some("InvalidParameterException".to_string()),
            message: "always fails".to_string(),
        })
    }
}

/// Store that holds every call until a permit is released
#[derive(Clone)]
pub struct GatedStore {
    pub gate: Arc<Semaphore>,
    pub inner: RecordingStore,
}

impl GatedStore {
    pub fn closed() -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
            inner: RecordingStore::default(),
        }
    }
}

impl LogStore for GatedStore {
    async fn put_log_events(&self, events: &[LogEvent]) -> Result<(), DeliveryError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| DeliveryError::WorkerStopped)?;
        permit.forget();
        self.inner.put_log_events(events).await
    }
}

/// Store that panics on every call
#[derive(Clone, Default)]
pub struct PanickingStore;

impl LogStore for PanickingStore {
    async fn put_log_events(&self, _events: &[LogEvent]) -> Result<(), DeliveryError> {
        panic!("log store exploded");
    }
}
