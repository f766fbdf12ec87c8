//! LogShipper behavior against in-memory stores

mod common;

use common::*;
use stackline_logship::{DeliveryError, DeliveryFailure, LogShipper, TracingDiagnostics};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Collect every failure currently queued on the diagnostic channel
fn drain(rx: &mut mpsc::UnboundedReceiver<DeliveryFailure>) -> Vec<DeliveryFailure> {
    let mut failures = Vec::new();
    while let Ok(failure) = rx.try_recv() {
        failures.push(failure);
    }
    failures
}

#[tokio::test]
async fn test_record_does_not_wait_for_slow_store() {
    let store = DelayedStore {
        delay: Duration::from_secs(30),
        inner: RecordingStore::default(),
    };
    let shipper = LogShipper::spawn(store, TracingDiagnostics, &test_config());

    let start = Instant::now();
    for i in 0..100 {
        shipper.record(format!("line {i}"));
    }
    let elapsed = start.elapsed();

    assert!(
        elapsed < Duration::from_secs(1),
        "record() took {elapsed:?} with a 30s store delay"
    );
}

#[tokio::test]
async fn test_failed_delivery_never_surfaces_and_is_reported_once_per_call() {
    let store = FailingStore::default();
    let calls = store.calls.clone();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let shipper = LogShipper::spawn(store, tx, &test_config());

    for i in 0..5 {
        shipper.record(format!("doomed {i}"));
    }
    shipper.shutdown().await;

    let failures = drain(&mut rx);
    assert_eq!(failures.len(), 5);
    assert_eq!(calls.load(Ordering::SeqCst), 5, "one submission per record()");
    for (i, failure) in failures.iter().enumerate() {
        assert_eq!(failure.event.message, format!("doomed {i}"));
        assert!(matches!(failure.error, DeliveryError::Rejected { .. }));
    }
}

#[tokio::test]
async fn test_events_carry_destination_and_keep_order() {
    let store = RecordingStore::default();
    let shipper = LogShipper::spawn(store.clone(), TracingDiagnostics, &test_config());

    shipper.record("first");
    shipper.record(String::from("second"));
    shipper.record("third");
    shipper.shutdown().await;

    let events = store.events();
    let messages: Vec<&str> = events.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, ["first", "second", "third"]);

    for event in &events {
        assert_eq!(&*event.log_group, "/stackline/test");
        assert_eq!(&*event.log_stream, "shipper");
        assert!(event.timestamp > 0);
    }
    assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    // Default config submits one event per call
    assert!(store.batches().iter().all(|b| b.len() == 1));
}

#[tokio::test]
async fn test_batches_preserve_call_order() {
    let store = GatedStore::closed();
    let config = stackline_logship::ShipperConfig {
        max_batch_size: 4,
        ..test_config()
    };
    let shipper = LogShipper::spawn(store.clone(), TracingDiagnostics, &config);

    for i in 0..10 {
        shipper.record(format!("{i}"));
    }
    store.gate.add_permits(100);
    shipper.shutdown().await;

    let batches = store.inner.batches();
    assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= 4));

    let messages: Vec<String> = store.inner.events().into_iter().map(|e| e.message).collect();
    let expected: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    assert_eq!(messages, expected);
}

#[tokio::test]
async fn test_shutdown_drains_queue() {
    let store = DelayedStore {
        delay: Duration::from_millis(20),
        inner: RecordingStore::default(),
    };
    let shipper = LogShipper::spawn(store.clone(), TracingDiagnostics, &test_config());

    for i in 0..3 {
        shipper.record(format!("queued {i}"));
    }
    shipper.shutdown().await;

    assert_eq!(store.inner.events().len(), 3);
}

#[tokio::test]
async fn test_panicking_store_reports_every_event_and_keeps_draining() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let shipper = LogShipper::spawn(PanickingStore, tx, &test_config());

    for i in 0..5 {
        shipper.record(format!("line {i}"));
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    let failures = drain(&mut rx);
    assert_eq!(failures.len(), 5);
    for (i, failure) in failures.iter().enumerate() {
        assert_eq!(failure.event.message, format!("line {i}"));
        assert_eq!(
            failure.error,
            DeliveryError::StorePanicked {
                message: "log store exploded".to_string()
            }
        );
    }

    // The worker survives and keeps taking new events
    shipper.record("after the panic");
    shipper.shutdown().await;

    let failures = drain(&mut rx);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].event.message, "after the panic");
    assert!(matches!(failures[0].error, DeliveryError::StorePanicked { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_records_arrive_intact_in_timestamp_order() {
    const TASKS: usize = 8;
    const LINES: usize = 200;

    let store = RecordingStore::default();
    let config = stackline_logship::ShipperConfig {
        max_batch_size: 16,
        ..test_config()
    };
    let shipper = Arc::new(LogShipper::spawn(store.clone(), TracingDiagnostics, &config));

    let tasks: Vec<_> = (0..TASKS)
        .map(|t| {
            let shipper = shipper.clone();
            tokio::spawn(async move {
                for i in 0..LINES {
                    shipper.record(format!("task {t} line {i}"));
                    if i % 16 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let shipper = Arc::into_inner(shipper).expect("all recording tasks finished");
    shipper.shutdown().await;

    let events = store.events();
    assert_eq!(events.len(), TASKS * LINES);
    assert!(
        events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp),
        "delivery order must follow timestamps"
    );

    // Every message intact, and each task's lines in the order it recorded them
    for t in 0..TASKS {
        let prefix = format!("task {t} line ");
        let lines: Vec<usize> = events
            .iter()
            .filter_map(|e| e.message.strip_prefix(&prefix))
            .map(|n| n.parse().unwrap())
            .collect();
        assert_eq!(lines, (0..LINES).collect::<Vec<_>>());
    }
    for event in &events {
        assert_eq!(&*event.log_group, "/stackline/test");
        assert_eq!(&*event.log_stream, "shipper");
    }
}
