//! CloudWatch Logs integration tests - actually call AWS APIs
//!
//! These tests are marked `#[ignore]` and only run with:
//! ```
//! AWS_PROFILE=your_profile cargo test -p stackline-logship --test cloudwatch_integration -- --ignored
//! ```

use stackline_logship::{CloudWatchLogStore, DeliveryFailure, LogShipper, ShipperConfig};
use stackline_test_utils::aws::{get_test_region, test_log_stream};
use tokio::sync::mpsc;

const TEST_LOG_GROUP: &str = "/stackline/integration-tests";

#[tokio::test]
#[ignore]
async fn test_ship_lines_to_cloudwatch() {
    let region = get_test_region();
    let store = CloudWatchLogStore::new(&region).await;
    let log_stream = test_log_stream();

    store
        .ensure_destination(TEST_LOG_GROUP, &log_stream)
        .await
        .expect("AWS credentials required - set AWS_PROFILE or AWS_ACCESS_KEY_ID");

    // Creating an existing destination is not an error
    store
        .ensure_destination(TEST_LOG_GROUP, &log_stream)
        .await
        .expect("Second ensure_destination should succeed");

    let config = ShipperConfig {
        region,
        log_group: TEST_LOG_GROUP.to_string(),
        log_stream,
        max_batch_size: 10,
        ..Default::default()
    };
    let (tx, mut rx) = mpsc::unbounded_channel::<DeliveryFailure>();
    let shipper = LogShipper::spawn(store, tx, &config);

    for i in 0..5 {
        shipper.record(format!("integration line {i}"));
    }
    shipper.shutdown().await;

    assert!(rx.try_recv().is_err(), "No delivery failures expected");
}

#[tokio::test]
#[ignore]
async fn test_missing_stream_is_reported_not_raised() {
    let store = CloudWatchLogStore::new(&get_test_region()).await;
    let config = ShipperConfig {
        log_group: TEST_LOG_GROUP.to_string(),
        log_stream: format!("{}-missing", test_log_stream()),
        ..Default::default()
    };
    let (tx, mut rx) = mpsc::unbounded_channel::<DeliveryFailure>();
    let shipper = LogShipper::spawn(store, tx, &config);

    shipper.record("nobody will read this");
    shipper.shutdown().await;

    let failure = rx.try_recv().expect("Expected one delivery failure");
    assert_eq!(failure.event.message, "nobody will read this");
}
