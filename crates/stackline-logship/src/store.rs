//! Remote log-store abstraction
//!
//! The shipper's worker owns exactly one store for its lifetime.

use crate::error::DeliveryError;
use crate::event::LogEvent;
use std::future::Future;

/// Trait for log stores that can be swapped out in tests.
///
/// Every call receives a non-empty, ordered batch of events for a single
/// log group and stream; implementations must keep that order.
pub trait LogStore: Send + Sync + 'static {
    /// Submit a batch of events in one remote call
    fn put_log_events(
        &self,
        events: &[LogEvent],
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}
