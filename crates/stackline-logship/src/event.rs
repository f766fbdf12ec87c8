//! Log events and timestamping

use stackline_common::timestamp_millis;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// One timestamped message bound for a log stream
///
/// Immutable once built. The group and stream names are shared between all
/// events of a shipper, so cloning an event is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// Milliseconds since UNIX epoch
    pub timestamp: i64,
    pub message: String,
    pub log_group: Arc<str>,
    pub log_stream: Arc<str>,
}

/// Wall-clock source that never goes backwards.
///
/// Log stores order a stream by timestamp. If the system clock steps back
/// between two records, the later record reuses the last timestamp handed out
/// instead of jumping into the past.
#[derive(Debug, Default)]
pub struct TimestampClock {
    last: AtomicI64,
}

impl TimestampClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp for the next event, based on the current wall clock
    pub fn next(&self) -> i64 {
        self.stamp(timestamp_millis())
    }

    /// Timestamp for the next event given a wall-clock reading `now`
    pub fn stamp(&self, now: i64) -> i64 {
        let previous = self.last.fetch_max(now, Ordering::AcqRel);
        previous.max(now)
    }
}
