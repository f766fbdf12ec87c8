//! stackline-logship - Fire-and-forget log forwarding
//!
//! Application code hands text lines to a [`LogShipper`]; each line becomes
//! one timestamped [`LogEvent`] that a background worker submits to a remote
//! [`LogStore`]. Submission never blocks or fails the caller: a rejected
//! submission is reported through a [`DiagnosticSink`] and dropped.
//!
//! ## Modules
//!
//! - [`cloudwatch`]: CloudWatch Logs store
//! - [`config`]: Shipper configuration
//! - [`diagnostics`]: Side channel for delivery failures
//! - [`error`]: Delivery and configuration errors
//! - [`event`]: Log events and timestamping
//! - [`shipper`]: The shipper handle and its worker
//! - [`store`]: Remote log-store abstraction

pub mod cloudwatch;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod shipper;
pub mod store;

pub use cloudwatch::CloudWatchLogStore;
pub use config::ShipperConfig;
pub use diagnostics::{DeliveryFailure, DiagnosticSink, TracingDiagnostics};
pub use error::{ConfigError, DeliveryError};
pub use event::{LogEvent, TimestampClock};
pub use shipper::LogShipper;
pub use store::LogStore;
