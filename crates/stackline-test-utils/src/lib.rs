//! Shared test utilities for stackline
//!
//! This crate provides common test helpers that can be used across
//! multiple test modules without circular dependencies.
//!
//! ## Modules
//!
//! - [`aws`]: AWS region detection and test run ID generation
//! - [`topology`]: Canonical topologies and health-check policies

pub mod aws;
pub mod topology;

// Re-export commonly used items
pub use aws::{get_test_region, test_run_id};
pub use topology::{scenario_a, scenario_b, web_binding, web_health_check};
