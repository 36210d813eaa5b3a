//! Concurrent capture-and-aggregation engine.
//!
//! One [`capture::CaptureSession`] per interface feeds a shared
//! [`queue::ObservationQueue`]; a single [`aggregator::HostAggregator`]
//! drains it, filters, and publishes rate-limited directory snapshots.
//! [`monitor::NetworkMonitor`] wires the pieces together.

pub mod aggregator;
pub mod capture;
pub mod monitor;
pub mod notifier;
pub mod queue;
pub mod vendors;
