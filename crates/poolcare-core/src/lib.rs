//! Polling pipeline between `poolcare-api` and its consumers (CLI, hosts).
//!
//! - **[`PollingCoordinator`]**: Runs authenticate → resolve device →
//!   fetch measurements on a timer or on demand, coalesces concurrent
//!   refreshes, keeps the last good [`Snapshot`] in a `watch` channel and
//!   notifies listeners after every cycle.
//!   [`PollingCoordinator::oneshot()`] runs a single cycle for CLI use.
//!
//! - **[`Snapshot`]**: Flat, immutable key → value view of one
//!   measurement response, with per-sensor timestamp, expiry, trend and
//!   thresholds, plus a [`SensorReading`] view carrying unit and freshness.
//!
//! - **[`SchemaTracker`]**: Add-only diff of the sensor-key set, so new
//!   sensors can be announced as they appear.
//!
//! - **[`DeviceResolver`] / [`MeasurementFetcher`]**: Device discovery
//!   with caching, and measurement normalization.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod fetcher;
pub mod resolver;
pub mod schema;
pub mod snapshot;
pub mod units;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{
    DEFAULT_POLL_INTERVAL_HOURS, MAX_POLL_INTERVAL_HOURS, MIN_POLL_INTERVAL_HOURS, PoolConfig,
    poll_interval_from_hours,
};
pub use coordinator::{CoordinatorState, CycleOutcome, ListenerHandle, PollingCoordinator};
pub use error::CoreError;
pub use fetcher::MeasurementFetcher;
pub use resolver::DeviceResolver;
pub use schema::SchemaTracker;
pub use snapshot::{Freshness, SensorReading, Snapshot, Trend};

// Re-export the API types consumers need to build a config.
pub use poolcare_api::{DEFAULT_BASE_URL, Device, TlsMode};
