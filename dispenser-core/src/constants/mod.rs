//! Constants for the Dispenser Engine
//!
//! Device-class values live here so the decision code never contains magic
//! numbers. Per-device values (credentials, post intervals) are not constants;
//! they come from [`crate::config::PersistentConfig`].
//!
//! ## Organization
//!
//! - **Thresholds**: deltas that make a reading worth reporting, staleness bound
//! - **Sensors**: plausibility ranges and unit conversions
//! - **Hardware**: battery, retained region and message limits
//! - **Time**: sleep intervals and network timeouts
//!
//! ## Usage Guidelines
//!
//! 1. Reference these from policy `Default` impls, not from algorithms
//! 2. Include units in names
//! 3. Note where a value comes from when it is not obvious

/// Reporting thresholds and forced-sync bound.
pub mod thresholds;

/// Sensor plausibility limits and conversion factors.
pub mod sensors;

/// Battery, memory and message size limits of the device.
pub mod hardware;

/// Sleep intervals and network timeouts.
pub mod time;

// Re-export commonly used constants for convenience
pub use thresholds::{
    DISTANCE_DELTA_CM, TEMPERATURE_DELTA_C, HUMIDITY_DELTA_PCT,
    MAX_CYCLES_WITHOUT_SYNC, CRITICAL_DISTANCE_CM,
};

pub use hardware::{
    BATTERY_CAPACITY_MAH, MAX_DEVICE_ID_LEN, MESSAGE_MAX_LEN, RETAINED_REGION_SIZE,
};

pub use time::{DEFAULT_DEEP_SLEEP_SECS, MAX_DEEP_SLEEP_SECS};
