//! Reporting Thresholds
//!
//! Minimum changes considered significant, and the maximum number of quiet
//! wake cycles tolerated before a full report is forced. These are fixed for
//! the device class; tests and simulations override them through
//! [`crate::evaluator::ThresholdPolicy`].

/// Distance change that is worth reporting (cm).
///
/// The dispenser level moves in whole centimetres per refill or heavy use;
/// smaller changes are ultrasonic echo jitter.
pub const DISTANCE_DELTA_CM: f32 = 2.0;

/// Temperature change that is worth reporting (°C).
pub const TEMPERATURE_DELTA_C: f32 = 2.0;

/// Relative humidity change that is worth reporting (%RH).
pub const HUMIDITY_DELTA_PCT: f32 = 2.0;

/// Quiet cycles tolerated before a forced full report.
///
/// With the default 10 minute sleep, 23 quiet cycles plus the forced one
/// bound staleness to four hours.
pub const MAX_CYCLES_WITHOUT_SYNC: u16 = 23;

/// Distance below which the dispenser is in a critical state (cm).
///
/// An echo this short means something sits directly under the sensor:
/// an overfilled reservoir or an obstruction. Always reported in full.
pub const CRITICAL_DISTANCE_CM: f32 = 3.0;
