//! Sensor Plausibility Limits and Conversions
//!
//! Ranges a reading must fall in before it is trusted. Anything outside is
//! treated exactly like a bus error: the field is unavailable this cycle.

// ===== ENVIRONMENT SENSOR =====

/// Lowest temperature the environment chip reports (°C).
///
/// Source: BME280 operating range
pub const TEMP_SENSOR_MIN_C: f32 = -40.0;

/// Highest temperature the environment chip reports (°C).
///
/// Source: BME280 operating range
pub const TEMP_SENSOR_MAX_C: f32 = 85.0;

/// Lowest relative humidity (%RH).
pub const HUMIDITY_SENSOR_MIN_PCT: f32 = 0.0;

/// Highest relative humidity (%RH).
pub const HUMIDITY_SENSOR_MAX_PCT: f32 = 100.0;

// ===== RANGING SENSOR =====

/// Closest distance the ultrasonic ranger resolves (cm).
///
/// Source: HC-SR04 class transducers, blind zone below 2 cm
pub const DISTANCE_SENSOR_MIN_CM: f32 = 2.0;

/// Farthest distance the ultrasonic ranger resolves (cm).
pub const DISTANCE_SENSOR_MAX_CM: f32 = 400.0;

/// Echo microseconds per centimetre, one way.
///
/// Speed of sound ≈ 343 m/s → 29.1 µs/cm. The echo time covers the round
/// trip, so the measured time is halved first.
pub const ECHO_US_PER_CM: f32 = 29.1;

/// Echo microseconds per inch, one way.
pub const ECHO_US_PER_INCH: f32 = 74.0;
