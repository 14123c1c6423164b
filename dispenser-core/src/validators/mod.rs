//! Reading Plausibility Validators
//!
//! ## Overview
//!
//! A sensor that answers is not necessarily a sensor that is right. A loose
//! I2C connector returns 0xFFFF, which the environment chip's compensation
//! turns into 85 °C or 100 %RH; an ultrasonic echo that misses the surface
//! reports several metres. Values like these must never reach the threshold
//! evaluator, because a fabricated jump would trigger a report and then
//! become the baseline for every later comparison.
//!
//! Each validator checks one reading against what the transducer can
//! physically produce. A rejected reading is handled exactly like a bus
//! error: the field is unavailable for this cycle.
//!
//! ## Validation Layers
//!
//! ### 1. Number Validation
//! NaN and infinities are rejected outright.
//!
//! ### 2. Range Validation
//! Datasheet limits of the transducer:
//! ```rust
//! use dispenser_core::constants::sensors::{TEMP_SENSOR_MIN_C, TEMP_SENSOR_MAX_C};
//!
//! assert!(TEMP_SENSOR_MIN_C < TEMP_SENSOR_MAX_C);
//! ```
//!
//! Rate-of-change checks are deliberately absent: consecutive readings are a
//! full sleep interval apart, and a refill really does move the level by
//! tens of centimetres between two wakes.
//!
//! ## Usage Example
//!
//! ```rust
//! use dispenser_core::validators::{TemperatureValidator, Validator};
//!
//! let validator = TemperatureValidator::default();
//! assert_eq!(validator.validate(21.5), Ok(21.5));
//! assert!(validator.validate(f32::NAN).is_err());
//! ```

mod climate;
mod distance;
mod utils;

pub use climate::{HumidityValidator, TemperatureValidator};
pub use distance::DistanceValidator;
pub use utils::{check_range, Validatable};

use crate::errors::SensorError;

/// Plausible range of a validator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatorConstraints {
    /// Lowest plausible value
    pub min_value: f32,
    /// Highest plausible value
    pub max_value: f32,
}

/// Plausibility check for one kind of reading
pub trait Validator {
    /// Return the value unchanged when plausible
    fn validate(&self, value: f32) -> Result<f32, SensorError>;

    /// Range this validator accepts
    fn constraints(&self) -> ValidatorConstraints;
}
