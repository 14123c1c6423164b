//! Temperature and humidity validators
//!
//! Both readings come from the same environment chip and share its failure
//! modes: a disconnected chip reads as all-ones, which compensates to the top
//! of each range.

use super::{utils, ValidatorConstraints, Validator};
use crate::constants::sensors::{
    HUMIDITY_SENSOR_MAX_PCT, HUMIDITY_SENSOR_MIN_PCT, TEMP_SENSOR_MAX_C, TEMP_SENSOR_MIN_C,
};
use crate::errors::SensorError;

/// Temperature validator for Celsius readings
#[derive(Debug, Clone)]
pub struct TemperatureValidator {
    min_celsius: f32,
    max_celsius: f32,
}

impl Default for TemperatureValidator {
    fn default() -> Self {
        Self {
            min_celsius: TEMP_SENSOR_MIN_C,
            max_celsius: TEMP_SENSOR_MAX_C,
        }
    }
}

impl Validator for TemperatureValidator {
    fn validate(&self, value: f32) -> Result<f32, SensorError> {
        utils::check_range(value, self.min_celsius, self.max_celsius)
    }

    fn constraints(&self) -> ValidatorConstraints {
        ValidatorConstraints {
            min_value: self.min_celsius,
            max_value: self.max_celsius,
        }
    }
}

/// Relative humidity validator (%RH)
#[derive(Debug, Clone)]
pub struct HumidityValidator {
    min_pct: f32,
    max_pct: f32,
}

impl Default for HumidityValidator {
    fn default() -> Self {
        Self {
            min_pct: HUMIDITY_SENSOR_MIN_PCT,
            max_pct: HUMIDITY_SENSOR_MAX_PCT,
        }
    }
}

impl Validator for HumidityValidator {
    fn validate(&self, value: f32) -> Result<f32, SensorError> {
        utils::check_range(value, self.min_pct, self.max_pct)
    }

    fn constraints(&self) -> ValidatorConstraints {
        ValidatorConstraints {
            min_value: self.min_pct,
            max_value: self.max_pct,
        }
    }
}
