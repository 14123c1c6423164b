//! Ultrasonic distance validator

use super::{utils, ValidatorConstraints, Validator};
use crate::constants::sensors::{DISTANCE_SENSOR_MAX_CM, DISTANCE_SENSOR_MIN_CM};
use crate::errors::SensorError;

/// Distance validator for centimetre readings
///
/// Below the transducer's blind zone the echo overlaps the ping; beyond the
/// maximum the echo is usually a reflection off the housing.
#[derive(Debug, Clone)]
pub struct DistanceValidator {
    min_cm: f32,
    max_cm: f32,
}

impl Default for DistanceValidator {
    fn default() -> Self {
        Self {
            min_cm: DISTANCE_SENSOR_MIN_CM,
            max_cm: DISTANCE_SENSOR_MAX_CM,
        }
    }
}

impl Validator for DistanceValidator {
    fn validate(&self, value: f32) -> Result<f32, SensorError> {
        utils::check_range(value, self.min_cm, self.max_cm)
    }

    fn constraints(&self) -> ValidatorConstraints {
        ValidatorConstraints {
            min_value: self.min_cm,
            max_value: self.max_cm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_range() {
        let validator = DistanceValidator::default();

        assert!(validator.validate(10.0).is_ok());
        assert!(validator.validate(1.0).is_err());
        assert!(validator.validate(450.0).is_err());
    }
}
