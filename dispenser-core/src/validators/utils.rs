//! Shared validation helpers

use crate::errors::SensorError;

/// Values that can be checked for being a real number
pub trait Validatable {
    /// Check if the value is a finite number
    fn is_valid(&self) -> bool;
}

impl Validatable for f32 {
    fn is_valid(&self) -> bool {
        self.is_finite()
    }
}

/// Reject non-numbers and values outside `[min, max]`
pub fn check_range(value: f32, min: f32, max: f32) -> Result<f32, SensorError> {
    if !value.is_valid() {
        return Err(SensorError::InvalidValue);
    }
    if value < min || value > max {
        return Err(SensorError::OutOfRange { value, min, max });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_check() {
        assert_eq!(check_range(5.0, 0.0, 10.0), Ok(5.0));
        assert!(check_range(-1.0, 0.0, 10.0).is_err());
        assert!(check_range(11.0, 0.0, 10.0).is_err());
    }

    #[test]
    fn bounds_are_inclusive() {
        assert!(check_range(0.0, 0.0, 10.0).is_ok());
        assert!(check_range(10.0, 0.0, 10.0).is_ok());
    }

    #[test]
    fn validatable_floats() {
        assert!(5.0f32.is_valid());
        assert!(!f32::NAN.is_valid());
        assert!(!f32::INFINITY.is_valid());
        assert_eq!(check_range(f32::NAN, 0.0, 1.0), Err(SensorError::InvalidValue));
    }
}
