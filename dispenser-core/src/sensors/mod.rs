//! Sensor readings and the live snapshot
//!
//! ## Reading types
//!
//! | Driver | Reading | Derived |
//! |--------|---------|---------|
//! | Ultrasonic ranger | [`EchoTime`] (round trip, µs) | [`Distance`] in cm and inches |
//! | Environment chip | [`Climate`] | temperature °C, humidity %RH |
//! | Fuel gauge | [`Charge`] | [`BatteryLevel`] percent + [`ChargeState`] |
//! | Pulse counters | [`Pulses`] since last wake | cumulative totals |
//!
//! A [`LiveSnapshot`] holds one wake cycle's worth of derived values. Every
//! field that could not be read is `None`, never a placeholder number.

mod aggregator;

pub use aggregator::{Aggregator, SensorSuite};

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::constants::sensors::{ECHO_US_PER_CM, ECHO_US_PER_INCH};
use crate::metrics::Metric;

/// Ultrasonic echo round-trip time in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoTime(pub u32);

/// Environment chip reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Climate {
    /// Temperature in °C
    pub temperature_c: f32,
    /// Relative humidity in %
    pub humidity_pct: f32,
}

/// Charging state reported by the fuel gauge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeState {
    /// Gauge did not report a state
    #[default]
    Unknown,
    /// Running from the battery
    Discharging,
    /// External power, battery charging
    Charging,
    /// External power, battery full
    Full,
}

/// Fuel gauge reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charge {
    /// Remaining capacity in mAh
    pub remaining_mah: u32,
    /// Charging state
    pub state: ChargeState,
}

/// Pulses counted by the wake-capable inputs since the previous wake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pulses {
    /// Motion detector pulses
    pub motion: u32,
    /// Lid / dispense switch closures
    pub switch: u32,
}

impl Pulses {
    /// Add `other` onto `self` without overflowing
    pub fn accumulate(self, other: Pulses) -> Pulses {
        Pulses {
            motion: self.motion.saturating_add(other.motion),
            switch: self.switch.saturating_add(other.switch),
        }
    }
}

/// Distance to the product surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distance {
    /// Centimetres
    pub cm: f32,
    /// Inches
    pub inches: f32,
}

impl Distance {
    /// Convert an echo round trip (sound travels there and back)
    pub fn from_echo(echo: EchoTime) -> Self {
        let half = echo.0 as f32 / 2.0;
        Self {
            cm: half / ECHO_US_PER_CM,
            inches: half / ECHO_US_PER_INCH,
        }
    }
}

/// Battery level derived from a fuel gauge reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryLevel {
    /// Percent of rated capacity, 0..=100
    pub percent: u8,
    /// Charging state
    pub state: ChargeState,
}

impl BatteryLevel {
    /// Percentage of `capacity_mah`, clamped and rounded
    pub fn from_charge(charge: Charge, capacity_mah: u32) -> Self {
        let percent = if capacity_mah == 0 {
            0
        } else {
            let ratio = charge.remaining_mah as f32 * 100.0 / capacity_mah as f32;
            libm::roundf(ratio.clamp(0.0, 100.0)) as u8
        };

        Self { percent, state: charge.state }
    }
}

/// A sensor that can fail independently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SensorKind {
    /// Ultrasonic ranger
    Ranging = 0,
    /// Environment chip
    Climate = 1,
    /// Fuel gauge
    Battery = 2,
    /// Pulse counters
    Pulses = 3,
}

impl SensorKind {
    /// All sensor kinds
    pub const ALL: [SensorKind; 4] = [
        SensorKind::Ranging,
        SensorKind::Climate,
        SensorKind::Battery,
        SensorKind::Pulses,
    ];

    /// Name for logs
    pub const fn name(&self) -> &'static str {
        match self {
            SensorKind::Ranging => "ranging",
            SensorKind::Climate => "climate",
            SensorKind::Battery => "battery",
            SensorKind::Pulses => "pulses",
        }
    }
}

/// Sensors that were unavailable this cycle
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorFaults(u8);

impl SensorFaults {
    /// No faults
    pub const NONE: SensorFaults = SensorFaults(0);

    /// Record a fault
    pub fn insert(&mut self, kind: SensorKind) {
        self.0 |= 1 << (kind as u8);
    }

    /// Check whether a sensor faulted
    pub const fn contains(&self, kind: SensorKind) -> bool {
        self.0 & (1 << (kind as u8)) != 0
    }

    /// True when every sensor answered plausibly
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Faulted sensors
    pub fn iter(self) -> impl Iterator<Item = SensorKind> {
        SensorKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl fmt::Debug for SensorFaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|k| k.name())).finish()
    }
}

/// Everything measured during one wake cycle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LiveSnapshot {
    /// Distance to the product surface
    pub distance: Option<Distance>,
    /// Temperature in °C
    pub temperature_c: Option<f32>,
    /// Relative humidity in %
    pub humidity_pct: Option<f32>,
    /// Battery level
    pub battery: Option<BatteryLevel>,
    /// Motion pulses since power-on
    pub motion_count: u32,
    /// Switch closures since power-on
    pub switch_count: u32,
    /// Sensors that did not produce a plausible reading
    pub faults: SensorFaults,
}

impl LiveSnapshot {
    /// Numeric value of a metric, `None` when unavailable
    ///
    /// Distance is in centimetres, battery in percent.
    pub fn value(&self, metric: Metric) -> Option<f32> {
        match metric {
            Metric::Distance => self.distance.map(|d| d.cm),
            Metric::Temperature => self.temperature_c,
            Metric::Humidity => self.humidity_pct,
            Metric::Battery => self.battery.map(|b| b.percent as f32),
        }
    }

    /// Whether a metric has a reading this cycle
    pub fn is_available(&self, metric: Metric) -> bool {
        self.value(metric).is_some()
    }

    /// Cumulative pulse totals
    pub fn pulse_totals(&self) -> Pulses {
        Pulses {
            motion: self.motion_count,
            switch: self.switch_count,
        }
    }
}
