//! Synthetic dispenser environment
//!
//! A slowly emptying dispenser in a room whose climate follows a daily
//! cycle. Each wake samples the world once and hands the raw readings to the
//! probe drivers.

use std::f32::consts::TAU;

use dispenser_core::constants::hardware::BATTERY_CAPACITY_MAH;
use dispenser_core::constants::sensors::ECHO_US_PER_CM;
use dispenser_core::sensors::{Charge, ChargeState, Climate, EchoTime, Pulses};

/// Uses per wake over a repeating six-wake pattern
const USAGE_PATTERN: [u32; 6] = [0, 0, 1, 3, 2, 0];

/// Wakes per simulated day for the climate cycle
const WAKES_PER_DAY: f32 = 144.0;

/// Charge drawn by one wake, radio or not
const DRAIN_PER_WAKE_MAH: f32 = 1.5;

/// Raw readings for one wake
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub echo: EchoTime,
    pub climate: Climate,
    pub charge: Charge,
    pub pulses: Pulses,
}

/// Shape of the simulated world
#[derive(Debug, Clone, Copy)]
pub struct WorldParams {
    /// Level reading of a full dispenser
    pub full_cm: f32,
    /// Level lost per use
    pub usage_cm: f32,
    /// Refill when the level falls below this
    pub refill_below_cm: f32,
}

/// State of the simulated world between wakes
#[derive(Debug)]
pub struct World {
    params: WorldParams,
    level_cm: f32,
    charge_mah: f32,
    wake: u32,
}

impl World {
    pub fn new(params: WorldParams) -> Self {
        Self {
            params,
            level_cm: params.full_cm,
            charge_mah: BATTERY_CAPACITY_MAH as f32,
            wake: 0,
        }
    }

    pub fn level_cm(&self) -> f32 {
        self.level_cm
    }

    /// Advance one wake and sample
    pub fn step(&mut self) -> Sample {
        let uses = USAGE_PATTERN[self.wake as usize % USAGE_PATTERN.len()];
        self.level_cm = (self.level_cm - uses as f32 * self.params.usage_cm).max(0.0);

        // Servicing opens the door once
        let mut switch = 0;
        if self.level_cm < self.params.refill_below_cm {
            self.level_cm = self.params.full_cm;
            switch = 1;
        }

        self.charge_mah = (self.charge_mah - DRAIN_PER_WAKE_MAH).max(0.0);

        let phase = self.wake as f32 / WAKES_PER_DAY * TAU;
        let temperature_c = 21.0 + 3.0 * phase.sin();
        let humidity_pct = 45.0 - 8.0 * phase.sin() + 2.0 * (phase * 5.0).cos();

        self.wake += 1;

        Sample {
            echo: EchoTime((self.level_cm * 2.0 * ECHO_US_PER_CM).round() as u32),
            climate: Climate { temperature_c, humidity_pct },
            charge: Charge {
                remaining_mah: self.charge_mah as u32,
                state: ChargeState::Discharging,
            },
            pulses: Pulses { motion: uses, switch },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispenser_core::sensors::Distance;

    fn params() -> WorldParams {
        WorldParams { full_cm: 20.0, usage_cm: 0.5, refill_below_cm: 2.5 }
    }

    #[test]
    fn echo_matches_level() {
        let mut world = World::new(params());
        let sample = world.step();
        let distance = Distance::from_echo(sample.echo);
        assert!((distance.cm - world.level_cm()).abs() < 0.05);
    }

    #[test]
    fn usage_empties_then_refills() {
        let mut world = World::new(params());
        let mut motion = 0;
        let mut refills = 0;
        for _ in 0..60 {
            let sample = world.step();
            motion += sample.pulses.motion;
            refills += sample.pulses.switch;
        }
        assert_eq!(motion, 60);
        assert!(refills >= 1);
        assert!(world.level_cm() >= params().refill_below_cm);
    }
}
