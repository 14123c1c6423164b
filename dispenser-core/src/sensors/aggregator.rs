//! Live reading aggregation
//!
//! Reads every driver once, converts raw readings to report units, and runs
//! each value through its plausibility validator. A failed or implausible
//! read never stops the capture; it only clears that field.

use crate::constants::hardware::BATTERY_CAPACITY_MAH;
use crate::errors::SensorError;
use crate::traits::Sensor;
use crate::validators::{DistanceValidator, HumidityValidator, TemperatureValidator, Validator};

use super::{
    BatteryLevel, Charge, Climate, Distance, EchoTime, LiveSnapshot, Pulses, SensorFaults,
    SensorKind,
};

/// The dispenser's sensor drivers
#[derive(Debug)]
pub struct SensorSuite<R, C, B, P> {
    /// Ultrasonic ranger
    pub ranging: R,
    /// Temperature / humidity chip
    pub climate: C,
    /// Fuel gauge
    pub battery: B,
    /// Motion and switch pulse counters
    pub pulses: P,
}

impl<R, C, B, P> SensorSuite<R, C, B, P>
where
    R: Sensor<Reading = EchoTime>,
    C: Sensor<Reading = Climate>,
    B: Sensor<Reading = Charge>,
    P: Sensor<Reading = Pulses>,
{
    /// Bundle the four drivers
    pub fn new(ranging: R, climate: C, battery: B, pulses: P) -> Self {
        Self { ranging, climate, battery, pulses }
    }
}

/// Turns raw driver output into a [`LiveSnapshot`]
#[derive(Debug, Clone)]
pub struct Aggregator {
    distance: DistanceValidator,
    temperature: TemperatureValidator,
    humidity: HumidityValidator,
    battery_capacity_mah: u32,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self {
            distance: DistanceValidator::default(),
            temperature: TemperatureValidator::default(),
            humidity: HumidityValidator::default(),
            battery_capacity_mah: BATTERY_CAPACITY_MAH,
        }
    }
}

impl Aggregator {
    /// Aggregator with custom validators and battery capacity
    pub fn new(
        distance: DistanceValidator,
        temperature: TemperatureValidator,
        humidity: HumidityValidator,
        battery_capacity_mah: u32,
    ) -> Self {
        Self { distance, temperature, humidity, battery_capacity_mah }
    }

    /// Read all sensors once
    ///
    /// `totals` are the cumulative pulse counts before this wake; the
    /// snapshot carries them plus whatever the counters saw since.
    pub fn capture<R, C, B, P>(
        &self,
        sensors: &mut SensorSuite<R, C, B, P>,
        totals: Pulses,
    ) -> LiveSnapshot
    where
        R: Sensor<Reading = EchoTime>,
        C: Sensor<Reading = Climate>,
        B: Sensor<Reading = Charge>,
        P: Sensor<Reading = Pulses>,
    {
        let mut faults = SensorFaults::NONE;

        let distance = self
            .read_distance(&mut sensors.ranging)
            .map_err(|e| note_fault(&mut faults, SensorKind::Ranging, e))
            .ok();

        let (temperature_c, humidity_pct) = match sensors.climate.read() {
            Ok(climate) => {
                // The two channels are validated separately; a humidity
                // glitch must not discard a good temperature
                let t = self.temperature.validate(climate.temperature_c);
                let h = self.humidity.validate(climate.humidity_pct);
                if let Err(e) = t.and(h) {
                    note_fault(&mut faults, SensorKind::Climate, e);
                }
                (t.ok(), h.ok())
            }
            Err(e) => {
                note_fault(&mut faults, SensorKind::Climate, e);
                (None, None)
            }
        };

        let battery = sensors
            .battery
            .read()
            .map(|charge| BatteryLevel::from_charge(charge, self.battery_capacity_mah))
            .map_err(|e| note_fault(&mut faults, SensorKind::Battery, e))
            .ok();

        let pulses = match sensors.pulses.read() {
            Ok(pulses) => pulses,
            Err(e) => {
                note_fault(&mut faults, SensorKind::Pulses, e);
                Pulses::default()
            }
        };
        let totals = totals.accumulate(pulses);

        LiveSnapshot {
            distance,
            temperature_c,
            humidity_pct,
            battery,
            motion_count: totals.motion,
            switch_count: totals.switch,
            faults,
        }
    }

    fn read_distance<R>(&self, ranging: &mut R) -> Result<Distance, SensorError>
    where
        R: Sensor<Reading = EchoTime>,
    {
        let distance = Distance::from_echo(ranging.read()?);
        self.distance.validate(distance.cm)?;
        Ok(distance)
    }
}

#[cfg_attr(not(feature = "log"), allow(unused_variables))]
fn note_fault(faults: &mut SensorFaults, kind: SensorKind, err: SensorError) {
    log_warn!("{} reading unavailable: {}", kind.name(), err);
    faults.insert(kind);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::ChargeState;

    struct Fixed<T>(Result<T, SensorError>);

    impl<T: Copy> Sensor for Fixed<T> {
        type Reading = T;
        fn read(&mut self) -> Result<T, SensorError> {
            self.0
        }
    }

    fn suite(
        echo: Result<EchoTime, SensorError>,
        climate: Result<Climate, SensorError>,
    ) -> SensorSuite<Fixed<EchoTime>, Fixed<Climate>, Fixed<Charge>, Fixed<Pulses>> {
        SensorSuite::new(
            Fixed(echo),
            Fixed(climate),
            Fixed(Ok(Charge { remaining_mah: 2650, state: ChargeState::Full })),
            Fixed(Ok(Pulses { motion: 2, switch: 1 })),
        )
    }

    const ROOM: Climate = Climate { temperature_c: 21.0, humidity_pct: 45.0 };

    #[test]
    fn healthy_capture() {
        let mut sensors = suite(Ok(EchoTime(582)), Ok(ROOM));
        let live = Aggregator::default().capture(&mut sensors, Pulses { motion: 10, switch: 4 });

        assert!(live.faults.is_empty());
        assert!(live.distance.is_some());
        assert_eq!(live.temperature_c, Some(21.0));
        assert_eq!(live.battery.map(|b| b.percent), Some(100));
        assert_eq!(live.motion_count, 12);
        assert_eq!(live.switch_count, 5);
    }

    #[test]
    fn bus_error_clears_only_that_field() {
        let mut sensors = suite(Err(SensorError::Timeout), Ok(ROOM));
        let live = Aggregator::default().capture(&mut sensors, Pulses::default());

        assert_eq!(live.distance, None);
        assert!(live.faults.contains(SensorKind::Ranging));
        assert_eq!(live.humidity_pct, Some(45.0));
    }

    #[test]
    fn implausible_echo_is_unavailable() {
        // 30 ms round trip is over five metres
        let mut sensors = suite(Ok(EchoTime(30_000)), Ok(ROOM));
        let live = Aggregator::default().capture(&mut sensors, Pulses::default());

        assert_eq!(live.distance, None);
        assert!(live.faults.contains(SensorKind::Ranging));
    }

    #[test]
    fn climate_channels_validated_independently() {
        let glitch = Climate { temperature_c: 22.0, humidity_pct: 130.0 };
        let mut sensors = suite(Ok(EchoTime(582)), Ok(glitch));
        let live = Aggregator::default().capture(&mut sensors, Pulses::default());

        assert_eq!(live.temperature_c, Some(22.0));
        assert_eq!(live.humidity_pct, None);
        assert!(live.faults.contains(SensorKind::Climate));
    }

    #[test]
    fn failed_pulse_read_adds_nothing() {
        let mut sensors = suite(Ok(EchoTime(582)), Ok(ROOM));
        sensors.pulses = Fixed(Err(SensorError::Bus));
        let live = Aggregator::default().capture(&mut sensors, Pulses { motion: 7, switch: 3 });

        assert_eq!(live.motion_count, 7);
        assert_eq!(live.switch_count, 3);
        assert!(live.faults.contains(SensorKind::Pulses));
    }
}
