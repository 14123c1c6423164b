//! Scripted collaborators
//!
//! Each mock holds the value it will report on the next read. Tests change
//! the value between wakes to move the simulated world.

use core::time::Duration;

use dispenser_core::connectivity::Credentials;
use dispenser_core::errors::{ConnError, SendError, SensorError};
use dispenser_core::sensors::{Charge, ChargeState, Climate, EchoTime, Pulses};
use dispenser_core::traits::{DeviceStatus, Sensor, SleepPlatform, StatusIndicator, Transport};

/// Ultrasonic ranger
pub struct ScriptedRanging {
    pub next: Result<EchoTime, SensorError>,
}

impl ScriptedRanging {
    pub fn at_mm(mm: u32) -> Self {
        let mut ranging = Self { next: Ok(EchoTime(0)) };
        ranging.set_mm(mm);
        ranging
    }

    /// Echo for a target `mm` away, truncated to whole microseconds
    ///
    /// 100 mm gives exactly 582 us, i.e. 10.0 cm.
    pub fn set_mm(&mut self, mm: u32) {
        self.next = Ok(EchoTime(mm * 582 / 100));
    }

    pub fn fail(&mut self) {
        self.next = Err(SensorError::Timeout);
    }
}

impl Sensor for ScriptedRanging {
    type Reading = EchoTime;

    fn read(&mut self) -> Result<EchoTime, SensorError> {
        self.next
    }
}

/// Temperature / humidity chip
pub struct ScriptedClimate {
    pub next: Result<Climate, SensorError>,
}

impl ScriptedClimate {
    pub fn at(temperature_c: f32, humidity_pct: f32) -> Self {
        Self { next: Ok(Climate { temperature_c, humidity_pct }) }
    }

    pub fn set(&mut self, temperature_c: f32, humidity_pct: f32) {
        self.next = Ok(Climate { temperature_c, humidity_pct });
    }
}

impl Sensor for ScriptedClimate {
    type Reading = Climate;

    fn read(&mut self) -> Result<Climate, SensorError> {
        self.next
    }
}

/// Fuel gauge
pub struct ScriptedGauge {
    pub next: Result<Charge, SensorError>,
}

impl ScriptedGauge {
    pub fn at(remaining_mah: u32) -> Self {
        Self {
            next: Ok(Charge { remaining_mah, state: ChargeState::Discharging }),
        }
    }
}

impl Sensor for ScriptedGauge {
    type Reading = Charge;

    fn read(&mut self) -> Result<Charge, SensorError> {
        self.next
    }
}

/// Pulse counters, cleared by each read like the hardware's
#[derive(Default)]
pub struct ScriptedPulses {
    pub pending: Pulses,
}

impl ScriptedPulses {
    pub fn add(&mut self, motion: u32, switch: u32) {
        self.pending = self.pending.accumulate(Pulses { motion, switch });
    }
}

impl Sensor for ScriptedPulses {
    type Reading = Pulses;

    fn read(&mut self) -> Result<Pulses, SensorError> {
        Ok(core::mem::take(&mut self.pending))
    }
}

/// Cloud endpoint with a switchable link
pub struct ScriptedCloud {
    pub online: bool,
    pub reject_sends: bool,
    pub connects: usize,
    pub disconnects: usize,
    pub sent: Vec<Vec<u8>>,
}

impl ScriptedCloud {
    pub fn online() -> Self {
        Self {
            online: true,
            reject_sends: false,
            connects: 0,
            disconnects: 0,
            sent: Vec::new(),
        }
    }

    /// Last delivered body as JSON
    pub fn last_report(&self) -> serde_json::Value {
        let body = self.sent.last().expect("no report delivered");
        serde_json::from_slice(body).expect("report is not JSON")
    }
}

impl Transport for ScriptedCloud {
    type Handle = u32;

    fn connect(
        &mut self,
        _credentials: &Credentials<'_>,
        _timeout: Duration,
    ) -> Result<u32, ConnError> {
        self.connects += 1;
        if self.online {
            Ok(self.connects as u32)
        } else {
            Err(ConnError::Unavailable)
        }
    }

    fn send(
        &mut self,
        _handle: &mut u32,
        payload: &[u8],
        _timeout: Duration,
    ) -> Result<(), SendError> {
        if self.reject_sends {
            return Err(SendError::Rejected { reason: "quota exceeded" });
        }
        self.sent.push(payload.to_vec());
        Ok(())
    }

    fn disconnect(&mut self, _handle: u32) {
        self.disconnects += 1;
    }
}

/// Sleep controller that records instead of suspending
#[derive(Default)]
pub struct SleepLog {
    pub slept: Vec<Duration>,
}

impl SleepPlatform for SleepLog {
    fn deep_sleep(&mut self, duration: Duration) {
        self.slept.push(duration);
    }
}

/// Indicator that remembers every status shown
#[derive(Default)]
pub struct StatusLog {
    pub shown: Vec<DeviceStatus>,
}

impl StatusIndicator for StatusLog {
    fn show(&mut self, status: DeviceStatus) {
        self.shown.push(status);
    }
}
