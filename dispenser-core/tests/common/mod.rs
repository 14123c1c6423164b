//! Shared fixtures for the wake-cycle integration tests
//!
//! This module provides:
//! - Scripted sensors, transport, sleep controller and indicator
//! - A [`Device`] that owns all of them and runs one engine cycle per wake
//! - Power-loss and storage-fault helpers
//!
//! Between wakes only the retained region and the config store carry state,
//! exactly as on hardware; the engine itself is rebuilt each wake.

#![allow(dead_code)]

pub mod devices;

use dispenser_core::config::MemoryNvStorage;
use dispenser_core::retained::{MemoryRetained, Restored};
use dispenser_core::sensors::SensorSuite;
use dispenser_core::time::FixedTime;
use dispenser_core::{
    ConfigStore, CycleReport, DevicePolicy, Engine, NextAction, PersistentConfig, RetainedStore,
    WakeInputs,
};

pub use devices::{
    ScriptedClimate, ScriptedCloud, ScriptedGauge, ScriptedPulses, ScriptedRanging, SleepLog,
    StatusLog,
};

/// Connection string used by every provisioned fixture
pub const CONNECTION_STRING: &str =
    "HostName=hub.example.net;DeviceId=disp-01;SharedAccessKey=a2V5";

/// Start of the simulated clock, ms since the epoch
pub const START_MS: u64 = 1_700_000_000_000;

pub type Sensors = SensorSuite<ScriptedRanging, ScriptedClimate, ScriptedGauge, ScriptedPulses>;

/// Configuration with test credentials and default intervals
pub fn provisioned_config() -> PersistentConfig {
    PersistentConfig::new(CONNECTION_STRING, "dispenser-lab", "hunter22").expect("fixture fits")
}

/// A dispenser on the bench
pub struct Device {
    pub retained: RetainedStore<MemoryRetained>,
    pub config: ConfigStore<MemoryNvStorage>,
    pub sensors: Sensors,
    pub cloud: ScriptedCloud,
    pub sleep: SleepLog,
    pub status: StatusLog,
    pub clock: FixedTime,
    pub policy: DevicePolicy,
}

impl Device {
    /// Freshly powered device with no configuration
    pub fn unprovisioned() -> Self {
        Self {
            retained: RetainedStore::new(MemoryRetained::new()),
            config: ConfigStore::new(MemoryNvStorage::new()),
            // 10.0 cm to the product, room climate, battery about 75%
            sensors: SensorSuite::new(
                ScriptedRanging::at_mm(100),
                ScriptedClimate::at(21.0, 40.0),
                ScriptedGauge::at(2000),
                ScriptedPulses::default(),
            ),
            cloud: ScriptedCloud::online(),
            sleep: SleepLog::default(),
            status: StatusLog::default(),
            clock: FixedTime::new(START_MS),
            policy: DevicePolicy::default(),
        }
    }

    /// Freshly powered device with the fixture configuration stored
    pub fn provisioned() -> Self {
        Self::with_config(&provisioned_config())
    }

    pub fn with_config(config: &PersistentConfig) -> Self {
        let mut device = Self::unprovisioned();
        device.config.save(config).expect("fixture config saves");
        device
    }

    /// One wake cycle
    ///
    /// Advances the clock by the chosen sleep, as the wake timer would.
    pub fn wake(&mut self) -> CycleReport {
        self.wake_with(WakeInputs::default())
    }

    pub fn wake_with(&mut self, inputs: WakeInputs) -> CycleReport {
        let engine = Engine::new(self.policy);
        let mut io = dispenser_core::engine::CycleIo {
            retained: &mut self.retained,
            config: &self.config,
            sensors: &mut self.sensors,
            transport: &mut self.cloud,
            clock: &self.clock,
            indicator: &mut self.status,
            sleep: &mut self.sleep,
        };
        let report = engine.run_cycle(&mut io, inputs);

        if let NextAction::Sleep(duration) = report.action {
            self.clock.advance(duration.as_millis() as u64);
        }
        report
    }

    /// Wake `n` times, returning every cycle summary
    pub fn wake_n(&mut self, n: usize) -> Vec<CycleReport> {
        (0..n).map(|_| self.wake()).collect()
    }

    /// Remove power: retained contents become noise
    pub fn power_loss(&mut self) {
        self.retained.memory_mut().power_loss();
    }

    /// What the next wake will find in the retained region
    pub fn restored(&self) -> Restored {
        self.retained.load_or_init()
    }
}
