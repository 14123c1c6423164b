//! Survivable Snapshot
//!
//! ## Overview
//!
//! Deep sleep powers down RAM except for a small retained region. The engine
//! keeps two things there: the sensor baseline the next wake compares
//! against, and the [`CycleState`] counters.
//!
//! After power loss the region holds whatever the cells settled to, which
//! can look like anything. Nothing in it is trusted until the marker, length
//! and checksum all agree:
//!
//! ```text
//! offset  size  field
//! 0       4     magic "DSRT"
//! 4       2     body length (u16 LE)
//! 6       4     CRC-32 of body (u32 LE)
//! 10      n     body: postcard-encoded RetainedRecord
//! 10+n    ...   zero fill
//! ```
//!
//! An invalid region is a first boot: fresh counters, uninitialised
//! baseline, and a full report.
//!
//! ## Example
//!
//! ```rust
//! use dispenser_core::retained::{MemoryRetained, RetainedStore, SurvivableSnapshot};
//! use dispenser_core::CycleState;
//!
//! let mut store = RetainedStore::new(MemoryRetained::new());
//! assert!(store.load_or_init().first_boot);
//!
//! store.commit(&SurvivableSnapshot::UNINITIALIZED, &CycleState::default()).unwrap();
//! assert!(!store.load_or_init().first_boot);
//! ```

use serde::{Deserialize, Serialize};

use crate::checksum::crc32;
use crate::constants::hardware::RETAINED_REGION_SIZE;
use crate::cycle::CycleState;
use crate::errors::PersistenceWriteError;
use crate::metrics::Metric;
use crate::sensors::LiveSnapshot;
use crate::traits::RetainedMemory;

const MAGIC: [u8; 4] = *b"DSRT";
const HEADER_LEN: usize = 10;

/// Sensor baseline kept across deep sleep
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurvivableSnapshot {
    /// False until a cycle has completed since power-on
    pub initialized: bool,
    /// Last measured distance (cm)
    pub distance_cm: Option<f32>,
    /// Last measured temperature (°C)
    pub temperature_c: Option<f32>,
    /// Last measured humidity (%RH)
    pub humidity_pct: Option<f32>,
    /// Dispenser level was critical after the last cycle
    pub critical: bool,
}

impl Default for SurvivableSnapshot {
    fn default() -> Self {
        Self::UNINITIALIZED
    }
}

impl SurvivableSnapshot {
    /// Sentinel state after power loss
    pub const UNINITIALIZED: SurvivableSnapshot = SurvivableSnapshot {
        initialized: false,
        distance_cm: None,
        temperature_c: None,
        humidity_pct: None,
        critical: false,
    };

    /// Baseline value of a thresholded metric
    pub fn value(&self, metric: Metric) -> Option<f32> {
        match metric {
            Metric::Distance => self.distance_cm,
            Metric::Temperature => self.temperature_c,
            Metric::Humidity => self.humidity_pct,
            Metric::Battery => None,
        }
    }

    /// Baseline for the next wake
    ///
    /// Metrics measured this cycle replace the old values; unavailable ones
    /// keep theirs.
    pub fn updated(&self, live: &LiveSnapshot, critical: bool) -> Self {
        Self {
            initialized: true,
            distance_cm: live.distance.map(|d| d.cm).or(self.distance_cm),
            temperature_c: live.temperature_c.or(self.temperature_c),
            humidity_pct: live.humidity_pct.or(self.humidity_pct),
            critical,
        }
    }
}

/// Contents of the retained region
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RetainedRecord {
    /// Sensor baseline
    pub snapshot: SurvivableSnapshot,
    /// Cycle counters
    pub cycle: CycleState,
}

/// State recovered at wake
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Restored {
    /// Baseline, `UNINITIALIZED` on first boot
    pub snapshot: SurvivableSnapshot,
    /// Counters, zeroed on first boot
    pub cycle: CycleState,
    /// The region did not hold a valid record
    pub first_boot: bool,
}

/// Validated access to the retained region
#[derive(Debug)]
pub struct RetainedStore<M> {
    memory: M,
}

impl<M: RetainedMemory> RetainedStore<M> {
    /// Wrap a retained region
    pub fn new(memory: M) -> Self {
        Self { memory }
    }

    /// Borrow the region
    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// Borrow the region mutably
    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    /// Recover the last committed record, or start fresh
    pub fn load_or_init(&self) -> Restored {
        let mut region = [0u8; RETAINED_REGION_SIZE];
        self.memory.read(&mut region);

        match decode(&region) {
            Some(record) => Restored {
                snapshot: record.snapshot,
                cycle: record.cycle,
                first_boot: false,
            },
            None => {
                log_info!("Retained region invalid, starting from first boot");
                Restored {
                    snapshot: SurvivableSnapshot::UNINITIALIZED,
                    cycle: CycleState::default(),
                    first_boot: true,
                }
            }
        }
    }

    /// Write the record for the next wake
    ///
    /// The region image depends only on the inputs, so committing the same
    /// state twice leaves identical bytes. On failure the marker is cleared,
    /// so the next wake starts from first boot rather than an older record.
    pub fn commit(
        &mut self,
        snapshot: &SurvivableSnapshot,
        cycle: &CycleState,
    ) -> Result<(), PersistenceWriteError> {
        let record = RetainedRecord { snapshot: *snapshot, cycle: *cycle };
        let written = encode(&record).and_then(|region| self.memory.write(&region));
        if written.is_err() {
            self.memory.invalidate();
        }
        written
    }
}

fn encode(record: &RetainedRecord) -> Result<[u8; RETAINED_REGION_SIZE], PersistenceWriteError> {
    let mut region = [0u8; RETAINED_REGION_SIZE];
    let body_len = postcard::to_slice(record, &mut region[HEADER_LEN..])
        .map_err(|_| PersistenceWriteError::Encode)?
        .len();
    let crc = crc32(&region[HEADER_LEN..HEADER_LEN + body_len]);

    region[0..4].copy_from_slice(&MAGIC);
    region[4..6].copy_from_slice(&(body_len as u16).to_le_bytes());
    region[6..10].copy_from_slice(&crc.to_le_bytes());
    Ok(region)
}

fn decode(region: &[u8; RETAINED_REGION_SIZE]) -> Option<RetainedRecord> {
    if region[0..4] != MAGIC {
        return None;
    }

    let body_len = u16::from_le_bytes([region[4], region[5]]) as usize;
    let crc = u32::from_le_bytes([region[6], region[7], region[8], region[9]]);
    let body = region.get(HEADER_LEN..HEADER_LEN + body_len)?;
    if crc32(body) != crc {
        return None;
    }

    postcard::from_bytes(body).ok()
}

/// Retained region in RAM, for tests and the simulator
#[derive(Debug, Clone)]
pub struct MemoryRetained {
    region: [u8; RETAINED_REGION_SIZE],
    fail_writes: bool,
    writes: usize,
    noise: u32,
}

impl Default for MemoryRetained {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRetained {
    /// Region as found after power-on: arbitrary contents
    pub fn new() -> Self {
        let mut memory = Self {
            region: [0; RETAINED_REGION_SIZE],
            fail_writes: false,
            writes: 0,
            noise: 0x1234_5678,
        };
        memory.power_loss();
        memory
    }

    /// Lose power: the region fills with noise
    pub fn power_loss(&mut self) {
        for byte in self.region.iter_mut() {
            // xorshift32, so every power loss leaves different garbage
            self.noise ^= self.noise << 13;
            self.noise ^= self.noise >> 17;
            self.noise ^= self.noise << 5;
            *byte = self.noise as u8;
        }
    }

    /// Make every following write fail
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Raw region contents
    pub fn bytes(&self) -> &[u8; RETAINED_REGION_SIZE] {
        &self.region
    }

    /// Overwrite one byte, as a stray write would
    pub fn corrupt(&mut self, offset: usize) {
        if let Some(byte) = self.region.get_mut(offset) {
            *byte ^= 0x5A;
        }
    }

    /// Number of successful writes
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl RetainedMemory for MemoryRetained {
    fn read(&self, buf: &mut [u8; RETAINED_REGION_SIZE]) {
        buf.copy_from_slice(&self.region);
    }

    fn write(&mut self, bytes: &[u8; RETAINED_REGION_SIZE]) -> Result<(), PersistenceWriteError> {
        if self.fail_writes {
            return Err(PersistenceWriteError::Write);
        }
        self.region = *bytes;
        self.writes += 1;
        Ok(())
    }

    fn invalidate(&mut self) {
        self.region[..MAGIC.len()].fill(0);
    }
}
