//! Collaborator traits
//!
//! Everything the engine does not own - sensor buses, the radio, flash, the
//! retained RAM region, the sleep controller, the LEDs - sits behind one of
//! these traits. Keep them small: a firmware port implements each in a few
//! lines over its HAL, and tests implement them over plain memory.

use core::time::Duration;

use crate::connectivity::Credentials;
use crate::constants::hardware::RETAINED_REGION_SIZE;
use crate::errors::{ConnError, PersistenceWriteError, SendError, SensorError, StorageError};

/// A sensor driver
///
/// Any error makes the reading unavailable for this cycle; the engine never
/// retries a failed read.
pub trait Sensor {
    /// Raw reading produced by this driver
    type Reading;

    /// Perform one blocking read
    fn read(&mut self) -> Result<Self::Reading, SensorError>;
}

/// Network and cloud transport
///
/// Both operations must return within the given timeout. A timeout is
/// reported as `ConnError::Timeout` / `SendError::Timeout`, never as a hang.
pub trait Transport {
    /// Live connection handle
    type Handle;

    /// Bring the link up and open a session with the endpoint
    fn connect(&mut self, credentials: &Credentials<'_>, timeout: Duration)
        -> Result<Self::Handle, ConnError>;

    /// Deliver one report body
    fn send(&mut self, handle: &mut Self::Handle, payload: &[u8], timeout: Duration)
        -> Result<(), SendError>;

    /// Tear the session down and power the radio off
    fn disconnect(&mut self, handle: Self::Handle) {
        drop(handle);
    }
}

/// One of the two configuration slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// First slot
    A,
    /// Second slot
    B,
}

impl Slot {
    /// The slot that is not `self`
    pub const fn other(self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }
}

/// Non-volatile storage that survives power loss
///
/// Has finite write endurance; written only on genuine configuration changes.
pub trait NvStorage {
    /// Bytes available in each slot
    fn slot_capacity(&self) -> usize;

    /// Copy a slot into `buf`, returning the stored length (0 when blank)
    fn read_slot(&self, slot: Slot, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Replace the contents of a slot
    fn write_slot(&mut self, slot: Slot, bytes: &[u8]) -> Result<(), StorageError>;
}

/// Memory that survives deep sleep but not power loss
///
/// After power-on the contents are arbitrary; callers must validate.
pub trait RetainedMemory {
    /// Copy the whole region out
    fn read(&self, buf: &mut [u8; RETAINED_REGION_SIZE]);

    /// Overwrite the whole region
    fn write(&mut self, bytes: &[u8; RETAINED_REGION_SIZE]) -> Result<(), PersistenceWriteError>;

    /// Clear the record marker so the next read never validates
    ///
    /// Called after a failed `write`. It must still take effect when
    /// whole-region writes are failing, so implementations touch as little
    /// as possible.
    fn invalidate(&mut self);
}

/// Deep-sleep controller
pub trait SleepPlatform {
    /// Arm the wake timer and suspend
    ///
    /// On hardware this does not return; the next wake starts from reset.
    fn deep_sleep(&mut self, duration: Duration);
}

/// What the status LEDs should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    /// Sensors being read
    Measuring,
    /// Radio up, report in flight
    Posting,
    /// Report acknowledged
    Delivered,
    /// Connection or delivery failed this cycle
    ConnectFailed,
    /// At least one sensor was unavailable
    SensorFault,
    /// Provisioning access point active
    Provisioning,
}

/// Status LEDs
pub trait StatusIndicator {
    /// Show a status; must not block
    fn show(&mut self, status: DeviceStatus);
}

/// Indicator that shows nothing, for boards without LEDs
#[derive(Debug, Default, Clone, Copy)]
pub struct NullIndicator;

impl StatusIndicator for NullIndicator {
    fn show(&mut self, _status: DeviceStatus) {}
}
