//! Wall-clock time for report timestamps
//!
//! Time comes from an NTP-like collaborator that may not have synchronised
//! yet, may have lost its server, or may not exist at all. Decisions never
//! depend on it; it only stamps reports and log lines. `None` is normal.

use crate::constants::time::MS_PER_SECOND;

/// Timestamp in milliseconds since the Unix epoch
pub type Timestamp = u64;

/// Source of wall-clock time
pub trait TimeSource {
    /// Current time, or `None` when the clock is not synchronised
    fn now(&self) -> Option<Timestamp>;

    /// Current time in whole seconds
    fn now_secs(&self) -> Option<u64> {
        self.now().map(|ms| ms / MS_PER_SECOND)
    }
}

/// Clock that never synchronised
///
/// The default on a cold boot before any network contact.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unsynchronized;

impl TimeSource for Unsynchronized {
    fn now(&self) -> Option<Timestamp> {
        None
    }
}

/// System time source (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTime;

#[cfg(feature = "std")]
impl TimeSource for SystemTime {
    fn now(&self) -> Option<Timestamp> {
        use std::time::{SystemTime as StdSystemTime, UNIX_EPOCH};

        StdSystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .map(|d| d.as_millis() as Timestamp)
    }
}

/// Fixed time source for testing and simulation
#[derive(Debug, Clone)]
pub struct FixedTime {
    timestamp: Timestamp,
}

impl FixedTime {
    /// Clock frozen at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    /// Jump to a new time
    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Move forward, e.g. by one simulated sleep
    pub fn advance(&mut self, ms: u64) {
        self.timestamp = self.timestamp.saturating_add(ms);
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Option<Timestamp> {
        Some(self.timestamp)
    }
}
