//! Host stand-ins for the board's collaborators

use core::ops::Range;
use core::time::Duration;

use dispenser_core::connectivity::Credentials;
use dispenser_core::errors::{ConnError, SendError, SensorError};
use dispenser_core::traits::{DeviceStatus, Sensor, SleepPlatform, StatusIndicator, Transport};
use log::{debug, info, warn};

/// Driver that returns whatever the world last put in it
#[derive(Debug)]
pub struct Probe<T> {
    next: Result<T, SensorError>,
}

impl<T> Probe<T> {
    pub fn new(value: T) -> Self {
        Self { next: Ok(value) }
    }

    pub fn set(&mut self, value: T) {
        self.next = Ok(value);
    }
}

impl<T: Copy> Sensor for Probe<T> {
    type Reading = T;

    fn read(&mut self) -> Result<T, SensorError> {
        self.next
    }
}

/// Transport that logs report bodies instead of sending them
///
/// The link is down for every wake inside `outage`.
#[derive(Debug, Default)]
pub struct LoggingTransport {
    outage: Option<Range<u32>>,
    wake: u32,
    pub delivered: u32,
}

impl LoggingTransport {
    pub fn new(outage: Option<Range<u32>>) -> Self {
        Self { outage, ..Default::default() }
    }

    /// Tell the transport which wake is running
    pub fn set_wake(&mut self, wake: u32) {
        self.wake = wake;
    }

    fn link_down(&self) -> bool {
        self.outage.as_ref().is_some_and(|o| o.contains(&self.wake))
    }
}

impl Transport for LoggingTransport {
    type Handle = ();

    fn connect(
        &mut self,
        credentials: &Credentials<'_>,
        _timeout: Duration,
    ) -> Result<(), ConnError> {
        if self.link_down() {
            return Err(ConnError::Unavailable);
        }
        debug!("Joined {}", credentials.ssid);
        Ok(())
    }

    fn send(
        &mut self,
        _handle: &mut (),
        payload: &[u8],
        _timeout: Duration,
    ) -> Result<(), SendError> {
        match core::str::from_utf8(payload) {
            Ok(body) => info!("-> {}", body),
            Err(_) => warn!("-> {} bytes of non-UTF-8 payload", payload.len()),
        }
        self.delivered += 1;
        Ok(())
    }
}

/// Sleep controller that only remembers the request
#[derive(Debug, Default)]
pub struct SimSleep {
    pub last: Option<Duration>,
}

impl SleepPlatform for SimSleep {
    fn deep_sleep(&mut self, duration: Duration) {
        self.last = Some(duration);
    }
}

/// Indicator that logs status changes
#[derive(Debug, Default)]
pub struct LogIndicator;

impl StatusIndicator for LogIndicator {
    fn show(&mut self, status: DeviceStatus) {
        debug!("status: {:?}", status);
    }
}
