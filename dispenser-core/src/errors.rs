//! Error Types for the Wake-Cycle Engine
//!
//! ## Design Philosophy
//!
//! Every error here is contained inside the wake cycle that produced it. None
//! of them may stop the device from reaching sleep or provisioning, so they
//! are plain data the engine can match on and log:
//!
//! 1. **Small Size**: variants carry a few scalars or a `&'static str`, never
//!    an owned string.
//!
//! 2. **Copy Semantics**: errors are returned from sensor and transport hot
//!    paths and stored in reports, so they are `Copy`.
//!
//! 3. **Actionable**: each category maps to exactly one recovery policy.
//!
//! ## Error Categories
//!
//! | Error | Scope | Recovery |
//! |-------|-------|----------|
//! | `SensorError` | one field, one cycle | field marked unavailable |
//! | `ConfigError` | device | provisioning fallback |
//! | `ConnError` / `SendError` | one attempt | retry, then skip or escalate |
//! | `PersistenceWriteError` | retained region | next wake behaves as first boot |
//! | `StorageError` | non-volatile slot | surfaced through `ConfigError` |
//!
//! ```rust
//! use dispenser_core::errors::SensorError;
//!
//! fn reading_or_unavailable(result: Result<f32, SensorError>) -> Option<f32> {
//!     match result {
//!         Ok(value) => Some(value),
//!         // Never fabricate a value: the field simply is not reported
//!         Err(_) => None,
//!     }
//! }
//! assert_eq!(reading_or_unavailable(Err(SensorError::Bus)), None);
//! ```

use thiserror_no_std::Error;

/// Sensor read failures - per field, never fatal
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SensorError {
    /// Bus transaction failed (NACK, arbitration loss, wiring)
    #[error("Sensor bus error")]
    Bus,

    /// Sensor did not answer within its conversion time
    #[error("Sensor timed out")]
    Timeout,

    /// Reading is outside the plausible physical range
    #[error("Value {value} outside plausible range [{min}, {max}]")]
    OutOfRange {
        /// The reading that was rejected
        value: f32,
        /// Lowest plausible value
        min: f32,
        /// Highest plausible value
        max: f32,
    },

    /// Not a number or infinite
    #[error("Invalid value: not a valid number")]
    InvalidValue,
}

/// Raw non-volatile storage failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Underlying flash/file operation failed
    #[error("Storage I/O failed")]
    Io,

    /// Record does not fit in a slot
    #[error("Record of {len} bytes exceeds slot capacity {capacity}")]
    TooLarge {
        /// Size of the record
        len: usize,
        /// Slot capacity
        capacity: usize,
    },
}

/// Persistent configuration failures
///
/// Any of these sends the device to provisioning mode.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Both slots are blank - the device was never provisioned
    #[error("Device not provisioned")]
    NotProvisioned,

    /// Stored bytes failed the validity check
    #[error("Stored configuration is corrupt")]
    Corrupt,

    /// A field violates its bounds
    #[error("Invalid configuration field: {field}")]
    InvalidField {
        /// Name of the offending field
        field: &'static str,
    },

    /// Configuration could not be encoded into a slot
    #[error("Configuration encoding failed")]
    Encode,

    /// Non-volatile storage failed
    #[error("Configuration storage failed: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for ConfigError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

/// Retained-region write failures
///
/// Treated on the next wake exactly like an invalid snapshot.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceWriteError {
    /// Snapshot could not be encoded into the region
    #[error("Retained record encoding failed")]
    Encode,

    /// Region write rejected by the platform
    #[error("Retained memory write failed")]
    Write,
}

/// Connection establishment failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnError {
    /// No association / link within the timeout
    #[error("Connection timed out")]
    Timeout,

    /// Access point or endpoint not reachable
    #[error("Network unavailable")]
    Unavailable,

    /// Credentials rejected
    #[error("Connection rejected: {reason}")]
    Rejected {
        /// Human readable reason from the transport
        reason: &'static str,
    },
}

/// Report delivery failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// No acknowledgement within the timeout
    #[error("Send timed out")]
    Timeout,

    /// Connection dropped while sending
    #[error("Connection lost during send")]
    Disconnected,

    /// Endpoint refused the message
    #[error("Message rejected: {reason}")]
    Rejected {
        /// Human readable reason from the transport
        reason: &'static str,
    },
}

/// Report body failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportError {
    /// Serialized body exceeds the message limit
    #[error("Report of {len} bytes exceeds limit {max}")]
    TooLarge {
        /// Serialized length
        len: usize,
        /// Message limit
        max: usize,
    },

    /// Serialization failed
    #[error("Report encoding failed")]
    Encode,
}

#[cfg(feature = "defmt")]
impl defmt::Format for SensorError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Bus => defmt::write!(fmt, "Sensor bus error"),
            Self::Timeout => defmt::write!(fmt, "Sensor timeout"),
            Self::OutOfRange { value, min, max } =>
                defmt::write!(fmt, "Value {} outside [{}, {}]", value, min, max),
            Self::InvalidValue => defmt::write!(fmt, "Invalid value"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::NotProvisioned => defmt::write!(fmt, "Not provisioned"),
            Self::Corrupt => defmt::write!(fmt, "Config corrupt"),
            Self::InvalidField { field } => defmt::write!(fmt, "Invalid field {}", field),
            Self::Encode => defmt::write!(fmt, "Config encode failed"),
            Self::Storage(_) => defmt::write!(fmt, "Config storage failed"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConnError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Timeout => defmt::write!(fmt, "Connect timeout"),
            Self::Unavailable => defmt::write!(fmt, "Network unavailable"),
            Self::Rejected { reason } => defmt::write!(fmt, "Rejected: {}", reason),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SendError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Timeout => defmt::write!(fmt, "Send timeout"),
            Self::Disconnected => defmt::write!(fmt, "Disconnected"),
            Self::Rejected { reason } => defmt::write!(fmt, "Rejected: {}", reason),
        }
    }
}
