//! Persistent Configuration
//!
//! ## Overview
//!
//! Per-device configuration written by provisioning and read at every wake.
//! It must survive full power loss, so it lives in [`NvStorage`]; the engine
//! itself never changes it.
//!
//! ## Slot Layout
//!
//! Two slots are written alternately so a write torn by power loss always
//! leaves the previous record readable:
//!
//! ```text
//! offset  size  field
//! 0       4     magic "DSPC"
//! 4       1     format version
//! 5       4     sequence (u32 LE), newest record wins
//! 9       2     body length (u16 LE)
//! 11      4     CRC-32 of body (u32 LE)
//! 15      n     body: postcard-encoded PersistentConfig
//! ```
//!
//! | Slot A | Slot B | `load()` |
//! |--------|--------|----------|
//! | blank | blank | `NotProvisioned` |
//! | valid | any | newest valid record |
//! | invalid | invalid / blank | `Corrupt` |
//!
//! ## Example
//!
//! ```rust
//! use dispenser_core::config::{ConfigStore, MemoryNvStorage, PersistentConfig, SaveOutcome};
//!
//! let config = PersistentConfig::new(
//!     "HostName=hub.example.net;DeviceId=disp-01;SharedAccessKey=abc",
//!     "warehouse",
//!     "secret",
//! ).unwrap();
//!
//! let mut store = ConfigStore::new(MemoryNvStorage::new());
//! assert!(matches!(store.save(&config), Ok(SaveOutcome::Written { .. })));
//! assert_eq!(store.save(&config), Ok(SaveOutcome::Unchanged));
//! assert_eq!(store.load().unwrap().device_id(), Some("disp-01"));
//! ```

use alloc::vec;
use alloc::vec::Vec;
use heapless::String;
use serde::{Deserialize, Serialize};

use crate::checksum::crc32;
use crate::connectivity::Credentials;
use crate::constants::hardware::{
    CONFIG_SLOT_SIZE, CONNECTION_STRING_LEN, MAX_DEVICE_ID_LEN, PASSPHRASE_LEN, SSID_LEN,
};
use crate::errors::{ConfigError, StorageError};
use crate::metrics::IntervalGroup;
use crate::traits::{NvStorage, Slot};

const MAGIC: [u8; 4] = *b"DSPC";
const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = 15;

/// Per-device configuration
///
/// Interval fields count wake cycles; `0` disables that interval.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentConfig {
    /// Cloud connection string (`HostName=..;DeviceId=..;SharedAccessKey=..`)
    pub connection_string: String<CONNECTION_STRING_LEN>,
    /// Wi-Fi network name
    pub ssid: String<SSID_LEN>,
    /// Wi-Fi passphrase
    pub passphrase: String<PASSPHRASE_LEN>,
    /// Deep sleep between wakes in seconds, `0` for the device default
    pub deep_sleep_secs: u32,
    /// Temperature and humidity post interval
    pub temperature_post_interval: u16,
    /// Distance post interval
    pub distance_post_interval: u16,
    /// Battery post interval
    pub battery_post_interval: u16,
    /// Upper bound on cycles between full posts, `0` for the device default
    pub all_state_interval: u16,
    /// Send a full report on every wake
    pub post_all_info: bool,
}

impl PersistentConfig {
    /// Configuration with credentials and default intervals
    pub fn new(connection_string: &str, ssid: &str, passphrase: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config
            .connection_string
            .push_str(connection_string)
            .map_err(|_| ConfigError::InvalidField { field: "connection_string" })?;
        config
            .ssid
            .push_str(ssid)
            .map_err(|_| ConfigError::InvalidField { field: "ssid" })?;
        config
            .passphrase
            .push_str(passphrase)
            .map_err(|_| ConfigError::InvalidField { field: "passphrase" })?;
        Ok(config)
    }

    /// Device identity from the connection string
    ///
    /// `None` when the `DeviceId=` component is missing, empty or longer than
    /// the cloud allows.
    pub fn device_id(&self) -> Option<&str> {
        self.connection_string
            .split(';')
            .filter_map(|part| part.trim().strip_prefix("DeviceId="))
            .find(|id| !id.is_empty() && id.len() <= MAX_DEVICE_ID_LEN)
    }

    /// Post interval of a group in wake cycles, `0` when disabled
    pub fn interval(&self, group: IntervalGroup) -> u16 {
        match group {
            IntervalGroup::Distance => self.distance_post_interval,
            IntervalGroup::Environment => self.temperature_post_interval,
            IntervalGroup::Battery => self.battery_post_interval,
        }
    }

    /// Credentials handed to the transport
    pub fn credentials(&self) -> Credentials<'_> {
        Credentials {
            ssid: &self.ssid,
            passphrase: &self.passphrase,
            connection_string: &self.connection_string,
        }
    }

    /// Check the fields a working device needs
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ssid.is_empty() {
            return Err(ConfigError::InvalidField { field: "ssid" });
        }
        if self.device_id().is_none() {
            return Err(ConfigError::InvalidField { field: "connection_string" });
        }
        Ok(())
    }
}

/// Result of [`ConfigStore::save`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Stored record already matched; nothing written
    Unchanged,
    /// New record written
    Written {
        /// Slot that now holds the newest record
        slot: Slot,
        /// Its sequence number
        sequence: u32,
    },
}

enum SlotContent {
    Blank,
    Invalid,
    Valid { sequence: u32, config: PersistentConfig },
}

/// A/B configuration store over [`NvStorage`]
#[derive(Debug)]
pub struct ConfigStore<S> {
    storage: S,
}

impl<S: NvStorage> ConfigStore<S> {
    /// Wrap a storage backend
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Borrow the backend
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Borrow the backend mutably
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Load the newest valid configuration
    pub fn load(&self) -> Result<PersistentConfig, ConfigError> {
        self.newest().map(|(_, _, config)| config)
    }

    /// Store `config` in the inactive slot
    ///
    /// The active slot is untouched until the new record is complete, so
    /// power loss at any point leaves one readable configuration.
    pub fn save(&mut self, config: &PersistentConfig) -> Result<SaveOutcome, ConfigError> {
        config.validate()?;

        let (slot, sequence) = match self.newest() {
            Ok((_, _, ref current)) if current == config => {
                log_debug!("Configuration unchanged, skipping write");
                return Ok(SaveOutcome::Unchanged);
            }
            Ok((active, sequence, _)) => (active.other(), sequence.wrapping_add(1)),
            Err(ConfigError::NotProvisioned) | Err(ConfigError::Corrupt) => (Slot::A, 1),
            Err(e) => return Err(e),
        };

        let record = encode_record(config, sequence, self.storage.slot_capacity())?;
        self.storage.write_slot(slot, &record)?;

        log_info!("Configuration saved to slot {:?} (seq {})", slot, sequence);
        Ok(SaveOutcome::Written { slot, sequence })
    }

    fn newest(&self) -> Result<(Slot, u32, PersistentConfig), ConfigError> {
        let mut best: Option<(Slot, u32, PersistentConfig)> = None;
        let mut blank = 0;

        for slot in [Slot::A, Slot::B] {
            match self.read(slot) {
                SlotContent::Blank => blank += 1,
                SlotContent::Invalid => {
                    log_warn!("Configuration slot {:?} failed validation", slot);
                }
                SlotContent::Valid { sequence, config } => {
                    let newer = best
                        .as_ref()
                        .map_or(true, |(_, seq, _)| is_newer(sequence, *seq));
                    if newer {
                        best = Some((slot, sequence, config));
                    }
                }
            }
        }

        match best {
            Some(found) => Ok(found),
            None if blank == 2 => Err(ConfigError::NotProvisioned),
            None => Err(ConfigError::Corrupt),
        }
    }

    #[cfg_attr(not(feature = "log"), allow(unused_variables))]
    fn read(&self, slot: Slot) -> SlotContent {
        let mut buf = vec![0u8; self.storage.slot_capacity()];
        let len = match self.storage.read_slot(slot, &mut buf) {
            Ok(len) => len,
            Err(e) => {
                log_warn!("Reading configuration slot {:?} failed: {}", slot, e);
                return SlotContent::Invalid;
            }
        };

        let bytes = &buf[..len.min(buf.len())];
        if bytes.iter().all(|&b| b == 0xFF) {
            // Empty or erased flash
            return SlotContent::Blank;
        }

        match decode_record(bytes) {
            Some((sequence, config)) if config.validate().is_ok() => {
                SlotContent::Valid { sequence, config }
            }
            _ => SlotContent::Invalid,
        }
    }
}

/// Sequence order that survives wrap-around
fn is_newer(sequence: u32, than: u32) -> bool {
    (sequence.wrapping_sub(than) as i32) > 0
}

fn encode_record(
    config: &PersistentConfig,
    sequence: u32,
    capacity: usize,
) -> Result<Vec<u8>, ConfigError> {
    let mut record = vec![0u8; capacity.max(HEADER_LEN)];
    let body_len = postcard::to_slice(config, &mut record[HEADER_LEN..])
        .map_err(|_| ConfigError::Encode)?
        .len();
    let body_len_u16 = u16::try_from(body_len).map_err(|_| ConfigError::Encode)?;
    let crc = crc32(&record[HEADER_LEN..HEADER_LEN + body_len]);

    record[0..4].copy_from_slice(&MAGIC);
    record[4] = FORMAT_VERSION;
    record[5..9].copy_from_slice(&sequence.to_le_bytes());
    record[9..11].copy_from_slice(&body_len_u16.to_le_bytes());
    record[11..15].copy_from_slice(&crc.to_le_bytes());
    record.truncate(HEADER_LEN + body_len);

    if record.len() > capacity {
        return Err(StorageError::TooLarge { len: record.len(), capacity }.into());
    }
    Ok(record)
}

fn decode_record(bytes: &[u8]) -> Option<(u32, PersistentConfig)> {
    let header = bytes.get(..HEADER_LEN)?;
    if header[0..4] != MAGIC || header[4] != FORMAT_VERSION {
        return None;
    }

    let sequence = u32::from_le_bytes(header[5..9].try_into().ok()?);
    let body_len = u16::from_le_bytes(header[9..11].try_into().ok()?) as usize;
    let crc = u32::from_le_bytes(header[11..15].try_into().ok()?);

    let body = bytes.get(HEADER_LEN..HEADER_LEN + body_len)?;
    if crc32(body) != crc {
        return None;
    }

    let config: PersistentConfig = postcard::from_bytes(body).ok()?;
    Some((sequence, config))
}

/// Non-volatile storage in RAM, for tests and the simulator
#[derive(Debug, Clone)]
pub struct MemoryNvStorage {
    slots: [Vec<u8>; 2],
    capacity: usize,
    fail_writes: bool,
    tear_next_write: Option<usize>,
    writes: usize,
}

impl Default for MemoryNvStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNvStorage {
    /// Two blank slots of the default size
    pub fn new() -> Self {
        Self::with_capacity(CONFIG_SLOT_SIZE)
    }

    /// Two blank slots of `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: [Vec::new(), Vec::new()],
            capacity,
            fail_writes: false,
            tear_next_write: None,
            writes: 0,
        }
    }

    /// Make every following write fail
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Cut the next write short after `len` bytes, as power loss would
    pub fn tear_next_write(&mut self, len: usize) {
        self.tear_next_write = Some(len);
    }

    /// Overwrite a byte of a stored slot
    pub fn corrupt(&mut self, slot: Slot, offset: usize) {
        if let Some(byte) = self.slots[index(slot)].get_mut(offset) {
            *byte ^= 0xA5;
        }
    }

    /// Raw slot contents
    pub fn slot(&self, slot: Slot) -> &[u8] {
        &self.slots[index(slot)]
    }

    /// Number of completed or torn writes
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

fn index(slot: Slot) -> usize {
    match slot {
        Slot::A => 0,
        Slot::B => 1,
    }
}

impl NvStorage for MemoryNvStorage {
    fn slot_capacity(&self) -> usize {
        self.capacity
    }

    fn read_slot(&self, slot: Slot, buf: &mut [u8]) -> Result<usize, StorageError> {
        let stored = &self.slots[index(slot)];
        if stored.len() > buf.len() {
            return Err(StorageError::TooLarge { len: stored.len(), capacity: buf.len() });
        }
        buf[..stored.len()].copy_from_slice(stored);
        Ok(stored.len())
    }

    fn write_slot(&mut self, slot: Slot, bytes: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Io);
        }
        if bytes.len() > self.capacity {
            return Err(StorageError::TooLarge { len: bytes.len(), capacity: self.capacity });
        }

        self.writes += 1;
        let len = self.tear_next_write.take().map_or(bytes.len(), |n| n.min(bytes.len()));
        self.slots[index(slot)] = bytes[..len].to_vec();
        Ok(())
    }
}
