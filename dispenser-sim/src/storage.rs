//! File-backed persistence
//!
//! The state directory stands in for the board: one file per config slot
//! and one for the retained region. Deleting `retained.bin` is a power loss;
//! deleting the slot files is a factory reset.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use dispenser_core::constants::hardware::{CONFIG_SLOT_SIZE, RETAINED_REGION_SIZE};
use dispenser_core::errors::{PersistenceWriteError, StorageError};
use dispenser_core::traits::{NvStorage, RetainedMemory, Slot};
use log::{debug, error, warn};

const RETAINED_FILE: &str = "retained.bin";

fn slot_file(slot: Slot) -> &'static str {
    match slot {
        Slot::A => "config-a.bin",
        Slot::B => "config-b.bin",
    }
}

/// Config slots as files
#[derive(Debug, Clone)]
pub struct FileNvStorage {
    dir: PathBuf,
}

impl FileNvStorage {
    /// Slots under `dir`, created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, slot: Slot) -> PathBuf {
        self.dir.join(slot_file(slot))
    }

}

impl NvStorage for FileNvStorage {
    fn slot_capacity(&self) -> usize {
        CONFIG_SLOT_SIZE
    }

    fn read_slot(&self, slot: Slot, buf: &mut [u8]) -> Result<usize, StorageError> {
        let bytes = match fs::read(self.path(slot)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                error!("Reading {}: {}", slot_file(slot), e);
                return Err(StorageError::Io);
            }
        };

        if bytes.len() > buf.len() {
            return Err(StorageError::TooLarge { len: bytes.len(), capacity: buf.len() });
        }
        buf[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }

    fn write_slot(&mut self, slot: Slot, bytes: &[u8]) -> Result<(), StorageError> {
        if bytes.len() > CONFIG_SLOT_SIZE {
            return Err(StorageError::TooLarge { len: bytes.len(), capacity: CONFIG_SLOT_SIZE });
        }

        fs::create_dir_all(&self.dir)
            .and_then(|()| fs::write(self.path(slot), bytes))
            .map_err(|e| {
                error!("Writing {}: {}", slot_file(slot), e);
                StorageError::Io
            })?;
        debug!("Wrote {} bytes to {}", bytes.len(), slot_file(slot));
        Ok(())
    }
}

/// Retained region as a file
///
/// A missing or short file reads as zeros, which never validates.
#[derive(Debug, Clone)]
pub struct FileRetained {
    path: PathBuf,
}

impl FileRetained {
    /// Region stored under `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { path: dir.as_ref().join(RETAINED_FILE) }
    }

    /// Drop the retained contents
    pub fn power_loss(&self) -> std::io::Result<()> {
        remove_if_present(&self.path)
    }
}

impl RetainedMemory for FileRetained {
    fn read(&self, buf: &mut [u8; RETAINED_REGION_SIZE]) {
        buf.fill(0);
        match fs::read(&self.path) {
            Ok(bytes) if bytes.len() == RETAINED_REGION_SIZE => buf.copy_from_slice(&bytes),
            Ok(bytes) => warn!("Ignoring retained file of {} bytes", bytes.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Reading retained file: {}", e),
        }
    }

    fn write(&mut self, bytes: &[u8; RETAINED_REGION_SIZE]) -> Result<(), PersistenceWriteError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|_| PersistenceWriteError::Write)?;
        }
        fs::write(&self.path, bytes).map_err(|e| {
            error!("Writing retained file: {}", e);
            PersistenceWriteError::Write
        })
    }

    fn invalidate(&mut self) {
        if let Err(e) = remove_if_present(&self.path) {
            error!("Removing stale retained file: {}", e);
        }
    }
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispenser_core::retained::RetainedStore;
    use dispenser_core::{
        ConfigError, ConfigStore, CycleState, PersistentConfig, SurvivableSnapshot,
    };
    use tempfile::TempDir;

    fn config() -> PersistentConfig {
        PersistentConfig::new("HostName=h;DeviceId=sim-01;SharedAccessKey=k", "lab", "pw").unwrap()
    }

    #[test]
    fn missing_slots_are_blank() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(FileNvStorage::new(dir.path()));
        assert_eq!(store.load(), Err(ConfigError::NotProvisioned));
    }

    #[test]
    fn config_survives_reopen() {
        let dir = TempDir::new().unwrap();
        ConfigStore::new(FileNvStorage::new(dir.path())).save(&config()).unwrap();

        let reopened = ConfigStore::new(FileNvStorage::new(dir.path()));
        assert_eq!(reopened.load().unwrap(), config());
        assert!(dir.path().join("config-a.bin").exists());
    }

    #[test]
    fn deleted_slots_unprovision() {
        let dir = TempDir::new().unwrap();
        let mut store = ConfigStore::new(FileNvStorage::new(dir.path()));
        store.save(&config()).unwrap();

        for slot in [Slot::A, Slot::B] {
            remove_if_present(&dir.path().join(slot_file(slot))).unwrap();
        }
        assert_eq!(store.load(), Err(ConfigError::NotProvisioned));
    }

    #[test]
    fn retained_round_trip_and_power_loss() {
        let dir = TempDir::new().unwrap();
        let memory = FileRetained::new(dir.path());
        let cycle = CycleState { total_cycles: 7, ..Default::default() };

        let mut store = RetainedStore::new(memory.clone());
        assert!(store.load_or_init().first_boot);
        store.commit(&SurvivableSnapshot::UNINITIALIZED, &cycle).unwrap();

        let reopened = RetainedStore::new(FileRetained::new(dir.path()));
        let restored = reopened.load_or_init();
        assert!(!restored.first_boot);
        assert_eq!(restored.cycle.total_cycles, 7);

        memory.power_loss().unwrap();
        assert!(reopened.load_or_init().first_boot);
    }

    #[test]
    fn short_retained_file_is_first_boot() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(RETAINED_FILE), b"DSRT").unwrap();

        let store = RetainedStore::new(FileRetained::new(dir.path()));
        assert!(store.load_or_init().first_boot);
    }
}
