//! Device Hardware Limits

/// Nominal battery capacity (mAh).
///
/// Battery percentage is the gauge's remaining charge relative to this.
pub const BATTERY_CAPACITY_MAH: u32 = 2650;

/// Longest device identity accepted from the connection string (bytes).
pub const MAX_DEVICE_ID_LEN: usize = 20;

/// Longest report body the cloud endpoint accepts (bytes).
pub const MESSAGE_MAX_LEN: usize = 512;

/// Size of the sleep-retained memory region (bytes).
///
/// Must hold the record header plus the encoded snapshot and cycle counters.
pub const RETAINED_REGION_SIZE: usize = 128;

/// Capacity of one non-volatile configuration slot (bytes).
pub const CONFIG_SLOT_SIZE: usize = 512;

/// Connection string capacity (bytes).
pub const CONNECTION_STRING_LEN: usize = 180;

/// Network name capacity (bytes).
pub const SSID_LEN: usize = 64;

/// Network secret capacity (bytes).
pub const PASSPHRASE_LEN: usize = 32;
