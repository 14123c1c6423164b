//! Time-Related Constants

// ===== TIME UNIT CONVERSIONS =====

/// Milliseconds per second.
pub const MS_PER_SECOND: u64 = 1000;

/// Microseconds per second.
pub const US_PER_SECOND: u64 = 1_000_000;

// ===== DEEP SLEEP =====

/// Deep-sleep interval used when the configuration leaves it at zero (s).
///
/// Ten minutes between wakes.
pub const DEFAULT_DEEP_SLEEP_SECS: u32 = 600;

/// Longest deep sleep the wake timer can express (s).
///
/// The timer takes a 32-bit microsecond count: 4_294_967_295 µs ≈ 4294 s.
pub const MAX_DEEP_SLEEP_SECS: u32 = (u32::MAX as u64 / US_PER_SECOND) as u32;

/// Shortest sleep the scheduler will request (s).
pub const MIN_DEEP_SLEEP_SECS: u32 = 1;

/// Sleep after a full report that could not be delivered (s).
///
/// Short enough to re-verify delivery soon, long enough to let a flaky
/// access point recover.
pub const RETRY_SLEEP_SECS: u32 = 60;

// ===== NETWORK =====

/// Upper bound on one connection attempt (ms).
pub const CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Upper bound on one report delivery (ms).
pub const SEND_TIMEOUT_MS: u64 = 5_000;

/// Connection attempts within a single wake cycle.
pub const CONNECT_ATTEMPTS_PER_CYCLE: u8 = 3;

/// Consecutive failures before provisioning mode takes over.
pub const MAX_CONSECUTIVE_FAILURES: u16 = 10;
