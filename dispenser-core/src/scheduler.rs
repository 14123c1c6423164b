//! Sleep scheduling
//!
//! Picks how long to sleep and makes sure the retained record is written
//! before the platform suspends. Sleeping always happens: a failed commit
//! only means the next wake starts as a first boot.

use core::time::Duration;

use crate::config::PersistentConfig;
use crate::constants::time::{
    DEFAULT_DEEP_SLEEP_SECS, MAX_DEEP_SLEEP_SECS, MIN_DEEP_SLEEP_SECS, RETRY_SLEEP_SECS,
};
use crate::cycle::CycleState;
use crate::errors::PersistenceWriteError;
use crate::retained::{RetainedStore, SurvivableSnapshot};
use crate::traits::{RetainedMemory, SleepPlatform};

/// Sleep durations of the device class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulePolicy {
    /// Used when the config leaves the interval at zero
    pub default_sleep: Duration,
    /// Used after a full report failed to arrive
    pub retry_sleep: Duration,
    /// Shortest sleep the platform accepts
    pub min_sleep: Duration,
    /// Longest sleep the wake timer can count
    pub max_sleep: Duration,
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self {
            default_sleep: Duration::from_secs(DEFAULT_DEEP_SLEEP_SECS as u64),
            retry_sleep: Duration::from_secs(RETRY_SLEEP_SECS as u64),
            min_sleep: Duration::from_secs(MIN_DEEP_SLEEP_SECS as u64),
            max_sleep: Duration::from_secs(MAX_DEEP_SLEEP_SECS as u64),
        }
    }
}

/// Chooses and enters deep sleep
#[derive(Debug, Clone, Default)]
pub struct SleepScheduler {
    policy: SchedulePolicy,
}

impl SleepScheduler {
    /// Scheduler for a policy
    pub fn new(policy: SchedulePolicy) -> Self {
        Self { policy }
    }

    /// Sleep until the next wake
    ///
    /// `full_post_pending` is set when this cycle decided on a full report
    /// that was not delivered; the device then wakes early to try again.
    pub fn next_sleep_duration(
        &self,
        config: &PersistentConfig,
        full_post_pending: bool,
    ) -> Duration {
        let configured = match config.deep_sleep_secs {
            0 => self.policy.default_sleep,
            secs => Duration::from_secs(u64::from(secs)),
        };

        let chosen = if full_post_pending {
            configured.min(self.policy.retry_sleep)
        } else {
            configured
        };

        chosen.max(self.policy.min_sleep).min(self.policy.max_sleep)
    }

    /// Commit the retained record, then suspend
    ///
    /// Returns the commit result so the caller can report it; on hardware
    /// the function does not return at all.
    #[cfg_attr(not(feature = "log"), allow(unused_variables))]
    pub fn prepare_for_sleep<M, P>(
        &self,
        store: &mut RetainedStore<M>,
        platform: &mut P,
        snapshot: &SurvivableSnapshot,
        cycle: &CycleState,
        duration: Duration,
    ) -> Result<(), PersistenceWriteError>
    where
        M: RetainedMemory,
        P: SleepPlatform + ?Sized,
    {
        let committed = store.commit(snapshot, cycle);
        if let Err(e) = &committed {
            log_error!("Retained commit failed, next wake starts fresh: {}", e);
        }

        log_info!("Entering deep sleep for {} s", duration.as_secs());
        platform.deep_sleep(duration);
        committed
    }
}
