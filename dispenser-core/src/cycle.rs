//! Cycle counters and the forced-sync policy
//!
//! `CycleState` is everything the engine has to remember between wakes
//! besides the sensor baseline: how long since the cloud last saw a full
//! report, how often the radio has failed, and the cumulative counters. It
//! lives in the retained region next to the snapshot and is lost with power.
//!
//! ```text
//!   wake ─► begin_cycle ─► decide ─► post? ─► record_outcome ─► commit ─► sleep
//!             │                                  │
//!             └ countdowns -1                     ├ delivered full  → elapsed = 0
//!                                                 └ otherwise       → elapsed + 1
//! ```

use serde::{Deserialize, Serialize};

use crate::config::PersistentConfig;
use crate::evaluator::PostDecision;
use crate::metrics::{IntervalGroup, MetricSet};
use crate::sensors::Pulses;

/// Counters that span wake cycles until power loss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CycleState {
    /// Completed cycles since the last delivered full report
    pub elapsed_cycles: u16,
    /// Consecutive connect/send failures
    pub reconnect_attempts: u16,
    /// Times connectivity was escalated to provisioning
    pub reset_count: u32,
    /// Wake cycles since power-on
    pub total_cycles: u32,
    /// Motion pulses since power-on
    pub motion_total: u32,
    /// Switch closures since power-on
    pub switch_total: u32,
    /// Cycles until each interval group is due, indexed by [`IntervalGroup`]
    pub countdowns: [u16; 3],
    /// A full report was decided but never delivered
    pub full_post_pending: bool,
}

impl CycleState {
    /// Count one more cycle without a delivered full report
    pub fn tick(&mut self) {
        self.elapsed_cycles = self.elapsed_cycles.saturating_add(1);
    }

    /// Start a wake cycle
    ///
    /// Counts the wake and moves every enabled interval one cycle closer to
    /// due. A countdown larger than a newly shortened interval is clamped.
    pub fn begin_cycle(&mut self, config: &PersistentConfig) {
        self.total_cycles = self.total_cycles.saturating_add(1);

        for group in IntervalGroup::ALL {
            let interval = config.interval(group);
            let countdown = &mut self.countdowns[group as usize];
            if interval == 0 {
                *countdown = 0;
            } else {
                *countdown = (*countdown).min(interval).saturating_sub(1);
            }
        }
    }

    /// Metrics whose post interval has run out
    pub fn due_metrics(&self, config: &PersistentConfig) -> MetricSet {
        IntervalGroup::ALL
            .into_iter()
            .filter(|g| config.interval(*g) != 0 && self.countdowns[*g as usize] == 0)
            .fold(MetricSet::EMPTY, |set, g| set.union(g.metrics()))
    }

    /// Whether staleness alone requires a full report this cycle
    pub fn should_force_sync(&self, max_cycles: u16, all_state_interval: u16) -> bool {
        self.elapsed_cycles >= sync_bound(max_cycles, all_state_interval)
    }

    /// Account for the end of a cycle
    ///
    /// Only a delivered full report resets the staleness counter, and a full
    /// report that never arrived stays pending for the next wake. Groups that
    /// reached the cloud start a new interval.
    pub fn record_outcome(
        &mut self,
        decision: &PostDecision,
        delivered: bool,
        config: &PersistentConfig,
    ) {
        if decision.is_full() {
            self.full_post_pending = !delivered;
        }
        if !delivered {
            self.tick();
            return;
        }

        let sent = decision.metrics();
        for group in IntervalGroup::ALL {
            if sent.contains_all(group.metrics()) {
                self.countdowns[group as usize] = config.interval(group);
            }
        }

        if decision.is_full() {
            self.elapsed_cycles = 0;
        } else {
            self.tick();
        }
    }

    /// Cumulative pulse counts
    pub fn pulse_totals(&self) -> Pulses {
        Pulses {
            motion: self.motion_total,
            switch: self.switch_total,
        }
    }

    /// Store new cumulative pulse counts
    pub fn set_pulse_totals(&mut self, totals: Pulses) {
        self.motion_total = totals.motion;
        self.switch_total = totals.switch;
    }
}

/// Effective forced-sync bound
///
/// A configured all-state interval can only tighten the device-class bound.
pub fn sync_bound(max_cycles: u16, all_state_interval: u16) -> u16 {
    if all_state_interval == 0 {
        max_cycles
    } else {
        max_cycles.min(all_state_interval)
    }
}
