//! Threshold Evaluator
//!
//! ## Overview
//!
//! The radio costs far more energy than a wake, a sensor read and a sleep
//! together, so most cycles must end without connecting. The evaluator
//! compares the fresh readings against the retained baseline and decides how
//! much, if anything, is worth sending.
//!
//! ## Decision Order
//!
//! The first rule that applies wins:
//!
//! | # | Condition | Decision | Trigger |
//! |---|-----------|----------|---------|
//! | 1 | first boot / baseline uninitialised | `FullPost` | `FirstBoot` / `InvalidSnapshot` |
//! | 2 | distance fell below the critical floor | `FullPost` | `Critical` |
//! | 3 | distance recovered from critical | `FullPost` | `CriticalCleared` |
//! | 4 | "post all info" configured | `FullPost` | `PostAll` |
//! | 5 | too many cycles since the last full report | `FullPost` | `ForcedSync` |
//! | 6 | the last full report never arrived | `FullPost` | `Redelivery` |
//! | 7 | a metric moved by its threshold | `PartialPost` | `Threshold` |
//! | 8 | an interval group is due | `PartialPost` | `Interval` |
//! | 9 | nothing | `Skip` | `Quiet` |
//!
//! A partial post carries the changed metrics plus every due metric.
//!
//! ## Comparison
//!
//! A metric has changed when `|live - baseline| >= threshold`. A metric that
//! has a reading now but never had one before has also changed. A metric that
//! could not be read this cycle never triggers anything.
//!
//! ```rust
//! use dispenser_core::evaluator::{ThresholdEvaluator, ThresholdPolicy};
//! use dispenser_core::Metric;
//!
//! let evaluator = ThresholdEvaluator::new(ThresholdPolicy::default());
//! assert!(evaluator.crossed(Metric::Distance, 8.0, 10.0));
//! assert!(!evaluator.crossed(Metric::Distance, 10.1, 10.0));
//! ```

use serde::{Deserialize, Serialize};

use crate::config::PersistentConfig;
use crate::constants::thresholds::{
    CRITICAL_DISTANCE_CM, DISTANCE_DELTA_CM, HUMIDITY_DELTA_PCT, MAX_CYCLES_WITHOUT_SYNC,
    TEMPERATURE_DELTA_C,
};
use crate::cycle::CycleState;
use crate::metrics::{Metric, MetricSet};
use crate::retained::SurvivableSnapshot;
use crate::sensors::LiveSnapshot;

/// Device-class reporting thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPolicy {
    /// Distance change worth reporting (cm)
    pub distance_delta_cm: f32,
    /// Temperature change worth reporting (°C)
    pub temperature_delta_c: f32,
    /// Humidity change worth reporting (%RH)
    pub humidity_delta_pct: f32,
    /// Cycles without a delivered full report before one is forced
    pub max_cycles_without_sync: u16,
    /// Distance below which the dispenser is nearly empty (cm)
    pub critical_distance_cm: f32,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            distance_delta_cm: DISTANCE_DELTA_CM,
            temperature_delta_c: TEMPERATURE_DELTA_C,
            humidity_delta_pct: HUMIDITY_DELTA_PCT,
            max_cycles_without_sync: MAX_CYCLES_WITHOUT_SYNC,
            critical_distance_cm: CRITICAL_DISTANCE_CM,
        }
    }
}

impl ThresholdPolicy {
    /// Delta threshold of a metric; battery has none
    pub fn delta(&self, metric: Metric) -> Option<f32> {
        match metric {
            Metric::Distance => Some(self.distance_delta_cm),
            Metric::Temperature => Some(self.temperature_delta_c),
            Metric::Humidity => Some(self.humidity_delta_pct),
            Metric::Battery => None,
        }
    }
}

/// What this wake cycle sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostDecision {
    /// Stay offline
    Skip,
    /// Send only these metrics
    PartialPost(MetricSet),
    /// Send everything, including counters
    FullPost,
}

impl PostDecision {
    /// Metrics the report will carry
    pub fn metrics(&self) -> MetricSet {
        match self {
            PostDecision::Skip => MetricSet::EMPTY,
            PostDecision::PartialPost(set) => *set,
            PostDecision::FullPost => MetricSet::ALL,
        }
    }

    /// Whether the radio is needed
    pub fn is_post(&self) -> bool {
        !matches!(self, PostDecision::Skip)
    }

    /// Whether this is a full report
    pub fn is_full(&self) -> bool {
        matches!(self, PostDecision::FullPost)
    }
}

/// Why a decision was made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Retained region was invalid at wake
    FirstBoot,
    /// Retained baseline never initialised
    InvalidSnapshot,
    /// Distance fell below the critical floor
    Critical,
    /// Distance recovered from critical
    CriticalCleared,
    /// Configured to send everything every cycle
    PostAll,
    /// Staleness bound reached
    ForcedSync,
    /// Previous full report was not delivered
    Redelivery,
    /// At least one metric crossed its threshold
    Threshold,
    /// Only interval groups were due
    Interval,
    /// Nothing to send
    Quiet,
}

/// Decision with its reason and the critical flag for the next snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// What to send
    pub decision: PostDecision,
    /// Why
    pub trigger: Trigger,
    /// Critical level after this cycle
    pub critical: bool,
}

impl Verdict {
    fn new(decision: PostDecision, trigger: Trigger, critical: bool) -> Self {
        Self { decision, trigger, critical }
    }
}

/// Compares live readings with the retained baseline
#[derive(Debug, Clone, Default)]
pub struct ThresholdEvaluator {
    policy: ThresholdPolicy,
}

impl ThresholdEvaluator {
    /// Evaluator for a threshold policy
    pub fn new(policy: ThresholdPolicy) -> Self {
        Self { policy }
    }

    /// The thresholds in use
    pub fn policy(&self) -> &ThresholdPolicy {
        &self.policy
    }

    /// Whether `live` moved far enough from `baseline`
    pub fn crossed(&self, metric: Metric, live: f32, baseline: f32) -> bool {
        match self.policy.delta(metric) {
            Some(delta) => libm::fabsf(live - baseline) >= delta,
            None => false,
        }
    }

    /// Metrics that crossed their threshold
    pub fn changed_metrics(&self, live: &LiveSnapshot, prev: &SurvivableSnapshot) -> MetricSet {
        Metric::THRESHOLDED
            .into_iter()
            .filter(|&metric| match (live.value(metric), prev.value(metric)) {
                (Some(now), Some(before)) => self.crossed(metric, now, before),
                (Some(_), None) => true,
                (None, _) => false,
            })
            .collect()
    }

    /// Critical level after this cycle
    ///
    /// Without a distance reading the previous level stands.
    pub fn is_critical(&self, live: &LiveSnapshot, prev: &SurvivableSnapshot) -> bool {
        match live.distance {
            Some(distance) => distance.cm < self.policy.critical_distance_cm,
            None => prev.critical,
        }
    }

    /// Decide what this wake cycle sends
    pub fn decide(
        &self,
        live: &LiveSnapshot,
        prev: &SurvivableSnapshot,
        cycle: &CycleState,
        config: &PersistentConfig,
        first_boot: bool,
    ) -> Verdict {
        let critical = self.is_critical(live, prev);

        if first_boot {
            return Verdict::new(PostDecision::FullPost, Trigger::FirstBoot, critical);
        }
        if !prev.initialized {
            return Verdict::new(PostDecision::FullPost, Trigger::InvalidSnapshot, critical);
        }
        if critical && !prev.critical {
            return Verdict::new(PostDecision::FullPost, Trigger::Critical, critical);
        }
        if prev.critical && !critical {
            return Verdict::new(PostDecision::FullPost, Trigger::CriticalCleared, critical);
        }
        if config.post_all_info {
            return Verdict::new(PostDecision::FullPost, Trigger::PostAll, critical);
        }
        if cycle.should_force_sync(self.policy.max_cycles_without_sync, config.all_state_interval) {
            return Verdict::new(PostDecision::FullPost, Trigger::ForcedSync, critical);
        }
        if cycle.full_post_pending {
            return Verdict::new(PostDecision::FullPost, Trigger::Redelivery, critical);
        }

        let changed = self.changed_metrics(live, prev);
        let due = cycle.due_metrics(config);

        if !changed.is_empty() {
            Verdict::new(
                PostDecision::PartialPost(changed.union(due)),
                Trigger::Threshold,
                critical,
            )
        } else if !due.is_empty() {
            Verdict::new(PostDecision::PartialPost(due), Trigger::Interval, critical)
        } else {
            Verdict::new(PostDecision::Skip, Trigger::Quiet, critical)
        }
    }
}
