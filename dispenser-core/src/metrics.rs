//! Reportable metrics and metric sets
//!
//! A partial report names exactly which metrics it carries. `MetricSet` is a
//! one-byte bit set so decisions stay `Copy` and fit in a log line.

use core::fmt;
use serde::{Deserialize, Serialize};

/// A metric that can be selected into a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Metric {
    /// Distance to the product surface
    Distance = 0,
    /// Ambient temperature
    Temperature = 1,
    /// Relative humidity
    Humidity = 2,
    /// Battery percentage and charge state
    Battery = 3,
}

impl Metric {
    /// All metrics in report order
    pub const ALL: [Metric; 4] = [
        Metric::Distance,
        Metric::Temperature,
        Metric::Humidity,
        Metric::Battery,
    ];

    /// Metrics with a delta threshold (battery is interval-only)
    pub const THRESHOLDED: [Metric; 3] = [Metric::Distance, Metric::Temperature, Metric::Humidity];

    /// Name used in reports and logs
    pub const fn name(&self) -> &'static str {
        match self {
            Metric::Distance => "distance",
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::Battery => "battery",
        }
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Per-metric post-interval groups
///
/// Temperature and humidity come from the same chip and share one interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalGroup {
    /// Distance interval
    Distance = 0,
    /// Temperature + humidity interval
    Environment = 1,
    /// Battery interval
    Battery = 2,
}

impl IntervalGroup {
    /// All groups, indexable by `as usize`
    pub const ALL: [IntervalGroup; 3] = [
        IntervalGroup::Distance,
        IntervalGroup::Environment,
        IntervalGroup::Battery,
    ];

    /// Metrics covered by this group
    pub fn metrics(self) -> MetricSet {
        match self {
            IntervalGroup::Distance => MetricSet::only(Metric::Distance),
            IntervalGroup::Environment => {
                MetricSet::only(Metric::Temperature).with(Metric::Humidity)
            }
            IntervalGroup::Battery => MetricSet::only(Metric::Battery),
        }
    }
}

/// Set of metrics, one bit per [`Metric`]
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetricSet(u8);

impl MetricSet {
    /// No metrics
    pub const EMPTY: MetricSet = MetricSet(0);

    /// Every metric
    pub const ALL: MetricSet = MetricSet(0b1111);

    /// Set holding a single metric
    pub const fn only(metric: Metric) -> Self {
        MetricSet(metric.bit())
    }

    /// Builder-style insert
    pub const fn with(self, metric: Metric) -> Self {
        MetricSet(self.0 | metric.bit())
    }

    /// Insert a metric
    pub fn insert(&mut self, metric: Metric) {
        self.0 |= metric.bit();
    }

    /// Check membership
    pub const fn contains(&self, metric: Metric) -> bool {
        self.0 & metric.bit() != 0
    }

    /// Check that every member of `other` is in `self`
    pub const fn contains_all(&self, other: MetricSet) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two sets
    pub const fn union(self, other: MetricSet) -> Self {
        MetricSet(self.0 | other.0)
    }

    /// True when no metric is set
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of metrics in the set
    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate members in report order
    pub fn iter(self) -> impl Iterator<Item = Metric> {
        Metric::ALL.into_iter().filter(move |m| self.contains(*m))
    }
}

impl fmt::Debug for MetricSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|m| m.name())).finish()
    }
}

impl FromIterator<Metric> for MetricSet {
    fn from_iter<I: IntoIterator<Item = Metric>>(iter: I) -> Self {
        let mut set = MetricSet::EMPTY;
        for metric in iter {
            set.insert(metric);
        }
        set
    }
}
