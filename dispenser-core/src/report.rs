//! Report body
//!
//! Builds the JSON message handed to the transport. The body is bounded by
//! the cloud's message limit; anything larger is refused rather than cut.
//!
//! A full report:
//!
//! ```json
//! {"deviceId":"disp-01","softwareVersion":"0.1.0","kind":"full","timestamp":1700000000,
//!  "distanceCm":10.0,"distanceIn":3.93,"temperature":21.5,"humidity":40.0,
//!  "batteryPercentage":87,"batteryState":"discharging","motionCount":12,
//!  "switchCount":3,"critical":false,"cycleCount":240,"resetCount":0}
//! ```
//!
//! A partial report carries only the selected metrics and no counters.

use alloc::vec::Vec;
use serde::Serialize;

use crate::constants::hardware::MESSAGE_MAX_LEN;
use crate::cycle::CycleState;
use crate::errors::ReportError;
use crate::evaluator::PostDecision;
use crate::metrics::{Metric, MetricSet};
use crate::sensors::{ChargeState, LiveSnapshot};

/// Full or partial report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// Every metric plus counters
    Full,
    /// Selected metrics only
    Partial,
}

/// One report body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report<'a> {
    /// Device identity
    pub device_id: &'a str,
    /// Firmware version
    pub software_version: &'a str,
    /// Full or partial
    pub kind: ReportKind,
    /// Unix seconds, when the clock is synchronised
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    /// Distance in centimetres
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_cm: Option<f32>,
    /// Distance in inches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_in: Option<f32>,
    /// Temperature in °C
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Relative humidity in %
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f32>,
    /// Battery percentage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_percentage: Option<u8>,
    /// Charging state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_state: Option<ChargeState>,
    /// Motion pulses since power-on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motion_count: Option<u32>,
    /// Switch closures since power-on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch_count: Option<u32>,
    /// Level is critical
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critical: Option<bool>,
    /// Wake cycles since power-on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_count: Option<u32>,
    /// Connectivity escalations since power-on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_count: Option<u32>,
    /// Selected metrics that had no reading
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unavailable: Vec<&'static str>,
}

impl<'a> Report<'a> {
    /// Build the report for a decision, `None` for `Skip`
    pub fn build(
        decision: &PostDecision,
        live: &LiveSnapshot,
        cycle: &CycleState,
        critical: bool,
        device_id: &'a str,
        timestamp: Option<u64>,
    ) -> Option<Self> {
        let (kind, selected) = match decision {
            PostDecision::Skip => return None,
            PostDecision::PartialPost(set) => (ReportKind::Partial, *set),
            PostDecision::FullPost => (ReportKind::Full, MetricSet::ALL),
        };
        let full = kind == ReportKind::Full;

        let distance = live.distance.filter(|_| selected.contains(Metric::Distance));
        let battery = live.battery.filter(|_| selected.contains(Metric::Battery));

        Some(Self {
            device_id,
            software_version: crate::VERSION,
            kind,
            timestamp,
            distance_cm: distance.map(|d| round2(d.cm)),
            distance_in: distance.map(|d| round2(d.inches)),
            temperature: live
                .temperature_c
                .filter(|_| selected.contains(Metric::Temperature))
                .map(round2),
            humidity: live
                .humidity_pct
                .filter(|_| selected.contains(Metric::Humidity))
                .map(round2),
            battery_percentage: battery.map(|b| b.percent),
            battery_state: battery.map(|b| b.state),
            motion_count: full.then_some(live.motion_count),
            switch_count: full.then_some(live.switch_count),
            critical: full.then_some(critical),
            cycle_count: full.then_some(cycle.total_cycles),
            reset_count: full.then_some(cycle.reset_count),
            unavailable: selected
                .iter()
                .filter(|m| !live.is_available(*m))
                .map(|m| m.name())
                .collect(),
        })
    }

    /// Serialize, refusing bodies over the message limit
    pub fn encode(&self) -> Result<Vec<u8>, ReportError> {
        let body = serde_json::to_vec(self).map_err(|_| ReportError::Encode)?;
        if body.len() > MESSAGE_MAX_LEN {
            return Err(ReportError::TooLarge { len: body.len(), max: MESSAGE_MAX_LEN });
        }
        Ok(body)
    }
}

fn round2(value: f32) -> f32 {
    libm::roundf(value * 100.0) / 100.0
}
