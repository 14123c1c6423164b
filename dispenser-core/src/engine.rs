//! Wake-cycle engine
//!
//! One call to [`Engine::run_cycle`] is one wake from deep sleep:
//!
//! ```text
//! load config ──fail──► Provision(NotProvisioned | ConfigCorrupt)
//!      │
//! load retained (or first boot)
//!      │
//! begin_cycle ─► capture ─► decide ──Skip──────────────────────────┐
//!                              │                                   │
//!                          build report ─► connect / send ──ok──────┤
//!                                              │                    │
//!                                              ├─ budget used ──────┤
//!                                              └─ limit reached ─► commit ─► Provision(..)
//!                                                                   │
//!                                            record_outcome ─► commit ─► Sleep(duration)
//! ```
//!
//! The engine owns no hardware. Every collaborator is borrowed for the
//! duration of the cycle through [`CycleIo`], and nothing but the retained
//! record outlives the call. Escalation ends in
//! `Provision(ConnectivityExhausted)`; a failed commit on either path clears
//! the record, so the next wake is a first boot.

use core::time::Duration;

use crate::config::{ConfigStore, PersistentConfig};
use crate::connectivity::{ConnectResult, ConnectivityPolicy, Gatekeeper, PostResult};
use crate::cycle::CycleState;
use crate::errors::ConfigError;
use crate::evaluator::{ThresholdEvaluator, ThresholdPolicy, Verdict};
use crate::report::Report;
use crate::retained::{RetainedStore, Restored};
use crate::scheduler::{SchedulePolicy, SleepScheduler};
use crate::sensors::{Aggregator, Charge, Climate, EchoTime, LiveSnapshot, Pulses, SensorSuite};
use crate::time::TimeSource;
use crate::traits::{
    DeviceStatus, NvStorage, RetainedMemory, Sensor, SleepPlatform, StatusIndicator, Transport,
};

/// Device-class policy
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DevicePolicy {
    /// Reporting thresholds and staleness bound
    pub thresholds: ThresholdPolicy,
    /// Retry budget and network timeouts
    pub connectivity: ConnectivityPolicy,
    /// Sleep durations
    pub schedule: SchedulePolicy,
}

/// Conditions observed at wake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WakeInputs {
    /// Reset switch held: enter provisioning immediately
    pub provisioning_requested: bool,
}

/// Why the device is entering provisioning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionCause {
    /// No configuration stored
    NotProvisioned,
    /// Stored configuration failed validation
    ConfigCorrupt,
    /// Too many consecutive connectivity failures
    ConnectivityExhausted,
    /// Requested with the reset switch
    ButtonRequest,
}

/// What the firmware does after the cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    /// Deep sleep for this long (already entered through the platform)
    Sleep(Duration),
    /// Start the provisioning access point
    Provision(ProvisionCause),
}

/// Summary of one wake cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// What happens next
    pub action: NextAction,
    /// Decision, when the cycle got that far
    pub verdict: Option<Verdict>,
    /// Readings, when the cycle got that far
    pub live: Option<LiveSnapshot>,
    /// A report reached the cloud
    pub delivered: bool,
    /// The retained record was written
    pub persisted: bool,
}

impl CycleReport {
    fn provisioning(cause: ProvisionCause) -> Self {
        Self {
            action: NextAction::Provision(cause),
            verdict: None,
            live: None,
            delivered: false,
            persisted: false,
        }
    }
}

/// Collaborators borrowed for one wake cycle
pub struct CycleIo<'a, M, S, R, C, B, P, T> {
    /// Retained region
    pub retained: &'a mut RetainedStore<M>,
    /// Persistent configuration
    pub config: &'a ConfigStore<S>,
    /// Sensor drivers
    pub sensors: &'a mut SensorSuite<R, C, B, P>,
    /// Network transport
    pub transport: &'a mut T,
    /// Wall clock, for report timestamps
    pub clock: &'a dyn TimeSource,
    /// Status LEDs
    pub indicator: &'a mut dyn StatusIndicator,
    /// Deep-sleep controller
    pub sleep: &'a mut dyn SleepPlatform,
}

enum Delivery {
    Delivered,
    Abandoned,
    Escalated,
}

/// Runs wake cycles under a device policy
#[derive(Debug, Clone, Default)]
pub struct Engine {
    policy: DevicePolicy,
    aggregator: Aggregator,
    evaluator: ThresholdEvaluator,
    scheduler: SleepScheduler,
}

impl Engine {
    /// Engine with the default sensor validation
    pub fn new(policy: DevicePolicy) -> Self {
        Self::with_aggregator(policy, Aggregator::default())
    }

    /// Engine with custom sensor validation
    pub fn with_aggregator(policy: DevicePolicy, aggregator: Aggregator) -> Self {
        Self {
            policy,
            aggregator,
            evaluator: ThresholdEvaluator::new(policy.thresholds),
            scheduler: SleepScheduler::new(policy.schedule),
        }
    }

    /// Policy in use
    pub fn policy(&self) -> &DevicePolicy {
        &self.policy
    }

    /// Run one wake cycle to sleep or provisioning
    #[cfg_attr(not(feature = "log"), allow(unused_variables))]
    pub fn run_cycle<M, S, R, C, B, P, T>(
        &self,
        io: &mut CycleIo<'_, M, S, R, C, B, P, T>,
        wake: WakeInputs,
    ) -> CycleReport
    where
        M: RetainedMemory,
        S: NvStorage,
        R: Sensor<Reading = EchoTime>,
        C: Sensor<Reading = Climate>,
        B: Sensor<Reading = Charge>,
        P: Sensor<Reading = Pulses>,
        T: Transport,
    {
        if wake.provisioning_requested {
            log_info!("Provisioning requested with reset switch");
            io.indicator.show(DeviceStatus::Provisioning);
            return CycleReport::provisioning(ProvisionCause::ButtonRequest);
        }

        let config = match io.config.load() {
            Ok(config) => config,
            Err(e) => {
                let cause = match e {
                    ConfigError::NotProvisioned => ProvisionCause::NotProvisioned,
                    _ => ProvisionCause::ConfigCorrupt,
                };
                log_warn!("No usable configuration ({}), provisioning", e);
                io.indicator.show(DeviceStatus::Provisioning);
                return CycleReport::provisioning(cause);
            }
        };

        let Restored { snapshot: prev, mut cycle, first_boot } = io.retained.load_or_init();
        cycle.begin_cycle(&config);

        io.indicator.show(DeviceStatus::Measuring);
        let live = self.aggregator.capture(&mut *io.sensors, cycle.pulse_totals());
        cycle.set_pulse_totals(live.pulse_totals());
        if !live.faults.is_empty() {
            io.indicator.show(DeviceStatus::SensorFault);
        }

        let verdict = self.evaluator.decide(&live, &prev, &cycle, &config, first_boot);
        log_info!(
            "Cycle {}: {:?} ({:?}), {} cycles since full report",
            cycle.total_cycles,
            verdict.decision,
            verdict.trigger,
            cycle.elapsed_cycles
        );

        let next = prev.updated(&live, verdict.critical);

        let delivered = if verdict.decision.is_post() {
            match self.deliver(io, &config, &live, &verdict, &mut cycle) {
                Delivery::Delivered => true,
                Delivery::Abandoned => false,
                Delivery::Escalated => {
                    cycle.record_outcome(&verdict.decision, false, &config);
                    let persisted = match io.retained.commit(&next, &cycle) {
                        Ok(()) => true,
                        Err(e) => {
                            log_error!("Retained commit before provisioning failed: {}", e);
                            false
                        }
                    };
                    io.indicator.show(DeviceStatus::Provisioning);
                    return CycleReport {
                        action: NextAction::Provision(ProvisionCause::ConnectivityExhausted),
                        verdict: Some(verdict),
                        live: Some(live),
                        delivered: false,
                        persisted,
                    };
                }
            }
        } else {
            false
        };

        cycle.record_outcome(&verdict.decision, delivered, &config);

        let pending = verdict.decision.is_full() && !delivered;
        let duration = self.scheduler.next_sleep_duration(&config, pending);
        let persisted = self
            .scheduler
            .prepare_for_sleep(&mut *io.retained, &mut *io.sleep, &next, &cycle, duration)
            .is_ok();

        CycleReport {
            action: NextAction::Sleep(duration),
            verdict: Some(verdict),
            live: Some(live),
            delivered,
            persisted,
        }
    }

    #[cfg_attr(not(feature = "log"), allow(unused_variables))]
    fn deliver<M, S, R, C, B, P, T>(
        &self,
        io: &mut CycleIo<'_, M, S, R, C, B, P, T>,
        config: &PersistentConfig,
        live: &LiveSnapshot,
        verdict: &Verdict,
        cycle: &mut CycleState,
    ) -> Delivery
    where
        T: Transport,
    {
        let device_id = config.device_id().unwrap_or_default();
        let report = Report::build(
            &verdict.decision,
            live,
            cycle,
            verdict.critical,
            device_id,
            io.clock.now_secs(),
        );
        let body = match report.map(|r| r.encode()) {
            Some(Ok(body)) => body,
            Some(Err(e)) => {
                log_error!("Report abandoned: {}", e);
                return Delivery::Abandoned;
            }
            None => return Delivery::Abandoned,
        };

        let mut gatekeeper = Gatekeeper::new(self.policy.connectivity);
        io.indicator.show(DeviceStatus::Posting);

        for attempt in 0..self.policy.connectivity.attempts_per_cycle {
            match gatekeeper.ensure_connected(&mut *io.transport, config, cycle, attempt) {
                ConnectResult::Connected(mut handle) => {
                    let result = gatekeeper.post(&mut *io.transport, &mut handle, &body, cycle);
                    gatekeeper.disconnect(&mut *io.transport, handle);
                    match result {
                        PostResult::Delivered => {
                            io.indicator.show(DeviceStatus::Delivered);
                            return Delivery::Delivered;
                        }
                        PostResult::Failed(_) => {}
                        PostResult::EnterProvisioning => return Delivery::Escalated,
                    }
                }
                ConnectResult::Retry => {}
                ConnectResult::EnterProvisioning => return Delivery::Escalated,
            }
        }

        log_warn!(
            "Giving up after {} attempts, {} consecutive failures",
            self.policy.connectivity.attempts_per_cycle,
            cycle.reconnect_attempts
        );
        io.indicator.show(DeviceStatus::ConnectFailed);
        Delivery::Abandoned
    }
}
