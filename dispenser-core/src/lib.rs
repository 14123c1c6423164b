//! Wake-cycle engine for battery-powered sensor dispensers
//!
//! Decides, once per wake from deep sleep, whether the fresh sensor readings
//! are worth a radio transmission, keeps the small amount of state that has to
//! survive sleep, and picks the next sleep duration.
//!
//! Key constraints:
//! - Deep sleep is a restart; only the retained region and the non-volatile
//!   config survive it
//! - The radio is the dominant power draw, so connecting is the exception
//! - Every cycle ends in sleep or provisioning, never in a hang
//!
//! ```no_run
//! use dispenser_core::{
//!     CycleState, LiveSnapshot, PersistentConfig, PostDecision, SurvivableSnapshot,
//!     ThresholdEvaluator,
//! };
//!
//! let evaluator = ThresholdEvaluator::default();
//!
//! // Nothing survived in the retained region: report everything
//! let verdict = evaluator.decide(
//!     &LiveSnapshot::default(),
//!     &SurvivableSnapshot::UNINITIALIZED,
//!     &CycleState::default(),
//!     &PersistentConfig::default(),
//!     true,
//! );
//! assert_eq!(verdict.decision, PostDecision::FullPost);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

#[macro_use]
mod macros;

pub mod checksum;
pub mod config;
pub mod constants;
pub mod cycle;
pub mod connectivity;
pub mod engine;
pub mod errors;
pub mod evaluator;
pub mod metrics;
pub mod report;
pub mod retained;
pub mod scheduler;
pub mod sensors;
pub mod time;
pub mod traits;
pub mod validators;

// Public API
pub use config::{ConfigStore, PersistentConfig};
pub use connectivity::{ConnectResult, ConnectivityPolicy, Gatekeeper, LinkState};
pub use cycle::CycleState;
pub use engine::{CycleReport, DevicePolicy, Engine, NextAction, ProvisionCause, WakeInputs};
pub use errors::{ConfigError, ConnError, PersistenceWriteError, SendError, SensorError};
pub use evaluator::{PostDecision, ThresholdEvaluator, ThresholdPolicy, Trigger, Verdict};
pub use metrics::{Metric, MetricSet};
pub use retained::{RetainedStore, SurvivableSnapshot};
pub use scheduler::{SchedulePolicy, SleepScheduler};
pub use sensors::LiveSnapshot;

/// Firmware version reported to the cloud
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
