//! Desktop simulator for the dispenser wake cycle.
//!
//! Runs the real engine against file-backed storage in `--state-dir`, with a
//! synthetic world feeding the sensors and a transport that logs report
//! bodies. State carries over between runs the way it does across deep
//! sleep, so a second invocation continues where the first stopped.
//!
//! ```text
//! dispenser-sim --config device.json --cycles 200 --outage 40:12
//! RUST_LOG=debug dispenser-sim --power-loss --cycles 5
//! ```

mod devices;
mod storage;
mod world;

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use serde::Serialize;

use dispenser_core::config::SaveOutcome;
use dispenser_core::engine::CycleIo;
use dispenser_core::sensors::SensorSuite;
use dispenser_core::time::FixedTime;
use dispenser_core::{
    ConfigStore, DevicePolicy, Engine, NextAction, PersistentConfig, PostDecision, ProvisionCause,
    RetainedStore, WakeInputs,
};

use crate::devices::{LogIndicator, LoggingTransport, Probe, SimSleep};
use crate::storage::{FileNvStorage, FileRetained};
use crate::world::{World, WorldParams};

#[derive(Parser, Debug)]
#[command(name = "dispenser-sim", version, about = "Run dispenser wake cycles on the desktop")]
struct Args {
    /// Directory holding the config slots and retained region
    #[arg(long, value_name = "DIR", default_value = "dispenser-state")]
    state_dir: PathBuf,

    /// Provision from this JSON config before running
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Wake cycles to run
    #[arg(long, default_value_t = 48)]
    cycles: u32,

    /// Level reading of a full dispenser, in cm
    #[arg(long, default_value_t = 20.0)]
    full_cm: f32,

    /// Level lost per use, in cm
    #[arg(long, default_value_t = 0.4)]
    usage_cm: f32,

    /// Refill when the level falls below this, in cm
    #[arg(long, default_value_t = 2.5)]
    refill_below_cm: f32,

    /// Take the link down for LEN wakes starting at wake START
    #[arg(long, value_name = "START:LEN", value_parser = parse_outage)]
    outage: Option<Range<u32>>,

    /// Lose power before the first wake
    #[arg(long)]
    power_loss: bool,

    /// Hold the reset switch on the first wake
    #[arg(long)]
    button: bool,

    /// Print a JSON summary on stdout
    #[arg(long)]
    summary: bool,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    cycles: u32,
    full_posts: u32,
    partial_posts: u32,
    skips: u32,
    delivered: u32,
    provisioning: u32,
    simulated_secs: u64,
    final_level_cm: f32,
}

fn parse_outage(arg: &str) -> Result<Range<u32>, String> {
    let (start, len) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected START:LEN, got '{}'", arg))?;
    let start: u32 = start.parse().map_err(|e| format!("start: {}", e))?;
    let len: u32 = len.parse().map_err(|e| format!("length: {}", e))?;
    Ok(start..start.saturating_add(len))
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn load_config(path: &Path) -> Result<PersistentConfig> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: PersistentConfig =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("validating {}", path.display()))?;
    Ok(config)
}

/// Stand-in for the provisioning portal: store the config the user entered
fn provision(store: &mut ConfigStore<FileNvStorage>, config: &PersistentConfig) -> Result<()> {
    match store.save(config).context("saving configuration")? {
        SaveOutcome::Unchanged => info!("Configuration unchanged"),
        SaveOutcome::Written { slot, sequence } => {
            info!("Configuration written to slot {:?} (sequence {})", slot, sequence)
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();

    let provisioned = args.config.as_deref().map(load_config).transpose()?;

    let mut config_store = ConfigStore::new(FileNvStorage::new(&args.state_dir));
    if let Some(config) = &provisioned {
        provision(&mut config_store, config)?;
    }

    let memory = FileRetained::new(&args.state_dir);
    if args.power_loss {
        memory.power_loss().context("clearing retained region")?;
        info!("Power lost: retained region cleared");
    }
    let mut retained = RetainedStore::new(memory);

    let mut world = World::new(WorldParams {
        full_cm: args.full_cm,
        usage_cm: args.usage_cm,
        refill_below_cm: args.refill_below_cm,
    });
    let first = world.step();
    let mut sensors = SensorSuite::new(
        Probe::new(first.echo),
        Probe::new(first.climate),
        Probe::new(first.charge),
        Probe::new(first.pulses),
    );

    let start_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before 1970")?
        .as_millis() as u64;
    let mut clock = FixedTime::new(start_ms);
    let mut transport = LoggingTransport::new(args.outage.clone());
    let mut sleep = SimSleep::default();
    let mut indicator = LogIndicator;
    let engine = Engine::new(DevicePolicy::default());
    let mut summary = Summary::default();

    for wake in 0..args.cycles {
        if wake > 0 {
            let sample = world.step();
            sensors.ranging.set(sample.echo);
            sensors.climate.set(sample.climate);
            sensors.battery.set(sample.charge);
            sensors.pulses.set(sample.pulses);
        }
        transport.set_wake(wake);

        let inputs = WakeInputs { provisioning_requested: args.button && wake == 0 };
        let report = {
            let mut io = CycleIo {
                retained: &mut retained,
                config: &config_store,
                sensors: &mut sensors,
                transport: &mut transport,
                clock: &clock,
                indicator: &mut indicator,
                sleep: &mut sleep,
            };
            engine.run_cycle(&mut io, inputs)
        };

        summary.cycles += 1;
        match report.verdict.map(|v| v.decision) {
            Some(PostDecision::FullPost) => summary.full_posts += 1,
            Some(PostDecision::PartialPost(_)) => summary.partial_posts += 1,
            Some(PostDecision::Skip) => summary.skips += 1,
            None => {}
        }
        if report.delivered {
            summary.delivered += 1;
        }

        match report.action {
            NextAction::Sleep(_) => {
                // The wake timer runs for whatever the platform was asked for
                let slept = sleep.last.take().unwrap_or_default();
                clock.advance(slept.as_millis() as u64);
                summary.simulated_secs += slept.as_secs();
            }
            NextAction::Provision(cause) => {
                summary.provisioning += 1;
                warn!("Wake {}: provisioning ({:?})", wake, cause);
                match (&provisioned, cause) {
                    (Some(config), _) => provision(&mut config_store, config)?,
                    (
                        None,
                        ProvisionCause::ButtonRequest | ProvisionCause::ConnectivityExhausted,
                    ) => info!("No --config given, keeping the stored configuration"),
                    (None, _) => bail!("device needs provisioning; pass --config"),
                }
            }
        }
    }

    summary.final_level_cm = world.level_cm();
    info!(
        "{} wakes: {} full, {} partial, {} skipped, {} delivered by transport",
        summary.cycles,
        summary.full_posts,
        summary.partial_posts,
        summary.skips,
        transport.delivered
    );

    if args.summary {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outage_parses() {
        assert_eq!(parse_outage("40:12"), Ok(40..52));
        assert!(parse_outage("40").is_err());
        assert!(parse_outage("x:3").is_err());
    }

    #[test]
    fn config_file_loads() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("device.json");
        fs::write(
            &path,
            r#"{"connectionString":"HostName=h;DeviceId=sim-01;SharedAccessKey=k",
                "ssid":"lab","passphrase":"pw","deepSleepSecs":300,
                "temperaturePostInterval":0,"distancePostInterval":0,
                "batteryPostInterval":6,"allStateInterval":0,"postAllInfo":false}"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.device_id(), Some("sim-01"));
        assert_eq!(config.deep_sleep_secs, 300);
        assert_eq!(config.battery_post_interval, 6);
    }

    #[test]
    fn cli_defaults() {
        let args = Args::parse_from(["dispenser-sim"]);
        assert_eq!(args.cycles, 48);
        assert!(args.outage.is_none());
        assert!(!args.power_loss);
    }
}
