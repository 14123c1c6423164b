//! Integration tests for connectivity escalation and configuration faults
//!
//! Every path that ends a cycle in provisioning instead of sleep.

#![cfg(test)]

mod common;

use core::time::Duration;

use common::{provisioned_config, Device};
use dispenser_core::traits::{DeviceStatus, Slot};
use dispenser_core::{NextAction, PostDecision, ProvisionCause, Trigger, WakeInputs};

fn provisioning_count(actions: &[NextAction]) -> usize {
    actions
        .iter()
        .filter(|a| matches!(a, NextAction::Provision(ProvisionCause::ConnectivityExhausted)))
        .count()
}

#[test]
fn offline_full_report_is_redelivered() {
    let mut device = Device::provisioned();
    device.cloud.online = false;

    let first = device.wake();
    assert!(!first.delivered);
    assert_eq!(first.action, NextAction::Sleep(Duration::from_secs(60)));
    assert!(device.restored().cycle.full_post_pending);

    device.cloud.online = true;
    let second = device.wake();
    let verdict = second.verdict.expect("evaluated");
    assert_eq!(verdict.decision, PostDecision::FullPost);
    assert_eq!(verdict.trigger, Trigger::Redelivery);
    assert!(second.delivered);
    assert_eq!(second.action, NextAction::Sleep(Duration::from_secs(600)));

    let restored = device.restored().cycle;
    assert!(!restored.full_post_pending);
    assert_eq!(restored.reconnect_attempts, 0);
    assert_eq!(restored.elapsed_cycles, 0);
}

#[test]
fn escalates_exactly_once_at_failure_limit() {
    let mut device = Device::provisioned();
    device.cloud.online = false;

    // Three attempts per wake: 3, 6, 9 consecutive failures
    let mut actions: Vec<_> = device.wake_n(3).iter().map(|r| r.action).collect();
    assert_eq!(device.restored().cycle.reconnect_attempts, 9);
    assert_eq!(provisioning_count(&actions), 0);

    // The tenth failure escalates on the first attempt of the fourth wake
    let report = device.wake();
    assert_eq!(report.action, NextAction::Provision(ProvisionCause::ConnectivityExhausted));
    assert!(report.persisted);
    assert_eq!(device.cloud.connects, 10);
    assert_eq!(device.sleep.slept.len(), 3);
    assert_eq!(device.status.shown.last(), Some(&DeviceStatus::Provisioning));
    actions.push(report.action);

    let restored = device.restored().cycle;
    assert_eq!(restored.reconnect_attempts, 0);
    assert_eq!(restored.reset_count, 1);

    // Counting starts over; the next failures do not escalate again
    actions.extend(device.wake_n(3).iter().map(|r| r.action));
    assert_eq!(provisioning_count(&actions), 1);
    assert_eq!(device.restored().cycle.reconnect_attempts, 9);
    assert_eq!(device.restored().cycle.reset_count, 1);
}

#[test]
fn escalation_with_failed_commit_starts_fresh() {
    let mut device = Device::provisioned();
    device.cloud.online = false;
    device.wake_n(3);

    device.retained.memory_mut().set_fail_writes(true);
    let report = device.wake();
    assert_eq!(report.action, NextAction::Provision(ProvisionCause::ConnectivityExhausted));
    assert!(!report.persisted);

    // Not the 9-failure record from the wake before
    let restored = device.restored();
    assert!(restored.first_boot);
    assert_eq!(restored.cycle.reconnect_attempts, 0);
}

#[test]
fn reset_count_reaches_the_cloud() {
    let mut device = Device::provisioned();
    device.cloud.online = false;
    device.wake_n(4);

    device.cloud.online = true;
    let report = device.wake();
    assert!(report.delivered);
    assert_eq!(device.cloud.last_report()["resetCount"], 1);
}

#[test]
fn rejected_sends_count_as_failures() {
    let mut device = Device::provisioned();
    device.cloud.reject_sends = true;

    let report = device.wake();
    assert!(!report.delivered);
    assert_eq!(device.cloud.connects, 3);
    assert_eq!(device.cloud.disconnects, 3);
    assert_eq!(device.restored().cycle.reconnect_attempts, 3);
}

#[test]
fn success_clears_failure_streak() {
    let mut device = Device::provisioned();
    device.cloud.online = false;
    device.wake_n(2);
    assert_eq!(device.restored().cycle.reconnect_attempts, 6);

    device.cloud.online = true;
    device.wake();
    assert_eq!(device.restored().cycle.reconnect_attempts, 0);
}

#[test]
fn quiet_cycle_never_touches_radio() {
    let mut device = Device::provisioned();
    device.wake();
    device.cloud.online = false;

    device.wake_n(5);
    assert_eq!(device.cloud.connects, 1);
    assert_eq!(device.restored().cycle.reconnect_attempts, 0);
}

#[test]
fn unprovisioned_device_enters_provisioning() {
    let mut device = Device::unprovisioned();
    let report = device.wake();

    assert_eq!(report.action, NextAction::Provision(ProvisionCause::NotProvisioned));
    assert!(report.verdict.is_none());
    assert!(device.sleep.slept.is_empty());
    assert_eq!(device.cloud.connects, 0);
}

#[test]
fn corrupt_config_enters_provisioning() {
    let mut device = Device::provisioned();
    device.config.storage_mut().corrupt(Slot::A, 20);

    let report = device.wake();
    assert_eq!(report.action, NextAction::Provision(ProvisionCause::ConfigCorrupt));
}

#[test]
fn torn_config_update_falls_back_to_previous() {
    let mut device = Device::provisioned();
    let mut updated = provisioned_config();
    updated.deep_sleep_secs = 120;

    device.config.storage_mut().tear_next_write(8);
    // The torn write lands in slot B; slot A still holds the old record
    let _ = device.config.save(&updated);

    let report = device.wake();
    assert_eq!(report.action, NextAction::Sleep(Duration::from_secs(600)));
}

#[test]
fn reset_switch_skips_the_cycle() {
    let mut device = Device::provisioned();
    device.wake();
    let before = *device.retained.memory().bytes();

    let report = device.wake_with(WakeInputs { provisioning_requested: true });
    assert_eq!(report.action, NextAction::Provision(ProvisionCause::ButtonRequest));
    assert_eq!(*device.retained.memory().bytes(), before);
    assert_eq!(device.cloud.connects, 1);
}
