//! Connectivity Gatekeeper
//!
//! ## Overview
//!
//! Owns the radio for one wake cycle and decides when the device should stop
//! trying and fall back to provisioning. Connecting is only attempted when
//! the evaluator asked for a post.
//!
//! ## State Machine
//!
//! ```text
//!                 ┌──────────── success ────────────┐
//!                 │                                 ▼
//! Disconnected ─► Connecting ──failure──► Failed   Connected ◄─► Posting
//!                                           │                      │
//!                                           │  consecutive          │ send failure
//!                                           │  failures = max       ▼
//!                                           └───────────────────► Failed
//!                                                    │
//!                                                    ▼
//!                                              Provisioning
//! ```
//!
//! Every connect or send failure increments `CycleState::reconnect_attempts`,
//! which survives deep sleep. Only a delivered report clears it: an endpoint
//! that accepts connections but rejects every message still escalates. The
//! failure that brings it to `max_consecutive_failures` returns
//! `EnterProvisioning`; that happens once per escalation, because the counter
//! restarts from zero.

use core::time::Duration;

use crate::constants::time::{
    CONNECT_ATTEMPTS_PER_CYCLE, CONNECT_TIMEOUT_MS, MAX_CONSECUTIVE_FAILURES, SEND_TIMEOUT_MS,
};
use crate::config::PersistentConfig;
use crate::cycle::CycleState;
use crate::errors::SendError;
use crate::traits::Transport;

/// Credentials handed to [`Transport::connect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials<'a> {
    /// Wi-Fi network name
    pub ssid: &'a str,
    /// Wi-Fi passphrase
    pub passphrase: &'a str,
    /// Cloud connection string
    pub connection_string: &'a str,
}

/// Retry and timeout policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityPolicy {
    /// Connection attempts before a cycle gives up on its post
    pub attempts_per_cycle: u8,
    /// Consecutive failures, across cycles, before provisioning
    pub max_consecutive_failures: u16,
    /// Limit for one connection attempt
    pub connect_timeout: Duration,
    /// Limit for one report delivery
    pub send_timeout: Duration,
}

impl Default for ConnectivityPolicy {
    fn default() -> Self {
        Self {
            attempts_per_cycle: CONNECT_ATTEMPTS_PER_CYCLE,
            max_consecutive_failures: MAX_CONSECUTIVE_FAILURES,
            connect_timeout: Duration::from_millis(CONNECT_TIMEOUT_MS),
            send_timeout: Duration::from_millis(SEND_TIMEOUT_MS),
        }
    }
}

/// Link state within a wake cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Radio off
    Disconnected,
    /// Connection attempt in progress
    Connecting,
    /// Session open
    Connected,
    /// Report in flight
    Posting,
    /// Last attempt failed
    Failed,
    /// Given up; provisioning must take over
    Provisioning,
}

/// Outcome of [`Gatekeeper::ensure_connected`]
#[derive(Debug)]
pub enum ConnectResult<H> {
    /// Session open
    Connected(H),
    /// Attempt failed; the caller may try again within its budget
    Retry,
    /// Failure limit reached
    EnterProvisioning,
}

/// Outcome of [`Gatekeeper::post`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostResult {
    /// Report acknowledged
    Delivered,
    /// Delivery failed
    Failed(SendError),
    /// Failure limit reached
    EnterProvisioning,
}

/// Connection state machine with provisioning escalation
#[derive(Debug, Clone)]
pub struct Gatekeeper {
    policy: ConnectivityPolicy,
    state: LinkState,
}

impl Gatekeeper {
    /// Gatekeeper with the radio off
    pub fn new(policy: ConnectivityPolicy) -> Self {
        Self {
            policy,
            state: LinkState::Disconnected,
        }
    }

    /// Current link state
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Policy in use
    pub fn policy(&self) -> &ConnectivityPolicy {
        &self.policy
    }

    /// Try to open a session
    ///
    /// `attempt` counts from zero within this cycle; attempts past the
    /// per-cycle budget are refused without touching the radio.
    #[cfg_attr(not(feature = "log"), allow(unused_variables))]
    pub fn ensure_connected<T: Transport>(
        &mut self,
        transport: &mut T,
        config: &PersistentConfig,
        cycle: &mut CycleState,
        attempt: u8,
    ) -> ConnectResult<T::Handle> {
        if self.state == LinkState::Provisioning {
            return ConnectResult::EnterProvisioning;
        }
        if attempt >= self.policy.attempts_per_cycle {
            log_debug!("Attempt budget of {} used up", self.policy.attempts_per_cycle);
            return ConnectResult::Retry;
        }

        self.state = LinkState::Connecting;
        log_debug!("Connecting to {} (attempt {})", config.ssid.as_str(), attempt + 1);

        match transport.connect(&config.credentials(), self.policy.connect_timeout) {
            Ok(handle) => {
                self.state = LinkState::Connected;
                ConnectResult::Connected(handle)
            }
            Err(e) => {
                log_warn!("Connection attempt {} failed: {}", attempt + 1, e);
                if self.record_failure(cycle) {
                    ConnectResult::EnterProvisioning
                } else {
                    ConnectResult::Retry
                }
            }
        }
    }

    /// Deliver one report over an open session
    pub fn post<T: Transport>(
        &mut self,
        transport: &mut T,
        handle: &mut T::Handle,
        payload: &[u8],
        cycle: &mut CycleState,
    ) -> PostResult {
        if self.state == LinkState::Provisioning {
            return PostResult::EnterProvisioning;
        }

        self.state = LinkState::Posting;
        match transport.send(handle, payload, self.policy.send_timeout) {
            Ok(()) => {
                self.state = LinkState::Connected;
                cycle.reconnect_attempts = 0;
                log_info!("Report delivered ({} bytes)", payload.len());
                PostResult::Delivered
            }
            Err(e) => {
                log_warn!("Report delivery failed: {}", e);
                if self.record_failure(cycle) {
                    PostResult::EnterProvisioning
                } else {
                    PostResult::Failed(e)
                }
            }
        }
    }

    /// Close the session and power the radio down
    pub fn disconnect<T: Transport>(&mut self, transport: &mut T, handle: T::Handle) {
        transport.disconnect(handle);
        if self.state != LinkState::Provisioning {
            self.state = LinkState::Disconnected;
        }
    }

    // True when this failure escalates to provisioning
    fn record_failure(&mut self, cycle: &mut CycleState) -> bool {
        cycle.reconnect_attempts = cycle.reconnect_attempts.saturating_add(1);

        if cycle.reconnect_attempts >= self.policy.max_consecutive_failures {
            log_error!(
                "{} consecutive connectivity failures, entering provisioning",
                cycle.reconnect_attempts
            );
            cycle.reconnect_attempts = 0;
            cycle.reset_count = cycle.reset_count.saturating_add(1);
            self.state = LinkState::Provisioning;
            true
        } else {
            self.state = LinkState::Failed;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConnError;

    /// Transport that fails a scripted number of times
    struct Flaky {
        connect_failures: usize,
        send_failures: usize,
        connects: usize,
    }

    impl Flaky {
        fn new(connect_failures: usize, send_failures: usize) -> Self {
            Self { connect_failures, send_failures, connects: 0 }
        }
    }

    impl Transport for Flaky {
        type Handle = ();

        fn connect(&mut self, _: &Credentials<'_>, _: Duration) -> Result<(), ConnError> {
            self.connects += 1;
            if self.connect_failures > 0 {
                self.connect_failures -= 1;
                return Err(ConnError::Timeout);
            }
            Ok(())
        }

        fn send(&mut self, _: &mut (), _: &[u8], _: Duration) -> Result<(), SendError> {
            if self.send_failures > 0 {
                self.send_failures -= 1;
                return Err(SendError::Timeout);
            }
            Ok(())
        }
    }

    fn config() -> PersistentConfig {
        PersistentConfig::new("HostName=h;DeviceId=d1;SharedAccessKey=k", "net", "pw").unwrap()
    }

    #[test]
    fn default_policy() {
        let policy = ConnectivityPolicy::default();
        assert_eq!(policy.attempts_per_cycle, 3);
        assert_eq!(policy.max_consecutive_failures, 10);
        assert_eq!(policy.connect_timeout, Duration::from_secs(10));
        assert_eq!(policy.send_timeout, Duration::from_secs(5));
    }

    #[test]
    fn delivery_clears_failures() {
        let mut gate = Gatekeeper::new(ConnectivityPolicy::default());
        let mut transport = Flaky::new(0, 0);
        let mut cycle = CycleState { reconnect_attempts: 4, ..Default::default() };

        let ConnectResult::Connected(mut handle) =
            gate.ensure_connected(&mut transport, &config(), &mut cycle, 0)
        else {
            panic!("expected connection");
        };
        assert_eq!(gate.state(), LinkState::Connected);
        assert_eq!(cycle.reconnect_attempts, 4);

        gate.post(&mut transport, &mut handle, b"{}", &mut cycle);
        assert_eq!(cycle.reconnect_attempts, 0);
    }

    #[test]
    fn failure_counts_and_retries() {
        let mut gate = Gatekeeper::new(ConnectivityPolicy::default());
        let mut transport = Flaky::new(1, 0);
        let mut cycle = CycleState::default();

        let first = gate.ensure_connected(&mut transport, &config(), &mut cycle, 0);
        assert!(matches!(first, ConnectResult::Retry));
        assert_eq!(gate.state(), LinkState::Failed);
        assert_eq!(cycle.reconnect_attempts, 1);

        let second = gate.ensure_connected(&mut transport, &config(), &mut cycle, 1);
        assert!(matches!(second, ConnectResult::Connected(())));
    }

    #[test]
    fn escalates_exactly_once_at_limit() {
        let mut gate = Gatekeeper::new(ConnectivityPolicy::default());
        let mut transport = Flaky::new(100, 0);
        let mut cycle = CycleState::default();

        for n in 0..9 {
            let result = gate.ensure_connected(&mut transport, &config(), &mut cycle, 0);
            assert!(matches!(result, ConnectResult::Retry), "failure {} escalated early", n + 1);
        }

        let tenth = gate.ensure_connected(&mut transport, &config(), &mut cycle, 0);
        assert!(matches!(tenth, ConnectResult::EnterProvisioning));
        assert_eq!(cycle.reset_count, 1);
        assert_eq!(cycle.reconnect_attempts, 0);

        // Already provisioning: no more radio use, no second escalation
        let again = gate.ensure_connected(&mut transport, &config(), &mut cycle, 0);
        assert!(matches!(again, ConnectResult::EnterProvisioning));
        assert_eq!(transport.connects, 10);
        assert_eq!(cycle.reset_count, 1);
    }

    #[test]
    fn budget_exhausted_skips_radio() {
        let mut gate = Gatekeeper::new(ConnectivityPolicy::default());
        let mut transport = Flaky::new(0, 0);
        let mut cycle = CycleState::default();

        let result = gate.ensure_connected(&mut transport, &config(), &mut cycle, 3);
        assert!(matches!(result, ConnectResult::Retry));
        assert_eq!(transport.connects, 0);
    }

    #[test]
    fn send_failures_count_toward_escalation() {
        let mut gate = Gatekeeper::new(ConnectivityPolicy::default());
        let mut transport = Flaky::new(0, 1);
        let mut cycle = CycleState { reconnect_attempts: 9, ..Default::default() };

        let ConnectResult::Connected(mut handle) =
            gate.ensure_connected(&mut transport, &config(), &mut cycle, 0)
        else {
            panic!("expected connection");
        };
        assert_eq!(cycle.reconnect_attempts, 9);

        let result = gate.post(&mut transport, &mut handle, b"{}", &mut cycle);
        assert_eq!(result, PostResult::EnterProvisioning);
        assert_eq!(gate.state(), LinkState::Provisioning);
    }

    #[test]
    fn delivered_post_returns_to_connected() {
        let mut gate = Gatekeeper::new(ConnectivityPolicy::default());
        let mut transport = Flaky::new(0, 0);
        let mut cycle = CycleState::default();

        if let ConnectResult::Connected(mut handle) =
            gate.ensure_connected(&mut transport, &config(), &mut cycle, 0)
        {
            assert_eq!(
                gate.post(&mut transport, &mut handle, b"{}", &mut cycle),
                PostResult::Delivered
            );
            assert_eq!(gate.state(), LinkState::Connected);
            gate.disconnect(&mut transport, handle);
        }
        assert_eq!(gate.state(), LinkState::Disconnected);
    }
}
