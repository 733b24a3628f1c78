//! Connection state machine.
//!
//! `ConnectionMachine` holds all per-session state and decides what happens
//! on each event. It performs no I/O itself: every method returns the
//! [`Action`]s the driver must carry out. This keeps the machine
//! deterministic and testable without a network or a runtime.

use crate::dispatcher::DispatchOutcome;
use crate::event::StatusEvent;
use crate::notice::ErrorNotice;
use crate::retry::RetryPolicy;
use frontdesk_protocol::{EnvelopeKind, RecordId};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// The state of the live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and none wanted.
    Disconnected,
    /// An attempt is in flight.
    Connecting,
    /// The connection is open and delivering updates.
    Connected,
    /// Waiting for the retry delay after a failure.
    Reconnecting,
    /// The retry budget is exhausted.
    Failed,
}

impl ConnectionState {
    /// Returns true if a physical connection exists or is being made.
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }

    /// Returns true if the machine will not reconnect on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Failed | ConnectionState::Disconnected)
    }
}

/// Side effect requested by the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Open a new connection tagged with `generation`.
    Connect {
        /// Attempt tag; events from other generations are stale.
        generation: u64,
    },
    /// Arm the retry timer.
    ScheduleRetry {
        /// Time until the next attempt.
        delay: Duration,
    },
    /// Disarm the retry timer.
    CancelRetry,
    /// Close the current connection or abandon the current attempt.
    Close,
}

/// Snapshot of the observable machine fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStatus {
    /// Current state.
    pub state: ConnectionState,
    /// Consecutive failed attempts in the current episode.
    pub retry_counter: u32,
    /// Whether the failure notice is being shown.
    pub error_flag: bool,
}

/// Statistics about a session.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Successful opens.
    pub connects: u64,
    /// Failed attempts and dropped connections.
    pub failed_attempts: u64,
    /// Attempts started by the retry timer.
    pub retries: u64,
    /// Frames received while connected.
    pub frames_received: u64,
    /// Frames that failed to decode.
    pub frames_discarded: u64,
    /// Frames of unknown kind.
    pub frames_ignored: u64,
    /// Records inserted.
    pub updates_inserted: u64,
    /// Records replaced.
    pub updates_replaced: u64,
    /// Updates for ids the store did not hold.
    pub updates_dropped: u64,
    /// Last successful open.
    pub last_connected: Option<Instant>,
    /// Last failure reason.
    pub last_error: Option<String>,
}

/// Per-session connection state.
///
/// Owns the state, the retry counter, the error flag and notice, and the
/// in-flight and tearing-down guards. One instance serves one credential.
pub struct ConnectionMachine {
    policy: Box<dyn RetryPolicy>,
    state: ConnectionState,
    retry_counter: u32,
    error_flag: bool,
    notice: Option<ErrorNotice>,
    in_flight: bool,
    retry_pending: bool,
    tearing_down: bool,
    generation: u64,
    stats: SyncStats,
    events: Option<broadcast::Sender<StatusEvent>>,
}

impl ConnectionMachine {
    /// Creates a machine in `Disconnected`.
    pub fn new(policy: impl RetryPolicy + 'static) -> Self {
        Self {
            policy: Box::new(policy),
            state: ConnectionState::Disconnected,
            retry_counter: 0,
            error_flag: false,
            notice: None,
            in_flight: false,
            retry_pending: false,
            tearing_down: false,
            generation: 0,
            stats: SyncStats::default(),
            events: None,
        }
    }

    /// Publishes status events on `sender`.
    pub fn with_events(mut self, sender: broadcast::Sender<StatusEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Gets the current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Gets the retry counter.
    pub fn retry_counter(&self) -> u32 {
        self.retry_counter
    }

    /// Returns true while the failure notice is being shown.
    pub fn error_flag(&self) -> bool {
        self.error_flag
    }

    /// Gets the surfaced notice, if any.
    pub fn notice(&self) -> Option<&ErrorNotice> {
        self.notice.as_ref()
    }

    /// Returns true while a connection attempt is unresolved.
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Returns true once teardown has begun.
    pub fn is_tearing_down(&self) -> bool {
        self.tearing_down
    }

    /// Returns the tag of the latest attempt.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.clone()
    }

    /// Gets the observable fields.
    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            state: self.state,
            retry_counter: self.retry_counter,
            error_flag: self.error_flag,
        }
    }

    /// Starts the first attempt.
    ///
    /// Only valid from `Disconnected` before teardown; a second call while an
    /// attempt is in flight does nothing.
    pub fn start(&mut self) -> Vec<Action> {
        if self.tearing_down {
            debug!("Ignoring start after teardown");
            return Vec::new();
        }
        if self.in_flight {
            debug!(generation = self.generation, "Connection attempt already in flight");
            return Vec::new();
        }
        if self.state != ConnectionState::Disconnected {
            debug!(state = ?self.state, "Ignoring start outside Disconnected");
            return Vec::new();
        }
        vec![self.begin_attempt()]
    }

    /// The transport for `generation` opened.
    pub fn on_open(&mut self, generation: u64) -> Vec<Action> {
        if generation != self.generation {
            return Vec::new();
        }
        if self.tearing_down {
            // The attempt resolved after teardown began; close what it opened.
            self.in_flight = false;
            return vec![Action::Close];
        }
        if self.state != ConnectionState::Connecting {
            return Vec::new();
        }

        self.in_flight = false;
        self.retry_counter = 0;
        self.error_flag = false;
        if self.notice.take().is_some() {
            self.emit(StatusEvent::NoticeCleared);
        }
        self.stats.connects += 1;
        self.stats.last_connected = Some(Instant::now());

        info!(generation, "Live connection established");
        self.set_state(ConnectionState::Connected);
        Vec::new()
    }

    /// The transport for `generation` reported an error or closed.
    ///
    /// Counts one failed attempt and consults the retry policy. Repeated
    /// failure signals for the same attempt are ignored.
    pub fn on_failure(&mut self, generation: u64, reason: impl Into<String>) -> Vec<Action> {
        if generation != self.generation || self.tearing_down {
            return Vec::new();
        }
        if !self.state.is_active() {
            return Vec::new();
        }

        let reason = reason.into();
        self.in_flight = false;
        self.retry_counter += 1;
        self.stats.failed_attempts += 1;
        self.stats.last_error = Some(reason.clone());

        let decision = self.policy.should_retry(self.retry_counter);
        if decision.retry {
            warn!(
                attempt = self.retry_counter,
                delay_ms = decision.delay.as_millis() as u64,
                error = %reason,
                "Live connection lost, retrying"
            );
            self.retry_pending = true;
            self.set_state(ConnectionState::Reconnecting);
            vec![Action::ScheduleRetry {
                delay: decision.delay,
            }]
        } else {
            warn!(
                attempts = self.retry_counter,
                error = %reason,
                "Live connection failed, giving up"
            );
            self.set_state(ConnectionState::Failed);
            if !self.error_flag {
                self.error_flag = true;
                let notice = ErrorNotice::connection_failed(self.retry_counter, Some(reason));
                self.notice = Some(notice.clone());
                self.emit(StatusEvent::NoticeRaised(notice));
            }
            Vec::new()
        }
    }

    /// The retry timer fired.
    pub fn on_retry_elapsed(&mut self) -> Vec<Action> {
        if self.tearing_down || !self.retry_pending {
            return Vec::new();
        }
        self.retry_pending = false;
        if self.state != ConnectionState::Reconnecting || self.in_flight {
            return Vec::new();
        }
        self.stats.retries += 1;
        vec![self.begin_attempt()]
    }

    /// Deliberate teardown.
    ///
    /// Idempotent: only the first call has any effect. Does not touch the
    /// retry counter or consult the policy.
    pub fn teardown(&mut self) -> Vec<Action> {
        if self.tearing_down {
            return Vec::new();
        }
        self.tearing_down = true;

        let mut actions = Vec::new();
        if self.retry_pending {
            self.retry_pending = false;
            actions.push(Action::CancelRetry);
        }
        if self.in_flight || self.state == ConnectionState::Connected {
            self.in_flight = false;
            actions.push(Action::Close);
        }

        info!(generation = self.generation, "Tearing down live connection");
        self.set_state(ConnectionState::Disconnected);
        actions
    }

    /// Hides the notice without touching the connection or the counter.
    ///
    /// Returns false if there was nothing to dismiss.
    pub fn dismiss_notice(&mut self) -> bool {
        let had_notice = self.notice.take().is_some();
        if !had_notice && !self.error_flag {
            return false;
        }
        self.error_flag = false;
        self.emit(StatusEvent::NoticeCleared);
        true
    }

    /// Records a frame that was dispatched to the store.
    pub fn record_update(&mut self, kind: EnvelopeKind, record_id: RecordId, outcome: DispatchOutcome) {
        self.stats.frames_received += 1;
        match outcome {
            DispatchOutcome::Inserted => self.stats.updates_inserted += 1,
            DispatchOutcome::Replaced => self.stats.updates_replaced += 1,
            DispatchOutcome::Dropped => self.stats.updates_dropped += 1,
        }
        self.emit(StatusEvent::UpdateApplied {
            kind,
            record_id,
            outcome,
        });
    }

    /// Records a frame that failed to decode.
    pub fn record_discarded(&mut self, reason: impl Into<String>) {
        self.stats.frames_received += 1;
        self.stats.frames_discarded += 1;
        self.emit(StatusEvent::FrameDiscarded {
            reason: reason.into(),
        });
    }

    /// Records a frame of unknown kind.
    pub fn record_ignored(&mut self) {
        self.stats.frames_received += 1;
        self.stats.frames_ignored += 1;
    }

    fn begin_attempt(&mut self) -> Action {
        self.in_flight = true;
        self.generation += 1;
        self.set_state(ConnectionState::Connecting);
        Action::Connect {
            generation: self.generation,
        }
    }

    fn set_state(&mut self, to: ConnectionState) {
        let from = self.state;
        self.state = to;
        if from != to {
            debug!(from = ?from, to = ?to, retry_counter = self.retry_counter, "Connection state changed");
            self.emit(StatusEvent::StateChanged {
                from,
                to,
                retry_counter: self.retry_counter,
            });
        }
    }

    fn emit(&self, event: StatusEvent) {
        if let Some(events) = &self.events {
            // No receivers is fine.
            let _ = events.send(event);
        }
    }
}

impl std::fmt::Debug for ConnectionMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionMachine")
            .field("state", &self.state)
            .field("retry_counter", &self.retry_counter)
            .field("error_flag", &self.error_flag)
            .field("in_flight", &self.in_flight)
            .field("retry_pending", &self.retry_pending)
            .field("tearing_down", &self.tearing_down)
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;

    fn machine() -> ConnectionMachine {
        ConnectionMachine::new(RetryConfig::fixed(3, Duration::from_millis(3000)))
    }

    fn connect_generation(actions: &[Action]) -> u64 {
        match actions {
            [Action::Connect { generation }] => *generation,
            other => panic!("expected a single connect, got {:?}", other),
        }
    }

    #[test]
    fn connection_state_checks() {
        assert!(ConnectionState::Connecting.is_active());
        assert!(ConnectionState::Connected.is_active());
        assert!(!ConnectionState::Reconnecting.is_active());
        assert!(ConnectionState::Failed.is_terminal());
        assert!(!ConnectionState::Reconnecting.is_terminal());
    }

    #[test]
    fn start_enters_connecting_once() {
        let mut machine = machine();
        let generation = connect_generation(&machine.start());

        assert_eq!(machine.state(), ConnectionState::Connecting);
        assert!(machine.in_flight());
        assert!(machine.start().is_empty());
        assert_eq!(machine.generation(), generation);
    }

    #[test]
    fn open_resets_counter_and_flag() {
        let mut machine = machine();
        let g1 = connect_generation(&machine.start());
        machine.on_failure(g1, "refused");
        machine.on_retry_elapsed();
        let g2 = machine.generation();
        machine.on_failure(g2, "refused");
        assert_eq!(machine.retry_counter(), 2);

        let g3 = connect_generation(&machine.on_retry_elapsed());
        machine.on_open(g3);

        assert_eq!(machine.state(), ConnectionState::Connected);
        assert_eq!(machine.retry_counter(), 0);
        assert!(!machine.error_flag());
        assert!(!machine.in_flight());
        assert_eq!(machine.stats().connects, 1);
    }

    #[test]
    fn failure_schedules_retry_with_policy_delay() {
        let mut machine = machine();
        let generation = connect_generation(&machine.start());
        machine.on_open(generation);

        let actions = machine.on_failure(generation, "reset by peer");

        assert_eq!(
            actions,
            vec![Action::ScheduleRetry {
                delay: Duration::from_millis(3000)
            }]
        );
        assert_eq!(machine.state(), ConnectionState::Reconnecting);
        assert_eq!(machine.retry_counter(), 1);
    }

    #[test]
    fn duplicate_failure_signal_counts_once() {
        let mut machine = machine();
        let generation = connect_generation(&machine.start());

        machine.on_failure(generation, "error");
        let actions = machine.on_failure(generation, "close");

        assert!(actions.is_empty());
        assert_eq!(machine.retry_counter(), 1);
    }

    #[test]
    fn exhaustion_fails_with_single_notice() {
        let mut machine = machine();
        let mut generation = connect_generation(&machine.start());

        for _ in 0..2 {
            machine.on_failure(generation, "refused");
            generation = connect_generation(&machine.on_retry_elapsed());
        }
        let actions = machine.on_failure(generation, "refused");

        assert!(actions.is_empty());
        assert_eq!(machine.state(), ConnectionState::Failed);
        assert!(machine.error_flag());
        assert_eq!(machine.notice().unwrap().attempts, 3);

        // Failed is terminal: nothing restarts it.
        assert!(machine.on_retry_elapsed().is_empty());
        assert!(machine.start().is_empty());
        assert_eq!(machine.generation(), generation);
    }

    #[test]
    fn dismiss_keeps_counter_and_state() {
        let mut machine = ConnectionMachine::new(RetryConfig::no_retry());
        let generation = connect_generation(&machine.start());
        machine.on_failure(generation, "refused");

        assert!(machine.dismiss_notice());
        assert!(machine.notice().is_none());
        assert!(!machine.error_flag());
        assert_eq!(machine.retry_counter(), 1);
        assert_eq!(machine.state(), ConnectionState::Failed);
        assert!(!machine.dismiss_notice());
    }

    #[test]
    fn stale_generation_is_ignored() {
        let mut machine = machine();
        let g1 = connect_generation(&machine.start());
        machine.on_failure(g1, "refused");
        let g2 = connect_generation(&machine.on_retry_elapsed());

        assert!(machine.on_open(g1).is_empty());
        assert_eq!(machine.state(), ConnectionState::Connecting);
        assert!(machine.on_failure(g1, "late").is_empty());
        assert_eq!(machine.retry_counter(), 1);

        machine.on_open(g2);
        assert_eq!(machine.state(), ConnectionState::Connected);
    }

    #[test]
    fn teardown_cancels_pending_retry() {
        let mut machine = machine();
        let generation = connect_generation(&machine.start());
        machine.on_failure(generation, "refused");

        let actions = machine.teardown();

        assert_eq!(actions, vec![Action::CancelRetry]);
        assert_eq!(machine.state(), ConnectionState::Disconnected);
        assert!(machine.on_retry_elapsed().is_empty());
        assert_eq!(machine.state(), ConnectionState::Disconnected);
        assert_eq!(machine.retry_counter(), 1);
    }

    #[test]
    fn teardown_closes_live_connection_without_counting() {
        let mut machine = machine();
        let generation = connect_generation(&machine.start());
        machine.on_open(generation);

        assert_eq!(machine.teardown(), vec![Action::Close]);
        assert_eq!(machine.retry_counter(), 0);
        assert_eq!(machine.stats().failed_attempts, 0);

        // Close signal that follows our own close is not a failure.
        assert!(machine.on_failure(generation, "closed").is_empty());
        assert_eq!(machine.retry_counter(), 0);
    }

    #[test]
    fn teardown_is_idempotent() {
        let mut machine = machine();
        machine.start();

        assert_eq!(machine.teardown(), vec![Action::Close]);
        assert!(machine.teardown().is_empty());
        assert!(machine.is_tearing_down());
        assert!(machine.start().is_empty());
    }

    #[test]
    fn attempt_resolving_after_teardown_is_closed() {
        let mut machine = machine();
        let generation = connect_generation(&machine.start());
        machine.teardown();

        assert_eq!(machine.on_open(generation), vec![Action::Close]);
        assert_eq!(machine.state(), ConnectionState::Disconnected);
        assert_eq!(machine.stats().connects, 0);
    }

    #[test]
    fn events_report_counter_sequence() {
        let (tx, mut rx) = broadcast::channel(32);
        let mut machine = machine().with_events(tx);

        let mut generation = connect_generation(&machine.start());
        for _ in 0..2 {
            machine.on_failure(generation, "refused");
            generation = connect_generation(&machine.on_retry_elapsed());
        }
        machine.on_open(generation);

        let mut counters = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let StatusEvent::StateChanged { to, retry_counter, .. } = event {
                if matches!(to, ConnectionState::Reconnecting | ConnectionState::Connected) {
                    counters.push(retry_counter);
                }
            }
        }
        assert_eq!(counters, vec![1, 2, 0]);
    }

    #[test]
    fn frame_accounting() {
        let mut machine = machine();
        machine.record_update(EnvelopeKind::NewRequest, 1, DispatchOutcome::Inserted);
        machine.record_update(EnvelopeKind::RequestUpdated, 9, DispatchOutcome::Dropped);
        machine.record_discarded("bad json");
        machine.record_ignored();

        let stats = machine.stats();
        assert_eq!(stats.frames_received, 4);
        assert_eq!(stats.updates_inserted, 1);
        assert_eq!(stats.updates_dropped, 1);
        assert_eq!(stats.frames_discarded, 1);
        assert_eq!(stats.frames_ignored, 1);
    }
}
