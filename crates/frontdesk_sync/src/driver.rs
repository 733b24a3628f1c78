//! Session driver task.
//!
//! One driver runs per session. It feeds every event (attempt opened, frame,
//! failure, retry timer) through the [`ConnectionMachine`] one at a time and
//! carries out the actions the machine returns. Each connection attempt runs
//! in its own pump task tagged with the attempt's generation, so events from
//! an abandoned attempt are recognized and dropped.

use crate::dispatcher::UpdateDispatcher;
use crate::retry::MAX_RETRY_DELAY;
use crate::state::{Action, ConnectionMachine, ConnectionState};
use crate::transport::{Connection, Transport, TransportEvent};
use frontdesk_protocol::decode_frame;
use frontdesk_store::StoreMutator;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

/// Machine shared between the driver and its controller.
pub(crate) type SharedMachine = Arc<Mutex<ConnectionMachine>>;

#[derive(Debug)]
enum PumpEvent {
    Opened,
    Frame(String),
    Failed(String),
}

type PumpSender = mpsc::UnboundedSender<(u64, PumpEvent)>;

struct Pump {
    generation: u64,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Runs one connection attempt and, if it opens, reads it until it ends.
async fn pump<T: Transport>(
    transport: Arc<T>,
    url: Url,
    generation: u64,
    events: PumpSender,
    mut stop: oneshot::Receiver<()>,
) {
    let connected = tokio::select! {
        result = transport.connect(&url) => result,
        _ = &mut stop => return,
    };

    let mut connection = match connected {
        Ok(connection) => connection,
        Err(e) => {
            let _ = events.send((generation, PumpEvent::Failed(e.to_string())));
            return;
        }
    };

    if events.send((generation, PumpEvent::Opened)).is_err() {
        connection.close().await;
        return;
    }

    loop {
        tokio::select! {
            event = connection.next_event() => {
                let failure = match event {
                    TransportEvent::Frame(text) => {
                        if events.send((generation, PumpEvent::Frame(text))).is_err() {
                            connection.close().await;
                            return;
                        }
                        continue;
                    }
                    TransportEvent::Closed(info) => info.to_string(),
                    TransportEvent::Error(message) => message,
                };
                let _ = events.send((generation, PumpEvent::Failed(failure)));
                return;
            }
            _ = &mut stop => {
                connection.close().await;
                return;
            }
        }
    }
}

/// Serializes session events through the machine.
pub(crate) struct Driver<T: Transport, M: StoreMutator> {
    machine: SharedMachine,
    transport: Arc<T>,
    url: Url,
    dispatcher: UpdateDispatcher<M>,
    events_tx: PumpSender,
    events_rx: mpsc::UnboundedReceiver<(u64, PumpEvent)>,
    pump: Option<Pump>,
    retry_at: Option<Instant>,
    shutdown: watch::Receiver<bool>,
}

impl<T: Transport, M: StoreMutator + 'static> Driver<T, M> {
    pub(crate) fn new(
        machine: SharedMachine,
        transport: Arc<T>,
        url: Url,
        dispatcher: UpdateDispatcher<M>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            machine,
            transport,
            url,
            dispatcher,
            events_tx,
            events_rx,
            pump: None,
            retry_at: None,
            shutdown,
        }
    }

    /// Spawns the driver onto the current runtime.
    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        let actions = self.machine.lock().start();
        self.perform(actions).await;

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let retry_at = self.retry_at;
            tokio::select! {
                biased;

                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                Some((generation, event)) = self.events_rx.recv() => {
                    self.handle(generation, event).await;
                }
                _ = tokio::time::sleep_until(retry_at.unwrap_or_else(Instant::now)), if retry_at.is_some() => {
                    self.retry_at = None;
                    let actions = self.machine.lock().on_retry_elapsed();
                    self.perform(actions).await;
                }
            }
        }

        self.retry_at = None;
        self.stop_pump().await;
        debug!("Session driver stopped");
    }

    async fn handle(&mut self, generation: u64, event: PumpEvent) {
        if self.pump.as_ref().map(|p| p.generation) != Some(generation) {
            debug!(generation, "Dropping event from abandoned attempt");
            return;
        }

        match event {
            PumpEvent::Opened => {
                let actions = self.machine.lock().on_open(generation);
                self.perform(actions).await;
            }
            PumpEvent::Frame(text) => self.handle_frame(&text),
            PumpEvent::Failed(reason) => {
                // The pump has already returned.
                if let Some(pump) = self.pump.take() {
                    let _ = pump.handle.await;
                }
                let actions = self.machine.lock().on_failure(generation, reason);
                self.perform(actions).await;
            }
        }
    }

    fn handle_frame(&self, text: &str) {
        // Held through dispatch so a teardown cannot land between the state
        // check and the store mutation.
        let mut machine = self.machine.lock();
        if machine.state() != ConnectionState::Connected || machine.is_tearing_down() {
            return;
        }

        match decode_frame(text) {
            Ok(Some(envelope)) => {
                let kind = envelope.kind();
                let record_id = envelope.record_id();
                let outcome = self.dispatcher.apply(envelope);
                debug!(kind = %kind, record_id, outcome = ?outcome, "Applied live update");
                machine.record_update(kind, record_id, outcome);
            }
            Ok(None) => {
                debug!("Ignoring frame of unknown kind");
                machine.record_ignored();
            }
            Err(e) => {
                warn!(error = %e, kind = ?e.kind(), "Discarding malformed frame");
                machine.record_discarded(e.to_string());
            }
        }
    }

    async fn perform(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Connect { generation } => {
                    self.stop_pump().await;
                    self.start_pump(generation);
                }
                Action::ScheduleRetry { delay } => {
                    let delay = delay.min(MAX_RETRY_DELAY);
                    let now = Instant::now();
                    self.retry_at = Some(now.checked_add(delay).unwrap_or(now));
                }
                Action::CancelRetry => {
                    self.retry_at = None;
                }
                Action::Close => {
                    self.stop_pump().await;
                }
            }
        }
    }

    fn start_pump(&mut self, generation: u64) {
        let (stop, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(pump(
            Arc::clone(&self.transport),
            self.url.clone(),
            generation,
            self.events_tx.clone(),
            stop_rx,
        ));
        debug!(generation, "Connection attempt started");
        self.pump = Some(Pump {
            generation,
            stop,
            handle,
        });
    }

    async fn stop_pump(&mut self) {
        if let Some(pump) = self.pump.take() {
            let _ = pump.stop.send(());
            if let Err(e) = pump.handle.await {
                warn!(generation = pump.generation, error = %e, "Connection task ended abnormally");
            }
        }
    }
}
