//! Lifecycle controller.
//!
//! Binds a live connection to the lifetime of a credential. A session
//! (fresh machine, fresh counters, one driver task) is created when a
//! credential becomes available and torn down when it changes, clears, or
//! the controller is dropped.

use crate::config::SyncConfig;
use crate::dispatcher::UpdateDispatcher;
use crate::driver::{Driver, SharedMachine};
use crate::error::{SyncError, SyncResult};
use crate::event::StatusEvent;
use crate::notice::ErrorNotice;
use crate::state::{ConnectionMachine, ConnectionState, ConnectionStatus, SyncStats};
use crate::transport::Transport;
use frontdesk_protocol::Credential;
use frontdesk_store::StoreMutator;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

struct Session {
    credential: Credential,
    machine: SharedMachine,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl Session {
    /// Marks the machine as tearing down and signals the driver.
    fn signal_teardown(&self) {
        // Actions are carried out by the driver when it sees the signal.
        let _ = self.machine.lock().teardown();
        let _ = self.shutdown.send(true);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.signal_teardown();
    }
}

/// Owns the live connection for the current credential.
///
/// Must be used from within a Tokio runtime: activating a session spawns
/// the driver task.
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(Store::new());
/// let mut controller = LifecycleController::new(
///     SyncConfig::new("https://hotel.example.com"),
///     WebSocketTransport::new(),
///     store.clone(),
/// )?;
///
/// controller.set_credential(Credential::non_empty(token)).await?;
/// // ... later, on logout:
/// controller.set_credential(None).await?;
/// ```
pub struct LifecycleController<T: Transport, M: StoreMutator + Clone + 'static> {
    config: SyncConfig,
    transport: Arc<T>,
    store: M,
    events: broadcast::Sender<StatusEvent>,
    session: Option<Session>,
}

impl<T: Transport, M: StoreMutator + Clone + 'static> LifecycleController<T, M> {
    /// Creates a controller with no active session.
    pub fn new(config: SyncConfig, transport: T, store: M) -> SyncResult<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(config.event_capacity);
        Ok(Self {
            config,
            transport: Arc::new(transport),
            store,
            events,
            session: None,
        })
    }

    /// Subscribes to status events of current and future sessions.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.events.subscribe()
    }

    /// Gets the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Gets the store updates are applied to.
    pub fn store(&self) -> &M {
        &self.store
    }

    /// Gets the credential of the active session.
    pub fn credential(&self) -> Option<&Credential> {
        self.session.as_ref().map(|s| &s.credential)
    }

    /// Returns true if a session exists for a credential.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Binds the connection to `credential`.
    ///
    /// The same credential again does nothing. Any other value tears the
    /// current session down; a new credential then starts a fresh session
    /// with the retry counter at zero. `None` leaves no connection.
    pub async fn set_credential(&mut self, credential: Option<Credential>) -> SyncResult<()> {
        if self.credential() == credential.as_ref() {
            return Ok(());
        }

        self.teardown().await;
        match credential {
            Some(credential) => self.activate(credential),
            None => Ok(()),
        }
    }

    /// Starts over with a fresh session for the current credential.
    ///
    /// This is the "reload" action offered by the failure notice.
    pub async fn reload(&mut self) -> SyncResult<()> {
        let credential = self
            .credential()
            .cloned()
            .ok_or(SyncError::NotConnected)?;

        info!("Reloading live connection");
        self.teardown().await;
        self.activate(credential)
    }

    /// Tears the current session down and waits for its driver to stop.
    ///
    /// Safe to call any number of times.
    pub async fn teardown(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        session.signal_teardown();
        if let Some(task) = session.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Session driver ended abnormally");
            }
        }
    }

    /// Gets the surfaced failure notice, if any.
    pub fn notice(&self) -> Option<ErrorNotice> {
        self.session
            .as_ref()
            .and_then(|s| s.machine.lock().notice().cloned())
    }

    /// Hides the failure notice.
    ///
    /// Does not retry and leaves the retry counter alone. Returns false if
    /// there was no notice.
    pub fn dismiss_notice(&self) -> bool {
        match &self.session {
            Some(session) => session.machine.lock().dismiss_notice(),
            None => false,
        }
    }

    /// Gets the connection status.
    pub fn status(&self) -> ConnectionStatus {
        match &self.session {
            Some(session) => session.machine.lock().status(),
            None => ConnectionStatus {
                state: ConnectionState::Disconnected,
                retry_counter: 0,
                error_flag: false,
            },
        }
    }

    /// Gets the connection state.
    pub fn state(&self) -> ConnectionState {
        self.status().state
    }

    /// Gets the stats of the active session.
    pub fn stats(&self) -> SyncStats {
        self.session
            .as_ref()
            .map(|s| s.machine.lock().stats())
            .unwrap_or_default()
    }

    fn activate(&mut self, credential: Credential) -> SyncResult<()> {
        let url = self.config.endpoint(&credential)?;

        let machine = ConnectionMachine::new(self.config.retry.clone())
            .with_events(self.events.clone());
        let machine: SharedMachine = Arc::new(Mutex::new(machine));
        let dispatcher = UpdateDispatcher::with_policy(self.store.clone(), self.config.new_records);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let task = Driver::new(
            Arc::clone(&machine),
            Arc::clone(&self.transport),
            url,
            dispatcher,
            shutdown_rx,
        )
        .spawn();

        info!(base_url = %self.config.base_url, "Live session started");
        self.session = Some(Session {
            credential,
            machine,
            shutdown,
            task: Some(task),
        });
        Ok(())
    }
}

impl<T: Transport, M: StoreMutator + Clone + 'static> std::fmt::Debug for LifecycleController<T, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("base_url", &self.config.base_url)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::transport::{MockAttempt, MockTransport};
    use frontdesk_store::Store;
    use std::time::Duration;

    fn controller(
        transport: &MockTransport,
        retry: RetryConfig,
    ) -> LifecycleController<MockTransport, Arc<Store>> {
        let config = SyncConfig::new("http://localhost:8000").with_retry(retry);
        LifecycleController::new(config, transport.clone(), Arc::new(Store::new())).unwrap()
    }

    async fn wait_for(
        controller: &LifecycleController<MockTransport, Arc<Store>>,
        state: ConnectionState,
    ) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while controller.state() != state {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("state reached");
    }

    #[test]
    fn rejects_invalid_config() {
        let config = SyncConfig::default().with_retry(RetryConfig::new(0));
        let result = LifecycleController::new(config, MockTransport::new(), Arc::new(Store::new()));
        assert!(matches!(result, Err(SyncError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn no_credential_no_connection() {
        let transport = MockTransport::new();
        let mut controller = controller(&transport, RetryConfig::default());

        controller.set_credential(None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!controller.is_active());
        assert_eq!(transport.attempts(), 0);
        assert_eq!(controller.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn same_credential_keeps_session() {
        let transport = MockTransport::scripted([MockAttempt::open()]);
        let mut controller = controller(&transport, RetryConfig::default());

        controller.set_credential(Some(Credential::new("a"))).await.unwrap();
        wait_for(&controller, ConnectionState::Connected).await;
        controller.set_credential(Some(Credential::new("a"))).await.unwrap();

        assert_eq!(transport.attempts(), 1);
        assert_eq!(controller.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn credential_change_starts_fresh_session() {
        let transport = MockTransport::scripted([MockAttempt::open(), MockAttempt::open()]);
        let mut controller = controller(&transport, RetryConfig::default());

        controller.set_credential(Some(Credential::new("a"))).await.unwrap();
        wait_for(&controller, ConnectionState::Connected).await;
        controller.set_credential(Some(Credential::new("b"))).await.unwrap();
        wait_for(&controller, ConnectionState::Connected).await;

        assert_eq!(transport.attempts(), 2);
        assert_eq!(transport.closes(), 1);
        assert_eq!(transport.max_open_connections(), 1);
        let urls = transport.urls();
        assert_eq!(urls[0].query(), Some("token=a"));
        assert_eq!(urls[1].query(), Some("token=b"));
    }

    #[tokio::test]
    async fn reload_after_failure_resets_counter() {
        let transport = MockTransport::scripted([MockAttempt::refuse(), MockAttempt::open()]);
        let mut controller = controller(&transport, RetryConfig::no_retry());

        controller.set_credential(Some(Credential::new("a"))).await.unwrap();
        wait_for(&controller, ConnectionState::Failed).await;
        assert!(controller.notice().is_some());
        assert_eq!(controller.status().retry_counter, 1);

        controller.reload().await.unwrap();
        wait_for(&controller, ConnectionState::Connected).await;
        assert!(controller.notice().is_none());
        assert_eq!(controller.status().retry_counter, 0);
    }

    #[tokio::test]
    async fn reload_without_credential_fails() {
        let transport = MockTransport::new();
        let mut controller = controller(&transport, RetryConfig::default());
        assert!(matches!(controller.reload().await, Err(SyncError::NotConnected)));
    }

    #[tokio::test]
    async fn drop_closes_connection() {
        let transport = MockTransport::scripted([MockAttempt::open()]);
        let mut controller = controller(&transport, RetryConfig::default());

        controller.set_credential(Some(Credential::new("a"))).await.unwrap();
        wait_for(&controller, ConnectionState::Connected).await;
        drop(controller);

        tokio::time::timeout(Duration::from_secs(2), async {
            while transport.open_connections() != 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("connection closed");
        assert_eq!(transport.attempts(), 1);
    }
}
