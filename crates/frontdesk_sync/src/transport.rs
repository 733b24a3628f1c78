//! Transport layer abstraction for the live connection.

use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

/// Opens live connections.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (WebSocket, mock for testing).
pub trait Transport: Send + Sync + 'static {
    /// Connection type produced by this transport.
    type Connection: Connection;

    /// Opens a connection to `url`.
    ///
    /// Resolves once the connection is open. An error means the attempt
    /// failed and counts against the retry budget.
    fn connect(&self, url: &Url) -> impl Future<Output = SyncResult<Self::Connection>> + Send;
}

/// An open live connection.
pub trait Connection: Send + 'static {
    /// Waits for the next event.
    ///
    /// After `Closed` or `Error` is returned the connection is finished and
    /// must not be polled again.
    fn next_event(&mut self) -> impl Future<Output = TransportEvent> + Send;

    /// Closes the connection. Calling it more than once is harmless.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Event delivered by an open connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame.
    Frame(String),
    /// The connection closed.
    Closed(CloseInfo),
    /// The connection broke.
    Error(String),
}

/// Close code and reason reported by the peer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CloseInfo {
    /// Close code, if the peer sent one.
    pub code: Option<u16>,
    /// Close reason, possibly empty.
    pub reason: String,
}

impl CloseInfo {
    /// Creates close info with a code.
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            reason: reason.into(),
        }
    }

    /// Close without a close frame.
    pub fn abnormal() -> Self {
        Self::default()
    }
}

impl fmt::Display for CloseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.reason.is_empty()) {
            (Some(code), true) => write!(f, "closed with code {}", code),
            (Some(code), false) => write!(f, "closed with code {}: {}", code, self.reason),
            (None, _) => f.write_str("closed without close frame"),
        }
    }
}

/// Scripted outcome of one mock connection attempt.
#[derive(Debug, Clone)]
pub enum MockAttempt {
    /// The attempt fails with this message.
    Refuse(String),
    /// The attempt opens, delivers `frames`, then ends as `end` says.
    Accept {
        /// Text frames delivered in order.
        frames: Vec<String>,
        /// What happens after the frames.
        end: MockEnd,
    },
    /// The attempt never resolves.
    Hang,
    /// Waits before resolving as the inner attempt.
    Delayed(Duration, Box<MockAttempt>),
}

impl MockAttempt {
    /// An attempt that opens and stays open.
    pub fn open() -> Self {
        Self::Accept {
            frames: Vec::new(),
            end: MockEnd::Hold,
        }
    }

    /// An attempt that opens, delivers `frames` and stays open.
    pub fn open_with(frames: Vec<String>) -> Self {
        Self::Accept {
            frames,
            end: MockEnd::Hold,
        }
    }

    /// An attempt that fails with a generic refusal.
    pub fn refuse() -> Self {
        Self::Refuse("connection refused".into())
    }
}

/// How a scripted mock connection ends.
#[derive(Debug, Clone)]
pub enum MockEnd {
    /// The peer closes.
    Close(CloseInfo),
    /// The connection breaks.
    Error(String),
    /// The connection stays open until closed locally.
    Hold,
}

#[derive(Debug, Default)]
struct MockShared {
    script: Mutex<VecDeque<MockAttempt>>,
    urls: Mutex<Vec<Url>>,
    live: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
    attempts: AtomicUsize,
    connecting: AtomicUsize,
    max_connecting: AtomicUsize,
    open: AtomicUsize,
    max_open: AtomicUsize,
    closes: AtomicUsize,
}

impl MockShared {
    fn enter(counter: &AtomicUsize, max: &AtomicUsize) {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
    }
}

/// A scripted transport for testing.
///
/// Each `connect` call takes the next [`MockAttempt`] from the script. Once
/// the script is exhausted every attempt is refused. Counters record how the
/// transport was used so tests can check concurrency and close behavior.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    shared: Arc<MockShared>,
}

impl MockTransport {
    /// Creates a mock transport with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock transport with a script.
    pub fn scripted(attempts: impl IntoIterator<Item = MockAttempt>) -> Self {
        let transport = Self::new();
        transport.shared.script.lock().extend(attempts);
        transport
    }

    /// Appends an attempt to the script.
    pub fn push(&self, attempt: MockAttempt) {
        self.shared.script.lock().push_back(attempt);
    }

    /// Delivers an event on the most recently opened connection.
    ///
    /// Returns false if no connection is receiving.
    pub fn send(&self, event: TransportEvent) -> bool {
        match self.shared.live.lock().as_ref() {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Delivers a text frame on the most recently opened connection.
    pub fn send_frame(&self, frame: impl Into<String>) -> bool {
        self.send(TransportEvent::Frame(frame.into()))
    }

    /// Number of `connect` calls so far.
    pub fn attempts(&self) -> usize {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously unresolved attempts.
    pub fn max_concurrent_attempts(&self) -> usize {
        self.shared.max_connecting.load(Ordering::SeqCst)
    }

    /// Connections currently open.
    pub fn open_connections(&self) -> usize {
        self.shared.open.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously open connections.
    pub fn max_open_connections(&self) -> usize {
        self.shared.max_open.load(Ordering::SeqCst)
    }

    /// Number of local `close` calls.
    pub fn closes(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    /// URLs passed to `connect`, in order.
    pub fn urls(&self) -> Vec<Url> {
        self.shared.urls.lock().clone()
    }
}

struct ConnectingGuard<'a>(&'a AtomicUsize);

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Transport for MockTransport {
    type Connection = MockConnection;

    async fn connect(&self, url: &Url) -> SyncResult<MockConnection> {
        let shared = &self.shared;
        shared.urls.lock().push(url.clone());
        shared.attempts.fetch_add(1, Ordering::SeqCst);
        MockShared::enter(&shared.connecting, &shared.max_connecting);
        let _guard = ConnectingGuard(&shared.connecting);

        let mut attempt = shared
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(MockAttempt::refuse);

        loop {
            match attempt {
                MockAttempt::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    attempt = *inner;
                }
                MockAttempt::Hang => return std::future::pending().await,
                MockAttempt::Refuse(message) => {
                    return Err(SyncError::transport(message));
                }
                MockAttempt::Accept { frames, end } => {
                    let (tx, rx) = mpsc::unbounded_channel();
                    for frame in frames {
                        let _ = tx.send(TransportEvent::Frame(frame));
                    }
                    match end {
                        MockEnd::Close(info) => {
                            let _ = tx.send(TransportEvent::Closed(info));
                        }
                        MockEnd::Error(message) => {
                            let _ = tx.send(TransportEvent::Error(message));
                        }
                        MockEnd::Hold => {}
                    }
                    *shared.live.lock() = Some(tx);
                    MockShared::enter(&shared.open, &shared.max_open);

                    return Ok(MockConnection {
                        events: rx,
                        shared: Arc::clone(shared),
                        released: false,
                    });
                }
            }
        }
    }
}

/// Connection produced by [`MockTransport`].
#[derive(Debug)]
pub struct MockConnection {
    events: mpsc::UnboundedReceiver<TransportEvent>,
    shared: Arc<MockShared>,
    released: bool,
}

impl MockConnection {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.shared.open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Connection for MockConnection {
    async fn next_event(&mut self) -> TransportEvent {
        match self.events.recv().await {
            Some(event) => event,
            None => TransportEvent::Closed(CloseInfo::abnormal()),
        }
    }

    async fn close(&mut self) {
        if !self.released {
            self.shared.closes.fetch_add(1, Ordering::SeqCst);
        }
        self.events.close();
        self.release();
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("ws://localhost:8000/ws?token=t").unwrap()
    }

    #[test]
    fn close_info_display() {
        assert_eq!(
            CloseInfo::new(1008, "Invalid token").to_string(),
            "closed with code 1008: Invalid token"
        );
        assert_eq!(CloseInfo::new(1000, "").to_string(), "closed with code 1000");
        assert_eq!(
            CloseInfo::abnormal().to_string(),
            "closed without close frame"
        );
    }

    #[tokio::test]
    async fn mock_transport_follows_script() {
        let transport = MockTransport::scripted([
            MockAttempt::refuse(),
            MockAttempt::Accept {
                frames: vec!["one".into()],
                end: MockEnd::Close(CloseInfo::new(1000, "bye")),
            },
        ]);

        let err = transport.connect(&url()).await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));

        let mut connection = transport.connect(&url()).await.unwrap();
        assert_eq!(connection.next_event().await, TransportEvent::Frame("one".into()));
        assert_eq!(
            connection.next_event().await,
            TransportEvent::Closed(CloseInfo::new(1000, "bye"))
        );

        // Script exhausted.
        assert!(transport.connect(&url()).await.is_err());
        assert_eq!(transport.attempts(), 3);
        assert_eq!(transport.urls().len(), 3);
    }

    #[tokio::test]
    async fn mock_transport_tracks_open_connections() {
        let transport = MockTransport::scripted([MockAttempt::open()]);

        let mut connection = transport.connect(&url()).await.unwrap();
        assert_eq!(transport.open_connections(), 1);
        assert!(transport.send_frame("live"));
        assert_eq!(connection.next_event().await, TransportEvent::Frame("live".into()));

        connection.close().await;
        connection.close().await;
        assert_eq!(transport.closes(), 1);
        assert_eq!(transport.open_connections(), 0);
        drop(connection);
        assert_eq!(transport.open_connections(), 0);
        assert_eq!(transport.max_open_connections(), 1);
    }

    #[tokio::test]
    async fn hung_attempt_releases_on_drop() {
        let transport = MockTransport::scripted([MockAttempt::Hang]);

        let url = url();
        let pending = transport.connect(&url);
        let result = tokio::time::timeout(Duration::from_millis(20), pending).await;

        assert!(result.is_err());
        assert_eq!(transport.max_concurrent_attempts(), 1);
        assert_eq!(transport.shared.connecting.load(Ordering::SeqCst), 0);
    }
}
