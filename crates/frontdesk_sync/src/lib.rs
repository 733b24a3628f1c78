//! # Frontdesk Sync
//!
//! Live update client for the Frontdesk dashboard.
//!
//! This crate provides:
//! - Retry policies (fixed delay, exponential backoff)
//! - The connection state machine
//!   (disconnected → connecting → connected → reconnecting | failed)
//! - The update dispatcher that applies decoded envelopes to the store
//! - Transport abstraction with a WebSocket implementation and a mock
//! - The lifecycle controller that ties a connection to a credential
//!
//! ## Architecture
//!
//! A [`LifecycleController`] owns at most one session per credential. Each
//! session runs a single driver task that serializes every event (transport
//! open, frame, failure, retry timer) through its [`ConnectionMachine`].
//! The machine decides; the driver performs the side effects.
//!
//! ## Key Invariants
//!
//! - At most one connection attempt is in flight per session
//! - Nothing reconnects once teardown has begun
//! - A malformed frame never closes the connection
//! - A failure episode raises at most one notice

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dispatcher;
mod driver;
mod error;
mod event;
mod lifecycle;
mod notice;
mod retry;
mod state;
mod transport;
mod ws;

pub use config::{Backoff, RetryConfig, SyncConfig};
pub use dispatcher::{DispatchOutcome, NewRecordPolicy, UpdateDispatcher};
pub use error::{SyncError, SyncResult};
pub use event::StatusEvent;
pub use lifecycle::LifecycleController;
pub use notice::{ErrorNotice, NoticeAction};
pub use retry::{
    RetryDecision, RetryPolicy, DEFAULT_RETRY_DELAY, MAX_RETRY_ATTEMPTS, MAX_RETRY_DELAY,
};
pub use state::{Action, ConnectionMachine, ConnectionState, ConnectionStatus, SyncStats};
pub use transport::{
    CloseInfo, Connection, MockAttempt, MockConnection, MockEnd, MockTransport, Transport,
    TransportEvent,
};
pub use ws::{WebSocketConnection, WebSocketTransport};
