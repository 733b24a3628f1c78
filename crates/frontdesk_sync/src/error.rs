//! Error types for the sync client.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in the sync client.
///
/// Transport errors never escape the driver task: every one of them counts
/// as a failed attempt and feeds the retry policy. The other variants are
/// reported through the `Result` of the controller call that caused them.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Protocol error (bad endpoint, encoding failure).
    #[error("protocol error: {0}")]
    Protocol(#[from] frontdesk_protocol::ProtocolError),

    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No credential is bound to the controller.
    #[error("not connected to server")]
    NotConnected,
}

impl SyncError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}
