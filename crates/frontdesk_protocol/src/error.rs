//! Error types for the protocol crate.

use crate::envelope::EnvelopeKind;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while building endpoints or encoding frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The configured base address is not a usable URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// URL parsing failed.
    #[error("url error: {0}")]
    Url(#[from] url::ParseError),

    /// JSON encoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A frame could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Reasons an inbound frame was rejected.
///
/// A decode error only ever discards the single frame it came from.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame is not JSON at all.
    #[error("frame is not valid JSON: {0}")]
    Syntax(#[source] serde_json::Error),

    /// The frame is JSON but not an object with a string `type`.
    #[error("frame has no message type: {0}")]
    Shape(#[source] serde_json::Error),

    /// The `data` object does not match the record schema for its kind.
    #[error("invalid {kind} payload: {source}")]
    Payload {
        /// Kind announced by the frame.
        kind: EnvelopeKind,
        /// Underlying schema mismatch.
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    /// Returns the announced kind for payload errors.
    pub fn kind(&self) -> Option<EnvelopeKind> {
        match self {
            DecodeError::Payload { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
