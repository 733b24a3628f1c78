//! # Frontdesk Protocol
//!
//! Wire types for the Frontdesk live update channel.
//!
//! This crate provides:
//! - `Request` and `Feedback` records as the backend serializes them
//! - `Envelope` / `EnvelopeKind` for inbound update frames
//! - `decode_frame` for turning a text frame into an envelope
//! - `endpoint_url` for building the authenticated socket address
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod endpoint;
mod envelope;
mod error;
mod record;

pub use endpoint::{endpoint_url, Credential, DEFAULT_WS_PATH};
pub use envelope::{decode_frame, encode_frame, Envelope, EnvelopeKind, Frame};
pub use error::{DecodeError, ProtocolError, ProtocolResult};
pub use record::{
    Feedback, GuestSummary, Record, RecordId, Request, RequestStatus, RoomSummary, Sentiment,
};
