//! Status events published by a session.

use crate::dispatcher::DispatchOutcome;
use crate::notice::ErrorNotice;
use crate::state::ConnectionState;
use frontdesk_protocol::{EnvelopeKind, RecordId};

/// Something observable happened in a session.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    /// The connection state changed.
    StateChanged {
        /// Previous state.
        from: ConnectionState,
        /// New state.
        to: ConnectionState,
        /// Retry counter after the transition.
        retry_counter: u32,
    },
    /// The failure notice was raised.
    NoticeRaised(ErrorNotice),
    /// The failure notice was cleared (dismissed or reconnected).
    NoticeCleared,
    /// An update frame was dispatched to the store.
    UpdateApplied {
        /// Envelope kind.
        kind: EnvelopeKind,
        /// Record id.
        record_id: RecordId,
        /// Store effect.
        outcome: DispatchOutcome,
    },
    /// A frame was dropped before reaching the store.
    FrameDiscarded {
        /// Why it was dropped.
        reason: String,
    },
}
