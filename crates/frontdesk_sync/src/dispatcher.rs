//! Envelope dispatch into the store.
//!
//! Each envelope turns into exactly one store mutation:
//!
//! | Kind | Default effect |
//! |---|---|
//! | `new_request`, `new_feedback` | insert at the front |
//! | `request_updated`, `feedback_updated` | replace by id in place, or drop |
//!
//! "New" events do not check for an existing id unless the dispatcher is
//! built with [`NewRecordPolicy::Upsert`]. A server that re-sends a "new"
//! event after a reconnect would otherwise produce a second entry.

use frontdesk_protocol::Envelope;
use frontdesk_store::{StoreMutator, UpsertOutcome};

/// How "new" events are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewRecordPolicy {
    /// Always insert at the front, even if the id is already present.
    #[default]
    Insert,
    /// Replace in place if the id is present, otherwise insert.
    Upsert,
}

/// Effect of a dispatched envelope on the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A record was added at the front.
    Inserted,
    /// An existing record was replaced in place.
    Replaced,
    /// An update named an id the store does not hold; nothing changed.
    Dropped,
}

/// Applies decoded envelopes to a store.
///
/// The store is injected at construction; the dispatcher performs no I/O
/// and cannot fail.
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(Store::new());
/// let dispatcher = UpdateDispatcher::new(store.clone());
///
/// if let Ok(Some(envelope)) = decode_frame(text) {
///     dispatcher.apply(envelope);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct UpdateDispatcher<M: StoreMutator> {
    store: M,
    new_records: NewRecordPolicy,
}

impl<M: StoreMutator> UpdateDispatcher<M> {
    /// Creates a dispatcher with the default insert policy.
    pub fn new(store: M) -> Self {
        Self::with_policy(store, NewRecordPolicy::default())
    }

    /// Creates a dispatcher with an explicit policy for "new" events.
    pub fn with_policy(store: M, new_records: NewRecordPolicy) -> Self {
        Self { store, new_records }
    }

    /// Returns the policy for "new" events.
    pub fn new_record_policy(&self) -> NewRecordPolicy {
        self.new_records
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &M {
        &self.store
    }

    /// Applies one envelope.
    pub fn apply(&self, envelope: Envelope) -> DispatchOutcome {
        match (envelope, self.new_records) {
            (Envelope::NewRequest(request), NewRecordPolicy::Insert) => {
                self.store.insert_request(request);
                DispatchOutcome::Inserted
            }
            (Envelope::NewRequest(request), NewRecordPolicy::Upsert) => {
                self.store.upsert_request(request).into()
            }
            (Envelope::NewFeedback(feedback), NewRecordPolicy::Insert) => {
                self.store.insert_feedback(feedback);
                DispatchOutcome::Inserted
            }
            (Envelope::NewFeedback(feedback), NewRecordPolicy::Upsert) => {
                self.store.upsert_feedback(feedback).into()
            }
            (Envelope::RequestUpdated(request), _) => {
                replaced_or_dropped(self.store.replace_request(request))
            }
            (Envelope::FeedbackUpdated(feedback), _) => {
                replaced_or_dropped(self.store.replace_feedback(feedback))
            }
        }
    }
}

fn replaced_or_dropped(replaced: bool) -> DispatchOutcome {
    if replaced {
        DispatchOutcome::Replaced
    } else {
        DispatchOutcome::Dropped
    }
}

impl From<UpsertOutcome> for DispatchOutcome {
    fn from(outcome: UpsertOutcome) -> Self {
        match outcome {
            UpsertOutcome::Inserted => DispatchOutcome::Inserted,
            UpsertOutcome::Replaced { .. } => DispatchOutcome::Replaced,
        }
    }
}
