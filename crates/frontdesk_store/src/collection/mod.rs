//! Ordered record collections.
//!
//! Provides `Collection<T>` keyed by [`frontdesk_protocol::Record::id`].

mod ordered;

pub use ordered::{Collection, UpsertOutcome};
