//! # Frontdesk Store
//!
//! In-memory client cache for the dashboard's two record collections,
//! `requests` and `feedback`.
//!
//! ## Ordering
//!
//! Collections are ordered most recent first. Inserts go to the front;
//! replacements keep the record's position.
//!
//! ## Key Invariants
//!
//! - Replacement matches on record id and never changes ordering
//! - A replacement for an unknown id is a no-op
//! - Seeding from a snapshot replaces a collection wholesale
//!
//! Live updates and staff actions both mutate the store through
//! [`StoreMutator`], so the two paths cannot diverge.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod error;
mod snapshot;
mod stats;
mod store;

pub use collection::{Collection, UpsertOutcome};
pub use error::{StoreError, StoreResult};
pub use snapshot::{SnapshotSource, StaticSnapshot};
pub use stats::{FeedbackCounts, RequestCounts, StoreStats};
pub use store::{Store, StoreMutator};
