//! Snapshot source abstraction.
//!
//! The initial collections come from the backend's REST endpoints. The HTTP
//! client lives with the host application; implement [`SnapshotSource`] over
//! it and hand it to [`crate::Store::seed_from`].

use crate::error::StoreResult;
use frontdesk_protocol::{Feedback, Request};
use std::future::Future;

/// Delivers the full current collections.
pub trait SnapshotSource: Send + Sync {
    /// Fetches all requests, newest first.
    fn fetch_requests(&self) -> impl Future<Output = StoreResult<Vec<Request>>> + Send;

    /// Fetches all feedback, newest first.
    fn fetch_feedback(&self) -> impl Future<Output = StoreResult<Vec<Feedback>>> + Send;
}

/// A snapshot held in memory, for tests and offline tools.
#[derive(Debug, Clone, Default)]
pub struct StaticSnapshot {
    /// Requests to deliver.
    pub requests: Vec<Request>,
    /// Feedback to deliver.
    pub feedback: Vec<Feedback>,
}

impl StaticSnapshot {
    /// Creates a snapshot from both collections.
    pub fn new(requests: Vec<Request>, feedback: Vec<Feedback>) -> Self {
        Self { requests, feedback }
    }
}

impl SnapshotSource for StaticSnapshot {
    async fn fetch_requests(&self) -> StoreResult<Vec<Request>> {
        Ok(self.requests.clone())
    }

    async fn fetch_feedback(&self) -> StoreResult<Vec<Feedback>> {
        Ok(self.feedback.clone())
    }
}
