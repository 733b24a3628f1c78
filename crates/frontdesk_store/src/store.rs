//! The two-collection dashboard store.

use crate::collection::{Collection, UpsertOutcome};
use crate::error::StoreResult;
use crate::snapshot::SnapshotSource;
use crate::stats::{FeedbackCounts, RequestCounts, StoreStats};
use frontdesk_protocol::{Feedback, RecordId, Request, RequestStatus, Sentiment};
use parking_lot::RwLock;
use tracing::debug;

/// Local mutation API over the `requests` and `feedback` collections.
///
/// Both the live update path and the staff action path go through this
/// trait, so they share one set of semantics:
/// - `insert_*` always adds at the front
/// - `replace_*` swaps the record with the same id in place, or does nothing
/// - `upsert_*` replaces if present, otherwise inserts
pub trait StoreMutator: Send + Sync {
    /// Inserts a request as the newest item.
    fn insert_request(&self, request: Request);

    /// Replaces the request with the same id. Returns false if absent.
    fn replace_request(&self, request: Request) -> bool;

    /// Replaces or inserts a request.
    fn upsert_request(&self, request: Request) -> UpsertOutcome;

    /// Inserts feedback as the newest item.
    fn insert_feedback(&self, feedback: Feedback);

    /// Replaces the feedback with the same id. Returns false if absent.
    fn replace_feedback(&self, feedback: Feedback) -> bool;

    /// Replaces or inserts feedback.
    fn upsert_feedback(&self, feedback: Feedback) -> UpsertOutcome;
}

/// Shared in-memory store.
///
/// Each collection has its own lock; every mutation holds exactly one lock
/// for the duration of a single collection operation.
#[derive(Debug, Default)]
pub struct Store {
    requests: RwLock<Collection<Request>>,
    feedback: RwLock<Collection<Feedback>>,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces both collections with snapshot content.
    pub fn seed(&self, requests: Vec<Request>, feedback: Vec<Feedback>) {
        debug!(
            requests = requests.len(),
            feedback = feedback.len(),
            "Seeding store from snapshot"
        );
        self.requests.write().reset(requests);
        self.feedback.write().reset(feedback);
    }

    /// Fetches both collections from `source` and seeds the store.
    ///
    /// The store is left untouched if either fetch fails.
    pub async fn seed_from<S: SnapshotSource>(&self, source: &S) -> StoreResult<()> {
        let requests = source.fetch_requests().await?;
        let feedback = source.fetch_feedback().await?;
        self.seed(requests, feedback);
        Ok(())
    }

    /// Applies the response of a status update made by a staff action.
    ///
    /// Uses the same replace-by-id semantics as live `request_updated`
    /// events. Returns false if the request is not in the store.
    pub fn apply_request_response(&self, request: Request) -> bool {
        self.replace_request(request)
    }

    /// Applies the response of a feedback action (e.g. a generated reply).
    pub fn apply_feedback_response(&self, feedback: Feedback) -> bool {
        self.replace_feedback(feedback)
    }

    /// Gets a request by id.
    pub fn request(&self, id: RecordId) -> Option<Request> {
        self.requests.read().get(id).cloned()
    }

    /// Gets feedback by id.
    pub fn feedback(&self, id: RecordId) -> Option<Feedback> {
        self.feedback.read().get(id).cloned()
    }

    /// Returns a copy of all requests in display order.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.read().as_slice().to_vec()
    }

    /// Returns a copy of all feedback in display order.
    pub fn feedback_list(&self) -> Vec<Feedback> {
        self.feedback.read().as_slice().to_vec()
    }

    /// Runs `f` against the request collection without copying it.
    pub fn with_requests<R>(&self, f: impl FnOnce(&Collection<Request>) -> R) -> R {
        f(&self.requests.read())
    }

    /// Runs `f` against the feedback collection without copying it.
    pub fn with_feedback<R>(&self, f: impl FnOnce(&Collection<Feedback>) -> R) -> R {
        f(&self.feedback.read())
    }

    /// Counts records per status and sentiment.
    pub fn stats(&self) -> StoreStats {
        let mut requests = RequestCounts::default();
        for request in self.requests.read().iter() {
            match request.status {
                RequestStatus::Pending => requests.pending += 1,
                RequestStatus::InProgress => requests.in_progress += 1,
                RequestStatus::Completed => requests.completed += 1,
            }
        }

        let mut feedback = FeedbackCounts::default();
        for item in self.feedback.read().iter() {
            match item.sentiment {
                Sentiment::Positive => feedback.positive += 1,
                Sentiment::Negative => feedback.negative += 1,
                Sentiment::Neutral => feedback.neutral += 1,
            }
        }

        StoreStats { requests, feedback }
    }
}

impl StoreMutator for Store {
    fn insert_request(&self, request: Request) {
        self.requests.write().insert_front(request);
    }

    fn replace_request(&self, request: Request) -> bool {
        self.requests.write().replace(request).is_some()
    }

    fn upsert_request(&self, request: Request) -> UpsertOutcome {
        self.requests.write().upsert(request)
    }

    fn insert_feedback(&self, feedback: Feedback) {
        self.feedback.write().insert_front(feedback);
    }

    fn replace_feedback(&self, feedback: Feedback) -> bool {
        self.feedback.write().replace(feedback).is_some()
    }

    fn upsert_feedback(&self, feedback: Feedback) -> UpsertOutcome {
        self.feedback.write().upsert(feedback)
    }
}

impl<M: StoreMutator + ?Sized> StoreMutator for std::sync::Arc<M> {
    fn insert_request(&self, request: Request) {
        (**self).insert_request(request)
    }

    fn replace_request(&self, request: Request) -> bool {
        (**self).replace_request(request)
    }

    fn upsert_request(&self, request: Request) -> UpsertOutcome {
        (**self).upsert_request(request)
    }

    fn insert_feedback(&self, feedback: Feedback) {
        (**self).insert_feedback(feedback)
    }

    fn replace_feedback(&self, feedback: Feedback) -> bool {
        (**self).replace_feedback(feedback)
    }

    fn upsert_feedback(&self, feedback: Feedback) -> UpsertOutcome {
        (**self).upsert_feedback(feedback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::snapshot::StaticSnapshot;
    use frontdesk_testkit::fixtures;

    struct FailingSource;

    impl SnapshotSource for FailingSource {
        async fn fetch_requests(&self) -> StoreResult<Vec<Request>> {
            Ok(vec![fixtures::request(1)])
        }

        async fn fetch_feedback(&self) -> StoreResult<Vec<Feedback>> {
            Err(StoreError::snapshot("feedback", "connection refused"))
        }
    }

    #[test]
    fn seed_and_read_back() {
        let store = Store::new();
        store.seed(
            vec![fixtures::request(2), fixtures::request(1)],
            vec![fixtures::feedback(7)],
        );

        assert_eq!(store.requests().len(), 2);
        assert_eq!(store.feedback(7).unwrap().id, 7);
        assert!(store.request(3).is_none());
    }

    #[test]
    fn staff_action_uses_replace_semantics() {
        let store = Store::new();
        store.seed(vec![fixtures::request(2), fixtures::request(1)], vec![]);

        let completed = fixtures::request_with_status(1, RequestStatus::Completed);
        assert!(store.apply_request_response(completed));
        assert_eq!(store.with_requests(|r| r.position(1)), Some(1));
        assert_eq!(store.request(1).unwrap().status, RequestStatus::Completed);

        assert!(!store.apply_request_response(fixtures::request(42)));
        assert_eq!(store.requests().len(), 2);
    }

    #[test]
    fn stats_count_by_status_and_sentiment() {
        let store = Store::new();
        store.seed(
            vec![
                fixtures::request_with_status(1, RequestStatus::Pending),
                fixtures::request_with_status(2, RequestStatus::Pending),
                fixtures::request_with_status(3, RequestStatus::Completed),
            ],
            vec![
                fixtures::feedback_with_sentiment(1, Sentiment::Negative),
                fixtures::feedback_with_sentiment(2, Sentiment::Neutral),
            ],
        );

        let stats = store.stats();
        assert_eq!(stats.requests.pending, 2);
        assert_eq!(stats.requests.completed, 1);
        assert_eq!(stats.requests.total(), 3);
        assert_eq!(stats.feedback.negative, 1);
        assert_eq!(stats.feedback.total(), 2);
    }

    #[tokio::test]
    async fn seed_from_static_snapshot() {
        let store = Store::new();
        let snapshot = StaticSnapshot::new(
            vec![fixtures::request(3)],
            vec![fixtures::feedback(4), fixtures::feedback(5)],
        );

        store.seed_from(&snapshot).await.unwrap();
        assert_eq!(store.requests().len(), 1);
        assert_eq!(store.feedback_list().len(), 2);
    }

    #[tokio::test]
    async fn failed_snapshot_leaves_store_untouched() {
        let store = Store::new();
        store.seed(vec![fixtures::request(9)], vec![]);

        let err = store.seed_from(&FailingSource).await.unwrap_err();
        assert!(err.to_string().contains("feedback"));
        assert_eq!(store.requests()[0].id, 9);
    }

    #[test]
    fn shared_store_through_arc() {
        let store = std::sync::Arc::new(Store::new());
        let mutator: &dyn StoreMutator = &store;
        mutator.insert_feedback(fixtures::feedback(1));
        assert_eq!(store.feedback_list().len(), 1);
    }
}
