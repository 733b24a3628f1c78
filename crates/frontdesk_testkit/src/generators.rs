//! Property-based test generators using proptest.
//!
//! Provides strategies for generating records and envelopes that decode
//! cleanly.

use crate::fixtures;
use frontdesk_protocol::{Envelope, Feedback, RecordId, Request, RequestStatus, Sentiment};
use proptest::prelude::*;

/// Strategy for record ids as the backend issues them.
pub fn record_id_strategy() -> impl Strategy<Value = RecordId> {
    1..10_000i64
}

/// Strategy for request statuses.
pub fn status_strategy() -> impl Strategy<Value = RequestStatus> {
    prop::sample::select(RequestStatus::ALL.to_vec())
}

/// Strategy for feedback sentiments.
pub fn sentiment_strategy() -> impl Strategy<Value = Sentiment> {
    prop::sample::select(Sentiment::ALL.to_vec())
}

/// Strategy for requests.
pub fn request_strategy() -> impl Strategy<Value = Request> {
    (record_id_strategy(), status_strategy(), "[A-Za-z ]{0,40}").prop_map(
        |(id, status, description)| {
            let mut request = fixtures::request_with_status(id, status);
            request.description = description;
            request
        },
    )
}

/// Strategy for feedback.
pub fn feedback_strategy() -> impl Strategy<Value = Feedback> {
    (
        record_id_strategy(),
        sentiment_strategy(),
        proptest::option::of("[A-Za-z ]{1,40}"),
    )
        .prop_map(|(id, sentiment, reply)| {
            let mut feedback = fixtures::feedback_with_sentiment(id, sentiment);
            feedback.smart_response = reply;
            feedback
        })
}

/// Strategy for envelopes of every kind.
pub fn envelope_strategy() -> impl Strategy<Value = Envelope> {
    prop_oneof![
        request_strategy().prop_map(Envelope::NewRequest),
        request_strategy().prop_map(Envelope::RequestUpdated),
        feedback_strategy().prop_map(Envelope::NewFeedback),
        feedback_strategy().prop_map(Envelope::FeedbackUpdated),
    ]
}
