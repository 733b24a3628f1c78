//! Wire frame builders.

use frontdesk_protocol::{encode_frame, Envelope, Feedback, Request};

/// Encodes an envelope as the server would send it.
pub fn encode(envelope: &Envelope) -> String {
    encode_frame(envelope).expect("fixture envelope encodes")
}

/// A `new_request` frame.
pub fn new_request(request: &Request) -> String {
    encode(&Envelope::NewRequest(request.clone()))
}

/// A `request_updated` frame.
pub fn request_updated(request: &Request) -> String {
    encode(&Envelope::RequestUpdated(request.clone()))
}

/// A `new_feedback` frame.
pub fn new_feedback(feedback: &Feedback) -> String {
    encode(&Envelope::NewFeedback(feedback.clone()))
}

/// A `feedback_updated` frame.
pub fn feedback_updated(feedback: &Feedback) -> String {
    encode(&Envelope::FeedbackUpdated(feedback.clone()))
}

/// A well-formed frame of a kind the client does not know.
pub fn unknown(kind: &str) -> String {
    serde_json::json!({ "type": kind, "data": { "id": 1 } }).to_string()
}

/// A frame that is not JSON.
pub fn garbage() -> String {
    "<<not json>>".to_string()
}

/// A known kind whose payload does not match the schema.
pub fn bad_payload(kind: &str) -> String {
    serde_json::json!({ "type": kind, "data": { "id": "seven" } }).to_string()
}
