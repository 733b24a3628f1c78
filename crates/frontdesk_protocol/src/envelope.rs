//! Update envelopes and the frame decoder.
//!
//! Every inbound frame is a JSON object `{"type": <kind>, "data": <record>}`.
//! Decoding has three outcomes:
//!
//! - `Ok(Some(envelope))` for one of the four known kinds with a valid payload
//! - `Ok(None)` for a kind this client does not know (newer server)
//! - `Err(DecodeError)` for anything malformed
//!
//! None of them can fail the connection that delivered the frame.

use crate::error::{DecodeError, ProtocolResult};
use crate::record::{Feedback, RecordId, Request};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The four update kinds the server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    /// A request was created.
    NewRequest,
    /// A request changed (usually its status).
    RequestUpdated,
    /// Feedback was submitted.
    NewFeedback,
    /// Feedback changed (usually a generated reply).
    FeedbackUpdated,
}

impl EnvelopeKind {
    /// All kinds.
    pub const ALL: [EnvelopeKind; 4] = [
        EnvelopeKind::NewRequest,
        EnvelopeKind::RequestUpdated,
        EnvelopeKind::NewFeedback,
        EnvelopeKind::FeedbackUpdated,
    ];

    /// Returns the `type` tag used on the wire.
    pub fn as_wire(&self) -> &'static str {
        match self {
            EnvelopeKind::NewRequest => "new_request",
            EnvelopeKind::RequestUpdated => "request_updated",
            EnvelopeKind::NewFeedback => "new_feedback",
            EnvelopeKind::FeedbackUpdated => "feedback_updated",
        }
    }

    /// Parses a wire tag. Unknown tags yield `None`.
    pub fn from_wire(tag: &str) -> Option<Self> {
        match tag {
            "new_request" => Some(EnvelopeKind::NewRequest),
            "request_updated" => Some(EnvelopeKind::RequestUpdated),
            "new_feedback" => Some(EnvelopeKind::NewFeedback),
            "feedback_updated" => Some(EnvelopeKind::FeedbackUpdated),
            _ => None,
        }
    }

    /// Returns true for the "new record" kinds.
    pub fn is_new(&self) -> bool {
        matches!(self, EnvelopeKind::NewRequest | EnvelopeKind::NewFeedback)
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// A decoded update.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// A request was created.
    NewRequest(Request),
    /// A request changed.
    RequestUpdated(Request),
    /// Feedback was submitted.
    NewFeedback(Feedback),
    /// Feedback changed.
    FeedbackUpdated(Feedback),
}

impl Envelope {
    /// Returns the kind tag.
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Envelope::NewRequest(_) => EnvelopeKind::NewRequest,
            Envelope::RequestUpdated(_) => EnvelopeKind::RequestUpdated,
            Envelope::NewFeedback(_) => EnvelopeKind::NewFeedback,
            Envelope::FeedbackUpdated(_) => EnvelopeKind::FeedbackUpdated,
        }
    }

    /// Returns the identifier of the carried record.
    pub fn record_id(&self) -> RecordId {
        match self {
            Envelope::NewRequest(r) | Envelope::RequestUpdated(r) => r.id,
            Envelope::NewFeedback(f) | Envelope::FeedbackUpdated(f) => f.id,
        }
    }

    fn from_parts(kind: EnvelopeKind, data: Value) -> Result<Self, DecodeError> {
        let payload_err = |source| DecodeError::Payload { kind, source };
        Ok(match kind {
            EnvelopeKind::NewRequest => {
                Envelope::NewRequest(serde_json::from_value(data).map_err(payload_err)?)
            }
            EnvelopeKind::RequestUpdated => {
                Envelope::RequestUpdated(serde_json::from_value(data).map_err(payload_err)?)
            }
            EnvelopeKind::NewFeedback => {
                Envelope::NewFeedback(serde_json::from_value(data).map_err(payload_err)?)
            }
            EnvelopeKind::FeedbackUpdated => {
                Envelope::FeedbackUpdated(serde_json::from_value(data).map_err(payload_err)?)
            }
        })
    }
}

/// Raw frame shape before the payload is interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// Kind tag.
    #[serde(rename = "type")]
    pub kind: String,
    /// Record payload.
    #[serde(default)]
    pub data: Value,
}

/// Decodes one text frame.
///
/// Returns `Ok(None)` for frames whose `type` is not recognized.
pub fn decode_frame(text: &str) -> Result<Option<Envelope>, DecodeError> {
    let frame: Frame = serde_json::from_str(text).map_err(|e| {
        if e.is_data() {
            DecodeError::Shape(e)
        } else {
            DecodeError::Syntax(e)
        }
    })?;

    match EnvelopeKind::from_wire(&frame.kind) {
        Some(kind) => Envelope::from_parts(kind, frame.data).map(Some),
        None => Ok(None),
    }
}

/// Encodes an envelope into the wire format.
pub fn encode_frame(envelope: &Envelope) -> ProtocolResult<String> {
    let data = match envelope {
        Envelope::NewRequest(r) | Envelope::RequestUpdated(r) => serde_json::to_value(r)?,
        Envelope::NewFeedback(f) | Envelope::FeedbackUpdated(f) => serde_json::to_value(f)?,
    };
    let frame = Frame {
        kind: envelope.kind().as_wire().to_string(),
        data,
    };
    Ok(serde_json::to_string(&frame)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RequestStatus, Sentiment};
    use proptest::prelude::*;

    const REQUEST_DATA: &str = r#"{
        "id": 11,
        "guest_id": 1,
        "room_id": 4,
        "category": "Maintenance",
        "description": "Shower is cold",
        "status": "Pending",
        "created_at": "2024-03-01T09:15:00",
        "updated_at": "2024-03-01T09:15:00"
    }"#;

    const FEEDBACK_DATA: &str = r#"{
        "id": 5,
        "guest_id": 1,
        "room_id": 4,
        "message": "Breakfast was cold",
        "sentiment": "Negative",
        "smart_response": "We are sorry to hear that.",
        "created_at": "2024-03-01T09:15:00"
    }"#;

    fn frame(kind: &str, data: &str) -> String {
        format!(r#"{{"type": "{}", "data": {}}}"#, kind, data)
    }

    #[test]
    fn kind_wire_tags() {
        for kind in EnvelopeKind::ALL {
            assert_eq!(EnvelopeKind::from_wire(kind.as_wire()), Some(kind));
        }
        assert_eq!(EnvelopeKind::from_wire("unknown_kind"), None);
        assert!(EnvelopeKind::NewFeedback.is_new());
        assert!(!EnvelopeKind::RequestUpdated.is_new());
    }

    #[test]
    fn decode_request_kinds() {
        let envelope = decode_frame(&frame("new_request", REQUEST_DATA))
            .unwrap()
            .unwrap();
        assert_eq!(envelope.kind(), EnvelopeKind::NewRequest);
        assert_eq!(envelope.record_id(), 11);

        let envelope = decode_frame(&frame("request_updated", REQUEST_DATA))
            .unwrap()
            .unwrap();
        match envelope {
            Envelope::RequestUpdated(request) => {
                assert_eq!(request.status, RequestStatus::Pending)
            }
            other => panic!("unexpected envelope {:?}", other),
        }
    }

    #[test]
    fn decode_feedback_kinds() {
        let envelope = decode_frame(&frame("feedback_updated", FEEDBACK_DATA))
            .unwrap()
            .unwrap();
        match envelope {
            Envelope::FeedbackUpdated(feedback) => {
                assert_eq!(feedback.sentiment, Sentiment::Negative);
                assert!(feedback.smart_response.is_some());
            }
            other => panic!("unexpected envelope {:?}", other),
        }
    }

    #[test]
    fn unknown_kind_is_ignored() {
        assert!(decode_frame(&frame("unknown_kind", "{}")).unwrap().is_none());
        assert!(decode_frame(r#"{"type": "ping"}"#).unwrap().is_none());
    }

    #[test]
    fn non_json_is_syntax_error() {
        let err = decode_frame("not json at all").unwrap_err();
        assert!(matches!(err, DecodeError::Syntax(_)));

        let err = decode_frame("{\"type\": ").unwrap_err();
        assert!(matches!(err, DecodeError::Syntax(_)));
    }

    #[test]
    fn wrong_shape_is_shape_error() {
        assert!(matches!(decode_frame("[1, 2]"), Err(DecodeError::Shape(_))));
        assert!(matches!(
            decode_frame(r#"{"data": {}}"#),
            Err(DecodeError::Shape(_))
        ));
        assert!(matches!(
            decode_frame(r#"{"type": 3, "data": {}}"#),
            Err(DecodeError::Shape(_))
        ));
    }

    #[test]
    fn bad_payload_names_kind() {
        let err = decode_frame(&frame("new_feedback", REQUEST_DATA)).unwrap_err();
        assert_eq!(err.kind(), Some(EnvelopeKind::NewFeedback));

        let err = decode_frame(r#"{"type": "request_updated"}"#).unwrap_err();
        assert_eq!(err.kind(), Some(EnvelopeKind::RequestUpdated));
    }

    #[test]
    fn encoded_frame_decodes_to_same_envelope() {
        let envelope = decode_frame(&frame("new_feedback", FEEDBACK_DATA))
            .unwrap()
            .unwrap();
        let text = encode_frame(&envelope).unwrap();
        assert!(text.contains("\"type\":\"new_feedback\""));
        assert_eq!(decode_frame(&text).unwrap(), Some(envelope));
    }

    proptest! {
        #[test]
        fn decoder_is_total(text in ".*") {
            // Any input yields a value, never a panic.
            let _ = decode_frame(&text);
        }

        #[test]
        fn unknown_tags_never_error(tag in "[a-z_]{1,24}") {
            prop_assume!(EnvelopeKind::from_wire(&tag).is_none());
            let text = format!(r#"{{"type": "{}", "data": {{"id": 1}}}}"#, tag);
            prop_assert!(decode_frame(&text).unwrap().is_none());
        }
    }
}
