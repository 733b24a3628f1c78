//! Request and feedback records.
//!
//! Field names and enum spellings follow the backend's JSON serialization so
//! that records decode directly from update frames and snapshot responses.
//! Unknown fields are ignored.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a record within its collection.
pub type RecordId = i64;

/// A record stored in one of the dashboard collections.
pub trait Record: Clone + Send + Sync + 'static {
    /// Name of the collection holding this record type.
    const COLLECTION: &'static str;

    /// Returns the identifier used as the match key for replacement.
    fn id(&self) -> RecordId;
}

/// Lifecycle status of a guest-service request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Waiting for staff.
    #[serde(rename = "Pending")]
    Pending,
    /// Being handled.
    #[serde(rename = "In Progress")]
    InProgress,
    /// Done.
    #[serde(rename = "Completed")]
    Completed,
}

impl RequestStatus {
    /// All statuses in display order.
    pub const ALL: [RequestStatus; 3] = [
        RequestStatus::Pending,
        RequestStatus::InProgress,
        RequestStatus::Completed,
    ];

    /// Returns the wire spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::InProgress => "In Progress",
            RequestStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sentiment classification of guest feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    /// Positive feedback.
    Positive,
    /// Negative feedback.
    Negative,
    /// Neither.
    Neutral,
}

impl Sentiment {
    /// All sentiments in display order.
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    /// Returns the wire spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guest details embedded in a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestSummary {
    /// Guest ID.
    pub id: RecordId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact email.
    pub email: String,
    /// Contact phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Registration time.
    pub created_at: NaiveDateTime,
}

impl GuestSummary {
    /// Returns "First Last".
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Room details embedded in a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSummary {
    /// Room ID.
    pub id: RecordId,
    /// Room number as printed on the door.
    pub room_number: String,
    /// Room type (e.g. "Suite").
    pub room_type: String,
    /// Floor number.
    pub floor: i32,
    /// Creation time.
    pub created_at: NaiveDateTime,
}

/// A guest-service request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Request ID.
    pub id: RecordId,
    /// Guest that raised the request.
    pub guest_id: RecordId,
    /// Room the request concerns.
    pub room_id: RecordId,
    /// Category assigned by the backend classifier.
    pub category: String,
    /// Free-text description.
    pub description: String,
    /// Current status.
    pub status: RequestStatus,
    /// Creation time.
    pub created_at: NaiveDateTime,
    /// Last modification time.
    pub updated_at: NaiveDateTime,
    /// Embedded guest details.
    #[serde(default)]
    pub guest: Option<GuestSummary>,
    /// Embedded room details.
    #[serde(default)]
    pub room: Option<RoomSummary>,
}

impl Record for Request {
    const COLLECTION: &'static str = "requests";

    fn id(&self) -> RecordId {
        self.id
    }
}

/// Guest feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    /// Feedback ID.
    pub id: RecordId,
    /// Guest that left the feedback.
    pub guest_id: RecordId,
    /// Room the feedback concerns.
    pub room_id: RecordId,
    /// Feedback text.
    pub message: String,
    /// Sentiment classification.
    pub sentiment: Sentiment,
    /// Suggested staff reply, once generated.
    #[serde(default)]
    pub smart_response: Option<String>,
    /// Creation time.
    pub created_at: NaiveDateTime,
    /// Embedded guest details.
    #[serde(default)]
    pub guest: Option<GuestSummary>,
    /// Embedded room details.
    #[serde(default)]
    pub room: Option<RoomSummary>,
}

impl Record for Feedback {
    const COLLECTION: &'static str = "feedback";

    fn id(&self) -> RecordId {
        self.id
    }
}
