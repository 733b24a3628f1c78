//! Record fixtures.
//!
//! All fixtures use fixed timestamps so that equality checks are stable.

use chrono::{NaiveDate, NaiveDateTime};
use frontdesk_protocol::{
    Feedback, GuestSummary, RecordId, Request, RequestStatus, RoomSummary, Sentiment,
};

/// A fixed timestamp `minute` minutes after 2024-03-01 08:00.
pub fn timestamp(minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(8 + minute / 60, minute % 60, 0))
        .expect("valid fixture timestamp")
}

/// A guest summary.
pub fn guest(id: RecordId) -> GuestSummary {
    GuestSummary {
        id,
        first_name: "Grace".into(),
        last_name: format!("Guest{}", id),
        email: format!("guest{}@example.com", id),
        phone: None,
        created_at: timestamp(0),
    }
}

/// A room summary.
pub fn room(id: RecordId) -> RoomSummary {
    RoomSummary {
        id,
        room_number: format!("{}", 100 + id),
        room_type: "Double".into(),
        floor: 1,
        created_at: timestamp(0),
    }
}

/// A pending request with embedded guest and room.
pub fn request(id: RecordId) -> Request {
    request_with_status(id, RequestStatus::Pending)
}

/// A request in the given status.
pub fn request_with_status(id: RecordId, status: RequestStatus) -> Request {
    Request {
        id,
        guest_id: 1,
        room_id: 2,
        category: "Housekeeping".into(),
        description: format!("Request #{}", id),
        status,
        created_at: timestamp(id.rem_euclid(600) as u32),
        updated_at: timestamp(id.rem_euclid(600) as u32),
        guest: Some(guest(1)),
        room: Some(room(2)),
    }
}

/// Neutral feedback without a generated reply.
pub fn feedback(id: RecordId) -> Feedback {
    feedback_with_sentiment(id, Sentiment::Neutral)
}

/// Feedback with the given sentiment.
pub fn feedback_with_sentiment(id: RecordId, sentiment: Sentiment) -> Feedback {
    Feedback {
        id,
        guest_id: 1,
        room_id: 2,
        message: format!("Feedback #{}", id),
        sentiment,
        smart_response: None,
        created_at: timestamp(id.rem_euclid(600) as u32),
        guest: Some(guest(1)),
        room: None,
    }
}
