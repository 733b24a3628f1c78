//! Store summary counts.

use serde::Serialize;

/// Requests per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RequestCounts {
    /// Pending requests.
    pub pending: usize,
    /// Requests in progress.
    pub in_progress: usize,
    /// Completed requests.
    pub completed: usize,
}

impl RequestCounts {
    /// Total requests.
    pub fn total(&self) -> usize {
        self.pending + self.in_progress + self.completed
    }
}

/// Feedback per sentiment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedbackCounts {
    /// Positive feedback.
    pub positive: usize,
    /// Negative feedback.
    pub negative: usize,
    /// Neutral feedback.
    pub neutral: usize,
}

impl FeedbackCounts {
    /// Total feedback.
    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }
}

/// Summary of the store content, as shown on the dashboard tiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Request counts.
    pub requests: RequestCounts,
    /// Feedback counts.
    pub feedback: FeedbackCounts,
}
