//! User-visible connection failure notice.

use std::fmt;

/// What the user can do about a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeAction {
    /// Start over with a fresh connection.
    Reload,
    /// Hide the notice; the connection stays failed.
    Dismiss,
}

/// Notice shown once the retry budget is exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotice {
    /// Text shown to the user.
    pub message: String,
    /// Last failure reported by the transport.
    pub reason: Option<String>,
    /// Attempts made in the failed episode.
    pub attempts: u32,
}

impl ErrorNotice {
    pub(crate) fn connection_failed(attempts: u32, reason: Option<String>) -> Self {
        Self {
            message: "Unable to establish real-time connection. Live updates are paused; \
                      reload to try again."
                .to_string(),
            reason,
            attempts,
        }
    }

    /// Actions offered alongside the notice.
    pub fn actions(&self) -> [NoticeAction; 2] {
        [NoticeAction::Reload, NoticeAction::Dismiss]
    }
}

impl fmt::Display for ErrorNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(reason) = &self.reason {
            write!(f, " (last error after {} attempts: {})", self.attempts, reason)?;
        }
        Ok(())
    }
}
