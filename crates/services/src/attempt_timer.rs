//! Session-scoped timing for quiz attempts.
//!
//! Each authenticated session owns one [`QuizTimerContext`]; nothing here is
//! persisted or shared across sessions. A quiz session moves through
//! not-started → in-progress → expired: the first check of a quiz records the
//! start marker, later checks compare elapsed time against the fixed
//! five-minute cap, and once expired the caller redirects to the learning
//! landing page instead of serving the screen.
//!
//! The cap intentionally ignores the per-quiz `duration` field; the original
//! system hardcodes five minutes for every quiz regardless of configuration.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use lms_core::model::QuizId;

/// Hard cap on a quiz session, independent of the quiz's configured duration.
pub const QUIZ_TIME_LIMIT_SECS: i64 = 300;

/// Outcome of checking the timer on a quiz-content request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    /// First render; the start marker was just recorded.
    Started,
    /// The session is running with this much time elapsed.
    InProgress { elapsed: Duration },
    /// The cap was reached; serve a redirect, not the screen.
    Expired,
}

impl TimerStatus {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(self, TimerStatus::Expired)
    }
}

/// Per-session start markers, one per quiz.
///
/// The marker survives until an external actor clears it (logout, session
/// expiry); there is no in-band transition back to not-started.
#[derive(Debug, Clone, Default)]
pub struct QuizTimerContext {
    starts: HashMap<QuizId, DateTime<Utc>>,
}

impl QuizTimerContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks the session state for a quiz, starting it on first contact.
    pub fn check(&mut self, quiz_id: QuizId, now: DateTime<Utc>) -> TimerStatus {
        match self.starts.get(&quiz_id) {
            None => {
                self.starts.insert(quiz_id, now);
                TimerStatus::Started
            }
            Some(start) => {
                let elapsed = now - *start;
                if elapsed.num_seconds() >= QUIZ_TIME_LIMIT_SECS {
                    TimerStatus::Expired
                } else {
                    TimerStatus::InProgress { elapsed }
                }
            }
        }
    }

    /// When the session for a quiz started, if it has.
    #[must_use]
    pub fn started_at(&self, quiz_id: QuizId) -> Option<DateTime<Utc>> {
        self.starts.get(&quiz_id).copied()
    }

    /// Drops the start marker for one quiz.
    pub fn clear(&mut self, quiz_id: QuizId) {
        self.starts.remove(&quiz_id);
    }

    /// Drops every start marker; used when the surrounding session ends.
    pub fn reset(&mut self) {
        self.starts.clear();
    }
}
