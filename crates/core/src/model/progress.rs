use chrono::{DateTime, Utc};

use crate::model::ids::{ChapterId, ChoiceId, QuestionId, QuizId, StudentId};

/// Tracks whether a student has marked a chapter as done.
///
/// At most one record exists per (student, chapter); the storage layer
/// enforces this with a composite unique constraint and records are only
/// ever created through get-or-create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRecord {
    pub id: i64,
    pub student_id: StudentId,
    pub chapter_id: ChapterId,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl CompletionRecord {
    /// Applies a completion toggle.
    ///
    /// Transitioning to `true` stamps `completed_at` once; re-affirming an
    /// already-complete record keeps the original timestamp. Clearing the
    /// flag also clears the timestamp, so a reopened chapter never carries
    /// a stale completion date.
    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        if completed {
            if !self.completed {
                self.completed_at = Some(now);
            }
        } else {
            self.completed_at = None;
        }
        self.completed = completed;
    }
}

/// One answered question in a student's latest quiz attempt.
///
/// Absence of a row is the "unanswered" signal; rows are replaced wholesale
/// on resubmission and never updated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentResponse {
    pub id: i64,
    pub student_id: StudentId,
    pub quiz_id: QuizId,
    pub question_id: QuestionId,
    pub choice_id: ChoiceId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn record() -> CompletionRecord {
        CompletionRecord {
            id: 1,
            student_id: StudentId::new(1),
            chapter_id: ChapterId::new(1),
            completed: false,
            completed_at: None,
        }
    }

    #[test]
    fn completing_stamps_timestamp() {
        let mut rec = record();
        rec.set_completed(true, fixed_now());
        assert!(rec.completed);
        assert_eq!(rec.completed_at, Some(fixed_now()));
    }

    #[test]
    fn reaffirming_keeps_original_timestamp() {
        let mut rec = record();
        rec.set_completed(true, fixed_now());
        rec.set_completed(true, fixed_now() + Duration::days(1));
        assert_eq!(rec.completed_at, Some(fixed_now()));
    }

    #[test]
    fn clearing_drops_timestamp() {
        let mut rec = record();
        rec.set_completed(true, fixed_now());
        rec.set_completed(false, fixed_now() + Duration::hours(1));
        assert!(!rec.completed);
        assert_eq!(rec.completed_at, None);
    }
}
