use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{ChapterId, ChoiceId, QuestionId, QuizId};
use crate::slug::slugify;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("no usable slug can be derived")]
    EmptySlug,

    #[error("question text cannot be empty")]
    EmptyQuestionText,

    #[error("choice text cannot be empty")]
    EmptyChoiceText,

    #[error("unsupported quiz duration: {0} seconds")]
    UnsupportedDuration(i64),
}

//
// ─── DURATION ──────────────────────────────────────────────────────────────────
//

/// The fixed set of configurable quiz durations.
///
/// Note that the attempt timer enforces its own 5-minute cap regardless of
/// this setting; the configured duration is display metadata today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuizDuration {
    #[default]
    Min5,
    Min7,
    Min10,
    Min13,
    Min15,
    Min17,
    Min20,
}

impl QuizDuration {
    pub const ALL: [QuizDuration; 7] = [
        QuizDuration::Min5,
        QuizDuration::Min7,
        QuizDuration::Min10,
        QuizDuration::Min13,
        QuizDuration::Min15,
        QuizDuration::Min17,
        QuizDuration::Min20,
    ];

    #[must_use]
    pub fn as_secs(self) -> i64 {
        match self {
            QuizDuration::Min5 => 300,
            QuizDuration::Min7 => 420,
            QuizDuration::Min10 => 600,
            QuizDuration::Min13 => 780,
            QuizDuration::Min15 => 900,
            QuizDuration::Min17 => 1020,
            QuizDuration::Min20 => 1200,
        }
    }

    /// Duration in whole minutes, as shown on the quiz overview.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn minutes(self) -> i64 {
        (self.as_secs() as f64 / 60.0).round() as i64
    }

    /// Human-readable label ("5 min" … "20 min").
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            QuizDuration::Min5 => "5 min",
            QuizDuration::Min7 => "7 min",
            QuizDuration::Min10 => "10 min",
            QuizDuration::Min13 => "13 min",
            QuizDuration::Min15 => "15 min",
            QuizDuration::Min17 => "17 min",
            QuizDuration::Min20 => "20 min",
        }
    }

    /// Parses a persisted seconds value back into the enumeration.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::UnsupportedDuration` for values outside the set.
    pub fn from_secs(secs: i64) -> Result<Self, QuizError> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_secs() == secs)
            .ok_or(QuizError::UnsupportedDuration(secs))
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// A multiple-choice quiz attached to a chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    id: QuizId,
    chapter_id: ChapterId,
    title: String,
    slug: String,
    publish: bool,
    duration: QuizDuration,
    created_at: DateTime<Utc>,
}

impl Quiz {
    /// Creates a new quiz. `created_at` is set once and never updated.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::EmptyTitle` for a blank title and
    /// `QuizError::EmptySlug` when no usable slug can be derived.
    pub fn new(
        id: QuizId,
        chapter_id: ChapterId,
        title: impl Into<String>,
        slug: Option<String>,
        publish: bool,
        duration: QuizDuration,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuizError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        let slug = match slug {
            Some(s) if !s.trim().is_empty() => slugify(&s),
            _ => slugify(&title),
        };
        if slug.is_empty() {
            return Err(QuizError::EmptySlug);
        }

        Ok(Self {
            id,
            chapter_id,
            title,
            slug,
            publish,
            duration,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn chapter_id(&self) -> ChapterId {
        self.chapter_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    #[must_use]
    pub fn publish(&self) -> bool {
        self.publish
    }

    #[must_use]
    pub fn duration(&self) -> QuizDuration {
        self.duration
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single-correct-choice question belonging to a quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    quiz_id: QuizId,
    text: String,
}

impl Question {
    /// Creates a new question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::EmptyQuestionText` for blank text.
    pub fn new(
        id: QuestionId,
        quiz_id: QuizId,
        text: impl Into<String>,
    ) -> Result<Self, QuizError> {
        let text = text.into().trim().to_owned();
        if text.is_empty() {
            return Err(QuizError::EmptyQuestionText);
        }
        Ok(Self { id, quiz_id, text })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

//
// ─── CHOICE ────────────────────────────────────────────────────────────────────
//

/// One selectable answer for a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    id: ChoiceId,
    question_id: QuestionId,
    text: String,
    is_correct: bool,
    explanation: Option<String>,
    mark: i32,
}

impl Choice {
    /// Creates a new choice.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::EmptyChoiceText` for blank text.
    pub fn new(
        id: ChoiceId,
        question_id: QuestionId,
        text: impl Into<String>,
        is_correct: bool,
        explanation: Option<String>,
        mark: i32,
    ) -> Result<Self, QuizError> {
        let text = text.into().trim().to_owned();
        if text.is_empty() {
            return Err(QuizError::EmptyChoiceText);
        }
        let explanation = explanation
            .map(|e| e.trim().to_owned())
            .filter(|e| !e.is_empty());

        Ok(Self {
            id,
            question_id,
            text,
            is_correct,
            explanation,
            mark,
        })
    }

    #[must_use]
    pub fn id(&self) -> ChoiceId {
        self.id
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn mark(&self) -> i32 {
        self.mark
    }
}

/// Total marks available on a question, summed over all of its choices.
///
/// This mirrors the legacy mark computation; scoring counts correct
/// answers and does not consume this value.
#[must_use]
pub fn available_marks(choices: &[Choice]) -> i32 {
    choices.iter().map(Choice::mark).sum()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
