use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use lms_core::grading::{percentage, score_color};
use lms_core::model::{
    Choice, ChoiceId, Question, QuestionId, Quiz, QuizId, StudentId, StudentResponse,
};
use storage::repository::{NewResponseRecord, QuizRepository, ResponseRepository};

use crate::Clock;
use crate::attempt_timer::QuizTimerContext;
use crate::error::QuizAttemptError;

//
// ─── SUBMISSION ────────────────────────────────────────────────────────────────
//

/// Raw quiz submission: question id → selected choice id, as posted.
///
/// Keys and values arrive as strings; anything unparsable is treated as a
/// per-question validation failure and leaves that question unanswered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizSubmission {
    pub answers: HashMap<String, String>,
}

impl QuizSubmission {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed insertion helper for callers that already hold ids.
    pub fn answer(&mut self, question_id: QuestionId, choice_id: ChoiceId) {
        self.answers
            .insert(question_id.to_string(), choice_id.to_string());
    }

    /// Parses a posted JSON payload of the `{"answers": {"<qid>": "<cid>"}}`
    /// shape.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error for a payload that is not of that
    /// shape; unparsable ids inside the mapping are NOT an error here, they
    /// surface as unanswered questions at grading time.
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    fn raw_answer(&self, question_id: QuestionId) -> Option<&str> {
        self.answers.get(&question_id.to_string()).map(String::as_str)
    }
}

/// What `submit` hands back for the results redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptResult {
    pub score: usize,
    pub total_questions: usize,
    pub unanswered_question_ids: Vec<QuestionId>,
    pub percentage_score: u32,
}

impl AttemptResult {
    /// Query parameters carried on the redirect to the results view.
    #[must_use]
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let unanswered = self
            .unanswered_question_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        vec![
            ("score", self.score.to_string()),
            ("total_questions", self.total_questions.to_string()),
            ("unanswered_questions", unanswered),
            ("percentage_score", self.percentage_score.to_string()),
        ]
    }

    /// The same parameters as a ready-to-append query string.
    #[must_use]
    pub fn query_string(&self) -> String {
        self.query_params()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Outcome of a timed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Graded(AttemptResult),
    /// The session cap was reached; nothing was stored.
    Expired,
}

//
// ─── VIEWS ─────────────────────────────────────────────────────────────────────
//

/// A question with its selectable choices, for the quiz-taking screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionWithChoices {
    pub question: Question,
    pub choices: Vec<Choice>,
}

/// The quiz-taking screen payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizContent {
    pub quiz: Quiz,
    pub questions: Vec<QuestionWithChoices>,
}

/// Outcome of requesting the quiz-taking screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizContentOutcome {
    Ready(QuizContent),
    /// The session cap was reached; redirect to the landing page.
    Expired,
}

/// An answered question in the results breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnsweredQuestion {
    pub question: Question,
    pub selected: Choice,
}

impl AnsweredQuestion {
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.selected.is_correct()
    }
}

/// An unanswered question, materialized with its full choice set so the
/// results view can show what was missed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnansweredQuestion {
    pub question: Question,
    pub choices: Vec<Choice>,
}

/// Full results breakdown, re-derived from the stored latest attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResults {
    pub quiz: Quiz,
    pub total_questions: usize,
    pub answered: Vec<AnsweredQuestion>,
    pub unanswered: Vec<UnansweredQuestion>,
    pub number_correct: usize,
    pub number_incorrect: usize,
    pub number_unanswered: usize,
    pub percentage: u32,
    pub color: &'static str,
}

/// Summary of a prior attempt for the quiz overview screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptOverview {
    pub quiz: Quiz,
    pub submitted: bool,
    pub total_questions: usize,
    pub number_correct: usize,
    pub number_incorrect: usize,
    pub percentage: u32,
    pub duration_minutes: i64,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Grades submissions against stored correct choices and derives the
/// attempt views. Only the latest attempt per (student, quiz) is retained.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
    responses: Arc<dyn ResponseRepository>,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizRepository>,
        responses: Arc<dyn ResponseRepository>,
    ) -> Self {
        Self {
            clock,
            quizzes,
            responses,
        }
    }

    /// The quiz-taking screen, gated by the session timer.
    ///
    /// The first request records the session start; once the cap is reached
    /// the screen is withheld and the caller must redirect.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) for a missing quiz, or
    /// other storage failures.
    pub async fn content(
        &self,
        quiz_id: QuizId,
        timer: &mut QuizTimerContext,
    ) -> Result<QuizContentOutcome, QuizAttemptError> {
        let quiz = self.quizzes.get_quiz(quiz_id).await?;
        if timer.check(quiz_id, self.clock.now()).is_expired() {
            return Ok(QuizContentOutcome::Expired);
        }

        let questions = self.quizzes.questions_for_quiz(quiz_id).await?;
        let mut with_choices = Vec::with_capacity(questions.len());
        for question in questions {
            let choices = self.quizzes.choices_for_question(question.id()).await?;
            with_choices.push(QuestionWithChoices { question, choices });
        }

        Ok(QuizContentOutcome::Ready(QuizContent {
            quiz,
            questions: with_choices,
        }))
    }

    /// Grades a submission and replaces the stored attempt.
    ///
    /// Every question of the quiz is considered in order. A question with no
    /// entry, an unparsable choice id, or a choice belonging to a different
    /// question counts as unanswered and does not abort grading; a choice id
    /// that exists nowhere aborts the whole submission with `NotFound`.
    /// The score counts correct answers; choice marks are not summed.
    ///
    /// Validation happens before any write, so an aborted submission leaves
    /// the previous attempt untouched.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) for a missing quiz or an
    /// unknown choice id, or other storage failures.
    pub async fn submit(
        &self,
        student_id: StudentId,
        quiz_id: QuizId,
        submission: &QuizSubmission,
    ) -> Result<AttemptResult, QuizAttemptError> {
        self.quizzes.get_quiz(quiz_id).await?;
        let questions = self.quizzes.questions_for_quiz(quiz_id).await?;
        let total_questions = questions.len();

        let mut entries: Vec<NewResponseRecord> = Vec::with_capacity(total_questions);
        let mut unanswered_question_ids = Vec::new();
        let mut score = 0;

        for question in &questions {
            let Some(raw) = submission.raw_answer(question.id()) else {
                unanswered_question_ids.push(question.id());
                continue;
            };
            let Ok(choice_id) = raw.parse::<ChoiceId>() else {
                // malformed selection; reject this question, grade the rest
                unanswered_question_ids.push(question.id());
                continue;
            };
            let choice = self.quizzes.get_choice(choice_id).await?;
            if choice.question_id() != question.id() {
                // a real choice of some other question; local rejection
                unanswered_question_ids.push(question.id());
                continue;
            }
            if choice.is_correct() {
                score += 1;
            }
            entries.push(NewResponseRecord {
                question_id: question.id(),
                choice_id,
            });
        }

        self.responses
            .replace_responses(student_id, quiz_id, &entries)
            .await?;

        Ok(AttemptResult {
            score,
            total_questions,
            unanswered_question_ids,
            percentage_score: percentage(score, total_questions),
        })
    }

    /// Like [`submit`](Self::submit), but refuses once the session timer has
    /// expired; an expired submission stores nothing.
    ///
    /// # Errors
    ///
    /// Same as [`submit`](Self::submit).
    pub async fn submit_timed(
        &self,
        student_id: StudentId,
        quiz_id: QuizId,
        submission: &QuizSubmission,
        timer: &mut QuizTimerContext,
    ) -> Result<SubmitOutcome, QuizAttemptError> {
        if timer.check(quiz_id, self.clock.now()).is_expired() {
            return Ok(SubmitOutcome::Expired);
        }
        let result = self.submit(student_id, quiz_id, submission).await?;
        Ok(SubmitOutcome::Graded(result))
    }

    /// Re-derives the full breakdown from the stored latest attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) for a missing quiz or a
    /// stored response whose choice has vanished, or other storage failures.
    pub async fn results(
        &self,
        student_id: StudentId,
        quiz_id: QuizId,
    ) -> Result<QuizResults, QuizAttemptError> {
        let quiz = self.quizzes.get_quiz(quiz_id).await?;
        let questions = self.quizzes.questions_for_quiz(quiz_id).await?;
        let responses = self.responses.responses_for_quiz(student_id, quiz_id).await?;

        let by_question: HashMap<QuestionId, &StudentResponse> = responses
            .iter()
            .map(|r| (r.question_id, r))
            .collect();

        let total_questions = questions.len();
        let mut answered = Vec::new();
        let mut unanswered = Vec::new();

        for question in questions {
            let choices = self.quizzes.choices_for_question(question.id()).await?;
            match by_question.get(&question.id()) {
                Some(response) => {
                    let selected = choices
                        .into_iter()
                        .find(|c| c.id() == response.choice_id)
                        .ok_or(storage::repository::StorageError::NotFound)?;
                    answered.push(AnsweredQuestion { question, selected });
                }
                None => unanswered.push(UnansweredQuestion { question, choices }),
            }
        }

        let number_correct = answered.iter().filter(|a| a.is_correct()).count();
        let number_incorrect = answered.len() - number_correct;
        let number_unanswered = unanswered.len();
        let percent = percentage(number_correct, total_questions);

        Ok(QuizResults {
            quiz,
            total_questions,
            answered,
            unanswered,
            number_correct,
            number_incorrect,
            number_unanswered,
            percentage: percent,
            color: score_color(percent),
        })
    }

    /// Summary of the stored attempt for the quiz overview screen.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) for a missing quiz, or
    /// other storage failures.
    pub async fn overview(
        &self,
        student_id: StudentId,
        quiz_id: QuizId,
    ) -> Result<AttemptOverview, QuizAttemptError> {
        let quiz = self.quizzes.get_quiz(quiz_id).await?;
        let questions = self.quizzes.questions_for_quiz(quiz_id).await?;
        let responses = self.responses.responses_for_quiz(student_id, quiz_id).await?;

        let mut number_correct = 0;
        for response in &responses {
            let choice = self.quizzes.get_choice(response.choice_id).await?;
            if choice.is_correct() {
                number_correct += 1;
            }
        }

        let total_questions = questions.len();
        let number_incorrect = responses.len() - number_correct;
        let duration_minutes = quiz.duration().minutes();

        Ok(AttemptOverview {
            quiz,
            submitted: !responses.is_empty(),
            total_questions,
            number_correct,
            number_incorrect,
            percentage: percentage(number_correct, total_questions),
            duration_minutes,
        })
    }
}
