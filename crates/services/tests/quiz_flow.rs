use std::sync::Arc;

use chrono::Duration;
use lms_core::model::{ChoiceId, QuestionId, QuizDuration, QuizId, StudentColor, StudentId, UserId};
use lms_core::time::fixed_now;
use services::{
    Clock, QuizContentOutcome, QuizService, QuizSubmission, QuizTimerContext, SubmitOutcome,
    TimerStatus,
};
use storage::repository::{
    ChapterRepository, GradeRepository, InMemoryRepository, NewChapterRecord, NewChoiceRecord,
    NewGradeRecord, NewQuestionRecord, NewQuizRecord, NewStudentRecord, NewSubjectRecord,
    NewTopicRecord, QuizRepository, StorageError, StudentRepository, SubjectRepository,
    TopicRepository,
};

struct Fixture {
    repo: InMemoryRepository,
    student_id: StudentId,
    quiz_id: QuizId,
    /// (question, correct choice, one incorrect choice) per question.
    questions: Vec<(QuestionId, ChoiceId, ChoiceId)>,
}

impl Fixture {
    /// Engine over the shared store, at the deterministic test time.
    fn engine(&self) -> QuizService {
        self.engine_at(Duration::zero())
    }

    /// Engine over the shared store, `delta` after the test time.
    fn engine_at(&self, delta: Duration) -> QuizService {
        QuizService::new(
            Clock::fixed(fixed_now() + delta),
            Arc::new(self.repo.clone()),
            Arc::new(self.repo.clone()),
        )
    }
}

/// Seeds one quiz with `question_count` questions of two choices each.
async fn seed(question_count: usize) -> Fixture {
    let repo = InMemoryRepository::new();

    let grade_id = repo
        .insert_grade(NewGradeRecord {
            name: "Grade 7".into(),
            slug: "grade-7".into(),
        })
        .await
        .unwrap();
    let student_id = repo
        .insert_student(NewStudentRecord {
            user_id: UserId::new(1),
            grade_id,
            first_name: "Amina".into(),
            last_name: "Khalil".into(),
            slug: "amina".into(),
            color: StudentColor::Blue,
        })
        .await
        .unwrap();
    let subject_id = repo
        .insert_subject(NewSubjectRecord {
            grade_id,
            name: "Maths".into(),
            slug: "maths".into(),
            description: None,
            thumbnail: "subjects/maths.png".into(),
        })
        .await
        .unwrap();
    let topic_id = repo
        .insert_topic(NewTopicRecord {
            subject_id,
            name: "Numbers".into(),
            slug: "numbers".into(),
            description: None,
            thumbnail: "topics/numbers.png".into(),
            review: None,
        })
        .await
        .unwrap();
    let chapter_id = repo
        .insert_chapter(NewChapterRecord {
            topic_id,
            name: "Primes".into(),
            number: 1,
            slug: "primes".into(),
            description: None,
            thumbnail: "chapters/primes.png".into(),
            review: None,
            content: "A prime has exactly two divisors.".into(),
        })
        .await
        .unwrap();
    let quiz_id = repo
        .insert_quiz(NewQuizRecord {
            chapter_id,
            title: "Primes Checkpoint".into(),
            slug: "primes-checkpoint".into(),
            publish: true,
            duration: QuizDuration::Min5,
            created_at: fixed_now(),
        })
        .await
        .unwrap();

    let mut questions = Vec::with_capacity(question_count);
    for i in 0..question_count {
        let question_id = repo
            .insert_question(NewQuestionRecord {
                quiz_id,
                text: format!("Question {}", i + 1),
            })
            .await
            .unwrap();
        let right = repo
            .insert_choice(NewChoiceRecord {
                question_id,
                text: "Right".into(),
                is_correct: true,
                explanation: None,
                mark: 1,
            })
            .await
            .unwrap();
        let wrong = repo
            .insert_choice(NewChoiceRecord {
                question_id,
                text: "Wrong".into(),
                is_correct: false,
                explanation: Some("see the chapter review".into()),
                mark: 1,
            })
            .await
            .unwrap();
        questions.push((question_id, right, wrong));
    }

    Fixture {
        repo,
        student_id,
        quiz_id,
        questions,
    }
}

#[tokio::test]
async fn three_correct_one_incorrect_scores_75() {
    let fx = seed(4).await;
    let mut submission = QuizSubmission::new();
    for (question_id, right, _) in &fx.questions[..3] {
        submission.answer(*question_id, *right);
    }
    submission.answer(fx.questions[3].0, fx.questions[3].2);

    let result = fx
        .engine()
        .submit(fx.student_id, fx.quiz_id, &submission)
        .await
        .unwrap();

    assert_eq!(result.score, 3);
    assert_eq!(result.total_questions, 4);
    assert_eq!(result.percentage_score, 75);
    assert!(result.unanswered_question_ids.is_empty());
}

#[tokio::test]
async fn partial_submission_reports_unanswered_ids() {
    let fx = seed(5).await;
    let mut submission = QuizSubmission::new();
    for (question_id, right, _) in &fx.questions[..2] {
        submission.answer(*question_id, *right);
    }

    let result = fx
        .engine()
        .submit(fx.student_id, fx.quiz_id, &submission)
        .await
        .unwrap();

    assert_eq!(result.score, 2);
    assert_eq!(result.total_questions, 5);
    assert_eq!(result.percentage_score, 40);
    let expected: Vec<QuestionId> = fx.questions[2..].iter().map(|q| q.0).collect();
    assert_eq!(result.unanswered_question_ids, expected);
}

#[tokio::test]
async fn resubmission_replaces_the_stored_attempt() {
    let fx = seed(4).await;
    let engine = fx.engine();

    let mut first = QuizSubmission::new();
    for (question_id, _, wrong) in &fx.questions {
        first.answer(*question_id, *wrong);
    }
    engine
        .submit(fx.student_id, fx.quiz_id, &first)
        .await
        .unwrap();

    let mut second = QuizSubmission::new();
    for (question_id, right, _) in &fx.questions[..2] {
        second.answer(*question_id, *right);
    }
    let result = engine
        .submit(fx.student_id, fx.quiz_id, &second)
        .await
        .unwrap();
    assert_eq!(result.score, 2);

    // results reflect only the second attempt
    let results = engine.results(fx.student_id, fx.quiz_id).await.unwrap();
    assert_eq!(results.answered.len(), 2);
    assert_eq!(results.number_correct, 2);
    assert_eq!(results.number_incorrect, 0);
    assert_eq!(results.number_unanswered, 2);
    assert_eq!(results.percentage, 50);
    assert_eq!(results.color, "#EC8B00");
}

#[tokio::test]
async fn results_materialize_unanswered_choices() {
    let fx = seed(3).await;
    let engine = fx.engine();

    let mut submission = QuizSubmission::new();
    submission.answer(fx.questions[0].0, fx.questions[0].1);
    engine
        .submit(fx.student_id, fx.quiz_id, &submission)
        .await
        .unwrap();

    let results = engine.results(fx.student_id, fx.quiz_id).await.unwrap();

    assert_eq!(results.unanswered.len(), 2);
    for unanswered in &results.unanswered {
        assert_eq!(unanswered.choices.len(), 2);
        let wrong = unanswered.choices.iter().find(|c| !c.is_correct()).unwrap();
        assert_eq!(wrong.explanation(), Some("see the chapter review"));
    }
    assert_eq!(results.percentage, 33);
    assert_eq!(results.color, "#F73100");
}

#[tokio::test]
async fn foreign_choice_rejects_only_that_question() {
    let fx = seed(2).await;
    let mut submission = QuizSubmission::new();
    submission.answer(fx.questions[0].0, fx.questions[0].1);
    // a genuine choice, but of the other question
    submission.answer(fx.questions[1].0, fx.questions[0].2);

    let result = fx
        .engine()
        .submit(fx.student_id, fx.quiz_id, &submission)
        .await
        .unwrap();

    assert_eq!(result.score, 1);
    assert_eq!(result.unanswered_question_ids, vec![fx.questions[1].0]);
}

#[tokio::test]
async fn malformed_choice_value_is_a_local_rejection() {
    let fx = seed(2).await;
    let mut submission = QuizSubmission::new();
    submission.answer(fx.questions[0].0, fx.questions[0].1);
    submission
        .answers
        .insert(fx.questions[1].0.to_string(), "not-an-id".into());

    let result = fx
        .engine()
        .submit(fx.student_id, fx.quiz_id, &submission)
        .await
        .unwrap();

    assert_eq!(result.score, 1);
    assert_eq!(result.unanswered_question_ids, vec![fx.questions[1].0]);
}

#[tokio::test]
async fn unknown_choice_id_aborts_and_keeps_prior_attempt() {
    let fx = seed(2).await;
    let engine = fx.engine();

    let mut first = QuizSubmission::new();
    for (question_id, right, _) in &fx.questions {
        first.answer(*question_id, *right);
    }
    engine
        .submit(fx.student_id, fx.quiz_id, &first)
        .await
        .unwrap();

    let mut bad = QuizSubmission::new();
    bad.answer(fx.questions[0].0, ChoiceId::new(9999));
    let err = engine
        .submit(fx.student_id, fx.quiz_id, &bad)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        services::QuizAttemptError::Storage(StorageError::NotFound)
    ));

    // the aborted submission wrote nothing
    let results = engine.results(fx.student_id, fx.quiz_id).await.unwrap();
    assert_eq!(results.number_correct, 2);
}

#[tokio::test]
async fn zero_question_quiz_scores_zero_percent() {
    let fx = seed(0).await;
    let engine = fx.engine();

    let result = engine
        .submit(fx.student_id, fx.quiz_id, &QuizSubmission::new())
        .await
        .unwrap();
    assert_eq!(result.total_questions, 0);
    assert_eq!(result.percentage_score, 0);

    let results = engine.results(fx.student_id, fx.quiz_id).await.unwrap();
    assert_eq!(results.percentage, 0);
    assert_eq!(results.color, "#FF0000");
}

#[tokio::test]
async fn expired_session_discards_the_submission() {
    let fx = seed(2).await;
    let mut timer = QuizTimerContext::new();

    // open the quiz at t = 0
    let outcome = fx
        .engine()
        .content(fx.quiz_id, &mut timer)
        .await
        .unwrap();
    assert!(matches!(outcome, QuizContentOutcome::Ready(_)));

    // submit 301 seconds later on the same session context
    let late = fx.engine_at(Duration::seconds(301));
    let mut submission = QuizSubmission::new();
    for (question_id, right, _) in &fx.questions {
        submission.answer(*question_id, *right);
    }
    let outcome = late
        .submit_timed(fx.student_id, fx.quiz_id, &submission, &mut timer)
        .await
        .unwrap();
    assert_eq!(outcome, SubmitOutcome::Expired);

    // nothing was recorded
    let overview = late.overview(fx.student_id, fx.quiz_id).await.unwrap();
    assert!(!overview.submitted);
}

#[tokio::test]
async fn content_runs_until_the_cap() {
    let fx = seed(1).await;
    let mut timer = QuizTimerContext::new();

    fx.engine().content(fx.quiz_id, &mut timer).await.unwrap();

    match timer.check(fx.quiz_id, fixed_now() + Duration::seconds(299)) {
        TimerStatus::InProgress { elapsed } => assert_eq!(elapsed, Duration::seconds(299)),
        other => panic!("unexpected status: {other:?}"),
    }

    let outcome = fx
        .engine_at(Duration::seconds(300))
        .content(fx.quiz_id, &mut timer)
        .await
        .unwrap();
    assert_eq!(outcome, QuizContentOutcome::Expired);
}

#[tokio::test]
async fn timed_submission_within_the_cap_is_graded() {
    let fx = seed(2).await;
    let mut timer = QuizTimerContext::new();

    fx.engine().content(fx.quiz_id, &mut timer).await.unwrap();

    let mut submission = QuizSubmission::new();
    for (question_id, right, _) in &fx.questions {
        submission.answer(*question_id, *right);
    }
    let outcome = fx
        .engine_at(Duration::seconds(200))
        .submit_timed(fx.student_id, fx.quiz_id, &submission, &mut timer)
        .await
        .unwrap();

    match outcome {
        SubmitOutcome::Graded(result) => {
            assert_eq!(result.score, 2);
            assert_eq!(result.percentage_score, 100);
        }
        SubmitOutcome::Expired => panic!("submission should have been graded"),
    }
}

#[tokio::test]
async fn overview_summarizes_the_stored_attempt() {
    let fx = seed(4).await;
    let engine = fx.engine();

    let overview = engine.overview(fx.student_id, fx.quiz_id).await.unwrap();
    assert!(!overview.submitted);
    assert_eq!(overview.duration_minutes, 5);

    let mut submission = QuizSubmission::new();
    for (question_id, right, _) in &fx.questions[..3] {
        submission.answer(*question_id, *right);
    }
    submission.answer(fx.questions[3].0, fx.questions[3].2);
    engine
        .submit(fx.student_id, fx.quiz_id, &submission)
        .await
        .unwrap();

    let overview = engine.overview(fx.student_id, fx.quiz_id).await.unwrap();
    assert!(overview.submitted);
    assert_eq!(overview.number_correct, 3);
    assert_eq!(overview.number_incorrect, 1);
    assert_eq!(overview.percentage, 75);
}

#[tokio::test]
async fn attempt_result_query_parameters_match_the_redirect_contract() {
    let fx = seed(5).await;
    let mut submission = QuizSubmission::new();
    for (question_id, right, _) in &fx.questions[..2] {
        submission.answer(*question_id, *right);
    }

    let result = fx
        .engine()
        .submit(fx.student_id, fx.quiz_id, &submission)
        .await
        .unwrap();

    let params = result.query_params();
    assert_eq!(params[0], ("score", "2".to_string()));
    assert_eq!(params[1], ("total_questions", "5".to_string()));
    let expected_ids = fx.questions[2..]
        .iter()
        .map(|q| q.0.to_string())
        .collect::<Vec<_>>()
        .join(",");
    assert_eq!(params[2], ("unanswered_questions", expected_ids));
    assert_eq!(params[3], ("percentage_score", "40".to_string()));
    assert!(result.query_string().starts_with("score=2&total_questions=5"));
}

#[tokio::test]
async fn submissions_parse_from_posted_json() {
    let fx = seed(2).await;
    let payload = format!(
        r#"{{"answers": {{"{}": "{}", "{}": "bogus"}}}}"#,
        fx.questions[0].0, fx.questions[0].1, fx.questions[1].0,
    );
    let submission = QuizSubmission::from_json(&payload).unwrap();

    let result = fx
        .engine()
        .submit(fx.student_id, fx.quiz_id, &submission)
        .await
        .unwrap();

    assert_eq!(result.score, 1);
    assert_eq!(result.unanswered_question_ids, vec![fx.questions[1].0]);
}
