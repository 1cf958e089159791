use lms_core::model::{
    ChapterId, QuizDuration, QuizId, StudentColor, StudentId, SubjectId, TopicId, UserId,
};
use lms_core::time::fixed_now;
use storage::repository::{
    ChapterRepository, CompletionRepository, GradeRepository, NewChapterRecord, NewChoiceRecord,
    NewGradeRecord, NewQuestionRecord, NewQuizRecord, NewResponseRecord, NewStudentRecord,
    NewSubjectRecord, NewTopicRecord, QuizRepository, ResponseRepository, StorageError,
    StudentRepository, SubjectRepository, TopicRepository,
};
use storage::sqlite::SqliteRepository;

struct Fixture {
    repo: SqliteRepository,
    student_id: StudentId,
    subject_id: SubjectId,
    topic_id: TopicId,
    chapter_id: ChapterId,
}

async fn seed(db: &str) -> Fixture {
    let repo = SqliteRepository::connect(db).await.expect("connect");
    repo.migrate().await.expect("migrate");

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

    Fixture {
        repo,
        student_id,
        subject_id,
        topic_id,
        chapter_id,
    }
}

async fn seed_quiz(fx: &Fixture) -> (QuizId, Vec<(lms_core::model::QuestionId, lms_core::model::ChoiceId)>) {
    let quiz_id = fx
        .repo
        .insert_quiz(NewQuizRecord {
            chapter_id: fx.chapter_id,
            title: "Checkpoint".into(),
            slug: "checkpoint".into(),
            publish: true,
            duration: QuizDuration::Min5,
            created_at: fixed_now(),
        })
        .await
        .unwrap();

    let mut correct = Vec::new();
    for text in ["Is 7 prime?", "Is 9 prime?"] {
        let question_id = fx
            .repo
            .insert_question(NewQuestionRecord {
                quiz_id,
                text: text.into(),
            })
            .await
            .unwrap();
        let yes = fx
            .repo
            .insert_choice(NewChoiceRecord {
                question_id,
                text: "Yes".into(),
                is_correct: text == "Is 7 prime?",
                explanation: None,
                mark: 1,
            })
            .await
            .unwrap();
        fx.repo
            .insert_choice(NewChoiceRecord {
                question_id,
                text: "No".into(),
                is_correct: text != "Is 7 prime?",
                explanation: Some("9 = 3 × 3".into()),
                mark: 1,
            })
            .await
            .unwrap();
        correct.push((question_id, yes));
    }
    (quiz_id, correct)
}

#[tokio::test]
async fn slug_chain_roundtrips() {
    let fx = seed("sqlite:file:memdb_slug_chain?mode=memory&cache=shared").await;

    let student = fx.repo.get_student_by_slug("amina").await.unwrap();
    let subject = fx
        .repo
        .get_subject_by_slug(student.grade_id(), "maths")
        .await
        .unwrap();
    assert_eq!(subject.id(), fx.subject_id);

    let topic = fx
        .repo
        .get_topic_by_slug(subject.id(), "numbers")
        .await
        .unwrap();
    assert_eq!(topic.id(), fx.topic_id);

    let chapter = fx
        .repo
        .get_chapter_by_slug(topic.id(), "primes")
        .await
        .unwrap();
    assert_eq!(chapter.id(), fx.chapter_id);
    assert_eq!(chapter.number(), 1);

    // wrong parent breaks the chain
    let err = fx
        .repo
        .get_chapter_by_slug(TopicId::new(9999), "primes")
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn completion_get_or_create_yields_one_row() {
    let fx = seed("sqlite:file:memdb_completion_once?mode=memory&cache=shared").await;

    let first = fx
        .repo
        .get_or_create(fx.student_id, fx.chapter_id)
        .await
        .unwrap();
    // concurrent first visits race on the same unique index
    let (a, b) = tokio::join!(
        fx.repo.get_or_create(fx.student_id, fx.chapter_id),
        fx.repo.get_or_create(fx.student_id, fx.chapter_id),
    );
    let a = a.unwrap();
    let b = b.unwrap();
    assert_eq!(first.id, a.id);
    assert_eq!(a.id, b.id);
    assert!(!a.completed);
}

#[tokio::test]
async fn completion_update_persists_timestamp() {
    let fx = seed("sqlite:file:memdb_completion_update?mode=memory&cache=shared").await;

    let mut record = fx
        .repo
        .get_or_create(fx.student_id, fx.chapter_id)
        .await
        .unwrap();
    record.set_completed(true, fixed_now());
    fx.repo.update(&record).await.unwrap();

    let reread = fx
        .repo
        .get_or_create(fx.student_id, fx.chapter_id)
        .await
        .unwrap();
    assert!(reread.completed);
    assert_eq!(reread.completed_at, Some(fixed_now()));

    let completed = fx
        .repo
        .completed_chapter_ids(fx.student_id, &[fx.chapter_id])
        .await
        .unwrap();
    assert_eq!(completed, vec![fx.chapter_id]);
}

#[tokio::test]
async fn duplicate_student_slug_in_grade_conflicts() {
    let fx = seed("sqlite:file:memdb_student_slug?mode=memory&cache=shared").await;
    let student = fx.repo.get_student(fx.student_id).await.unwrap();

    let err = fx
        .repo
        .insert_student(NewStudentRecord {
            user_id: UserId::new(2),
            grade_id: student.grade_id(),
            first_name: "Amina".into(),
            last_name: "Other".into(),
            slug: "amina".into(),
            color: StudentColor::Pink,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn chapter_number_is_globally_unique() {
    let fx = seed("sqlite:file:memdb_chapter_number?mode=memory&cache=shared").await;

    let other_topic = fx
        .repo
        .insert_topic(NewTopicRecord {
            subject_id: fx.subject_id,
            name: "Algebra".into(),
            slug: "algebra".into(),
            description: None,
            thumbnail: "topics/algebra.png".into(),
            review: None,
        })
        .await
        .unwrap();

    let err = fx
        .repo
        .insert_chapter(NewChapterRecord {
            topic_id: other_topic,
            name: "Linear Equations".into(),
            number: 1,
            slug: "linear-equations".into(),
            description: None,
            thumbnail: "chapters/linear.png".into(),
            review: None,
            content: "ax + b = 0".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn next_and_prev_follow_chapter_numbers() {
    let fx = seed("sqlite:file:memdb_chapter_nav?mode=memory&cache=shared").await;

    for (name, number) in [("Composites", 3), ("Factors", 5)] {
        fx.repo
            .insert_chapter(NewChapterRecord {
                topic_id: fx.topic_id,
                name: name.into(),
                number,
                slug: lms_core::slug::slugify(name),
                description: None,
                thumbnail: format!("chapters/{number}.png"),
                review: None,
                content: "…".into(),
            })
            .await
            .unwrap();
    }

    let next = fx.repo.next_chapter(fx.topic_id, 1).await.unwrap().unwrap();
    assert_eq!(next.number(), 3);
    let prev = fx.repo.prev_chapter(fx.topic_id, 5).await.unwrap().unwrap();
    assert_eq!(prev.number(), 3);
    assert!(fx.repo.next_chapter(fx.topic_id, 5).await.unwrap().is_none());
    assert!(fx.repo.prev_chapter(fx.topic_id, 1).await.unwrap().is_none());
}

#[tokio::test]
async fn replace_responses_is_a_full_swap() {
    let fx = seed("sqlite:file:memdb_responses?mode=memory&cache=shared").await;
    let (quiz_id, correct) = seed_quiz(&fx).await;

    // first attempt answers both questions
    let entries: Vec<NewResponseRecord> = correct
        .iter()
        .map(|&(question_id, choice_id)| NewResponseRecord {
            question_id,
            choice_id,
        })
        .collect();
    fx.repo
        .replace_responses(fx.student_id, quiz_id, &entries)
        .await
        .unwrap();
    assert!(fx.repo.has_responses(fx.student_id, quiz_id).await.unwrap());

    // second attempt answers only the first question
    fx.repo
        .replace_responses(fx.student_id, quiz_id, &entries[..1])
        .await
        .unwrap();

    let stored = fx
        .repo
        .responses_for_quiz(fx.student_id, quiz_id)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].question_id, correct[0].0);
}

#[tokio::test]
async fn deleting_subject_cascades_to_responses() {
    let fx = seed("sqlite:file:memdb_cascade?mode=memory&cache=shared").await;
    let (quiz_id, correct) = seed_quiz(&fx).await;

    fx.repo
        .replace_responses(
            fx.student_id,
            quiz_id,
            &[NewResponseRecord {
                question_id: correct[0].0,
                choice_id: correct[0].1,
            }],
        )
        .await
        .unwrap();

    fx.repo.delete_subject(fx.subject_id).await.unwrap();

    assert!(matches!(
        fx.repo.get_chapter(fx.chapter_id).await,
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        fx.repo.get_quiz(quiz_id).await,
        Err(StorageError::NotFound)
    ));
    assert!(!fx.repo.has_responses(fx.student_id, quiz_id).await.unwrap());
}
