use std::sync::Arc;

use lms_core::model::{QuizDuration, StudentColor, UserId};
use lms_core::time::{fixed_clock, fixed_now};
use services::{
    CatalogService, CatalogServiceError, CompletionService, ProgressService,
};
use storage::repository::InMemoryRepository;
use storage::thumbnails::RecordingThumbnailStore;

struct Services {
    catalog: CatalogService,
    completions: CompletionService,
    progress: ProgressService,
    thumbnails: RecordingThumbnailStore,
}

fn build_services() -> Services {
    let repo = InMemoryRepository::new();
    let thumbnails = RecordingThumbnailStore::new();
    let completions = CompletionService::new(fixed_clock(), Arc::new(repo.clone()));
    let progress = ProgressService::new(
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    );
    let catalog = CatalogService::new(
        fixed_clock(),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(thumbnails.clone()),
        progress.clone(),
        completions.clone(),
    );
    Services {
        catalog,
        completions,
        progress,
        thumbnails,
    }
}

struct Campus {
    student: lms_core::model::Student,
    subject: lms_core::model::Subject,
    /// Topic "Numbers" with chapters 1 and 2.
    numbers: lms_core::model::Topic,
    /// Topic "Algebra" with chapters 3 and 4.
    algebra: lms_core::model::Topic,
    chapters: Vec<lms_core::model::Chapter>,
}

async fn seed_campus(svc: &Services) -> Campus {
    let grade = svc.catalog.create_grade("Grade 7", None).await.unwrap();
    let student = svc
        .catalog
        .create_student(
            UserId::new(1),
            grade.id(),
            "Amina",
            "Khalil",
            None,
            StudentColor::Green,
        )
        .await
        .unwrap();
    let subject = svc
        .catalog
        .create_subject(grade.id(), "Maths", None, None, "subjects/maths.png")
        .await
        .unwrap();
    let numbers = svc
        .catalog
        .create_topic(subject.id(), "Numbers", None, None, "topics/numbers.png", None)
        .await
        .unwrap();
    let algebra = svc
        .catalog
        .create_topic(subject.id(), "Algebra", None, None, "topics/algebra.png", None)
        .await
        .unwrap();

    let mut chapters = Vec::new();
    for (topic, name, number) in [
        (&numbers, "Primes", 1),
        (&numbers, "Composites", 2),
        (&algebra, "Variables", 3),
        (&algebra, "Equations", 4),
    ] {
        let chapter = svc
            .catalog
            .create_chapter(
                topic.id(),
                name,
                number,
                None,
                None,
                &format!("chapters/{number}.png"),
                None,
                "content",
            )
            .await
            .unwrap();
        chapters.push(chapter);
    }

    Campus {
        student,
        subject,
        numbers,
        algebra,
        chapters,
    }
}

#[tokio::test]
async fn zero_chapter_topic_reports_zero_percent() {
    let svc = build_services();
    let campus = seed_campus(&svc).await;
    let empty = svc
        .catalog
        .create_topic(campus.subject.id(), "Geometry", None, None, "topics/geo.png", None)
        .await
        .unwrap();

    let progress = svc
        .progress
        .topic_progress(campus.student.id(), empty.id())
        .await
        .unwrap();
    assert_eq!(progress.total_chapters, 0);
    assert_eq!(progress.completed_chapters, 0);
    assert_eq!(progress.percent, 0);
}

#[tokio::test]
async fn zero_topic_subject_reports_zero_percent() {
    let svc = build_services();
    let grade = svc.catalog.create_grade("Grade 8", None).await.unwrap();
    let student = svc
        .catalog
        .create_student(
            UserId::new(2),
            grade.id(),
            "Bilal",
            "Hassan",
            None,
            StudentColor::Purple,
        )
        .await
        .unwrap();
    let subject = svc
        .catalog
        .create_subject(grade.id(), "History", None, None, "subjects/history.png")
        .await
        .unwrap();

    let progress = svc
        .progress
        .subject_progress(student.id(), subject.id())
        .await
        .unwrap();
    assert_eq!(progress.total_topics, 0);
    assert_eq!(progress.percent, 0);
}

#[tokio::test]
async fn concurrent_first_visits_share_one_record() {
    let svc = build_services();
    let campus = seed_campus(&svc).await;
    let chapter_id = campus.chapters[0].id();

    let (a, b) = tokio::join!(
        svc.completions.get_or_create(campus.student.id(), chapter_id),
        svc.completions.get_or_create(campus.student.id(), chapter_id),
    );
    assert_eq!(a.unwrap().id, b.unwrap().id);
}

#[tokio::test]
async fn subject_percent_counts_only_fully_complete_topics() {
    let svc = build_services();
    let campus = seed_campus(&svc).await;
    let student_id = campus.student.id();

    // "Numbers" fully complete, "Algebra" half complete
    for chapter in &campus.chapters[..3] {
        svc.completions
            .set_completion(student_id, chapter.id(), true)
            .await
            .unwrap();
    }

    let numbers = svc
        .progress
        .topic_progress(student_id, campus.numbers.id())
        .await
        .unwrap();
    assert_eq!(numbers.percent, 100);
    let algebra = svc
        .progress
        .topic_progress(student_id, campus.algebra.id())
        .await
        .unwrap();
    assert_eq!(algebra.percent, 50);

    // one of two topics fully complete: 50, not the 75 a weighted average would give
    let subject = svc
        .progress
        .subject_progress(student_id, campus.subject.id())
        .await
        .unwrap();
    assert_eq!(subject.fully_completed_topics, 1);
    assert_eq!(subject.total_topics, 2);
    assert_eq!(subject.percent, 50);
}

#[tokio::test]
async fn one_of_three_chapters_rounds_to_33() {
    let svc = build_services();
    let campus = seed_campus(&svc).await;
    let student_id = campus.student.id();

    svc.catalog
        .create_chapter(
            campus.numbers.id(),
            "Factors",
            5,
            None,
            None,
            "chapters/5.png",
            None,
            "content",
        )
        .await
        .unwrap();

    svc.completions
        .set_completion(student_id, campus.chapters[0].id(), true)
        .await
        .unwrap();
    let progress = svc
        .progress
        .topic_progress(student_id, campus.numbers.id())
        .await
        .unwrap();
    assert_eq!(progress.total_chapters, 3);
    assert_eq!(progress.percent, 33);
}

#[tokio::test]
async fn dashboards_compose_the_hierarchy() {
    let svc = build_services();
    let campus = seed_campus(&svc).await;

    let user = svc.catalog.user_dashboard(UserId::new(1)).await.unwrap();
    assert_eq!(user.number_of_students, 1);
    assert_eq!(user.students[0].slug(), campus.student.slug());

    let dashboard = svc.catalog.student_dashboard("amina").await.unwrap();
    assert_eq!(dashboard.subjects.len(), 1);
    assert_eq!(dashboard.subjects[0].slug(), "maths");

    let subject = svc
        .catalog
        .subject_dashboard("amina", "maths")
        .await
        .unwrap();
    assert_eq!(subject.progress.total_topics, 2);
    assert_eq!(subject.progress.percent, 0);

    let topic = svc
        .catalog
        .topic_dashboard("amina", "maths", "numbers")
        .await
        .unwrap();
    assert_eq!(topic.chapters.len(), 2);
    // reading order follows the global chapter number
    assert_eq!(topic.chapters[0].number(), 1);
    assert_eq!(topic.chapters[1].number(), 2);
    assert!(topic.completed_chapter_ids.is_empty());
}

#[tokio::test]
async fn chapter_view_navigates_and_creates_the_completion_record() {
    let svc = build_services();
    let campus = seed_campus(&svc).await;
    svc.catalog
        .create_quiz(
            campus.chapters[0].id(),
            "Primes Checkpoint",
            None,
            true,
            QuizDuration::Min10,
        )
        .await
        .unwrap();

    let view = svc
        .catalog
        .chapter_view("amina", "maths", "numbers", "primes")
        .await
        .unwrap();

    assert_eq!(view.chapter.slug(), "primes");
    assert_eq!(view.next_chapter.as_ref().map(|c| c.number()), Some(2));
    assert!(view.prev_chapter.is_none());
    assert!(!view.completion.completed);
    assert_eq!(view.quizzes.len(), 1);
    assert_eq!(view.quizzes[0].duration().label(), "10 min");

    // the lazily created record is the one later toggles update
    let record = svc
        .catalog
        .set_chapter_completion("amina", "maths", "numbers", "primes", true)
        .await
        .unwrap();
    assert_eq!(record.id, view.completion.id);
    assert_eq!(record.completed_at, Some(fixed_now()));
}

#[tokio::test]
async fn broken_slug_chain_is_not_found() {
    let svc = build_services();
    let campus = seed_campus(&svc).await;

    // a second grade with its own student; "maths" belongs to grade 7 only
    let other_grade = svc.catalog.create_grade("Grade 8", None).await.unwrap();
    svc.catalog
        .create_student(
            UserId::new(2),
            other_grade.id(),
            "Bilal",
            "Hassan",
            None,
            StudentColor::Orange,
        )
        .await
        .unwrap();

    let err = svc
        .catalog
        .subject_dashboard("bilal", "maths")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogServiceError::Storage(storage::repository::StorageError::NotFound)
    ));

    // chapter slug under the wrong topic breaks too
    let err = svc
        .catalog
        .chapter_view("amina", "maths", "algebra", "primes")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogServiceError::Storage(storage::repository::StorageError::NotFound)
    ));
    // the chapter still resolves under its real topic
    let view = svc
        .catalog
        .chapter_view("amina", "maths", "numbers", campus.chapters[0].slug())
        .await
        .unwrap();
    assert_eq!(view.chapter.id(), campus.chapters[0].id());
}

#[tokio::test]
async fn one_user_teaches_at_most_one_grade() {
    let svc = build_services();
    let campus = seed_campus(&svc).await;
    let grade_id = campus.student.grade_id();

    let teacher = svc
        .catalog
        .create_teacher(UserId::new(9), grade_id)
        .await
        .unwrap();
    let listed = svc.catalog.teachers_for_grade(grade_id).await.unwrap();
    assert_eq!(listed, vec![teacher]);

    let err = svc
        .catalog
        .create_teacher(UserId::new(9), grade_id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogServiceError::Storage(storage::repository::StorageError::Conflict)
    ));
}

#[tokio::test]
async fn deleting_catalog_entities_removes_their_thumbnails() {
    let svc = build_services();
    let campus = seed_campus(&svc).await;

    svc.catalog
        .delete_chapter(campus.chapters[3].id())
        .await
        .unwrap();
    svc.catalog.delete_topic(campus.algebra.id()).await.unwrap();
    svc.catalog.delete_subject(campus.subject.id()).await.unwrap();

    assert_eq!(
        svc.thumbnails.removed(),
        vec![
            "chapters/4.png".to_owned(),
            "topics/algebra.png".to_owned(),
            "subjects/maths.png".to_owned(),
        ]
    );
}
