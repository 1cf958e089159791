use std::sync::Arc;

use lms_core::model::{
    Chapter, ChapterId, Choice, ChoiceId, CompletionRecord, Grade, GradeId, Question, QuestionId,
    Quiz, QuizDuration, QuizId, Student, StudentColor, StudentId, Subject, SubjectId, Teacher,
    Topic, TopicId, UserId,
};
use storage::repository::{
    ChapterRepository, GradeRepository, NewChapterRecord, NewChoiceRecord, NewGradeRecord,
    NewQuestionRecord, NewQuizRecord, NewStudentRecord, NewSubjectRecord, NewTeacherRecord,
    NewTopicRecord, QuizRepository, StudentRepository, SubjectRepository, TeacherRepository,
    TopicRepository,
};
use storage::thumbnails::ThumbnailStore;

use crate::Clock;
use crate::completion_service::CompletionService;
use crate::error::CatalogServiceError;
use crate::progress_service::{ProgressService, SubjectProgress, TopicProgress};

//
// ─── SCREEN PAYLOADS ───────────────────────────────────────────────────────────
//

/// The authenticated user's dashboard: every student they manage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDashboard {
    pub students: Vec<Student>,
    pub number_of_students: usize,
}

/// A student's dashboard: the subjects of their grade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentDashboard {
    pub student: Student,
    pub subjects: Vec<Subject>,
}

/// Subject dashboard with per-topic completion data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectDashboard {
    pub student: Student,
    pub subject: Subject,
    pub progress: SubjectProgress,
}

/// Topic dashboard with its chapters in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDashboard {
    pub student: Student,
    pub subject: Subject,
    pub chapters: Vec<Chapter>,
    pub completed_chapter_ids: Vec<ChapterId>,
    pub progress: TopicProgress,
}

/// Chapter screen: content plus navigation and the completion record,
/// which is created lazily on first visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterView {
    pub student: Student,
    pub subject: Subject,
    pub topic: Topic,
    pub chapter: Chapter,
    pub next_chapter: Option<Chapter>,
    pub prev_chapter: Option<Chapter>,
    pub completion: CompletionRecord,
    pub quizzes: Vec<Quiz>,
}

/// A fully resolved slug chain down to a chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterPath {
    pub student: Student,
    pub subject: Subject,
    pub topic: Topic,
    pub chapter: Chapter,
}

/// A fully resolved slug chain down to a quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizPath {
    pub student: Student,
    pub subject: Subject,
    pub topic: Topic,
    pub chapter: Chapter,
    pub quiz: Quiz,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Catalog resolution, per-screen reads, and admin maintenance.
///
/// Every slug hop is checked against its parent; a slug that exists under a
/// different parent is `NotFound`, never silently accepted.
#[derive(Clone)]
pub struct CatalogService {
    clock: Clock,
    grades: Arc<dyn GradeRepository>,
    students: Arc<dyn StudentRepository>,
    teachers: Arc<dyn TeacherRepository>,
    subjects: Arc<dyn SubjectRepository>,
    topics: Arc<dyn TopicRepository>,
    chapters: Arc<dyn ChapterRepository>,
    quizzes: Arc<dyn QuizRepository>,
    thumbnails: Arc<dyn ThumbnailStore>,
    progress: ProgressService,
    completions: CompletionService,
}

impl CatalogService {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clock: Clock,
        grades: Arc<dyn GradeRepository>,
        students: Arc<dyn StudentRepository>,
        teachers: Arc<dyn TeacherRepository>,
        subjects: Arc<dyn SubjectRepository>,
        topics: Arc<dyn TopicRepository>,
        chapters: Arc<dyn ChapterRepository>,
        quizzes: Arc<dyn QuizRepository>,
        thumbnails: Arc<dyn ThumbnailStore>,
        progress: ProgressService,
        completions: CompletionService,
    ) -> Self {
        Self {
            clock,
            grades,
            students,
            teachers,
            subjects,
            topics,
            chapters,
            quizzes,
            thumbnails,
            progress,
            completions,
        }
    }

    //
    // ── Resolution ────────────────────────────────────────────────────────
    //

    /// Resolve the slug chain down to a chapter.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) on any broken hop.
    pub async fn resolve_chapter(
        &self,
        student_slug: &str,
        subject_slug: &str,
        topic_slug: &str,
        chapter_slug: &str,
    ) -> Result<ChapterPath, CatalogServiceError> {
        let student = self.students.get_student_by_slug(student_slug).await?;
        let subject = self
            .subjects
            .get_subject_by_slug(student.grade_id(), subject_slug)
            .await?;
        let topic = self
            .topics
            .get_topic_by_slug(subject.id(), topic_slug)
            .await?;
        let chapter = self
            .chapters
            .get_chapter_by_slug(topic.id(), chapter_slug)
            .await?;
        Ok(ChapterPath {
            student,
            subject,
            topic,
            chapter,
        })
    }

    /// Resolve the slug chain down to a quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) on any broken hop.
    pub async fn resolve_quiz(
        &self,
        student_slug: &str,
        subject_slug: &str,
        topic_slug: &str,
        chapter_slug: &str,
        quiz_slug: &str,
    ) -> Result<QuizPath, CatalogServiceError> {
        let path = self
            .resolve_chapter(student_slug, subject_slug, topic_slug, chapter_slug)
            .await?;
        let quiz = self
            .quizzes
            .get_quiz_by_slug(path.chapter.id(), quiz_slug)
            .await?;
        Ok(QuizPath {
            student: path.student,
            subject: path.subject,
            topic: path.topic,
            chapter: path.chapter,
            quiz,
        })
    }

    //
    // ── Screens ───────────────────────────────────────────────────────────
    //

    /// Dashboard for an authenticated user.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` on repository failures.
    pub async fn user_dashboard(&self, user_id: UserId) -> Result<UserDashboard, CatalogServiceError> {
        let students = self.students.students_for_user(user_id).await?;
        let number_of_students = students.len();
        Ok(UserDashboard {
            students,
            number_of_students,
        })
    }

    /// Dashboard for one student: the subjects of their grade.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) for an unknown student.
    pub async fn student_dashboard(
        &self,
        student_slug: &str,
    ) -> Result<StudentDashboard, CatalogServiceError> {
        let student = self.students.get_student_by_slug(student_slug).await?;
        let subjects = self.subjects.subjects_for_grade(student.grade_id()).await?;
        Ok(StudentDashboard { student, subjects })
    }

    /// Subject dashboard with topic completion percentages.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) on a broken slug chain.
    pub async fn subject_dashboard(
        &self,
        student_slug: &str,
        subject_slug: &str,
    ) -> Result<SubjectDashboard, CatalogServiceError> {
        let student = self.students.get_student_by_slug(student_slug).await?;
        let subject = self
            .subjects
            .get_subject_by_slug(student.grade_id(), subject_slug)
            .await?;
        let progress = self
            .progress
            .subject_progress(student.id(), subject.id())
            .await?;
        Ok(SubjectDashboard {
            student,
            subject,
            progress,
        })
    }

    /// Topic dashboard with chapters in reading order and completion state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) on a broken slug chain.
    pub async fn topic_dashboard(
        &self,
        student_slug: &str,
        subject_slug: &str,
        topic_slug: &str,
    ) -> Result<TopicDashboard, CatalogServiceError> {
        let student = self.students.get_student_by_slug(student_slug).await?;
        let subject = self
            .subjects
            .get_subject_by_slug(student.grade_id(), subject_slug)
            .await?;
        let topic = self
            .topics
            .get_topic_by_slug(subject.id(), topic_slug)
            .await?;

        let chapters = self.chapters.chapters_for_topic(topic.id()).await?;
        let progress = self
            .progress
            .topic_progress(student.id(), topic.id())
            .await?;
        let chapter_ids: Vec<ChapterId> = chapters.iter().map(|c| c.id()).collect();
        let completed_chapter_ids = self
            .completed_ids(student.id(), &chapter_ids)
            .await?;

        Ok(TopicDashboard {
            student,
            subject,
            chapters,
            completed_chapter_ids,
            progress,
        })
    }

    /// Chapter screen with navigation, quizzes, and the lazily created
    /// completion record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) on a broken slug chain.
    pub async fn chapter_view(
        &self,
        student_slug: &str,
        subject_slug: &str,
        topic_slug: &str,
        chapter_slug: &str,
    ) -> Result<ChapterView, CatalogServiceError> {
        let path = self
            .resolve_chapter(student_slug, subject_slug, topic_slug, chapter_slug)
            .await?;

        let next_chapter = self
            .chapters
            .next_chapter(path.topic.id(), path.chapter.number())
            .await?;
        let prev_chapter = self
            .chapters
            .prev_chapter(path.topic.id(), path.chapter.number())
            .await?;
        let completion = self
            .completions
            .get_or_create(path.student.id(), path.chapter.id())
            .await?;
        let quizzes = self.quizzes.quizzes_for_chapter(path.chapter.id()).await?;

        Ok(ChapterView {
            student: path.student,
            subject: path.subject,
            topic: path.topic,
            chapter: path.chapter,
            next_chapter,
            prev_chapter,
            completion,
            quizzes,
        })
    }

    /// Completion toggle posted from the chapter screen.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) on a broken slug chain.
    pub async fn set_chapter_completion(
        &self,
        student_slug: &str,
        subject_slug: &str,
        topic_slug: &str,
        chapter_slug: &str,
        completed: bool,
    ) -> Result<CompletionRecord, CatalogServiceError> {
        let path = self
            .resolve_chapter(student_slug, subject_slug, topic_slug, chapter_slug)
            .await?;
        Ok(self
            .completions
            .set_completion(path.student.id(), path.chapter.id(), completed)
            .await?)
    }

    async fn completed_ids(
        &self,
        student_id: StudentId,
        chapter_ids: &[ChapterId],
    ) -> Result<Vec<ChapterId>, CatalogServiceError> {
        Ok(self
            .progress
            .completed_chapter_ids(student_id, chapter_ids)
            .await?)
    }

    //
    // ── Admin maintenance ─────────────────────────────────────────────────
    //

    /// Create a grade, deriving the slug when not given.
    ///
    /// # Errors
    ///
    /// Returns validation errors from the domain, or `StorageError::Conflict`
    /// for duplicate name/slug.
    pub async fn create_grade(
        &self,
        name: &str,
        slug: Option<String>,
    ) -> Result<Grade, CatalogServiceError> {
        let draft = Grade::new(GradeId::new(0), name, slug)?;
        let id = self
            .grades
            .insert_grade(NewGradeRecord {
                name: draft.name().to_owned(),
                slug: draft.slug().to_owned(),
            })
            .await?;
        Ok(Grade::new(id, draft.name(), Some(draft.slug().to_owned()))?)
    }

    /// Create a student in a grade, deriving the slug from the first name.
    ///
    /// # Errors
    ///
    /// Returns validation errors from the domain, or `StorageError::Conflict`
    /// for a duplicate slug within the grade.
    pub async fn create_student(
        &self,
        user_id: UserId,
        grade_id: GradeId,
        first_name: &str,
        last_name: &str,
        slug: Option<String>,
        color: StudentColor,
    ) -> Result<Student, CatalogServiceError> {
        let draft = Student::new(
            StudentId::new(0),
            user_id,
            first_name,
            last_name,
            grade_id,
            slug,
            color,
        )?;
        let id = self
            .students
            .insert_student(NewStudentRecord {
                user_id,
                grade_id,
                first_name: draft.first_name().to_owned(),
                last_name: draft.last_name().to_owned(),
                slug: draft.slug().to_owned(),
                color,
            })
            .await?;
        Ok(Student::new(
            id,
            user_id,
            draft.first_name(),
            draft.last_name(),
            grade_id,
            Some(draft.slug().to_owned()),
            color,
        )?)
    }

    /// Link a user identity as a teacher of a grade.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` (wrapped) when the user already
    /// teaches a grade.
    pub async fn create_teacher(
        &self,
        user_id: UserId,
        grade_id: GradeId,
    ) -> Result<Teacher, CatalogServiceError> {
        let id = self
            .teachers
            .insert_teacher(NewTeacherRecord { user_id, grade_id })
            .await?;
        Ok(Teacher {
            id,
            user_id,
            grade_id,
        })
    }

    /// Teachers assigned to a grade.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` on repository failures.
    pub async fn teachers_for_grade(
        &self,
        grade_id: GradeId,
    ) -> Result<Vec<Teacher>, CatalogServiceError> {
        Ok(self.teachers.teachers_for_grade(grade_id).await?)
    }

    /// Create a subject in a grade.
    ///
    /// # Errors
    ///
    /// Returns validation errors from the domain, or `StorageError::Conflict`
    /// for a duplicate slug within the grade.
    pub async fn create_subject(
        &self,
        grade_id: GradeId,
        name: &str,
        slug: Option<String>,
        description: Option<String>,
        thumbnail: &str,
    ) -> Result<Subject, CatalogServiceError> {
        let draft = Subject::new(
            SubjectId::new(0),
            grade_id,
            name,
            slug,
            description,
            thumbnail,
        )?;
        let id = self
            .subjects
            .insert_subject(NewSubjectRecord {
                grade_id,
                name: draft.name().to_owned(),
                slug: draft.slug().to_owned(),
                description: draft.description().map(ToOwned::to_owned),
                thumbnail: draft.thumbnail().to_owned(),
            })
            .await?;
        Ok(self.subjects.get_subject(id).await?)
    }

    /// Create a topic in a subject.
    ///
    /// # Errors
    ///
    /// Returns validation errors from the domain, or `StorageError::Conflict`
    /// for a duplicate slug within the subject.
    pub async fn create_topic(
        &self,
        subject_id: SubjectId,
        name: &str,
        slug: Option<String>,
        description: Option<String>,
        thumbnail: &str,
        review: Option<String>,
    ) -> Result<Topic, CatalogServiceError> {
        let draft = Topic::new(
            TopicId::new(0),
            subject_id,
            name,
            slug,
            description,
            thumbnail,
            review,
        )?;
        let id = self
            .topics
            .insert_topic(NewTopicRecord {
                subject_id,
                name: draft.name().to_owned(),
                slug: draft.slug().to_owned(),
                description: draft.description().map(ToOwned::to_owned),
                thumbnail: draft.thumbnail().to_owned(),
                review: draft.review().map(ToOwned::to_owned),
            })
            .await?;
        Ok(self.topics.get_topic(id).await?)
    }

    /// Create a chapter in a topic. The chapter number must be globally
    /// unique.
    ///
    /// # Errors
    ///
    /// Returns validation errors from the domain, or `StorageError::Conflict`
    /// for a duplicate number or per-topic slug.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_chapter(
        &self,
        topic_id: TopicId,
        name: &str,
        number: i64,
        slug: Option<String>,
        description: Option<String>,
        thumbnail: &str,
        review: Option<String>,
        content: &str,
    ) -> Result<Chapter, CatalogServiceError> {
        let draft = Chapter::new(
            ChapterId::new(0),
            topic_id,
            name,
            number,
            slug,
            description,
            thumbnail,
            review,
            content,
        )?;
        let id = self
            .chapters
            .insert_chapter(NewChapterRecord {
                topic_id,
                name: draft.name().to_owned(),
                number: draft.number(),
                slug: draft.slug().to_owned(),
                description: draft.description().map(ToOwned::to_owned),
                thumbnail: draft.thumbnail().to_owned(),
                review: draft.review().map(ToOwned::to_owned),
                content: draft.content().to_owned(),
            })
            .await?;
        Ok(self.chapters.get_chapter(id).await?)
    }

    /// Create a quiz on a chapter; the creation timestamp comes from the
    /// service clock and is immutable afterwards.
    ///
    /// # Errors
    ///
    /// Returns validation errors from the domain, or `StorageError::Conflict`
    /// for a duplicate slug within the chapter.
    pub async fn create_quiz(
        &self,
        chapter_id: ChapterId,
        title: &str,
        slug: Option<String>,
        publish: bool,
        duration: QuizDuration,
    ) -> Result<Quiz, CatalogServiceError> {
        let created_at = self.clock.now();
        let draft = Quiz::new(
            QuizId::new(0),
            chapter_id,
            title,
            slug,
            publish,
            duration,
            created_at,
        )?;
        let id = self
            .quizzes
            .insert_quiz(NewQuizRecord {
                chapter_id,
                title: draft.title().to_owned(),
                slug: draft.slug().to_owned(),
                publish,
                duration,
                created_at,
            })
            .await?;
        Ok(self.quizzes.get_quiz(id).await?)
    }

    /// Add a question to a quiz.
    ///
    /// # Errors
    ///
    /// Returns validation errors from the domain or storage failures.
    pub async fn add_question(
        &self,
        quiz_id: QuizId,
        text: &str,
    ) -> Result<Question, CatalogServiceError> {
        let draft = Question::new(QuestionId::new(0), quiz_id, text)?;
        let id = self
            .quizzes
            .insert_question(NewQuestionRecord {
                quiz_id,
                text: draft.text().to_owned(),
            })
            .await?;
        Ok(Question::new(id, quiz_id, draft.text())?)
    }

    /// Add a choice to a question.
    ///
    /// # Errors
    ///
    /// Returns validation errors from the domain or storage failures.
    pub async fn add_choice(
        &self,
        question_id: QuestionId,
        text: &str,
        is_correct: bool,
        explanation: Option<String>,
        mark: i32,
    ) -> Result<Choice, CatalogServiceError> {
        let draft = Choice::new(
            ChoiceId::new(0),
            question_id,
            text,
            is_correct,
            explanation,
            mark,
        )?;
        let id = self
            .quizzes
            .insert_choice(NewChoiceRecord {
                question_id,
                text: draft.text().to_owned(),
                is_correct,
                explanation: draft.explanation().map(ToOwned::to_owned),
                mark,
            })
            .await?;
        Ok(self.quizzes.get_choice(id).await?)
    }

    /// Delete a subject; its thumbnail is removed from the blob store after
    /// the rows are gone.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) if missing, or blob-store
    /// failures.
    pub async fn delete_subject(&self, id: SubjectId) -> Result<(), CatalogServiceError> {
        let subject = self.subjects.get_subject(id).await?;
        self.subjects.delete_subject(id).await?;
        self.thumbnails.remove(subject.thumbnail())?;
        Ok(())
    }

    /// Delete a topic, removing its thumbnail from the blob store.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) if missing, or blob-store
    /// failures.
    pub async fn delete_topic(&self, id: TopicId) -> Result<(), CatalogServiceError> {
        let topic = self.topics.get_topic(id).await?;
        self.topics.delete_topic(id).await?;
        self.thumbnails.remove(topic.thumbnail())?;
        Ok(())
    }

    /// Delete a chapter, removing its thumbnail from the blob store.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) if missing, or blob-store
    /// failures.
    pub async fn delete_chapter(&self, id: ChapterId) -> Result<(), CatalogServiceError> {
        let chapter = self.chapters.get_chapter(id).await?;
        self.chapters.delete_chapter(id).await?;
        self.thumbnails.remove(chapter.thumbnail())?;
        Ok(())
    }
}
