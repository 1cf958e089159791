use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use lms_core::model::{
    Chapter, ChapterId, Choice, ChoiceId, CompletionRecord, Grade, GradeId, Question, QuestionId,
    Quiz, QuizDuration, QuizId, Quote, Student, StudentColor, StudentId, StudentResponse, Subject,
    SubjectId, Teacher, TeacherId, Topic, TopicId, UserId,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── INSERT RECORDS ────────────────────────────────────────────────────────────
//

/// Field sets for rows whose identifiers the store assigns.
///
/// Values are expected to be validated and slug-derived already (the
/// services layer runs them through the domain constructors first).
#[derive(Debug, Clone)]
pub struct NewGradeRecord {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone)]
pub struct NewStudentRecord {
    pub user_id: UserId,
    pub grade_id: GradeId,
    pub first_name: String,
    pub last_name: String,
    pub slug: String,
    pub color: StudentColor,
}

#[derive(Debug, Clone, Copy)]
pub struct NewTeacherRecord {
    pub user_id: UserId,
    pub grade_id: GradeId,
}

#[derive(Debug, Clone)]
pub struct NewSubjectRecord {
    pub grade_id: GradeId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub thumbnail: String,
}

#[derive(Debug, Clone)]
pub struct NewTopicRecord {
    pub subject_id: SubjectId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub thumbnail: String,
    pub review: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewChapterRecord {
    pub topic_id: TopicId,
    pub name: String,
    pub number: i64,
    pub slug: String,
    pub description: Option<String>,
    pub thumbnail: String,
    pub review: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct NewQuizRecord {
    pub chapter_id: ChapterId,
    pub title: String,
    pub slug: String,
    pub publish: bool,
    pub duration: QuizDuration,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewQuestionRecord {
    pub quiz_id: QuizId,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct NewChoiceRecord {
    pub question_id: QuestionId,
    pub text: String,
    pub is_correct: bool,
    pub explanation: Option<String>,
    pub mark: i32,
}

/// One (question, choice) pair of a quiz submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewResponseRecord {
    pub question_id: QuestionId,
    pub choice_id: ChoiceId,
}

#[derive(Debug, Clone)]
pub struct NewQuoteRecord {
    pub quote: String,
    pub author: Option<String>,
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

#[async_trait]
pub trait GradeRepository: Send + Sync {
    /// Insert a grade and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the name or slug is taken.
    async fn insert_grade(&self, grade: NewGradeRecord) -> Result<GradeId, StorageError>;

    /// Fetch a grade by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_grade(&self, id: GradeId) -> Result<Grade, StorageError>;

    /// Fetch a grade by slug.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_grade_by_slug(&self, slug: &str) -> Result<Grade, StorageError>;

    /// List all grades.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_grades(&self) -> Result<Vec<Grade>, StorageError>;
}

#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Insert a student and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the slug is taken within the grade.
    async fn insert_student(&self, student: NewStudentRecord) -> Result<StudentId, StorageError>;

    /// Fetch a student by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_student(&self, id: StudentId) -> Result<Student, StorageError>;

    /// Fetch a student by slug.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_student_by_slug(&self, slug: &str) -> Result<Student, StorageError>;

    /// All students managed by the given user identity.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn students_for_user(&self, user_id: UserId) -> Result<Vec<Student>, StorageError>;
}

#[async_trait]
pub trait TeacherRepository: Send + Sync {
    /// Insert a teacher and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the user already teaches a grade.
    async fn insert_teacher(&self, teacher: NewTeacherRecord) -> Result<TeacherId, StorageError>;

    /// Teachers of a grade.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn teachers_for_grade(&self, grade_id: GradeId) -> Result<Vec<Teacher>, StorageError>;
}

#[async_trait]
pub trait SubjectRepository: Send + Sync {
    /// Insert a subject and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the slug is taken within the grade.
    async fn insert_subject(&self, subject: NewSubjectRecord) -> Result<SubjectId, StorageError>;

    /// Fetch a subject by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_subject(&self, id: SubjectId) -> Result<Subject, StorageError>;

    /// Fetch a subject by slug, scoped to a grade.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing or owned by another grade.
    async fn get_subject_by_slug(
        &self,
        grade_id: GradeId,
        slug: &str,
    ) -> Result<Subject, StorageError>;

    /// Subjects of a grade.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn subjects_for_grade(&self, grade_id: GradeId) -> Result<Vec<Subject>, StorageError>;

    /// Delete a subject and everything beneath it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn delete_subject(&self, id: SubjectId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait TopicRepository: Send + Sync {
    /// Insert a topic and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the slug is taken within the subject.
    async fn insert_topic(&self, topic: NewTopicRecord) -> Result<TopicId, StorageError>;

    /// Fetch a topic by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_topic(&self, id: TopicId) -> Result<Topic, StorageError>;

    /// Fetch a topic by slug, scoped to a subject.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing or owned by another subject.
    async fn get_topic_by_slug(
        &self,
        subject_id: SubjectId,
        slug: &str,
    ) -> Result<Topic, StorageError>;

    /// Topics of a subject.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn topics_for_subject(&self, subject_id: SubjectId) -> Result<Vec<Topic>, StorageError>;

    /// Delete a topic and everything beneath it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn delete_topic(&self, id: TopicId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ChapterRepository: Send + Sync {
    /// Insert a chapter and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the global chapter number or
    /// the per-topic slug is taken.
    async fn insert_chapter(&self, chapter: NewChapterRecord) -> Result<ChapterId, StorageError>;

    /// Fetch a chapter by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_chapter(&self, id: ChapterId) -> Result<Chapter, StorageError>;

    /// Fetch a chapter by slug, scoped to a topic.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing or owned by another topic.
    async fn get_chapter_by_slug(
        &self,
        topic_id: TopicId,
        slug: &str,
    ) -> Result<Chapter, StorageError>;

    /// Chapters of a topic, ordered by chapter number.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn chapters_for_topic(&self, topic_id: TopicId) -> Result<Vec<Chapter>, StorageError>;

    /// The chapter following `number` within the topic, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn next_chapter(
        &self,
        topic_id: TopicId,
        number: i64,
    ) -> Result<Option<Chapter>, StorageError>;

    /// The chapter preceding `number` within the topic, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn prev_chapter(
        &self,
        topic_id: TopicId,
        number: i64,
    ) -> Result<Option<Chapter>, StorageError>;

    /// Delete a chapter and everything beneath it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn delete_chapter(&self, id: ChapterId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Insert a quiz and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the slug is taken within the chapter.
    async fn insert_quiz(&self, quiz: NewQuizRecord) -> Result<QuizId, StorageError>;

    /// Insert a question and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn insert_question(&self, question: NewQuestionRecord)
    -> Result<QuestionId, StorageError>;

    /// Insert a choice and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn insert_choice(&self, choice: NewChoiceRecord) -> Result<ChoiceId, StorageError>;

    /// Fetch a quiz by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError>;

    /// Fetch a quiz by slug, scoped to a chapter.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing or owned by another chapter.
    async fn get_quiz_by_slug(
        &self,
        chapter_id: ChapterId,
        slug: &str,
    ) -> Result<Quiz, StorageError>;

    /// Quizzes attached to a chapter.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn quizzes_for_chapter(&self, chapter_id: ChapterId) -> Result<Vec<Quiz>, StorageError>;

    /// Questions of a quiz, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn questions_for_quiz(&self, quiz_id: QuizId) -> Result<Vec<Question>, StorageError>;

    /// Choices of a question, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn choices_for_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Vec<Choice>, StorageError>;

    /// Fetch a choice by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_choice(&self, id: ChoiceId) -> Result<Choice, StorageError>;
}

#[async_trait]
pub trait CompletionRepository: Send + Sync {
    /// Look up the unique (student, chapter) record, creating it with
    /// `completed = false` when absent.
    ///
    /// Must be atomic: two concurrent first visits yield exactly one row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_or_create(
        &self,
        student_id: StudentId,
        chapter_id: ChapterId,
    ) -> Result<CompletionRecord, StorageError>;

    /// Persist the mutable fields of a completion record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the record no longer exists.
    async fn update(&self, record: &CompletionRecord) -> Result<(), StorageError>;

    /// Of the given chapters, the ones this student has completed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn completed_chapter_ids(
        &self,
        student_id: StudentId,
        chapter_ids: &[ChapterId],
    ) -> Result<Vec<ChapterId>, StorageError>;
}

#[async_trait]
pub trait ResponseRepository: Send + Sync {
    /// Replace the stored attempt for (student, quiz): delete every prior
    /// response row and insert the given ones in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn replace_responses(
        &self,
        student_id: StudentId,
        quiz_id: QuizId,
        entries: &[NewResponseRecord],
    ) -> Result<Vec<StudentResponse>, StorageError>;

    /// The stored responses of the latest attempt for (student, quiz).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn responses_for_quiz(
        &self,
        student_id: StudentId,
        quiz_id: QuizId,
    ) -> Result<Vec<StudentResponse>, StorageError>;

    /// Whether the student has submitted this quiz at least once.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn has_responses(
        &self,
        student_id: StudentId,
        quiz_id: QuizId,
    ) -> Result<bool, StorageError>;
}

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    /// Insert a quote and return its row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn insert_quote(&self, quote: NewQuoteRecord) -> Result<i64, StorageError>;

    /// All stored quotes.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_quotes(&self) -> Result<Vec<Quote>, StorageError>;
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

#[derive(Default)]
struct MemState {
    grades: Vec<Grade>,
    students: Vec<Student>,
    teachers: Vec<Teacher>,
    subjects: Vec<Subject>,
    topics: Vec<Topic>,
    chapters: Vec<Chapter>,
    quizzes: Vec<Quiz>,
    questions: Vec<Question>,
    choices: Vec<Choice>,
    completions: Vec<CompletionRecord>,
    responses: Vec<StudentResponse>,
    quotes: Vec<Quote>,
    next_entity_id: u64,
    next_row_id: i64,
}

impl MemState {
    fn next_entity_id(&mut self) -> u64 {
        self.next_entity_id += 1;
        self.next_entity_id
    }

    fn next_row_id(&mut self) -> i64 {
        self.next_row_id += 1;
        self.next_row_id
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// A single mutex guards the whole state, which keeps the get-or-create and
/// replace-responses paths trivially atomic.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    fn ser(e: impl core::fmt::Display) -> StorageError {
        StorageError::Serialization(e.to_string())
    }
}

#[async_trait]
impl GradeRepository for InMemoryRepository {
    async fn insert_grade(&self, grade: NewGradeRecord) -> Result<GradeId, StorageError> {
        let mut state = self.lock()?;
        if state
            .grades
            .iter()
            .any(|g| g.name() == grade.name || g.slug() == grade.slug)
        {
            return Err(StorageError::Conflict);
        }
        let id = GradeId::new(state.next_entity_id());
        let grade = Grade::new(id, grade.name, Some(grade.slug)).map_err(Self::ser)?;
        state.grades.push(grade);
        Ok(id)
    }

    async fn get_grade(&self, id: GradeId) -> Result<Grade, StorageError> {
        let state = self.lock()?;
        state
            .grades
            .iter()
            .find(|g| g.id() == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn get_grade_by_slug(&self, slug: &str) -> Result<Grade, StorageError> {
        let state = self.lock()?;
        state
            .grades
            .iter()
            .find(|g| g.slug() == slug)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_grades(&self) -> Result<Vec<Grade>, StorageError> {
        Ok(self.lock()?.grades.clone())
    }
}

#[async_trait]
impl StudentRepository for InMemoryRepository {
    async fn insert_student(&self, student: NewStudentRecord) -> Result<StudentId, StorageError> {
        let mut state = self.lock()?;
        if state
            .students
            .iter()
            .any(|s| s.grade_id() == student.grade_id && s.slug() == student.slug)
        {
            return Err(StorageError::Conflict);
        }
        let id = StudentId::new(state.next_entity_id());
        let student = Student::new(
            id,
            student.user_id,
            student.first_name,
            student.last_name,
            student.grade_id,
            Some(student.slug),
            student.color,
        )
        .map_err(Self::ser)?;
        state.students.push(student);
        Ok(id)
    }

    async fn get_student(&self, id: StudentId) -> Result<Student, StorageError> {
        let state = self.lock()?;
        state
            .students
            .iter()
            .find(|s| s.id() == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn get_student_by_slug(&self, slug: &str) -> Result<Student, StorageError> {
        let state = self.lock()?;
        state
            .students
            .iter()
            .find(|s| s.slug() == slug)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn students_for_user(&self, user_id: UserId) -> Result<Vec<Student>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .students
            .iter()
            .filter(|s| s.user_id() == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TeacherRepository for InMemoryRepository {
    async fn insert_teacher(&self, teacher: NewTeacherRecord) -> Result<TeacherId, StorageError> {
        let mut state = self.lock()?;
        if state.teachers.iter().any(|t| t.user_id == teacher.user_id) {
            return Err(StorageError::Conflict);
        }
        let id = TeacherId::new(state.next_entity_id());
        state.teachers.push(Teacher {
            id,
            user_id: teacher.user_id,
            grade_id: teacher.grade_id,
        });
        Ok(id)
    }

    async fn teachers_for_grade(&self, grade_id: GradeId) -> Result<Vec<Teacher>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .teachers
            .iter()
            .filter(|t| t.grade_id == grade_id)
            .copied()
            .collect())
    }
}

#[async_trait]
impl SubjectRepository for InMemoryRepository {
    async fn insert_subject(&self, subject: NewSubjectRecord) -> Result<SubjectId, StorageError> {
        let mut state = self.lock()?;
        if state
            .subjects
            .iter()
            .any(|s| s.grade_id() == subject.grade_id && s.slug() == subject.slug)
        {
            return Err(StorageError::Conflict);
        }
        let id = SubjectId::new(state.next_entity_id());
        let subject = Subject::new(
            id,
            subject.grade_id,
            subject.name,
            Some(subject.slug),
            subject.description,
            subject.thumbnail,
        )
        .map_err(Self::ser)?;
        state.subjects.push(subject);
        Ok(id)
    }

    async fn get_subject(&self, id: SubjectId) -> Result<Subject, StorageError> {
        let state = self.lock()?;
        state
            .subjects
            .iter()
            .find(|s| s.id() == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn get_subject_by_slug(
        &self,
        grade_id: GradeId,
        slug: &str,
    ) -> Result<Subject, StorageError> {
        let state = self.lock()?;
        state
            .subjects
            .iter()
            .find(|s| s.grade_id() == grade_id && s.slug() == slug)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn subjects_for_grade(&self, grade_id: GradeId) -> Result<Vec<Subject>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .subjects
            .iter()
            .filter(|s| s.grade_id() == grade_id)
            .cloned()
            .collect())
    }

    async fn delete_subject(&self, id: SubjectId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let before = state.subjects.len();
        state.subjects.retain(|s| s.id() != id);
        if state.subjects.len() == before {
            return Err(StorageError::NotFound);
        }
        // cascade, mirroring the SQL foreign keys
        let topic_ids: Vec<TopicId> = state
            .topics
            .iter()
            .filter(|t| t.subject_id() == id)
            .map(Topic::id)
            .collect();
        state.topics.retain(|t| t.subject_id() != id);
        for topic_id in topic_ids {
            cascade_topic(&mut state, topic_id);
        }
        Ok(())
    }
}

#[async_trait]
impl TopicRepository for InMemoryRepository {
    async fn insert_topic(&self, topic: NewTopicRecord) -> Result<TopicId, StorageError> {
        let mut state = self.lock()?;
        if state
            .topics
            .iter()
            .any(|t| t.subject_id() == topic.subject_id && t.slug() == topic.slug)
        {
            return Err(StorageError::Conflict);
        }
        let id = TopicId::new(state.next_entity_id());
        let topic = Topic::new(
            id,
            topic.subject_id,
            topic.name,
            Some(topic.slug),
            topic.description,
            topic.thumbnail,
            topic.review,
        )
        .map_err(Self::ser)?;
        state.topics.push(topic);
        Ok(id)
    }

    async fn get_topic(&self, id: TopicId) -> Result<Topic, StorageError> {
        let state = self.lock()?;
        state
            .topics
            .iter()
            .find(|t| t.id() == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn get_topic_by_slug(
        &self,
        subject_id: SubjectId,
        slug: &str,
    ) -> Result<Topic, StorageError> {
        let state = self.lock()?;
        state
            .topics
            .iter()
            .find(|t| t.subject_id() == subject_id && t.slug() == slug)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn topics_for_subject(&self, subject_id: SubjectId) -> Result<Vec<Topic>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .topics
            .iter()
            .filter(|t| t.subject_id() == subject_id)
            .cloned()
            .collect())
    }

    async fn delete_topic(&self, id: TopicId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let before = state.topics.len();
        state.topics.retain(|t| t.id() != id);
        if state.topics.len() == before {
            return Err(StorageError::NotFound);
        }
        cascade_topic(&mut state, id);
        Ok(())
    }
}

#[async_trait]
impl ChapterRepository for InMemoryRepository {
    async fn insert_chapter(&self, chapter: NewChapterRecord) -> Result<ChapterId, StorageError> {
        let mut state = self.lock()?;
        let slug_taken = state
            .chapters
            .iter()
            .any(|c| c.topic_id() == chapter.topic_id && c.slug() == chapter.slug);
        let number_taken = state.chapters.iter().any(|c| c.number() == chapter.number);
        if slug_taken || number_taken {
            return Err(StorageError::Conflict);
        }
        let id = ChapterId::new(state.next_entity_id());
        let chapter = Chapter::new(
            id,
            chapter.topic_id,
            chapter.name,
            chapter.number,
            Some(chapter.slug),
            chapter.description,
            chapter.thumbnail,
            chapter.review,
            chapter.content,
        )
        .map_err(Self::ser)?;
        state.chapters.push(chapter);
        Ok(id)
    }

    async fn get_chapter(&self, id: ChapterId) -> Result<Chapter, StorageError> {
        let state = self.lock()?;
        state
            .chapters
            .iter()
            .find(|c| c.id() == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn get_chapter_by_slug(
        &self,
        topic_id: TopicId,
        slug: &str,
    ) -> Result<Chapter, StorageError> {
        let state = self.lock()?;
        state
            .chapters
            .iter()
            .find(|c| c.topic_id() == topic_id && c.slug() == slug)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn chapters_for_topic(&self, topic_id: TopicId) -> Result<Vec<Chapter>, StorageError> {
        let state = self.lock()?;
        let mut chapters: Vec<Chapter> = state
            .chapters
            .iter()
            .filter(|c| c.topic_id() == topic_id)
            .cloned()
            .collect();
        chapters.sort_by_key(Chapter::number);
        Ok(chapters)
    }

    async fn next_chapter(
        &self,
        topic_id: TopicId,
        number: i64,
    ) -> Result<Option<Chapter>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .chapters
            .iter()
            .filter(|c| c.topic_id() == topic_id && c.number() > number)
            .min_by_key(|c| c.number())
            .cloned())
    }

    async fn prev_chapter(
        &self,
        topic_id: TopicId,
        number: i64,
    ) -> Result<Option<Chapter>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .chapters
            .iter()
            .filter(|c| c.topic_id() == topic_id && c.number() < number)
            .max_by_key(|c| c.number())
            .cloned())
    }

    async fn delete_chapter(&self, id: ChapterId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let before = state.chapters.len();
        state.chapters.retain(|c| c.id() != id);
        if state.chapters.len() == before {
            return Err(StorageError::NotFound);
        }
        cascade_chapter(&mut state, id);
        Ok(())
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn insert_quiz(&self, quiz: NewQuizRecord) -> Result<QuizId, StorageError> {
        let mut state = self.lock()?;
        if state
            .quizzes
            .iter()
            .any(|q| q.chapter_id() == quiz.chapter_id && q.slug() == quiz.slug)
        {
            return Err(StorageError::Conflict);
        }
        let id = QuizId::new(state.next_entity_id());
        let quiz = Quiz::new(
            id,
            quiz.chapter_id,
            quiz.title,
            Some(quiz.slug),
            quiz.publish,
            quiz.duration,
            quiz.created_at,
        )
        .map_err(Self::ser)?;
        state.quizzes.push(quiz);
        Ok(id)
    }

    async fn insert_question(
        &self,
        question: NewQuestionRecord,
    ) -> Result<QuestionId, StorageError> {
        let mut state = self.lock()?;
        let id = QuestionId::new(state.next_entity_id());
        let question = Question::new(id, question.quiz_id, question.text).map_err(Self::ser)?;
        state.questions.push(question);
        Ok(id)
    }

    async fn insert_choice(&self, choice: NewChoiceRecord) -> Result<ChoiceId, StorageError> {
        let mut state = self.lock()?;
        let id = ChoiceId::new(state.next_entity_id());
        let choice = Choice::new(
            id,
            choice.question_id,
            choice.text,
            choice.is_correct,
            choice.explanation,
            choice.mark,
        )
        .map_err(Self::ser)?;
        state.choices.push(choice);
        Ok(id)
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError> {
        let state = self.lock()?;
        state
            .quizzes
            .iter()
            .find(|q| q.id() == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn get_quiz_by_slug(
        &self,
        chapter_id: ChapterId,
        slug: &str,
    ) -> Result<Quiz, StorageError> {
        let state = self.lock()?;
        state
            .quizzes
            .iter()
            .find(|q| q.chapter_id() == chapter_id && q.slug() == slug)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn quizzes_for_chapter(&self, chapter_id: ChapterId) -> Result<Vec<Quiz>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .quizzes
            .iter()
            .filter(|q| q.chapter_id() == chapter_id)
            .cloned()
            .collect())
    }

    async fn questions_for_quiz(&self, quiz_id: QuizId) -> Result<Vec<Question>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .questions
            .iter()
            .filter(|q| q.quiz_id() == quiz_id)
            .cloned()
            .collect())
    }

    async fn choices_for_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Vec<Choice>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .choices
            .iter()
            .filter(|c| c.question_id() == question_id)
            .cloned()
            .collect())
    }

    async fn get_choice(&self, id: ChoiceId) -> Result<Choice, StorageError> {
        let state = self.lock()?;
        state
            .choices
            .iter()
            .find(|c| c.id() == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl CompletionRepository for InMemoryRepository {
    async fn get_or_create(
        &self,
        student_id: StudentId,
        chapter_id: ChapterId,
    ) -> Result<CompletionRecord, StorageError> {
        // single lock covers lookup and insert, so the pair stays unique
        let mut state = self.lock()?;
        if let Some(existing) = state
            .completions
            .iter()
            .find(|c| c.student_id == student_id && c.chapter_id == chapter_id)
        {
            return Ok(existing.clone());
        }
        let record = CompletionRecord {
            id: state.next_row_id(),
            student_id,
            chapter_id,
            completed: false,
            completed_at: None,
        };
        state.completions.push(record.clone());
        Ok(record)
    }

    async fn update(&self, record: &CompletionRecord) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let slot = state
            .completions
            .iter_mut()
            .find(|c| c.id == record.id)
            .ok_or(StorageError::NotFound)?;
        *slot = record.clone();
        Ok(())
    }

    async fn completed_chapter_ids(
        &self,
        student_id: StudentId,
        chapter_ids: &[ChapterId],
    ) -> Result<Vec<ChapterId>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .completions
            .iter()
            .filter(|c| {
                c.student_id == student_id && c.completed && chapter_ids.contains(&c.chapter_id)
            })
            .map(|c| c.chapter_id)
            .collect())
    }
}

#[async_trait]
impl ResponseRepository for InMemoryRepository {
    async fn replace_responses(
        &self,
        student_id: StudentId,
        quiz_id: QuizId,
        entries: &[NewResponseRecord],
    ) -> Result<Vec<StudentResponse>, StorageError> {
        // one lock makes the delete+insert pair atomic
        let mut state = self.lock()?;
        state
            .responses
            .retain(|r| !(r.student_id == student_id && r.quiz_id == quiz_id));
        let mut inserted = Vec::with_capacity(entries.len());
        for entry in entries {
            let response = StudentResponse {
                id: state.next_row_id(),
                student_id,
                quiz_id,
                question_id: entry.question_id,
                choice_id: entry.choice_id,
            };
            state.responses.push(response.clone());
            inserted.push(response);
        }
        Ok(inserted)
    }

    async fn responses_for_quiz(
        &self,
        student_id: StudentId,
        quiz_id: QuizId,
    ) -> Result<Vec<StudentResponse>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .responses
            .iter()
            .filter(|r| r.student_id == student_id && r.quiz_id == quiz_id)
            .cloned()
            .collect())
    }

    async fn has_responses(
        &self,
        student_id: StudentId,
        quiz_id: QuizId,
    ) -> Result<bool, StorageError> {
        let state = self.lock()?;
        Ok(state
            .responses
            .iter()
            .any(|r| r.student_id == student_id && r.quiz_id == quiz_id))
    }
}

#[async_trait]
impl QuoteRepository for InMemoryRepository {
    async fn insert_quote(&self, quote: NewQuoteRecord) -> Result<i64, StorageError> {
        let mut state = self.lock()?;
        let id = state.next_row_id();
        let quote = Quote::new(id, quote.quote, quote.author).map_err(Self::ser)?;
        state.quotes.push(quote);
        Ok(id)
    }

    async fn list_quotes(&self) -> Result<Vec<Quote>, StorageError> {
        Ok(self.lock()?.quotes.clone())
    }
}

fn cascade_topic(state: &mut MemState, topic_id: TopicId) {
    let chapter_ids: Vec<ChapterId> = state
        .chapters
        .iter()
        .filter(|c| c.topic_id() == topic_id)
        .map(Chapter::id)
        .collect();
    state.chapters.retain(|c| c.topic_id() != topic_id);
    for chapter_id in chapter_ids {
        cascade_chapter(state, chapter_id);
    }
}

fn cascade_chapter(state: &mut MemState, chapter_id: ChapterId) {
    let quiz_ids: Vec<QuizId> = state
        .quizzes
        .iter()
        .filter(|q| q.chapter_id() == chapter_id)
        .map(Quiz::id)
        .collect();
    state.quizzes.retain(|q| q.chapter_id() != chapter_id);
    state.completions.retain(|c| c.chapter_id != chapter_id);
    for quiz_id in quiz_ids {
        let question_ids: Vec<QuestionId> = state
            .questions
            .iter()
            .filter(|q| q.quiz_id() == quiz_id)
            .map(Question::id)
            .collect();
        state.questions.retain(|q| q.quiz_id() != quiz_id);
        state
            .choices
            .retain(|c| !question_ids.contains(&c.question_id()));
        state.responses.retain(|r| r.quiz_id != quiz_id);
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the per-entity repositories behind trait objects for easy
/// backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub grades: Arc<dyn GradeRepository>,
    pub students: Arc<dyn StudentRepository>,
    pub teachers: Arc<dyn TeacherRepository>,
    pub subjects: Arc<dyn SubjectRepository>,
    pub topics: Arc<dyn TopicRepository>,
    pub chapters: Arc<dyn ChapterRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub completions: Arc<dyn CompletionRepository>,
    pub responses: Arc<dyn ResponseRepository>,
    pub quotes: Arc<dyn QuoteRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_parts(InMemoryRepository::new())
    }

    pub(crate) fn from_parts<R>(repo: R) -> Self
    where
        R: GradeRepository
            + StudentRepository
            + TeacherRepository
            + SubjectRepository
            + TopicRepository
            + ChapterRepository
            + QuizRepository
            + CompletionRepository
            + ResponseRepository
            + QuoteRepository
            + Clone
            + 'static,
    {
        Self {
            grades: Arc::new(repo.clone()),
            students: Arc::new(repo.clone()),
            teachers: Arc::new(repo.clone()),
            subjects: Arc::new(repo.clone()),
            topics: Arc::new(repo.clone()),
            chapters: Arc::new(repo.clone()),
            quizzes: Arc::new(repo.clone()),
            completions: Arc::new(repo.clone()),
            responses: Arc::new(repo.clone()),
            quotes: Arc::new(repo),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use lms_core::time::fixed_now;

    async fn seed_chapter(repo: &InMemoryRepository) -> (StudentId, ChapterId) {
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
        (student_id, chapter_id)
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let repo = InMemoryRepository::new();
        let (student_id, chapter_id) = seed_chapter(&repo).await;

        let first = repo.get_or_create(student_id, chapter_id).await.unwrap();
        let second = repo.get_or_create(student_id, chapter_id).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(!first.completed);
    }

    #[tokio::test]
    async fn duplicate_chapter_number_conflicts() {
        let repo = InMemoryRepository::new();
        let (_, chapter_id) = seed_chapter(&repo).await;
        let topic_id = repo.get_chapter(chapter_id).await.unwrap().topic_id();

        let err = repo
            .insert_chapter(NewChapterRecord {
                topic_id,
                name: "Composites".into(),
                number: 1,
                slug: "composites".into(),
                description: None,
                thumbnail: "chapters/composites.png".into(),
                review: None,
                content: "Everything else.".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn replace_responses_swaps_attempt() {
        let repo = InMemoryRepository::new();
        let (student_id, chapter_id) = seed_chapter(&repo).await;

        let quiz_id = repo
            .insert_quiz(NewQuizRecord {
                chapter_id,
                title: "Checkpoint".into(),
                slug: "checkpoint".into(),
                publish: true,
                duration: QuizDuration::Min5,
                created_at: fixed_now(),
            })
            .await
            .unwrap();
        let question_id = repo
            .insert_question(NewQuestionRecord {
                quiz_id,
                text: "Is 7 prime?".into(),
            })
            .await
            .unwrap();
        let yes = repo
            .insert_choice(NewChoiceRecord {
                question_id,
                text: "Yes".into(),
                is_correct: true,
                explanation: None,
                mark: 1,
            })
            .await
            .unwrap();
        let no = repo
            .insert_choice(NewChoiceRecord {
                question_id,
                text: "No".into(),
                is_correct: false,
                explanation: None,
                mark: 1,
            })
            .await
            .unwrap();

        repo.replace_responses(
            student_id,
            quiz_id,
            &[NewResponseRecord {
                question_id,
                choice_id: no,
            }],
        )
        .await
        .unwrap();
        repo.replace_responses(
            student_id,
            quiz_id,
            &[NewResponseRecord {
                question_id,
                choice_id: yes,
            }],
        )
        .await
        .unwrap();

        let stored = repo.responses_for_quiz(student_id, quiz_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].choice_id, yes);
    }

    #[tokio::test]
    async fn deleting_topic_cascades() {
        let repo = InMemoryRepository::new();
        let (student_id, chapter_id) = seed_chapter(&repo).await;
        let chapter = repo.get_chapter(chapter_id).await.unwrap();
        repo.get_or_create(student_id, chapter_id).await.unwrap();

        repo.delete_topic(chapter.topic_id()).await.unwrap();

        assert!(matches!(
            repo.get_chapter(chapter_id).await,
            Err(StorageError::NotFound)
        ));
        let completions = repo
            .completed_chapter_ids(student_id, &[chapter_id])
            .await
            .unwrap();
        assert!(completions.is_empty());
    }
}
