use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use lms_core::model::{
    Chapter, ChapterId, Choice, ChoiceId, CompletionRecord, Grade, GradeId, Question, QuestionId,
    Quiz, QuizDuration, QuizId, Quote, Student, StudentColor, StudentId, StudentResponse, Subject,
    SubjectId, Teacher, TeacherId, Topic, TopicId, UserId,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps an insert/update failure, distinguishing unique-constraint hits.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
        StorageError::Conflict
    } else {
        StorageError::Connection(e.to_string())
    }
}

pub(crate) fn read_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

macro_rules! id_from_row {
    ($name:ident, $ty:ident, $field:literal) => {
        pub(crate) fn $name(v: i64) -> Result<$ty, StorageError> {
            Ok($ty::new(i64_to_u64($field, v)?))
        }
    };
}

id_from_row!(user_id_from_i64, UserId, "user_id");
id_from_row!(grade_id_from_i64, GradeId, "grade_id");
id_from_row!(student_id_from_i64, StudentId, "student_id");
id_from_row!(teacher_id_from_i64, TeacherId, "teacher_id");
id_from_row!(subject_id_from_i64, SubjectId, "subject_id");
id_from_row!(topic_id_from_i64, TopicId, "topic_id");
id_from_row!(chapter_id_from_i64, ChapterId, "chapter_id");
id_from_row!(quiz_id_from_i64, QuizId, "quiz_id");
id_from_row!(question_id_from_i64, QuestionId, "question_id");
id_from_row!(choice_id_from_i64, ChoiceId, "choice_id");

pub(crate) fn map_grade_row(row: &SqliteRow) -> Result<Grade, StorageError> {
    Grade::new(
        grade_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        Some(row.try_get::<String, _>("slug").map_err(ser)?),
    )
    .map_err(ser)
}

pub(crate) fn map_student_row(row: &SqliteRow) -> Result<Student, StorageError> {
    let color_name: String = row.try_get("color").map_err(ser)?;
    Student::new(
        student_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        row.try_get::<String, _>("first_name").map_err(ser)?,
        row.try_get::<String, _>("last_name").map_err(ser)?,
        grade_id_from_i64(row.try_get::<i64, _>("grade_id").map_err(ser)?)?,
        Some(row.try_get::<String, _>("slug").map_err(ser)?),
        StudentColor::from_name(&color_name).map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_teacher_row(row: &SqliteRow) -> Result<Teacher, StorageError> {
    Ok(Teacher {
        id: teacher_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        user_id: user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        grade_id: grade_id_from_i64(row.try_get::<i64, _>("grade_id").map_err(ser)?)?,
    })
}

pub(crate) fn map_subject_row(row: &SqliteRow) -> Result<Subject, StorageError> {
    Subject::new(
        subject_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        grade_id_from_i64(row.try_get::<i64, _>("grade_id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        Some(row.try_get::<String, _>("slug").map_err(ser)?),
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        row.try_get::<String, _>("thumbnail").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_topic_row(row: &SqliteRow) -> Result<Topic, StorageError> {
    Topic::new(
        topic_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        subject_id_from_i64(row.try_get::<i64, _>("subject_id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        Some(row.try_get::<String, _>("slug").map_err(ser)?),
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        row.try_get::<String, _>("thumbnail").map_err(ser)?,
        row.try_get::<Option<String>, _>("review").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_chapter_row(row: &SqliteRow) -> Result<Chapter, StorageError> {
    Chapter::new(
        chapter_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        topic_id_from_i64(row.try_get::<i64, _>("topic_id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<i64, _>("number").map_err(ser)?,
        Some(row.try_get::<String, _>("slug").map_err(ser)?),
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        row.try_get::<String, _>("thumbnail").map_err(ser)?,
        row.try_get::<Option<String>, _>("review").map_err(ser)?,
        row.try_get::<String, _>("content").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_quiz_row(row: &SqliteRow) -> Result<Quiz, StorageError> {
    let duration_secs: i64 = row.try_get("duration_secs").map_err(ser)?;
    Quiz::new(
        quiz_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        chapter_id_from_i64(row.try_get::<i64, _>("chapter_id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        Some(row.try_get::<String, _>("slug").map_err(ser)?),
        row.try_get::<bool, _>("publish").map_err(ser)?,
        QuizDuration::from_secs(duration_secs).map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    Question::new(
        question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        quiz_id_from_i64(row.try_get::<i64, _>("quiz_id").map_err(ser)?)?,
        row.try_get::<String, _>("question_text").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_choice_row(row: &SqliteRow) -> Result<Choice, StorageError> {
    Choice::new(
        choice_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?,
        row.try_get::<String, _>("choice_text").map_err(ser)?,
        row.try_get::<bool, _>("is_correct").map_err(ser)?,
        row.try_get::<Option<String>, _>("explanation").map_err(ser)?,
        row.try_get::<i32, _>("mark").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_completion_row(row: &SqliteRow) -> Result<CompletionRecord, StorageError> {
    Ok(CompletionRecord {
        id: row.try_get::<i64, _>("id").map_err(ser)?,
        student_id: student_id_from_i64(row.try_get::<i64, _>("student_id").map_err(ser)?)?,
        chapter_id: chapter_id_from_i64(row.try_get::<i64, _>("chapter_id").map_err(ser)?)?,
        completed: row.try_get::<bool, _>("completed").map_err(ser)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
    })
}

pub(crate) fn map_response_row(row: &SqliteRow) -> Result<StudentResponse, StorageError> {
    Ok(StudentResponse {
        id: row.try_get::<i64, _>("id").map_err(ser)?,
        student_id: student_id_from_i64(row.try_get::<i64, _>("student_id").map_err(ser)?)?,
        quiz_id: quiz_id_from_i64(row.try_get::<i64, _>("quiz_id").map_err(ser)?)?,
        question_id: question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?,
        choice_id: choice_id_from_i64(row.try_get::<i64, _>("choice_id").map_err(ser)?)?,
    })
}

pub(crate) fn map_quote_row(row: &SqliteRow) -> Result<Quote, StorageError> {
    Quote::new(
        row.try_get::<i64, _>("id").map_err(ser)?,
        row.try_get::<String, _>("quote").map_err(ser)?,
        row.try_get::<Option<String>, _>("author").map_err(ser)?,
    )
    .map_err(ser)
}
