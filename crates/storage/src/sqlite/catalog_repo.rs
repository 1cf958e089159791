use lms_core::model::{
    Chapter, ChapterId, Grade, GradeId, Student, StudentId, Subject, SubjectId, Teacher, TeacherId,
    Topic, TopicId, UserId,
};

use super::SqliteRepository;
use super::mapping::{
    chapter_id_from_i64, grade_id_from_i64, id_to_i64, map_chapter_row, map_grade_row,
    map_student_row, map_subject_row, map_teacher_row, map_topic_row, read_err,
    student_id_from_i64, subject_id_from_i64, teacher_id_from_i64, topic_id_from_i64, write_err,
};
use crate::repository::{
    ChapterRepository, GradeRepository, NewChapterRecord, NewGradeRecord, NewStudentRecord,
    NewSubjectRecord, NewTeacherRecord, NewTopicRecord, StorageError, StudentRepository,
    SubjectRepository, TeacherRepository, TopicRepository,
};

const CHAPTER_COLUMNS: &str =
    "id, topic_id, name, number, slug, description, thumbnail, review, content";

#[async_trait::async_trait]
impl GradeRepository for SqliteRepository {
    async fn insert_grade(&self, grade: NewGradeRecord) -> Result<GradeId, StorageError> {
        let res = sqlx::query("INSERT INTO grades (name, slug) VALUES (?1, ?2)")
            .bind(grade.name)
            .bind(grade.slug)
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        grade_id_from_i64(res.last_insert_rowid())
    }

    async fn get_grade(&self, id: GradeId) -> Result<Grade, StorageError> {
        let row = sqlx::query("SELECT id, name, slug FROM grades WHERE id = ?1")
            .bind(id_to_i64("grade_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_err)?
            .ok_or(StorageError::NotFound)?;
        map_grade_row(&row)
    }

    async fn get_grade_by_slug(&self, slug: &str) -> Result<Grade, StorageError> {
        let row = sqlx::query("SELECT id, name, slug FROM grades WHERE slug = ?1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_err)?
            .ok_or(StorageError::NotFound)?;
        map_grade_row(&row)
    }

    async fn list_grades(&self) -> Result<Vec<Grade>, StorageError> {
        let rows = sqlx::query("SELECT id, name, slug FROM grades ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(read_err)?;
        rows.iter().map(map_grade_row).collect()
    }
}

#[async_trait::async_trait]
impl StudentRepository for SqliteRepository {
    async fn insert_student(&self, student: NewStudentRecord) -> Result<StudentId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO students (user_id, grade_id, first_name, last_name, slug, color)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(id_to_i64("user_id", student.user_id.value())?)
        .bind(id_to_i64("grade_id", student.grade_id.value())?)
        .bind(student.first_name)
        .bind(student.last_name)
        .bind(student.slug)
        .bind(student.color.name())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        student_id_from_i64(res.last_insert_rowid())
    }

    async fn get_student(&self, id: StudentId) -> Result<Student, StorageError> {
        let row = sqlx::query(
            "SELECT id, user_id, grade_id, first_name, last_name, slug, color FROM students WHERE id = ?1",
        )
        .bind(id_to_i64("student_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)?
        .ok_or(StorageError::NotFound)?;
        map_student_row(&row)
    }

    async fn get_student_by_slug(&self, slug: &str) -> Result<Student, StorageError> {
        let row = sqlx::query(
            "SELECT id, user_id, grade_id, first_name, last_name, slug, color FROM students WHERE slug = ?1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)?
        .ok_or(StorageError::NotFound)?;
        map_student_row(&row)
    }

    async fn students_for_user(&self, user_id: UserId) -> Result<Vec<Student>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, grade_id, first_name, last_name, slug, color
            FROM students
            WHERE user_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;
        rows.iter().map(map_student_row).collect()
    }
}

#[async_trait::async_trait]
impl TeacherRepository for SqliteRepository {
    async fn insert_teacher(&self, teacher: NewTeacherRecord) -> Result<TeacherId, StorageError> {
        let res = sqlx::query("INSERT INTO teachers (user_id, grade_id) VALUES (?1, ?2)")
            .bind(id_to_i64("user_id", teacher.user_id.value())?)
            .bind(id_to_i64("grade_id", teacher.grade_id.value())?)
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        teacher_id_from_i64(res.last_insert_rowid())
    }

    async fn teachers_for_grade(&self, grade_id: GradeId) -> Result<Vec<Teacher>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, user_id, grade_id FROM teachers WHERE grade_id = ?1 ORDER BY id ASC",
        )
        .bind(id_to_i64("grade_id", grade_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;
        rows.iter().map(map_teacher_row).collect()
    }
}

#[async_trait::async_trait]
impl SubjectRepository for SqliteRepository {
    async fn insert_subject(&self, subject: NewSubjectRecord) -> Result<SubjectId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO subjects (grade_id, name, slug, description, thumbnail)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(id_to_i64("grade_id", subject.grade_id.value())?)
        .bind(subject.name)
        .bind(subject.slug)
        .bind(subject.description)
        .bind(subject.thumbnail)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        subject_id_from_i64(res.last_insert_rowid())
    }

    async fn get_subject(&self, id: SubjectId) -> Result<Subject, StorageError> {
        let row = sqlx::query(
            "SELECT id, grade_id, name, slug, description, thumbnail FROM subjects WHERE id = ?1",
        )
        .bind(id_to_i64("subject_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)?
        .ok_or(StorageError::NotFound)?;
        map_subject_row(&row)
    }

    async fn get_subject_by_slug(
        &self,
        grade_id: GradeId,
        slug: &str,
    ) -> Result<Subject, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, grade_id, name, slug, description, thumbnail
            FROM subjects
            WHERE grade_id = ?1 AND slug = ?2
            ",
        )
        .bind(id_to_i64("grade_id", grade_id.value())?)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)?
        .ok_or(StorageError::NotFound)?;
        map_subject_row(&row)
    }

    async fn subjects_for_grade(&self, grade_id: GradeId) -> Result<Vec<Subject>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, grade_id, name, slug, description, thumbnail
            FROM subjects
            WHERE grade_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("grade_id", grade_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;
        rows.iter().map(map_subject_row).collect()
    }

    async fn delete_subject(&self, id: SubjectId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM subjects WHERE id = ?1")
            .bind(id_to_i64("subject_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl TopicRepository for SqliteRepository {
    async fn insert_topic(&self, topic: NewTopicRecord) -> Result<TopicId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO topics (subject_id, name, slug, description, thumbnail, review)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(id_to_i64("subject_id", topic.subject_id.value())?)
        .bind(topic.name)
        .bind(topic.slug)
        .bind(topic.description)
        .bind(topic.thumbnail)
        .bind(topic.review)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        topic_id_from_i64(res.last_insert_rowid())
    }

    async fn get_topic(&self, id: TopicId) -> Result<Topic, StorageError> {
        let row = sqlx::query(
            "SELECT id, subject_id, name, slug, description, thumbnail, review FROM topics WHERE id = ?1",
        )
        .bind(id_to_i64("topic_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)?
        .ok_or(StorageError::NotFound)?;
        map_topic_row(&row)
    }

    async fn get_topic_by_slug(
        &self,
        subject_id: SubjectId,
        slug: &str,
    ) -> Result<Topic, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, subject_id, name, slug, description, thumbnail, review
            FROM topics
            WHERE subject_id = ?1 AND slug = ?2
            ",
        )
        .bind(id_to_i64("subject_id", subject_id.value())?)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)?
        .ok_or(StorageError::NotFound)?;
        map_topic_row(&row)
    }

    async fn topics_for_subject(&self, subject_id: SubjectId) -> Result<Vec<Topic>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, subject_id, name, slug, description, thumbnail, review
            FROM topics
            WHERE subject_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("subject_id", subject_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;
        rows.iter().map(map_topic_row).collect()
    }

    async fn delete_topic(&self, id: TopicId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM topics WHERE id = ?1")
            .bind(id_to_i64("topic_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChapterRepository for SqliteRepository {
    async fn insert_chapter(&self, chapter: NewChapterRecord) -> Result<ChapterId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO chapters (topic_id, name, number, slug, description, thumbnail, review, content)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(id_to_i64("topic_id", chapter.topic_id.value())?)
        .bind(chapter.name)
        .bind(chapter.number)
        .bind(chapter.slug)
        .bind(chapter.description)
        .bind(chapter.thumbnail)
        .bind(chapter.review)
        .bind(chapter.content)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        chapter_id_from_i64(res.last_insert_rowid())
    }

    async fn get_chapter(&self, id: ChapterId) -> Result<Chapter, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {CHAPTER_COLUMNS} FROM chapters WHERE id = ?1"
        ))
        .bind(id_to_i64("chapter_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)?
        .ok_or(StorageError::NotFound)?;
        map_chapter_row(&row)
    }

    async fn get_chapter_by_slug(
        &self,
        topic_id: TopicId,
        slug: &str,
    ) -> Result<Chapter, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {CHAPTER_COLUMNS} FROM chapters WHERE topic_id = ?1 AND slug = ?2"
        ))
        .bind(id_to_i64("topic_id", topic_id.value())?)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)?
        .ok_or(StorageError::NotFound)?;
        map_chapter_row(&row)
    }

    async fn chapters_for_topic(&self, topic_id: TopicId) -> Result<Vec<Chapter>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {CHAPTER_COLUMNS} FROM chapters WHERE topic_id = ?1 ORDER BY number ASC"
        ))
        .bind(id_to_i64("topic_id", topic_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;
        rows.iter().map(map_chapter_row).collect()
    }

    async fn next_chapter(
        &self,
        topic_id: TopicId,
        number: i64,
    ) -> Result<Option<Chapter>, StorageError> {
        let row = sqlx::query(&format!(
            r"
            SELECT {CHAPTER_COLUMNS} FROM chapters
            WHERE topic_id = ?1 AND number > ?2
            ORDER BY number ASC
            LIMIT 1
            "
        ))
        .bind(id_to_i64("topic_id", topic_id.value())?)
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)?;
        row.as_ref().map(map_chapter_row).transpose()
    }

    async fn prev_chapter(
        &self,
        topic_id: TopicId,
        number: i64,
    ) -> Result<Option<Chapter>, StorageError> {
        let row = sqlx::query(&format!(
            r"
            SELECT {CHAPTER_COLUMNS} FROM chapters
            WHERE topic_id = ?1 AND number < ?2
            ORDER BY number DESC
            LIMIT 1
            "
        ))
        .bind(id_to_i64("topic_id", topic_id.value())?)
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)?;
        row.as_ref().map(map_chapter_row).transpose()
    }

    async fn delete_chapter(&self, id: ChapterId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM chapters WHERE id = ?1")
            .bind(id_to_i64("chapter_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
