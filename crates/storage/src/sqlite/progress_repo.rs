use lms_core::model::{ChapterId, CompletionRecord, QuizId, StudentId, StudentResponse};

use super::SqliteRepository;
use super::mapping::{
    chapter_id_from_i64, id_to_i64, map_completion_row, map_response_row, read_err, ser, write_err,
};
use crate::repository::{
    CompletionRepository, NewResponseRecord, ResponseRepository, StorageError,
};

#[async_trait::async_trait]
impl CompletionRepository for SqliteRepository {
    async fn get_or_create(
        &self,
        student_id: StudentId,
        chapter_id: ChapterId,
    ) -> Result<CompletionRecord, StorageError> {
        let student = id_to_i64("student_id", student_id.value())?;
        let chapter = id_to_i64("chapter_id", chapter_id.value())?;

        // The composite unique index makes this race-free: whichever of two
        // concurrent first visits loses the insert still reads the winner's row.
        sqlx::query(
            r"
            INSERT INTO chapter_completions (student_id, chapter_id, completed, completed_at)
            VALUES (?1, ?2, 0, NULL)
            ON CONFLICT(student_id, chapter_id) DO NOTHING
            ",
        )
        .bind(student)
        .bind(chapter)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        let row = sqlx::query(
            r"
            SELECT id, student_id, chapter_id, completed, completed_at
            FROM chapter_completions
            WHERE student_id = ?1 AND chapter_id = ?2
            ",
        )
        .bind(student)
        .bind(chapter)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)?
        .ok_or(StorageError::NotFound)?;
        map_completion_row(&row)
    }

    async fn update(&self, record: &CompletionRecord) -> Result<(), StorageError> {
        let res = sqlx::query(
            "UPDATE chapter_completions SET completed = ?1, completed_at = ?2 WHERE id = ?3",
        )
        .bind(record.completed)
        .bind(record.completed_at)
        .bind(record.id)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn completed_chapter_ids(
        &self,
        student_id: StudentId,
        chapter_ids: &[ChapterId],
    ) -> Result<Vec<ChapterId>, StorageError> {
        if chapter_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            r"
            SELECT chapter_id FROM chapter_completions
            WHERE student_id = ?1 AND completed = 1 AND chapter_id IN (
            ",
        );
        for i in 0..chapter_ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 2).to_string());
        }
        sql.push_str(")\n");

        let mut q = sqlx::query(&sql).bind(id_to_i64("student_id", student_id.value())?);
        for id in chapter_ids {
            q = q.bind(id_to_i64("chapter_id", id.value())?);
        }

        let rows = q.fetch_all(&self.pool).await.map_err(read_err)?;
        rows.iter()
            .map(|row| {
                use sqlx::Row as _;
                chapter_id_from_i64(row.try_get::<i64, _>("chapter_id").map_err(ser)?)
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl ResponseRepository for SqliteRepository {
    async fn replace_responses(
        &self,
        student_id: StudentId,
        quiz_id: QuizId,
        entries: &[NewResponseRecord],
    ) -> Result<Vec<StudentResponse>, StorageError> {
        let student = id_to_i64("student_id", student_id.value())?;
        let quiz = id_to_i64("quiz_id", quiz_id.value())?;

        // Delete and insert must not interleave with a concurrent submission,
        // or the latest-attempt invariant breaks.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query("DELETE FROM responses WHERE student_id = ?1 AND quiz_id = ?2")
            .bind(student)
            .bind(quiz)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut inserted = Vec::with_capacity(entries.len());
        for entry in entries {
            let res = sqlx::query(
                r"
                INSERT INTO responses (student_id, quiz_id, question_id, choice_id)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(student)
            .bind(quiz)
            .bind(id_to_i64("question_id", entry.question_id.value())?)
            .bind(id_to_i64("choice_id", entry.choice_id.value())?)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;

            inserted.push(StudentResponse {
                id: res.last_insert_rowid(),
                student_id,
                quiz_id,
                question_id: entry.question_id,
                choice_id: entry.choice_id,
            });
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(inserted)
    }

    async fn responses_for_quiz(
        &self,
        student_id: StudentId,
        quiz_id: QuizId,
    ) -> Result<Vec<StudentResponse>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, student_id, quiz_id, question_id, choice_id
            FROM responses
            WHERE student_id = ?1 AND quiz_id = ?2
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("student_id", student_id.value())?)
        .bind(id_to_i64("quiz_id", quiz_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;
        rows.iter().map(map_response_row).collect()
    }

    async fn has_responses(
        &self,
        student_id: StudentId,
        quiz_id: QuizId,
    ) -> Result<bool, StorageError> {
        let row = sqlx::query(
            "SELECT 1 FROM responses WHERE student_id = ?1 AND quiz_id = ?2 LIMIT 1",
        )
        .bind(id_to_i64("student_id", student_id.value())?)
        .bind(id_to_i64("quiz_id", quiz_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)?;
        Ok(row.is_some())
    }
}
