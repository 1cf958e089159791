use lms_core::model::{ChapterId, Choice, ChoiceId, Question, QuestionId, Quiz, QuizId};

use super::SqliteRepository;
use super::mapping::{
    choice_id_from_i64, id_to_i64, map_choice_row, map_question_row, map_quiz_row,
    question_id_from_i64, quiz_id_from_i64, read_err, write_err,
};
use crate::repository::{
    NewChoiceRecord, NewQuestionRecord, NewQuizRecord, QuizRepository, StorageError,
};

const QUIZ_COLUMNS: &str = "id, chapter_id, title, slug, publish, duration_secs, created_at";

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn insert_quiz(&self, quiz: NewQuizRecord) -> Result<QuizId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO quizzes (chapter_id, title, slug, publish, duration_secs, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(id_to_i64("chapter_id", quiz.chapter_id.value())?)
        .bind(quiz.title)
        .bind(quiz.slug)
        .bind(quiz.publish)
        .bind(quiz.duration.as_secs())
        .bind(quiz.created_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        quiz_id_from_i64(res.last_insert_rowid())
    }

    async fn insert_question(
        &self,
        question: NewQuestionRecord,
    ) -> Result<QuestionId, StorageError> {
        let res = sqlx::query("INSERT INTO questions (quiz_id, question_text) VALUES (?1, ?2)")
            .bind(id_to_i64("quiz_id", question.quiz_id.value())?)
            .bind(question.text)
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        question_id_from_i64(res.last_insert_rowid())
    }

    async fn insert_choice(&self, choice: NewChoiceRecord) -> Result<ChoiceId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO choices (question_id, choice_text, is_correct, explanation, mark)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(id_to_i64("question_id", choice.question_id.value())?)
        .bind(choice.text)
        .bind(choice.is_correct)
        .bind(choice.explanation)
        .bind(choice.mark)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        choice_id_from_i64(res.last_insert_rowid())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError> {
        let row = sqlx::query(&format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = ?1"))
            .bind(id_to_i64("quiz_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_err)?
            .ok_or(StorageError::NotFound)?;
        map_quiz_row(&row)
    }

    async fn get_quiz_by_slug(
        &self,
        chapter_id: ChapterId,
        slug: &str,
    ) -> Result<Quiz, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE chapter_id = ?1 AND slug = ?2"
        ))
        .bind(id_to_i64("chapter_id", chapter_id.value())?)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)?
        .ok_or(StorageError::NotFound)?;
        map_quiz_row(&row)
    }

    async fn quizzes_for_chapter(&self, chapter_id: ChapterId) -> Result<Vec<Quiz>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE chapter_id = ?1 ORDER BY id ASC"
        ))
        .bind(id_to_i64("chapter_id", chapter_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;
        rows.iter().map(map_quiz_row).collect()
    }

    async fn questions_for_quiz(&self, quiz_id: QuizId) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, quiz_id, question_text FROM questions WHERE quiz_id = ?1 ORDER BY id ASC",
        )
        .bind(id_to_i64("quiz_id", quiz_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;
        rows.iter().map(map_question_row).collect()
    }

    async fn choices_for_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Vec<Choice>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, question_id, choice_text, is_correct, explanation, mark
            FROM choices
            WHERE question_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("question_id", question_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;
        rows.iter().map(map_choice_row).collect()
    }

    async fn get_choice(&self, id: ChoiceId) -> Result<Choice, StorageError> {
        let row = sqlx::query(
            "SELECT id, question_id, choice_text, is_correct, explanation, mark FROM choices WHERE id = ?1",
        )
        .bind(id_to_i64("choice_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)?
        .ok_or(StorageError::NotFound)?;
        map_choice_row(&row)
    }
}
