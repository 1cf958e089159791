use std::sync::Arc;

use storage::repository::Storage;
use storage::thumbnails::{LocalThumbnailStore, RecordingThumbnailStore, ThumbnailStore};

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::completion_service::CompletionService;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::quiz_service::QuizService;
use crate::quote_service::QuoteService;

/// Assembles the application-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    catalog: CatalogService,
    completions: CompletionService,
    progress: ProgressService,
    quizzes: QuizService,
    quotes: QuoteService,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, with thumbnails under the
    /// given media root.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        media_root: &str,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let thumbnails: Arc<dyn ThumbnailStore> = Arc::new(LocalThumbnailStore::new(media_root));
        Ok(Self::assemble(storage, clock, thumbnails))
    }

    /// Build services over the in-memory backend; thumbnail removals are
    /// recorded rather than hitting a disk.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        let storage = Storage::in_memory();
        let thumbnails: Arc<dyn ThumbnailStore> = Arc::new(RecordingThumbnailStore::new());
        Self::assemble(storage, clock, thumbnails)
    }

    fn assemble(storage: Storage, clock: Clock, thumbnails: Arc<dyn ThumbnailStore>) -> Self {
        let completions = CompletionService::new(clock, Arc::clone(&storage.completions));
        let progress = ProgressService::new(
            Arc::clone(&storage.topics),
            Arc::clone(&storage.chapters),
            Arc::clone(&storage.completions),
        );
        let quizzes = QuizService::new(
            clock,
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.responses),
        );
        let catalog = CatalogService::new(
            clock,
            Arc::clone(&storage.grades),
            Arc::clone(&storage.students),
            Arc::clone(&storage.teachers),
            Arc::clone(&storage.subjects),
            Arc::clone(&storage.topics),
            Arc::clone(&storage.chapters),
            Arc::clone(&storage.quizzes),
            thumbnails,
            progress.clone(),
            completions.clone(),
        );
        let quotes = QuoteService::new(Arc::clone(&storage.quotes));

        Self {
            catalog,
            completions,
            progress,
            quizzes,
            quotes,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    #[must_use]
    pub fn completions(&self) -> &CompletionService {
        &self.completions
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressService {
        &self.progress
    }

    #[must_use]
    pub fn quizzes(&self) -> &QuizService {
        &self.quizzes
    }

    #[must_use]
    pub fn quotes(&self) -> &QuoteService {
        &self.quotes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lms_core::model::{StudentColor, UserId};
    use lms_core::time::fixed_clock;

    #[tokio::test]
    async fn in_memory_services_share_one_store() {
        let app = AppServices::in_memory(fixed_clock());
        let grade = app.catalog().create_grade("Grade 7", None).await.unwrap();
        let student = app
            .catalog()
            .create_student(
                UserId::new(1),
                grade.id(),
                "Amina",
                "Khalil",
                None,
                StudentColor::Blue,
            )
            .await
            .unwrap();
        let subject = app
            .catalog()
            .create_subject(grade.id(), "Maths", None, None, "subjects/maths.png")
            .await
            .unwrap();
        let topic = app
            .catalog()
            .create_topic(subject.id(), "Numbers", None, None, "topics/numbers.png", None)
            .await
            .unwrap();
        let chapter = app
            .catalog()
            .create_chapter(
                topic.id(),
                "Primes",
                1,
                None,
                None,
                "chapters/primes.png",
                None,
                "content",
            )
            .await
            .unwrap();

        app.completions()
            .set_completion(student.id(), chapter.id(), true)
            .await
            .unwrap();

        // the progress view sees the completion written through the tracker
        let progress = app
            .progress()
            .subject_progress(student.id(), subject.id())
            .await
            .unwrap();
        assert_eq!(progress.percent, 100);

        let dashboard = app.catalog().user_dashboard(UserId::new(1)).await.unwrap();
        assert_eq!(dashboard.number_of_students, 1);
    }
}
