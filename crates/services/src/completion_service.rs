use std::sync::Arc;

use lms_core::model::{ChapterId, CompletionRecord, StudentId};
use storage::repository::CompletionRepository;

use crate::Clock;
use crate::error::CompletionError;

/// Tracks per-(student, chapter) completion records.
///
/// Records are created lazily on first visit through get-or-create; the
/// storage layer's composite unique constraint keeps the pair unique even
/// under concurrent first visits.
#[derive(Clone)]
pub struct CompletionService {
    clock: Clock,
    completions: Arc<dyn CompletionRepository>,
}

impl CompletionService {
    #[must_use]
    pub fn new(clock: Clock, completions: Arc<dyn CompletionRepository>) -> Self {
        Self { clock, completions }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// The unique completion record for (student, chapter), created with
    /// `completed = false` when absent.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::Storage` on repository failures.
    pub async fn get_or_create(
        &self,
        student_id: StudentId,
        chapter_id: ChapterId,
    ) -> Result<CompletionRecord, CompletionError> {
        Ok(self.completions.get_or_create(student_id, chapter_id).await?)
    }

    /// Toggles completion for (student, chapter) and persists the result.
    ///
    /// Completing stamps the record with the service clock; clearing drops
    /// the timestamp.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::Storage` on repository failures.
    pub async fn set_completion(
        &self,
        student_id: StudentId,
        chapter_id: ChapterId,
        completed: bool,
    ) -> Result<CompletionRecord, CompletionError> {
        let mut record = self.completions.get_or_create(student_id, chapter_id).await?;
        record.set_completed(completed, self.clock.now());
        self.completions.update(&record).await?;
        Ok(record)
    }
}
