use std::sync::Arc;

use lms_core::grading::percentage;
use lms_core::model::{ChapterId, StudentId, SubjectId, Topic, TopicId};
use storage::repository::{ChapterRepository, CompletionRepository, TopicRepository};

use crate::error::ProgressError;

/// Chapter-level completion rollup for one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicProgress {
    pub topic: Topic,
    pub completed_chapters: usize,
    pub total_chapters: usize,
    pub percent: u32,
}

impl TopicProgress {
    #[must_use]
    pub fn is_fully_complete(&self) -> bool {
        self.percent == 100
    }
}

/// Topic-level completion rollup for one subject.
///
/// The subject percent counts topics that are themselves 100% complete; it
/// is deliberately coarser than a weighted average of chapter percentages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectProgress {
    pub topics: Vec<TopicProgress>,
    pub fully_completed_topics: usize,
    pub total_topics: usize,
    pub percent: u32,
}

/// Derives completion percentages bottom-up from completion records.
#[derive(Clone)]
pub struct ProgressService {
    topics: Arc<dyn TopicRepository>,
    chapters: Arc<dyn ChapterRepository>,
    completions: Arc<dyn CompletionRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        topics: Arc<dyn TopicRepository>,
        chapters: Arc<dyn ChapterRepository>,
        completions: Arc<dyn CompletionRepository>,
    ) -> Self {
        Self {
            topics,
            chapters,
            completions,
        }
    }

    /// Completion ratio of a topic's chapters for one student.
    ///
    /// A topic with no chapters reports 0 percent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) for a missing topic, or
    /// other storage failures.
    pub async fn topic_progress(
        &self,
        student_id: StudentId,
        topic_id: TopicId,
    ) -> Result<TopicProgress, ProgressError> {
        let topic = self.topics.get_topic(topic_id).await?;
        self.progress_for_topic(student_id, topic).await
    }

    /// Share of a subject's topics that are fully complete for one student.
    ///
    /// A subject with no topics reports 0 percent rather than dividing by
    /// zero.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` on repository failures.
    pub async fn subject_progress(
        &self,
        student_id: StudentId,
        subject_id: SubjectId,
    ) -> Result<SubjectProgress, ProgressError> {
        let topics = self.topics.topics_for_subject(subject_id).await?;
        let total_topics = topics.len();

        let mut progress = Vec::with_capacity(total_topics);
        for topic in topics {
            progress.push(self.progress_for_topic(student_id, topic).await?);
        }

        let fully_completed_topics = progress
            .iter()
            .filter(|p| p.is_fully_complete())
            .count();

        Ok(SubjectProgress {
            topics: progress,
            fully_completed_topics,
            total_topics,
            percent: percentage(fully_completed_topics, total_topics),
        })
    }

    /// Of the given chapters, the ones this student has completed.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` on repository failures.
    pub async fn completed_chapter_ids(
        &self,
        student_id: StudentId,
        chapter_ids: &[ChapterId],
    ) -> Result<Vec<ChapterId>, ProgressError> {
        Ok(self
            .completions
            .completed_chapter_ids(student_id, chapter_ids)
            .await?)
    }

    async fn progress_for_topic(
        &self,
        student_id: StudentId,
        topic: Topic,
    ) -> Result<TopicProgress, ProgressError> {
        let chapters = self.chapters.chapters_for_topic(topic.id()).await?;
        let chapter_ids: Vec<ChapterId> = chapters.iter().map(|c| c.id()).collect();
        let completed = self
            .completions
            .completed_chapter_ids(student_id, &chapter_ids)
            .await?;

        let total_chapters = chapter_ids.len();
        let completed_chapters = completed.len();

        Ok(TopicProgress {
            topic,
            completed_chapters,
            total_chapters,
            percent: percentage(completed_chapters, total_chapters),
        })
    }
}
