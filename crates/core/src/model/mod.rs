mod catalog;
mod ids;
mod progress;
mod quiz;
mod quote;

pub use ids::{
    ChapterId, ChoiceId, GradeId, ParseIdError, QuestionId, QuizId, StudentId, SubjectId,
    TeacherId, TopicId, UserId,
};

pub use catalog::{CatalogError, Chapter, Grade, Student, StudentColor, Subject, Teacher, Topic};
pub use progress::{CompletionRecord, StudentResponse};
pub use quiz::{available_marks, Choice, Question, Quiz, QuizDuration, QuizError};
pub use quote::{Quote, QuoteError};
