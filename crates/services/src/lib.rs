#![forbid(unsafe_code)]

pub mod app_services;
pub mod attempt_timer;
pub mod catalog_service;
pub mod completion_service;
pub mod error;
pub mod progress_service;
pub mod quiz_service;
pub mod quote_service;

pub use lms_core::Clock;

pub use app_services::AppServices;
pub use attempt_timer::{QUIZ_TIME_LIMIT_SECS, QuizTimerContext, TimerStatus};
pub use catalog_service::{
    CatalogService, ChapterPath, ChapterView, QuizPath, StudentDashboard, SubjectDashboard,
    TopicDashboard, UserDashboard,
};
pub use completion_service::CompletionService;
pub use error::{
    AppServicesError, CatalogServiceError, CompletionError, ProgressError, QuizAttemptError,
    QuoteServiceError,
};
pub use progress_service::{ProgressService, SubjectProgress, TopicProgress};
pub use quiz_service::{
    AnsweredQuestion, AttemptOverview, AttemptResult, QuestionWithChoices, QuizContent,
    QuizContentOutcome, QuizResults, QuizService, QuizSubmission, SubmitOutcome,
    UnansweredQuestion,
};
pub use quote_service::QuoteService;
