use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque reference to an authenticated user supplied by the identity provider.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(u64);

/// Unique identifier for a Grade
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GradeId(u64);

/// Unique identifier for a Student
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudentId(u64);

/// Unique identifier for a Teacher
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeacherId(u64);

/// Unique identifier for a Subject
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectId(u64);

/// Unique identifier for a Topic
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicId(u64);

/// Unique identifier for a Chapter
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChapterId(u64);

/// Unique identifier for a chapter Quiz
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuizId(u64);

/// Unique identifier for a quiz Question
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionId(u64);

/// Unique identifier for a question Choice
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChoiceId(u64);

macro_rules! id_impls {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl $ty {
                #[doc = concat!("Creates a new `", stringify!($ty), "`")]
                #[must_use]
                pub fn new(id: u64) -> Self {
                    Self(id)
                }

                /// Returns the underlying u64 value
                #[must_use]
                pub fn value(&self) -> u64 {
                    self.0
                }
            }

            impl fmt::Debug for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, concat!(stringify!($ty), "({})"), self.0)
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl FromStr for $ty {
                type Err = ParseIdError;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    s.parse::<u64>().map($ty::new).map_err(|_| ParseIdError {
                        kind: stringify!($ty),
                    })
                }
            }
        )+
    };
}

id_impls!(
    UserId, GradeId, StudentId, TeacherId, SubjectId, TopicId, ChapterId, QuizId, QuestionId,
    ChoiceId,
);

/// Error type for parsing an ID from a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}
