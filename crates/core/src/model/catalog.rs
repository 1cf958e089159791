use thiserror::Error;

use crate::model::ids::{ChapterId, GradeId, StudentId, SubjectId, TeacherId, TopicId, UserId};
use crate::slug::slugify;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("name cannot be empty")]
    EmptyName,

    #[error("student first name cannot be empty")]
    EmptyFirstName,

    #[error("no usable slug can be derived")]
    EmptySlug,

    #[error("thumbnail reference cannot be empty")]
    EmptyThumbnail,

    #[error("chapter content cannot be empty")]
    EmptyContent,

    #[error("unknown display color: {0}")]
    UnknownColor(String),
}

//
// ─── STUDENT COLOR ─────────────────────────────────────────────────────────────
//

/// Fixed display palette for students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StudentColor {
    #[default]
    Blue,
    Green,
    Yellow,
    Red,
    Purple,
    Gray,
    Pink,
    Orange,
}

impl StudentColor {
    pub const ALL: [StudentColor; 8] = [
        StudentColor::Blue,
        StudentColor::Green,
        StudentColor::Yellow,
        StudentColor::Red,
        StudentColor::Purple,
        StudentColor::Gray,
        StudentColor::Pink,
        StudentColor::Orange,
    ];

    /// Palette name, also the persisted representation.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            StudentColor::Blue => "blue",
            StudentColor::Green => "green",
            StudentColor::Yellow => "yellow",
            StudentColor::Red => "red",
            StudentColor::Purple => "purple",
            StudentColor::Gray => "gray",
            StudentColor::Pink => "pink",
            StudentColor::Orange => "orange",
        }
    }

    /// Display hex value for the palette entry.
    #[must_use]
    pub fn hex(self) -> &'static str {
        match self {
            StudentColor::Blue => "#0284c7",
            StudentColor::Green => "#0bb801",
            StudentColor::Yellow => "#ffea00",
            StudentColor::Red => "#df0000",
            StudentColor::Purple => "#5900df",
            StudentColor::Gray => "#616161",
            StudentColor::Pink => "#e300c5",
            StudentColor::Orange => "#ffa500",
        }
    }

    /// Parses a palette name back into a color.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::UnknownColor` for values outside the palette.
    pub fn from_name(name: &str) -> Result<Self, CatalogError> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| CatalogError::UnknownColor(name.to_owned()))
    }
}

//
// ─── GRADE ─────────────────────────────────────────────────────────────────────
//

/// A school grade; the root of the catalog hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grade {
    id: GradeId,
    name: String,
    slug: String,
}

impl Grade {
    /// Creates a new grade, deriving the slug from the name when not given.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyName` for blank names and
    /// `CatalogError::EmptySlug` when no usable slug can be derived.
    pub fn new(
        id: GradeId,
        name: impl Into<String>,
        slug: Option<String>,
    ) -> Result<Self, CatalogError> {
        let name = non_empty_name(name.into())?;
        let slug = derive_slug(slug, &name)?;
        Ok(Self { id, name, slug })
    }

    #[must_use]
    pub fn id(&self) -> GradeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }
}

//
// ─── STUDENT ───────────────────────────────────────────────────────────────────
//

/// A student enrolled in exactly one grade.
///
/// The `user_id` ties the student to an externally authenticated identity;
/// one user may manage several students.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    id: StudentId,
    user_id: UserId,
    first_name: String,
    last_name: String,
    grade_id: GradeId,
    slug: String,
    color: StudentColor,
}

impl Student {
    /// Creates a new student. The slug derives from the first name when
    /// not given; uniqueness within the grade is the storage layer's job.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyFirstName` for a blank first name and
    /// `CatalogError::EmptySlug` when no usable slug can be derived.
    pub fn new(
        id: StudentId,
        user_id: UserId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        grade_id: GradeId,
        slug: Option<String>,
        color: StudentColor,
    ) -> Result<Self, CatalogError> {
        let first_name = first_name.into().trim().to_owned();
        if first_name.is_empty() {
            return Err(CatalogError::EmptyFirstName);
        }
        let last_name = last_name.into().trim().to_owned();
        let slug = derive_slug(slug, &first_name)?;

        Ok(Self {
            id,
            user_id,
            first_name,
            last_name,
            grade_id,
            slug,
            color,
        })
    }

    #[must_use]
    pub fn id(&self) -> StudentId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    #[must_use]
    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    #[must_use]
    pub fn grade_id(&self) -> GradeId {
        self.grade_id
    }

    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    #[must_use]
    pub fn color(&self) -> StudentColor {
        self.color
    }
}

//
// ─── TEACHER ───────────────────────────────────────────────────────────────────
//

/// Links one authenticated identity to the grade it teaches.
///
/// Display details (names) live with the identity provider, so this is a
/// pure association record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Teacher {
    pub id: TeacherId,
    pub user_id: UserId,
    pub grade_id: GradeId,
}

//
// ─── SUBJECT ───────────────────────────────────────────────────────────────────
//

/// A subject taught within a grade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    id: SubjectId,
    grade_id: GradeId,
    name: String,
    slug: String,
    description: Option<String>,
    thumbnail: String,
}

impl Subject {
    /// Creates a new subject.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the name, derived slug, or thumbnail
    /// reference is empty.
    pub fn new(
        id: SubjectId,
        grade_id: GradeId,
        name: impl Into<String>,
        slug: Option<String>,
        description: Option<String>,
        thumbnail: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        let name = non_empty_name(name.into())?;
        let slug = derive_slug(slug, &name)?;
        let thumbnail = non_empty_thumbnail(thumbnail.into())?;

        Ok(Self {
            id,
            grade_id,
            name,
            slug,
            description: filter_blank(description),
            thumbnail,
        })
    }

    #[must_use]
    pub fn id(&self) -> SubjectId {
        self.id
    }

    #[must_use]
    pub fn grade_id(&self) -> GradeId {
        self.grade_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn thumbnail(&self) -> &str {
        &self.thumbnail
    }
}

//
// ─── TOPIC ─────────────────────────────────────────────────────────────────────
//

/// A topic grouping chapters within a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    id: TopicId,
    subject_id: SubjectId,
    name: String,
    slug: String,
    description: Option<String>,
    thumbnail: String,
    review: Option<String>,
}

impl Topic {
    /// Creates a new topic.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the name, derived slug, or thumbnail
    /// reference is empty.
    pub fn new(
        id: TopicId,
        subject_id: SubjectId,
        name: impl Into<String>,
        slug: Option<String>,
        description: Option<String>,
        thumbnail: impl Into<String>,
        review: Option<String>,
    ) -> Result<Self, CatalogError> {
        let name = non_empty_name(name.into())?;
        let slug = derive_slug(slug, &name)?;
        let thumbnail = non_empty_thumbnail(thumbnail.into())?;

        Ok(Self {
            id,
            subject_id,
            name,
            slug,
            description: filter_blank(description),
            thumbnail,
            review: filter_blank(review),
        })
    }

    #[must_use]
    pub fn id(&self) -> TopicId {
        self.id
    }

    #[must_use]
    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn thumbnail(&self) -> &str {
        &self.thumbnail
    }

    #[must_use]
    pub fn review(&self) -> Option<&str> {
        self.review.as_deref()
    }
}

//
// ─── CHAPTER ───────────────────────────────────────────────────────────────────
//

/// A chapter of learnable content within a topic.
///
/// `number` is a globally unique ordering key used for next/previous
/// navigation across the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    id: ChapterId,
    topic_id: TopicId,
    name: String,
    number: i64,
    slug: String,
    description: Option<String>,
    thumbnail: String,
    review: Option<String>,
    content: String,
}

impl Chapter {
    /// Creates a new chapter.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the name, derived slug, thumbnail
    /// reference, or content is empty.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ChapterId,
        topic_id: TopicId,
        name: impl Into<String>,
        number: i64,
        slug: Option<String>,
        description: Option<String>,
        thumbnail: impl Into<String>,
        review: Option<String>,
        content: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        let name = non_empty_name(name.into())?;
        let slug = derive_slug(slug, &name)?;
        let thumbnail = non_empty_thumbnail(thumbnail.into())?;
        let content = content.into();
        if content.trim().is_empty() {
            return Err(CatalogError::EmptyContent);
        }

        Ok(Self {
            id,
            topic_id,
            name,
            number,
            slug,
            description: filter_blank(description),
            thumbnail,
            review: filter_blank(review),
            content,
        })
    }

    #[must_use]
    pub fn id(&self) -> ChapterId {
        self.id
    }

    #[must_use]
    pub fn topic_id(&self) -> TopicId {
        self.topic_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn number(&self) -> i64 {
        self.number
    }

    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn thumbnail(&self) -> &str {
        &self.thumbnail
    }

    #[must_use]
    pub fn review(&self) -> Option<&str> {
        self.review.as_deref()
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

//
// ─── HELPERS ───────────────────────────────────────────────────────────────────
//

fn non_empty_name(name: String) -> Result<String, CatalogError> {
    let name = name.trim().to_owned();
    if name.is_empty() {
        return Err(CatalogError::EmptyName);
    }
    Ok(name)
}

fn non_empty_thumbnail(thumbnail: String) -> Result<String, CatalogError> {
    let thumbnail = thumbnail.trim().to_owned();
    if thumbnail.is_empty() {
        return Err(CatalogError::EmptyThumbnail);
    }
    Ok(thumbnail)
}

fn derive_slug(explicit: Option<String>, name: &str) -> Result<String, CatalogError> {
    let slug = match explicit {
        Some(s) if !s.trim().is_empty() => slugify(&s),
        _ => slugify(name),
    };
    if slug.is_empty() {
        return Err(CatalogError::EmptySlug);
    }
    Ok(slug)
}

fn filter_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
