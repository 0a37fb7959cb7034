//! Courses and their ordered modules.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{CourseId, Money, ModuleId};

/// Longest accepted module title, in characters.
pub const MODULE_TITLE_MAX: usize = 200;

/// A purchasable course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Store key.
    pub id: CourseId,
    /// Display title.
    pub title: String,
    /// Instructor shown on certificates.
    pub instructor: String,
    /// Current price.
    pub price: Money,
}

/// One-based position of a module within its course.
///
/// Positions are strictly positive. The store briefly holds negative staging
/// values while renumbering, but those never leave the persistence adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct ModulePosition(i32);

/// Raised when a position is zero or negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("module position must be positive, got {0}")]
pub struct InvalidPosition(pub i32);

impl ModulePosition {
    /// The first slot of every course.
    pub const FIRST: Self = Self(1);

    /// Validate a raw position.
    pub fn new(raw: i32) -> Result<Self, InvalidPosition> {
        if raw < 1 {
            return Err(InvalidPosition(raw));
        }
        Ok(Self(raw))
    }

    /// Raw one-based value.
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Position immediately after this one.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// Position immediately before this one, if any.
    pub fn previous(self) -> Option<Self> {
        (self.0 > 1).then(|| Self(self.0 - 1))
    }
}

impl TryFrom<i32> for ModulePosition {
    type Error = InvalidPosition;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ModulePosition> for i32 {
    fn from(value: ModulePosition) -> Self {
        value.0
    }
}

impl fmt::Display for ModulePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A module as stored, with its current position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Store key.
    pub id: ModuleId,
    /// Owning course.
    pub course_id: CourseId,
    /// Display title.
    pub title: String,
    /// Current one-based position.
    pub position: ModulePosition,
}

/// Validation failures for [`NewModule`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NewModuleError {
    /// Title was blank once trimmed.
    #[error("module title must not be empty")]
    EmptyTitle,
    /// Title exceeded [`MODULE_TITLE_MAX`].
    #[error("module title must be at most {max} characters")]
    TitleTooLong {
        /// Maximum accepted length.
        max: usize,
    },
}

/// Request to append a module to a course.
///
/// The position is not part of the request: appends always land at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewModule {
    course_id: CourseId,
    title: String,
}

impl NewModule {
    /// Validate the title and build the request.
    ///
    /// # Examples
    /// ```
    /// use academy::domain::{CourseId, NewModule};
    ///
    /// let module = NewModule::new(CourseId::new(3), "  Ownership  ").expect("valid module");
    /// assert_eq!(module.title(), "Ownership");
    /// assert!(NewModule::new(CourseId::new(3), " ").is_err());
    /// ```
    pub fn new(course_id: CourseId, title: impl AsRef<str>) -> Result<Self, NewModuleError> {
        let title = title.as_ref().trim();
        if title.is_empty() {
            return Err(NewModuleError::EmptyTitle);
        }
        if title.chars().count() > MODULE_TITLE_MAX {
            return Err(NewModuleError::TitleTooLong {
                max: MODULE_TITLE_MAX,
            });
        }
        Ok(Self {
            course_id,
            title: title.to_owned(),
        })
    }

    /// Target course.
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    /// Trimmed title.
    pub fn title(&self) -> &str {
        &self.title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0)]
    #[case(-3)]
    fn positions_must_be_positive(#[case] raw: i32) {
        assert_eq!(ModulePosition::new(raw), Err(InvalidPosition(raw)));
    }

    #[rstest]
    fn previous_stops_at_first_slot() {
        assert_eq!(ModulePosition::FIRST.previous(), None);
        let third = ModulePosition::new(3).expect("valid position");
        assert_eq!(third.previous().map(ModulePosition::get), Some(2));
    }

    #[rstest]
    fn new_module_rejects_blank_titles() {
        assert_eq!(
            NewModule::new(CourseId::new(1), "\t "),
            Err(NewModuleError::EmptyTitle)
        );
    }

    #[rstest]
    fn new_module_rejects_overlong_titles() {
        let title = "x".repeat(MODULE_TITLE_MAX + 1);
        assert_eq!(
            NewModule::new(CourseId::new(1), title),
            Err(NewModuleError::TitleTooLong {
                max: MODULE_TITLE_MAX
            })
        );
    }
}
