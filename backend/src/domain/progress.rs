//! Per-user module progress and course completion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Certificate, Course, CourseId, Module, ModuleId, Money};

/// A module as one learner sees it.
///
/// Users without a purchase see every module as not completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgress {
    /// The module and its current position.
    #[serde(flatten)]
    pub module: Module,
    /// The learner's completion flag.
    pub is_completed: bool,
}

/// Raw counts read from the store for one (user, course) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressCounts {
    /// Modules currently in the course.
    pub total: u32,
    /// Modules the user has completed.
    pub completed: u32,
}

/// Completion summary for one user in one course.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    /// Course summarised.
    pub course_id: CourseId,
    /// Modules currently in the course.
    pub total: u32,
    /// Modules the user has completed.
    pub completed: u32,
    /// `completed / total * 100`, or `0` for an empty course.
    pub percentage: f64,
}

impl CourseProgress {
    /// Summarise counts. Completed modules beyond the total are clamped.
    ///
    /// # Examples
    /// ```
    /// use academy::domain::{CourseId, CourseProgress, ProgressCounts};
    ///
    /// let progress = CourseProgress::from_counts(
    ///     CourseId::new(1),
    ///     ProgressCounts { total: 4, completed: 1 },
    /// );
    /// assert_eq!(progress.percentage, 25.0);
    /// assert!(!progress.is_complete());
    /// ```
    pub fn from_counts(course_id: CourseId, counts: ProgressCounts) -> Self {
        let completed = counts.completed.min(counts.total);
        let percentage = if counts.total == 0 {
            0.0
        } else {
            f64::from(completed) / f64::from(counts.total) * 100.0
        };
        Self {
            course_id,
            total: counts.total,
            completed,
            percentage,
        }
    }

    /// Whether every module is complete. An empty course is never complete.
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

/// Outcome of writing a completion flag, before certificate issuance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionChange {
    /// Course owning the module.
    pub course_id: CourseId,
    /// Module whose flag was written.
    pub module_id: ModuleId,
    /// Flag now stored.
    pub is_completed: bool,
    /// Progress recomputed in the same transaction as the write.
    pub progress: CourseProgress,
}

/// Result returned to callers of a completion toggle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleCompletionOutcome {
    /// Module whose flag was written.
    pub module_id: ModuleId,
    /// Flag now stored.
    pub is_completed: bool,
    /// Course progress after the write.
    pub progress: CourseProgress,
    /// Certificate held for the course, if any.
    pub certificate: Option<Certificate>,
}

/// A purchased course with the buyer's progress in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledCourse {
    /// The course as currently priced.
    #[serde(flatten)]
    pub course: Course,
    /// Price charged at purchase time.
    pub amount_paid: Money,
    /// When the purchase committed.
    pub purchased_at: DateTime<Utc>,
    /// Completion summary for the buyer.
    pub progress: CourseProgress,
}
