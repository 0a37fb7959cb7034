//! Driven port for module progress rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::define_port_error;
use crate::domain::{
    CompletionChange, CourseId, EnrolledCourse, ModuleId, ModuleProgress, ProgressCounts, UserId,
};

define_port_error! {
    /// Errors raised by progress persistence adapters.
    pub enum ProgressRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "progress repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "progress repository query failed: {message}",
        /// The course does not exist.
        CourseNotFound { course_id: CourseId } => "course {course_id} not found",
        /// The user does not exist.
        UserNotFound { user_id: UserId } => "user {user_id} not found",
        /// The module does not exist.
        ModuleNotFound { module_id: ModuleId } => "module {module_id} not found",
        /// The user has no progress row for the module.
        NoProgressRecord { user_id: UserId, module_id: ModuleId } =>
            "user {user_id} has no progress record for module {module_id}",
    }
}

/// Port for reading and writing progress rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Write the completion flag of one existing row and recompute the
    /// user's counts for the module's course in the same transaction.
    async fn set_completion(
        &self,
        user_id: UserId,
        module_id: ModuleId,
        completed: bool,
        updated_at: DateTime<Utc>,
    ) -> Result<CompletionChange, ProgressRepositoryError>;

    /// Module total and completed count for the pair.
    async fn progress_counts(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<ProgressCounts, ProgressRepositoryError>;

    /// Insert every missing purchaser × module row for the course and return
    /// how many were created.
    async fn reprovision_course(
        &self,
        course_id: CourseId,
        provisioned_at: DateTime<Utc>,
    ) -> Result<usize, ProgressRepositoryError>;

    /// Every module of the course in position order, flagged with the
    /// user's completion state.
    async fn learner_modules(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<ModuleProgress>, ProgressRepositoryError>;

    /// One module flagged with the user's completion state.
    async fn learner_module(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<ModuleProgress, ProgressRepositoryError>;

    /// Courses the user bought, newest purchase first, each with the user's
    /// progress read from the same snapshot.
    async fn enrolled_courses(
        &self,
        user_id: UserId,
    ) -> Result<Vec<EnrolledCourse>, ProgressRepositoryError>;
}
