//! Driving port for progress and certificate reads.

use async_trait::async_trait;

use crate::domain::{
    Certificate, CourseId, CourseProgress, EnrolledCourse, Error, ModuleId, ModuleProgress, UserId,
};

/// Driving port for read-only progress views.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressQuery: Send + Sync {
    /// Completion summary for the pair. Users without a purchase see the
    /// course total with nothing completed.
    async fn course_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<CourseProgress, Error>;

    /// Stored certificate for the pair, if any.
    async fn certificate(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Certificate>, Error>;

    /// Modules of the course in position order with the user's completion
    /// flags.
    async fn learner_modules(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<ModuleProgress>, Error>;

    /// One module with the user's completion flag.
    async fn learner_module(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<ModuleProgress, Error>;

    /// Purchased courses with progress, newest purchase first.
    async fn enrolled_courses(&self, user_id: UserId) -> Result<Vec<EnrolledCourse>, Error>;
}
