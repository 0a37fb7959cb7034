//! Driving port for completion toggles and certificate claims.

use async_trait::async_trait;

use crate::domain::{Certificate, CourseId, Error, ModuleCompletionOutcome, ModuleId, UserId};

/// Request to set a module's completion flag for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetModuleCompletionRequest {
    /// Learner.
    pub user_id: UserId,
    /// Module to mark.
    pub module_id: ModuleId,
    /// New flag.
    pub completed: bool,
}

/// Driving port for the progress aggregator and certificate issuer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressCommand: Send + Sync {
    /// Write the flag, recompute progress and issue a certificate when the
    /// course becomes complete.
    ///
    /// # Errors
    ///
    /// `NoProgressRecord` when the user never bought the module's course.
    /// `ArtifactWriteFailed` when issuance failed after the flag was stored;
    /// the flag stays written and [`ProgressCommand::claim_certificate`]
    /// retries issuance.
    async fn set_module_completion(
        &self,
        request: SetModuleCompletionRequest,
    ) -> Result<ModuleCompletionOutcome, Error>;

    /// Issue (or return) the certificate of a completed course.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` when the course is not complete for the user.
    async fn claim_certificate(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Certificate, Error>;

    /// Create any missing progress rows for a course.
    async fn reprovision_course(&self, course_id: CourseId) -> Result<usize, Error>;
}
