//! Progress aggregator service.
//!
//! Completion toggles are written and re-counted in one repository
//! transaction. When the recount reports every module complete the
//! [`CertificateIssuer`] runs after that transaction commits, so a slow
//! artifact write never holds row locks. Issuance failures leave the stored
//! flag in place; [`ProgressCommand::claim_certificate`] retries them.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::ports::{
    ArtifactStore, CertificateRenderer, CertificateRepository, ProgressCommand, ProgressQuery,
    ProgressRepository, ProgressRepositoryError, SetModuleCompletionRequest,
};
use crate::domain::{
    Certificate, CertificateIssuer, CourseId, CourseProgress, EnrolledCourse, Error,
    ModuleCompletionOutcome, ModuleId, ModuleProgress, UserId,
};

/// Service implementing [`ProgressCommand`] and [`ProgressQuery`].
pub struct ProgressService<P, C, G, A> {
    progress: Arc<P>,
    issuer: CertificateIssuer<C, G, A>,
    clock: Arc<dyn Clock>,
}

impl<P, C, G, A> Clone for ProgressService<P, C, G, A> {
    fn clone(&self) -> Self {
        Self {
            progress: Arc::clone(&self.progress),
            issuer: self.issuer.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<P, C, G, A> ProgressService<P, C, G, A> {
    /// Create the service.
    pub fn new(
        progress: Arc<P>,
        issuer: CertificateIssuer<C, G, A>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            progress,
            issuer,
            clock,
        }
    }
}

impl<P, C, G, A> ProgressService<P, C, G, A>
where
    P: ProgressRepository,
    C: CertificateRepository,
    G: CertificateRenderer,
    A: ArtifactStore,
{
    async fn load_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<CourseProgress, Error> {
        let counts = self
            .progress
            .progress_counts(user_id, course_id)
            .await
            .map_err(map_progress_error)?;
        Ok(CourseProgress::from_counts(course_id, counts))
    }
}

#[async_trait]
impl<P, C, G, A> ProgressCommand for ProgressService<P, C, G, A>
where
    P: ProgressRepository,
    C: CertificateRepository,
    G: CertificateRenderer,
    A: ArtifactStore,
{
    async fn set_module_completion(
        &self,
        request: SetModuleCompletionRequest,
    ) -> Result<ModuleCompletionOutcome, Error> {
        let SetModuleCompletionRequest {
            user_id,
            module_id,
            completed,
        } = request;
        let change = self
            .progress
            .set_completion(user_id, module_id, completed, self.clock.utc())
            .await
            .map_err(map_progress_error)?;

        let certificate = if change.progress.is_complete() {
            let issuance = self
                .issuer
                .issue(user_id, change.course_id)
                .await
                .inspect_err(|err| {
                    warn!(
                        %user_id,
                        course_id = %change.course_id,
                        code = ?err.code(),
                        "course complete but certificate issuance failed"
                    );
                })?;
            Some(issuance.into_certificate())
        } else {
            self.issuer.find(user_id, change.course_id).await?
        };

        Ok(ModuleCompletionOutcome {
            module_id: change.module_id,
            is_completed: change.is_completed,
            progress: change.progress,
            certificate,
        })
    }

    async fn claim_certificate(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Certificate, Error> {
        let progress = self.load_progress(user_id, course_id).await?;
        if !progress.is_complete() {
            return Err(
                Error::invalid_request(format!("course {course_id} is not complete"))
                    .with_details(json!({
                        "courseId": course_id,
                        "completed": progress.completed,
                        "total": progress.total,
                    })),
            );
        }
        self.issuer
            .issue(user_id, course_id)
            .await
            .map(|issuance| issuance.into_certificate())
    }

    async fn reprovision_course(&self, course_id: CourseId) -> Result<usize, Error> {
        let created = self
            .progress
            .reprovision_course(course_id, self.clock.utc())
            .await
            .map_err(map_progress_error)?;
        if created > 0 {
            warn!(%course_id, created, "reprovisioning created missing progress rows");
        } else {
            info!(%course_id, "progress rows already complete");
        }
        Ok(created)
    }
}

#[async_trait]
impl<P, C, G, A> ProgressQuery for ProgressService<P, C, G, A>
where
    P: ProgressRepository,
    C: CertificateRepository,
    G: CertificateRenderer,
    A: ArtifactStore,
{
    async fn course_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<CourseProgress, Error> {
        self.load_progress(user_id, course_id).await
    }

    async fn certificate(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Certificate>, Error> {
        self.issuer.find(user_id, course_id).await
    }

    async fn learner_modules(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<ModuleProgress>, Error> {
        self.progress
            .learner_modules(user_id, course_id)
            .await
            .map_err(map_progress_error)
    }

    async fn learner_module(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<ModuleProgress, Error> {
        self.progress
            .learner_module(user_id, module_id)
            .await
            .map_err(map_progress_error)
    }

    async fn enrolled_courses(&self, user_id: UserId) -> Result<Vec<EnrolledCourse>, Error> {
        self.progress
            .enrolled_courses(user_id)
            .await
            .map_err(map_progress_error)
    }
}

fn map_progress_error(error: ProgressRepositoryError) -> Error {
    match error {
        ProgressRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("progress repository unavailable: {message}"))
        }
        ProgressRepositoryError::Query { message } => {
            Error::internal(format!("progress repository error: {message}"))
        }
        ProgressRepositoryError::CourseNotFound { course_id } => {
            Error::not_found(format!("course {course_id} not found"))
                .with_details(json!({ "courseId": course_id }))
        }
        ProgressRepositoryError::UserNotFound { user_id } => {
            Error::not_found(format!("user {user_id} not found"))
                .with_details(json!({ "userId": user_id }))
        }
        ProgressRepositoryError::ModuleNotFound { module_id } => {
            Error::not_found(format!("module {module_id} not found"))
                .with_details(json!({ "moduleId": module_id }))
        }
        ProgressRepositoryError::NoProgressRecord { user_id, module_id } => {
            Error::no_progress_record(format!(
                "user {user_id} has no progress record for module {module_id}"
            ))
            .with_details(json!({ "userId": user_id, "moduleId": module_id }))
        }
    }
}

#[cfg(test)]
#[path = "progress_service_tests.rs"]
mod tests;
