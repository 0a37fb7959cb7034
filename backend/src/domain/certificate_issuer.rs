//! At-most-once certificate issuance.
//!
//! Order of effects: look up an existing row, render, write the artifact,
//! insert the row. The unique `(user_id, course_id)` constraint decides races;
//! a loser re-reads the winner's row and reports it as already issued. A row
//! is never inserted before its artifact is stored.

use std::sync::Arc;

use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::ports::{
    ArtifactStore, ArtifactStoreError, CertificateRenderer, CertificateRepository,
    CertificateRepositoryError,
};
use crate::domain::{
    ArtifactKey, Certificate, CertificateDetails, CertificateIssuance, CourseId, Error,
    NewCertificate, UserId,
};

/// Issues certificates through the certificate repository, renderer and
/// artifact store.
pub struct CertificateIssuer<C, G, A> {
    certificates: Arc<C>,
    renderer: Arc<G>,
    artifacts: Arc<A>,
    clock: Arc<dyn Clock>,
}

impl<C, G, A> Clone for CertificateIssuer<C, G, A> {
    fn clone(&self) -> Self {
        Self {
            certificates: Arc::clone(&self.certificates),
            renderer: Arc::clone(&self.renderer),
            artifacts: Arc::clone(&self.artifacts),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C, G, A> CertificateIssuer<C, G, A> {
    /// Create an issuer.
    pub fn new(
        certificates: Arc<C>,
        renderer: Arc<G>,
        artifacts: Arc<A>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            certificates,
            renderer,
            artifacts,
            clock,
        }
    }
}

impl<C, G, A> CertificateIssuer<C, G, A>
where
    C: CertificateRepository,
    G: CertificateRenderer,
    A: ArtifactStore,
{
    /// Stored certificate for the pair, if any.
    pub async fn find(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Certificate>, Error> {
        self.certificates
            .find_certificate(user_id, course_id)
            .await
            .map_err(map_certificate_error)
    }

    /// Issue the certificate for a course the caller has verified complete.
    ///
    /// # Errors
    ///
    /// `ArtifactWriteFailed` when rendering or storing fails; no row is
    /// written in that case and a later call may retry.
    pub async fn issue(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<CertificateIssuance, Error> {
        if let Some(existing) = self.find(user_id, course_id).await? {
            return Ok(CertificateIssuance::AlreadyIssued(existing));
        }

        let issued_at = self.clock.utc();
        let subject = self
            .certificates
            .find_subject(user_id, course_id)
            .await
            .map_err(map_certificate_error)?
            .ok_or_else(|| {
                Error::not_found("certificate holder or course not found").with_details(json!({
                    "userId": user_id,
                    "courseId": course_id,
                }))
            })?;
        let details = CertificateDetails::new(subject, issued_at.date_naive())
            .map_err(|err| Error::artifact_write_failed(err.to_string()))?;

        let artifact = self.renderer.render(&details).map_err(|err| {
            warn!(%user_id, %course_id, error = %err, "certificate rendering failed");
            Error::artifact_write_failed(err.to_string())
        })?;
        let key = ArtifactKey::for_certificate(user_id, course_id, artifact.extension);
        let file_url = self
            .artifacts
            .put(&key, &artifact)
            .await
            .map_err(|err| map_artifact_error(user_id, course_id, err))?;

        let new_certificate = NewCertificate {
            user_id,
            course_id,
            file_url,
            issued_at,
        };
        match self.certificates.insert_certificate(&new_certificate).await {
            Ok(certificate) => {
                info!(
                    %user_id,
                    %course_id,
                    certificate_id = %certificate.id,
                    file_url = %certificate.file_url,
                    "certificate issued"
                );
                Ok(CertificateIssuance::Issued(certificate))
            }
            Err(CertificateRepositoryError::Duplicate { .. }) => {
                warn!(%user_id, %course_id, "certificate insert lost race; returning winner");
                let winner = self.find(user_id, course_id).await?.ok_or_else(|| {
                    Error::store_conflict(
                        "certificate insert conflicted but no certificate was found",
                    )
                })?;
                Ok(CertificateIssuance::AlreadyIssued(winner))
            }
            Err(error) => Err(map_certificate_error(error)),
        }
    }
}

fn map_certificate_error(error: CertificateRepositoryError) -> Error {
    match error {
        CertificateRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("certificate repository unavailable: {message}"))
        }
        CertificateRepositoryError::Query { message } => {
            Error::internal(format!("certificate repository error: {message}"))
        }
        CertificateRepositoryError::Duplicate { message } => {
            Error::store_conflict(format!("certificate already exists: {message}"))
        }
    }
}

fn map_artifact_error(user_id: UserId, course_id: CourseId, error: ArtifactStoreError) -> Error {
    warn!(%user_id, %course_id, error = %error, "certificate artifact write failed");
    Error::artifact_write_failed(error.to_string()).with_details(json!({
        "userId": user_id,
        "courseId": course_id,
    }))
}

#[cfg(test)]
#[path = "certificate_issuer_tests.rs"]
mod tests;
