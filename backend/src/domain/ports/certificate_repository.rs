//! Driven port for certificate rows.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{Certificate, CertificateSubject, CourseId, NewCertificate, UserId};

define_port_error! {
    /// Errors raised by certificate persistence adapters.
    pub enum CertificateRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "certificate repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "certificate repository query failed: {message}",
        /// A certificate for the pair was inserted first by someone else.
        Duplicate { message: String } => "certificate already exists: {message}",
    }
}

/// Port for certificate lookup and insertion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CertificateRepository: Send + Sync {
    /// Stored certificate for the pair, if any.
    async fn find_certificate(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Certificate>, CertificateRepositoryError>;

    /// Names to print, or `None` when the user or course is missing.
    async fn find_subject(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<CertificateSubject>, CertificateRepositoryError>;

    /// Insert a certificate. A unique violation on the pair must surface as
    /// [`CertificateRepositoryError::Duplicate`].
    async fn insert_certificate(
        &self,
        certificate: &NewCertificate,
    ) -> Result<Certificate, CertificateRepositoryError>;
}
