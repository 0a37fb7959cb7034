//! PostgreSQL-backed certificate adapter.
//!
//! `UNIQUE (user_id, course_id)` on `certificates` decides concurrent
//! issuance; the losing insert surfaces as
//! [`CertificateRepositoryError::Duplicate`] so the issuer can re-read the
//! winner.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{CertificateRepository, CertificateRepositoryError};
use crate::domain::{Certificate, CertificateSubject, CourseId, NewCertificate, UserId};

use super::diesel_helpers::{DieselFailure, classify_diesel_error, map_pool_error_message};
use super::models::{CertificateRow, NewCertificateRow};
use super::pool::{DbPool, PoolError};
use super::schema::{certificates, courses, users};

/// Diesel-backed implementation of [`CertificateRepository`].
#[derive(Clone)]
pub struct DieselCertificateRepository {
    pool: DbPool,
}

impl DieselCertificateRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CertificateRepositoryError {
    CertificateRepositoryError::connection(map_pool_error_message(error))
}

const CERTIFICATE_KEY: &str = "certificates_user_course_key";

fn map_diesel_error(error: DieselError, operation: &str) -> CertificateRepositoryError {
    map_failure(classify_diesel_error(error, operation))
}

fn map_failure(failure: DieselFailure) -> CertificateRepositoryError {
    let duplicate = failure.violates(CERTIFICATE_KEY);
    match failure {
        DieselFailure::Connection(message) => CertificateRepositoryError::connection(message),
        DieselFailure::UniqueViolation { message, .. } if duplicate => {
            CertificateRepositoryError::duplicate(message)
        }
        DieselFailure::UniqueViolation { message, .. } | DieselFailure::Query(message) => {
            CertificateRepositoryError::query(message)
        }
    }
}

#[async_trait]
impl CertificateRepository for DieselCertificateRepository {
    async fn find_certificate(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Certificate>, CertificateRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<CertificateRow> = certificates::table
            .filter(certificates::user_id.eq(*user_id.as_uuid()))
            .filter(certificates::course_id.eq(course_id.get()))
            .select(CertificateRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|error| map_diesel_error(error, "find certificate"))?;
        Ok(row.map(Certificate::from))
    }

    async fn find_subject(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<CertificateSubject>, CertificateRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let display_name: Option<String> = users::table
            .find(*user_id.as_uuid())
            .select(users::display_name)
            .first(&mut conn)
            .await
            .optional()
            .map_err(|error| map_diesel_error(error, "find holder"))?;
        let Some(display_name) = display_name else {
            return Ok(None);
        };

        let course: Option<(String, String)> = courses::table
            .find(course_id.get())
            .select((courses::title, courses::instructor))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|error| map_diesel_error(error, "find course"))?;

        Ok(course.map(|(course_title, instructor)| CertificateSubject {
            display_name,
            course_title,
            instructor,
        }))
    }

    async fn insert_certificate(
        &self,
        certificate: &NewCertificate,
    ) -> Result<Certificate, CertificateRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: CertificateRow = diesel::insert_into(certificates::table)
            .values(&NewCertificateRow {
                user_id: *certificate.user_id.as_uuid(),
                course_id: certificate.course_id.get(),
                file_url: &certificate.file_url,
                issued_at: certificate.issued_at,
            })
            .returning(CertificateRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|error| map_diesel_error(error, "insert certificate"))?;
        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for certificate error mapping.
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn pool_error_maps_to_connection_error() {
        let error = map_pool_error(PoolError::checkout("connection refused"));

        assert!(matches!(error, CertificateRepositoryError::Connection { .. }));
    }

    #[rstest]
    fn missing_row_maps_to_query_error() {
        let error = map_diesel_error(DieselError::NotFound, "find certificate");

        assert!(matches!(error, CertificateRepositoryError::Query { .. }));
        assert!(error.to_string().contains("record not found"));
    }

    #[rstest]
    #[case(Some(CERTIFICATE_KEY), true)]
    #[case(Some("certificates_pkey"), false)]
    #[case(None, false)]
    fn only_the_user_course_key_is_a_duplicate(
        #[case] constraint: Option<&str>,
        #[case] duplicate: bool,
    ) {
        let error = map_failure(DieselFailure::UniqueViolation {
            constraint: constraint.map(str::to_owned),
            message: "duplicate key value".to_owned(),
        });

        assert_eq!(
            matches!(error, CertificateRepositoryError::Duplicate { .. }),
            duplicate
        );
    }
}
