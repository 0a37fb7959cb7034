//! Completion certificates.
//!
//! A certificate exists at most once per (user, course). The row is the source
//! of truth; the rendered artifact is written first and referenced by URL.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{CertificateId, CourseId, UserId};

/// A stored certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    /// Store key.
    pub id: CertificateId,
    /// Holder.
    pub user_id: UserId,
    /// Completed course.
    pub course_id: CourseId,
    /// Public URL of the rendered artifact.
    pub file_url: String,
    /// Issue timestamp.
    pub issued_at: DateTime<Utc>,
}

/// Row to insert once the artifact is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCertificate {
    /// Holder.
    pub user_id: UserId,
    /// Completed course.
    pub course_id: CourseId,
    /// Public URL of the rendered artifact.
    pub file_url: String,
    /// Issue timestamp.
    pub issued_at: DateTime<Utc>,
}

/// Names printed on a certificate, read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSubject {
    /// Holder's display name.
    pub display_name: String,
    /// Course title.
    pub course_title: String,
    /// Course instructor.
    pub instructor: String,
}

/// Raised when a certificate field is blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("certificate field `{field}` must not be empty")]
pub struct MissingCertificateField {
    /// Name of the blank field.
    pub field: &'static str,
}

/// Validated content of a certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateDetails {
    display_name: String,
    course_title: String,
    instructor: String,
    completed_on: NaiveDate,
}

impl CertificateDetails {
    /// Validate that every printed name is present.
    pub fn new(
        subject: CertificateSubject,
        completed_on: NaiveDate,
    ) -> Result<Self, MissingCertificateField> {
        let CertificateSubject {
            display_name,
            course_title,
            instructor,
        } = subject;
        for (field, value) in [
            ("display_name", &display_name),
            ("course_title", &course_title),
            ("instructor", &instructor),
        ] {
            if value.trim().is_empty() {
                return Err(MissingCertificateField { field });
            }
        }
        Ok(Self {
            display_name: display_name.trim().to_owned(),
            course_title: course_title.trim().to_owned(),
            instructor: instructor.trim().to_owned(),
            completed_on,
        })
    }

    /// Holder's display name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Course title.
    pub fn course_title(&self) -> &str {
        &self.course_title
    }

    /// Course instructor.
    pub fn instructor(&self) -> &str {
        &self.instructor
    }

    /// Completion date.
    pub fn completed_on(&self) -> NaiveDate {
        self.completed_on
    }
}

/// Bytes produced by a renderer plus their media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    /// Encoded document.
    pub bytes: Vec<u8>,
    /// File extension without the dot, e.g. `svg`.
    pub extension: &'static str,
    /// MIME type.
    pub content_type: &'static str,
}

/// Storage key of a certificate artifact, relative to the artifact root.
///
/// Keys are deterministic per (user, course) so concurrent issuers overwrite
/// the same object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey(String);

impl ArtifactKey {
    /// Key for a (user, course) certificate.
    ///
    /// # Examples
    /// ```
    /// use academy::domain::{ArtifactKey, CourseId, UserId};
    ///
    /// let user = UserId::new("3fa85f64-5717-4562-b3fc-2c963f66afa6").expect("uuid");
    /// let key = ArtifactKey::for_certificate(user, CourseId::new(7), "svg");
    /// assert_eq!(
    ///     key.as_str(),
    ///     "certificates/cert_user3fa85f64-5717-4562-b3fc-2c963f66afa6_course7.svg"
    /// );
    /// ```
    pub fn for_certificate(user_id: UserId, course_id: CourseId, extension: &str) -> Self {
        Self(format!(
            "certificates/cert_user{user_id}_course{course_id}.{extension}"
        ))
    }

    /// Key as a relative path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a certificate request was satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateIssuance {
    /// This call rendered, stored and inserted the certificate.
    Issued(Certificate),
    /// A certificate already existed, possibly inserted by a concurrent call.
    AlreadyIssued(Certificate),
}

impl CertificateIssuance {
    /// The certificate, however it was obtained.
    pub fn certificate(&self) -> &Certificate {
        match self {
            Self::Issued(certificate) | Self::AlreadyIssued(certificate) => certificate,
        }
    }

    /// Consume and return the certificate.
    pub fn into_certificate(self) -> Certificate {
        match self {
            Self::Issued(certificate) | Self::AlreadyIssued(certificate) => certificate,
        }
    }
}
