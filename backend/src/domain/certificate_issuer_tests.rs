//! Tests for certificate issuance ordering and race recovery.

use std::sync::Arc;

use mockall::Sequence;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{
    CertificateRenderError, MockArtifactStore, MockCertificateRenderer, MockCertificateRepository,
};
use crate::domain::test_clock::{fixture_clock, fixture_timestamp};
use crate::domain::{CertificateId, CertificateSubject, ErrorCode, RenderedArtifact};

type Issuer =
    CertificateIssuer<MockCertificateRepository, MockCertificateRenderer, MockArtifactStore>;

const COURSE: CourseId = CourseId::new(3);

#[fixture]
fn user_id() -> UserId {
    UserId::random()
}

fn certificate(user_id: UserId, id: i64) -> Certificate {
    Certificate {
        id: CertificateId::new(id),
        user_id,
        course_id: COURSE,
        file_url: format!("https://cdn.test/certificates/{id}.svg"),
        issued_at: fixture_timestamp(),
    }
}

fn subject() -> CertificateSubject {
    CertificateSubject {
        display_name: "Ada Lovelace".to_owned(),
        course_title: "Analytical Engines".to_owned(),
        instructor: "Charles Babbage".to_owned(),
    }
}

fn artifact() -> RenderedArtifact {
    RenderedArtifact {
        bytes: b"<svg/>".to_vec(),
        extension: "svg",
        content_type: "image/svg+xml",
    }
}

fn make_issuer(
    certificates: MockCertificateRepository,
    renderer: MockCertificateRenderer,
    artifacts: MockArtifactStore,
) -> Issuer {
    CertificateIssuer::new(
        Arc::new(certificates),
        Arc::new(renderer),
        Arc::new(artifacts),
        fixture_clock(),
    )
}

#[rstest]
#[tokio::test]
async fn existing_certificate_is_returned_without_rendering(user_id: UserId) {
    let existing = certificate(user_id, 1);
    let expected = existing.clone();
    let mut certificates = MockCertificateRepository::new();
    certificates
        .expect_find_certificate()
        .times(1)
        .return_once(move |_, _| Ok(Some(existing)));
    certificates.expect_insert_certificate().never();
    let mut renderer = MockCertificateRenderer::new();
    renderer.expect_render().never();
    let mut artifacts = MockArtifactStore::new();
    artifacts.expect_put().never();

    let issuance = make_issuer(certificates, renderer, artifacts)
        .issue(user_id, COURSE)
        .await
        .expect("issuance succeeds");

    assert_eq!(issuance, CertificateIssuance::AlreadyIssued(expected));
}

#[rstest]
#[tokio::test]
async fn artifact_is_stored_before_row_is_inserted(user_id: UserId) {
    let mut seq = Sequence::new();
    let mut certificates = MockCertificateRepository::new();
    let mut renderer = MockCertificateRenderer::new();
    let mut artifacts = MockArtifactStore::new();

    certificates
        .expect_find_certificate()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(|_, _| Ok(None));
    certificates
        .expect_find_subject()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(|_, _| Ok(Some(subject())));
    renderer
        .expect_render()
        .withf(|details| {
            details.display_name() == "Ada Lovelace"
                && details.completed_on() == fixture_timestamp().date_naive()
        })
        .times(1)
        .in_sequence(&mut seq)
        .return_once(|_| Ok(artifact()));
    artifacts
        .expect_put()
        .withf(move |key, _| {
            key.as_str() == format!("certificates/cert_user{user_id}_course3.svg")
        })
        .times(1)
        .in_sequence(&mut seq)
        .return_once(|_, _| Ok("https://cdn.test/certificates/a.svg".to_owned()));
    certificates
        .expect_insert_certificate()
        .withf(|new| new.file_url == "https://cdn.test/certificates/a.svg")
        .times(1)
        .in_sequence(&mut seq)
        .return_once(move |new| {
            Ok(Certificate {
                id: CertificateId::new(8),
                user_id: new.user_id,
                course_id: new.course_id,
                file_url: new.file_url.clone(),
                issued_at: new.issued_at,
            })
        });

    let issuance = make_issuer(certificates, renderer, artifacts)
        .issue(user_id, COURSE)
        .await
        .expect("issuance succeeds");

    assert!(matches!(issuance, CertificateIssuance::Issued(_)));
    assert_eq!(issuance.certificate().id, CertificateId::new(8));
}

#[rstest]
#[tokio::test]
async fn artifact_failure_aborts_without_row(user_id: UserId) {
    let mut certificates = MockCertificateRepository::new();
    certificates
        .expect_find_certificate()
        .times(1)
        .return_once(|_, _| Ok(None));
    certificates
        .expect_find_subject()
        .times(1)
        .return_once(|_, _| Ok(Some(subject())));
    certificates.expect_insert_certificate().never();
    let mut renderer = MockCertificateRenderer::new();
    renderer.expect_render().times(1).return_once(|_| Ok(artifact()));
    let mut artifacts = MockArtifactStore::new();
    artifacts
        .expect_put()
        .times(1)
        .return_once(|_, _| Err(ArtifactStoreError::write("disk full")));

    let error = make_issuer(certificates, renderer, artifacts)
        .issue(user_id, COURSE)
        .await
        .expect_err("artifact failure surfaces");

    assert_eq!(error.code(), ErrorCode::ArtifactWriteFailed);
}

#[rstest]
#[tokio::test]
async fn render_failure_aborts_before_storage(user_id: UserId) {
    let mut certificates = MockCertificateRepository::new();
    certificates
        .expect_find_certificate()
        .times(1)
        .return_once(|_, _| Ok(None));
    certificates
        .expect_find_subject()
        .times(1)
        .return_once(|_, _| Ok(Some(subject())));
    certificates.expect_insert_certificate().never();
    let mut renderer = MockCertificateRenderer::new();
    renderer
        .expect_render()
        .times(1)
        .return_once(|_| Err(CertificateRenderError::render("font missing")));
    let mut artifacts = MockArtifactStore::new();
    artifacts.expect_put().never();

    let error = make_issuer(certificates, renderer, artifacts)
        .issue(user_id, COURSE)
        .await
        .expect_err("render failure surfaces");

    assert_eq!(error.code(), ErrorCode::ArtifactWriteFailed);
}

#[rstest]
#[tokio::test]
async fn lost_insert_race_returns_the_winner(user_id: UserId) {
    let winner = certificate(user_id, 21);
    let expected = winner.clone();
    let mut seq = Sequence::new();
    let mut certificates = MockCertificateRepository::new();
    certificates
        .expect_find_certificate()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(|_, _| Ok(None));
    certificates
        .expect_find_subject()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(|_, _| Ok(Some(subject())));
    certificates
        .expect_insert_certificate()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(|_| Err(CertificateRepositoryError::duplicate("certificates_user_course")));
    certificates
        .expect_find_certificate()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(move |_, _| Ok(Some(winner)));
    let mut renderer = MockCertificateRenderer::new();
    renderer.expect_render().times(1).return_once(|_| Ok(artifact()));
    let mut artifacts = MockArtifactStore::new();
    artifacts
        .expect_put()
        .times(1)
        .return_once(|_, _| Ok("https://cdn.test/certificates/b.svg".to_owned()));

    let issuance = make_issuer(certificates, renderer, artifacts)
        .issue(user_id, COURSE)
        .await
        .expect("race recovered");

    assert_eq!(issuance, CertificateIssuance::AlreadyIssued(expected));
}

#[rstest]
#[tokio::test]
async fn missing_subject_is_not_found(user_id: UserId) {
    let mut certificates = MockCertificateRepository::new();
    certificates
        .expect_find_certificate()
        .times(1)
        .return_once(|_, _| Ok(None));
    certificates
        .expect_find_subject()
        .times(1)
        .return_once(|_, _| Ok(None));

    let error = make_issuer(
        certificates,
        MockCertificateRenderer::new(),
        MockArtifactStore::new(),
    )
    .issue(user_id, COURSE)
    .await
    .expect_err("subject missing");

    assert_eq!(error.code(), ErrorCode::NotFound);
}
