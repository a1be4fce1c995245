//! Certificate visibility and downloads.

use sha2::{Digest, Sha256};

use super::*;
use crate::domain::ports::{CompleteLessonRequest, LessonProgression, LessonRequest};
use crate::domain::{CertificateId, ErrorCode, LearnerIdentity};
use crate::test_support::TestEngine;
use crate::test_support::fixtures::CourseBuilder;

/// Finish a one-lesson course and return the learner with the issued certificate.
async fn graduate(engine: &TestEngine) -> (LearnerIdentity, CertificateId) {
    let learner = engine.add_learner("Katherine Johnson");
    let course = engine.add_course(CourseBuilder::new("Orbital Mechanics").lessons(1));
    engine.enroll(&learner, &course);
    let completion = engine
        .lesson_service()
        .complete_lesson(CompleteLessonRequest {
            lesson: LessonRequest {
                learner_id: learner.id,
                course_id: course.course.id,
                lesson_id: course.lesson(0).id,
            },
            watched_seconds: 0,
            finished: true,
        })
        .await
        .expect("course completed");
    let certificate_id = completion.certificate_id.expect("certificate issued");
    (learner, certificate_id)
}

#[tokio::test]
async fn owner_reads_their_certificate() {
    let engine = TestEngine::new();
    let (learner, certificate_id) = graduate(&engine).await;

    let payload = engine
        .certificate_service()
        .certificate(CertificateRequest {
            learner_id: learner.id,
            certificate_id,
        })
        .await
        .expect("certificate");
    assert_eq!(payload.learner_name, "Katherine Johnson");
    assert_eq!(payload.course_title, "Orbital Mechanics");
    assert_eq!(payload.learner_id, learner.id);
    assert_eq!(payload.issued_at, engine.now());
}

#[tokio::test]
async fn other_learners_are_refused_but_admins_may_read() {
    let engine = TestEngine::new();
    let (_, certificate_id) = graduate(&engine).await;
    let service = engine.certificate_service();

    let peer = engine.add_learner("Curious Peer");
    let error = service
        .certificate(CertificateRequest {
            learner_id: peer.id,
            certificate_id,
        })
        .await
        .expect_err("foreign certificate");
    assert_eq!(error.code(), ErrorCode::Forbidden);

    let admin = engine.add_staff("Registrar", vec![LearnerRole::Admin]);
    let payload = service
        .certificate(CertificateRequest {
            learner_id: admin.id,
            certificate_id,
        })
        .await
        .expect("admin read");
    assert_eq!(payload.learner_name, "Katherine Johnson");
}

#[tokio::test]
async fn unknown_certificates_are_not_found() {
    let engine = TestEngine::new();
    let learner = engine.add_learner("Nobody Yet");
    let error = engine
        .certificate_service()
        .certificate(CertificateRequest {
            learner_id: learner.id,
            certificate_id: CertificateId::random(),
        })
        .await
        .expect_err("missing certificate");
    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn download_returns_the_rendered_document_with_its_digest() {
    let engine = TestEngine::new();
    let (learner, certificate_id) = graduate(&engine).await;

    let file = engine
        .certificate_service()
        .download(CertificateRequest {
            learner_id: learner.id,
            certificate_id,
        })
        .await
        .expect("download");
    assert!(!file.bytes.is_empty());
    assert_eq!(file.digest, hex::encode(Sha256::digest(&file.bytes)));
    assert!(String::from_utf8_lossy(&file.bytes).contains("Orbital Mechanics"));
    assert_eq!(engine.renderer.render_count(), 1);
}
