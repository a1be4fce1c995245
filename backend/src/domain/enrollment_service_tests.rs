//! Admission control and enrollment listing.

use std::sync::Arc;

use rstest::rstest;

use super::*;
use crate::domain::{Attempt, ErrorCode, LearnerIdentity, ProgressionPolicy, grade_submission};
use crate::test_support::fixtures::{CourseBuilder, CourseFixture, answers, quiz_for};
use crate::test_support::TestEngine;

fn request(learner_id: LearnerId, course: &CourseFixture) -> EnrollRequest {
    EnrollRequest {
        learner_id,
        course_id: course.course.id,
    }
}

#[tokio::test]
async fn enrolls_once_and_then_returns_the_same_enrollment() {
    let engine = TestEngine::new();
    let learner = engine.add_learner("Ada Lovelace");
    let course = engine.add_course(CourseBuilder::new("Analytical Engines").lessons(3));
    let service = engine.enrollment_service();

    let first = service
        .enroll(request(learner.id, &course))
        .await
        .expect("first enrollment");
    assert!(first.created);
    assert_eq!(first.enrollment.course_title, "Analytical Engines");
    assert_eq!(first.enrollment.progress_percent, 0.0);

    let second = service
        .enroll(request(learner.id, &course))
        .await
        .expect("repeat enrollment");
    assert!(!second.created);
    assert_eq!(second.enrollment.enrollment_id, first.enrollment.enrollment_id);
    assert_eq!(engine.store.enrollments_for(learner.id).len(), 1);
    assert_eq!(engine.notifier.subjects(), vec!["Enrollment confirmed".to_owned()]);
}

#[rstest]
#[case::unverified_email(
    |identity: &mut LearnerIdentity| identity.email_verified = false,
    ErrorCode::Forbidden
)]
#[case::deactivated(|identity: &mut LearnerIdentity| identity.is_active = false, ErrorCode::Forbidden)]
#[tokio::test]
async fn refuses_learners_who_may_not_enroll(
    #[case] change: fn(&mut LearnerIdentity),
    #[case] expected: ErrorCode,
) {
    let engine = TestEngine::new();
    let learner = engine.add_learner("Grace Hopper");
    engine.identities.update(learner.id, change);
    let course = engine.add_course(CourseBuilder::new("COBOL").lessons(1));

    let error = engine
        .enrollment_service()
        .enroll(request(learner.id, &course))
        .await
        .expect_err("refused");
    assert_eq!(error.code(), expected);
    assert!(engine.store.enrollments_for(learner.id).is_empty());
}

#[tokio::test]
async fn unknown_learner_is_not_found() {
    let engine = TestEngine::new();
    let course = engine.add_course(CourseBuilder::new("Ghosts").lessons(1));
    let error = engine
        .enrollment_service()
        .enroll(request(LearnerId::random(), &course))
        .await
        .expect_err("unknown learner");
    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn retired_and_unknown_courses_are_not_found() {
    let engine = TestEngine::new();
    let learner = engine.add_learner("Edsger Dijkstra");
    let mut retired = CourseBuilder::new("GOTO").lessons(1).build();
    retired.course.is_retired = true;
    engine.store.seed_course(&retired);
    let service = engine.enrollment_service();

    let error = service
        .enroll(request(learner.id, &retired))
        .await
        .expect_err("retired course");
    assert_eq!(error.code(), ErrorCode::NotFound);

    let error = service
        .enroll(EnrollRequest {
            learner_id: learner.id,
            course_id: CourseId::random(),
        })
        .await
        .expect_err("unknown course");
    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn subscription_must_cover_now() {
    let engine = TestEngine::new();
    let learner = engine.add_learner("Alan Kay");
    engine.subscriptions.revoke_all(learner.id);
    let course = engine.add_course(CourseBuilder::new("Smalltalk").lessons(1));

    let error = engine
        .enrollment_service()
        .enroll(request(learner.id, &course))
        .await
        .expect_err("no subscription");
    assert_eq!(error.code(), ErrorCode::Forbidden);
    assert_eq!(error.message(), "an active subscription is required to enroll");
}

#[tokio::test]
async fn trial_subscriptions_cover_a_single_course() {
    let engine = TestEngine::new();
    let learner = engine.add_learner("Trial User");
    engine.subscriptions.revoke_all(learner.id);
    engine.subscribe(learner.id, "Free Trial");
    let first = engine.add_course(CourseBuilder::new("First").lessons(1));
    let second = engine.add_course(CourseBuilder::new("Second").lessons(1));
    let service = engine.enrollment_service();

    service
        .enroll(request(learner.id, &first))
        .await
        .expect("trial enrollment");
    let error = service
        .enroll(request(learner.id, &second))
        .await
        .expect_err("second trial course");
    assert_eq!(error.code(), ErrorCode::Forbidden);

    let again = service
        .enroll(request(learner.id, &first))
        .await
        .expect("existing trial enrollment");
    assert!(!again.created);
}

#[tokio::test]
async fn losing_the_insert_race_returns_the_winner() {
    let engine = TestEngine::new();
    let learner = engine.add_learner("Barbara Liskov");
    let course = engine.add_course(CourseBuilder::new("CLU").lessons(2));
    let winner = Enrollment::start(learner.id, course.course.id, engine.now());
    engine.store.race_next_enrollment_insert(winner.clone());

    let response = engine
        .enrollment_service()
        .enroll(request(learner.id, &course))
        .await
        .expect("read repair");
    assert!(!response.created);
    assert_eq!(response.enrollment.enrollment_id, winner.id);
    assert_eq!(engine.store.enrollments_for(learner.id).len(), 1);
    assert!(engine.notifier.sent().is_empty());
}

#[tokio::test]
async fn concurrent_enrollments_create_one_row() {
    let engine = TestEngine::new();
    let learner = engine.add_learner("Leslie Lamport");
    let course = engine.add_course(CourseBuilder::new("Paxos").lessons(2));
    let service = Arc::new(engine.enrollment_service());

    let calls = (0..8).map(|_| {
        let service = Arc::clone(&service);
        let request = request(learner.id, &course);
        tokio::spawn(async move { service.enroll(request).await })
    });
    let mut created = 0;
    for call in futures::future::join_all(calls).await {
        let response = call.expect("task joined").expect("enrolled");
        created += usize::from(response.created);
    }
    assert_eq!(created, 1);
    assert_eq!(engine.store.enrollments_for(learner.id).len(), 1);
}

#[tokio::test]
async fn store_outage_is_service_unavailable() {
    let engine = TestEngine::new();
    let learner = engine.add_learner("Outage");
    let course = engine.add_course(CourseBuilder::new("Resilience").lessons(1));
    engine
        .store
        .set_outage(Some(LearningStoreError::connection("database offline")));

    let error = engine
        .enrollment_service()
        .enroll(request(learner.id, &course))
        .await
        .expect_err("outage");
    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
}

#[tokio::test]
async fn listing_reports_average_grade_for_completed_courses() {
    let engine = TestEngine::new();
    let learner = engine.add_learner("Frances Allen");
    let course = engine.add_course(CourseBuilder::new("Optimisation").lessons(1));
    let other = engine.add_course(CourseBuilder::new("Parallelism").lessons(4));
    let mut finished = Enrollment::start(learner.id, course.course.id, engine.now());
    finished.progress_percent = 100.0;
    finished.is_completed = true;
    finished.completed_at = Some(engine.now());
    engine.store.seed_enrollment(&finished);
    engine.enroll(&learner, &other);

    let quiz = quiz_for(course.lesson(0), 2);
    let grade = grade_submission(
        &quiz,
        &answers(&quiz, 2),
        ProgressionPolicy::default().default_passing_score,
    )
    .expect("graded");
    engine.store.seed_attempt(&Attempt::record(
        finished.id,
        quiz.id,
        grade,
        60,
        engine.now(),
    ));

    let listed = engine
        .enrollment_service()
        .list_enrollments(learner.id)
        .await
        .expect("listing");
    assert_eq!(listed.len(), 2);
    let completed = listed
        .iter()
        .find(|entry| entry.enrollment_id == finished.id)
        .expect("completed enrollment listed");
    assert!(completed.is_completed);
    assert_eq!(completed.average_grade, Some(100.0));
    let ongoing = listed
        .iter()
        .find(|entry| entry.course_id == other.course.id)
        .expect("ongoing enrollment listed");
    assert_eq!(ongoing.average_grade, None);
}
