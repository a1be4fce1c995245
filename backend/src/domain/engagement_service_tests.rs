//! Streak and leaderboard reads.

use chrono::TimeDelta;
use rstest::rstest;

use super::*;
use crate::domain::{Enrollment, ErrorCode, LearnerIdentity, LearnerStreak};
use crate::test_support::fixtures::{CourseBuilder, CourseFixture};
use crate::test_support::TestEngine;

#[tokio::test]
async fn streak_reads_zero_before_any_activity() {
    let engine = TestEngine::new();
    let learner = engine.add_learner("Newcomer");
    let streak = engine
        .engagement_service()
        .streak(learner.id)
        .await
        .expect("streak");
    assert_eq!(streak.current_streak_days, 0);
    assert!(streak.last_active_at.is_none());
    assert!(streak.message.starts_with("Start your streak"));
}

#[rstest]
#[case(TimeDelta::hours(-20), 8)]
#[case(TimeDelta::days(-3), 0)]
#[tokio::test]
async fn stored_streak_lapses_after_a_missed_day(#[case] offset: TimeDelta, #[case] expected: i32) {
    let engine = TestEngine::new();
    let learner = engine.add_learner("Regular");
    engine.store.seed_streak(&LearnerStreak {
        learner_id: learner.id,
        current_streak_days: 8,
        last_active_at: engine.now() + offset,
    });
    let streak = engine
        .engagement_service()
        .streak(learner.id)
        .await
        .expect("streak");
    assert_eq!(streak.current_streak_days, expected);
    assert_eq!(streak.message, streak_message(expected));
}

#[rstest]
#[case(0)]
#[case(-5)]
#[case(MAX_LEADERBOARD_SIZE + 1)]
#[tokio::test]
async fn leaderboard_size_is_bounded(#[case] top: i64) {
    let engine = TestEngine::new();
    let error = engine
        .engagement_service()
        .leaderboard(top)
        .await
        .expect_err("out of range");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn leaderboard_ranks_by_completions_then_streak() {
    let engine = TestEngine::new();
    let course_a = engine.add_course(CourseBuilder::new("A").lessons(1));
    let course_b = engine.add_course(CourseBuilder::new("B").lessons(1));
    let finish = |learner: &LearnerIdentity, course: &CourseFixture| {
        let mut enrollment = Enrollment::start(learner.id, course.course.id, engine.now());
        enrollment.progress_percent = 100.0;
        enrollment.is_completed = true;
        engine.store.seed_enrollment(&enrollment);
    };

    let champion = engine.add_learner("Champion");
    finish(&champion, &course_a);
    finish(&champion, &course_b);

    let steady = engine.add_learner("Steady");
    finish(&steady, &course_a);
    engine.store.seed_streak(&LearnerStreak {
        learner_id: steady.id,
        current_streak_days: 9,
        last_active_at: engine.now(),
    });

    let casual = engine.add_learner("Casual");
    finish(&casual, &course_a);

    let dormant = engine.add_learner("Dormant");
    engine.enroll(&dormant, &course_b);

    let board = engine
        .engagement_service()
        .leaderboard(3)
        .await
        .expect("leaderboard");
    let names: Vec<(u32, &str)> = board
        .iter()
        .map(|entry| (entry.rank, entry.full_name.as_str()))
        .collect();
    assert_eq!(names, vec![(1, "Champion"), (2, "Steady"), (3, "Casual")]);
    assert_eq!(board[0].completed_courses, 2);
    assert_eq!(board[1].current_streak_days, 9);
}

#[tokio::test]
async fn deactivated_learners_leave_the_leaderboard() {
    let engine = TestEngine::new();
    let course = engine.add_course(CourseBuilder::new("A").lessons(1));
    let first = engine.add_learner("First");
    let second = engine.add_learner("Second");
    engine.enroll(&first, &course);
    engine.enroll(&second, &course);
    engine.identities.update(first.id, |identity| identity.is_active = false);

    let board = engine
        .engagement_service()
        .leaderboard(10)
        .await
        .expect("leaderboard");
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].learner_id, second.id);
    assert_eq!(board[0].rank, 1);
}
