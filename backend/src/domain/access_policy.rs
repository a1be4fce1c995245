//! Lesson access decisions.
//!
//! Access is a strict linear unlock chain over the course outline: a lesson
//! opens once the lesson before it in document order is completed. Preview
//! lessons and the course's opening lesson are always open.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;

use super::ports::LearningTx;
use super::{
    ActiveSubscription, CourseId, CourseOutline, Enrollment, Error, LearnerId, Lesson, LessonId,
    LessonProgress,
};

/// Why access was granted or refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccessReason {
    Previewable,
    OpeningLesson,
    /// The lesson has nothing before it in document order.
    NoPredecessor,
    PredecessorCompleted,
    PredecessorIncomplete,
    NotEnrolled,
}

impl AccessReason {
    pub fn grants(self) -> bool {
        !matches!(self, Self::PredecessorIncomplete | Self::NotEnrolled)
    }
}

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonAccess {
    pub lesson_id: LessonId,
    pub granted: bool,
    pub reason: AccessReason,
}

impl LessonAccess {
    fn new(lesson_id: LessonId, reason: AccessReason) -> Self {
        Self {
            lesson_id,
            granted: reason.grants(),
            reason,
        }
    }
}

/// Lessons with a completed progress row.
pub fn completed_lessons(progress: &[LessonProgress]) -> HashSet<LessonId> {
    progress
        .iter()
        .filter(|row| row.is_completed)
        .map(|row| row.lesson_id)
        .collect()
}

/// Apply the progress-based unlock rules to one lesson of `outline`.
///
/// # Examples
/// ```
/// use std::collections::HashSet;
///
/// use lms_backend::domain::{
///     unlock_reason, AccessReason, Course, CourseId, CourseModule, CourseOutline, LearnerId,
///     Lesson, LessonId, LessonKind, ModuleId,
/// };
///
/// let course = Course {
///     id: CourseId::random(),
///     title: "Rust".into(),
///     instructor_id: LearnerId::random(),
///     is_retired: false,
/// };
/// let module = CourseModule {
///     id: ModuleId::random(),
///     course_id: course.id,
///     title: "Basics".into(),
///     position: 1,
///     is_deleted: false,
/// };
/// let lesson = |position| Lesson {
///     id: LessonId::random(),
///     module_id: module.id,
///     course_id: course.id,
///     title: format!("Lesson {position}"),
///     position,
///     kind: LessonKind::Reading,
///     is_previewable: false,
///     is_deleted: false,
///     video_duration_seconds: None,
///     estimated_minutes: Some(5),
/// };
/// let (first, second) = (lesson(1), lesson(2));
/// let outline = CourseOutline::new(course, vec![module], vec![first.clone(), second.clone()]);
///
/// let mut completed = HashSet::new();
/// assert_eq!(unlock_reason(&outline, &second, &completed), AccessReason::PredecessorIncomplete);
/// completed.insert(first.id);
/// assert_eq!(unlock_reason(&outline, &second, &completed), AccessReason::PredecessorCompleted);
/// ```
pub fn unlock_reason(
    outline: &CourseOutline,
    lesson: &Lesson,
    completed: &HashSet<LessonId>,
) -> AccessReason {
    if lesson.is_previewable {
        return AccessReason::Previewable;
    }
    if outline.is_opening_lesson(lesson.id) {
        return AccessReason::OpeningLesson;
    }
    match outline.predecessor_of(lesson.id) {
        None => AccessReason::NoPredecessor,
        Some(previous) if completed.contains(&previous.id) => AccessReason::PredecessorCompleted,
        Some(_) => AccessReason::PredecessorIncomplete,
    }
}

/// Course a trial subscription is bound to: that of the learner's earliest
/// active enrollment.
pub fn trial_course(active_enrollments: &[Enrollment]) -> Option<CourseId> {
    active_enrollments
        .iter()
        .filter(|enrollment| enrollment.is_active())
        .min_by_key(|enrollment| (enrollment.started_at, *enrollment.id.as_uuid()))
        .map(|enrollment| enrollment.course_id)
}

/// Check subscription coverage for `course_id` at `now`.
///
/// # Errors
/// [`Error::forbidden`] when nothing covers `now`, or when a trial is bound
/// to a different course.
pub fn ensure_subscription_covers(
    subscription: Option<&ActiveSubscription>,
    now: DateTime<Utc>,
    course_id: CourseId,
    trial_course: Option<CourseId>,
) -> Result<(), Error> {
    let Some(subscription) = subscription.filter(|plan| plan.covers(now)) else {
        return Err(Error::forbidden("subscription has expired"));
    };
    if subscription.is_trial() && trial_course.is_some_and(|bound| bound != course_id) {
        return Err(Error::forbidden(
            "free trial subscriptions grant access to a single course",
        ));
    }
    Ok(())
}

/// Decide whether `learner_id` may open `lesson_id` right now.
///
/// The caller resolves the learner and their subscription beforehand; this
/// function performs every store read inside the caller's unit of work.
///
/// # Errors
/// `not_found` for unknown or deleted course content, `forbidden` for a
/// deactivated enrollment or missing subscription coverage.
pub async fn evaluate_lesson_access(
    tx: &mut dyn LearningTx,
    learner_id: LearnerId,
    subscription: Option<&ActiveSubscription>,
    course_id: CourseId,
    lesson_id: LessonId,
    now: DateTime<Utc>,
) -> Result<LessonAccess, Error> {
    let course = tx
        .find_course(course_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("course {course_id} not found")))?;
    let outline = tx.load_outline(&course).await?;
    let lesson = outline
        .find(lesson_id)
        .cloned()
        .ok_or_else(|| Error::not_found(format!("lesson {lesson_id} not found")))?;

    let Some(enrollment) = tx.find_latest_enrollment(learner_id, course_id).await? else {
        debug!(%learner_id, %course_id, %lesson_id, "access denied: not enrolled");
        return Ok(LessonAccess::new(lesson_id, AccessReason::NotEnrolled));
    };
    if !enrollment.is_active() {
        return Err(Error::forbidden("enrollment is deactivated"));
    }

    let active = tx.list_active_enrollments(learner_id).await?;
    ensure_subscription_covers(subscription, now, course_id, trial_course(&active))?;

    let progress = tx.list_lesson_progress(enrollment.id).await?;
    let reason = unlock_reason(&outline, &lesson, &completed_lessons(&progress));
    if !reason.grants() {
        debug!(%learner_id, %course_id, %lesson_id, ?reason, "access denied");
    }
    Ok(LessonAccess::new(lesson_id, reason))
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use chrono::TimeDelta;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::ErrorCode;
    use crate::test_support::fixtures::{course_with_modules, CourseFixture};

    #[fixture]
    fn outline() -> CourseFixture {
        // Module 1: lessons at positions 1, 2 and 5; module 2 at 3: lessons 1, 2.
        course_with_modules(&[(1, vec![1, 2, 5]), (3, vec![1, 2])])
    }

    fn plan(name: &str, now: DateTime<Utc>) -> ActiveSubscription {
        ActiveSubscription {
            plan_name: name.to_owned(),
            starts_at: now - TimeDelta::days(1),
            ends_at: now + TimeDelta::days(1),
        }
    }

    #[rstest]
    fn first_lesson_is_open_without_progress(outline: CourseFixture) {
        let first = outline.lesson(0);
        assert_eq!(
            unlock_reason(&outline.outline, first, &HashSet::new()),
            AccessReason::OpeningLesson
        );
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(4)]
    fn each_lesson_waits_for_the_one_before(outline: CourseFixture, #[case] index: usize) {
        let lesson = outline.lesson(index);
        let mut completed: HashSet<LessonId> = HashSet::new();
        assert_eq!(
            unlock_reason(&outline.outline, lesson, &completed),
            AccessReason::PredecessorIncomplete
        );
        completed.insert(outline.lesson(index - 1).id);
        assert_eq!(
            unlock_reason(&outline.outline, lesson, &completed),
            AccessReason::PredecessorCompleted
        );
    }

    #[rstest]
    fn previewable_lessons_ignore_progress(outline: CourseFixture) {
        let mut lesson = outline.lesson(4).clone();
        lesson.is_previewable = true;
        assert_eq!(
            unlock_reason(&outline.outline, &lesson, &HashSet::new()),
            AccessReason::Previewable
        );
    }

    #[rstest]
    fn completion_of_a_later_lesson_does_not_unlock_an_earlier_one(outline: CourseFixture) {
        let completed: HashSet<LessonId> = [outline.lesson(3).id].into_iter().collect();
        assert!(!unlock_reason(&outline.outline, outline.lesson(2), &completed).grants());
    }

    #[rstest]
    fn expired_subscription_is_forbidden() {
        let now = Utc::now();
        let mut expired = plan("Premium", now);
        expired.ends_at = now - TimeDelta::seconds(1);
        let error = ensure_subscription_covers(Some(&expired), now, CourseId::random(), None)
            .expect_err("expired plan");
        assert_eq!(error.code(), ErrorCode::Forbidden);
        assert_eq!(error.message(), "subscription has expired");

        let missing = ensure_subscription_covers(None, now, CourseId::random(), None)
            .expect_err("no plan");
        assert_eq!(missing.code(), ErrorCode::Forbidden);
    }

    #[rstest]
    fn trial_is_bound_to_one_course() {
        let now = Utc::now();
        let trial = plan("Free Trial", now);
        let bound = CourseId::random();
        assert!(ensure_subscription_covers(Some(&trial), now, bound, Some(bound)).is_ok());
        assert!(ensure_subscription_covers(Some(&trial), now, bound, None).is_ok());
        let error = ensure_subscription_covers(Some(&trial), now, CourseId::random(), Some(bound))
            .expect_err("other course");
        assert_eq!(error.code(), ErrorCode::Forbidden);

        let paid = plan("Premium", now);
        assert!(ensure_subscription_covers(Some(&paid), now, CourseId::random(), Some(bound)).is_ok());
    }

    #[rstest]
    fn trial_course_is_the_earliest_active_enrollment() {
        let now = Utc::now();
        let learner = LearnerId::random();
        let mut older = Enrollment::start(learner, CourseId::random(), now - TimeDelta::days(3));
        let newer = Enrollment::start(learner, CourseId::random(), now - TimeDelta::days(1));
        assert_eq!(trial_course(&[newer.clone(), older.clone()]), Some(older.course_id));

        older.is_deleted = true;
        assert_eq!(trial_course(&[newer.clone(), older]), Some(newer.course_id));
        assert_eq!(trial_course(&[]), None);
    }
}
