//! Enrollment and per-lesson progress state plus the progress aggregate.

use chrono::{DateTime, Utc};

use super::ids::{CertificateId, CourseId, EnrollmentId, LearnerId, LessonId};

/// Durable binding of a learner to a course.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub learner_id: LearnerId,
    pub course_id: CourseId,
    pub started_at: DateTime<Utc>,
    pub progress_percent: f64,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_lesson_id: Option<LessonId>,
    pub certificate_id: Option<CertificateId>,
    /// Soft-retired enrollments stay stored but grant nothing.
    pub is_deleted: bool,
    pub updated_at: DateTime<Utc>,
}

impl Enrollment {
    /// A fresh enrollment with no progress.
    pub fn start(learner_id: LearnerId, course_id: CourseId, now: DateTime<Utc>) -> Self {
        Self {
            id: EnrollmentId::random(),
            learner_id,
            course_id,
            started_at: now,
            progress_percent: 0.0,
            is_completed: false,
            completed_at: None,
            last_lesson_id: None,
            certificate_id: None,
            is_deleted: false,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    /// Whether the enrollment has reached the end of the course.
    pub fn is_fully_progressed(&self) -> bool {
        self.progress_percent >= 100.0
    }
}

/// Progress of one enrollment through one lesson. Upserted, never appended.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonProgress {
    pub enrollment_id: EnrollmentId,
    pub lesson_id: LessonId,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub watched_seconds: i32,
    pub updated_at: DateTime<Utc>,
}

impl LessonProgress {
    /// Progress for a lesson the learner has not touched yet.
    pub fn untouched(enrollment_id: EnrollmentId, lesson_id: LessonId, now: DateTime<Utc>) -> Self {
        Self {
            enrollment_id,
            lesson_id,
            is_completed: false,
            completed_at: None,
            watched_seconds: 0,
            updated_at: now,
        }
    }

    /// Merge a completion into this row without ever regressing it: the
    /// first completion instant is kept and watched time only grows.
    pub fn mark_completed(mut self, watched_seconds: i32, now: DateTime<Utc>) -> Self {
        if !self.is_completed {
            self.is_completed = true;
            self.completed_at = Some(now);
        }
        self.watched_seconds = self.watched_seconds.max(watched_seconds.max(0));
        self.updated_at = now;
        self
    }
}

/// Round to two decimal places.
pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage of a course completed.
///
/// `completed` counts completed progress rows for active lessons; `total` is
/// the active lesson count. An empty course is 0%, and the result never
/// exceeds 100.
///
/// # Examples
/// ```
/// use lms_backend::domain::progress_percent;
///
/// assert_eq!(progress_percent(1, 3), 33.33);
/// assert_eq!(progress_percent(0, 0), 0.0);
/// ```
pub fn progress_percent(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let ratio = completed.min(total) as f64 / total as f64;
    round_to_hundredths(ratio * 100.0).min(100.0)
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use chrono::TimeDelta;
    use rstest::rstest;

    #[rstest]
    #[case(0, 4, 0.0)]
    #[case(1, 4, 25.0)]
    #[case(2, 3, 66.67)]
    #[case(3, 3, 100.0)]
    #[case(5, 3, 100.0)]
    #[case(0, 0, 0.0)]
    #[case(3, 0, 0.0)]
    fn computes_percentages(#[case] completed: usize, #[case] total: usize, #[case] expected: f64) {
        assert_eq!(progress_percent(completed, total), expected);
    }

    #[rstest]
    fn percentage_is_monotonic_in_completed_count() {
        let total = 7;
        let series: Vec<f64> = (0..=total).map(|done| progress_percent(done, total)).collect();
        assert!(series.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(series.last().copied(), Some(100.0));
    }

    #[rstest]
    fn completion_never_regresses() {
        let now = Utc::now();
        let later = now + TimeDelta::minutes(5);
        let row = LessonProgress::untouched(EnrollmentId::random(), LessonId::random(), now)
            .mark_completed(540, now)
            .mark_completed(100, later);

        assert!(row.is_completed);
        assert_eq!(row.completed_at, Some(now));
        assert_eq!(row.watched_seconds, 540);
        assert_eq!(row.updated_at, later);
    }

    #[rstest]
    fn new_enrollments_start_empty() {
        let now = Utc::now();
        let enrollment = Enrollment::start(LearnerId::random(), CourseId::random(), now);
        assert!(enrollment.is_active());
        assert!(!enrollment.is_completed);
        assert_eq!(enrollment.progress_percent, 0.0);
        assert!(!enrollment.is_fully_progressed());
    }
}
