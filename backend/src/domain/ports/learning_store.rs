//! Port for transactional access to progression state.
//!
//! Every multi-row mutation of the engine runs inside one unit of work: the
//! store hands a transactional [`LearningTx`] to a closure and commits only
//! when the closure returns `Ok`. Any `Err`, including errors raised by
//! collaborators invoked from inside the closure, rolls everything back.

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::domain::{
    Attempt, Certificate, CertificateId, Course, CourseId, CourseOutline, Enrollment,
    EnrollmentId, Error, LearnerId, LearnerStreak, LessonId, LessonProgress, Quiz, QuizId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by learning store adapters.
    pub enum LearningStoreError {
        /// Store connection could not be established.
        Connection { message: String } as ServiceUnavailable =>
            "learning store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } as InternalError =>
            "learning store query failed: {message}",
        /// A uniqueness constraint rejected a write.
        UniqueViolation { constraint: String } as Conflict =>
            "learning store uniqueness violated: {constraint}",
    }
}

/// Completed-course and streak standing of one learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardStanding {
    pub learner_id: LearnerId,
    pub completed_courses: i64,
    pub current_streak_days: i32,
}

/// Future returned by a unit-of-work closure.
pub type TxFuture<'t, T> = BoxFuture<'t, Result<T, Error>>;

/// Transactional handle handed to unit-of-work closures.
///
/// Soft-deleted rows are returned as stored; callers decide what a deleted
/// row means for them.
#[async_trait]
pub trait LearningTx: Send {
    async fn find_course(&mut self, course_id: CourseId)
    -> Result<Option<Course>, LearningStoreError>;

    /// Modules and lessons of a course, deleted rows filtered out.
    async fn load_outline(&mut self, course: &Course) -> Result<CourseOutline, LearningStoreError>;

    async fn find_enrollment(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<Enrollment>, LearningStoreError>;

    /// Re-read an enrollment and hold its row lock until the unit of work
    /// ends. Writers that derive enrollment state from progress rows take
    /// this lock before counting.
    async fn lock_enrollment(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<Enrollment>, LearningStoreError>;

    /// The learner's active enrollment for a course, if any.
    async fn find_active_enrollment(
        &mut self,
        learner_id: LearnerId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, LearningStoreError>;

    /// The active enrollment when one exists, otherwise the most recently
    /// started retired one.
    async fn find_latest_enrollment(
        &mut self,
        learner_id: LearnerId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, LearningStoreError>;

    /// Active enrollments of a learner, oldest first.
    async fn list_active_enrollments(
        &mut self,
        learner_id: LearnerId,
    ) -> Result<Vec<Enrollment>, LearningStoreError>;

    /// Insert a new enrollment. A second active enrollment for the same
    /// learner and course fails with [`LearningStoreError::UniqueViolation`].
    async fn insert_enrollment(&mut self, enrollment: &Enrollment)
    -> Result<(), LearningStoreError>;

    async fn update_enrollment(&mut self, enrollment: &Enrollment)
    -> Result<(), LearningStoreError>;

    async fn find_lesson_progress(
        &mut self,
        enrollment_id: EnrollmentId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, LearningStoreError>;

    async fn list_lesson_progress(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<LessonProgress>, LearningStoreError>;

    /// Insert or replace the row keyed by enrollment and lesson.
    async fn upsert_lesson_progress(
        &mut self,
        progress: &LessonProgress,
    ) -> Result<(), LearningStoreError>;

    /// A quiz with all of its questions and options, deleted ones included.
    async fn find_quiz(&mut self, quiz_id: QuizId) -> Result<Option<Quiz>, LearningStoreError>;

    async fn latest_failed_attempt(
        &mut self,
        enrollment_id: EnrollmentId,
        quiz_id: QuizId,
    ) -> Result<Option<Attempt>, LearningStoreError>;

    async fn insert_attempt(&mut self, attempt: &Attempt) -> Result<(), LearningStoreError>;

    /// Attempts for one quiz with their answers, newest first.
    async fn list_attempts(
        &mut self,
        enrollment_id: EnrollmentId,
        quiz_id: QuizId,
    ) -> Result<Vec<Attempt>, LearningStoreError>;

    /// Every attempt of an enrollment, answers omitted.
    async fn list_enrollment_attempts(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<Attempt>, LearningStoreError>;

    async fn find_streak(
        &mut self,
        learner_id: LearnerId,
    ) -> Result<Option<LearnerStreak>, LearningStoreError>;

    /// Insert or replace the learner's streak row.
    async fn save_streak(&mut self, streak: &LearnerStreak) -> Result<(), LearningStoreError>;

    /// Learners ordered by completed courses then streak days, descending.
    async fn leaderboard(&mut self, limit: usize)
    -> Result<Vec<LeaderboardStanding>, LearningStoreError>;

    async fn find_certificate(
        &mut self,
        certificate_id: CertificateId,
    ) -> Result<Option<Certificate>, LearningStoreError>;

    async fn find_certificate_for_enrollment(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<Certificate>, LearningStoreError>;

    /// Insert a certificate unless the enrollment already has one.
    ///
    /// Returns `false` when an existing certificate won.
    async fn insert_certificate(
        &mut self,
        certificate: &Certificate,
    ) -> Result<bool, LearningStoreError>;
}

/// Port that opens units of work over the progression state.
///
/// The method is generic, so services hold a concrete `S: LearningStore`
/// rather than a trait object.
#[async_trait]
pub trait LearningStore: Send + Sync + 'static {
    /// Run `work` atomically.
    ///
    /// # Errors
    /// Propagates the closure's error after rolling back, or a mapped store
    /// error when the transaction itself cannot be opened or committed.
    async fn in_unit_of_work<T, F>(&self, work: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: for<'t> FnOnce(&'t mut dyn LearningTx) -> TxFuture<'t, T> + Send + 'static;
}
