//! In-memory `LearningStore` with all-or-nothing units of work.
//!
//! Units of work run one at a time against a copy of the state; the copy
//! replaces the shared state only when the closure returns `Ok`.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::ports::{
    LeaderboardStanding, LearningStore, LearningStoreError, LearningTx, TxFuture,
};
use crate::domain::{
    Attempt, Certificate, CertificateId, Course, CourseId, CourseModule, CourseOutline,
    Enrollment, EnrollmentId, Error, LearnerId, LearnerStreak, Lesson, LessonId, LessonProgress,
    Quiz, QuizId,
};

use super::fixtures::CourseFixture;

#[derive(Debug, Default, Clone)]
struct LearningState {
    courses: HashMap<CourseId, Course>,
    modules: Vec<CourseModule>,
    lessons: Vec<Lesson>,
    quizzes: HashMap<QuizId, Quiz>,
    enrollments: Vec<Enrollment>,
    progress: HashMap<(EnrollmentId, LessonId), LessonProgress>,
    attempts: Vec<Attempt>,
    streaks: HashMap<LearnerId, LearnerStreak>,
    certificates: Vec<Certificate>,
}

#[derive(Default)]
struct Faults {
    outage: Option<LearningStoreError>,
    racing_enrollment: Option<Enrollment>,
}

/// Store used by unit and integration tests.
#[derive(Default)]
pub struct InMemoryLearningStore {
    state: Mutex<LearningState>,
    faults: Mutex<Faults>,
    serial: tokio::sync::Mutex<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryLearningStore {
    /// Insert a course outline, replacing any rows already seeded with the
    /// same ids.
    pub fn seed_course(&self, fixture: &CourseFixture) {
        let mut state = lock(&self.state);
        state
            .courses
            .insert(fixture.course.id, fixture.course.clone());
        state
            .modules
            .retain(|module| fixture.modules.iter().all(|seeded| seeded.id != module.id));
        state.modules.extend(fixture.modules.iter().cloned());
        state
            .lessons
            .retain(|lesson| fixture.lessons.iter().all(|seeded| seeded.id != lesson.id));
        state.lessons.extend(fixture.lessons.iter().cloned());
    }

    pub fn seed_quiz(&self, quiz: &Quiz) {
        lock(&self.state).quizzes.insert(quiz.id, quiz.clone());
    }

    pub fn seed_enrollment(&self, enrollment: &Enrollment) {
        lock(&self.state).enrollments.push(enrollment.clone());
    }

    pub fn seed_progress(&self, progress: &LessonProgress) {
        lock(&self.state)
            .progress
            .insert((progress.enrollment_id, progress.lesson_id), progress.clone());
    }

    pub fn seed_attempt(&self, attempt: &Attempt) {
        lock(&self.state).attempts.push(attempt.clone());
    }

    pub fn seed_streak(&self, streak: &LearnerStreak) {
        lock(&self.state)
            .streaks
            .insert(streak.learner_id, streak.clone());
    }

    /// Soft-delete a lesson, as course authoring would.
    pub fn retire_lesson(&self, lesson_id: LessonId) {
        let mut state = lock(&self.state);
        for lesson in state.lessons.iter_mut().filter(|lesson| lesson.id == lesson_id) {
            lesson.is_deleted = true;
        }
    }

    pub fn retire_enrollment(&self, enrollment_id: EnrollmentId) {
        let mut state = lock(&self.state);
        for enrollment in state
            .enrollments
            .iter_mut()
            .filter(|enrollment| enrollment.id == enrollment_id)
        {
            enrollment.is_deleted = true;
        }
    }

    /// Fail every unit of work with `error` until cleared.
    pub fn set_outage(&self, error: Option<LearningStoreError>) {
        lock(&self.faults).outage = error;
    }

    /// Make the next enrollment insert lose a race against `winner`, which is
    /// committed as if written by another instance.
    pub fn race_next_enrollment_insert(&self, winner: Enrollment) {
        lock(&self.faults).racing_enrollment = Some(winner);
    }

    pub fn enrollment(&self, enrollment_id: EnrollmentId) -> Option<Enrollment> {
        lock(&self.state)
            .enrollments
            .iter()
            .find(|enrollment| enrollment.id == enrollment_id)
            .cloned()
    }

    pub fn enrollments_for(&self, learner_id: LearnerId) -> Vec<Enrollment> {
        lock(&self.state)
            .enrollments
            .iter()
            .filter(|enrollment| enrollment.learner_id == learner_id)
            .cloned()
            .collect()
    }

    pub fn progress_rows(&self, enrollment_id: EnrollmentId) -> Vec<LessonProgress> {
        lock(&self.state)
            .progress
            .values()
            .filter(|row| row.enrollment_id == enrollment_id)
            .cloned()
            .collect()
    }

    pub fn attempts_for(&self, enrollment_id: EnrollmentId) -> Vec<Attempt> {
        lock(&self.state)
            .attempts
            .iter()
            .filter(|attempt| attempt.enrollment_id == enrollment_id)
            .cloned()
            .collect()
    }

    pub fn streak(&self, learner_id: LearnerId) -> Option<LearnerStreak> {
        lock(&self.state).streaks.get(&learner_id).cloned()
    }

    pub fn certificate_count(&self) -> usize {
        lock(&self.state).certificates.len()
    }
}

#[async_trait]
impl LearningStore for InMemoryLearningStore {
    async fn in_unit_of_work<T, F>(&self, work: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: for<'t> FnOnce(&'t mut dyn LearningTx) -> TxFuture<'t, T> + Send + 'static,
    {
        let _serial = self.serial.lock().await;
        if let Some(error) = lock(&self.faults).outage.clone() {
            return Err(error.into());
        }

        let mut tx = InMemoryTx {
            state: lock(&self.state).clone(),
            racing_enrollment: lock(&self.faults).racing_enrollment.take(),
            committed_elsewhere: Vec::new(),
        };
        let result = {
            let handle: &mut dyn LearningTx = &mut tx;
            work(handle).await
        };

        let mut shared = lock(&self.state);
        if result.is_ok() {
            *shared = tx.state;
        } else {
            shared.enrollments.extend(tx.committed_elsewhere);
        }
        if let Some(unused) = tx.racing_enrollment {
            lock(&self.faults).racing_enrollment = Some(unused);
        }
        result
    }
}

struct InMemoryTx {
    state: LearningState,
    racing_enrollment: Option<Enrollment>,
    committed_elsewhere: Vec<Enrollment>,
}

fn by_newest(attempts: &mut [Attempt]) {
    attempts.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
    });
}

#[async_trait]
impl LearningTx for InMemoryTx {
    async fn find_course(
        &mut self,
        course_id: CourseId,
    ) -> Result<Option<Course>, LearningStoreError> {
        Ok(self.state.courses.get(&course_id).cloned())
    }

    async fn load_outline(&mut self, course: &Course) -> Result<CourseOutline, LearningStoreError> {
        let modules: Vec<CourseModule> = self
            .state
            .modules
            .iter()
            .filter(|module| module.course_id == course.id)
            .cloned()
            .collect();
        let lessons = self
            .state
            .lessons
            .iter()
            .filter(|lesson| lesson.course_id == course.id)
            .cloned()
            .collect();
        Ok(CourseOutline::new(course.clone(), modules, lessons))
    }

    async fn find_enrollment(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<Enrollment>, LearningStoreError> {
        Ok(self
            .state
            .enrollments
            .iter()
            .find(|enrollment| enrollment.id == enrollment_id)
            .cloned())
    }

    async fn lock_enrollment(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<Enrollment>, LearningStoreError> {
        // Units of work already run one at a time.
        self.find_enrollment(enrollment_id).await
    }

    async fn find_active_enrollment(
        &mut self,
        learner_id: LearnerId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, LearningStoreError> {
        Ok(self
            .state
            .enrollments
            .iter()
            .find(|enrollment| {
                enrollment.learner_id == learner_id
                    && enrollment.course_id == course_id
                    && enrollment.is_active()
            })
            .cloned())
    }

    async fn find_latest_enrollment(
        &mut self,
        learner_id: LearnerId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, LearningStoreError> {
        Ok(self
            .state
            .enrollments
            .iter()
            .filter(|enrollment| {
                enrollment.learner_id == learner_id && enrollment.course_id == course_id
            })
            .max_by_key(|enrollment| (enrollment.is_active(), enrollment.started_at))
            .cloned())
    }

    async fn list_active_enrollments(
        &mut self,
        learner_id: LearnerId,
    ) -> Result<Vec<Enrollment>, LearningStoreError> {
        let mut enrollments: Vec<Enrollment> = self
            .state
            .enrollments
            .iter()
            .filter(|enrollment| enrollment.learner_id == learner_id && enrollment.is_active())
            .cloned()
            .collect();
        enrollments.sort_by_key(|enrollment| enrollment.started_at);
        Ok(enrollments)
    }

    async fn insert_enrollment(
        &mut self,
        enrollment: &Enrollment,
    ) -> Result<(), LearningStoreError> {
        if let Some(winner) = self.racing_enrollment.take() {
            self.state.enrollments.push(winner.clone());
            self.committed_elsewhere.push(winner);
        }
        let duplicate = self.state.enrollments.iter().any(|existing| {
            existing.is_active()
                && existing.learner_id == enrollment.learner_id
                && existing.course_id == enrollment.course_id
        });
        if duplicate {
            return Err(LearningStoreError::unique_violation(
                "enrollments_active_learner_course_key",
            ));
        }
        self.state.enrollments.push(enrollment.clone());
        Ok(())
    }

    async fn update_enrollment(
        &mut self,
        enrollment: &Enrollment,
    ) -> Result<(), LearningStoreError> {
        let slot = self
            .state
            .enrollments
            .iter_mut()
            .find(|existing| existing.id == enrollment.id)
            .ok_or_else(|| LearningStoreError::query("enrollment row missing"))?;
        *slot = enrollment.clone();
        Ok(())
    }

    async fn find_lesson_progress(
        &mut self,
        enrollment_id: EnrollmentId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, LearningStoreError> {
        Ok(self.state.progress.get(&(enrollment_id, lesson_id)).cloned())
    }

    async fn list_lesson_progress(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<LessonProgress>, LearningStoreError> {
        Ok(self
            .state
            .progress
            .values()
            .filter(|row| row.enrollment_id == enrollment_id)
            .cloned()
            .collect())
    }

    async fn upsert_lesson_progress(
        &mut self,
        progress: &LessonProgress,
    ) -> Result<(), LearningStoreError> {
        self.state
            .progress
            .insert((progress.enrollment_id, progress.lesson_id), progress.clone());
        Ok(())
    }

    async fn find_quiz(&mut self, quiz_id: QuizId) -> Result<Option<Quiz>, LearningStoreError> {
        Ok(self.state.quizzes.get(&quiz_id).cloned())
    }

    async fn latest_failed_attempt(
        &mut self,
        enrollment_id: EnrollmentId,
        quiz_id: QuizId,
    ) -> Result<Option<Attempt>, LearningStoreError> {
        let mut failed: Vec<Attempt> = self
            .state
            .attempts
            .iter()
            .filter(|attempt| {
                attempt.enrollment_id == enrollment_id
                    && attempt.quiz_id == quiz_id
                    && !attempt.is_passed
            })
            .cloned()
            .collect();
        by_newest(&mut failed);
        Ok(failed.into_iter().next())
    }

    async fn insert_attempt(&mut self, attempt: &Attempt) -> Result<(), LearningStoreError> {
        self.state.attempts.push(attempt.clone());
        Ok(())
    }

    async fn list_attempts(
        &mut self,
        enrollment_id: EnrollmentId,
        quiz_id: QuizId,
    ) -> Result<Vec<Attempt>, LearningStoreError> {
        let mut attempts: Vec<Attempt> = self
            .state
            .attempts
            .iter()
            .filter(|attempt| attempt.enrollment_id == enrollment_id && attempt.quiz_id == quiz_id)
            .cloned()
            .collect();
        by_newest(&mut attempts);
        Ok(attempts)
    }

    async fn list_enrollment_attempts(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<Attempt>, LearningStoreError> {
        Ok(self
            .state
            .attempts
            .iter()
            .filter(|attempt| attempt.enrollment_id == enrollment_id)
            .map(|attempt| Attempt {
                answers: Vec::new(),
                ..attempt.clone()
            })
            .collect())
    }

    async fn find_streak(
        &mut self,
        learner_id: LearnerId,
    ) -> Result<Option<LearnerStreak>, LearningStoreError> {
        Ok(self.state.streaks.get(&learner_id).cloned())
    }

    async fn save_streak(&mut self, streak: &LearnerStreak) -> Result<(), LearningStoreError> {
        self.state.streaks.insert(streak.learner_id, streak.clone());
        Ok(())
    }

    async fn leaderboard(
        &mut self,
        limit: usize,
    ) -> Result<Vec<LeaderboardStanding>, LearningStoreError> {
        let learners: BTreeSet<LearnerId> = self
            .state
            .enrollments
            .iter()
            .filter(|enrollment| enrollment.is_active())
            .map(|enrollment| enrollment.learner_id)
            .chain(self.state.streaks.keys().copied())
            .collect();
        let mut standings: Vec<LeaderboardStanding> = learners
            .into_iter()
            .map(|learner_id| LeaderboardStanding {
                learner_id,
                completed_courses: self
                    .state
                    .enrollments
                    .iter()
                    .filter(|enrollment| {
                        enrollment.learner_id == learner_id
                            && enrollment.is_active()
                            && enrollment.is_completed
                    })
                    .count() as i64,
                current_streak_days: self
                    .state
                    .streaks
                    .get(&learner_id)
                    .map_or(0, |streak| streak.current_streak_days),
            })
            .collect();
        standings.sort_by(|a, b| {
            b.completed_courses
                .cmp(&a.completed_courses)
                .then_with(|| b.current_streak_days.cmp(&a.current_streak_days))
                .then_with(|| a.learner_id.as_uuid().cmp(b.learner_id.as_uuid()))
        });
        standings.truncate(limit);
        Ok(standings)
    }

    async fn find_certificate(
        &mut self,
        certificate_id: CertificateId,
    ) -> Result<Option<Certificate>, LearningStoreError> {
        Ok(self
            .state
            .certificates
            .iter()
            .find(|certificate| certificate.id == certificate_id)
            .cloned())
    }

    async fn find_certificate_for_enrollment(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<Certificate>, LearningStoreError> {
        Ok(self
            .state
            .certificates
            .iter()
            .find(|certificate| certificate.enrollment_id == enrollment_id)
            .cloned())
    }

    async fn insert_certificate(
        &mut self,
        certificate: &Certificate,
    ) -> Result<bool, LearningStoreError> {
        if self
            .state
            .certificates
            .iter()
            .any(|existing| existing.enrollment_id == certificate.enrollment_id)
        {
            return Ok(false);
        }
        self.state.certificates.push(certificate.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures::CourseBuilder;

    #[tokio::test]
    async fn reseeding_an_edited_course_replaces_its_rows() {
        let store = InMemoryLearningStore::default();
        let original = CourseBuilder::new("Statics").lessons(2).build();
        store.seed_course(&original);
        let edited = original
            .clone()
            .with_lesson(1, |lesson| lesson.is_previewable = true);
        store.seed_course(&edited);

        let course = edited.course.clone();
        let outline = store
            .in_unit_of_work(move |tx| Box::pin(async move { Ok(tx.load_outline(&course).await?) }))
            .await
            .expect("outline loads");

        let lessons: Vec<&Lesson> = outline.lessons().collect();
        assert_eq!(lessons.len(), 2);
        assert!(lessons[1].is_previewable);
        assert_eq!(
            outline.find(edited.lesson(1).id).map(|lesson| lesson.is_previewable),
            Some(true)
        );
    }
}
