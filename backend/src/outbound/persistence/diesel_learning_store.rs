//! PostgreSQL-backed `LearningStore` implementation using Diesel ORM.
//!
//! Every unit of work runs inside one database transaction on a pooled
//! connection. Inserts that may lose a uniqueness race run in a nested
//! transaction (a savepoint) so the outer transaction stays usable for the
//! caller's read-repair.
//!
//! Transactions run at READ COMMITTED. Lesson completion and quiz
//! submission both take `SELECT ... FOR UPDATE` on the enrollment row via
//! `lock_enrollment` before recounting progress, so two final completions
//! for one enrollment serialize: the second waits, then sees the first's
//! progress row and completion flag instead of issuing a second
//! certificate or a stale percentage.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel::sql_types::{BigInt, Integer};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{
    LeaderboardStanding, LearningStore, LearningStoreError, LearningTx, TxFuture,
};
use crate::domain::{
    Attempt, Certificate, CertificateId, Course, CourseId, CourseModule, CourseOutline,
    Enrollment, EnrollmentId, Error, GradedAnswer, LearnerId, LearnerStreak, Lesson, LessonId,
    LessonProgress, Quiz, QuizId,
};

use super::error_mapping::{StoreFailure, store_error};
use super::models::{
    AnswerRow, AttemptRow, CertificateRow, CourseRow, EnrollmentRow, EnrollmentUpdate,
    LessonProgressRow, LessonRow, ModuleRow, OptionRow, QuestionRow, QuizRow, StreakRow,
};
use super::pool::DbPool;
use super::schema::{
    attempt_answers, certificates, course_modules, courses, enrollments, learner_streaks,
    lesson_progress, lessons, quiz_attempts, quiz_options, quiz_questions, quizzes,
};

const LEADERBOARD_SQL: &str = r"
SELECT candidates.learner_id,
       COALESCE(done.completed_courses, 0) AS completed_courses,
       COALESCE(streaks.current_streak_days, 0) AS current_streak_days
FROM (
    SELECT learner_id FROM enrollments WHERE NOT is_deleted
    UNION
    SELECT learner_id FROM learner_streaks
) AS candidates
LEFT JOIN (
    SELECT learner_id, COUNT(*) AS completed_courses
    FROM enrollments
    WHERE NOT is_deleted AND is_completed
    GROUP BY learner_id
) AS done ON done.learner_id = candidates.learner_id
LEFT JOIN learner_streaks AS streaks ON streaks.learner_id = candidates.learner_id
ORDER BY completed_courses DESC, current_streak_days DESC, candidates.learner_id
LIMIT $1
";

#[derive(Debug, QueryableByName)]
struct StandingRow {
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    learner_id: Uuid,
    #[diesel(sql_type = BigInt)]
    completed_courses: i64,
    #[diesel(sql_type = Integer)]
    current_streak_days: i32,
}

/// Failure inside a Diesel transaction: either the work itself or Diesel.
enum UnitFailure {
    Work(Error),
    Store(DieselError),
}

impl From<DieselError> for UnitFailure {
    fn from(error: DieselError) -> Self {
        Self::Store(error)
    }
}

/// Diesel-backed implementation of the learning store port.
#[derive(Clone)]
pub struct DieselLearningStore {
    pool: DbPool,
}

impl DieselLearningStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LearningStore for DieselLearningStore {
    async fn in_unit_of_work<T, F>(&self, work: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: for<'t> FnOnce(&'t mut dyn LearningTx) -> TxFuture<'t, T> + Send + 'static,
    {
        let mut pooled = self
            .pool
            .get()
            .await
            .map_err(|error| LearningStoreError::from(StoreFailure::from(error)))?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        conn.transaction::<T, UnitFailure, _>(|conn| {
            async move {
                let mut tx = DieselLearningTx { conn };
                work(&mut tx).await.map_err(UnitFailure::Work)
            }
            .scope_boxed()
        })
        .await
        .map_err(|failure| match failure {
            UnitFailure::Work(error) => error,
            UnitFailure::Store(error) => store_error(error).into(),
        })
    }
}

/// Transactional handle over one checked-out connection.
struct DieselLearningTx<'c> {
    conn: &'c mut AsyncPgConnection,
}

impl<'c> DieselLearningTx<'c> {
    fn conn(&mut self) -> &mut AsyncPgConnection {
        self.conn
    }

    /// Answers of `attempt_ids`, grouped by attempt.
    async fn answers_for(
        &mut self,
        attempt_ids: Vec<Uuid>,
    ) -> Result<HashMap<Uuid, Vec<GradedAnswer>>, LearningStoreError> {
        let rows: Vec<AnswerRow> = attempt_answers::table
            .filter(attempt_answers::attempt_id.eq_any(attempt_ids))
            .select(AnswerRow::as_select())
            .load(self.conn())
            .await
            .map_err(store_error)?;
        let mut grouped: HashMap<Uuid, Vec<GradedAnswer>> = HashMap::new();
        for row in rows {
            grouped
                .entry(row.attempt_id)
                .or_default()
                .push(GradedAnswer::from(row));
        }
        Ok(grouped)
    }

    async fn with_answers(
        &mut self,
        rows: Vec<AttemptRow>,
    ) -> Result<Vec<Attempt>, LearningStoreError> {
        let mut answers = self
            .answers_for(rows.iter().map(|row| row.id).collect())
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let attempt_answers = answers.remove(&row.id).unwrap_or_default();
                row.into_attempt(attempt_answers)
            })
            .collect())
    }

    fn attempts_query(
        enrollment_id: EnrollmentId,
        quiz_id: QuizId,
    ) -> quiz_attempts::BoxedQuery<'static, diesel::pg::Pg> {
        quiz_attempts::table
            .filter(quiz_attempts::enrollment_id.eq(Uuid::from(enrollment_id)))
            .filter(quiz_attempts::quiz_id.eq(Uuid::from(quiz_id)))
            .order((quiz_attempts::created_at.desc(), quiz_attempts::id.desc()))
            .into_boxed()
    }
}

#[async_trait]
impl<'c> LearningTx for DieselLearningTx<'c> {
    async fn find_course(
        &mut self,
        course_id: CourseId,
    ) -> Result<Option<Course>, LearningStoreError> {
        courses::table
            .find(Uuid::from(course_id))
            .select(CourseRow::as_select())
            .first::<CourseRow>(self.conn())
            .await
            .optional()
            .map(|row| row.map(Course::from))
            .map_err(store_error)
    }

    async fn load_outline(&mut self, course: &Course) -> Result<CourseOutline, LearningStoreError> {
        let course_uuid = Uuid::from(course.id);
        let modules: Vec<ModuleRow> = course_modules::table
            .filter(course_modules::course_id.eq(course_uuid))
            .filter(course_modules::is_deleted.eq(false))
            .select(ModuleRow::as_select())
            .load(self.conn())
            .await
            .map_err(store_error)?;
        let lesson_rows: Vec<LessonRow> = lessons::table
            .filter(lessons::course_id.eq(course_uuid))
            .filter(lessons::is_deleted.eq(false))
            .select(LessonRow::as_select())
            .load(self.conn())
            .await
            .map_err(store_error)?;
        let lessons = lesson_rows
            .into_iter()
            .map(Lesson::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CourseOutline::new(
            course.clone(),
            modules.into_iter().map(CourseModule::from).collect(),
            lessons,
        ))
    }

    async fn find_enrollment(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<Enrollment>, LearningStoreError> {
        enrollments::table
            .find(Uuid::from(enrollment_id))
            .select(EnrollmentRow::as_select())
            .first::<EnrollmentRow>(self.conn())
            .await
            .optional()
            .map(|row| row.map(Enrollment::from))
            .map_err(store_error)
    }

    async fn lock_enrollment(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<Enrollment>, LearningStoreError> {
        enrollments::table
            .find(Uuid::from(enrollment_id))
            .select(EnrollmentRow::as_select())
            .for_update()
            .first::<EnrollmentRow>(self.conn())
            .await
            .optional()
            .map(|row| row.map(Enrollment::from))
            .map_err(store_error)
    }

    async fn find_active_enrollment(
        &mut self,
        learner_id: LearnerId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, LearningStoreError> {
        enrollments::table
            .filter(enrollments::learner_id.eq(Uuid::from(learner_id)))
            .filter(enrollments::course_id.eq(Uuid::from(course_id)))
            .filter(enrollments::is_deleted.eq(false))
            .select(EnrollmentRow::as_select())
            .first::<EnrollmentRow>(self.conn())
            .await
            .optional()
            .map(|row| row.map(Enrollment::from))
            .map_err(store_error)
    }

    async fn find_latest_enrollment(
        &mut self,
        learner_id: LearnerId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, LearningStoreError> {
        enrollments::table
            .filter(enrollments::learner_id.eq(Uuid::from(learner_id)))
            .filter(enrollments::course_id.eq(Uuid::from(course_id)))
            .order((enrollments::is_deleted.asc(), enrollments::started_at.desc()))
            .select(EnrollmentRow::as_select())
            .first::<EnrollmentRow>(self.conn())
            .await
            .optional()
            .map(|row| row.map(Enrollment::from))
            .map_err(store_error)
    }

    async fn list_active_enrollments(
        &mut self,
        learner_id: LearnerId,
    ) -> Result<Vec<Enrollment>, LearningStoreError> {
        let rows: Vec<EnrollmentRow> = enrollments::table
            .filter(enrollments::learner_id.eq(Uuid::from(learner_id)))
            .filter(enrollments::is_deleted.eq(false))
            .order((enrollments::started_at.asc(), enrollments::id.asc()))
            .select(EnrollmentRow::as_select())
            .load(self.conn())
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(Enrollment::from).collect())
    }

    async fn insert_enrollment(
        &mut self,
        enrollment: &Enrollment,
    ) -> Result<(), LearningStoreError> {
        let row = EnrollmentRow::from(enrollment);
        self.conn()
            .transaction::<_, DieselError, _>(|conn| {
                async move {
                    diesel::insert_into(enrollments::table)
                        .values(&row)
                        .execute(conn)
                        .await
                        .map(|_| ())
                }
                .scope_boxed()
            })
            .await
            .map_err(store_error)
    }

    async fn update_enrollment(
        &mut self,
        enrollment: &Enrollment,
    ) -> Result<(), LearningStoreError> {
        diesel::update(enrollments::table.find(Uuid::from(enrollment.id)))
            .set(EnrollmentUpdate::from(enrollment))
            .execute(self.conn())
            .await
            .map(|_| ())
            .map_err(store_error)
    }

    async fn find_lesson_progress(
        &mut self,
        enrollment_id: EnrollmentId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, LearningStoreError> {
        lesson_progress::table
            .find((Uuid::from(enrollment_id), Uuid::from(lesson_id)))
            .select(LessonProgressRow::as_select())
            .first::<LessonProgressRow>(self.conn())
            .await
            .optional()
            .map(|row| row.map(LessonProgress::from))
            .map_err(store_error)
    }

    async fn list_lesson_progress(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<LessonProgress>, LearningStoreError> {
        let rows: Vec<LessonProgressRow> = lesson_progress::table
            .filter(lesson_progress::enrollment_id.eq(Uuid::from(enrollment_id)))
            .select(LessonProgressRow::as_select())
            .load(self.conn())
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(LessonProgress::from).collect())
    }

    async fn upsert_lesson_progress(
        &mut self,
        progress: &LessonProgress,
    ) -> Result<(), LearningStoreError> {
        let row = LessonProgressRow::from(progress);
        diesel::insert_into(lesson_progress::table)
            .values(&row)
            .on_conflict((lesson_progress::enrollment_id, lesson_progress::lesson_id))
            .do_update()
            .set(&row)
            .execute(self.conn())
            .await
            .map(|_| ())
            .map_err(store_error)
    }

    async fn find_quiz(&mut self, quiz_id: QuizId) -> Result<Option<Quiz>, LearningStoreError> {
        let Some(quiz) = quizzes::table
            .find(Uuid::from(quiz_id))
            .select(QuizRow::as_select())
            .first::<QuizRow>(self.conn())
            .await
            .optional()
            .map_err(store_error)?
        else {
            return Ok(None);
        };

        let questions: Vec<QuestionRow> = quiz_questions::table
            .filter(quiz_questions::quiz_id.eq(quiz.id))
            .order((quiz_questions::position.asc(), quiz_questions::id.asc()))
            .select(QuestionRow::as_select())
            .load(self.conn())
            .await
            .map_err(store_error)?;
        let options: Vec<OptionRow> = quiz_options::table
            .filter(
                quiz_options::question_id
                    .eq_any(questions.iter().map(|question| question.id).collect::<Vec<_>>()),
            )
            .order(quiz_options::id.asc())
            .select(OptionRow::as_select())
            .load(self.conn())
            .await
            .map_err(store_error)?;

        Ok(Some(Quiz {
            id: quiz.id.into(),
            lesson_id: quiz.lesson_id.into(),
            course_id: quiz.course_id.into(),
            title: quiz.title,
            passing_score_percent: quiz.passing_score_percent,
            time_limit_seconds: quiz.time_limit_seconds,
            questions: questions
                .into_iter()
                .map(|question| question.into_question(&options))
                .collect(),
        }))
    }

    async fn latest_failed_attempt(
        &mut self,
        enrollment_id: EnrollmentId,
        quiz_id: QuizId,
    ) -> Result<Option<Attempt>, LearningStoreError> {
        let row = Self::attempts_query(enrollment_id, quiz_id)
            .filter(quiz_attempts::is_passed.eq(false))
            .select(AttemptRow::as_select())
            .first::<AttemptRow>(self.conn())
            .await
            .optional()
            .map_err(store_error)?;
        match row {
            Some(row) => Ok(self.with_answers(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn insert_attempt(&mut self, attempt: &Attempt) -> Result<(), LearningStoreError> {
        let attempt_uuid = Uuid::from(attempt.id);
        diesel::insert_into(quiz_attempts::table)
            .values(AttemptRow::from(attempt))
            .execute(self.conn())
            .await
            .map_err(store_error)?;
        let answers: Vec<AnswerRow> = attempt
            .answers
            .iter()
            .map(|answer| AnswerRow {
                attempt_id: attempt_uuid,
                question_id: answer.question_id.into(),
                option_id: answer.option_id.into(),
                is_correct: answer.is_correct,
            })
            .collect();
        if !answers.is_empty() {
            diesel::insert_into(attempt_answers::table)
                .values(&answers)
                .execute(self.conn())
                .await
                .map_err(store_error)?;
        }
        Ok(())
    }

    async fn list_attempts(
        &mut self,
        enrollment_id: EnrollmentId,
        quiz_id: QuizId,
    ) -> Result<Vec<Attempt>, LearningStoreError> {
        let rows: Vec<AttemptRow> = Self::attempts_query(enrollment_id, quiz_id)
            .select(AttemptRow::as_select())
            .load(self.conn())
            .await
            .map_err(store_error)?;
        self.with_answers(rows).await
    }

    async fn list_enrollment_attempts(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<Attempt>, LearningStoreError> {
        let rows: Vec<AttemptRow> = quiz_attempts::table
            .filter(quiz_attempts::enrollment_id.eq(Uuid::from(enrollment_id)))
            .order((quiz_attempts::created_at.desc(), quiz_attempts::id.desc()))
            .select(AttemptRow::as_select())
            .load(self.conn())
            .await
            .map_err(store_error)?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_attempt(Vec::new()))
            .collect())
    }

    async fn find_streak(
        &mut self,
        learner_id: LearnerId,
    ) -> Result<Option<LearnerStreak>, LearningStoreError> {
        learner_streaks::table
            .find(Uuid::from(learner_id))
            .select(StreakRow::as_select())
            .first::<StreakRow>(self.conn())
            .await
            .optional()
            .map(|row| row.map(LearnerStreak::from))
            .map_err(store_error)
    }

    async fn save_streak(&mut self, streak: &LearnerStreak) -> Result<(), LearningStoreError> {
        let row = StreakRow::from(streak);
        diesel::insert_into(learner_streaks::table)
            .values(&row)
            .on_conflict(learner_streaks::learner_id)
            .do_update()
            .set(&row)
            .execute(self.conn())
            .await
            .map(|_| ())
            .map_err(store_error)
    }

    async fn leaderboard(
        &mut self,
        limit: usize,
    ) -> Result<Vec<LeaderboardStanding>, LearningStoreError> {
        let rows: Vec<StandingRow> = diesel::sql_query(LEADERBOARD_SQL)
            .bind::<BigInt, _>(i64::try_from(limit).unwrap_or(i64::MAX))
            .load(self.conn())
            .await
            .map_err(store_error)?;
        Ok(rows
            .into_iter()
            .map(|row| LeaderboardStanding {
                learner_id: row.learner_id.into(),
                completed_courses: row.completed_courses,
                current_streak_days: row.current_streak_days,
            })
            .collect())
    }

    async fn find_certificate(
        &mut self,
        certificate_id: CertificateId,
    ) -> Result<Option<Certificate>, LearningStoreError> {
        certificates::table
            .find(Uuid::from(certificate_id))
            .select(CertificateRow::as_select())
            .first::<CertificateRow>(self.conn())
            .await
            .optional()
            .map(|row| row.map(Certificate::from))
            .map_err(store_error)
    }

    async fn find_certificate_for_enrollment(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<Certificate>, LearningStoreError> {
        certificates::table
            .filter(certificates::enrollment_id.eq(Uuid::from(enrollment_id)))
            .select(CertificateRow::as_select())
            .first::<CertificateRow>(self.conn())
            .await
            .optional()
            .map(|row| row.map(Certificate::from))
            .map_err(store_error)
    }

    async fn insert_certificate(
        &mut self,
        certificate: &Certificate,
    ) -> Result<bool, LearningStoreError> {
        let inserted = diesel::insert_into(certificates::table)
            .values(CertificateRow::from(certificate))
            .on_conflict(certificates::enrollment_id)
            .do_nothing()
            .execute(self.conn())
            .await
            .map_err(store_error)?;
        if inserted == 0 {
            debug!(
                enrollment_id = %certificate.enrollment_id,
                "certificate already issued for enrollment"
            );
        }
        Ok(inserted == 1)
    }
}
