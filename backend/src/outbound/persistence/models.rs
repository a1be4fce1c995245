//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain entities live
//! beside the rows they read.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::ports::LearningStoreError;
use crate::domain::{
    AnswerOption, Attempt, Certificate, Course, CourseModule, Enrollment, GradedAnswer,
    LearnerStreak, Lesson, LessonKind, LessonProgress, Question,
};

use super::schema::{
    attempt_answers, certificates, course_modules, courses, enrollments, learner_streaks,
    learners, lesson_progress, lessons, quiz_attempts, quiz_options, quiz_questions, quizzes,
};

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = learners)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct LearnerRow {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub email_verified: bool,
    pub is_active: bool,
}

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = courses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CourseRow {
    pub id: Uuid,
    pub title: String,
    pub instructor_id: Uuid,
    pub is_retired: bool,
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Self {
            id: row.id.into(),
            title: row.title,
            instructor_id: row.instructor_id.into(),
            is_retired: row.is_retired,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = course_modules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ModuleRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub position: i32,
    pub is_deleted: bool,
}

impl From<ModuleRow> for CourseModule {
    fn from(row: ModuleRow) -> Self {
        Self {
            id: row.id.into(),
            course_id: row.course_id.into(),
            title: row.title,
            position: row.position,
            is_deleted: row.is_deleted,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = lessons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct LessonRow {
    pub id: Uuid,
    pub module_id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub position: i32,
    pub kind: String,
    pub is_previewable: bool,
    pub is_deleted: bool,
    pub video_duration_seconds: Option<i32>,
    pub estimated_minutes: Option<i32>,
}

impl TryFrom<LessonRow> for Lesson {
    type Error = LearningStoreError;

    fn try_from(row: LessonRow) -> Result<Self, Self::Error> {
        let kind = LessonKind::parse(&row.kind).ok_or_else(|| {
            LearningStoreError::query(format!("lesson {} has unknown kind {:?}", row.id, row.kind))
        })?;
        Ok(Self {
            id: row.id.into(),
            module_id: row.module_id.into(),
            course_id: row.course_id.into(),
            title: row.title,
            position: row.position,
            kind,
            is_previewable: row.is_previewable,
            is_deleted: row.is_deleted,
            video_duration_seconds: row.video_duration_seconds,
            estimated_minutes: row.estimated_minutes,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = quizzes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct QuizRow {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub passing_score_percent: Option<i32>,
    pub time_limit_seconds: i32,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = quiz_questions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct QuestionRow {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub body: String,
    pub position: i32,
    pub is_deleted: bool,
}

impl QuestionRow {
    /// Attach the options that belong to this question.
    pub fn into_question(self, options: &[OptionRow]) -> Question {
        Question {
            id: self.id.into(),
            quiz_id: self.quiz_id.into(),
            text: self.body,
            position: self.position,
            is_deleted: self.is_deleted,
            options: options
                .iter()
                .filter(|option| option.question_id == self.id)
                .cloned()
                .map(AnswerOption::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = quiz_options)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct OptionRow {
    pub id: Uuid,
    pub question_id: Uuid,
    pub body: String,
    pub is_correct: bool,
    pub is_deleted: bool,
}

impl From<OptionRow> for AnswerOption {
    fn from(row: OptionRow) -> Self {
        Self {
            id: row.id.into(),
            question_id: row.question_id.into(),
            text: row.body,
            is_correct: row.is_correct,
            is_deleted: row.is_deleted,
        }
    }
}

// ---------------------------------------------------------------------------
// Enrollments and lesson progress
// ---------------------------------------------------------------------------

/// Row struct for reading and inserting enrollments.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = enrollments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EnrollmentRow {
    pub id: Uuid,
    pub learner_id: Uuid,
    pub course_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub progress_percent: f64,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_lesson_id: Option<Uuid>,
    pub certificate_id: Option<Uuid>,
    pub is_deleted: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<&Enrollment> for EnrollmentRow {
    fn from(enrollment: &Enrollment) -> Self {
        Self {
            id: *enrollment.id.as_uuid(),
            learner_id: *enrollment.learner_id.as_uuid(),
            course_id: *enrollment.course_id.as_uuid(),
            started_at: enrollment.started_at,
            progress_percent: enrollment.progress_percent,
            is_completed: enrollment.is_completed,
            completed_at: enrollment.completed_at,
            last_lesson_id: enrollment.last_lesson_id.map(Uuid::from),
            certificate_id: enrollment.certificate_id.map(Uuid::from),
            is_deleted: enrollment.is_deleted,
            updated_at: enrollment.updated_at,
        }
    }
}

impl From<EnrollmentRow> for Enrollment {
    fn from(row: EnrollmentRow) -> Self {
        Self {
            id: row.id.into(),
            learner_id: row.learner_id.into(),
            course_id: row.course_id.into(),
            started_at: row.started_at,
            progress_percent: row.progress_percent,
            is_completed: row.is_completed,
            completed_at: row.completed_at,
            last_lesson_id: row.last_lesson_id.map(Into::into),
            certificate_id: row.certificate_id.map(Into::into),
            is_deleted: row.is_deleted,
            updated_at: row.updated_at,
        }
    }
}

/// Changeset for the mutable enrollment columns.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = enrollments)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct EnrollmentUpdate {
    pub progress_percent: f64,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_lesson_id: Option<Uuid>,
    pub certificate_id: Option<Uuid>,
    pub is_deleted: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<&Enrollment> for EnrollmentUpdate {
    fn from(enrollment: &Enrollment) -> Self {
        Self {
            progress_percent: enrollment.progress_percent,
            is_completed: enrollment.is_completed,
            completed_at: enrollment.completed_at,
            last_lesson_id: enrollment.last_lesson_id.map(Uuid::from),
            certificate_id: enrollment.certificate_id.map(Uuid::from),
            is_deleted: enrollment.is_deleted,
            updated_at: enrollment.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = lesson_progress)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct LessonProgressRow {
    pub enrollment_id: Uuid,
    pub lesson_id: Uuid,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub watched_seconds: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<&LessonProgress> for LessonProgressRow {
    fn from(progress: &LessonProgress) -> Self {
        Self {
            enrollment_id: *progress.enrollment_id.as_uuid(),
            lesson_id: *progress.lesson_id.as_uuid(),
            is_completed: progress.is_completed,
            completed_at: progress.completed_at,
            watched_seconds: progress.watched_seconds,
            updated_at: progress.updated_at,
        }
    }
}

impl From<LessonProgressRow> for LessonProgress {
    fn from(row: LessonProgressRow) -> Self {
        Self {
            enrollment_id: row.enrollment_id.into(),
            lesson_id: row.lesson_id.into(),
            is_completed: row.is_completed,
            completed_at: row.completed_at,
            watched_seconds: row.watched_seconds,
            updated_at: row.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Quiz attempts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = quiz_attempts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AttemptRow {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub quiz_id: Uuid,
    pub score: i32,
    pub total_questions: i32,
    pub percentage: f64,
    pub is_passed: bool,
    pub time_spent_seconds: i32,
    pub created_at: DateTime<Utc>,
}

impl From<&Attempt> for AttemptRow {
    fn from(attempt: &Attempt) -> Self {
        Self {
            id: *attempt.id.as_uuid(),
            enrollment_id: *attempt.enrollment_id.as_uuid(),
            quiz_id: *attempt.quiz_id.as_uuid(),
            score: attempt.score,
            total_questions: attempt.total_questions,
            percentage: attempt.percentage,
            is_passed: attempt.is_passed,
            time_spent_seconds: attempt.time_spent_seconds,
            created_at: attempt.created_at,
        }
    }
}

impl AttemptRow {
    /// Convert into a domain attempt carrying `answers`.
    pub fn into_attempt(self, answers: Vec<GradedAnswer>) -> Attempt {
        Attempt {
            id: self.id.into(),
            enrollment_id: self.enrollment_id.into(),
            quiz_id: self.quiz_id.into(),
            score: self.score,
            total_questions: self.total_questions,
            percentage: self.percentage,
            is_passed: self.is_passed,
            time_spent_seconds: self.time_spent_seconds,
            created_at: self.created_at,
            answers,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = attempt_answers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AnswerRow {
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub option_id: Uuid,
    pub is_correct: bool,
}

impl From<AnswerRow> for GradedAnswer {
    fn from(row: AnswerRow) -> Self {
        Self {
            question_id: row.question_id.into(),
            option_id: row.option_id.into(),
            is_correct: row.is_correct,
        }
    }
}

// ---------------------------------------------------------------------------
// Streaks and certificates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = learner_streaks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct StreakRow {
    pub learner_id: Uuid,
    pub current_streak_days: i32,
    pub last_active_at: DateTime<Utc>,
}

impl From<&LearnerStreak> for StreakRow {
    fn from(streak: &LearnerStreak) -> Self {
        Self {
            learner_id: *streak.learner_id.as_uuid(),
            current_streak_days: streak.current_streak_days,
            last_active_at: streak.last_active_at,
        }
    }
}

impl From<StreakRow> for LearnerStreak {
    fn from(row: StreakRow) -> Self {
        Self {
            learner_id: row.learner_id.into(),
            current_streak_days: row.current_streak_days,
            last_active_at: row.last_active_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = certificates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CertificateRow {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub learner_id: Uuid,
    pub course_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub document_location: String,
    pub average_grade: Option<f64>,
}

impl From<&Certificate> for CertificateRow {
    fn from(certificate: &Certificate) -> Self {
        Self {
            id: *certificate.id.as_uuid(),
            enrollment_id: *certificate.enrollment_id.as_uuid(),
            learner_id: *certificate.learner_id.as_uuid(),
            course_id: *certificate.course_id.as_uuid(),
            issued_at: certificate.issued_at,
            document_location: certificate.document_location.clone(),
            average_grade: certificate.average_grade,
        }
    }
}

impl From<CertificateRow> for Certificate {
    fn from(row: CertificateRow) -> Self {
        Self {
            id: row.id.into(),
            enrollment_id: row.enrollment_id.into(),
            learner_id: row.learner_id.into(),
            course_id: row.course_id.into(),
            issued_at: row.issued_at,
            document_location: row.document_location,
            average_grade: row.average_grade,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn lesson_row(kind: &str) -> LessonRow {
        LessonRow {
            id: Uuid::new_v4(),
            module_id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            title: "Ownership".to_owned(),
            position: 1,
            kind: kind.to_owned(),
            is_previewable: false,
            is_deleted: false,
            video_duration_seconds: Some(600),
            estimated_minutes: None,
        }
    }

    #[rstest]
    #[case("video", LessonKind::Video)]
    #[case("reading", LessonKind::Reading)]
    #[case("quiz", LessonKind::Quiz)]
    fn lesson_rows_parse_their_kind(#[case] raw: &str, #[case] expected: LessonKind) {
        let lesson = Lesson::try_from(lesson_row(raw)).expect("known kind");
        assert_eq!(lesson.kind, expected);
        assert_eq!(lesson.video_duration_seconds, Some(600));
    }

    #[rstest]
    fn unknown_lesson_kind_is_a_query_error() {
        let error = Lesson::try_from(lesson_row("podcast")).expect_err("unknown kind");
        assert!(matches!(error, LearningStoreError::Query { .. }));
    }

    #[rstest]
    fn question_rows_keep_only_their_options() {
        let question_id = Uuid::new_v4();
        let option = |question_id| OptionRow {
            id: Uuid::new_v4(),
            question_id,
            body: "42".to_owned(),
            is_correct: true,
            is_deleted: false,
        };
        let options = vec![option(question_id), option(Uuid::new_v4())];
        let question = QuestionRow {
            id: question_id,
            quiz_id: Uuid::new_v4(),
            body: "Answer?".to_owned(),
            position: 1,
            is_deleted: false,
        }
        .into_question(&options);
        assert_eq!(question.options.len(), 1);
        assert_eq!(*question.options[0].question_id.as_uuid(), question_id);
    }
}
