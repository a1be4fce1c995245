//! Driving port for quiz gating, submission and history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    Attempt, AttemptId, CallerRole, EnrollmentId, Error, GradedAnswer, LearnerId, QuizId,
    SubmittedAnswer,
};

use super::LessonCompletionPayload;

/// A learner acting on a quiz through one of their enrollments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizRequest {
    pub learner_id: LearnerId,
    pub quiz_id: QuizId,
    pub enrollment_id: EnrollmentId,
}

/// A quiz submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitQuizRequest {
    pub quiz: QuizRequest,
    pub answers: Vec<SubmittedAnswer>,
    pub time_spent_seconds: i32,
}

/// Whether a new attempt may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizEligibilityPayload {
    pub quiz_id: QuizId,
    pub can_start: bool,
    pub caller_role: CallerRole,
    /// When the gate reopens; only set while blocked.
    pub retry_at: Option<DateTime<Utc>>,
}

/// One graded attempt.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttemptPayload {
    pub attempt_id: AttemptId,
    pub quiz_id: QuizId,
    pub enrollment_id: EnrollmentId,
    pub score: i32,
    pub total_questions: i32,
    pub percentage: f64,
    pub is_passed: bool,
    pub time_spent_seconds: i32,
    pub created_at: DateTime<Utc>,
    pub answers: Vec<GradedAnswer>,
}

impl From<Attempt> for AttemptPayload {
    fn from(value: Attempt) -> Self {
        Self {
            attempt_id: value.id,
            quiz_id: value.quiz_id,
            enrollment_id: value.enrollment_id,
            score: value.score,
            total_questions: value.total_questions,
            percentage: value.percentage,
            is_passed: value.is_passed,
            time_spent_seconds: value.time_spent_seconds,
            created_at: value.created_at,
            answers: value.answers,
        }
    }
}

/// Result of a graded submission.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmissionPayload {
    pub attempt: AttemptPayload,
    /// Suggested retry instant after a failed attempt.
    pub next_attempt_at: Option<DateTime<Utc>>,
    /// Completion of the quiz's lesson after a passing attempt.
    pub lesson_completion: Option<LessonCompletionPayload>,
}

/// Driving port for quiz attempts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizAttempts: Send + Sync {
    /// Whether the learner may start an attempt now.
    async fn eligibility(&self, request: QuizRequest) -> Result<QuizEligibilityPayload, Error>;

    /// Grade and record a submission. Every accepted submission stores an
    /// attempt, passing or not.
    async fn submit(&self, request: SubmitQuizRequest) -> Result<QuizSubmissionPayload, Error>;

    /// Attempts for the quiz on this enrollment, newest first.
    async fn history(&self, request: QuizRequest) -> Result<Vec<AttemptPayload>, Error>;
}
