//! Driving port for lesson access, completion and progress reads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    CertificateId, CourseId, EnrollmentId, Error, LearnerId, LessonAccess, LessonId, LessonKind,
    ModuleId,
};

/// A learner looking at one lesson of one course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonRequest {
    pub learner_id: LearnerId,
    pub course_id: CourseId,
    pub lesson_id: LessonId,
}

/// A learner looking at one course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseRequest {
    pub learner_id: LearnerId,
    pub course_id: CourseId,
}

/// Request to mark a lesson as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompleteLessonRequest {
    pub lesson: LessonRequest,
    pub watched_seconds: i32,
    pub finished: bool,
}

/// Outcome of a completion request.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonCompletionPayload {
    pub lesson_id: LessonId,
    /// `false` when a reading lesson was reported without the finished flag.
    pub recorded: bool,
    pub progress_percent: f64,
    pub course_completed: bool,
    pub certificate_id: Option<CertificateId>,
    pub streak_days: Option<i32>,
}

/// One learner's progress through one lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgressPayload {
    pub lesson_id: LessonId,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub watched_seconds: i32,
}

/// A lesson in the course progress tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonNodePayload {
    pub lesson_id: LessonId,
    pub title: String,
    pub position: i32,
    pub kind: LessonKind,
    pub is_previewable: bool,
    pub is_unlocked: bool,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub watched_seconds: i32,
}

/// A module in the course progress tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgressPayload {
    pub module_id: ModuleId,
    pub title: String,
    pub position: i32,
    pub lessons: Vec<LessonNodePayload>,
}

/// Whole-course progress for one learner.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgressPayload {
    pub course_id: CourseId,
    pub course_title: String,
    /// Absent when a privileged caller views a course they are not enrolled in.
    pub enrollment_id: Option<EnrollmentId>,
    pub progress_percent: f64,
    pub is_completed: bool,
    pub modules: Vec<ModuleProgressPayload>,
}

/// Where the learner should continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResumePayload {
    pub course_id: CourseId,
    /// `None` for a course without lessons.
    pub lesson_id: Option<LessonId>,
    pub module_id: Option<ModuleId>,
    /// `true` when taken from the last completed lesson rather than the
    /// course start.
    pub from_history: bool,
}

/// Driving port for the learner's path through a course.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LessonProgression: Send + Sync {
    /// Decide whether the learner may open the lesson now.
    async fn check_access(&self, request: LessonRequest) -> Result<LessonAccess, Error>;

    /// Record a lesson as finished and cascade into course completion.
    async fn complete_lesson(
        &self,
        request: CompleteLessonRequest,
    ) -> Result<LessonCompletionPayload, Error>;

    /// Progress row for one lesson, defaults when untouched.
    async fn lesson_progress(&self, request: LessonRequest) -> Result<LessonProgressPayload, Error>;

    /// Modules and lessons with completion and unlock state.
    async fn course_progress(&self, request: CourseRequest) -> Result<CourseProgressPayload, Error>;

    /// Lesson to continue from.
    async fn resume(&self, request: CourseRequest) -> Result<ResumePayload, Error>;
}
