//! Learning progression domain.
//!
//! Purpose: decide what a learner may open next, record finished lessons,
//! aggregate them into course completion and certificates, gate and grade
//! quiz attempts, and derive the daily streak from the same activity.
//!
//! Public surface:
//! - Entities: `Enrollment`, `LessonProgress`, `CourseOutline`, `Quiz`,
//!   `Attempt`, `LearnerStreak`, `Certificate`.
//! - Pure policies: `unlock_reason`, `progress_percent`, `grade_submission`,
//!   `advance_streak`, `average_grade`, `judge_direct_completion`.
//! - Services implementing the driving ports in [`ports`].
//! - `Error` / `ErrorCode`: transport-agnostic failures.

pub mod access_policy;
pub mod catalog;
pub mod certificate;
pub mod certificate_issuer;
pub mod certificate_service;
pub mod completion_recorder;
pub mod engagement_service;
pub mod enrollment;
pub mod enrollment_service;
pub mod error;
pub mod ids;
pub mod learner;
pub mod lesson_service;
pub mod policy;
pub mod ports;
pub mod progression_ports;
pub mod quiz;
pub mod quiz_service;
pub mod streak;
pub mod subscription;
pub mod trace_id;

pub use self::access_policy::{
    AccessReason, LessonAccess, completed_lessons, ensure_subscription_covers,
    evaluate_lesson_access, trial_course, unlock_reason,
};
pub use self::catalog::{Course, CourseModule, CourseOutline, Lesson, LessonKind, OutlineModule};
pub use self::certificate::{Certificate, average_grade};
pub use self::certificate_issuer::CertificateIssuer;
pub use self::certificate_service::CertificateService;
pub use self::completion_recorder::{
    CompletionEvidence, CompletionRecorder, CompletionReport, CompletionVerdict,
    judge_direct_completion,
};
pub use self::engagement_service::EngagementService;
pub use self::enrollment::{
    Enrollment, LessonProgress, progress_percent, round_to_hundredths,
};
pub use self::enrollment_service::EnrollmentService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::ids::{
    AttemptId, CertificateId, CourseId, EnrollmentId, LearnerId, LessonId, ModuleId, OptionId,
    QuestionId, QuizId,
};
pub use self::learner::{CallerRole, LearnerIdentity, LearnerRole};
pub use self::lesson_service::LessonService;
pub use self::policy::ProgressionPolicy;
pub use self::progression_ports::ProgressionPorts;
pub use self::quiz::{
    AnswerOption, Attempt, Grade, GradedAnswer, Question, Quiz, SubmissionError, SubmittedAnswer,
    grade_submission,
};
pub use self::quiz_service::{GateVerdict, QuizGate, QuizService};
pub use self::streak::{
    LearnerStreak, StreakOutcome, advance_streak, streak_message, visible_streak_days,
};
pub use self::subscription::ActiveSubscription;
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};

/// Convenient result alias for domain operations.
///
/// # Examples
/// ```
/// use lms_backend::domain::{ApiResult, Error};
///
/// fn enroll() -> ApiResult<()> {
///     Err(Error::forbidden("email address is not verified"))
/// }
///
/// assert!(enroll().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
