//! Lesson completion and everything it cascades into.
//!
//! Recording a completion upserts the lesson's progress row, moves the
//! enrollment's resume pointer, recomputes the course percentage, completes
//! the course (issuing its certificate) on reaching 100% and advances the
//! learner's streak. All of it runs in the caller's unit of work.

use chrono::{DateTime, Utc};
use tracing::info;

use super::certificate_issuer::CertificateIssuer;
use super::ports::LearningTx;
use super::{
    advance_streak, progress_percent, Certificate, CourseOutline, Enrollment, Error,
    LearnerIdentity, LearnerStreak, Lesson, LessonId, LessonKind, LessonProgress,
    ProgressionPolicy, StreakOutcome,
};

/// Evidence submitted with a direct completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionEvidence {
    pub watched_seconds: i32,
    /// Explicit "I have finished" flag required by reading lessons.
    pub finished: bool,
}

/// What the per-kind completion policy decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionVerdict {
    Accept { watched_seconds: i32 },
    /// Valid request, nothing to record yet.
    Defer,
}

/// Apply the per-kind completion rules to a direct completion request.
///
/// # Errors
/// `invalid_request` for quiz lessons, video lessons without a duration and
/// videos watched below the threshold.
///
/// # Examples
/// ```
/// use lms_backend::domain::{
///     judge_direct_completion, CompletionEvidence, CompletionVerdict, CourseId, Lesson, LessonId,
///     LessonKind, ModuleId, ProgressionPolicy,
/// };
///
/// let video = Lesson {
///     id: LessonId::random(),
///     module_id: ModuleId::random(),
///     course_id: CourseId::random(),
///     title: "Intro".into(),
///     position: 1,
///     kind: LessonKind::Video,
///     is_previewable: false,
///     is_deleted: false,
///     video_duration_seconds: Some(600),
///     estimated_minutes: None,
/// };
/// let policy = ProgressionPolicy::default();
/// let evidence = |watched_seconds| CompletionEvidence { watched_seconds, finished: false };
/// assert!(judge_direct_completion(&video, evidence(539), &policy).is_err());
/// assert_eq!(
///     judge_direct_completion(&video, evidence(540), &policy).expect("accepted"),
///     CompletionVerdict::Accept { watched_seconds: 540 }
/// );
/// ```
pub fn judge_direct_completion(
    lesson: &Lesson,
    evidence: CompletionEvidence,
    policy: &ProgressionPolicy,
) -> Result<CompletionVerdict, Error> {
    match lesson.kind {
        LessonKind::Video => {
            let required = lesson.required_watch_seconds().ok_or_else(|| {
                Error::invalid_request(format!(
                    "video lesson {} has no duration configured",
                    lesson.id
                ))
            })?;
            let minimum = policy.minimum_watch_seconds(required);
            let watched = i64::from(evidence.watched_seconds.max(0));
            if watched < minimum {
                return Err(Error::invalid_request(format!(
                    "insufficient watch time: {} more seconds required",
                    minimum - watched
                )));
            }
            Ok(CompletionVerdict::Accept {
                watched_seconds: evidence.watched_seconds,
            })
        }
        LessonKind::Reading if evidence.finished => {
            Ok(CompletionVerdict::Accept { watched_seconds: 0 })
        }
        LessonKind::Reading => Ok(CompletionVerdict::Defer),
        LessonKind::Quiz => Err(Error::invalid_request(
            "quiz lessons are completed by passing their quiz",
        )),
    }
}

/// Result of recording one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionReport {
    pub lesson_id: LessonId,
    /// Enrollment as persisted by this completion.
    pub enrollment: Enrollment,
    /// The course became complete with this completion.
    pub course_completed: bool,
    pub certificate: Option<Certificate>,
    pub streak: LearnerStreak,
}

/// Records completions inside the caller's unit of work.
#[derive(Clone)]
pub struct CompletionRecorder {
    issuer: CertificateIssuer,
    policy: ProgressionPolicy,
}

impl CompletionRecorder {
    pub fn new(issuer: CertificateIssuer, policy: ProgressionPolicy) -> Self {
        Self { issuer, policy }
    }

    /// Record that `lesson` of `outline` is finished for `enrollment`.
    ///
    /// Re-completing a lesson is allowed and never regresses its row. The
    /// enrollment is re-read under its row lock before progress is counted,
    /// so concurrent completions for one enrollment apply one after another.
    ///
    /// # Errors
    /// Store failures and certificate issuance failures; either aborts the
    /// whole unit of work.
    pub async fn record(
        &self,
        tx: &mut dyn LearningTx,
        learner: &LearnerIdentity,
        enrollment: Enrollment,
        outline: &CourseOutline,
        lesson: &Lesson,
        watched_seconds: i32,
        now: DateTime<Utc>,
    ) -> Result<CompletionReport, Error> {
        let mut enrollment = tx
            .lock_enrollment(enrollment.id)
            .await?
            .ok_or_else(|| Error::not_found(format!("enrollment {} not found", enrollment.id)))?;
        let existing = tx.find_lesson_progress(enrollment.id, lesson.id).await?;
        let progress = existing
            .unwrap_or_else(|| LessonProgress::untouched(enrollment.id, lesson.id, now))
            .mark_completed(watched_seconds, now);
        tx.upsert_lesson_progress(&progress).await?;

        let rows = tx.list_lesson_progress(enrollment.id).await?;
        let completed = rows
            .iter()
            .filter(|row| row.is_completed && outline.contains(row.lesson_id))
            .count();
        enrollment.progress_percent = progress_percent(completed, outline.active_lesson_count());
        enrollment.last_lesson_id = Some(lesson.id);
        enrollment.updated_at = now;
        info!(
            enrollment_id = %enrollment.id,
            lesson_id = %lesson.id,
            progress_percent = enrollment.progress_percent,
            "lesson completed"
        );

        let mut course_completed = false;
        let mut certificate = None;
        if enrollment.is_fully_progressed() && !enrollment.is_completed {
            enrollment.is_completed = true;
            enrollment.completed_at = Some(now);
            course_completed = true;
            info!(
                enrollment_id = %enrollment.id,
                course_id = %enrollment.course_id,
                "course completed"
            );
            certificate = Some(
                self.issuer
                    .issue(tx, learner, &mut enrollment, outline.course(), now)
                    .await?,
            );
        }
        tx.update_enrollment(&enrollment).await?;

        let streak = self.touch_streak(tx, learner, now).await?;

        Ok(CompletionReport {
            lesson_id: lesson.id,
            enrollment,
            course_completed,
            certificate,
            streak,
        })
    }

    async fn touch_streak(
        &self,
        tx: &mut dyn LearningTx,
        learner: &LearnerIdentity,
        now: DateTime<Utc>,
    ) -> Result<LearnerStreak, Error> {
        let existing = tx.find_streak(learner.id).await?;
        let (streak, outcome) = advance_streak(learner.id, existing, now, self.policy.activity_zone);
        if outcome.is_mutation() {
            tx.save_streak(&streak).await?;
        }
        if matches!(outcome, StreakOutcome::Extended | StreakOutcome::Reset) {
            info!(
                learner_id = %learner.id,
                streak_days = streak.current_streak_days,
                ?outcome,
                "streak updated"
            );
        }
        Ok(streak)
    }
}
