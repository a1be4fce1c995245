//! Quiz gating, grading and attempt history.
//!
//! Two cooldowns are in play: the gate blocks a retry until
//! `quiz_gate_cooldown` has passed since the last failed attempt, while the
//! hint returned with a failed submission uses `quiz_retry_hint`. They are
//! configured separately and are not reconciled here.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use crate::domain::ports::{
    AttemptPayload, LearningStore, LearningTx, LessonCompletionPayload, Notification,
    QuizAttempts, QuizEligibilityPayload, QuizRequest, QuizSubmissionPayload, SubmitQuizRequest,
    notify_best_effort, require_active_learner,
};
use crate::domain::{
    Attempt, CallerRole, CertificateIssuer, CompletionRecorder, Enrollment, Error,
    LearnerIdentity, ProgressionPolicy, ProgressionPorts, Quiz, grade_submission,
};

use super::lesson_service::announce_course_completion;

/// Retry gate for one (enrollment, quiz) pair.
///
/// # Examples
/// ```
/// use chrono::{TimeDelta, Utc};
/// use lms_backend::domain::{CallerRole, QuizGate};
///
/// let gate = QuizGate::new(TimeDelta::hours(4));
/// let failed_at = Utc::now();
/// let verdict = gate.check(CallerRole::Learner, Some(failed_at), failed_at + TimeDelta::hours(1));
/// assert!(!verdict.can_start);
/// assert_eq!(verdict.retry_at, Some(failed_at + TimeDelta::hours(4)));
///
/// assert!(gate.check(CallerRole::Owner, Some(failed_at), failed_at).can_start);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizGate {
    cooldown: TimeDelta,
}

/// Outcome of [`QuizGate::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateVerdict {
    pub can_start: bool,
    /// Earliest instant a blocked learner may start again.
    pub retry_at: Option<DateTime<Utc>>,
}

impl QuizGate {
    pub fn new(cooldown: TimeDelta) -> Self {
        Self { cooldown }
    }

    /// Decide whether a new attempt may start at `now`, given the instant of
    /// the latest failed attempt.
    pub fn check(
        &self,
        role: CallerRole,
        last_failed_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> GateVerdict {
        if role.is_privileged() {
            return GateVerdict {
                can_start: true,
                retry_at: None,
            };
        }
        match last_failed_at.map(|failed_at| failed_at + self.cooldown) {
            Some(retry_at) if now < retry_at => GateVerdict {
                can_start: false,
                retry_at: Some(retry_at),
            },
            _ => GateVerdict {
                can_start: true,
                retry_at: None,
            },
        }
    }
}

/// Quiz, enrollment and the caller's role towards the course.
struct QuizContext {
    quiz: Quiz,
    enrollment: Enrollment,
    role: CallerRole,
}

/// Load the quiz and enrollment named by `request` and check the caller may
/// act on them. With `lock_enrollment` the enrollment row stays locked until
/// the unit of work ends.
async fn quiz_context(
    tx: &mut dyn LearningTx,
    learner: &LearnerIdentity,
    request: QuizRequest,
    lock_enrollment: bool,
) -> Result<QuizContext, Error> {
    let QuizRequest {
        quiz_id,
        enrollment_id,
        ..
    } = request;
    let quiz = tx
        .find_quiz(quiz_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("quiz {quiz_id} not found")))?;
    let enrollment = if lock_enrollment {
        tx.lock_enrollment(enrollment_id).await?
    } else {
        tx.find_enrollment(enrollment_id).await?
    };
    let enrollment = enrollment
        .ok_or_else(|| Error::not_found(format!("enrollment {enrollment_id} not found")))?;
    if enrollment.course_id != quiz.course_id {
        return Err(Error::invalid_request(
            "enrollment does not belong to the quiz's course",
        ));
    }
    let course = tx.find_course(quiz.course_id).await?;
    let role = learner.caller_role_for(course.as_ref());
    if enrollment.learner_id != learner.id && !role.is_privileged() {
        return Err(Error::forbidden("enrollment belongs to another learner"));
    }
    Ok(QuizContext {
        quiz,
        enrollment,
        role,
    })
}

/// Quiz service implementing [`QuizAttempts`].
pub struct QuizService<S> {
    ports: ProgressionPorts<S>,
    recorder: CompletionRecorder,
    gate: QuizGate,
    policy: ProgressionPolicy,
}

impl<S> Clone for QuizService<S> {
    fn clone(&self) -> Self {
        Self {
            ports: self.ports.clone(),
            recorder: self.recorder.clone(),
            gate: self.gate,
            policy: self.policy,
        }
    }
}

impl<S> QuizService<S>
where
    S: LearningStore,
{
    pub fn new(ports: ProgressionPorts<S>, policy: ProgressionPolicy) -> Self {
        let recorder = CompletionRecorder::new(
            CertificateIssuer::new(ports.renderer.clone()),
            policy,
        );
        Self {
            ports,
            recorder,
            gate: QuizGate::new(policy.quiz_gate_cooldown),
            policy,
        }
    }
}

struct Submission {
    payload: QuizSubmissionPayload,
    quiz_title: String,
    completed_course: Option<String>,
}

#[async_trait]
impl<S> QuizAttempts for QuizService<S>
where
    S: LearningStore,
{
    async fn eligibility(&self, request: QuizRequest) -> Result<QuizEligibilityPayload, Error> {
        let learner =
            require_active_learner(self.ports.identities.as_ref(), &request.learner_id).await?;
        let now = self.ports.clock.utc();
        let gate = self.gate;
        self.ports
            .store
            .in_unit_of_work(move |tx| {
                Box::pin(async move {
                    let QuizContext {
                        quiz,
                        enrollment,
                        role,
                    } = quiz_context(tx, &learner, request, false).await?;
                    let last_failed = tx.latest_failed_attempt(enrollment.id, quiz.id).await?;
                    let verdict =
                        gate.check(role, last_failed.map(|attempt| attempt.created_at), now);
                    Ok(QuizEligibilityPayload {
                        quiz_id: quiz.id,
                        can_start: verdict.can_start,
                        caller_role: role,
                        retry_at: verdict.retry_at,
                    })
                })
            })
            .await
    }

    async fn submit(&self, request: SubmitQuizRequest) -> Result<QuizSubmissionPayload, Error> {
        let SubmitQuizRequest {
            quiz: target,
            answers,
            time_spent_seconds,
        } = request;
        let learner_id = target.learner_id;
        let learner = require_active_learner(self.ports.identities.as_ref(), &learner_id).await?;
        let now = self.ports.clock.utc();
        let gate = self.gate;
        let policy = self.policy;
        let recorder = self.recorder.clone();

        let submission = self
            .ports
            .store
            .in_unit_of_work(move |tx| {
                Box::pin(async move {
                    let QuizContext {
                        quiz,
                        enrollment,
                        role,
                    } = quiz_context(tx, &learner, target, true).await?;
                    if enrollment.learner_id != learner.id {
                        return Err(Error::forbidden(
                            "attempts can only be submitted for your own enrollment",
                        ));
                    }
                    if !enrollment.is_active() {
                        return Err(Error::forbidden("enrollment is deactivated"));
                    }
                    let course = tx.find_course(quiz.course_id).await?.ok_or_else(|| {
                        Error::not_found(format!("course {} not found", quiz.course_id))
                    })?;
                    let outline = tx.load_outline(&course).await?;
                    let lesson = outline.find(quiz.lesson_id).cloned().ok_or_else(|| {
                        Error::not_found(format!("lesson {} not found", quiz.lesson_id))
                    })?;

                    if !role.is_privileged() {
                        let last_failed = tx.latest_failed_attempt(enrollment.id, quiz.id).await?;
                        let verdict =
                            gate.check(role, last_failed.map(|attempt| attempt.created_at), now);
                        if let Some(retry_at) = verdict.retry_at.filter(|_| !verdict.can_start) {
                            debug!(%learner_id, quiz_id = %quiz.id, %retry_at, "quiz gated");
                            return Err(
                                Error::forbidden("cooldown period not met").with_retry_at(retry_at)
                            );
                        }
                    }

                    if quiz.exceeds_time_limit(time_spent_seconds, policy.quiz_time_grace_seconds)
                    {
                        return Err(Error::invalid_request(format!(
                            "time limit of {} seconds exceeded",
                            quiz.time_limit_seconds
                        )));
                    }

                    let grade = grade_submission(&quiz, &answers, policy.default_passing_score)?;
                    let attempt =
                        Attempt::record(enrollment.id, quiz.id, grade, time_spent_seconds, now);
                    tx.insert_attempt(&attempt).await?;
                    info!(
                        enrollment_id = %enrollment.id,
                        quiz_id = %quiz.id,
                        percentage = attempt.percentage,
                        is_passed = attempt.is_passed,
                        "quiz graded"
                    );

                    let (next_attempt_at, lesson_completion, completed_course) =
                        if attempt.is_passed {
                            let report = recorder
                                .record(tx, &learner, enrollment, &outline, &lesson, 0, now)
                                .await?;
                            let completion = LessonCompletionPayload {
                                lesson_id: report.lesson_id,
                                recorded: true,
                                progress_percent: report.enrollment.progress_percent,
                                course_completed: report.course_completed,
                                certificate_id: report
                                    .certificate
                                    .as_ref()
                                    .map(|certificate| certificate.id),
                                streak_days: Some(report.streak.current_streak_days),
                            };
                            let completed_course =
                                report.course_completed.then(|| course.title.clone());
                            (None, Some(completion), completed_course)
                        } else {
                            debug!(
                                quiz_id = %quiz.id,
                                gate_cooldown_minutes = policy.quiz_gate_cooldown.num_minutes(),
                                retry_hint_minutes = policy.quiz_retry_hint.num_minutes(),
                                "quiz failed"
                            );
                            (Some(attempt.created_at + policy.quiz_retry_hint), None, None)
                        };

                    Ok(Submission {
                        payload: QuizSubmissionPayload {
                            attempt: AttemptPayload::from(attempt),
                            next_attempt_at,
                            lesson_completion,
                        },
                        quiz_title: quiz.title,
                        completed_course,
                    })
                })
            })
            .await?;

        if submission.payload.attempt.is_passed {
            notify_best_effort(
                self.ports.notifier.as_ref(),
                Notification::new(
                    learner_id,
                    "Quiz passed",
                    format!(
                        "You passed {} with {}%.",
                        submission.quiz_title, submission.payload.attempt.percentage
                    ),
                ),
            )
            .await;
        }
        if let Some(title) = submission.completed_course {
            announce_course_completion(self.ports.notifier.as_ref(), learner_id, &title).await;
        }
        Ok(submission.payload)
    }

    async fn history(&self, request: QuizRequest) -> Result<Vec<AttemptPayload>, Error> {
        let learner =
            require_active_learner(self.ports.identities.as_ref(), &request.learner_id).await?;
        self.ports
            .store
            .in_unit_of_work(move |tx| {
                Box::pin(async move {
                    let QuizContext {
                        quiz, enrollment, ..
                    } = quiz_context(tx, &learner, request, false).await?;
                    let attempts = tx.list_attempts(enrollment.id, quiz.id).await?;
                    Ok(attempts.into_iter().map(AttemptPayload::from).collect())
                })
            })
            .await
    }
}

#[cfg(test)]
#[path = "quiz_service_tests.rs"]
mod tests;

