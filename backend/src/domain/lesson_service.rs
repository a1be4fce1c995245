//! Lesson access, direct completion and progress reads.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::ports::{
    CompleteLessonRequest, CourseProgressPayload, CourseRequest, LearningStore, LearningTx,
    LessonCompletionPayload, LessonNodePayload, LessonProgressPayload, LessonProgression,
    LessonRequest, ModuleProgressPayload, Notification, NotificationDispatcher, ResumePayload,
    notify_best_effort, require_active_learner,
};
use crate::domain::{
    CertificateIssuer, CompletionEvidence, CompletionRecorder, CompletionReport, CompletionVerdict,
    Course, CourseId, CourseOutline, Enrollment, Error, LearnerId, LessonAccess, LessonId,
    LessonProgress, ProgressionPolicy, ProgressionPorts, completed_lessons,
    evaluate_lesson_access, judge_direct_completion, unlock_reason,
};

/// Course, outline and the caller's active enrollment.
struct EnrolledCourse {
    outline: CourseOutline,
    enrollment: Enrollment,
}

async fn load_outline(tx: &mut dyn LearningTx, course_id: CourseId) -> Result<CourseOutline, Error> {
    let course = tx
        .find_course(course_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("course {course_id} not found")))?;
    Ok(tx.load_outline(&course).await?)
}

/// Resolve the enrollment a learner acts through.
///
/// # Errors
/// `forbidden` when the learner never enrolled or the enrollment is retired.
async fn enrolled_course(
    tx: &mut dyn LearningTx,
    learner_id: LearnerId,
    course_id: CourseId,
) -> Result<EnrolledCourse, Error> {
    let outline = load_outline(tx, course_id).await?;
    let enrollment = match tx.find_latest_enrollment(learner_id, course_id).await? {
        None => return Err(Error::forbidden("learner is not enrolled in this course")),
        Some(enrollment) if !enrollment.is_active() => {
            return Err(Error::forbidden("enrollment is deactivated"));
        }
        Some(enrollment) => enrollment,
    };
    Ok(EnrolledCourse {
        outline,
        enrollment,
    })
}

fn completion_payload(report: &CompletionReport) -> LessonCompletionPayload {
    LessonCompletionPayload {
        lesson_id: report.lesson_id,
        recorded: true,
        progress_percent: report.enrollment.progress_percent,
        course_completed: report.course_completed,
        certificate_id: report.certificate.as_ref().map(|certificate| certificate.id),
        streak_days: Some(report.streak.current_streak_days),
    }
}

/// Tell the learner about a course they just finished.
pub(crate) async fn announce_course_completion(
    notifier: &dyn NotificationDispatcher,
    learner_id: LearnerId,
    course_title: &str,
) {
    notify_best_effort(
        notifier,
        Notification::new(
            learner_id,
            "Course completed",
            format!("Congratulations on completing {course_title}. Your certificate is ready."),
        ),
    )
    .await;
}

fn build_tree(
    outline: &CourseOutline,
    enrollment: Option<&Enrollment>,
    progress: &[LessonProgress],
) -> CourseProgressPayload {
    let rows: HashMap<LessonId, &LessonProgress> =
        progress.iter().map(|row| (row.lesson_id, row)).collect();
    let completed = completed_lessons(progress);
    let modules = outline
        .modules()
        .iter()
        .map(|entry| ModuleProgressPayload {
            module_id: entry.module.id,
            title: entry.module.title.clone(),
            position: entry.module.position,
            lessons: entry
                .lessons
                .iter()
                .map(|lesson| {
                    let row = rows.get(&lesson.id);
                    LessonNodePayload {
                        lesson_id: lesson.id,
                        title: lesson.title.clone(),
                        position: lesson.position,
                        kind: lesson.kind,
                        is_previewable: lesson.is_previewable,
                        is_unlocked: enrollment.is_none()
                            || unlock_reason(outline, lesson, &completed).grants(),
                        is_completed: row.is_some_and(|row| row.is_completed),
                        completed_at: row.and_then(|row| row.completed_at),
                        watched_seconds: row.map_or(0, |row| row.watched_seconds),
                    }
                })
                .collect(),
        })
        .collect();
    let course: &Course = outline.course();
    CourseProgressPayload {
        course_id: course.id,
        course_title: course.title.clone(),
        enrollment_id: enrollment.map(|enrollment| enrollment.id),
        progress_percent: enrollment.map_or(0.0, |enrollment| enrollment.progress_percent),
        is_completed: enrollment.is_some_and(|enrollment| enrollment.is_completed),
        modules,
    }
}

/// Lesson service implementing [`LessonProgression`].
pub struct LessonService<S> {
    ports: ProgressionPorts<S>,
    recorder: CompletionRecorder,
    policy: ProgressionPolicy,
}

impl<S> Clone for LessonService<S> {
    fn clone(&self) -> Self {
        Self {
            ports: self.ports.clone(),
            recorder: self.recorder.clone(),
            policy: self.policy,
        }
    }
}

impl<S> LessonService<S>
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
            policy,
        }
    }
}

#[async_trait]
impl<S> LessonProgression for LessonService<S>
where
    S: LearningStore,
{
    async fn check_access(&self, request: LessonRequest) -> Result<LessonAccess, Error> {
        let LessonRequest {
            learner_id,
            course_id,
            lesson_id,
        } = request;
        require_active_learner(self.ports.identities.as_ref(), &learner_id).await?;
        let now = self.ports.clock.utc();
        let subscription = self
            .ports
            .subscriptions
            .active_subscription(&learner_id, now)
            .await?;
        self.ports
            .store
            .in_unit_of_work(move |tx| {
                Box::pin(async move {
                    evaluate_lesson_access(
                        tx,
                        learner_id,
                        subscription.as_ref(),
                        course_id,
                        lesson_id,
                        now,
                    )
                    .await
                })
            })
            .await
    }

    async fn complete_lesson(
        &self,
        request: CompleteLessonRequest,
    ) -> Result<LessonCompletionPayload, Error> {
        let CompleteLessonRequest {
            lesson:
                LessonRequest {
                    learner_id,
                    course_id,
                    lesson_id,
                },
            watched_seconds,
            finished,
        } = request;
        let learner = require_active_learner(self.ports.identities.as_ref(), &learner_id).await?;
        let now = self.ports.clock.utc();
        let recorder = self.recorder.clone();
        let policy = self.policy;

        let (payload, course_title) = self
            .ports
            .store
            .in_unit_of_work(move |tx| {
                Box::pin(async move {
                    let EnrolledCourse {
                        outline,
                        enrollment,
                    } = enrolled_course(tx, learner_id, course_id).await?;
                    let lesson = outline
                        .find(lesson_id)
                        .cloned()
                        .ok_or_else(|| Error::not_found(format!("lesson {lesson_id} not found")))?;

                    let progress = tx.list_lesson_progress(enrollment.id).await?;
                    if !unlock_reason(&outline, &lesson, &completed_lessons(&progress)).grants() {
                        debug!(%learner_id, %course_id, %lesson_id, "completion refused: locked");
                        return Err(Error::forbidden(
                            "lesson is locked until the previous lesson is completed",
                        ));
                    }

                    let evidence = CompletionEvidence {
                        watched_seconds,
                        finished,
                    };
                    let watched = match judge_direct_completion(&lesson, evidence, &policy)? {
                        CompletionVerdict::Accept { watched_seconds } => watched_seconds,
                        CompletionVerdict::Defer => {
                            debug!(%learner_id, %lesson_id, "reading not finished yet");
                            let payload = LessonCompletionPayload {
                                lesson_id,
                                recorded: false,
                                progress_percent: enrollment.progress_percent,
                                course_completed: false,
                                certificate_id: enrollment.certificate_id,
                                streak_days: None,
                            };
                            return Ok((payload, None));
                        }
                    };

                    let report = recorder
                        .record(tx, &learner, enrollment, &outline, &lesson, watched, now)
                        .await?;
                    let course_title = report
                        .course_completed
                        .then(|| outline.course().title.clone());
                    Ok((completion_payload(&report), course_title))
                })
            })
            .await?;

        if let Some(title) = course_title {
            announce_course_completion(self.ports.notifier.as_ref(), learner_id, &title).await;
        }
        Ok(payload)
    }

    async fn lesson_progress(&self, request: LessonRequest) -> Result<LessonProgressPayload, Error> {
        let LessonRequest {
            learner_id,
            course_id,
            lesson_id,
        } = request;
        require_active_learner(self.ports.identities.as_ref(), &learner_id).await?;
        self.ports
            .store
            .in_unit_of_work(move |tx| {
                Box::pin(async move {
                    let EnrolledCourse {
                        outline,
                        enrollment,
                    } = enrolled_course(tx, learner_id, course_id).await?;
                    if !outline.contains(lesson_id) {
                        return Err(Error::not_found(format!("lesson {lesson_id} not found")));
                    }
                    let row = tx.find_lesson_progress(enrollment.id, lesson_id).await?;
                    Ok(LessonProgressPayload {
                        lesson_id,
                        is_completed: row.as_ref().is_some_and(|row| row.is_completed),
                        completed_at: row.as_ref().and_then(|row| row.completed_at),
                        watched_seconds: row.map_or(0, |row| row.watched_seconds),
                    })
                })
            })
            .await
    }

    async fn course_progress(&self, request: CourseRequest) -> Result<CourseProgressPayload, Error> {
        let CourseRequest {
            learner_id,
            course_id,
        } = request;
        let learner = require_active_learner(self.ports.identities.as_ref(), &learner_id).await?;
        self.ports
            .store
            .in_unit_of_work(move |tx| {
                Box::pin(async move {
                    let outline = load_outline(tx, course_id).await?;
                    let role = learner.caller_role_for(Some(outline.course()));
                    match tx.find_active_enrollment(learner_id, course_id).await? {
                        Some(enrollment) => {
                            let progress = tx.list_lesson_progress(enrollment.id).await?;
                            Ok(build_tree(&outline, Some(&enrollment), &progress))
                        }
                        None if role.is_privileged() => Ok(build_tree(&outline, None, &[])),
                        None => Err(Error::forbidden("learner is not enrolled in this course")),
                    }
                })
            })
            .await
    }

    async fn resume(&self, request: CourseRequest) -> Result<ResumePayload, Error> {
        let CourseRequest {
            learner_id,
            course_id,
        } = request;
        require_active_learner(self.ports.identities.as_ref(), &learner_id).await?;
        self.ports
            .store
            .in_unit_of_work(move |tx| {
                Box::pin(async move {
                    let EnrolledCourse {
                        outline,
                        enrollment,
                    } = enrolled_course(tx, learner_id, course_id).await?;
                    let remembered = enrollment
                        .last_lesson_id
                        .and_then(|lesson_id| outline.find(lesson_id));
                    let (lesson, from_history) = match remembered {
                        Some(lesson) => (Some(lesson), true),
                        None => (outline.first_lesson(), false),
                    };
                    Ok(ResumePayload {
                        course_id,
                        lesson_id: lesson.map(|lesson| lesson.id),
                        module_id: lesson.map(|lesson| lesson.module_id),
                        from_history,
                    })
                })
            })
            .await
    }
}

#[cfg(test)]
#[path = "lesson_service_tests.rs"]
mod tests;
