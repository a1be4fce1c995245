//! Enrollment admission control and enrollment listing.
//!
//! New enrollments are created under a process-wide lock so the
//! check-then-insert sequence does not race inside one instance. Across
//! instances the storage uniqueness constraint decides; losing that race is
//! repaired by re-reading the winning row.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::ports::{
    EnrollRequest, EnrollResponse, EnrollmentCommand, EnrollmentPayload, EnrollmentQuery,
    LearningStore, LearningStoreError, LearningTx, Notification, notify_best_effort,
    require_active_learner,
};
use crate::domain::{
    CourseId, Enrollment, Error, LearnerId, ProgressionPorts, average_grade,
};

/// Build the caller-facing view of an enrollment.
pub(crate) async fn describe_enrollment(
    tx: &mut dyn LearningTx,
    enrollment: &Enrollment,
) -> Result<EnrollmentPayload, Error> {
    let course_title = tx
        .find_course(enrollment.course_id)
        .await?
        .map(|course| course.title)
        .unwrap_or_default();
    let grade = if enrollment.is_completed {
        average_grade(&tx.list_enrollment_attempts(enrollment.id).await?)
    } else {
        None
    };
    Ok(EnrollmentPayload::from_enrollment(enrollment, course_title, grade))
}

enum Admission {
    Existing(EnrollmentPayload),
    Created(EnrollmentPayload),
}

/// Enrollment service implementing the enrollment driving ports.
pub struct EnrollmentService<S> {
    ports: ProgressionPorts<S>,
    admission_lock: Arc<Mutex<()>>,
}

impl<S> Clone for EnrollmentService<S> {
    fn clone(&self) -> Self {
        Self {
            ports: self.ports.clone(),
            admission_lock: Arc::clone(&self.admission_lock),
        }
    }
}

impl<S> EnrollmentService<S>
where
    S: LearningStore,
{
    /// Create the service with its own admission lock.
    pub fn new(ports: ProgressionPorts<S>) -> Self {
        Self {
            ports,
            admission_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn existing_enrollment(
        &self,
        learner_id: LearnerId,
        course_id: CourseId,
    ) -> Result<Option<EnrollmentPayload>, Error> {
        self.ports
            .store
            .in_unit_of_work(move |tx| {
                Box::pin(async move {
                    match tx.find_active_enrollment(learner_id, course_id).await? {
                        Some(enrollment) => Ok(Some(describe_enrollment(tx, &enrollment).await?)),
                        None => Ok(None),
                    }
                })
            })
            .await
    }
}

#[async_trait]
impl<S> EnrollmentCommand for EnrollmentService<S>
where
    S: LearningStore,
{
    async fn enroll(&self, request: EnrollRequest) -> Result<EnrollResponse, Error> {
        let EnrollRequest {
            learner_id,
            course_id,
        } = request;

        if let Some(existing) = self.existing_enrollment(learner_id, course_id).await? {
            debug!(%learner_id, %course_id, "already enrolled");
            return Ok(EnrollResponse {
                enrollment: existing,
                created: false,
            });
        }

        let learner = require_active_learner(self.ports.identities.as_ref(), &learner_id).await?;
        if !learner.email_verified {
            return Err(Error::forbidden("email address is not verified"));
        }

        let now = self.ports.clock.utc();
        let subscription = self
            .ports
            .subscriptions
            .active_subscription(&learner_id, now)
            .await?;

        let admission = {
            let _guard = self.admission_lock.lock().await;
            self.ports
                .store
                .in_unit_of_work(move |tx| {
                    Box::pin(async move {
                        let course = tx
                            .find_course(course_id)
                            .await?
                            .filter(|course| !course.is_retired)
                            .ok_or_else(|| {
                                Error::not_found(format!("course {course_id} not found"))
                            })?;

                        let active = tx.list_active_enrollments(learner_id).await?;
                        if let Some(existing) =
                            active.iter().find(|enrollment| enrollment.course_id == course_id)
                        {
                            return Ok(Admission::Existing(
                                describe_enrollment(tx, existing).await?,
                            ));
                        }

                        let Some(plan) = subscription.filter(|plan| plan.covers(now)) else {
                            return Err(Error::forbidden(
                                "an active subscription is required to enroll",
                            ));
                        };
                        if plan.is_trial() && !active.is_empty() {
                            return Err(Error::forbidden(
                                "free trial subscriptions allow a single course",
                            ));
                        }

                        let enrollment = Enrollment::start(learner_id, course_id, now);
                        match tx.insert_enrollment(&enrollment).await {
                            Ok(()) => Ok(Admission::Created(EnrollmentPayload::from_enrollment(
                                &enrollment,
                                course.title,
                                None,
                            ))),
                            Err(LearningStoreError::UniqueViolation { constraint }) => {
                                debug!(%learner_id, %course_id, %constraint, "lost enrollment race");
                                let winner = tx
                                    .find_active_enrollment(learner_id, course_id)
                                    .await?
                                    .ok_or_else(|| {
                                        Error::conflict("enrollment changed concurrently; retry")
                                    })?;
                                Ok(Admission::Existing(describe_enrollment(tx, &winner).await?))
                            }
                            Err(other) => Err(other.into()),
                        }
                    })
                })
                .await?
        };

        match admission {
            Admission::Existing(enrollment) => Ok(EnrollResponse {
                enrollment,
                created: false,
            }),
            Admission::Created(enrollment) => {
                info!(
                    %learner_id,
                    %course_id,
                    enrollment_id = %enrollment.enrollment_id,
                    "enrollment created"
                );
                notify_best_effort(
                    self.ports.notifier.as_ref(),
                    Notification::new(
                        learner_id,
                        "Enrollment confirmed",
                        format!("You are now enrolled in {}.", enrollment.course_title),
                    ),
                )
                .await;
                Ok(EnrollResponse {
                    enrollment,
                    created: true,
                })
            }
        }
    }
}

#[async_trait]
impl<S> EnrollmentQuery for EnrollmentService<S>
where
    S: LearningStore,
{
    async fn list_enrollments(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<EnrollmentPayload>, Error> {
        require_active_learner(self.ports.identities.as_ref(), &learner_id).await?;
        self.ports
            .store
            .in_unit_of_work(move |tx| {
                Box::pin(async move {
                    let enrollments = tx.list_active_enrollments(learner_id).await?;
                    let mut payloads = Vec::with_capacity(enrollments.len());
                    for enrollment in &enrollments {
                        payloads.push(describe_enrollment(tx, enrollment).await?);
                    }
                    Ok(payloads)
                })
            })
            .await
    }
}

#[cfg(test)]
#[path = "enrollment_service_tests.rs"]
mod tests;
