//! Fully wired progression services over in-memory adapters.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use crate::domain::{
    ActiveSubscription, CertificateService, Enrollment, EngagementService, EnrollmentService,
    LearnerId, LearnerIdentity, LearnerRole, LessonService, ProgressionPolicy, ProgressionPorts,
    QuizService,
};

use super::fixtures::{learner, CourseBuilder, CourseFixture};
use super::{
    InMemoryIdentityLookup, InMemoryLearningStore, InMemorySubscriptionLookup, MutableClock,
    RecordingCertificateRenderer, RecordingNotifier,
};

/// Every in-memory double plus the policy the services run with.
pub struct TestEngine {
    pub store: Arc<InMemoryLearningStore>,
    pub identities: Arc<InMemoryIdentityLookup>,
    pub subscriptions: Arc<InMemorySubscriptionLookup>,
    pub renderer: Arc<RecordingCertificateRenderer>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<MutableClock>,
    pub policy: ProgressionPolicy,
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEngine {
    /// Engine whose clock reads 2026-03-10T06:00:00Z.
    pub fn new() -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 3, 10, 6, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Self {
            store: Arc::new(InMemoryLearningStore::default()),
            identities: Arc::new(InMemoryIdentityLookup::default()),
            subscriptions: Arc::new(InMemorySubscriptionLookup::default()),
            renderer: Arc::new(RecordingCertificateRenderer::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            clock: Arc::new(MutableClock::new(start)),
            policy: ProgressionPolicy::default(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        mockable::Clock::utc(self.clock.as_ref())
    }

    pub fn ports(&self) -> ProgressionPorts<InMemoryLearningStore> {
        ProgressionPorts::new(
            self.store.clone(),
            self.identities.clone(),
            self.subscriptions.clone(),
            self.renderer.clone(),
            self.notifier.clone(),
            self.clock.clone(),
        )
    }

    /// Register a learner holding a paid subscription for the next 30 days.
    pub fn add_learner(&self, full_name: &str) -> LearnerIdentity {
        let identity = learner(full_name);
        self.identities.insert(identity.clone());
        self.subscribe(identity.id, "Premium");
        identity
    }

    /// Register a learner with `roles` and no subscription.
    pub fn add_staff(&self, full_name: &str, roles: Vec<LearnerRole>) -> LearnerIdentity {
        let identity = LearnerIdentity {
            roles,
            ..learner(full_name)
        };
        self.identities.insert(identity.clone());
        identity
    }

    /// Grant `plan_name` from a day ago until 30 days ahead.
    pub fn subscribe(&self, learner_id: LearnerId, plan_name: &str) {
        let now = self.now();
        self.subscriptions.grant(
            learner_id,
            ActiveSubscription {
                plan_name: plan_name.to_owned(),
                starts_at: now - TimeDelta::days(1),
                ends_at: now + TimeDelta::days(30),
            },
        );
    }

    pub fn add_course(&self, builder: CourseBuilder) -> CourseFixture {
        let course = builder.build();
        self.store.seed_course(&course);
        course
    }

    /// Seed an enrollment directly, bypassing admission control.
    pub fn enroll(&self, learner: &LearnerIdentity, course: &CourseFixture) -> Enrollment {
        let enrollment = Enrollment::start(learner.id, course.course.id, self.now());
        self.store.seed_enrollment(&enrollment);
        enrollment
    }

    pub fn enrollment_service(&self) -> EnrollmentService<InMemoryLearningStore> {
        EnrollmentService::new(self.ports())
    }

    pub fn lesson_service(&self) -> LessonService<InMemoryLearningStore> {
        LessonService::new(self.ports(), self.policy)
    }

    pub fn quiz_service(&self) -> QuizService<InMemoryLearningStore> {
        QuizService::new(self.ports(), self.policy)
    }

    pub fn engagement_service(&self) -> EngagementService<InMemoryLearningStore> {
        EngagementService::new(self.ports(), self.policy)
    }

    pub fn certificate_service(&self) -> CertificateService<InMemoryLearningStore> {
        CertificateService::new(self.ports())
    }
}
