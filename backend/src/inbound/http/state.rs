//! Shared HTTP adapter state.
//!
//! Handlers receive this through `web::Data` and only see driving ports, so
//! they can be exercised against in-memory adapters.

use std::sync::Arc;

use crate::domain::ports::{
    CertificateQuery, EngagementQuery, EnrollmentCommand, EnrollmentQuery, LearningStore,
    LessonProgression, QuizAttempts,
};
use crate::domain::{
    CertificateService, EngagementService, EnrollmentService, LessonService, ProgressionPolicy,
    ProgressionPorts, QuizService,
};

/// Driving ports used by the HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub enrollments: Arc<dyn EnrollmentCommand>,
    pub enrollments_query: Arc<dyn EnrollmentQuery>,
    pub lessons: Arc<dyn LessonProgression>,
    pub quizzes: Arc<dyn QuizAttempts>,
    pub engagement: Arc<dyn EngagementQuery>,
    pub certificates: Arc<dyn CertificateQuery>,
}

impl HttpState {
    /// Build every progression service over one set of adapters.
    ///
    /// The enrollment service backs both enrollment ports so they share the
    /// admission lock.
    pub fn from_ports<S>(ports: ProgressionPorts<S>, policy: ProgressionPolicy) -> Self
    where
        S: LearningStore + 'static,
    {
        let enrollments = Arc::new(EnrollmentService::new(ports.clone()));
        Self {
            enrollments: enrollments.clone(),
            enrollments_query: enrollments,
            lessons: Arc::new(LessonService::new(ports.clone(), policy)),
            quizzes: Arc::new(QuizService::new(ports.clone(), policy)),
            engagement: Arc::new(EngagementService::new(ports.clone(), policy)),
            certificates: Arc::new(CertificateService::new(ports)),
        }
    }
}
