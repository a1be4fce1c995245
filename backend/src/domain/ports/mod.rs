//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`LearningStore`, lookups, renderer, notifier) describe what
//! the engine needs from adapters; driving ports describe what inbound
//! adapters may ask of the engine.

mod macros;
pub(crate) use macros::define_port_error;

mod certificate_query;
mod certificate_renderer;
mod engagement_query;
mod enrollment_command;
mod identity_lookup;
mod learning_store;
mod lesson_progression;
mod notification_dispatcher;
mod quiz_attempts;
mod subscription_lookup;

#[cfg(test)]
pub use certificate_query::MockCertificateQuery;
pub use certificate_query::{CertificatePayload, CertificateQuery, CertificateRequest};
#[cfg(test)]
pub use certificate_renderer::MockCertificateRenderer;
pub use certificate_renderer::{
    CertificateFile, CertificateRenderError, CertificateRenderRequest, CertificateRenderer,
    RenderedCertificate,
};
#[cfg(test)]
pub use engagement_query::MockEngagementQuery;
pub use engagement_query::{
    EngagementQuery, LeaderboardEntryPayload, MAX_LEADERBOARD_SIZE, StreakPayload,
};
#[cfg(test)]
pub use enrollment_command::{MockEnrollmentCommand, MockEnrollmentQuery};
pub use enrollment_command::{
    EnrollRequest, EnrollResponse, EnrollmentCommand, EnrollmentPayload, EnrollmentQuery,
};
#[cfg(test)]
pub use identity_lookup::MockIdentityLookup;
pub use identity_lookup::{IdentityLookup, IdentityLookupError, require_active_learner};
pub use learning_store::{
    LeaderboardStanding, LearningStore, LearningStoreError, LearningTx, TxFuture,
};
#[cfg(test)]
pub use lesson_progression::MockLessonProgression;
pub use lesson_progression::{
    CompleteLessonRequest, CourseProgressPayload, CourseRequest, LessonCompletionPayload,
    LessonNodePayload, LessonProgression, LessonProgressPayload, LessonRequest,
    ModuleProgressPayload, ResumePayload,
};
#[cfg(test)]
pub use notification_dispatcher::MockNotificationDispatcher;
pub use notification_dispatcher::{
    Notification, NotificationDispatcher, NotificationError, notify_best_effort,
};
#[cfg(test)]
pub use quiz_attempts::MockQuizAttempts;
pub use quiz_attempts::{
    AttemptPayload, QuizAttempts, QuizEligibilityPayload, QuizRequest, QuizSubmissionPayload,
    SubmitQuizRequest,
};
#[cfg(test)]
pub use subscription_lookup::MockSubscriptionLookup;
pub use subscription_lookup::{SubscriptionLookup, SubscriptionLookupError};
