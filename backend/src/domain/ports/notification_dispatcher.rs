//! Port for fire-and-forget learner notifications.

use async_trait::async_trait;
use tracing::warn;

use crate::domain::LearnerId;

use super::define_port_error;

define_port_error! {
    /// Errors raised while handing a notification to its channel.
    pub enum NotificationError {
        /// The channel refused or could not accept the notification.
        Delivery { message: String } as ServiceUnavailable =>
            "notification delivery failed: {message}",
    }
}

/// A message for one learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub learner_id: LearnerId,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn new(learner_id: LearnerId, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            learner_id,
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Port delivering notifications.
///
/// Adapters own their retry policy. Callers never see delivery failures
/// beyond the immediate hand-off result, which [`notify_best_effort`] logs
/// and drops.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notification: Notification) -> Result<(), NotificationError>;
}

/// Hand a notification to the dispatcher, logging any failure.
pub async fn notify_best_effort<N>(dispatcher: &N, notification: Notification)
where
    N: NotificationDispatcher + ?Sized,
{
    let learner_id = notification.learner_id;
    let subject = notification.subject.clone();
    if let Err(error) = dispatcher.dispatch(notification).await {
        warn!(%learner_id, %subject, %error, "notification dropped");
    }
}
