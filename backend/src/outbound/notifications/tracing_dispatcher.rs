//! Dispatcher that records notifications in the log and nothing else.

use async_trait::async_trait;
use tracing::info;

use crate::domain::ports::{Notification, NotificationDispatcher, NotificationError};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotificationDispatcher;

#[async_trait]
impl NotificationDispatcher for TracingNotificationDispatcher {
    async fn dispatch(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(
            learner_id = %notification.learner_id,
            subject = %notification.subject,
            "notification"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LearnerId;

    #[tokio::test]
    async fn always_accepts() {
        let dispatcher = TracingNotificationDispatcher;
        dispatcher
            .dispatch(Notification::new(LearnerId::random(), "Hello", "World"))
            .await
            .expect("logged");
    }
}
