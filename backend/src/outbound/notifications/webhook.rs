//! Reqwest-backed webhook notification dispatcher.
//!
//! `dispatch` only hands the notification to a spawned task; delivery and
//! its retries happen off the request path and failures end in a `warn` log.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::LearnerId;
use crate::domain::ports::{Notification, NotificationDispatcher, NotificationError};

use super::retry::{BackoffJitter, DeliverySleeper, RandomJitter, RetryPolicy, TokioSleeper};

/// JSON body posted to the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookPayload {
    learner_id: LearnerId,
    subject: String,
    body: String,
}

impl From<Notification> for WebhookPayload {
    fn from(notification: Notification) -> Self {
        Self {
            learner_id: notification.learner_id,
            subject: notification.subject,
            body: notification.body,
        }
    }
}

fn check_status(status: StatusCode) -> Result<(), String> {
    if status.is_success() {
        Ok(())
    } else {
        Err(format!("webhook responded with {status}"))
    }
}

/// Posts notifications to one webhook endpoint.
#[derive(Clone)]
pub struct WebhookNotificationDispatcher {
    client: Client,
    endpoint: Url,
    policy: RetryPolicy,
    sleeper: Arc<dyn DeliverySleeper>,
    jitter: Arc<dyn BackoffJitter>,
}

impl WebhookNotificationDispatcher {
    /// Build a dispatcher whose requests time out after `timeout`.
    ///
    /// # Errors
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(RandomJitter),
        })
    }

    /// Replace the retry policy and its sleep and jitter strategies.
    pub fn with_retry(
        mut self,
        policy: RetryPolicy,
        sleeper: Arc<dyn DeliverySleeper>,
        jitter: Arc<dyn BackoffJitter>,
    ) -> Self {
        self.policy = policy;
        self.sleeper = sleeper;
        self.jitter = jitter;
        self
    }

    async fn post(&self, payload: &WebhookPayload) -> Result<(), String> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(payload)
            .send()
            .await
            .map_err(|error| error.to_string())?;
        check_status(response.status())
    }

    async fn deliver(self, payload: WebhookPayload) {
        let learner_id = payload.learner_id;
        let outcome = self
            .policy
            .run(self.sleeper.as_ref(), self.jitter.as_ref(), |attempt| {
                let payload = &payload;
                let this = &self;
                async move {
                    let result = this.post(payload).await;
                    if let Err(error) = &result {
                        debug!(%learner_id, attempt, %error, "webhook delivery attempt failed");
                    }
                    result
                }
            })
            .await;
        match outcome {
            Ok(attempts) => debug!(%learner_id, attempts, "webhook notification delivered"),
            Err(error) => warn!(
                %learner_id,
                subject = %payload.subject,
                %error,
                "webhook notification abandoned"
            ),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookNotificationDispatcher {
    async fn dispatch(&self, notification: Notification) -> Result<(), NotificationError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|error| NotificationError::delivery(error.to_string()))?;
        runtime.spawn(self.clone().deliver(WebhookPayload::from(notification)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    struct ImmediateSleeper;

    #[async_trait]
    impl DeliverySleeper for ImmediateSleeper {
        async fn sleep(&self, _duration: Duration) {}
    }

    #[rstest]
    fn payload_uses_camel_case() {
        let learner_id = LearnerId::random();
        let payload = WebhookPayload::from(Notification::new(learner_id, "Quiz passed", "Well done"));
        let json = serde_json::to_value(&payload).expect("serialises");
        assert_eq!(
            json,
            serde_json::json!({
                "learnerId": learner_id.to_string(),
                "subject": "Quiz passed",
                "body": "Well done",
            })
        );
    }

    #[rstest]
    #[case(StatusCode::OK, true)]
    #[case(StatusCode::NO_CONTENT, true)]
    #[case(StatusCode::SERVICE_UNAVAILABLE, false)]
    #[case(StatusCode::BAD_REQUEST, false)]
    fn only_success_statuses_count(#[case] status: StatusCode, #[case] delivered: bool) {
        assert_eq!(check_status(status).is_ok(), delivered);
    }

    #[tokio::test]
    async fn dispatch_returns_before_delivery() {
        let endpoint = Url::parse("http://127.0.0.1:9/hooks").expect("valid url");
        let dispatcher = WebhookNotificationDispatcher::new(endpoint, Duration::from_millis(50))
            .expect("client")
            .with_retry(
                RetryPolicy::default(),
                Arc::new(ImmediateSleeper),
                Arc::new(RandomJitter),
            );
        dispatcher
            .dispatch(Notification::new(LearnerId::random(), "Enrolled", "Welcome"))
            .await
            .expect("handed off");
    }
}
