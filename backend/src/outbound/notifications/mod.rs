//! Notification delivery adapters.
//!
//! - [`TracingNotificationDispatcher`] only logs; used when no webhook is
//!   configured.
//! - [`WebhookNotificationDispatcher`] posts JSON to a webhook on a spawned
//!   task with bounded retries.

mod retry;
mod tracing_dispatcher;
mod webhook;

pub use retry::{BackoffJitter, DeliverySleeper, RandomJitter, RetryPolicy, TokioSleeper};
pub use tracing_dispatcher::TracingNotificationDispatcher;
pub use webhook::WebhookNotificationDispatcher;
