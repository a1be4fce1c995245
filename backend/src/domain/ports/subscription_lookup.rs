//! Port for reading a learner's subscription coverage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{ActiveSubscription, LearnerId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by subscription lookup adapters.
    pub enum SubscriptionLookupError {
        /// Subscription source could not be reached.
        Connection { message: String } as ServiceUnavailable =>
            "subscription lookup connection failed: {message}",
        /// Lookup failed during execution.
        Query { message: String } as InternalError =>
            "subscription lookup query failed: {message}",
    }
}

/// Port returning the single subscription active at an instant.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionLookup: Send + Sync {
    /// The subscription with `starts_at <= at <= ends_at`, if any.
    async fn active_subscription(
        &self,
        learner_id: &LearnerId,
        at: DateTime<Utc>,
    ) -> Result<Option<ActiveSubscription>, SubscriptionLookupError>;
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use rstest::rstest;

    use super::*;
    use crate::domain::{Error, ErrorCode};

    #[rstest]
    #[case(SubscriptionLookupError::connection("refused"), ErrorCode::ServiceUnavailable)]
    #[case(SubscriptionLookupError::query("bad column"), ErrorCode::InternalError)]
    fn lookup_failures_map_to_domain_codes(
        #[case] error: SubscriptionLookupError,
        #[case] expected: ErrorCode,
    ) {
        let mapped = Error::from(error);
        assert_eq!(mapped.code(), expected);
        assert!(mapped.message().starts_with("subscription lookup"));
    }
}
