//! Port for resolving learner identity and roles.

use async_trait::async_trait;

use crate::domain::{Error, LearnerId, LearnerIdentity};

use super::define_port_error;

define_port_error! {
    /// Errors raised by identity lookup adapters.
    pub enum IdentityLookupError {
        /// Identity source could not be reached.
        Connection { message: String } as ServiceUnavailable =>
            "identity lookup connection failed: {message}",
        /// Lookup failed during execution.
        Query { message: String } as InternalError =>
            "identity lookup query failed: {message}",
    }
}

/// Port returning a learner's account status and role set.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    /// Identity of a learner, or `None` when no such account exists.
    ///
    /// Deleted accounts are returned with `is_active = false`.
    async fn find_learner(
        &self,
        learner_id: &LearnerId,
    ) -> Result<Option<LearnerIdentity>, IdentityLookupError>;
}

/// Resolve a learner that must exist, mapping adapter errors.
///
/// # Errors
/// [`Error::not_found`] for unknown learners and [`Error::forbidden`] for
/// deactivated accounts.
pub async fn require_active_learner<I>(
    identities: &I,
    learner_id: &LearnerId,
) -> Result<LearnerIdentity, Error>
where
    I: IdentityLookup + ?Sized,
{
    let learner = identities
        .find_learner(learner_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("learner {learner_id} not found")))?;
    if !learner.is_active {
        return Err(Error::forbidden("learner account is deactivated"));
    }
    Ok(learner)
}
