//! In-memory identity and subscription lookups.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{
    IdentityLookup, IdentityLookupError, SubscriptionLookup, SubscriptionLookupError,
};
use crate::domain::{ActiveSubscription, LearnerId, LearnerIdentity};

#[derive(Default)]
pub struct InMemoryIdentityLookup {
    learners: Mutex<HashMap<LearnerId, LearnerIdentity>>,
}

impl InMemoryIdentityLookup {
    pub fn insert(&self, identity: LearnerIdentity) {
        self.learners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity.id, identity);
    }

    /// Apply `change` to a stored identity.
    pub fn update(&self, learner_id: LearnerId, change: impl FnOnce(&mut LearnerIdentity)) {
        if let Some(identity) = self
            .learners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&learner_id)
        {
            change(identity);
        }
    }
}

#[async_trait]
impl IdentityLookup for InMemoryIdentityLookup {
    async fn find_learner(
        &self,
        learner_id: &LearnerId,
    ) -> Result<Option<LearnerIdentity>, IdentityLookupError> {
        Ok(self
            .learners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(learner_id)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemorySubscriptionLookup {
    plans: Mutex<HashMap<LearnerId, Vec<ActiveSubscription>>>,
}

impl InMemorySubscriptionLookup {
    pub fn grant(&self, learner_id: LearnerId, subscription: ActiveSubscription) {
        self.plans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(learner_id)
            .or_default()
            .push(subscription);
    }

    pub fn revoke_all(&self, learner_id: LearnerId) {
        self.plans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&learner_id);
    }
}

#[async_trait]
impl SubscriptionLookup for InMemorySubscriptionLookup {
    async fn active_subscription(
        &self,
        learner_id: &LearnerId,
        at: DateTime<Utc>,
    ) -> Result<Option<ActiveSubscription>, SubscriptionLookupError> {
        Ok(self
            .plans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(learner_id)
            .and_then(|plans| plans.iter().find(|plan| plan.covers(at)).cloned()))
    }
}
