//! PostgreSQL-backed identity and subscription lookups.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{
    IdentityLookup, IdentityLookupError, SubscriptionLookup, SubscriptionLookupError,
};
use crate::domain::{ActiveSubscription, LearnerId, LearnerIdentity, LearnerRole};

use super::error_mapping::StoreFailure;
use super::models::LearnerRow;
use super::pool::DbPool;
use super::schema::{learner_roles, learner_subscriptions, learners, subscription_plans};

fn identity_from_rows(row: LearnerRow, roles: &[String]) -> LearnerIdentity {
    LearnerIdentity {
        id: row.id.into(),
        full_name: row.full_name,
        email: row.email,
        email_verified: row.email_verified,
        is_active: row.is_active,
        roles: roles.iter().filter_map(|role| LearnerRole::parse(role)).collect(),
    }
}

/// Diesel-backed implementation of the identity lookup port.
#[derive(Clone)]
pub struct DieselIdentityLookup {
    pool: DbPool,
}

impl DieselIdentityLookup {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityLookup for DieselIdentityLookup {
    async fn find_learner(
        &self,
        learner_id: &LearnerId,
    ) -> Result<Option<LearnerIdentity>, IdentityLookupError> {
        let mut conn = self.pool.get().await.map_err(StoreFailure::from)?;
        let learner_uuid = *learner_id.as_uuid();

        let Some(row) = learners::table
            .find(learner_uuid)
            .select(LearnerRow::as_select())
            .first::<LearnerRow>(&mut conn)
            .await
            .optional()
            .map_err(StoreFailure::from)?
        else {
            return Ok(None);
        };

        let roles: Vec<String> = learner_roles::table
            .filter(learner_roles::learner_id.eq(learner_uuid))
            .select(learner_roles::role)
            .load(&mut conn)
            .await
            .map_err(StoreFailure::from)?;
        Ok(Some(identity_from_rows(row, &roles)))
    }
}

/// Diesel-backed implementation of the subscription lookup port.
#[derive(Clone)]
pub struct DieselSubscriptionLookup {
    pool: DbPool,
}

impl DieselSubscriptionLookup {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionLookup for DieselSubscriptionLookup {
    async fn active_subscription(
        &self,
        learner_id: &LearnerId,
        at: DateTime<Utc>,
    ) -> Result<Option<ActiveSubscription>, SubscriptionLookupError> {
        let mut conn = self.pool.get().await.map_err(StoreFailure::from)?;
        let row: Option<(String, DateTime<Utc>, DateTime<Utc>)> = learner_subscriptions::table
            .inner_join(subscription_plans::table)
            .filter(learner_subscriptions::learner_id.eq(Uuid::from(*learner_id)))
            .filter(learner_subscriptions::starts_at.le(at))
            .filter(learner_subscriptions::ends_at.ge(at))
            .order(learner_subscriptions::ends_at.desc())
            .select((
                subscription_plans::name,
                learner_subscriptions::starts_at,
                learner_subscriptions::ends_at,
            ))
            .first(&mut conn)
            .await
            .optional()
            .map_err(StoreFailure::from)?;

        Ok(row.map(|(plan_name, starts_at, ends_at)| ActiveSubscription {
            plan_name,
            starts_at,
            ends_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn unknown_roles_are_dropped() {
        let row = LearnerRow {
            id: Uuid::new_v4(),
            full_name: "Ada Lovelace".to_owned(),
            email: "ada@example.com".to_owned(),
            email_verified: true,
            is_active: true,
        };
        let roles = vec!["student".to_owned(), "Admin".to_owned(), "janitor".to_owned()];
        let identity = identity_from_rows(row, &roles);
        assert_eq!(identity.roles, vec![LearnerRole::Student, LearnerRole::Admin]);
    }
}
