//! Streak and leaderboard reads.

use async_trait::async_trait;

use crate::domain::ports::{
    EngagementQuery, LeaderboardEntryPayload, LearningStore, MAX_LEADERBOARD_SIZE, StreakPayload,
    require_active_learner,
};
use crate::domain::{
    Error, LearnerId, ProgressionPolicy, ProgressionPorts, streak_message, visible_streak_days,
};

/// Engagement service implementing [`EngagementQuery`].
pub struct EngagementService<S> {
    ports: ProgressionPorts<S>,
    policy: ProgressionPolicy,
}

impl<S> Clone for EngagementService<S> {
    fn clone(&self) -> Self {
        Self {
            ports: self.ports.clone(),
            policy: self.policy,
        }
    }
}

impl<S> EngagementService<S>
where
    S: LearningStore,
{
    pub fn new(ports: ProgressionPorts<S>, policy: ProgressionPolicy) -> Self {
        Self { ports, policy }
    }
}

#[async_trait]
impl<S> EngagementQuery for EngagementService<S>
where
    S: LearningStore,
{
    async fn streak(&self, learner_id: LearnerId) -> Result<StreakPayload, Error> {
        require_active_learner(self.ports.identities.as_ref(), &learner_id).await?;
        let now = self.ports.clock.utc();
        let zone = self.policy.activity_zone;
        let stored = self
            .ports
            .store
            .in_unit_of_work(move |tx| {
                Box::pin(async move { Ok(tx.find_streak(learner_id).await?) })
            })
            .await?;
        let days = visible_streak_days(stored.as_ref(), now, zone);
        Ok(StreakPayload {
            learner_id,
            current_streak_days: days,
            last_active_at: stored.map(|streak| streak.last_active_at),
            message: streak_message(days).to_owned(),
        })
    }

    async fn leaderboard(&self, top: i64) -> Result<Vec<LeaderboardEntryPayload>, Error> {
        if !(1..=MAX_LEADERBOARD_SIZE).contains(&top) {
            return Err(Error::invalid_request(format!(
                "top must be between 1 and {MAX_LEADERBOARD_SIZE}"
            )));
        }
        let limit = usize::try_from(top).map_err(|_| Error::invalid_request("top is too large"))?;
        let standings = self
            .ports
            .store
            .in_unit_of_work(move |tx| Box::pin(async move { Ok(tx.leaderboard(limit).await?) }))
            .await?;

        let mut entries = Vec::with_capacity(standings.len());
        for standing in standings {
            let Some(identity) = self
                .ports
                .identities
                .find_learner(&standing.learner_id)
                .await?
                .filter(|identity| identity.is_active)
            else {
                continue;
            };
            let rank = u32::try_from(entries.len() + 1).unwrap_or(u32::MAX);
            entries.push(LeaderboardEntryPayload {
                rank,
                learner_id: standing.learner_id,
                full_name: identity.full_name,
                completed_courses: standing.completed_courses,
                current_streak_days: standing.current_streak_days,
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
#[path = "engagement_service_tests.rs"]
mod tests;
