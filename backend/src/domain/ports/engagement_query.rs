//! Driving port for streak and leaderboard reads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Error, LearnerId};

/// Largest leaderboard a caller may request.
pub const MAX_LEADERBOARD_SIZE: i64 = 1000;

/// A learner's daily streak as displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StreakPayload {
    pub learner_id: LearnerId,
    pub current_streak_days: i32,
    pub last_active_at: Option<DateTime<Utc>>,
    pub message: String,
}

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntryPayload {
    pub rank: u32,
    pub learner_id: LearnerId,
    pub full_name: String,
    pub completed_courses: i64,
    pub current_streak_days: i32,
}

/// Driving port for engagement reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EngagementQuery: Send + Sync {
    async fn streak(&self, learner_id: LearnerId) -> Result<StreakPayload, Error>;

    /// Top `top` learners; `top` must lie in `1..=1000`.
    async fn leaderboard(&self, top: i64) -> Result<Vec<LeaderboardEntryPayload>, Error>;
}
