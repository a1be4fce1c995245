//! Tunable rules of the progression engine.

use chrono::{FixedOffset, Offset, TimeDelta, Utc};

/// Validated progression tunables used by the domain services.
///
/// Two quiz cooldowns exist: `quiz_gate_cooldown` decides whether a new
/// attempt may start, while `quiz_retry_hint` only feeds the "next attempt
/// at" timestamp returned after a failed attempt. They may disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressionPolicy {
    pub quiz_gate_cooldown: TimeDelta,
    pub quiz_retry_hint: TimeDelta,
    pub quiz_time_grace_seconds: i32,
    pub video_watch_threshold_percent: u8,
    pub default_passing_score: u8,
    pub activity_zone: FixedOffset,
}

/// Reference zone for streak days: UTC+04:00.
pub const DEFAULT_ACTIVITY_OFFSET_SECONDS: i32 = 4 * 3600;

impl Default for ProgressionPolicy {
    fn default() -> Self {
        Self {
            quiz_gate_cooldown: TimeDelta::hours(4),
            quiz_retry_hint: TimeDelta::hours(2),
            quiz_time_grace_seconds: 15,
            video_watch_threshold_percent: 90,
            default_passing_score: 50,
            activity_zone: FixedOffset::east_opt(DEFAULT_ACTIVITY_OFFSET_SECONDS)
                .unwrap_or_else(|| Utc.fix()),
        }
    }
}

impl ProgressionPolicy {
    /// Minimum watched seconds for a video needing `required_seconds`,
    /// truncated to whole seconds.
    ///
    /// # Examples
    /// ```
    /// use lms_backend::domain::ProgressionPolicy;
    ///
    /// assert_eq!(ProgressionPolicy::default().minimum_watch_seconds(600), 540);
    /// ```
    pub fn minimum_watch_seconds(&self, required_seconds: i64) -> i64 {
        required_seconds * i64::from(self.video_watch_threshold_percent) / 100
    }
}
