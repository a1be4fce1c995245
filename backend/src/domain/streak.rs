//! Daily learning streak.
//!
//! Calendar days are taken in a fixed reference offset rather than UTC so a
//! learner near midnight does not flap between days.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use super::ids::LearnerId;

/// Consecutive-day activity counter for one learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearnerStreak {
    pub learner_id: LearnerId,
    pub current_streak_days: i32,
    pub last_active_at: DateTime<Utc>,
}

/// What a new activity did to the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakOutcome {
    /// No prior record; streak created at one day.
    Started,
    /// Activity on the same reference day, or clock skew into the past.
    Unchanged,
    /// Last activity was yesterday.
    Extended,
    /// A gap longer than one day.
    Reset,
}

impl StreakOutcome {
    /// Whether the stored row must be written.
    pub fn is_mutation(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

fn reference_day(at: DateTime<Utc>, zone: FixedOffset) -> NaiveDate {
    at.with_timezone(&zone).date_naive()
}

/// Apply one activity at `now` to an optional existing streak.
///
/// # Examples
/// ```
/// use chrono::{FixedOffset, TimeZone, Utc};
/// use lms_backend::domain::{advance_streak, LearnerId, StreakOutcome};
///
/// let zone = FixedOffset::east_opt(4 * 3600).expect("valid offset");
/// let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single().expect("valid time");
/// let (streak, outcome) = advance_streak(LearnerId::random(), None, now, zone);
/// assert_eq!(outcome, StreakOutcome::Started);
/// assert_eq!(streak.current_streak_days, 1);
/// ```
pub fn advance_streak(
    learner_id: LearnerId,
    existing: Option<LearnerStreak>,
    now: DateTime<Utc>,
    zone: FixedOffset,
) -> (LearnerStreak, StreakOutcome) {
    let Some(mut streak) = existing else {
        let created = LearnerStreak {
            learner_id,
            current_streak_days: 1,
            last_active_at: now,
        };
        return (created, StreakOutcome::Started);
    };

    let today = reference_day(now, zone);
    let last_day = reference_day(streak.last_active_at, zone);
    if last_day >= today {
        return (streak, StreakOutcome::Unchanged);
    }

    let outcome = if today.pred_opt() == Some(last_day) {
        streak.current_streak_days = streak.current_streak_days.saturating_add(1);
        StreakOutcome::Extended
    } else {
        streak.current_streak_days = 1;
        StreakOutcome::Reset
    };
    streak.last_active_at = now;
    (streak, outcome)
}

/// Streak days as they should be displayed at `now`: a streak whose last
/// activity is older than yesterday has already lapsed.
pub fn visible_streak_days(streak: Option<&LearnerStreak>, now: DateTime<Utc>, zone: FixedOffset) -> i32 {
    let Some(streak) = streak else {
        return 0;
    };
    let today = reference_day(now, zone);
    let last_day = reference_day(streak.last_active_at, zone);
    if last_day >= today || today.pred_opt() == Some(last_day) {
        streak.current_streak_days
    } else {
        0
    }
}

/// Encouragement shown next to the streak counter.
pub fn streak_message(days: i32) -> &'static str {
    match days {
        d if d >= 30 => "Legendary! A month of daily learning.",
        d if d >= 14 => "Two weeks strong. Keep the fire burning!",
        d if d >= 7 => "One full week. You're on a roll!",
        d if d >= 3 => "Building momentum. Come back tomorrow!",
        d if d > 0 => "Nice start. Keep going!",
        _ => "Start your streak today by completing a lesson.",
    }
}
