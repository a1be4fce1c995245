//! Subscription coverage consulted at admission and access time.

use chrono::{DateTime, Utc};

const TRIAL_MARKER: &str = "free trial";

/// The single subscription a learner holds at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSubscription {
    pub plan_name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl ActiveSubscription {
    /// Whether `at` falls inside `[starts_at, ends_at]`.
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.starts_at <= at && at <= self.ends_at
    }

    /// Trial plans are recognised by name and grant access to a single course.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use lms_backend::domain::ActiveSubscription;
    ///
    /// let now = Utc::now();
    /// let plan = ActiveSubscription {
    ///     plan_name: "7-day Free Trial".into(),
    ///     starts_at: now,
    ///     ends_at: now,
    /// };
    /// assert!(plan.is_trial());
    /// ```
    pub fn is_trial(&self) -> bool {
        self.plan_name.to_lowercase().contains(TRIAL_MARKER)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use chrono::TimeDelta;
    use rstest::rstest;

    fn plan(name: &str) -> ActiveSubscription {
        let now = Utc::now();
        ActiveSubscription {
            plan_name: name.to_owned(),
            starts_at: now - TimeDelta::days(1),
            ends_at: now + TimeDelta::days(1),
        }
    }

    #[rstest]
    #[case("Free Trial", true)]
    #[case("FREE TRIAL monthly", true)]
    #[case("Premium", false)]
    #[case("Trial", false)]
    fn detects_trial_plans(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(plan(name).is_trial(), expected);
    }

    #[rstest]
    fn covers_is_inclusive_on_both_ends() {
        let sub = plan("Premium");
        assert!(sub.covers(sub.starts_at));
        assert!(sub.covers(sub.ends_at));
        assert!(!sub.covers(sub.ends_at + TimeDelta::seconds(1)));
        assert!(!sub.covers(sub.starts_at - TimeDelta::seconds(1)));
    }
}
