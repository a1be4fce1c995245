//! Bounded exponential backoff for outbound deliveries.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Async sleep, injectable so tests do not wait.
#[async_trait]
pub trait DeliverySleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Spreads retry delays so failed deliveries do not retry in lockstep.
pub trait BackoffJitter: Send + Sync {
    /// Delay to wait before retry number `attempt` (1-based) given `base`.
    fn jittered_delay(&self, base: Duration, attempt: u32) -> Duration;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl DeliverySleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Adds up to a quarter of the base delay at random.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl BackoffJitter for RandomJitter {
    fn jittered_delay(&self, base: Duration, _attempt: u32) -> Duration {
        let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        let max_extra = (base_ms / 4).max(1);
        let extra = SmallRng::from_entropy().gen_range(0..=max_extra);
        Duration::from_millis(base_ms.saturating_add(extra))
    }
}

/// Attempt budget and backoff base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Exponential base delay before retry `attempt` (1-based).
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    /// Run `send` until it succeeds or the attempt budget is spent.
    ///
    /// Returns the last error when every attempt failed.
    pub async fn run<F, Fut, E>(
        &self,
        sleeper: &dyn DeliverySleeper,
        jitter: &dyn BackoffJitter,
        mut send: F,
    ) -> Result<u32, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let mut attempt = 1;
        loop {
            match send(attempt).await {
                Ok(()) => return Ok(attempt),
                Err(error) if attempt >= self.max_attempts => return Err(error),
                Err(_) => {
                    sleeper
                        .sleep(jitter.jittered_delay(self.base_delay_for(attempt), attempt))
                        .await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use rstest::rstest;

    use super::*;

    #[derive(Default)]
    struct RecordingSleeper(Mutex<Vec<Duration>>);

    #[async_trait]
    impl DeliverySleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.0.lock().expect("sleeper lock").push(duration);
        }
    }

    struct NoJitter;

    impl BackoffJitter for NoJitter {
        fn jittered_delay(&self, base: Duration, _attempt: u32) -> Duration {
            base
        }
    }

    #[rstest]
    #[case(1, 250)]
    #[case(2, 500)]
    #[case(3, 1000)]
    fn backoff_doubles(#[case] attempt: u32, #[case] expected_ms: u64) {
        assert_eq!(
            RetryPolicy::default().base_delay_for(attempt),
            Duration::from_millis(expected_ms)
        );
    }

    #[rstest]
    fn random_jitter_stays_within_a_quarter() {
        let base = Duration::from_millis(400);
        for attempt in 1..=20 {
            let delay = RandomJitter.jittered_delay(base, attempt);
            assert!(delay >= base && delay <= Duration::from_millis(500));
        }
    }

    #[tokio::test]
    async fn gives_up_after_the_attempt_budget() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);
        let outcome: Result<u32, &str> = RetryPolicy::default()
            .run(&sleeper, &NoJitter, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("503") }
            })
            .await;

        assert_eq!(outcome, Err("503"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *sleeper.0.lock().expect("sleeper lock"),
            vec![Duration::from_millis(250), Duration::from_millis(500)]
        );
    }

    #[tokio::test]
    async fn stops_at_the_first_success() {
        let sleeper = RecordingSleeper::default();
        let outcome: Result<u32, &str> = RetryPolicy::default()
            .run(&sleeper, &NoJitter, |attempt| async move {
                if attempt < 2 { Err("timeout") } else { Ok(()) }
            })
            .await;

        assert_eq!(outcome, Ok(2));
        assert_eq!(sleeper.0.lock().expect("sleeper lock").len(), 1);
    }
}
