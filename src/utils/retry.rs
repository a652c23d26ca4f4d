/// Bounded retry with exponential backoff for flaky downloads
use anyhow::{Context, Result};
use rand::Rng;
use std::time::Duration;
use tracing::{debug, error, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f32,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Policy allowing `retries` attempts after the first one
    pub fn with_retries(retries: u32) -> Self {
        Self {
            max_attempts: retries + 1,
            ..Default::default()
        }
    }

    pub fn no_backoff(mut self) -> Self {
        self.initial_backoff = Duration::ZERO;
        self.jitter = false;
        self
    }

    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let mut backoff = self.initial_backoff.as_millis() as f32;
        for _ in 0..attempt {
            backoff *= self.multiplier;
        }

        let mut duration =
            Duration::from_millis(backoff.min(self.max_backoff.as_millis() as f32) as u64);

        if self.jitter && !duration.is_zero() {
            let jitter_ms = rand::thread_rng().gen_range(0..=(duration.as_millis() / 4) as u64);
            duration += Duration::from_millis(jitter_ms);
        }

        duration
    }
}

/// Run `operation` until it succeeds or the policy's attempts are used up
pub fn with_retry<F, T>(mut operation: F, policy: &RetryPolicy, context: &str) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let attempts = policy.max_attempts.max(1);
    let mut remaining = attempts;
    let mut attempt = 0;

    loop {
        remaining -= 1;
        match operation() {
            Ok(result) => {
                if attempt > 0 {
                    debug!("{} succeeded after {} retries", context, attempt);
                }
                return Ok(result);
            }
            Err(err) if remaining > 0 => {
                let backoff = policy.calculate_backoff(attempt);
                warn!(
                    "Retrying {}. {} retries left after error: {}",
                    context, remaining, err
                );
                std::thread::sleep(backoff);
                attempt += 1;
            }
            Err(err) => {
                error!("All {} attempts failed for {}: {}", attempts, context, err);
                return Err(err).context(format!("Failed after {} attempts: {}", attempts, context));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_retry_succeeds_after_failures() {
        let counter = AtomicU32::new(0);
        let result = with_retry(
            || {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(anyhow::anyhow!("Temporary failure"))
                } else {
                    Ok(42)
                }
            },
            &RetryPolicy::with_retries(2).no_backoff(),
            "flaky download",
        );

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_retry_exhausts_attempts() {
        let counter = AtomicU32::new(0);
        let result = with_retry(
            || {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(anyhow::anyhow!("Always fails"))
            },
            &RetryPolicy::with_retries(2).no_backoff(),
            "dead mirror",
        );

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("Always fails"));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_backoff_calculation() {
        let policy = RetryPolicy {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
            jitter: false,
            ..Default::default()
        };
        assert_eq!(policy.calculate_backoff(0), Duration::from_millis(100));
        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(200));
        assert_eq!(policy.calculate_backoff(2), Duration::from_millis(350));
    }
}
