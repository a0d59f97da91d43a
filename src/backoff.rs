//! Exponential backoff with jitter, and the throttle/retry flow-control wrapper errors thread
//! through while a request is retried.

use std::time::Duration;

use rand::Rng;

/// Either the operation's own error, or a broker-requested pause before the next attempt.
///
/// Distinguishing the two lets a caller short-circuit retry-budget accounting for a throttle:
/// waiting out a quota violation should not count against the same budget as a genuine failure.
#[derive(Debug)]
pub enum ErrorOrThrottle<E> {
    Error(E),
    Throttle(Duration),
}

#[derive(Debug, Clone)]
pub struct BackoffConfig {
    pub init_backoff: Duration,
    pub max_backoff: Duration,
    pub base: f64,
    pub deadline: Option<Duration>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            init_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            base: 2.0,
            deadline: None,
        }
    }
}

/// Stateful backoff sequence: each call to [`Backoff::next`] returns the next delay, or `None`
/// once the configured deadline has elapsed.
#[derive(Debug)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
    deadline: Option<std::time::Instant>,
}

impl Backoff {
    pub fn new(config: &BackoffConfig) -> Self {
        Self {
            config: config.clone(),
            attempt: 0,
            deadline: config.deadline.map(|d| std::time::Instant::now() + d),
        }
    }

    /// The delay for the next retry attempt, or `None` if the deadline has passed.
    pub fn next(&mut self) -> Option<Duration> {
        if let Some(deadline) = self.deadline {
            if std::time::Instant::now() >= deadline {
                return None;
            }
        }

        let exp = self.config.base.powi(self.attempt as i32);
        let scaled = self.config.init_backoff.mul_f64(exp).min(self.config.max_backoff);
        self.attempt += 1;

        let jittered_millis = rand::thread_rng().gen_range(0..=scaled.as_millis() as u64);
        Some(Duration::from_millis(jittered_millis.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_are_capped() {
        let config = BackoffConfig {
            init_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(500),
            base: 2.0,
            deadline: None,
        };
        let mut backoff = Backoff::new(&config);
        for _ in 0..10 {
            let delay = backoff.next().unwrap();
            assert!(delay <= Duration::from_millis(500));
        }
    }

    #[test]
    fn deadline_eventually_exhausts() {
        let config = BackoffConfig {
            init_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
            base: 1.0,
            deadline: Some(Duration::from_millis(0)),
        };
        let mut backoff = Backoff::new(&config);
        assert!(backoff.next().is_none());
    }
}
