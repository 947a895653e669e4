//! Reconnect backoff.

use std::time::Duration;

use super::connection::ReconnectConfig;

/// Attempt counter for one session, driven by [`ReconnectConfig`].
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempt: u32,
}

impl ReconnectPolicy {
    pub fn new(config: ReconnectConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Attempts made since the last successful open.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay before the next attempt, consuming it, or `None` once the
    /// configured maximum has been used up.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        let delay = self.config.delay_for_attempt(self.attempt);
        self.attempt += 1;
        Some(Duration::from_millis(u64::from(delay)))
    }

    pub fn is_exhausted(&self) -> bool {
        self.config.max_attempts > 0 && self.attempt >= self.config.max_attempts
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy::new(ReconnectConfig::default())
    }

    #[test]
    fn delays_grow_by_half_and_cap_at_fifteen_seconds() {
        let mut policy = policy();
        let delays: Vec<u64> = std::iter::from_fn(|| policy.next_delay())
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(
            delays,
            [1000, 1500, 2250, 3375, 5062, 7593, 11390, 15000, 15000, 15000]
        );
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn exhausts_after_max_attempts() {
        let mut policy = policy();
        for _ in 0..10 {
            assert!(policy.next_delay().is_some());
        }
        assert!(policy.is_exhausted());
        assert_eq!(policy.next_delay(), None);
        assert_eq!(policy.attempt(), 10);
    }

    #[test]
    fn reset_starts_over_from_base_delay() {
        let mut policy = policy();
        policy.next_delay();
        policy.next_delay();
        policy.reset();
        assert_eq!(policy.attempt(), 0);
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn zero_max_attempts_never_gives_up() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig {
            max_attempts: 0,
            ..ReconnectConfig::default()
        });
        for _ in 0..50 {
            assert!(policy.next_delay().is_some());
        }
    }
}
