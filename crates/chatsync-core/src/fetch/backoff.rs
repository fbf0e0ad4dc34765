use crate::config::CoreConfig;
use rand::Rng;
use std::time::Duration;

/// Exponential backoff with full jitter: the n-th wait is uniform in
/// `[0, min(ceiling, first * base^n)]`.
#[derive(Debug, Clone)]
pub struct BackoffMachine {
    first: Duration,
    ceiling: Duration,
    base: u32,
    attempts: u32,
}

impl BackoffMachine {
    pub fn new(first: Duration, ceiling: Duration, base: u32) -> Self {
        Self {
            first,
            ceiling,
            base,
            attempts: 0,
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(
            Duration::from_millis(config.backoff_first_ms),
            Duration::from_millis(config.backoff_ceiling_ms),
            config.backoff_base,
        )
    }

    /// Waits handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Upper bound of the next wait, before jitter.
    pub fn current_cap(&self) -> Duration {
        let factor = self.base.saturating_pow(self.attempts);
        self.first
            .checked_mul(factor)
            .map_or(self.ceiling, |d| d.min(self.ceiling))
    }

    pub fn next_delay(&mut self) -> Duration {
        let cap_ms = self.current_cap().as_millis() as u64;
        self.attempts = self.attempts.saturating_add(1);
        Duration::from_millis(rand::thread_rng().gen_range(0..=cap_ms))
    }
}
