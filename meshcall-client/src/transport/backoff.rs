use crate::config::BackoffConfig;
use std::time::Duration;

/// Exponential reconnect delay: initial, initial * m, initial * m^2, ... capped.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    pub fn next_delay(&mut self) -> Duration {
        let factor = self.config.multiplier.max(1).saturating_pow(self.attempt);
        let delay = self
            .config
            .initial_delay
            .saturating_mul(factor)
            .min(self.config.max_delay);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
