//! Jittered exponential backoff for the STT client's reconnect loop,
//! reparameterized from the node SDK's policy for the STT provider's
//! tighter bound (spec §4.2, §5: 250 ms initial, 10 s cap).

use std::time::Duration;

use rc_domain::config::ReconnectConfig;

#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    config: ReconnectConfig,
}

impl From<ReconnectConfig> for Backoff {
    fn from(config: ReconnectConfig) -> Self {
        Self { config }
    }
}

impl Backoff {
    /// Compute the delay for the given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.config.initial_delay_ms as f64;
        let delay_ms = base_ms * self.config.backoff_factor.powi(attempt as i32);
        let capped_ms = delay_ms.min(self.config.max_delay_ms as f64);

        let jitter = capped_ms * 0.25 * pseudo_random_fraction(attempt);
        Duration::from_millis((capped_ms + jitter) as u64)
    }

    pub fn should_give_up(&self, attempt: u32) -> bool {
        self.config.max_attempts > 0 && attempt >= self.config.max_attempts
    }
}

/// Cheap deterministic "random" fraction [0, 1) based on attempt number.
/// Not cryptographically secure — just enough to spread reconnect storms.
fn pseudo_random_fraction(attempt: u32) -> f64 {
    let hash = attempt.wrapping_mul(2654435761);
    (hash as f64) / (u32::MAX as f64)
}
