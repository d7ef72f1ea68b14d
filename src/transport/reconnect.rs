use std::time::Duration;

use crate::config::ReconnectSettings;

/// Exponential backoff between connection attempts.
///
/// Delay for attempt `n` (0-indexed) is `initial_delay * 2^n`, capped at
/// `max_delay`. `None` from `next_delay` means stop reconnecting.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<usize>,
}

impl ExponentialBackoff {
    pub fn new(initial_delay: Duration, max_delay: Duration, max_attempts: Option<usize>) -> Self {
        Self {
            initial_delay,
            max_delay,
            max_attempts,
        }
    }

    pub fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }

        let factor = 2u32.saturating_pow(attempt.min(u32::MAX as usize) as u32);
        Some(self.initial_delay.saturating_mul(factor).min(self.max_delay))
    }

    pub fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.is_none_or(|max| attempt < max)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(30), None)
    }
}

impl From<&ReconnectSettings> for ExponentialBackoff {
    fn from(settings: &ReconnectSettings) -> Self {
        Self::new(
            Duration::from_millis(settings.initial_delay_ms),
            Duration::from_millis(settings.max_delay_ms),
            settings.max_attempts,
        )
    }
}
