use krkn_core::ConsoleSettings;
use std::time::Duration;

const BACKOFF_FACTOR: f64 = 1.5;

/// Bounded exponential backoff for log stream reconnects
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_attempts,
        }
    }

    pub fn from_settings(settings: &ConsoleSettings) -> Self {
        Self::new(
            settings.log_reconnect_base,
            settings.log_reconnect_max,
            settings.log_max_reconnect_attempts.min(u32::MAX as usize) as u32,
        )
    }

    /// `min(base * 1.5^(attempt - 1), max)` for a 1-based attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * BACKOFF_FACTOR.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Whether a reconnect numbered `attempt` is still allowed
    pub fn allows(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_settings(&ConsoleSettings::default())
    }
}
