use std::time::Duration;

/// Default pause between failed notification attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Decides whether a failed notification gets another try, and after how long.
///
/// A fresh policy is cloned for every entry, so counters never leak between
/// listings.
pub trait RetryPolicy: Clone {
    /// Consume one retry. Returns false once the policy is exhausted.
    fn attempt(&mut self) -> bool;

    /// Delay to wait before the next try.
    fn delay(&self) -> Duration;
}

/// Fixed delay, optionally capped at `max_retries`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedDelay {
    delay: Duration,
    max_retries: Option<u32>,
    used: u32,
}

impl FixedDelay {
    /// Retry forever with `delay` between tries.
    pub fn unbounded(delay: Duration) -> Self {
        Self {
            delay,
            max_retries: None,
            used: 0,
        }
    }

    /// Retry at most `max_retries` times.
    pub fn bounded(delay: Duration, max_retries: u32) -> Self {
        Self {
            delay,
            max_retries: Some(max_retries),
            used: 0,
        }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::unbounded(DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy for FixedDelay {
    fn attempt(&mut self) -> bool {
        if let Some(max) = self.max_retries {
            if self.used >= max {
                return false;
            }
        }
        self.used = self.used.saturating_add(1);
        true
    }

    fn delay(&self) -> Duration {
        self.delay
    }
}
