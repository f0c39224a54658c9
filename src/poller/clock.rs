use std::time::Duration;

/// Source of wall-clock time and delays for the poll loop.
///
/// Sleeps are plain futures, so dropping the loop (on shutdown) cancels
/// whatever delay is pending.
#[allow(async_fn_in_trait)]
pub trait Clock {
    /// Seconds since the Unix epoch.
    fn now(&self) -> i64;

    async fn sleep(&self, duration: Duration);
}

/// Real time via chrono and the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
