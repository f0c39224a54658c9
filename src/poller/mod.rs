//! The dedup-and-notify loop.
//!
//! Each cycle purges expired seen records, fetches the feed, and walks its
//! entries in feed order. Unseen entries are delivered to the notifier and
//! then recorded; seen ones are dropped without logging. The first cycle
//! after startup records everything it finds without notifying, so a cold
//! start never floods the webhook with listings that were already live.
//!
//! Failure policy:
//!
//! - feed errors abort the cycle, the loop sleeps and tries again
//! - purge errors are logged and ignored
//! - `has_seen`/`record` errors abort the cycle (fail closed), since
//!   guessing would risk a duplicate notification
//! - notify failures are retried per [`RetryPolicy`]

mod clock;
mod retry;

pub use clock::{Clock, TokioClock};
pub use retry::{FixedDelay, RetryPolicy, DEFAULT_RETRY_DELAY};

use std::time::Duration;
use thiserror::Error;

use crate::feed::{self, Entry, FeedSource, FetchError};
use crate::notify::{NotificationEvent, Notifier};
use crate::storage::{SeenStore, StoreError, DEFAULT_RETENTION};

/// Default delay between cycles
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);
/// Default pause after each recorded entry
pub const DEFAULT_ENTRY_PAUSE: Duration = Duration::from_secs(1);

/// Timing and addressing knobs for the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub poll_interval: Duration,
    pub entry_pause: Duration,
    pub retention: Duration,
    /// Prefix joined with each node id to form the entry url
    pub node_base_url: String,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            entry_pause: DEFAULT_ENTRY_PAUSE,
            retention: DEFAULT_RETENTION,
            node_base_url: crate::config::DEFAULT_NODE_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Starting,
    Purging,
    Fetching,
    Filtering,
    Notifying,
    Recording,
    Sleeping,
}

/// Counters for one completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Unseen entries found this cycle
    pub discovered: usize,
    pub notified: usize,
    pub recorded: usize,
    /// Marker lines that could not be parsed
    pub malformed: usize,
    /// Entries whose delivery ran out of retries; left unrecorded
    pub abandoned: usize,
}

/// Why a cycle stopped early.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Unable to fetch feed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Seen store failure: {0}")]
    Store(#[from] StoreError),
}

pub struct Poller<F, N, C, R> {
    source: F,
    store: SeenStore,
    notifier: N,
    clock: C,
    retry: R,
    settings: PollSettings,
    initial_run: bool,
    state: PollState,
}

impl<F, N, C, R> Poller<F, N, C, R>
where
    F: FeedSource,
    N: Notifier,
    C: Clock,
    R: RetryPolicy,
{
    pub fn new(
        source: F,
        store: SeenStore,
        notifier: N,
        clock: C,
        retry: R,
        settings: PollSettings,
    ) -> Self {
        Self {
            source,
            store,
            notifier,
            clock,
            retry,
            settings,
            initial_run: true,
            state: PollState::Starting,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// True until the first cycle completes.
    pub fn is_initial_run(&self) -> bool {
        self.initial_run
    }

    pub fn store(&self) -> &SeenStore {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Poll forever. Only returns if the surrounding task is dropped.
    pub async fn run(&mut self) {
        tracing::info!(
            interval_secs = self.settings.poll_interval.as_secs(),
            "Starting feed watch"
        );
        loop {
            // Outcome is logged inside run_once
            let _ = self.run_once().await;
        }
    }

    /// Run one cycle, log its outcome, then sleep for the poll interval.
    ///
    /// The initial-run flag is cleared only after a cycle completes, so a
    /// failed first fetch keeps suppressing notifications.
    pub async fn run_once(&mut self) -> Result<CycleReport, CycleError> {
        let result = self.run_cycle().await;

        match &result {
            Ok(report) => tracing::info!(
                discovered = report.discovered,
                notified = report.notified,
                recorded = report.recorded,
                malformed = report.malformed,
                abandoned = report.abandoned,
                initial_run = self.initial_run,
                "Cycle complete"
            ),
            Err(CycleError::Fetch(e)) => tracing::error!(
                error = %e,
                transient = e.is_transient(),
                "Cycle aborted"
            ),
            Err(e) => tracing::error!(error = %e, "Cycle aborted"),
        }

        self.transition(PollState::Sleeping);
        tracing::info!(
            secs = self.settings.poll_interval.as_secs(),
            "Sleeping until next poll"
        );
        self.clock.sleep(self.settings.poll_interval).await;

        if result.is_ok() {
            self.initial_run = false;
        }
        result
    }

    /// Purge, fetch, and process every entry once. Does not sleep afterwards.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, CycleError> {
        self.transition(PollState::Purging);
        let now = self.clock.now();
        match self
            .store
            .purge_older_than_at(self.settings.retention, now)
            .await
        {
            Ok(0) => {}
            Ok(removed) => tracing::info!(removed, "Purged expired seen entries"),
            Err(e) => tracing::warn!(error = %e, "Failed to purge expired seen entries"),
        }

        self.transition(PollState::Fetching);
        tracing::info!("Fetching feed");
        let body = self.source.fetch().await?;

        let node_base_url = self.settings.node_base_url.clone();
        let mut report = CycleReport::default();

        for item in feed::entries(&body, &node_base_url) {
            self.transition(PollState::Filtering);
            let entry = match item {
                Ok(entry) => entry,
                Err(e) => {
                    report.malformed += 1;
                    tracing::warn!(error = %e, "Skipping malformed feed entry");
                    continue;
                }
            };

            if self.store.has_seen(&entry.url).await? {
                continue;
            }
            report.discovered += 1;
            tracing::info!(url = %entry.url, "New entry found");

            if self.initial_run {
                tracing::info!(url = %entry.url, "Initial run, recording without notification");
            } else {
                self.transition(PollState::Notifying);
                if !self.deliver(&entry).await {
                    report.abandoned += 1;
                    continue;
                }
                report.notified += 1;
            }

            self.transition(PollState::Recording);
            self.store.record_at(&entry.url, self.clock.now()).await?;
            report.recorded += 1;

            self.clock.sleep(self.settings.entry_pause).await;
        }

        Ok(report)
    }

    /// Notify until the notifier succeeds or the retry policy gives up.
    async fn deliver(&self, entry: &Entry) -> bool {
        let mut policy = self.retry.clone();
        loop {
            let event = NotificationEvent::for_entry(entry, self.clock.now());
            if self.notifier.notify(&event).await {
                tracing::info!(url = %entry.url, "Notification sent");
                return true;
            }

            if !policy.attempt() {
                tracing::error!(
                    url = %entry.url,
                    "Giving up on notification, entry stays unseen for the next cycle"
                );
                return false;
            }

            let delay = policy.delay();
            tracing::warn!(
                url = %entry.url,
                retry_in_secs = delay.as_secs(),
                "Notification failed, retrying"
            );
            self.clock.sleep(delay).await;
        }
    }

    fn transition(&mut self, next: PollState) {
        if self.state != next {
            tracing::trace!(from = ?self.state, to = ?next, "Poll state");
            self.state = next;
        }
    }
}
