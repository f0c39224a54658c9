//! Outbound notifications for newly discovered listings.

mod webhook;

pub use webhook::{WebhookNotifier, DEFAULT_AVATAR_URL, EMBED_COLORS};

use crate::feed::Entry;

/// One listing ready to be delivered.
///
/// Built per send attempt so `observed_at` reflects the actual send time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    /// Listing url, shown as the message title
    pub target_url: String,
    /// Listing summary, shown as the message body
    pub body: String,
    /// Seconds since the Unix epoch
    pub observed_at: i64,
}

impl NotificationEvent {
    pub fn for_entry(entry: &Entry, observed_at: i64) -> Self {
        Self {
            target_url: entry.url.clone(),
            body: entry.summary.clone(),
            observed_at,
        }
    }
}

/// Delivers a single event.
///
/// Implementations report success as `true` and swallow every failure as
/// `false`; retrying is the caller's job.
#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn notify(&self, event: &NotificationEvent) -> bool;
}
