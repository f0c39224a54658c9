//! Watch a deals feed and post unseen listings to a Discord webhook.
//!
//! The crate is split along the loop's seams:
//!
//! - [`storage`] - SQLite record of listing urls already handled
//! - [`feed`] - HTTP fetch and line scan of the feed
//! - [`notify`] - webhook delivery
//! - [`poller`] - the fetch, filter, notify, record, purge, sleep cycle
//! - [`config`] - layered configuration and validation

pub mod config;
pub mod feed;
pub mod notify;
pub mod poller;
pub mod storage;
