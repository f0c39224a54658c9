//! Feed retrieval and listing extraction.
//!
//! - [`fetcher`] - one HTTP GET per cycle with a fixed timeout and size cap
//! - [`parser`] - line-oriented scan of the body into [`Entry`] values
//!
//! The feed is treated as text rather than XML: each listing sits on one
//! line carrying a `<description><![CDATA[` marker, a `href="/node/<id>"`
//! reference and an `alt="..."` display text.

mod fetcher;
mod parser;

pub use fetcher::{FeedFetcher, FeedSource, FetchError, DEFAULT_FETCH_TIMEOUT};
pub use parser::{entries, Entries, Entry, MalformedEntry};
