use regex::Regex;
use std::str::Lines;
use std::sync::OnceLock;
use thiserror::Error;

/// Literal that marks a line as carrying one listing.
const ITEM_MARKER: &str = "<description><![CDATA[";

static NODE_RE: OnceLock<Regex> = OnceLock::new();
static ALT_RE: OnceLock<Regex> = OnceLock::new();

fn node_re() -> &'static Regex {
    NODE_RE.get_or_init(|| Regex::new(r#"href="/node/(.*?)""#).expect("valid node regex"))
}

fn alt_re() -> &'static Regex {
    ALT_RE.get_or_init(|| Regex::new(r#"alt="(.*?)""#).expect("valid alt regex"))
}

/// One candidate listing from a single fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Node path segment from the feed, with surrounding whitespace trimmed
    pub id: String,
    /// Canonical address, used as the dedup key
    pub url: String,
    /// Display text for the notification body
    pub summary: String,
}

/// A marker line that could not be turned into an [`Entry`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Malformed entry at line {line}: {reason}")]
pub struct MalformedEntry {
    /// 1-based line number within the response body
    pub line: usize,
    pub reason: &'static str,
}

/// Lazy, single-pass scan over a feed body.
///
/// Yields entries in feed order. A malformed marker line yields an `Err`
/// and scanning continues with the next line.
pub struct Entries<'a> {
    lines: std::iter::Enumerate<Lines<'a>>,
    node_base_url: &'a str,
}

/// Scan `body` for listings, building urls as `<node_base_url>/<id>`.
pub fn entries<'a>(body: &'a str, node_base_url: &'a str) -> Entries<'a> {
    Entries {
        lines: body.lines().enumerate(),
        node_base_url: node_base_url.trim_end_matches('/'),
    }
}

impl Iterator for Entries<'_> {
    type Item = Result<Entry, MalformedEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        for (idx, line) in self.lines.by_ref() {
            if !line.contains(ITEM_MARKER) {
                continue;
            }
            return Some(parse_line(line, idx + 1, self.node_base_url));
        }
        None
    }
}

fn parse_line(line: &str, line_no: usize, node_base_url: &str) -> Result<Entry, MalformedEntry> {
    let id = node_re()
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|id| !id.is_empty())
        .ok_or(MalformedEntry {
            line: line_no,
            reason: "no node reference",
        })?;

    let summary = alt_re()
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| decode_entities(m.as_str()))
        .ok_or(MalformedEntry {
            line: line_no,
            reason: "no alt text",
        })?;

    Ok(Entry {
        id: id.to_string(),
        url: format!("{}/{}", node_base_url, id),
        summary,
    })
}

/// Decode the basic XML entities left in attribute text.
fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    // &amp; last so "&amp;lt;" decodes to "&lt;" rather than "<"
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
