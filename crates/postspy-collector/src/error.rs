use thiserror::Error;

/// Failures reported by a [`crate::FeedSource`].
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("channel not found: {identifier}")]
    NotFound { identifier: String },

    #[error("rate limited by feed (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("could not parse feed page {context}: {reason}")]
    Parse { context: String, reason: String },

    #[error("snapshot error for {path}: {source}")]
    Snapshot {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("pagination limit reached for {identifier}: exceeded {max_pages} pages")]
    PaginationLimit { identifier: String, max_pages: usize },
}

/// A channel reference could not be mapped to a feed entity, even after the
/// alternate-form retry.
#[derive(Debug, Error)]
#[error("could not resolve channel '{channel}' (tried {attempts:?}): {source}")]
pub struct ResolutionError {
    pub channel: String,
    /// Every identifier handed to the feed, in order.
    pub attempts: Vec<String>,
    #[source]
    pub source: FeedError,
}

/// Paging through a resolved channel failed part-way.
///
/// Records collected before the failure are kept.
#[derive(Debug, Error)]
#[error("traversal of '{channel}' failed after {scanned} messages: {source}")]
pub struct TraversalError {
    pub channel: String,
    pub scanned: usize,
    #[source]
    pub source: FeedError,
}

/// A single message could not be turned into a record; the message is dropped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("message {message_id}: negative {field} count {value}")]
    NegativeCount {
        message_id: i64,
        field: &'static str,
        value: i64,
    },

    #[error("message {message_id}: {field} count overflows")]
    Overflow {
        message_id: i64,
        field: &'static str,
    },
}
