use chrono::{DateTime, NaiveDateTime, Utc};
use postspy_core::ChannelRef;
use serde::{Deserialize, Serialize};

/// A channel as known to the feed, after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Canonical handle the feed pages by (no `@`, no URL).
    pub handle: String,
    pub title: Option<String>,
}

/// Reply-thread summary attached to a channel post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplySummary {
    pub replies: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCount {
    pub reaction: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionSummary {
    pub results: Vec<ReactionCount>,
}

/// A message exactly as the feed produced it. Every counter is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: i64,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub views: Option<i64>,
    #[serde(default)]
    pub replies: Option<ReplySummary>,
    #[serde(default)]
    pub reactions: Option<ReactionSummary>,
    #[serde(default)]
    pub forwards: Option<i64>,
    #[serde(default)]
    pub deleted: bool,
    /// Service action description (pin, title change, ...). Present only on service messages.
    #[serde(default)]
    pub action: Option<String>,
}

impl RawMessage {
    /// Minimal message with only an id and a timestamp.
    #[must_use]
    pub fn new(id: i64, date: DateTime<Utc>) -> Self {
        Self {
            id,
            date,
            text: None,
            views: None,
            replies: None,
            reactions: None,
            forwards: None,
            deleted: false,
            action: None,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Reply count, `0` when no thread summary is attached.
    #[must_use]
    pub fn comment_count(&self) -> i64 {
        self.replies.as_ref().map_or(0, |r| r.replies)
    }

    /// Sum over every reaction kind, saturating.
    #[must_use]
    pub fn reaction_count(&self) -> i64 {
        self.reactions.as_ref().map_or(0, |r| {
            r.results
                .iter()
                .fold(0i64, |acc, reaction| acc.saturating_add(reaction.count))
        })
    }

    /// Timestamp with the timezone stripped (UTC wall clock).
    #[must_use]
    pub fn naive_date(&self) -> NaiveDateTime {
        self.date.naive_utc()
    }
}

/// One collected post. Every counter is non-negative by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub channel: ChannelRef,
    pub text: String,
    /// Naive UTC, second precision.
    pub date: NaiveDateTime,
    pub views: u64,
    pub comments_count: u64,
    pub reactions_count: u64,
    pub forwards_count: u64,
    pub message_id: i64,
}
