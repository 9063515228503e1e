//! Offline feed replaying channel exports stored as JSON.
//!
//! ```json
//! { "channels": [ { "handle": "alpha", "title": "Alpha", "messages": [ ... ] } ] }
//! ```
//!
//! Messages must be stored newest first; they are replayed exactly as stored.

use std::path::Path;

use futures::stream;
use serde::{Deserialize, Serialize};

use crate::error::FeedError;
use crate::feed::{FeedSource, MessageStream};
use crate::types::{Entity, RawMessage};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotChannel {
    pub handle: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub messages: Vec<RawMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub channels: Vec<SnapshotChannel>,
}

/// In-memory feed over a [`SnapshotFile`].
///
/// Identifiers match a stored handle case-insensitively, bare or with a
/// leading `@`. Links are not understood here; the resolver's alternate form
/// covers them.
#[derive(Debug, Clone, Default)]
pub struct SnapshotFeed {
    channels: Vec<SnapshotChannel>,
}

impl SnapshotFeed {
    #[must_use]
    pub fn new(channels: Vec<SnapshotChannel>) -> Self {
        Self { channels }
    }

    /// # Errors
    ///
    /// Returns [`FeedError::Snapshot`] when `json` does not match the snapshot shape.
    pub fn from_json(json: &str, origin: &str) -> Result<Self, FeedError> {
        let file: SnapshotFile = serde_json::from_str(json).map_err(|source| FeedError::Snapshot {
            path: origin.to_string(),
            source,
        })?;
        Ok(Self::new(file.channels))
    }

    /// # Errors
    ///
    /// Returns [`FeedError::Io`] when the file cannot be read or
    /// [`FeedError::Snapshot`] when it is not a valid snapshot.
    pub fn from_path(path: &Path) -> Result<Self, FeedError> {
        let display = path.display().to_string();
        let json = std::fs::read_to_string(path).map_err(|source| FeedError::Io {
            path: display.clone(),
            source,
        })?;
        Self::from_json(&json, &display)
    }

    fn find(&self, identifier: &str) -> Option<&SnapshotChannel> {
        let wanted = identifier.strip_prefix('@').unwrap_or(identifier);
        if wanted.is_empty() {
            return None;
        }
        self.channels
            .iter()
            .find(|c| c.handle.eq_ignore_ascii_case(wanted))
    }
}

impl FeedSource for SnapshotFeed {
    async fn resolve_entity(&self, identifier: &str) -> Result<Entity, FeedError> {
        self.find(identifier)
            .map(|c| Entity {
                handle: c.handle.clone(),
                title: c.title.clone(),
            })
            .ok_or_else(|| FeedError::NotFound {
                identifier: identifier.to_string(),
            })
    }

    fn iterate_messages<'a>(
        &'a self,
        entity: &'a Entity,
        page_limit: Option<usize>,
    ) -> MessageStream<'a> {
        let messages = self
            .find(&entity.handle)
            .map_or(&[][..], |c| c.messages.as_slice());
        let take = page_limit.unwrap_or(messages.len());
        Box::pin(stream::iter(messages.iter().take(take).cloned().map(Ok)))
    }
}
