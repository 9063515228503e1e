use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const URL_PREFIX: &str = "https://t.me/";

/// A user-supplied channel reference: `@name`, `https://t.me/name`, or a bare `name`.
///
/// The value is kept exactly as the user typed it (minus surrounding whitespace);
/// it is what lands in the `channel` column of every collected post.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelRef(String);

impl ChannelRef {
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidChannel`] when the trimmed value is empty
    /// or contains whitespace.
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidChannel(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ChannelRef {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Parse free-form user text into an ordered, deduplicated channel list.
///
/// Entries are separated by newlines or commas. Only entries starting with `@`
/// or `https://t.me/` are accepted; anything else is ignored.
///
/// # Errors
///
/// Returns [`ValidationError::NoChannels`] when no entry is accepted.
pub fn parse_channel_list(raw: &str) -> Result<Vec<ChannelRef>, ValidationError> {
    let mut seen = HashSet::new();
    let mut channels = Vec::new();

    for entry in raw.split(['\n', ',']) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let looks_like_channel = (entry.starts_with('@') && entry.len() > 1)
            || (entry.starts_with(URL_PREFIX) && entry.len() > URL_PREFIX.len());
        if !looks_like_channel {
            continue;
        }
        let Ok(channel) = ChannelRef::new(entry) else {
            continue;
        };
        if seen.insert(channel.clone()) {
            channels.push(channel);
        }
    }

    if channels.is_empty() {
        return Err(ValidationError::NoChannels);
    }
    Ok(channels)
}

/// Drop duplicate references while keeping first-seen order.
#[must_use]
pub fn dedup_channels(channels: Vec<ChannelRef>) -> Vec<ChannelRef> {
    let mut seen = HashSet::new();
    channels
        .into_iter()
        .filter(|c| seen.insert(c.clone()))
        .collect()
}
