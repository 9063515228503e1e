//! Channel reference → feed entity, with a single alternate-form retry.

use postspy_core::ChannelRef;

use crate::error::ResolutionError;
use crate::feed::FeedSource;
use crate::types::Entity;

const LINK_HOST: &str = "t.me/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChannel {
    /// The reference as the user supplied it; records are labelled with it.
    pub channel: ChannelRef,
    pub entity: Entity,
    /// The identifier the feed accepted.
    pub identifier: String,
    pub used_alternate: bool,
}

/// The one alternate identifier tried when the raw reference fails.
///
/// `@name` becomes `name`; a link such as `https://t.me/name/123` or
/// `t.me/s/name?before=9` becomes `name`. Returns `None` when no distinct,
/// non-empty alternate exists.
#[must_use]
pub fn alternate_form(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let candidate = if let Some(handle) = raw.strip_prefix('@') {
        handle.to_string()
    } else if let Some(idx) = raw.find(LINK_HOST) {
        let path = &raw[idx + LINK_HOST.len()..];
        let mut segments = path
            .split(['/', '?', '#'])
            .filter(|segment| !segment.is_empty());
        match segments.next() {
            Some("s") => segments.next().unwrap_or_default().to_string(),
            Some(segment) => segment.to_string(),
            None => String::new(),
        }
    } else {
        return None;
    };

    let candidate = candidate.trim_start_matches('@').to_string();
    if candidate.is_empty() || candidate == raw {
        return None;
    }
    Some(candidate)
}

/// Resolve `channel` through `feed`, trying its alternate form once on failure.
///
/// Any feed failure on the first attempt triggers the retry; a second failure
/// (or a missing alternate) is reported with every attempted identifier.
///
/// # Errors
///
/// Returns [`ResolutionError`] carrying the last feed error.
pub async fn resolve<F: FeedSource>(
    feed: &F,
    channel: &ChannelRef,
) -> Result<ResolvedChannel, ResolutionError> {
    let raw = channel.as_str();
    let first_err = match feed.resolve_entity(raw).await {
        Ok(entity) => {
            return Ok(ResolvedChannel {
                channel: channel.clone(),
                entity,
                identifier: raw.to_string(),
                used_alternate: false,
            });
        }
        Err(e) => e,
    };

    let Some(alternate) = alternate_form(raw) else {
        return Err(ResolutionError {
            channel: raw.to_string(),
            attempts: vec![raw.to_string()],
            source: first_err,
        });
    };

    tracing::debug!(
        channel = %channel,
        alternate = %alternate,
        error = %first_err,
        "channel lookup failed, retrying with alternate form"
    );

    match feed.resolve_entity(&alternate).await {
        Ok(entity) => Ok(ResolvedChannel {
            channel: channel.clone(),
            entity,
            identifier: alternate,
            used_alternate: true,
        }),
        Err(source) => Err(ResolutionError {
            channel: raw.to_string(),
            attempts: vec![raw.to_string(), alternate],
            source,
        }),
    }
}
