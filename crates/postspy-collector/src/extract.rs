//! Raw message → [`PostRecord`] conversion.

use chrono::SubsecRound;
use postspy_core::ChannelRef;

use crate::error::ExtractError;
use crate::types::{PostRecord, RawMessage};

fn non_negative(message_id: i64, field: &'static str, value: i64) -> Result<u64, ExtractError> {
    u64::try_from(value).map_err(|_| ExtractError::NegativeCount {
        message_id,
        field,
        value,
    })
}

fn sum_reactions(message: &RawMessage) -> Result<u64, ExtractError> {
    let Some(summary) = message.reactions.as_ref() else {
        return Ok(0);
    };
    summary.results.iter().try_fold(0u64, |acc, reaction| {
        let count = non_negative(message.id, "reactions", reaction.count)?;
        acc.checked_add(count).ok_or(ExtractError::Overflow {
            message_id: message.id,
            field: "reactions",
        })
    })
}

/// Build a [`PostRecord`] for `channel` from a message that passed the filter.
///
/// Missing counters become `0`. The text is kept verbatim (not trimmed) and
/// the timestamp is truncated to whole seconds in naive UTC.
///
/// # Errors
///
/// Returns [`ExtractError::NegativeCount`] when the feed reports a negative
/// counter, or [`ExtractError::Overflow`] when the reaction total does not fit.
pub fn extract(message: &RawMessage, channel: &ChannelRef) -> Result<PostRecord, ExtractError> {
    let id = message.id;
    Ok(PostRecord {
        channel: channel.clone(),
        text: message.text.clone().unwrap_or_default(),
        date: message.naive_date().trunc_subsecs(0),
        views: non_negative(id, "views", message.views.unwrap_or(0))?,
        comments_count: non_negative(id, "comments", message.comment_count())?,
        reactions_count: sum_reactions(message)?,
        forwards_count: non_negative(id, "forwards", message.forwards.unwrap_or(0))?,
        message_id: id,
    })
}
