//! Accept/reject rules for raw channel messages.

use crate::types::RawMessage;

/// Texts treated as channel filler once trimmed and lower-cased.
///
/// Whitespace-only texts trim down to `""`.
const PLACEHOLDER_TEXTS: &[&str] = &["", "buffet", "null", "none"];

/// Returns `true` when `message` should become a post record.
///
/// Rejects deleted messages, service actions, and placeholder/empty texts
/// that drew no comments and no reactions.
#[must_use]
pub fn accept(message: &RawMessage) -> bool {
    if message.deleted || message.action.is_some() {
        return false;
    }
    !(is_placeholder_text(message.text())
        && message.comment_count() == 0
        && message.reaction_count() == 0)
}

fn is_placeholder_text(text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    PLACEHOLDER_TEXTS.contains(&normalized.as_str())
}
