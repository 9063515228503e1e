//! HTML parsing for the public `t.me/s/<handle>` channel preview.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::FeedError;
use crate::types::{RawMessage, ReactionCount, ReactionSummary};

static POST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"data-post="([^"/]+)/(\d+)""#).expect("valid data-post regex")
});
static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<time[^>]*\bdatetime="([^"]+)""#).expect("valid datetime regex")
});
static TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<div class="tgme_widget_message_text[^"]*"[^>]*>(.*?)</div>"#)
        .expect("valid message text regex")
});
static VIEWS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<span class="tgme_widget_message_views"[^>]*>([^<]*)</span>"#)
        .expect("valid views regex")
});
static REACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<span class="tgme_reaction[^"]*"[^>]*>(.*?)</span>"#)
        .expect("valid reaction regex")
});
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<div class="tgme_channel_info_header_title[^"]*"[^>]*>(.*?)</div>"#)
        .expect("valid title regex")
});
static BR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid br regex"));
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("valid entity regex")
});

const MESSAGE_MARKER: &str = "tgme_widget_message_wrap";
const CHANNEL_INFO_MARKER: &str = "tgme_channel_info";
const SERVICE_MARKER: &str = "service_message";

/// One fetched preview page.
#[derive(Debug, Default)]
pub(crate) struct PreviewPage {
    /// The page shows a public channel header.
    pub is_channel: bool,
    pub title: Option<String>,
    /// In page order, which is oldest first.
    pub messages: Vec<RawMessage>,
}

/// Parse a preview page for `handle`.
///
/// Blocks without a post id or timestamp (ads, date separators) are skipped.
///
/// # Errors
///
/// Returns [`FeedError::Parse`] when a message carries a timestamp that is not RFC 3339.
pub(crate) fn parse_preview_page(html: &str, handle: &str) -> Result<PreviewPage, FeedError> {
    let is_channel = html.contains(CHANNEL_INFO_MARKER);
    let title = TITLE_RE
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| html_to_text(m.as_str()).trim().to_string())
        .filter(|t| !t.is_empty());

    let mut messages = Vec::new();
    for block in html.split(MESSAGE_MARKER).skip(1) {
        if let Some(message) = parse_message_block(block, handle)? {
            messages.push(message);
        }
    }

    Ok(PreviewPage {
        is_channel,
        title,
        messages,
    })
}

fn parse_message_block(block: &str, handle: &str) -> Result<Option<RawMessage>, FeedError> {
    let Some(post) = POST_RE.captures(block) else {
        return Ok(None);
    };
    let Some(id) = post.get(2).and_then(|m| m.as_str().parse::<i64>().ok()) else {
        return Ok(None);
    };
    let Some(raw_date) = TIME_RE.captures(block).and_then(|cap| cap.get(1)) else {
        tracing::debug!(handle, id, "preview message without timestamp, skipping");
        return Ok(None);
    };
    let date = DateTime::parse_from_rfc3339(raw_date.as_str())
        .map_err(|e| FeedError::Parse {
            context: format!("{handle}/{id}"),
            reason: format!("invalid datetime '{}': {e}", raw_date.as_str()),
        })?
        .with_timezone(&Utc);

    let mut message = RawMessage::new(id, date);
    message.text = TEXT_RE
        .captures(block)
        .and_then(|cap| cap.get(1))
        .map(|m| html_to_text(m.as_str()));
    message.views = VIEWS_RE
        .captures(block)
        .and_then(|cap| cap.get(1))
        .and_then(|m| parse_compact_count(m.as_str()));

    let reactions: Vec<ReactionCount> = REACTION_RE
        .captures_iter(block)
        .filter_map(|cap| cap.get(1).and_then(|m| parse_reaction(m.as_str())))
        .collect();
    if !reactions.is_empty() {
        message.reactions = Some(ReactionSummary { results: reactions });
    }

    if block.contains(SERVICE_MARKER) {
        message.action = Some("service".to_string());
    }
    Ok(Some(message))
}

/// `<i class="emoji"><b>👍</b></i>1.2K` → (`👍`, 1200).
fn parse_reaction(inner: &str) -> Option<ReactionCount> {
    let split = inner.rfind('>').map_or(0, |idx| idx + 1);
    let count = parse_compact_count(&inner[split..])?;
    let reaction = html_to_text(&inner[..split]).trim().to_string();
    Some(ReactionCount { reaction, count })
}

/// Parse the preview's abbreviated counters: `987`, `1,204`, `1.2K`, `3.45M`.
pub(crate) fn parse_compact_count(raw: &str) -> Option<i64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    let (number, multiplier) = match cleaned.chars().last() {
        Some('K' | 'k') => (&cleaned[..cleaned.len() - 1], 1_000i64),
        Some('M' | 'm') => (&cleaned[..cleaned.len() - 1], 1_000_000),
        Some('B' | 'b') => (&cleaned[..cleaned.len() - 1], 1_000_000_000),
        _ => (cleaned.as_str(), 1),
    };
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut value = whole.parse::<i64>().ok()?.checked_mul(multiplier)?;
    let mut scale = multiplier;
    for digit in fraction.bytes() {
        scale /= 10;
        if scale == 0 {
            break;
        }
        value = value.checked_add(i64::from(digit - b'0') * scale)?;
    }
    Some(value)
}

/// Message HTML → plain text: `<br>` becomes a newline, tags are dropped,
/// entities are decoded.
pub(crate) fn html_to_text(html: &str) -> String {
    let with_breaks = BR_RE.replace_all(html, "\n");
    let stripped = TAG_RE.replace_all(&with_breaks, "");
    decode_entities(&stripped)
}

fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |cap: &regex::Captures<'_>| {
            let name = &cap[1];
            let decoded = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| cap[0].to_string(), String::from)
        })
        .into_owned()
}

#[cfg(test)]
#[path = "web_preview_parse_test.rs"]
mod tests;
