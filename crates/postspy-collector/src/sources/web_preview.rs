//! Feed backed by the public web preview at `{base}/s/<handle>`.
//!
//! The preview serves roughly twenty posts per page, oldest first, and pages
//! backwards with `?before=<message id>`. It exposes views and reactions but
//! not reply or forward counts.

use std::collections::VecDeque;
use std::sync::LazyLock;
use std::time::Duration;

use futures::stream;
use regex::Regex;
use reqwest::Client;

use super::web_preview_parse::{parse_preview_page, PreviewPage};
use crate::error::FeedError;
use crate::feed::{FeedSource, MessageStream};
use crate::rate_limit::retry_with_backoff;
use crate::types::{Entity, RawMessage};

/// Upper bound on pages per traversal, independent of the page budget.
const MAX_PAGES: usize = 500;

static HANDLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]{3,31}$").expect("valid channel handle regex")
});

/// HTTP feed over the channel web preview.
///
/// Only bare handles are accepted as identifiers; `@name` or link forms fail
/// with [`FeedError::NotFound`] and are left to the resolver's alternate retry.
pub struct WebPreviewFeed {
    client: Client,
    base_url: String,
    max_retries: u32,
    backoff_base_secs: u64,
    inter_page_delay: Duration,
}

struct PageCursor {
    before: Option<i64>,
    buffered: VecDeque<RawMessage>,
    remaining: Option<usize>,
    pages: usize,
    exhausted: bool,
}

impl WebPreviewFeed {
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the underlying `reqwest::Client` cannot be built.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
        inter_page_delay_ms: u64,
    ) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url: "https://t.me".to_string(),
            max_retries,
            backoff_base_secs,
            inter_page_delay: Duration::from_millis(inter_page_delay_ms),
        })
    }

    /// Override the preview host (mirrors, tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn page_url(&self, handle: &str, before: Option<i64>) -> String {
        match before {
            Some(id) => format!("{}/s/{handle}?before={id}", self.base_url),
            None => format!("{}/s/{handle}", self.base_url),
        }
    }

    async fn fetch_page(&self, handle: &str, before: Option<i64>) -> Result<PreviewPage, FeedError> {
        let url = self.page_url(handle, before);
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let url = url.clone();
            async move {
                let response = self.client.get(&url).send().await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(30);
                    return Err(FeedError::RateLimited { retry_after_secs });
                }
                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(FeedError::NotFound {
                        identifier: handle.to_string(),
                    });
                }
                if !status.is_success() {
                    return Err(FeedError::UnexpectedStatus {
                        status: status.as_u16(),
                        url,
                    });
                }

                let body = response.text().await?;
                parse_preview_page(&body, handle)
            }
        })
        .await
    }

    /// Fetch the next page into `cursor.buffered`, newest first.
    async fn advance(&self, handle: &str, cursor: &mut PageCursor) -> Result<(), FeedError> {
        cursor.pages += 1;
        if cursor.pages > MAX_PAGES {
            return Err(FeedError::PaginationLimit {
                identifier: handle.to_string(),
                max_pages: MAX_PAGES,
            });
        }
        if cursor.pages > 1 && !self.inter_page_delay.is_zero() {
            tokio::time::sleep(self.inter_page_delay).await;
        }

        let page = self.fetch_page(handle, cursor.before).await?;
        let mut messages: Vec<RawMessage> = page
            .messages
            .into_iter()
            .filter(|m| cursor.before.is_none_or(|before| m.id < before))
            .collect();
        if messages.is_empty() {
            cursor.exhausted = true;
            return Ok(());
        }

        messages.sort_by(|a, b| b.id.cmp(&a.id));
        let oldest = messages.last().map_or(0, |m| m.id);
        tracing::debug!(handle, page = cursor.pages, count = messages.len(), oldest, "fetched preview page");

        cursor.before = Some(oldest);
        if oldest <= 1 {
            cursor.exhausted = true;
        }
        cursor.buffered.extend(messages);
        Ok(())
    }
}

impl FeedSource for WebPreviewFeed {
    async fn resolve_entity(&self, identifier: &str) -> Result<Entity, FeedError> {
        if !HANDLE_RE.is_match(identifier) {
            return Err(FeedError::NotFound {
                identifier: identifier.to_string(),
            });
        }
        let page = self.fetch_page(identifier, None).await?;
        if !page.is_channel {
            return Err(FeedError::NotFound {
                identifier: identifier.to_string(),
            });
        }
        Ok(Entity {
            handle: identifier.to_string(),
            title: page.title,
        })
    }

    fn iterate_messages<'a>(
        &'a self,
        entity: &'a Entity,
        page_limit: Option<usize>,
    ) -> MessageStream<'a> {
        let cursor = PageCursor {
            before: None,
            buffered: VecDeque::new(),
            remaining: page_limit,
            pages: 0,
            exhausted: false,
        };

        Box::pin(stream::unfold(cursor, move |mut cursor| async move {
            loop {
                if cursor.remaining == Some(0) {
                    return None;
                }
                if let Some(message) = cursor.buffered.pop_front() {
                    if let Some(remaining) = cursor.remaining.as_mut() {
                        *remaining -= 1;
                    }
                    return Some((Ok(message), cursor));
                }
                if cursor.exhausted {
                    return None;
                }
                if let Err(e) = self.advance(&entity.handle, &mut cursor).await {
                    cursor.exhausted = true;
                    return Some((Err(e), cursor));
                }
            }
        }))
    }
}
