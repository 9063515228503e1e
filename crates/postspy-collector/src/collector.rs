//! Collection orchestration: resolve, traverse, filter and extract each
//! channel in turn, then merge, sort and truncate.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use postspy_core::{ChannelRef, CollectionRequest, TruncationMode};
use thiserror::Error;

use crate::error::{ResolutionError, TraversalError};
use crate::extract::extract;
use crate::feed::FeedSource;
use crate::filter::accept;
use crate::resolver::resolve;
use crate::types::PostRecord;
use crate::window::{Decision, PageBudget, SkipReason, StopReason, WindowController};

#[derive(Debug, Clone)]
pub struct CollectorSettings {
    /// Pause before every channel traversal except the first.
    pub inter_channel_delay: Duration,
    pub page_budget: PageBudget,
    /// Emit a progress line every this many collected records (`0` disables).
    pub progress_every: usize,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            inter_channel_delay: Duration::from_millis(500),
            page_budget: PageBudget::default(),
            progress_every: 10,
        }
    }
}

/// Why a channel contributed nothing (or less than it could have).
#[derive(Debug, Error)]
pub enum ChannelFailure {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Traversal(#[from] TraversalError),
}

/// Per-channel traversal counters.
#[derive(Debug)]
pub struct ChannelSummary {
    pub channel: ChannelRef,
    /// Identifier the feed accepted, when resolution succeeded.
    pub identifier: Option<String>,
    pub scanned: usize,
    pub collected: usize,
    pub skipped_new: usize,
    pub skipped_old: usize,
    /// Rejected by the message filter.
    pub rejected: usize,
    /// Message ids already seen in this traversal.
    pub duplicates: usize,
    /// Accepted but unextractable (negative or overflowing counters).
    pub dropped: usize,
    /// The controller ended the traversal before the feed ran dry.
    pub stopped_early: bool,
    pub failure: Option<ChannelFailure>,
}

impl ChannelSummary {
    /// Zeroed counters for `channel`.
    #[must_use]
    pub fn new(channel: &ChannelRef) -> Self {
        Self {
            channel: channel.clone(),
            identifier: None,
            scanned: 0,
            collected: 0,
            skipped_new: 0,
            skipped_old: 0,
            rejected: 0,
            duplicates: 0,
            dropped: 0,
            stopped_early: false,
            failure: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct CollectionOutcome {
    /// Newest first across all channels.
    pub records: Vec<PostRecord>,
    /// One entry per channel actually attempted, in request order.
    pub channels: Vec<ChannelSummary>,
    /// The run was cancelled between channels; later channels were not attempted.
    pub cancelled: bool,
}

impl CollectionOutcome {
    #[must_use]
    pub fn into_records(self) -> Vec<PostRecord> {
        self.records
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&ChannelSummary, &ChannelFailure)> {
        self.channels
            .iter()
            .filter_map(|summary| summary.failure.as_ref().map(|f| (summary, f)))
    }
}

/// Drives one feed connection through a collection request.
///
/// The collector owns its feed, so `collect` taking `&mut self` keeps a
/// connection from being shared by two concurrent runs.
pub struct Collector<F> {
    feed: F,
    settings: CollectorSettings,
    cancel: Option<Arc<AtomicBool>>,
}

impl<F: FeedSource> Collector<F> {
    pub fn new(feed: F, settings: CollectorSettings) -> Self {
        Self {
            feed,
            settings,
            cancel: None,
        }
    }

    /// Check `flag` before each channel; once set, remaining channels are skipped.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Collect posts for every channel in `request`, sequentially.
    ///
    /// Per-channel failures are recorded in the outcome and never abort the
    /// run. An empty result is not an error.
    pub async fn collect(&mut self, request: &CollectionRequest) -> CollectionOutcome {
        let mut outcome = CollectionOutcome::default();

        for (index, channel) in request.channels.iter().enumerate() {
            if self.is_cancelled() {
                tracing::info!(
                    remaining = request.channels.len() - index,
                    "collection cancelled, skipping remaining channels"
                );
                outcome.cancelled = true;
                break;
            }
            if index > 0 && !self.settings.inter_channel_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_channel_delay).await;
            }

            let summary = self
                .collect_channel(channel, request, &mut outcome.records)
                .await;
            outcome.channels.push(summary);
        }

        // Stable: equal timestamps keep channel-then-feed order.
        outcome.records.sort_by(|a, b| b.date.cmp(&a.date));
        if let (TruncationMode::Global, Some(limit)) = (request.truncation, request.limit()) {
            outcome.records.truncate(limit);
        }

        tracing::info!(
            channels = outcome.channels.len(),
            failed = outcome.failures().count(),
            records = outcome.records.len(),
            cancelled = outcome.cancelled,
            "collection finished"
        );
        outcome
    }

    async fn collect_channel(
        &self,
        channel: &ChannelRef,
        request: &CollectionRequest,
        records: &mut Vec<PostRecord>,
    ) -> ChannelSummary {
        let mut summary = ChannelSummary::new(channel);

        let resolved = match resolve(&self.feed, channel).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(channel = %channel, error = %e, "channel resolution failed, skipping");
                summary.failure = Some(e.into());
                return summary;
            }
        };
        summary.identifier = Some(resolved.identifier.clone());

        let mut controller = WindowController::new(request.window, request.boundary, request.limit());
        let page_limit = Some(controller.page_budget(&self.settings.page_budget));
        tracing::debug!(
            channel = %channel,
            handle = %resolved.entity.handle,
            page_limit = ?page_limit,
            boundary = %request.boundary,
            "starting channel traversal"
        );

        let mut seen_ids = HashSet::new();
        let mut stream = self.feed.iterate_messages(&resolved.entity, page_limit);

        while let Some(item) = stream.next().await {
            let message = match item {
                Ok(message) => message,
                Err(source) => {
                    let err = TraversalError {
                        channel: channel.to_string(),
                        scanned: summary.scanned,
                        source,
                    };
                    tracing::warn!(
                        channel = %channel,
                        collected = summary.collected,
                        error = %err,
                        "channel traversal failed, keeping partial results"
                    );
                    summary.failure = Some(err.into());
                    break;
                }
            };
            summary.scanned += 1;

            match controller.decide(message.naive_date()) {
                Decision::Stop(reason) => {
                    if reason == StopReason::BeforeWindow {
                        summary.skipped_old += 1;
                    }
                    summary.stopped_early = true;
                    break;
                }
                Decision::Skip(SkipReason::TooNew) => {
                    summary.skipped_new += 1;
                    continue;
                }
                Decision::Skip(SkipReason::TooOld) => {
                    summary.skipped_old += 1;
                    continue;
                }
                Decision::Keep => {}
            }

            if !seen_ids.insert(message.id) {
                summary.duplicates += 1;
                continue;
            }
            if !accept(&message) {
                summary.rejected += 1;
                continue;
            }

            match extract(&message, channel) {
                Ok(record) => {
                    records.push(record);
                    controller.record_accepted();
                    summary.collected += 1;
                }
                Err(e) => {
                    tracing::warn!(channel = %channel, error = %e, "dropping unextractable message");
                    summary.dropped += 1;
                    continue;
                }
            }

            let every = self.settings.progress_every;
            if every > 0 && summary.collected % every == 0 {
                tracing::debug!(channel = %channel, collected = summary.collected, "collection progress");
            }
            if controller.limit_reached() {
                summary.stopped_early = true;
                break;
            }
        }

        tracing::info!(
            channel = %channel,
            scanned = summary.scanned,
            collected = summary.collected,
            skipped_new = summary.skipped_new,
            skipped_old = summary.skipped_old,
            rejected = summary.rejected,
            duplicates = summary.duplicates,
            stopped_early = summary.stopped_early,
            "channel traversal finished"
        );
        summary
    }
}
