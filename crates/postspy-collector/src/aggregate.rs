//! Per-channel engagement statistics over a collected record set.
//!
//! Averages and coverage ratios are exact decimals rounded to two places,
//! midpoints away from zero (`2.345 → 2.35`). A zero denominator yields `0`.

use std::collections::HashMap;

use postspy_core::ChannelRef;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::types::PostRecord;

/// Decimal places kept on every derived figure.
pub const STAT_DECIMALS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    pub channel: ChannelRef,
    pub total_posts: u64,
    pub total_views: u64,
    pub avg_views: Decimal,
    pub total_reactions: u64,
    pub avg_reactions: Decimal,
    pub total_comments: u64,
    pub avg_comments: Decimal,
    pub total_forwards: u64,
    pub avg_forwards: Decimal,
    /// Views per reaction.
    pub coverage_per_reaction: Decimal,
    pub coverage_per_forward: Decimal,
    pub coverage_per_comment: Decimal,
}

impl ChannelStats {
    /// All-zero statistics for a channel with no records.
    #[must_use]
    pub fn empty(channel: ChannelRef) -> Self {
        Self {
            channel,
            total_posts: 0,
            total_views: 0,
            avg_views: Decimal::ZERO,
            total_reactions: 0,
            avg_reactions: Decimal::ZERO,
            total_comments: 0,
            avg_comments: Decimal::ZERO,
            total_forwards: 0,
            avg_forwards: Decimal::ZERO,
            coverage_per_reaction: Decimal::ZERO,
            coverage_per_forward: Decimal::ZERO,
            coverage_per_comment: Decimal::ZERO,
        }
    }

    fn add(&mut self, record: &PostRecord) {
        self.total_posts += 1;
        self.total_views = self.total_views.saturating_add(record.views);
        self.total_reactions = self.total_reactions.saturating_add(record.reactions_count);
        self.total_comments = self.total_comments.saturating_add(record.comments_count);
        self.total_forwards = self.total_forwards.saturating_add(record.forwards_count);
    }

    fn finish(&mut self) {
        self.avg_views = ratio(self.total_views, self.total_posts);
        self.avg_reactions = ratio(self.total_reactions, self.total_posts);
        self.avg_comments = ratio(self.total_comments, self.total_posts);
        self.avg_forwards = ratio(self.total_forwards, self.total_posts);
        self.coverage_per_reaction = ratio(self.total_views, self.total_reactions);
        self.coverage_per_forward = ratio(self.total_views, self.total_forwards);
        self.coverage_per_comment = ratio(self.total_views, self.total_comments);
    }
}

/// `numerator / denominator` rounded to [`STAT_DECIMALS`], or `0` when the
/// denominator is zero.
#[must_use]
pub fn ratio(numerator: u64, denominator: u64) -> Decimal {
    if denominator == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(numerator)
        .checked_div(Decimal::from(denominator))
        .map_or(Decimal::ZERO, |value| {
            value.round_dp_with_strategy(STAT_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
        })
}

/// Ordered per-channel statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsReport {
    pub entries: Vec<ChannelStats>,
}

impl StatsReport {
    #[must_use]
    pub fn get(&self, channel: &ChannelRef) -> Option<&ChannelStats> {
        self.entries.iter().find(|stats| &stats.channel == channel)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelStats> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Group `records` by channel and compute statistics.
///
/// Every channel in `channels` appears, in that order, even with no records.
/// Channels present only in `records` follow in first-seen order.
#[must_use]
pub fn aggregate(records: &[PostRecord], channels: &[ChannelRef]) -> StatsReport {
    let mut entries: Vec<ChannelStats> = Vec::with_capacity(channels.len());
    let mut index: HashMap<ChannelRef, usize> = HashMap::new();

    for channel in channels {
        if !index.contains_key(channel) {
            index.insert(channel.clone(), entries.len());
            entries.push(ChannelStats::empty(channel.clone()));
        }
    }

    for record in records {
        let slot = *index.entry(record.channel.clone()).or_insert_with(|| {
            entries.push(ChannelStats::empty(record.channel.clone()));
            entries.len() - 1
        });
        entries[slot].add(record);
    }

    for stats in &mut entries {
        stats.finish();
    }
    StatsReport { entries }
}
