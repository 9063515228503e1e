//! Message-collection and aggregation engine for postspy.
//!
//! Walks the newest-first message feed of each requested channel, decides per
//! message whether to keep, skip or stop, drops deleted/service/filler posts,
//! and turns the survivors into [`PostRecord`]s. [`aggregate`] reduces the
//! merged result into per-channel engagement statistics.

pub mod aggregate;
pub mod collector;
pub mod error;
pub mod extract;
pub mod feed;
pub mod filter;
pub mod resolver;
pub mod sources;
pub mod types;
pub mod window;

mod rate_limit;

pub use aggregate::{aggregate, ChannelStats, StatsReport};
pub use collector::{
    ChannelFailure, ChannelSummary, CollectionOutcome, Collector, CollectorSettings,
};
pub use error::{ExtractError, FeedError, ResolutionError, TraversalError};
pub use extract::extract;
pub use feed::{FeedSource, MessageStream};
pub use filter::accept;
pub use resolver::{alternate_form, resolve, ResolvedChannel};
pub use sources::{SnapshotChannel, SnapshotFeed, SnapshotFile, WebPreviewFeed};
pub use types::{Entity, PostRecord, RawMessage, ReactionCount, ReactionSummary, ReplySummary};
pub use window::{Decision, PageBudget, SkipReason, StopReason, WindowController};
