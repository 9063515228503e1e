//! Concrete [`crate::FeedSource`] implementations.

mod snapshot;
mod web_preview;
mod web_preview_parse;

pub use snapshot::{SnapshotChannel, SnapshotFeed, SnapshotFile};
pub use web_preview::WebPreviewFeed;
