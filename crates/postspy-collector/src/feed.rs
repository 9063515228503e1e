//! The feed seam: everything the collector needs from the messaging backend.

use std::future::Future;

use futures::stream::BoxStream;

use crate::error::FeedError;
use crate::types::{Entity, RawMessage};

/// Lazy, newest-first, finite message sequence for one channel. Not restartable.
pub type MessageStream<'a> = BoxStream<'a, Result<RawMessage, FeedError>>;

/// A channel-scoped, reverse-chronological message source.
///
/// Implementations are handed to the collector already authenticated and
/// connected; the collector never prompts for credentials. A feed offers no
/// seek or server-side filtering, so every message is inspected in order.
pub trait FeedSource: Send + Sync {
    /// Map an identifier (a handle, usually) to a feed entity.
    ///
    /// Returns [`FeedError::NotFound`] when the feed has no such channel.
    fn resolve_entity(
        &self,
        identifier: &str,
    ) -> impl Future<Output = Result<Entity, FeedError>> + Send;

    /// Stream messages newest-first, yielding at most `page_limit` of them.
    ///
    /// `None` lets the feed run until the channel history is exhausted.
    fn iterate_messages<'a>(
        &'a self,
        entity: &'a Entity,
        page_limit: Option<usize>,
    ) -> MessageStream<'a>;
}
