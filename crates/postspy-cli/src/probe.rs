//! Reachability check for a single channel.

use postspy_collector::{resolve, FeedSource};
use postspy_core::ChannelRef;

/// Resolve `channel` through `feed` (with the alternate-form retry) and print
/// the outcome. Nothing is collected.
///
/// # Errors
///
/// Returns an error if the reference is malformed or cannot be resolved.
pub(crate) async fn run_probe<F: FeedSource>(feed: &F, channel: &str) -> anyhow::Result<()> {
    let channel = ChannelRef::new(channel)?;
    match resolve(feed, &channel).await {
        Ok(resolved) => {
            println!(
                "{channel}: reachable as '{}'{}{}",
                resolved.entity.handle,
                resolved
                    .entity
                    .title
                    .as_deref()
                    .map(|t| format!(" ({t})"))
                    .unwrap_or_default(),
                if resolved.used_alternate {
                    format!(" via alternate form '{}'", resolved.identifier)
                } else {
                    String::new()
                }
            );
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("{channel}: not reachable: {e}")),
    }
}
