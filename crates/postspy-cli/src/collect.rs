//! The `collect` command: build a request, run the collector over the chosen
//! feed, persist the result, and print per-channel statistics.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use clap::{ArgGroup, Args, ValueEnum};
use postspy_collector::{
    aggregate, ChannelFailure, ChannelSummary, CollectionOutcome, Collector, CollectorSettings,
    FeedSource, SnapshotFeed, WebPreviewFeed,
};
use postspy_core::{
    parse_channel_list, AppConfig, BoundaryPolicy, CollectionRequest, Flow, Period, TruncationMode,
};
use postspy_db::{ChannelRunStatus, NewPost};

use crate::export::write_records_csv;
use crate::fail_run_best_effort;
use crate::report::print_stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FlowArg {
    /// Side-by-side report, at most four channels
    Report,
    /// One-off collection, limit ≤ 1000 and period ≤ 365 days
    AdHoc,
}

impl From<FlowArg> for Flow {
    fn from(value: FlowArg) -> Self {
        match value {
            FlowArg::Report => Flow::Report,
            FlowArg::AdHoc => Flow::AdHoc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BoundaryArg {
    /// End a channel at the first post older than the window
    Stop,
    /// Keep scanning past older posts until the page budget runs out
    Skip,
}

impl From<BoundaryArg> for BoundaryPolicy {
    fn from(value: BoundaryArg) -> Self {
        match value {
            BoundaryArg::Stop => BoundaryPolicy::Stop,
            BoundaryArg::Skip => BoundaryPolicy::Skip,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TruncationArg {
    /// Newest `limit` posts across all channels
    Global,
    /// Up to `limit` posts from each channel
    PerChannel,
}

impl From<TruncationArg> for TruncationMode {
    fn from(value: TruncationArg) -> Self {
        match value {
            TruncationArg::Global => TruncationMode::Global,
            TruncationArg::PerChannel => TruncationMode::PerChannel,
        }
    }
}

/// Arguments for `collect`.
#[derive(Debug, Args)]
#[command(group(
    ArgGroup::new("period")
        .args(["days", "last_week", "last_month", "all", "month"])
        .multiple(false)
))]
pub struct CollectArgs {
    /// Channels: `@name` or `https://t.me/name`, separated by commas or newlines
    pub channels: String,

    /// Posts from the last N days (0 means no time limit)
    #[arg(long)]
    pub days: Option<u32>,

    /// Posts from the last 7 days
    #[arg(long)]
    pub last_week: bool,

    /// Posts from the last 30 days
    #[arg(long)]
    pub last_month: bool,

    /// No time limit (default)
    #[arg(long)]
    pub all: bool,

    /// Calendar month, `YYYY-MM`
    #[arg(long, value_parser = parse_month)]
    pub month: Option<(i32, u32)>,

    /// Maximum number of posts (0 means unlimited)
    #[arg(long, default_value = "0")]
    pub limit: u32,

    #[arg(long, value_enum, default_value = "ad-hoc")]
    pub flow: FlowArg,

    /// What to do at the first post older than the window (default depends on the period)
    #[arg(long, value_enum)]
    pub boundary: Option<BoundaryArg>,

    #[arg(long, value_enum, default_value = "global")]
    pub truncation: TruncationArg,

    /// Replay a JSON snapshot instead of fetching the web preview
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Also write the collected posts to this CSV file
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Collect without touching the database
    #[arg(long)]
    pub no_store: bool,

    /// Print the request that would run, then exit
    #[arg(long)]
    pub dry_run: bool,
}

/// Parse `YYYY-MM`.
pub(crate) fn parse_month(raw: &str) -> Result<(i32, u32), String> {
    let (year, month) = raw
        .trim()
        .split_once('-')
        .ok_or_else(|| format!("expected YYYY-MM, got '{raw}'"))?;
    let year = year
        .parse::<i32>()
        .map_err(|_| format!("invalid year in '{raw}'"))?;
    let month = month
        .parse::<u32>()
        .map_err(|_| format!("invalid month in '{raw}'"))?;
    if !(1..=12).contains(&month) {
        return Err(format!("month must be 01-12, got '{raw}'"));
    }
    Ok((year, month))
}

impl CollectArgs {
    fn period(&self) -> Period {
        if let Some((year, month)) = self.month {
            Period::Month { year, month }
        } else if let Some(days) = self.days {
            Period::LastDays(days)
        } else if self.last_week {
            Period::LAST_WEEK
        } else if self.last_month {
            Period::LAST_MONTH
        } else {
            Period::All
        }
    }

    /// Validate the arguments into a [`CollectionRequest`] anchored at `now`.
    pub(crate) fn to_request(&self, now: NaiveDateTime) -> anyhow::Result<CollectionRequest> {
        let channels = parse_channel_list(&self.channels)?;
        let mut request =
            CollectionRequest::from_period(channels, self.period(), self.limit, self.flow.into(), now)?
                .with_truncation(self.truncation.into());
        if let Some(boundary) = self.boundary {
            request = request.with_boundary(boundary.into());
        }
        Ok(request)
    }
}

fn print_plan(request: &CollectionRequest) {
    let names: Vec<&str> = request.channels.iter().map(|c| c.as_str()).collect();
    let bound = |t: Option<NaiveDateTime>| t.map_or_else(|| "unbounded".to_string(), |t| t.to_string());
    println!(
        "dry-run: would collect {} channels [{}] from {} to {}, limit {}, boundary {}, truncation {:?}",
        names.len(),
        names.join(", "),
        bound(request.window.start),
        bound(request.window.end),
        request.limit().map_or_else(|| "none".to_string(), |l| l.to_string()),
        request.boundary,
        request.truncation,
    );
}

fn settings_from_config(config: &AppConfig) -> CollectorSettings {
    CollectorSettings {
        inter_channel_delay: Duration::from_millis(config.inter_channel_delay_ms),
        ..CollectorSettings::default()
    }
}

/// Build the web preview feed from configuration.
pub(crate) fn build_web_feed(config: &AppConfig) -> anyhow::Result<WebPreviewFeed> {
    let feed = WebPreviewFeed::new(
        config.feed_request_timeout_secs,
        &config.feed_user_agent,
        config.feed_max_retries,
        config.feed_retry_backoff_base_secs,
        config.feed_inter_page_delay_ms,
    )
    .map_err(|e| anyhow::anyhow!("failed to build feed client: {e}"))?
    .with_base_url(config.feed_base_url.clone());
    Ok(feed)
}

/// Flag flipped by Ctrl-C; the collector checks it between channels.
fn cancel_on_ctrl_c() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handle = Arc::clone(&flag);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, finishing current channel");
            handle.store(true, Ordering::SeqCst);
        }
    });
    flag
}

async fn collect_with<F: FeedSource>(
    feed: F,
    config: &AppConfig,
    request: &CollectionRequest,
) -> CollectionOutcome {
    Collector::new(feed, settings_from_config(config))
        .with_cancel_flag(cancel_on_ctrl_c())
        .collect(request)
        .await
}

fn channel_status(summary: &ChannelSummary) -> ChannelRunStatus {
    match &summary.failure {
        None => ChannelRunStatus::Succeeded,
        Some(ChannelFailure::Traversal(_)) if summary.collected > 0 => ChannelRunStatus::Partial,
        Some(_) => ChannelRunStatus::Failed,
    }
}

fn print_failures(outcome: &CollectionOutcome) {
    for (summary, failure) in outcome.failures() {
        eprintln!("warning: {}: {failure}", summary.channel);
    }
    if outcome.cancelled {
        eprintln!("warning: collection was cancelled; remaining channels were skipped");
    }
}

async fn store_outcome(
    pool: &sqlx::PgPool,
    run_id: i64,
    request: &CollectionRequest,
    outcome: &CollectionOutcome,
) -> anyhow::Result<u64> {
    let posts: Vec<NewPost<'_>> = outcome
        .records
        .iter()
        .map(|r| NewPost {
            channel: r.channel.as_str(),
            message_id: r.message_id,
            text: &r.text,
            posted_at: r.date,
            views: r.views,
            comments_count: r.comments_count,
            reactions_count: r.reactions_count,
            forwards_count: r.forwards_count,
        })
        .collect();
    let inserted = postspy_db::replace_posts(pool, Some(run_id), &posts).await?;

    for summary in &outcome.channels {
        let error = summary.failure.as_ref().map(ToString::to_string);
        postspy_db::upsert_collection_run_channel(
            pool,
            run_id,
            summary.channel.as_str(),
            channel_status(summary),
            i32::try_from(summary.collected).unwrap_or(i32::MAX),
            error.as_deref(),
        )
        .await?;
    }
    for channel in request.channels.iter().skip(outcome.channels.len()) {
        postspy_db::upsert_collection_run_channel(
            pool,
            run_id,
            channel.as_str(),
            ChannelRunStatus::Skipped,
            0,
            None,
        )
        .await?;
    }
    Ok(inserted)
}

/// Run `collect`.
///
/// Per-channel failures are reported as warnings and recorded on the run;
/// they never fail the command. An empty result prints a notice.
///
/// # Errors
///
/// Returns an error for invalid arguments, an unreadable snapshot, a feed
/// client that cannot be built, or a database failure.
pub(crate) async fn run_collect(
    config: &AppConfig,
    pool: Option<&sqlx::PgPool>,
    args: &CollectArgs,
) -> anyhow::Result<()> {
    let now = chrono::Utc::now().naive_utc();
    let request = args.to_request(now)?;

    if args.dry_run {
        print_plan(&request);
        return Ok(());
    }

    let run = match pool {
        Some(pool) => {
            let run_type = match request.flow {
                Flow::Report => "report",
                Flow::AdHoc => "ad_hoc",
            };
            let run = postspy_db::create_collection_run(pool, run_type, "cli").await?;
            postspy_db::start_collection_run(pool, run.id).await?;
            Some((pool, run.id))
        }
        None => None,
    };

    let outcome = match &args.snapshot {
        Some(path) => match SnapshotFeed::from_path(path) {
            Ok(feed) => collect_with(feed, config, &request).await,
            Err(e) => {
                if let Some((pool, run_id)) = run {
                    fail_run_best_effort(pool, run_id, "collect", e.to_string()).await;
                }
                return Err(e.into());
            }
        },
        None => match build_web_feed(config) {
            Ok(feed) => collect_with(feed, config, &request).await,
            Err(e) => {
                if let Some((pool, run_id)) = run {
                    fail_run_best_effort(pool, run_id, "collect", format!("{e:#}")).await;
                }
                return Err(e);
            }
        },
    };

    print_failures(&outcome);

    if let Some((pool, run_id)) = run {
        match store_outcome(pool, run_id, &request, &outcome).await {
            Ok(inserted) => {
                postspy_db::complete_collection_run(
                    pool,
                    run_id,
                    i32::try_from(inserted).unwrap_or(i32::MAX),
                )
                .await?;
                tracing::info!(run_id, inserted, "posts stored");
            }
            Err(e) => {
                fail_run_best_effort(pool, run_id, "collect", format!("{e:#}")).await;
                return Err(e);
            }
        }
    }

    if let Some(path) = &args.out {
        let written = write_records_csv(path, &outcome.records)?;
        println!("wrote {written} posts to {}", path.display());
    }

    if outcome.is_empty() {
        println!("nothing collected");
        return Ok(());
    }
    println!("collected {} posts", outcome.records.len());
    print_stats(&aggregate(&outcome.records, &request.channels));
    Ok(())
}

#[cfg(test)]
#[path = "collect_test.rs"]
mod tests;
