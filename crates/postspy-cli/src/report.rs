//! Per-channel statistics printing.

use postspy_collector::{aggregate, PostRecord, StatsReport};
use postspy_core::{parse_channel_list, ChannelRef};

/// Print `report` as a fixed-width table, one line per channel.
pub(crate) fn print_stats(report: &StatsReport) {
    if report.is_empty() {
        println!("no channels to report");
        return;
    }

    println!(
        "{:<28}{:>7}{:>12}{:>10}{:>10}{:>10}{:>10}{:>10}{:>11}{:>11}",
        "CHANNEL",
        "POSTS",
        "VIEWS",
        "AVG VIEW",
        "AVG REACT",
        "AVG COMM",
        "AVG FWD",
        "VIEW/REACT",
        "VIEW/COMM",
        "VIEW/FWD"
    );
    for stats in report.iter() {
        println!(
            "{:<28}{:>7}{:>12}{:>10}{:>10}{:>10}{:>10}{:>10}{:>11}{:>11}",
            truncate(stats.channel.as_str(), 27),
            stats.total_posts,
            stats.total_views,
            stats.avg_views,
            stats.avg_reactions,
            stats.avg_comments,
            stats.avg_forwards,
            stats.coverage_per_reaction,
            stats.coverage_per_comment,
            stats.coverage_per_forward,
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", s.chars().take(max.saturating_sub(3)).collect::<String>())
    } else {
        s.to_string()
    }
}

fn record_from_row(row: &postspy_db::PostRow) -> anyhow::Result<PostRecord> {
    let count = |field: &str, value: i64| {
        u64::try_from(value)
            .map_err(|_| anyhow::anyhow!("post {} has negative {field}: {value}", row.id))
    };
    Ok(PostRecord {
        channel: ChannelRef::new(&row.channel)?,
        text: row.text.clone(),
        date: row.posted_at,
        views: count("views", row.views)?,
        comments_count: count("comments_count", row.comments_count)?,
        reactions_count: count("reactions_count", row.reactions_count)?,
        forwards_count: count("forwards_count", row.forwards_count)?,
        message_id: row.message_id,
    })
}

/// Aggregate the stored `posts` table and print it.
///
/// With `channels`, exactly those channels are reported (zeros for channels
/// without stored posts); otherwise every stored channel, first-seen order.
///
/// # Errors
///
/// Returns an error if the channel list is invalid or the query fails.
pub(crate) async fn run_report(
    pool: &sqlx::PgPool,
    channels: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let wanted = channels.map(parse_channel_list).transpose()?;
    let rows = postspy_db::list_posts(pool).await?;
    let records = rows
        .iter()
        .map(record_from_row)
        .collect::<anyhow::Result<Vec<_>>>()?;

    let report = match wanted {
        Some(wanted) => {
            let mut report = aggregate(&records, &wanted);
            report.entries.retain(|stats| wanted.contains(&stats.channel));
            report
        }
        None => aggregate(&records, &[]),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_stats(&report);
    }
    Ok(())
}
