//! The `runs` command: recent collection runs with per-channel outcomes.

/// Print the most recent `limit` runs. With `details`, each run is followed
/// by its channel rows.
///
/// # Errors
///
/// Returns an error if a database query fails.
pub(crate) async fn run_runs(pool: &sqlx::PgPool, limit: i64, details: bool) -> anyhow::Result<()> {
    let runs = postspy_db::list_collection_runs(pool, limit).await?;
    if runs.is_empty() {
        println!("no collection runs found; run `postspy collect` first");
        return Ok(());
    }

    println!(
        "{:<6} {:<8} {:<10} {:>8} {:<20}  ERROR",
        "ID", "TYPE", "STATUS", "RECORDS", "STARTED"
    );
    for run in &runs {
        let started = run
            .started_at
            .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string());
        println!(
            "{:<6} {:<8} {:<10} {:>8} {:<20}  {}",
            run.id,
            run.run_type,
            run.status,
            run.records_processed,
            started,
            run.error_message.as_deref().unwrap_or("")
        );
        if details {
            for channel in postspy_db::list_collection_run_channels(pool, run.id).await? {
                println!(
                    "       {:<32} {:<10} {:>8}  {}",
                    channel.channel,
                    channel.status,
                    channel.records_processed,
                    channel.error_message.as_deref().unwrap_or("")
                );
            }
        }
    }
    Ok(())
}
