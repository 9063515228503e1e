//! CSV output of the flat post table.
//!
//! Columns: `id, channel, text, date, views, comments_count, reactions_count,
//! forwards_count`, header first, one row per post in collector order.
//! `id` is the 1-based position in that order, whether the rows come from a
//! fresh collection or from the stored table.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::NaiveDateTime;
use postspy_collector::PostRecord;

const HEADER: [&str; 8] = [
    "id",
    "channel",
    "text",
    "date",
    "views",
    "comments_count",
    "reactions_count",
    "forwards_count",
];

/// One CSV line, borrowed from either a stored row or a fresh record.
pub(crate) struct CsvRow<'a> {
    pub id: i64,
    pub channel: &'a str,
    pub text: &'a str,
    pub date: NaiveDateTime,
    pub views: String,
    pub comments_count: String,
    pub reactions_count: String,
    pub forwards_count: String,
}

impl<'a> CsvRow<'a> {
    pub(crate) fn from_record(position: usize, record: &'a PostRecord) -> Self {
        Self {
            id: row_number(position),
            channel: record.channel.as_str(),
            text: &record.text,
            date: record.date,
            views: record.views.to_string(),
            comments_count: record.comments_count.to_string(),
            reactions_count: record.reactions_count.to_string(),
            forwards_count: record.forwards_count.to_string(),
        }
    }

    /// `position` is the row's index in `ORDER BY id`; the serial id itself
    /// keeps growing across runs and is not written.
    pub(crate) fn from_row(position: usize, row: &'a postspy_db::PostRow) -> Self {
        Self {
            id: row_number(position),
            channel: &row.channel,
            text: &row.text,
            date: row.posted_at,
            views: row.views.to_string(),
            comments_count: row.comments_count.to_string(),
            reactions_count: row.reactions_count.to_string(),
            forwards_count: row.forwards_count.to_string(),
        }
    }
}

fn row_number(position: usize) -> i64 {
    i64::try_from(position + 1).unwrap_or(i64::MAX)
}

/// Quote a field when it contains a delimiter, quote, or line break.
pub(crate) fn escape_csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Write the header and every row to `out`. Returns the number of data rows.
pub(crate) fn write_csv<'a, W: Write>(
    mut out: W,
    rows: impl IntoIterator<Item = CsvRow<'a>>,
) -> std::io::Result<usize> {
    writeln!(out, "{}", HEADER.join(","))?;
    let mut written = 0;
    for row in rows {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            row.id,
            escape_csv_field(row.channel),
            escape_csv_field(row.text),
            row.date.format("%Y-%m-%d %H:%M:%S"),
            row.views,
            row.comments_count,
            row.reactions_count,
            row.forwards_count,
        )?;
        written += 1;
    }
    out.flush()?;
    Ok(written)
}

/// Write freshly collected records to `path`.
pub(crate) fn write_records_csv(path: &Path, records: &[PostRecord]) -> anyhow::Result<usize> {
    let file = File::create(path)
        .map_err(|e| anyhow::anyhow!("failed to create {}: {e}", path.display()))?;
    let rows = records
        .iter()
        .enumerate()
        .map(|(i, r)| CsvRow::from_record(i, r));
    Ok(write_csv(BufWriter::new(file), rows)?)
}

/// Export the stored `posts` table to `path`.
///
/// # Errors
///
/// Returns an error if the query fails or the file cannot be written.
pub(crate) async fn run_export(pool: &sqlx::PgPool, path: &Path) -> anyhow::Result<()> {
    let rows = postspy_db::list_posts(pool).await?;
    if rows.is_empty() {
        println!("no posts stored; run `collect` first");
        return Ok(());
    }

    let file = File::create(path)
        .map_err(|e| anyhow::anyhow!("failed to create {}: {e}", path.display()))?;
    let written = write_csv(
        BufWriter::new(file),
        rows.iter().enumerate().map(|(i, row)| CsvRow::from_row(i, row)),
    )?;
    println!("exported {written} posts to {}", path.display());
    Ok(())
}
