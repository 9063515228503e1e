//! Database operations for `collection_runs` and `collection_run_channels`.

use std::fmt;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgQueryResult;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const RUN_COLUMNS: &str = "id, public_id, run_type, trigger_source, status, started_at, \
                           completed_at, records_processed, error_message, created_at";

/// One invocation of the collector, as recorded in `collection_runs`.
///
/// Lifecycle: `queued` -> `running` -> `succeeded` | `failed`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CollectionRunRow {
    pub id: i64,
    pub public_id: Uuid,
    /// `report` or `ad_hoc`.
    pub run_type: String,
    pub trigger_source: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Posts written by the run.
    pub records_processed: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One channel's outcome within a run.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CollectionRunChannelRow {
    pub id: i64,
    pub collection_run_id: i64,
    pub channel: String,
    pub status: String,
    pub records_processed: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An `UPDATE` guarded by `status = expected` touched nothing: the run is
/// missing or in another state.
fn check_transition(
    result: &PgQueryResult,
    id: i64,
    expected_status: &'static str,
) -> Result<(), DbError> {
    if result.rows_affected() == 0 {
        return Err(DbError::InvalidCollectionRunTransition {
            id,
            expected_status,
        });
    }
    Ok(())
}

/// Insert a `queued` run for `run_type` (`report`, `ad_hoc`) started by
/// `trigger_source` (`cli`).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_collection_run(
    pool: &PgPool,
    run_type: &str,
    trigger_source: &str,
) -> Result<CollectionRunRow, DbError> {
    let sql = format!(
        "INSERT INTO collection_runs (public_id, run_type, trigger_source, status) \
         VALUES ($1, $2, $3, 'queued') RETURNING {RUN_COLUMNS}"
    );
    let run = sqlx::query_as::<_, CollectionRunRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(run_type)
        .bind(trigger_source)
        .fetch_one(pool)
        .await?;
    Ok(run)
}

/// `queued` -> `running`; stamps `started_at`.
///
/// # Errors
///
/// Returns [`DbError::InvalidCollectionRunTransition`] unless the run is
/// `queued`, or [`DbError::Sqlx`] on query failure.
pub async fn start_collection_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE collection_runs SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;
    check_transition(&result, id, "queued")
}

/// `running` -> `succeeded`, recording how many posts were written.
///
/// # Errors
///
/// Returns [`DbError::InvalidCollectionRunTransition`] unless the run is
/// `running`, or [`DbError::Sqlx`] on query failure.
pub async fn complete_collection_run(
    pool: &PgPool,
    id: i64,
    records_processed: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE collection_runs \
         SET status = 'succeeded', completed_at = NOW(), records_processed = $2 \
         WHERE id = $1 AND status = 'running'",
    )
    .bind(id)
    .bind(records_processed)
    .execute(pool)
    .await?;
    check_transition(&result, id, "running")
}

/// `running` -> `failed` with `error_message`. A run still `queued` cannot fail.
///
/// # Errors
///
/// Returns [`DbError::InvalidCollectionRunTransition`] unless the run is
/// `running`, or [`DbError::Sqlx`] on query failure.
pub async fn fail_collection_run(
    pool: &PgPool,
    id: i64,
    error_message: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE collection_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $2 \
         WHERE id = $1 AND status = 'running'",
    )
    .bind(id)
    .bind(error_message)
    .execute(pool)
    .await?;
    check_transition(&result, id, "running")
}

/// # Errors
///
/// Returns [`DbError::NotFound`] when no run has this `id`, or
/// [`DbError::Sqlx`] on query failure.
pub async fn get_collection_run(pool: &PgPool, id: i64) -> Result<CollectionRunRow, DbError> {
    let sql = format!("SELECT {RUN_COLUMNS} FROM collection_runs WHERE id = $1");
    sqlx::query_as::<_, CollectionRunRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Newest runs first, at most `limit`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_collection_runs(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<CollectionRunRow>, DbError> {
    let sql = format!(
        "SELECT {RUN_COLUMNS} FROM collection_runs ORDER BY created_at DESC, id DESC LIMIT $1"
    );
    let runs = sqlx::query_as::<_, CollectionRunRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(runs)
}

// ---------------------------------------------------------------------------
// collection_run_channels operations
// ---------------------------------------------------------------------------

/// Outcome of one channel within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRunStatus {
    Succeeded,
    /// Traversal failed after some records were collected.
    Partial,
    Failed,
    /// Not attempted (cancelled run).
    Skipped,
}

impl ChannelRunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelRunStatus::Succeeded => "succeeded",
            ChannelRunStatus::Partial => "partial",
            ChannelRunStatus::Failed => "failed",
            ChannelRunStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for ChannelRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inserts or updates the per-channel result row for a collection run.
///
/// Conflicts on `(collection_run_id, channel)` update `status`,
/// `records_processed`, and `error_message` in place.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_collection_run_channel(
    pool: &PgPool,
    run_id: i64,
    channel: &str,
    status: ChannelRunStatus,
    records_processed: i32,
    error_message: Option<&str>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO collection_run_channels \
             (collection_run_id, channel, status, records_processed, error_message) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (collection_run_id, channel) DO UPDATE SET \
             status            = EXCLUDED.status, \
             records_processed = EXCLUDED.records_processed, \
             error_message     = EXCLUDED.error_message",
    )
    .bind(run_id)
    .bind(channel)
    .bind(status.as_str())
    .bind(records_processed)
    .bind(error_message)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns all channel-level result rows for a run, in insertion order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_collection_run_channels(
    pool: &PgPool,
    run_id: i64,
) -> Result<Vec<CollectionRunChannelRow>, DbError> {
    let rows = sqlx::query_as::<_, CollectionRunChannelRow>(
        "SELECT id, collection_run_id, channel, status, records_processed, \
                error_message, created_at \
         FROM collection_run_channels \
         WHERE collection_run_id = $1 \
         ORDER BY id",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
