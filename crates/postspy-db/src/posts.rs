//! Database operations for the flat `posts` table.
//!
//! The table holds the latest run only: [`replace_posts`] clears it and
//! rewrites it in the order given, so `ORDER BY id` reproduces that order.

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: i64,
    pub collection_run_id: Option<i64>,
    pub channel: String,
    pub message_id: i64,
    pub text: String,
    pub posted_at: NaiveDateTime,
    pub views: i64,
    pub comments_count: i64,
    pub reactions_count: i64,
    pub forwards_count: i64,
    pub created_at: DateTime<Utc>,
}

/// One post to insert. Counters are unsigned; values above `i64::MAX` are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost<'a> {
    pub channel: &'a str,
    pub message_id: i64,
    pub text: &'a str,
    pub posted_at: NaiveDateTime,
    pub views: u64,
    pub comments_count: u64,
    pub reactions_count: u64,
    pub forwards_count: u64,
}

fn to_bigint(field: &'static str, value: u64) -> Result<i64, DbError> {
    i64::try_from(value).map_err(|_| DbError::ValueOutOfRange { field, value })
}

/// Replace the table contents with `posts`, in order, inside one transaction.
///
/// Returns the number of rows inserted. On error nothing is changed.
///
/// # Errors
///
/// Returns [`DbError::ValueOutOfRange`] for a counter that does not fit
/// `BIGINT`, or [`DbError::Sqlx`] if any statement fails.
pub async fn replace_posts(
    pool: &PgPool,
    run_id: Option<i64>,
    posts: &[NewPost<'_>],
) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM posts").execute(&mut *tx).await?;

    let mut inserted = 0u64;
    for post in posts {
        sqlx::query(
            "INSERT INTO posts \
                 (collection_run_id, channel, message_id, text, posted_at, \
                  views, comments_count, reactions_count, forwards_count) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(run_id)
        .bind(post.channel)
        .bind(post.message_id)
        .bind(post.text)
        .bind(post.posted_at)
        .bind(to_bigint("views", post.views)?)
        .bind(to_bigint("comments_count", post.comments_count)?)
        .bind(to_bigint("reactions_count", post.reactions_count)?)
        .bind(to_bigint("forwards_count", post.forwards_count)?)
        .execute(&mut *tx)
        .await?;
        inserted += 1;
    }

    tx.commit().await?;
    Ok(inserted)
}

/// All stored posts in insertion order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_posts(pool: &PgPool) -> Result<Vec<PostRow>, DbError> {
    let rows = sqlx::query_as::<_, PostRow>(
        "SELECT id, collection_run_id, channel, message_id, text, posted_at, \
                views, comments_count, reactions_count, forwards_count, created_at \
         FROM posts \
         ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_posts(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_above_bigint_are_rejected() {
        assert_eq!(to_bigint("views", 42).unwrap(), 42);
        let err = to_bigint("views", u64::MAX).unwrap_err();
        assert!(matches!(
            err,
            DbError::ValueOutOfRange {
                field: "views",
                value: u64::MAX
            }
        ));
    }
}
