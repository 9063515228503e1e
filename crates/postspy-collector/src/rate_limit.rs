//! Retry with exponential back-off for feed requests.
//!
//! Transient failures (HTTP 429, network errors, 5xx) are retried; anything
//! else is returned on the first failure.

use std::future::Future;
use std::time::Duration;

use crate::error::FeedError;

const MAX_DELAY_MS: u64 = 60_000;

/// Returns `true` for errors worth retrying after a back-off delay.
///
/// [`FeedError::NotFound`] is never retried: the resolver owns the
/// alternate-identifier retry and a missing channel stays missing.
pub(crate) fn is_retriable(err: &FeedError) -> bool {
    match err {
        FeedError::RateLimited { .. } => true,
        FeedError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        FeedError::UnexpectedStatus { status, .. } => (500..600).contains(status),
        FeedError::NotFound { .. }
        | FeedError::Parse { .. }
        | FeedError::Snapshot { .. }
        | FeedError::Io { .. }
        | FeedError::PaginationLimit { .. } => false,
    }
}

/// Delay before retry number `attempt` (1-based), before jitter.
///
/// A server-provided `Retry-After` wins when it is longer than the computed delay.
fn backoff_delay_ms(backoff_base_secs: u64, attempt: u32, err: &FeedError) -> u64 {
    let computed = backoff_base_secs
        .saturating_mul(1_000)
        .saturating_mul(1u64 << (attempt - 1).min(10));
    let floor = match err {
        FeedError::RateLimited { retry_after_secs } => retry_after_secs.saturating_mul(1_000),
        _ => 0,
    };
    computed.max(floor).min(MAX_DELAY_MS)
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// Back-off is `backoff_base_secs * 2^(attempt - 1)` with ±25 % jitter, capped at 60 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, FeedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FeedError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let capped = backoff_delay_ms(backoff_base_secs, attempt, &err);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient feed error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
