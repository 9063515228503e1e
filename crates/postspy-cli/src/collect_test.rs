use chrono::NaiveDate;
use clap::Parser;
use postspy_core::{ChannelRef, ValidationError};

use super::*;

#[derive(Debug, Parser)]
struct Harness {
    #[command(flatten)]
    args: CollectArgs,
}

fn args(extra: &[&str]) -> CollectArgs {
    let argv = std::iter::once("collect").chain(extra.iter().copied());
    Harness::try_parse_from(argv).unwrap().args
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 15)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

#[test]
fn parse_month_accepts_padded_and_unpadded() {
    assert_eq!(parse_month("2025-01"), Ok((2025, 1)));
    assert_eq!(parse_month("2024-2"), Ok((2024, 2)));
    assert!(parse_month("2025-00").is_err());
    assert!(parse_month("2025").is_err());
}

#[test]
fn default_period_is_unbounded_with_stop() {
    let request = args(&["@alpha"]).to_request(now()).unwrap();
    assert_eq!(request.window, postspy_core::TimeWindow::UNBOUNDED);
    assert_eq!(request.boundary, BoundaryPolicy::Stop);
    assert_eq!(request.limit(), None);
}

#[test]
fn last_week_defaults_to_skip() {
    let request = args(&["@alpha", "--last-week"]).to_request(now()).unwrap();
    assert_eq!(request.boundary, BoundaryPolicy::Skip);
    assert_eq!(
        request.window.start,
        Some(now() - chrono::Duration::days(7))
    );
}

#[test]
fn month_window_and_boundary_override() {
    let request = args(&["@alpha", "--month", "2025-01", "--boundary", "skip"])
        .to_request(now())
        .unwrap();
    let jan1 = NaiveDate::from_ymd_opt(2025, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let feb1 = NaiveDate::from_ymd_opt(2025, 2, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    assert_eq!(request.window.start, Some(jan1));
    assert_eq!(request.window.end, Some(feb1));
    assert_eq!(request.boundary, BoundaryPolicy::Skip);
}

#[test]
fn channels_are_deduplicated() {
    let request = args(&["@alpha, @alpha\n@beta"])
        .to_request(now())
        .unwrap();
    assert_eq!(
        request.channels,
        vec![
            ChannelRef::new("@alpha").unwrap(),
            ChannelRef::new("@beta").unwrap()
        ]
    );
}

#[test]
fn report_flow_rejects_five_channels() {
    let err = args(&["@a1,@a2,@a3,@a4,@a5", "--flow", "report"])
        .to_request(now())
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ValidationError>(),
        Some(ValidationError::TooManyChannels { count: 5, max: 4 })
    ));
}

#[test]
fn ad_hoc_rejects_large_limit_and_long_period() {
    assert!(args(&["@alpha", "--limit", "1001"]).to_request(now()).is_err());
    assert!(args(&["@alpha", "--days", "366"]).to_request(now()).is_err());
    assert!(args(&["@alpha", "--limit", "1000", "--days", "365"])
        .to_request(now())
        .is_ok());
}

#[test]
fn truncation_flag_is_carried() {
    let request = args(&["@alpha", "--truncation", "per-channel"])
        .to_request(now())
        .unwrap();
    assert_eq!(request.truncation, TruncationMode::PerChannel);
}

fn summary(collected: usize, failure: Option<ChannelFailure>) -> ChannelSummary {
    let mut s = ChannelSummary::new(&ChannelRef::new("@alpha").unwrap());
    s.collected = collected;
    s.failure = failure;
    s
}

#[test]
fn channel_status_maps_outcomes() {
    use postspy_collector::{FeedError, TraversalError};

    let traversal = || {
        Some(ChannelFailure::Traversal(TraversalError {
            channel: "@alpha".to_string(),
            scanned: 3,
            source: FeedError::RateLimited {
                retry_after_secs: 5,
            },
        }))
    };
    assert_eq!(channel_status(&summary(4, None)), ChannelRunStatus::Succeeded);
    assert_eq!(channel_status(&summary(2, traversal())), ChannelRunStatus::Partial);
    assert_eq!(channel_status(&summary(0, traversal())), ChannelRunStatus::Failed);
}
