//! Collection request model: channel set, time window, limit and the two
//! policy flags that steer the collector.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::channels::{dedup_channels, ChannelRef};
use crate::ValidationError;

/// Report flows compare a handful of channels side by side.
pub const MAX_REPORT_CHANNELS: usize = 4;
pub const MAX_AD_HOC_LIMIT: u32 = 1000;
pub const MAX_AD_HOC_SPAN_DAYS: i64 = 365;

/// Half-open `[start, end)` window over naive UTC timestamps. Either side may be unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl TimeWindow {
    pub const UNBOUNDED: Self = Self {
        start: None,
        end: None,
    };

    /// # Errors
    ///
    /// Returns [`ValidationError::InvertedWindow`] when both bounds are set and `start > end`.
    pub fn new(
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Self, ValidationError> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(ValidationError::InvertedWindow {
                    start: s.to_string(),
                    end: e.to_string(),
                });
            }
        }
        Ok(Self { start, end })
    }

    /// Calendar month `[YYYY-MM-01, first day of next month)`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidMonth`] for a month outside `1..=12`
    /// or a year chrono cannot represent.
    pub fn month(year: i32, month: u32) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidMonth { year, month };
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let (next_year, next_month) = if month == 12 {
            (year.checked_add(1).ok_or_else(invalid)?, 1)
        } else {
            (year, month + 1)
        };
        let end = NaiveDate::from_ymd_opt(next_year, next_month, 1).ok_or_else(invalid)?;
        Ok(Self {
            start: Some(start.and_time(chrono::NaiveTime::MIN)),
            end: Some(end.and_time(chrono::NaiveTime::MIN)),
        })
    }

    /// Sliding window covering the last `days` days up to (and past) `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PeriodOutOfRange`] when the start would fall
    /// before the earliest representable timestamp.
    pub fn last_days(now: NaiveDateTime, days: u32) -> Result<Self, ValidationError> {
        let start = Duration::try_days(i64::from(days))
            .and_then(|span| now.checked_sub_signed(span))
            .ok_or(ValidationError::PeriodOutOfRange { days })?;
        Ok(Self {
            start: Some(start),
            end: None,
        })
    }

    #[must_use]
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        !self.is_before_start(t) && !self.is_at_or_after_end(t)
    }

    #[must_use]
    pub fn is_before_start(&self, t: NaiveDateTime) -> bool {
        self.start.is_some_and(|s| t < s)
    }

    #[must_use]
    pub fn is_at_or_after_end(&self, t: NaiveDateTime) -> bool {
        self.end.is_some_and(|e| t >= e)
    }

    /// Whole days from the lower bound to the upper bound, or to `now` when
    /// the window is open-ended. `None` without a lower bound.
    #[must_use]
    pub fn span_days(&self, now: NaiveDateTime) -> Option<i64> {
        let start = self.start?;
        Some((self.end.unwrap_or(now) - start).num_days())
    }
}

/// What to do with a message older than the window's lower bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// End the channel traversal: every later message is older still.
    #[default]
    Stop,
    /// Keep scanning until the page budget runs out. Use for feeds that
    /// interleave pinned or out-of-order entries near the boundary.
    Skip,
}

impl std::fmt::Display for BoundaryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundaryPolicy::Stop => write!(f, "stop"),
            BoundaryPolicy::Skip => write!(f, "skip"),
        }
    }
}

/// How `limit` caps the merged result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationMode {
    /// Sort all channels together and keep the newest `limit` records overall.
    #[default]
    Global,
    /// Keep up to `limit` records per channel; no cut after the merge.
    PerChannel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    /// Side-by-side channel report, at most [`MAX_REPORT_CHANNELS`] channels.
    Report,
    /// One-off collection with bounded limit and period.
    AdHoc,
}

/// User-facing period choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    All,
    LastDays(u32),
    Month { year: i32, month: u32 },
}

impl Period {
    pub const LAST_WEEK: Self = Self::LastDays(7);
    pub const LAST_MONTH: Self = Self::LastDays(30);

    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidMonth`] for an impossible calendar month
    /// and [`ValidationError::PeriodOutOfRange`] for a sliding window that
    /// cannot be anchored at `now`.
    pub fn window(&self, now: NaiveDateTime) -> Result<TimeWindow, ValidationError> {
        match *self {
            Period::All | Period::LastDays(0) => Ok(TimeWindow::UNBOUNDED),
            Period::LastDays(days) => TimeWindow::last_days(now, days),
            Period::Month { year, month } => TimeWindow::month(year, month),
        }
    }

    /// Month windows have a hard lower bound; sliding windows scan their whole page budget.
    #[must_use]
    pub fn default_boundary_policy(&self) -> BoundaryPolicy {
        match self {
            Period::LastDays(_) => BoundaryPolicy::Skip,
            Period::All | Period::Month { .. } => BoundaryPolicy::Stop,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRequest {
    pub channels: Vec<ChannelRef>,
    pub window: TimeWindow,
    /// `0` means no count limit.
    pub limit: u32,
    pub flow: Flow,
    pub boundary: BoundaryPolicy,
    pub truncation: TruncationMode,
}

impl CollectionRequest {
    /// Validate and build a request over an explicit window.
    ///
    /// Channels are deduplicated preserving order. An open-ended window's
    /// span is measured up to `now`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the channel list is empty, a report
    /// names more than [`MAX_REPORT_CHANNELS`] channels, or an ad-hoc request
    /// exceeds [`MAX_AD_HOC_LIMIT`] or [`MAX_AD_HOC_SPAN_DAYS`].
    pub fn new(
        channels: Vec<ChannelRef>,
        window: TimeWindow,
        limit: u32,
        flow: Flow,
        now: NaiveDateTime,
    ) -> Result<Self, ValidationError> {
        let channels = dedup_channels(channels);
        if channels.is_empty() {
            return Err(ValidationError::NoChannels);
        }
        let window = TimeWindow::new(window.start, window.end)?;

        match flow {
            Flow::Report => {
                if channels.len() > MAX_REPORT_CHANNELS {
                    return Err(ValidationError::TooManyChannels {
                        count: channels.len(),
                        max: MAX_REPORT_CHANNELS,
                    });
                }
            }
            Flow::AdHoc => {
                if limit > MAX_AD_HOC_LIMIT {
                    return Err(ValidationError::LimitTooLarge {
                        limit,
                        max: MAX_AD_HOC_LIMIT,
                    });
                }
                if let Some(days) = window.span_days(now) {
                    if days > MAX_AD_HOC_SPAN_DAYS {
                        return Err(ValidationError::PeriodTooLong {
                            days,
                            max: MAX_AD_HOC_SPAN_DAYS,
                        });
                    }
                }
            }
        }

        Ok(Self {
            channels,
            window,
            limit,
            flow,
            boundary: BoundaryPolicy::default(),
            truncation: TruncationMode::default(),
        })
    }

    /// Build a request from a user-facing [`Period`], resolving sliding windows against `now`.
    ///
    /// The boundary policy defaults to [`Period::default_boundary_policy`].
    ///
    /// # Errors
    ///
    /// Same as [`CollectionRequest::new`], plus [`ValidationError::PeriodOutOfRange`]
    /// for a sliding window reaching past the representable calendar.
    pub fn from_period(
        channels: Vec<ChannelRef>,
        period: Period,
        limit: u32,
        flow: Flow,
        now: NaiveDateTime,
    ) -> Result<Self, ValidationError> {
        let window = period.window(now)?;
        let request = Self::new(channels, window, limit, flow, now)?;
        Ok(request.with_boundary(period.default_boundary_policy()))
    }

    #[must_use]
    pub fn with_boundary(mut self, boundary: BoundaryPolicy) -> Self {
        self.boundary = boundary;
        self
    }

    #[must_use]
    pub fn with_truncation(mut self, truncation: TruncationMode) -> Self {
        self.truncation = truncation;
        self
    }

    /// The count limit, or `None` when unbounded.
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        (self.limit > 0).then(|| self.limit as usize)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn now() -> NaiveDateTime {
        at(2025, 3, 10, 12, 0, 0)
    }

    fn channels(names: &[&str]) -> Vec<ChannelRef> {
        names.iter().map(|n| ChannelRef::new(n).unwrap()).collect()
    }

    #[test]
    fn month_window_is_half_open() {
        let window = TimeWindow::month(2025, 1).unwrap();
        assert_eq!(window.start, Some(at(2025, 1, 1, 0, 0, 0)));
        assert_eq!(window.end, Some(at(2025, 2, 1, 0, 0, 0)));
        assert!(window.contains(at(2025, 1, 31, 23, 59, 59)));
        assert!(!window.contains(at(2025, 2, 1, 0, 0, 0)));
        assert!(window.is_before_start(at(2024, 12, 31, 23, 59, 59)));
    }

    #[test]
    fn december_rolls_over_to_next_year() {
        let window = TimeWindow::month(2024, 12).unwrap();
        assert_eq!(window.end, Some(at(2025, 1, 1, 0, 0, 0)));
    }

    #[test]
    fn month_outside_calendar_is_rejected() {
        assert_eq!(
            TimeWindow::month(2025, 13),
            Err(ValidationError::InvalidMonth {
                year: 2025,
                month: 13
            })
        );
        assert!(TimeWindow::month(2025, 0).is_err());
    }

    #[test]
    fn inverted_window_is_rejected() {
        let result = TimeWindow::new(Some(at(2025, 2, 1, 0, 0, 0)), Some(at(2025, 1, 1, 0, 0, 0)));
        assert!(matches!(result, Err(ValidationError::InvertedWindow { .. })));
    }

    #[test]
    fn last_days_has_no_upper_bound() {
        let now = at(2025, 3, 10, 12, 0, 0);
        let window = TimeWindow::last_days(now, 7).unwrap();
        assert_eq!(window.start, Some(at(2025, 3, 3, 12, 0, 0)));
        assert!(window.end.is_none());
        assert!(window.contains(now));
    }

    #[test]
    fn period_all_and_zero_days_are_unbounded() {
        let now = at(2025, 3, 10, 12, 0, 0);
        assert_eq!(Period::All.window(now).unwrap(), TimeWindow::UNBOUNDED);
        assert_eq!(Period::LastDays(0).window(now).unwrap(), TimeWindow::UNBOUNDED);
    }

    #[test]
    fn boundary_policy_follows_period_kind() {
        assert_eq!(Period::LAST_WEEK.default_boundary_policy(), BoundaryPolicy::Skip);
        assert_eq!(
            Period::Month {
                year: 2025,
                month: 1
            }
            .default_boundary_policy(),
            BoundaryPolicy::Stop
        );
        assert_eq!(Period::All.default_boundary_policy(), BoundaryPolicy::Stop);
    }

    #[test]
    fn report_flow_allows_at_most_four_channels() {
        let ok = CollectionRequest::new(
            channels(&["@a", "@b", "@c", "@d"]),
            TimeWindow::UNBOUNDED,
            0,
            Flow::Report,
            now(),
        );
        assert!(ok.is_ok());

        let err = CollectionRequest::new(
            channels(&["@a", "@b", "@c", "@d", "@e"]),
            TimeWindow::UNBOUNDED,
            0,
            Flow::Report,
            now(),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::TooManyChannels { count: 5, max: 4 });
    }

    #[test]
    fn duplicate_channels_do_not_count_towards_report_cap() {
        let request = CollectionRequest::new(
            channels(&["@a", "@b", "@a", "@c", "@d", "@b"]),
            TimeWindow::UNBOUNDED,
            0,
            Flow::Report,
            now(),
        )
        .unwrap();
        assert_eq!(request.channels.len(), 4);
    }

    #[test]
    fn ad_hoc_flow_caps_limit() {
        assert!(
            CollectionRequest::new(channels(&["@a"]), TimeWindow::UNBOUNDED, 1000, Flow::AdHoc, now())
                .is_ok()
        );
        let err =
            CollectionRequest::new(channels(&["@a"]), TimeWindow::UNBOUNDED, 1001, Flow::AdHoc, now())
                .unwrap_err();
        assert_eq!(
            err,
            ValidationError::LimitTooLarge {
                limit: 1001,
                max: 1000
            }
        );
    }

    #[test]
    fn ad_hoc_flow_caps_period() {
        let now = at(2025, 3, 10, 12, 0, 0);
        assert!(CollectionRequest::from_period(
            channels(&["@a"]),
            Period::LastDays(365),
            0,
            Flow::AdHoc,
            now
        )
        .is_ok());
        let err = CollectionRequest::from_period(
            channels(&["@a"]),
            Period::LastDays(366),
            0,
            Flow::AdHoc,
            now,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::PeriodTooLong {
                days: 366,
                max: 365
            }
        );

        let explicit = TimeWindow::new(Some(at(2023, 1, 1, 0, 0, 0)), Some(at(2025, 1, 1, 0, 0, 0)))
            .unwrap();
        assert!(matches!(
            CollectionRequest::new(channels(&["@a"]), explicit, 0, Flow::AdHoc, now),
            Err(ValidationError::PeriodTooLong { .. })
        ));
    }

    #[test]
    fn ad_hoc_open_ended_window_is_measured_up_to_now() {
        let now = now();
        let long = TimeWindow::last_days(now, 1000).unwrap();
        assert_eq!(
            CollectionRequest::new(channels(&["@a"]), long, 0, Flow::AdHoc, now),
            Err(ValidationError::PeriodTooLong {
                days: 1000,
                max: 365
            })
        );

        let year = TimeWindow::new(Some(at(2024, 3, 10, 12, 0, 0)), None).unwrap();
        assert!(CollectionRequest::new(channels(&["@a"]), year, 0, Flow::AdHoc, now).is_ok());

        // Report flows have no span cap.
        assert!(CollectionRequest::new(channels(&["@a"]), long, 0, Flow::Report, now).is_ok());
    }

    #[test]
    fn sliding_window_past_the_calendar_is_rejected() {
        assert_eq!(
            TimeWindow::last_days(now(), u32::MAX),
            Err(ValidationError::PeriodOutOfRange { days: u32::MAX })
        );
        for flow in [Flow::Report, Flow::AdHoc] {
            assert_eq!(
                CollectionRequest::from_period(
                    channels(&["@a"]),
                    Period::LastDays(u32::MAX),
                    0,
                    flow,
                    now(),
                ),
                Err(ValidationError::PeriodOutOfRange { days: u32::MAX })
            );
        }
    }

    #[test]
    fn empty_channel_list_is_rejected() {
        assert_eq!(
            CollectionRequest::new(vec![], TimeWindow::UNBOUNDED, 10, Flow::AdHoc, now()),
            Err(ValidationError::NoChannels)
        );
    }

    #[test]
    fn from_period_applies_period_boundary_policy() {
        let now = at(2025, 3, 10, 12, 0, 0);
        let sliding =
            CollectionRequest::from_period(channels(&["@a"]), Period::LAST_MONTH, 50, Flow::AdHoc, now)
                .unwrap();
        assert_eq!(sliding.boundary, BoundaryPolicy::Skip);
        assert_eq!(sliding.truncation, TruncationMode::Global);
        assert_eq!(sliding.limit(), Some(50));

        let monthly = CollectionRequest::from_period(
            channels(&["@a"]),
            Period::Month {
                year: 2025,
                month: 1,
            },
            0,
            Flow::Report,
            now,
        )
        .unwrap();
        assert_eq!(monthly.boundary, BoundaryPolicy::Stop);
        assert_eq!(monthly.limit(), None);
    }
}
