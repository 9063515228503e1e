pub mod app_config;
pub mod channels;
pub mod config;
pub mod request;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use channels::{dedup_channels, parse_channel_list, ChannelRef};
pub use config::{load_app_config, load_app_config_from_env};
pub use request::{
    BoundaryPolicy, CollectionRequest, Flow, Period, TimeWindow, TruncationMode,
    MAX_AD_HOC_LIMIT, MAX_AD_HOC_SPAN_DAYS, MAX_REPORT_CHANNELS,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Rejections raised while building a [`CollectionRequest`] from user input.
///
/// These are raised before any feed I/O starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no valid channel references found; use @name or https://t.me/name")]
    NoChannels,

    #[error("invalid channel reference '{0}'")]
    InvalidChannel(String),

    #[error("too many channels: {count} given, at most {max} allowed")]
    TooManyChannels { count: usize, max: usize },

    #[error("limit {limit} exceeds the maximum of {max}")]
    LimitTooLarge { limit: u32, max: u32 },

    #[error("period of {days} days exceeds the maximum of {max} days")]
    PeriodTooLong { days: i64, max: i64 },

    #[error("a period of {days} days reaches before the earliest supported date")]
    PeriodOutOfRange { days: u32 },

    #[error("window start {start} is after window end {end}")]
    InvertedWindow { start: String, end: String },

    #[error("invalid month {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },
}
