use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a
/// plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = lookup("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());
    let env = parse_environment(&or_default("POSTSPY_ENV", "development"))?;
    let log_level = or_default("POSTSPY_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("POSTSPY_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("POSTSPY_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("POSTSPY_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let feed_base_url = or_default("POSTSPY_FEED_BASE_URL", "https://t.me");
    if !(feed_base_url.starts_with("http://") || feed_base_url.starts_with("https://")) {
        return Err(ConfigError::InvalidEnvVar {
            var: "POSTSPY_FEED_BASE_URL".to_string(),
            reason: format!("'{feed_base_url}' is not an http(s) URL"),
        });
    }
    let feed_request_timeout_secs = parse_u64("POSTSPY_FEED_REQUEST_TIMEOUT_SECS", "30")?;
    let feed_user_agent = or_default("POSTSPY_FEED_USER_AGENT", "postspy/0.1 (channel-analytics)");
    let feed_max_retries = parse_u32("POSTSPY_FEED_MAX_RETRIES", "3")?;
    let feed_retry_backoff_base_secs = parse_u64("POSTSPY_FEED_RETRY_BACKOFF_BASE_SECS", "2")?;
    let feed_inter_page_delay_ms = parse_u64("POSTSPY_FEED_INTER_PAGE_DELAY_MS", "250")?;
    let inter_channel_delay_ms = parse_u64("POSTSPY_INTER_CHANNEL_DELAY_MS", "500")?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        feed_base_url,
        feed_request_timeout_secs,
        feed_user_agent,
        feed_max_retries,
        feed_retry_backoff_base_secs,
        feed_inter_page_delay_ms,
        inter_channel_delay_ms,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "POSTSPY_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
