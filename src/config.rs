// config.rs
use std::{str::FromStr, time::Duration};

use chrono::{FixedOffset, Offset, Utc};
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Clone)]
pub struct Config {
    // Absent means the in-memory store is used
    pub database_url: Option<String>,
    pub port: u16,
    pub slack_webhook_url: Option<String>,
    // Link appended to leader announcements
    pub leaderboard_url: String,
    pub leaderboard_utc_offset_minutes: i32,
    // 0 disables the periodic leaderboard job
    pub leaderboard_check_interval_secs: u64,
    pub notify_timeout_secs: u64,
    pub store_timeout_secs: u64,
    pub referral_cookie_max_age_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: None,
            port: 8000,
            slack_webhook_url: None,
            leaderboard_url: String::new(),
            leaderboard_utc_offset_minutes: 0,
            leaderboard_check_interval_secs: 0,
            notify_timeout_secs: 10,
            store_timeout_secs: 5,
            referral_cookie_max_age_days: 365,
        }
    }
}

impl Config {
    pub fn init() -> Config {
        let defaults = Config::default();

        let database_url = optional_env("DATABASE_URL");
        let slack_webhook_url = optional_env("SLACK_WEBHOOK_URL");
        if slack_webhook_url.is_none() {
            tracing::warn!("SLACK_WEBHOOK_URL not set - leader announcements will not be delivered");
        }

        let leaderboard_url = std::env::var("LEADERBOARD_URL")
            .unwrap_or_else(|_| defaults.leaderboard_url.clone());

        Config {
            database_url,
            port: parse_env("PORT", defaults.port),
            slack_webhook_url,
            leaderboard_url,
            leaderboard_utc_offset_minutes: parse_env(
                "LEADERBOARD_UTC_OFFSET_MINUTES",
                defaults.leaderboard_utc_offset_minutes,
            ),
            leaderboard_check_interval_secs: parse_env(
                "LEADERBOARD_CHECK_INTERVAL_SECS",
                defaults.leaderboard_check_interval_secs,
            ),
            notify_timeout_secs: parse_env("NOTIFY_TIMEOUT_SECS", defaults.notify_timeout_secs),
            store_timeout_secs: parse_env("STORE_TIMEOUT_SECS", defaults.store_timeout_secs),
            referral_cookie_max_age_days: parse_env(
                "REFERRAL_COOKIE_MAX_AGE_DAYS",
                defaults.referral_cookie_max_age_days,
            ),
        }
    }

    /// Fixed offset the monthly window is computed in. Out-of-range values fall back to UTC.
    pub fn reference_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.leaderboard_utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| {
                tracing::warn!(
                    "LEADERBOARD_UTC_OFFSET_MINUTES={} is out of range, using UTC",
                    self.leaderboard_utc_offset_minutes
                );
                Utc.fix()
            })
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}

/// Max log level, read before the subscriber exists so it cannot log its own fallback.
pub fn max_log_level() -> LevelFilter {
    std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|level| LevelFilter::from_str(level.trim()).ok())
        .unwrap_or(LevelFilter::DEBUG)
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_env<T: FromStr + Copy + std::fmt::Debug>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            tracing::warn!("{} has an invalid value {:?}, using {:?}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
