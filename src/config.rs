use anyhow::{Context, Result, anyhow, bail};
use chrono_tz::Tz;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::clocking::policy::{ClockingPolicy, MAX_GRACE_DAYS};

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_scan_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    pub clocking: ClockingPolicy,
    pub log_cache_ttl: Duration,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let opening_hour: u32 = or_default("CLOCK_OPENING_HOUR", 6)?;
        let closing_hour: u32 = or_default("CLOCK_CLOSING_HOUR", 21)?;
        let timezone = match env::var("STORE_TIMEZONE") {
            Ok(name) => parse_timezone(&name)?,
            Err(_) => Tz::UTC,
        };

        let clocking = ClockingPolicy {
            opening_hour,
            closing_hour,
            grace_days: or_default("BARCODE_GRACE_DAYS", 1)?,
            timezone,
        };
        validate_clocking(&clocking)?;

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: or_default("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: or_default("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: or_default("RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: or_default("RATE_REFRESH_PER_MIN", 30)?,
            rate_scan_per_min: or_default("RATE_SCAN_PER_MIN", 30)?,
            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            clocking,
            log_cache_ttl: Duration::from_secs(or_default("LOG_CACHE_TTL_SECS", 300)?),

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: or_default("LOG_LEVEL", tracing::Level::DEBUG)?,
        })
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://localhost/store_clock_test".into(),
            jwt_secret: "test-secret".into(),
            server_addr: "127.0.0.1:0".into(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            rate_login_per_min: 60,
            rate_refresh_per_min: 30,
            rate_scan_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".into(),
            clocking: ClockingPolicy::default(),
            log_cache_ttl: Duration::from_secs(60),
            log_dir: "logs".into(),
            log_level: tracing::Level::INFO,
        }
    }
}

/// IANA zone name such as `America/New_York`.
fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| anyhow!("STORE_TIMEZONE has an invalid value: {name:?} ({e})"))
}

fn validate_clocking(policy: &ClockingPolicy) -> Result<()> {
    if policy.opening_hour >= policy.closing_hour || policy.closing_hour >= 24 {
        bail!(
            "clocking window {}..{} is invalid, need opening < closing < 24",
            policy.opening_hour,
            policy.closing_hour
        );
    }
    if policy.grace_days > MAX_GRACE_DAYS {
        bail!(
            "BARCODE_GRACE_DAYS is {}, at most {MAX_GRACE_DAYS} is allowed",
            policy.grace_days
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_valid() {
        assert!(validate_clocking(&ClockingPolicy::default()).is_ok());
    }

    #[test]
    fn inverted_or_overflowing_windows_are_rejected() {
        let inverted = ClockingPolicy {
            opening_hour: 21,
            closing_hour: 6,
            ..ClockingPolicy::default()
        };
        assert!(validate_clocking(&inverted).is_err());

        let overflowing = ClockingPolicy {
            closing_hour: 24,
            ..ClockingPolicy::default()
        };
        assert!(validate_clocking(&overflowing).is_err());
    }

    #[test]
    fn grace_days_are_capped() {
        let month = ClockingPolicy {
            grace_days: MAX_GRACE_DAYS,
            ..ClockingPolicy::default()
        };
        assert!(validate_clocking(&month).is_ok());

        let huge = ClockingPolicy {
            grace_days: u32::MAX,
            ..ClockingPolicy::default()
        };
        assert!(validate_clocking(&huge).is_err());
    }

    #[test]
    fn timezones_are_iana_names() {
        assert_eq!(
            parse_timezone(" America/New_York ").unwrap(),
            chrono_tz::America::New_York
        );
        assert_eq!(parse_timezone("UTC").unwrap(), Tz::UTC);
        assert!(parse_timezone("-05:00").is_err());
        assert!(parse_timezone("Mars/Olympus_Mons").is_err());
    }

    #[test]
    fn unset_keys_use_defaults() {
        let ttl: u64 = or_default("STORE_CLOCK_TEST_SURELY_UNSET", 42).unwrap();
        assert_eq!(ttl, 42);
    }
}
