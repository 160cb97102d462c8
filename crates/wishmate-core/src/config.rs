//! Process configuration read from environment variables.
//!
//! Every value has a default. An unparsable or out-of-range value is logged
//! and replaced by its default instead of failing start-up.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::app::ScannerConfig;
use crate::queue::RetryPolicy;

pub const MEMORY_URL: &str = "memory://";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `memory://` selects the in-memory stores.
    pub database_url: String,
    /// `memory://` selects the in-memory broker.
    pub broker_url: String,
    pub scan_interval: Duration,
    /// Bound on each store / broker call.
    pub io_timeout: Duration,
    pub worker_count: usize,
    pub task_max_attempts: u32,
    pub retry_base_delay: Duration,
    /// How long an in-flight scan may keep running after shutdown is requested.
    pub shutdown_grace: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: MEMORY_URL.to_string(),
            broker_url: MEMORY_URL.to_string(),
            scan_interval: Duration::from_secs(60),
            io_timeout: Duration::from_secs(5),
            worker_count: 2,
            task_max_attempts: 5,
            retry_base_delay: Duration::from_secs(2),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration, min: u64| {
            Duration::from_secs(parse_or(&lookup, key, default.as_secs(), min))
        };

        Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            broker_url: lookup("BROKER_URL").unwrap_or(defaults.broker_url),
            scan_interval: secs("SCAN_INTERVAL_SECS", defaults.scan_interval, 1),
            io_timeout: secs("IO_TIMEOUT_SECS", defaults.io_timeout, 1),
            worker_count: parse_or(&lookup, "WORKER_COUNT", defaults.worker_count, 1),
            task_max_attempts: parse_or(&lookup, "TASK_MAX_ATTEMPTS", defaults.task_max_attempts, 1),
            retry_base_delay: secs("RETRY_BASE_DELAY_SECS", defaults.retry_base_delay, 0),
            shutdown_grace: secs("SHUTDOWN_GRACE_SECS", defaults.shutdown_grace, 0),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.task_max_attempts, self.retry_base_delay)
    }

    pub fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig {
            interval: self.scan_interval,
            io_timeout: self.io_timeout,
            align_to_minute: true,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T, min: T) -> T
where
    T: FromStr + PartialOrd + Copy + std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if value >= min => value,
        _ => {
            warn!(key, value = %raw, %default, "invalid configuration value, using the default");
            default
        }
    }
}
