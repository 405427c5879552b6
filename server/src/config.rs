//! Bot Configuration
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use warden_common::UserId;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Bot configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// The single account that always resolves to the OWNER level.
    pub owner_id: UserId,

    /// `PostgreSQL` connection URL. The in-memory store is used when unset.
    pub database_url: Option<String>,

    /// Interval between sanction expiry scans (default: 1800 = 30 min)
    pub sanction_scan_interval: Duration,

    /// Interval between audit log retention passes (default: 1800 = 30 min)
    pub log_cleanup_interval: Duration,

    /// Maximum number of message ids held in the ignored-message cache
    pub ignored_message_capacity: usize,

    /// How long an ignored message id stays in the cache (default: 600 = 10 min)
    pub ignored_message_ttl: Duration,

    /// Log output format (`LOG_FORMAT=pretty` for human-readable output)
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let owner_id = env::var("OWNER_ID")
            .context("OWNER_ID must be set")?
            .parse::<UserId>()
            .context("OWNER_ID must be a numeric platform id")?;

        Ok(Self {
            owner_id,
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            sanction_scan_interval: Duration::from_secs(parse_or(
                "SANCTION_SCAN_INTERVAL_SECS",
                1800,
            )),
            log_cleanup_interval: Duration::from_secs(parse_or("LOG_CLEANUP_INTERVAL_SECS", 1800)),
            ignored_message_capacity: parse_or("IGNORED_MESSAGE_CAPACITY", 1024),
            ignored_message_ttl: Duration::from_secs(parse_or("IGNORED_MESSAGE_TTL_SECS", 600)),
            log_format: match env::var("LOG_FORMAT").as_deref() {
                Ok("pretty") => LogFormat::Pretty,
                _ => LogFormat::Json,
            },
        })
    }

    /// Create a default configuration for testing.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            owner_id: UserId(370_876_111_992_913_922),
            database_url: None,
            sanction_scan_interval: Duration::from_secs(1800),
            log_cleanup_interval: Duration::from_secs(1800),
            ignored_message_capacity: 1024,
            ignored_message_ttl: Duration::from_secs(600),
            log_format: LogFormat::Pretty,
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
