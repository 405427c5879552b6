//! Moderation Types

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use validator::Validate;
use warden_common::UserId;

use crate::clock::MAX_DAYS;
use crate::db::PERMANENT_DAYS;

static DURATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)d?$").expect("valid regex"));

// ============================================================================
// Duration
// ============================================================================

/// Length of a mute or ban.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanctionDuration {
    /// Whole days, `0 < days <= MAX_DAYS`.
    Days(u32),
    Permanent,
}

impl SanctionDuration {
    /// Stored representation, `-1` for permanent.
    #[must_use]
    pub const fn as_days(self) -> i32 {
        match self {
            Self::Days(days) => days as i32,
            Self::Permanent => PERMANENT_DAYS,
        }
    }
}

impl fmt::Display for SanctionDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Days(1) => f.write_str("1 day"),
            Self::Days(days) => write!(f, "{days} days"),
            Self::Permanent => f.write_str("permanently"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    #[error("Invalid duration. Use a number of days or `inf`.")]
    Invalid,

    #[error("Duration is too long. Use `inf` for a permanent sanction.")]
    TooLong,
}

impl FromStr for SanctionDuration {
    type Err = DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if matches!(
            s.to_lowercase().as_str(),
            "inf" | "perm" | "permanent" | "-1" | "∞"
        ) {
            return Ok(Self::Permanent);
        }

        let captures = DURATION_REGEX.captures(s).ok_or(DurationError::Invalid)?;
        let digits = &captures[1];
        // Anything that does not fit into 64 bits is certainly too long
        let days: u64 = digits.parse().map_err(|_| DurationError::TooLong)?;
        if days == 0 {
            return Err(DurationError::Invalid);
        }
        if days > MAX_DAYS as u64 {
            return Err(DurationError::TooLong);
        }
        Ok(Self::Days(days as u32))
    }
}

// ============================================================================
// Request Types
// ============================================================================

/// Arguments of `warn`, `kick`, `unmute`, `unban` and `report`.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct ModerationRequest {
    pub subject: UserId,
    #[validate(length(
        min = 1,
        max = 900,
        message = "Reason must be between 1 and 900 characters long."
    ))]
    pub reason: String,
}

impl ModerationRequest {
    pub fn new(subject: UserId, reason: impl Into<String>) -> Self {
        Self {
            subject,
            reason: reason.into(),
        }
    }
}

/// Arguments of `mute` and `ban`.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct SanctionRequest {
    pub subject: UserId,
    pub duration: SanctionDuration,
    #[validate(length(
        min = 1,
        max = 900,
        message = "Reason must be between 1 and 900 characters long."
    ))]
    pub reason: String,
}

impl SanctionRequest {
    pub fn new(subject: UserId, duration: SanctionDuration, reason: impl Into<String>) -> Self {
        Self {
            subject,
            duration,
            reason: reason.into(),
        }
    }
}
