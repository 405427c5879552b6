//! Platform identifiers.
//!
//! The chat platform hands out 64-bit snowflake ids. They are stored as
//! `BIGINT`, so the inner value is signed; ids above `i64::MAX` are rejected.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Milliseconds between the Unix epoch and the platform epoch (2015-01-01).
pub const PLATFORM_EPOCH_MS: i64 = 1_420_070_400_000;

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Raw integer value.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }

            /// Timestamp embedded in the snowflake.
            #[must_use]
            pub fn created_at(self) -> DateTime<Utc> {
                let ms = (self.0 >> 22) + PLATFORM_EPOCH_MS;
                Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(Error::InvalidId(s.to_string()));
                }
                trimmed
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|_| Error::InvalidId(s.to_string()))
            }
        }
    };
}

snowflake_id!(
    /// A platform user (also identifies the user's guild membership).
    UserId
);
snowflake_id!(
    /// A platform role.
    RoleId
);
snowflake_id!(
    /// A text channel.
    ChannelId
);
snowflake_id!(
    /// A message.
    MessageId
);

impl UserId {
    /// Reinterpret as a delegation source id. Users and roles share one id space.
    #[must_use]
    pub const fn as_source(self) -> i64 {
        self.0
    }
}

impl RoleId {
    /// Reinterpret as a delegation source id. Users and roles share one id space.
    #[must_use]
    pub const fn as_source(self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_digits() {
        let id: UserId = "370876111992913922".parse().unwrap();
        assert_eq!(id.get(), 370_876_111_992_913_922);
    }

    #[test]
    fn rejects_garbage_and_signs() {
        assert!("".parse::<RoleId>().is_err());
        assert!("-5".parse::<RoleId>().is_err());
        assert!("12a".parse::<ChannelId>().is_err());
        assert!("99999999999999999999".parse::<MessageId>().is_err());
    }

    #[test]
    fn snowflake_timestamp_is_after_epoch() {
        let id = UserId(370_876_111_992_913_922);
        let created = id.created_at();
        assert_eq!(created.format("%Y-%m-%d").to_string(), "2017-10-20");
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&RoleId(42)).unwrap();
        assert_eq!(json, "42");
    }
}
