//! Role levels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Totally ordered authorization tier.
///
/// A subject at level `L` may exercise every permission whose resolved
/// minimum is `<= L`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleLevel {
    Public = 0,
    HeadAssistant = 1,
    Head = 2,
    Administrator = 3,
    /// Reserved for the configured owner identity.
    Owner = 4,
}

impl RoleLevel {
    /// All levels, lowest first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Public,
            Self::HeadAssistant,
            Self::Head,
            Self::Administrator,
            Self::Owner,
        ]
    }

    #[must_use]
    pub const fn as_i16(self) -> i16 {
        self as i16
    }

    #[must_use]
    pub const fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::Public),
            1 => Some(Self::HeadAssistant),
            2 => Some(Self::Head),
            3 => Some(Self::Administrator),
            4 => Some(Self::Owner),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::HeadAssistant => "HEAD_ASSISTANT",
            Self::Head => "HEAD",
            Self::Administrator => "ADMINISTRATOR",
            Self::Owner => "OWNER",
        }
    }
}

impl fmt::Display for RoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid permission level: {0}")]
pub struct InvalidLevel(pub String);

/// Parses a level argument. OWNER is not assignable and is rejected.
impl FromStr for RoleLevel {
    type Err = InvalidLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "administrator" | "admin" | "a" => Ok(Self::Administrator),
            "head" | "h" => Ok(Self::Head),
            "head_assistant" | "headassistant" | "ha" => Ok(Self::HeadAssistant),
            "public" | "p" => Ok(Self::Public),
            _ => Err(InvalidLevel(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_totally_ordered() {
        let all = RoleLevel::all();
        for pair in all.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn aliases_parse() {
        assert_eq!("A".parse::<RoleLevel>(), Ok(RoleLevel::Administrator));
        assert_eq!("head".parse::<RoleLevel>(), Ok(RoleLevel::Head));
        assert_eq!("ha".parse::<RoleLevel>(), Ok(RoleLevel::HeadAssistant));
        assert_eq!("headassistant".parse::<RoleLevel>(), Ok(RoleLevel::HeadAssistant));
        assert_eq!("p".parse::<RoleLevel>(), Ok(RoleLevel::Public));
    }

    #[test]
    fn owner_is_not_assignable() {
        assert!("owner".parse::<RoleLevel>().is_err());
        assert!("everyone".parse::<RoleLevel>().is_err());
    }

    #[test]
    fn i16_round_trip() {
        for level in RoleLevel::all() {
            assert_eq!(RoleLevel::from_i16(level.as_i16()), Some(*level));
        }
        assert_eq!(RoleLevel::from_i16(9), None);
    }
}
