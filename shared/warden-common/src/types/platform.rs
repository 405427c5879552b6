//! Platform Entity Snapshots
//!
//! Read-only views of platform objects as handed over by an adapter. The core
//! never caches these across reconciliation windows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ChannelId, MessageId, RoleId, UserId};

/// A platform account, whether or not it is a guild member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: UserId,
    /// Full account name, e.g. `alice#0001`.
    pub name: String,
    pub bot: bool,
}

impl UserInfo {
    /// Mention markup for this user.
    #[must_use]
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// A guild member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub user: UserInfo,
    pub nick: Option<String>,
    pub roles: Vec<RoleId>,
    /// Native administrator flag from the platform's permission system.
    pub administrator: bool,
    /// Position of the member's highest role (higher = more powerful).
    pub top_role_position: i32,
    pub joined_at: Option<DateTime<Utc>>,
}

impl MemberInfo {
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.user.id
    }

    #[must_use]
    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }
}

/// A guild role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleInfo {
    pub id: RoleId,
    pub name: String,
    pub position: i32,
    /// Owned by an integration; cannot be assigned manually.
    pub managed: bool,
    /// The implicit `@everyone` role.
    pub is_default: bool,
}

impl RoleInfo {
    #[must_use]
    pub fn mention(&self) -> String {
        format!("<@&{}>", self.id)
    }
}

/// A guild text channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
}

impl ChannelInfo {
    #[must_use]
    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }
}

/// File attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub size: u64,
}

/// A message as seen by event handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInfo {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author: UserInfo,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub attachments: Vec<Attachment>,
    /// `false` for direct messages.
    pub in_guild: bool,
}

impl MessageInfo {
    /// Link to the message inside the guild.
    #[must_use]
    pub fn jump_url(&self, guild_id: i64) -> String {
        format!(
            "https://discord.com/channels/{guild_id}/{}/{}",
            self.channel_id, self.id
        )
    }
}

/// Capabilities the bot itself holds in the guild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotCapabilities {
    pub kick_members: bool,
    pub ban_members: bool,
    /// Position of the bot's highest role.
    pub top_role_position: i32,
}
