//! Chat Platform Interface
//!
//! Everything the core needs from the chat platform. Adapters implement
//! [`Platform`]; [`memory::InMemoryPlatform`] is a self-contained
//! implementation for tests and local runs.

pub mod memory;

use async_trait::async_trait;
use futures::stream::BoxStream;
use warden_common::{
    BotCapabilities, ChannelId, ChannelInfo, MemberInfo, MessageId, MessageInfo, RoleId,
    RoleInfo, UserId, UserInfo,
};

use crate::reply::Content;

/// Failures reported by the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// The bot lacks the permission for this call.
    #[error("Forbidden")]
    Forbidden,

    /// The target object does not exist (anymore).
    #[error("Not found")]
    NotFound,

    /// Any other transport or API failure.
    #[error("HTTP error: {0}")]
    Http(String),
}

impl PlatformError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// The chat platform, scoped to the single guild the bot manages.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Id of the managed guild.
    fn guild_id(&self) -> i64;

    /// The bot's own account.
    fn bot_user(&self) -> UserInfo;

    async fn bot_capabilities(&self) -> Result<BotCapabilities, PlatformError>;

    async fn guild_owner(&self) -> Result<UserId, PlatformError>;

    // --- members and users ---

    async fn member(&self, user: UserId) -> Result<Option<MemberInfo>, PlatformError>;

    async fn members(&self) -> Result<Vec<MemberInfo>, PlatformError>;

    async fn fetch_user(&self, user: UserId) -> Result<Option<UserInfo>, PlatformError>;

    // --- roles ---

    async fn role(&self, role: RoleId) -> Result<Option<RoleInfo>, PlatformError>;

    async fn add_role(&self, user: UserId, role: RoleId) -> Result<(), PlatformError>;

    async fn remove_role(&self, user: UserId, role: RoleId) -> Result<(), PlatformError>;

    // --- sanctions ---

    async fn kick(&self, user: UserId, reason: &str) -> Result<(), PlatformError>;

    async fn ban(
        &self,
        user: UserId,
        reason: &str,
        delete_message_days: u8,
    ) -> Result<(), PlatformError>;

    async fn unban(&self, user: UserId, reason: Option<&str>) -> Result<(), PlatformError>;

    // --- messaging ---

    async fn send_dm(&self, user: UserId, content: &Content) -> Result<(), PlatformError>;

    async fn send(&self, channel: ChannelId, content: &Content)
        -> Result<MessageId, PlatformError>;

    async fn channel(&self, channel: ChannelId) -> Result<Option<ChannelInfo>, PlatformError>;

    async fn text_channels(&self) -> Result<Vec<ChannelInfo>, PlatformError>;

    /// Whether the bot may post in the channel.
    async fn can_send(&self, channel: ChannelId) -> Result<bool, PlatformError>;

    /// Whether the bot may add reactions in the channel.
    async fn can_add_reactions(&self, channel: ChannelId) -> Result<bool, PlatformError>;

    /// Iterate a channel's history.
    fn history(
        &self,
        channel: ChannelId,
        oldest_first: bool,
    ) -> BoxStream<'_, Result<MessageInfo, PlatformError>>;

    async fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<Option<MessageInfo>, PlatformError>;

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), PlatformError>;

    // --- reactions ---

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), PlatformError>;

    async fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
        user: UserId,
    ) -> Result<(), PlatformError>;

    async fn clear_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), PlatformError>;
}
