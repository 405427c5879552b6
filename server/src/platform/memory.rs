//! In-memory chat platform.
//!
//! Holds a single guild. Any call can be made to fail through
//! [`InMemoryPlatform::fail`], which is how the test-suite exercises the
//! error paths of commands and background tasks.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use warden_common::{
    BotCapabilities, ChannelId, ChannelInfo, MemberInfo, MessageId, MessageInfo, RoleId,
    RoleInfo, UserId, UserInfo,
};

use super::{Platform, PlatformError};
use crate::reply::Content;

/// Platform call that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    AddRole,
    RemoveRole,
    Kick,
    Ban,
    Unban,
    SendDm,
    Send,
    DeleteMessage,
    RemoveReaction,
}

#[derive(Debug, Clone)]
struct Failure {
    op: Operation,
    /// User, channel or message id the failure is restricted to.
    target: Option<i64>,
    error: PlatformError,
}

#[derive(Debug)]
struct Channel {
    info: ChannelInfo,
    messages: BTreeMap<MessageId, MessageInfo>,
    can_send: bool,
    can_react: bool,
}

#[derive(Debug)]
struct GuildState {
    owner: UserId,
    capabilities: BotCapabilities,
    users: BTreeMap<UserId, UserInfo>,
    members: BTreeMap<UserId, MemberInfo>,
    roles: BTreeMap<RoleId, RoleInfo>,
    bans: BTreeMap<UserId, String>,
    kicks: Vec<(UserId, String)>,
    channels: BTreeMap<ChannelId, Channel>,
    reactions: BTreeMap<(ChannelId, MessageId), Vec<(String, UserId)>>,
    dms: Vec<(UserId, Content)>,
    sent: Vec<(ChannelId, Content)>,
    failures: Vec<Failure>,
    next_id: i64,
}

/// Single-guild platform kept entirely in memory.
#[derive(Debug)]
pub struct InMemoryPlatform {
    guild_id: i64,
    bot: UserInfo,
    state: Mutex<GuildState>,
}

impl InMemoryPlatform {
    #[must_use]
    pub fn new(guild_id: i64, bot: UserInfo, owner: UserId) -> Self {
        let mut state = GuildState {
            owner,
            capabilities: BotCapabilities {
                kick_members: true,
                ban_members: true,
                top_role_position: 100,
            },
            users: BTreeMap::new(),
            members: BTreeMap::new(),
            roles: BTreeMap::new(),
            bans: BTreeMap::new(),
            kicks: Vec::new(),
            channels: BTreeMap::new(),
            reactions: BTreeMap::new(),
            dms: Vec::new(),
            sent: Vec::new(),
            failures: Vec::new(),
            next_id: 1 << 40,
        };
        state.users.insert(bot.id, bot.clone());
        Self {
            guild_id,
            bot,
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, GuildState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- fixture setup ---

    pub fn set_capabilities(&self, capabilities: BotCapabilities) {
        self.state().capabilities = capabilities;
    }

    pub fn add_user(&self, user: UserInfo) {
        self.state().users.insert(user.id, user);
    }

    pub fn add_member(&self, member: MemberInfo) {
        let mut state = self.state();
        state.users.insert(member.id(), member.user.clone());
        state.members.insert(member.id(), member);
    }

    pub fn remove_member(&self, user: UserId) -> Option<MemberInfo> {
        self.state().members.remove(&user)
    }

    pub fn add_role_info(&self, role: RoleInfo) {
        self.state().roles.insert(role.id, role);
    }

    pub fn delete_role(&self, role: RoleId) {
        let mut state = self.state();
        state.roles.remove(&role);
        for member in state.members.values_mut() {
            member.roles.retain(|r| *r != role);
        }
    }

    pub fn add_channel(&self, info: ChannelInfo, can_send: bool, can_react: bool) {
        self.state().channels.insert(
            info.id,
            Channel {
                info,
                messages: BTreeMap::new(),
                can_send,
                can_react,
            },
        );
    }

    pub fn delete_channel(&self, channel: ChannelId) {
        self.state().channels.remove(&channel);
    }

    /// Put a message into a channel's history.
    pub fn post(&self, message: MessageInfo) {
        if let Some(channel) = self.state().channels.get_mut(&message.channel_id) {
            channel.messages.insert(message.id, message);
        }
    }

    /// Record a reaction by a user without going through the command layer.
    pub fn react(&self, channel: ChannelId, message: MessageId, emoji: &str, user: UserId) {
        self.state()
            .reactions
            .entry((channel, message))
            .or_default()
            .push((emoji.to_string(), user));
    }

    /// Make `op` fail with `error`, optionally only for one target id.
    pub fn fail(&self, op: Operation, target: Option<i64>, error: PlatformError) {
        self.state().failures.push(Failure { op, target, error });
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    // --- inspection ---

    #[must_use]
    pub fn member_snapshot(&self, user: UserId) -> Option<MemberInfo> {
        self.state().members.get(&user).cloned()
    }

    #[must_use]
    pub fn is_banned(&self, user: UserId) -> bool {
        self.state().bans.contains_key(&user)
    }

    #[must_use]
    pub fn kicks(&self) -> Vec<(UserId, String)> {
        self.state().kicks.clone()
    }

    #[must_use]
    pub fn dms_to(&self, user: UserId) -> Vec<Content> {
        self.state()
            .dms
            .iter()
            .filter(|(to, _)| *to == user)
            .map(|(_, content)| content.clone())
            .collect()
    }

    #[must_use]
    pub fn sent_to(&self, channel: ChannelId) -> Vec<Content> {
        self.state()
            .sent
            .iter()
            .filter(|(to, _)| *to == channel)
            .map(|(_, content)| content.clone())
            .collect()
    }

    #[must_use]
    pub fn reactions_on(&self, channel: ChannelId, message: MessageId) -> Vec<(String, UserId)> {
        self.state()
            .reactions
            .get(&(channel, message))
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn message_ids(&self, channel: ChannelId) -> Vec<MessageId> {
        self.state()
            .channels
            .get(&channel)
            .map(|c| c.messages.keys().copied().collect())
            .unwrap_or_default()
    }

    fn check(state: &GuildState, op: Operation, target: i64) -> Result<(), PlatformError> {
        state
            .failures
            .iter()
            .find(|f| f.op == op && f.target.map_or(true, |t| t == target))
            .map_or(Ok(()), |f| Err(f.error.clone()))
    }
}

#[async_trait]
impl Platform for InMemoryPlatform {
    fn guild_id(&self) -> i64 {
        self.guild_id
    }

    fn bot_user(&self) -> UserInfo {
        self.bot.clone()
    }

    async fn bot_capabilities(&self) -> Result<BotCapabilities, PlatformError> {
        Ok(self.state().capabilities)
    }

    async fn guild_owner(&self) -> Result<UserId, PlatformError> {
        Ok(self.state().owner)
    }

    async fn member(&self, user: UserId) -> Result<Option<MemberInfo>, PlatformError> {
        Ok(self.state().members.get(&user).cloned())
    }

    async fn members(&self) -> Result<Vec<MemberInfo>, PlatformError> {
        Ok(self.state().members.values().cloned().collect())
    }

    async fn fetch_user(&self, user: UserId) -> Result<Option<UserInfo>, PlatformError> {
        Ok(self.state().users.get(&user).cloned())
    }

    async fn role(&self, role: RoleId) -> Result<Option<RoleInfo>, PlatformError> {
        Ok(self.state().roles.get(&role).cloned())
    }

    async fn add_role(&self, user: UserId, role: RoleId) -> Result<(), PlatformError> {
        let mut state = self.state();
        Self::check(&state, Operation::AddRole, user.get())?;
        if !state.roles.contains_key(&role) {
            return Err(PlatformError::NotFound);
        }
        let member = state.members.get_mut(&user).ok_or(PlatformError::NotFound)?;
        if !member.roles.contains(&role) {
            member.roles.push(role);
        }
        Ok(())
    }

    async fn remove_role(&self, user: UserId, role: RoleId) -> Result<(), PlatformError> {
        let mut state = self.state();
        Self::check(&state, Operation::RemoveRole, user.get())?;
        let member = state.members.get_mut(&user).ok_or(PlatformError::NotFound)?;
        member.roles.retain(|r| *r != role);
        Ok(())
    }

    async fn kick(&self, user: UserId, reason: &str) -> Result<(), PlatformError> {
        let mut state = self.state();
        Self::check(&state, Operation::Kick, user.get())?;
        state.members.remove(&user).ok_or(PlatformError::NotFound)?;
        state.kicks.push((user, reason.to_string()));
        Ok(())
    }

    async fn ban(
        &self,
        user: UserId,
        reason: &str,
        _delete_message_days: u8,
    ) -> Result<(), PlatformError> {
        let mut state = self.state();
        Self::check(&state, Operation::Ban, user.get())?;
        state.members.remove(&user);
        state.bans.insert(user, reason.to_string());
        Ok(())
    }

    async fn unban(&self, user: UserId, _reason: Option<&str>) -> Result<(), PlatformError> {
        let mut state = self.state();
        Self::check(&state, Operation::Unban, user.get())?;
        state
            .bans
            .remove(&user)
            .map(|_| ())
            .ok_or(PlatformError::NotFound)
    }

    async fn send_dm(&self, user: UserId, content: &Content) -> Result<(), PlatformError> {
        let mut state = self.state();
        Self::check(&state, Operation::SendDm, user.get())?;
        if !state.users.contains_key(&user) {
            return Err(PlatformError::NotFound);
        }
        state.dms.push((user, content.clone()));
        Ok(())
    }

    async fn send(
        &self,
        channel: ChannelId,
        content: &Content,
    ) -> Result<MessageId, PlatformError> {
        let mut state = self.state();
        Self::check(&state, Operation::Send, channel.get())?;
        let bot = self.bot.clone();
        state.next_id += 1;
        let id = MessageId(state.next_id);

        let target = state.channels.get_mut(&channel).ok_or(PlatformError::NotFound)?;
        if !target.can_send {
            return Err(PlatformError::Forbidden);
        }
        target.messages.insert(
            id,
            MessageInfo {
                id,
                channel_id: channel,
                author: bot,
                content: content.as_text().unwrap_or_default().to_string(),
                created_at: Utc::now(),
                attachments: Vec::new(),
                in_guild: true,
            },
        );
        state.sent.push((channel, content.clone()));
        Ok(id)
    }

    async fn channel(&self, channel: ChannelId) -> Result<Option<ChannelInfo>, PlatformError> {
        Ok(self.state().channels.get(&channel).map(|c| c.info.clone()))
    }

    async fn text_channels(&self) -> Result<Vec<ChannelInfo>, PlatformError> {
        Ok(self
            .state()
            .channels
            .values()
            .map(|c| c.info.clone())
            .collect())
    }

    async fn can_send(&self, channel: ChannelId) -> Result<bool, PlatformError> {
        Ok(self
            .state()
            .channels
            .get(&channel)
            .is_some_and(|c| c.can_send))
    }

    async fn can_add_reactions(&self, channel: ChannelId) -> Result<bool, PlatformError> {
        Ok(self
            .state()
            .channels
            .get(&channel)
            .is_some_and(|c| c.can_react))
    }

    fn history(
        &self,
        channel: ChannelId,
        oldest_first: bool,
    ) -> BoxStream<'_, Result<MessageInfo, PlatformError>> {
        let state = self.state();
        let Some(target) = state.channels.get(&channel) else {
            return stream::once(async { Err(PlatformError::NotFound) }).boxed();
        };

        let mut messages: Vec<MessageInfo> = target.messages.values().cloned().collect();
        messages.sort_by_key(|m| (m.created_at, m.id));
        if !oldest_first {
            messages.reverse();
        }
        stream::iter(messages.into_iter().map(Ok)).boxed()
    }

    async fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<Option<MessageInfo>, PlatformError> {
        Ok(self
            .state()
            .channels
            .get(&channel)
            .and_then(|c| c.messages.get(&message).cloned()))
    }

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), PlatformError> {
        let mut state = self.state();
        Self::check(&state, Operation::DeleteMessage, message.get())?;
        state
            .channels
            .get_mut(&channel)
            .and_then(|c| c.messages.remove(&message))
            .map(|_| ())
            .ok_or(PlatformError::NotFound)
    }

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.state();
        let exists = state
            .channels
            .get(&channel)
            .is_some_and(|c| c.messages.contains_key(&message));
        if !exists {
            return Err(PlatformError::NotFound);
        }
        let bot = self.bot.id;
        state
            .reactions
            .entry((channel, message))
            .or_default()
            .push((emoji.to_string(), bot));
        Ok(())
    }

    async fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
        user: UserId,
    ) -> Result<(), PlatformError> {
        let mut state = self.state();
        Self::check(&state, Operation::RemoveReaction, user.get())?;
        if let Some(reactions) = state.reactions.get_mut(&(channel, message)) {
            reactions.retain(|(e, u)| !(e == emoji && *u == user));
        }
        Ok(())
    }

    async fn clear_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), PlatformError> {
        if let Some(reactions) = self.state().reactions.get_mut(&(channel, message)) {
            reactions.retain(|(e, _)| e != emoji);
        }
        Ok(())
    }
}

/// Message fixture.
#[must_use]
pub fn message(
    id: i64,
    channel: ChannelId,
    author: &UserInfo,
    content: &str,
    created_at: DateTime<Utc>,
) -> MessageInfo {
    MessageInfo {
        id: MessageId(id),
        channel_id: channel,
        author: author.clone(),
        content: content.to_string(),
        created_at,
        attachments: Vec::new(),
        in_guild: true,
    }
}
