//! `reactionrole` commands.

use std::collections::BTreeMap;

use warden_common::{ChannelId, MessageId, RoleId, RoleInfo};

use crate::commands::Invocation;
use crate::db::{ReactionKey, ReactionRoleLink};
use crate::error::CommandError;
use crate::permissions::Permission;
use crate::platform::PlatformError;
use crate::reply::Reply;
use crate::state::AppState;

/// Arguments of `reactionrole add`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLink {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub emoji: String,
    pub role_id: RoleId,
    pub reverse: bool,
    pub auto_remove: bool,
}

/// `reactionrole add <message> <emoji> <role> <reverse> <auto_remove>`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn add(state: &AppState, ctx: &Invocation, new: NewLink) -> Result<Reply, CommandError> {
    state
        .require(ctx.author.id, Permission::ManageReactionRoles)
        .await?;

    let message = state
        .platform
        .fetch_message(new.channel_id, new.message_id)
        .await?
        .ok_or_else(|| CommandError::input("Message not found."))?;
    let key = ReactionKey {
        channel_id: new.channel_id,
        message_id: new.message_id,
        emoji: new.emoji.clone(),
    };

    if state.store.reaction_role(&key).await?.is_some() {
        return Err(CommandError::rejected(
            "A link for this emoji on this message already exists.",
        ));
    }
    if !state.platform.can_add_reactions(new.channel_id).await? {
        return Err(CommandError::rejected(
            "Link could not be created because I cannot add reactions to that message.",
        ));
    }

    let role = state
        .platform
        .role(new.role_id)
        .await?
        .ok_or_else(|| CommandError::input("Role not found."))?;
    let capabilities = state.platform.bot_capabilities().await?;
    if role.position >= capabilities.top_role_position {
        return Err(CommandError::rejected(format!(
            "Link could not be created because {} is not below my highest role.",
            role.mention()
        )));
    }
    if role.managed || role.is_default {
        return Err(CommandError::rejected(format!(
            "Link could not be created because {} cannot be assigned manually.",
            role.mention()
        )));
    }

    if !state
        .store
        .insert_reaction_role(ReactionRoleLink {
            key,
            role_id: role.id,
            reverse: new.reverse,
            auto_remove: new.auto_remove,
        })
        .await?
    {
        return Err(CommandError::rejected(
            "A link for this emoji on this message already exists.",
        ));
    }
    state
        .platform
        .add_reaction(new.channel_id, new.message_id, &new.emoji)
        .await?;
    tracing::info!(role_id = %role.id, emoji = %new.emoji, "Reaction role link created");

    state
        .send_to_changelog(format!(
            "Reaction role link created: {} -> {} on {}",
            new.emoji,
            role.mention(),
            message.jump_url(state.platform.guild_id())
        ))
        .await;
    Ok(Reply::text("Reaction role link has been created."))
}

/// `reactionrole remove <message> <emoji>`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn remove(
    state: &AppState,
    ctx: &Invocation,
    key: ReactionKey,
) -> Result<Reply, CommandError> {
    state
        .require(ctx.author.id, Permission::ManageReactionRoles)
        .await?;

    if !state.store.delete_reaction_role(&key).await? {
        return Err(CommandError::rejected("Link not found."));
    }
    match state
        .platform
        .clear_reaction(key.channel_id, key.message_id, &key.emoji)
        .await
    {
        Ok(()) | Err(PlatformError::NotFound) => {}
        Err(err) => return Err(err.into()),
    }
    tracing::info!(message_id = %key.message_id, emoji = %key.emoji, "Reaction role link removed");

    state
        .send_to_changelog(format!(
            "Reaction role link removed: {} on message {} in <#{}>",
            key.emoji, key.message_id, key.channel_id
        ))
        .await;
    Ok(Reply::text("Reaction role link has been removed."))
}

/// Jump url and role of a link, or `None` once its channel, message or role
/// is gone.
async fn resolve_link(
    state: &AppState,
    link: &ReactionRoleLink,
) -> Result<Option<(String, RoleInfo)>, CommandError> {
    let key = &link.key;
    if state.platform.channel(key.channel_id).await?.is_none() {
        return Ok(None);
    }
    let Some(message) = state
        .platform
        .fetch_message(key.channel_id, key.message_id)
        .await?
    else {
        return Ok(None);
    };
    let Some(role) = state.platform.role(link.role_id).await? else {
        return Ok(None);
    };
    Ok(Some((message.jump_url(state.platform.guild_id()), role)))
}

/// `reactionrole list [message]`
///
/// Links whose channel, message or role vanished are deleted while listing.
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn list(
    state: &AppState,
    ctx: &Invocation,
    message: Option<(ChannelId, MessageId)>,
) -> Result<Reply, CommandError> {
    state
        .require(ctx.author.id, Permission::ManageReactionRoles)
        .await?;

    let links = state.store.reaction_roles(message).await?;

    if message.is_some() {
        let mut lines = Vec::new();
        for link in links {
            let Some((_, role)) = resolve_link(state, &link).await? else {
                state.store.delete_reaction_role(&link.key).await?;
                continue;
            };
            let mut line = format!("{} -> `@{}`", link.key.emoji, role.name);
            let flags: Vec<&str> = [
                link.reverse.then_some("reversed"),
                link.auto_remove.then_some("auto remove"),
            ]
            .into_iter()
            .flatten()
            .collect();
            if !flags.is_empty() {
                line.push_str(&format!(" ({})", flags.join(", ")));
            }
            lines.push(line);
        }
        return Ok(Reply::text(if lines.is_empty() {
            "No reaction role links for this message.".to_string()
        } else {
            lines.join("\n")
        }));
    }

    let mut channels: BTreeMap<ChannelId, BTreeMap<String, Vec<String>>> = BTreeMap::new();
    for link in links {
        let Some((url, _)) = resolve_link(state, &link).await? else {
            state.store.delete_reaction_role(&link.key).await?;
            continue;
        };
        channels
            .entry(link.key.channel_id)
            .or_default()
            .entry(url)
            .or_default()
            .push(link.key.emoji);
    }

    if channels.is_empty() {
        return Ok(Reply::text("No reaction role links have been created."));
    }
    let sections: Vec<String> = channels
        .into_iter()
        .map(|(channel, messages)| {
            let lines: Vec<String> = messages
                .into_iter()
                .map(|(url, emojis)| format!("{url} {}", emojis.join(" ")))
                .collect();
            format!("<#{channel}>:\n{}", lines.join("\n"))
        })
        .collect();
    Ok(Reply::text(sections.join("\n\n")))
}
