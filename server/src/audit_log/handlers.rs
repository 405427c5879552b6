//! `logging` commands.

use warden_common::ChannelId;

use super::DEFAULT_EDIT_MINDIFF;
use crate::clock::MAX_DAYS;
use crate::commands::Invocation;
use crate::error::CommandError;
use crate::permissions::Permission;
use crate::reply::{colour, Embed, Reply};
use crate::settings;
use crate::state::AppState;

/// A configurable log destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Edit,
    Delete,
    Changelog,
    MemberLeave,
}

impl LogTarget {
    #[must_use]
    pub const fn setting_key(self) -> &'static str {
        match self {
            Self::Edit => settings::LOGGING_EDIT,
            Self::Delete => settings::LOGGING_DELETE,
            Self::Changelog => settings::LOGGING_CHANGELOG,
            Self::MemberLeave => settings::LOGGING_MEMBERLEAVE,
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Edit => "Message edit",
            Self::Delete => "Message delete",
            Self::Changelog => "Changelog",
            Self::MemberLeave => "Member leave",
        }
    }
}

async fn channel_field(state: &AppState, target: LogTarget) -> Result<Option<String>, CommandError> {
    let Some(channel) = settings::get_channel(state.store(), target.setting_key()).await? else {
        return Ok(None);
    };
    Ok(state.platform.channel(channel).await?.map(|c| c.mention()))
}

/// `logging`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn overview(state: &AppState, ctx: &Invocation) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::LogManage).await?;

    let mut embed = Embed::new("Logging", colour::INFO);

    let maxage = settings::get_int(state.store(), settings::LOGGING_MAXAGE, settings::UNSET).await?;
    let maxage = if maxage == settings::UNSET {
        "Disabled".to_string()
    } else {
        format!("{maxage} days")
    };
    embed.field("Maximum age", maxage, false);

    for target in [
        LogTarget::Edit,
        LogTarget::Delete,
        LogTarget::Changelog,
        LogTarget::MemberLeave,
    ] {
        match channel_field(state, target).await? {
            Some(mention) if target == LogTarget::Edit => {
                let mindiff = settings::get_int(
                    state.store(),
                    settings::LOGGING_EDIT_MINDIFF,
                    DEFAULT_EDIT_MINDIFF,
                )
                .await?;
                embed.field(target.title(), mention, true);
                embed.field("Minimum distance", mindiff.to_string(), true);
            }
            Some(mention) => embed.field(target.title(), mention, false),
            None => embed.field(target.title(), "Disabled", false),
        }
    }
    Ok(Reply::embed(embed))
}

/// `logging maxage <days|-1>`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn maxage(state: &AppState, ctx: &Invocation, days: i64) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::LogManage).await?;

    if days != settings::UNSET && !(1..=MAX_DAYS).contains(&days) {
        return Err(CommandError::input("Invalid duration."));
    }
    settings::set_int(state.store(), settings::LOGGING_MAXAGE, days).await?;

    let text = if days == settings::UNSET {
        "Log entries will no longer be deleted automatically.".to_string()
    } else {
        format!("Log entries will now be deleted after {days} days.")
    };
    state.send_to_changelog(text.clone()).await;
    Ok(Reply::text(text))
}

/// `logging edit mindist <n>`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn edit_mindist(
    state: &AppState,
    ctx: &Invocation,
    mindist: i64,
) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::LogManage).await?;

    if mindist <= 0 {
        return Err(CommandError::input(
            "The minimum distance must be greater than zero.",
        ));
    }
    settings::set_int(state.store(), settings::LOGGING_EDIT_MINDIFF, mindist).await?;

    let text = format!("Edits are now logged from an edit distance of {mindist}.");
    state.send_to_changelog(text.clone()).await;
    Ok(Reply::text(text))
}

/// `logging <target> channel <channel>`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn set_channel(
    state: &AppState,
    ctx: &Invocation,
    target: LogTarget,
    channel: ChannelId,
) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::LogManage).await?;

    let info = state
        .platform
        .channel(channel)
        .await?
        .ok_or_else(|| CommandError::input("Channel not found."))?;
    if !state.platform.can_send(channel).await? {
        return Err(CommandError::rejected(
            "Logging channel could not be changed because I cannot send messages there.",
        ));
    }
    settings::set_channel(state.store(), target.setting_key(), Some(channel)).await?;
    tracing::info!(target = target.title(), channel_id = %channel, "Log channel changed");

    let text = format!("{} log channel has been set to {}.", target.title(), info.mention());
    state.send_to_changelog(text.clone()).await;
    Ok(Reply::text(text))
}

/// `logging <target> disable`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn disable(
    state: &AppState,
    ctx: &Invocation,
    target: LogTarget,
) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::LogManage).await?;

    let text = format!("{} logging has been disabled.", target.title());
    if target == LogTarget::Changelog {
        state.send_to_changelog(text.clone()).await;
        settings::set_channel(state.store(), target.setting_key(), None).await?;
    } else {
        settings::set_channel(state.store(), target.setting_key(), None).await?;
        state.send_to_changelog(text.clone()).await;
    }
    Ok(Reply::text(text))
}

// ============================================================================
// Exclusions
// ============================================================================

/// `logging exclude`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn exclude_list(state: &AppState, ctx: &Invocation) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::LogManage).await?;

    let mut lines = Vec::new();
    for channel in state.store.log_excludes().await? {
        match state.platform.channel(channel).await? {
            Some(info) => lines.push(format!(":small_blue_diamond: {}", info.mention())),
            None => {
                state.store.remove_log_exclude(channel).await?;
            }
        }
    }

    let embed = if lines.is_empty() {
        Embed::new("Excluded channels", colour::ERROR).description("No channels are excluded.")
    } else {
        Embed::new("Excluded channels", colour::INFO).description(lines.join("\n"))
    };
    Ok(Reply::embed(embed))
}

/// `logging exclude add <channel>`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn exclude_add(
    state: &AppState,
    ctx: &Invocation,
    channel: ChannelId,
) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::LogManage).await?;

    if state.platform.channel(channel).await?.is_none() {
        return Err(CommandError::input("Channel not found."));
    }
    if !state.store.add_log_exclude(channel).await? {
        return Err(CommandError::rejected("This channel is already excluded."));
    }

    state
        .send_to_changelog(format!("<#{channel}> has been excluded from logging."))
        .await;
    Ok(Reply::text("Channel has been excluded from logging."))
}

/// `logging exclude remove <channel>`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn exclude_remove(
    state: &AppState,
    ctx: &Invocation,
    channel: ChannelId,
) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::LogManage).await?;

    if !state.store.remove_log_exclude(channel).await? {
        return Err(CommandError::rejected("This channel is not excluded."));
    }

    state
        .send_to_changelog(format!("<#{channel}> is no longer excluded from logging."))
        .await;
    Ok(Reply::text("Channel is no longer excluded from logging."))
}
