//! Reaction roles
//!
//! A link maps `(channel, message, emoji)` to a role. Reacting grants the
//! role (or removes it for `reverse` links); removing the reaction undoes
//! that unless the link is `auto_remove`, in which case the reaction is
//! stripped right after the grant.

pub mod handlers;

use warden_common::{ChannelId, MessageId, RoleInfo, UserInfo};

use crate::db::{ReactionKey, ReactionRoleLink};
use crate::events::{EventError, EventOutcome};
use crate::platform::PlatformError;
use crate::state::AppState;

/// A reaction added or removed by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub emoji: String,
    pub user: UserInfo,
    pub in_guild: bool,
}

impl ReactionEvent {
    #[must_use]
    pub fn key(&self) -> ReactionKey {
        ReactionKey {
            channel_id: self.channel_id,
            message_id: self.message_id,
            emoji: self.emoji.clone(),
        }
    }
}

/// The link for a reaction, if it exists and its role still exists.
async fn lookup(
    state: &AppState,
    key: &ReactionKey,
) -> Result<Option<(ReactionRoleLink, RoleInfo)>, EventError> {
    let Some(link) = state.store.reaction_role(key).await? else {
        return Ok(None);
    };
    Ok(state
        .platform
        .role(link.role_id)
        .await?
        .map(|role| (link, role)))
}

fn swallow_not_found(result: Result<(), PlatformError>) -> Result<bool, EventError> {
    match result {
        Ok(()) => Ok(true),
        Err(PlatformError::NotFound) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// Handle a reaction being added.
#[tracing::instrument(skip(state, event), fields(user_id = %event.user.id, message_id = %event.message_id))]
pub async fn on_reaction_add(
    state: &AppState,
    event: &ReactionEvent,
) -> Result<EventOutcome, EventError> {
    if event.user.bot || !event.in_guild {
        return Ok(EventOutcome::Continue);
    }
    let Some((link, role)) = lookup(state, &event.key()).await? else {
        return Ok(EventOutcome::Continue);
    };

    let applied = if link.reverse {
        state.platform.remove_role(event.user.id, role.id).await
    } else {
        state.platform.add_role(event.user.id, role.id).await
    };
    if swallow_not_found(applied)? && link.auto_remove {
        swallow_not_found(
            state
                .platform
                .remove_reaction(event.channel_id, event.message_id, &event.emoji, event.user.id)
                .await,
        )?;
    }
    Ok(EventOutcome::Handled)
}

/// Handle a reaction being removed. `auto_remove` links ignore this.
#[tracing::instrument(skip(state, event), fields(user_id = %event.user.id, message_id = %event.message_id))]
pub async fn on_reaction_remove(
    state: &AppState,
    event: &ReactionEvent,
) -> Result<EventOutcome, EventError> {
    if event.user.bot || !event.in_guild {
        return Ok(EventOutcome::Continue);
    }
    let Some((link, role)) = lookup(state, &event.key()).await? else {
        return Ok(EventOutcome::Continue);
    };
    if link.auto_remove {
        return Ok(EventOutcome::Continue);
    }

    let reverted = if link.reverse {
        state.platform.add_role(event.user.id, role.id).await
    } else {
        state.platform.remove_role(event.user.id, role.id).await
    };
    swallow_not_found(reverted)?;
    Ok(EventOutcome::Handled)
}
