//! Platform event entry points.
//!
//! Adapters translate gateway events into [`Event`] and hand them to
//! [`handle_event`]. [`EventOutcome::Handled`] means the event was consumed
//! and the adapter must not pass it on to other listeners.

use warden_common::{MemberInfo, MessageInfo, UserInfo};

use crate::audit_log::{self, MessageDelete, MessageEdit};
use crate::db::{AuditEventKind, StoreError};
use crate::inactivity;
use crate::moderation::reapply_mute_on_join;
use crate::observability::report_error;
use crate::platform::PlatformError;
use crate::reaction_roles::{self, ReactionEvent};
use crate::roles::autorole;
use crate::state::AppState;

/// Failure inside an event handler.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Whether later handlers should still see an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Continue,
    Handled,
}

/// Events the core reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    MemberJoin(MemberInfo),
    MemberLeave(UserInfo),
    MemberUpdate {
        before: MemberInfo,
        after: MemberInfo,
    },
    UserUpdate {
        before: UserInfo,
        after: UserInfo,
    },
    Message(MessageInfo),
    MessageEdit(MessageEdit),
    MessageDelete(MessageDelete),
    ReactionAdd(ReactionEvent),
    ReactionRemove(ReactionEvent),
}

impl Event {
    const fn name(&self) -> &'static str {
        match self {
            Self::MemberJoin(_) => "member_join",
            Self::MemberLeave(_) => "member_leave",
            Self::MemberUpdate { .. } => "member_update",
            Self::UserUpdate { .. } => "user_update",
            Self::Message(_) => "message",
            Self::MessageEdit(_) => "message_edit",
            Self::MessageDelete(_) => "message_delete",
            Self::ReactionAdd(_) => "reaction_add",
            Self::ReactionRemove(_) => "reaction_remove",
        }
    }
}

/// Run every handler for `event`. Failures are reported and never
/// propagate to the adapter.
pub async fn handle_event(state: &AppState, event: &Event) -> EventOutcome {
    match dispatch(state, event).await {
        Ok(outcome) => outcome,
        Err(err) => {
            report_error(event.name(), &err);
            EventOutcome::Continue
        }
    }
}

async fn dispatch(state: &AppState, event: &Event) -> Result<EventOutcome, EventError> {
    match event {
        Event::MemberJoin(member) => on_member_join(state, member).await?,
        Event::MemberLeave(user) => on_member_leave(state, user).await?,
        Event::MemberUpdate { before, after } => on_member_update(state, before, after).await?,
        Event::UserUpdate { before, after } => on_user_update(state, before, after).await?,
        Event::Message(message) => inactivity::on_message(state, message).await?,
        Event::MessageEdit(edit) => audit_log::on_message_edit(state, edit).await?,
        Event::MessageDelete(deletion) => audit_log::on_message_delete(state, deletion).await?,
        Event::ReactionAdd(reaction) => {
            return reaction_roles::on_reaction_add(state, reaction).await;
        }
        Event::ReactionRemove(reaction) => {
            return reaction_roles::on_reaction_remove(state, reaction).await;
        }
    }
    Ok(EventOutcome::Continue)
}

// ============================================================================
// Members
// ============================================================================

#[tracing::instrument(skip(state, member), fields(user_id = %member.id()))]
async fn on_member_join(state: &AppState, member: &MemberInfo) -> Result<(), EventError> {
    state
        .store
        .append_event(member.id(), &member.user.name, AuditEventKind::Join, state.now())
        .await?;

    if let Err(err) = autorole::grant_on_join(state, member).await {
        report_error("autorole", &err);
    }
    if let Err(err) = reapply_mute_on_join(state, member).await {
        report_error("mute on join", &err);
    }
    Ok(())
}

#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
async fn on_member_leave(state: &AppState, user: &UserInfo) -> Result<(), EventError> {
    state
        .store
        .append_event(user.id, &user.name, AuditEventKind::Leave, state.now())
        .await?;
    audit_log::on_member_leave(state, user).await
}

async fn on_member_update(
    state: &AppState,
    before: &MemberInfo,
    after: &MemberInfo,
) -> Result<(), EventError> {
    if before.nick == after.nick {
        return Ok(());
    }
    state
        .store
        .append_event(
            after.id(),
            &after.user.name,
            AuditEventKind::UsernameUpdate {
                old_name: before.nick.clone(),
                new_name: after.nick.clone(),
                is_nick: true,
            },
            state.now(),
        )
        .await?;
    Ok(())
}

async fn on_user_update(
    state: &AppState,
    before: &UserInfo,
    after: &UserInfo,
) -> Result<(), EventError> {
    if before.name == after.name {
        return Ok(());
    }
    state
        .store
        .append_event(
            after.id,
            &after.name,
            AuditEventKind::UsernameUpdate {
                old_name: Some(before.name.clone()),
                new_name: Some(after.name.clone()),
                is_nick: false,
            },
            state.now(),
        )
        .await?;
    Ok(())
}
