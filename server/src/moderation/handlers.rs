//! Moderation command handlers.
//!
//! Every handler checks its permission first, validates its arguments and
//! only then touches the platform or the store. Sanction state changes run
//! under the subject lock of their kind.

use validator::Validate;
use warden_common::{MemberInfo, RoleId, UserId};

use super::lifecycle::mute_role;
use super::subject::{resolve_subject, Subject};
use super::types::{ModerationRequest, SanctionDuration, SanctionRequest};
use crate::commands::Invocation;
use crate::db::{AuditEventKind, NewSanction, SanctionKind};
use crate::error::CommandError;
use crate::permissions::Permission;
use crate::platform::PlatformError;
use crate::reply::{colour, Content, Embed, Reply};
use crate::state::AppState;

/// Messages of `ban` that are removed along with the member.
const BAN_DELETE_MESSAGE_DAYS: u8 = 1;

// ============================================================================
// Helpers
// ============================================================================

/// Resolve a subject, rejecting ids the platform does not know.
async fn resolve_known(state: &AppState, id: UserId) -> Result<Subject, CommandError> {
    let subject = resolve_subject(state.platform.as_ref(), id).await?;
    if subject.is_resolved() {
        Ok(subject)
    } else {
        Err(CommandError::rejected("User not found."))
    }
}

/// Reject the bot itself and members holding a team or staff role.
async fn ensure_sanctionable(
    state: &AppState,
    subject: &Subject,
    action: &str,
) -> Result<(), CommandError> {
    if subject.id() == state.platform.bot_user().id {
        return Err(CommandError::rejected(format!("You cannot {action} the bot.")));
    }
    if let Some(member) = subject.as_member() {
        if state.is_team_member(member).await? {
            return Err(CommandError::rejected(format!(
                "You cannot {action} a team member."
            )));
        }
    }
    Ok(())
}

/// Reject members the bot cannot act on: the guild owner and anyone whose
/// top role is not below the bot's.
async fn ensure_below_bot(
    state: &AppState,
    member: &MemberInfo,
    bot_top_role: i32,
    action: &str,
) -> Result<(), CommandError> {
    let owner = state.platform.guild_owner().await?;
    if member.id() == owner || member.top_role_position >= bot_top_role {
        return Err(CommandError::rejected(format!(
            "You cannot {action} this member."
        )));
    }
    Ok(())
}

/// DM a subject, returning a notice for the channel if that fails.
async fn notify(state: &AppState, subject: &Subject, embed: Embed) -> Option<String> {
    match state
        .platform
        .send_dm(subject.id(), &Content::from(embed))
        .await
    {
        Ok(()) => None,
        Err(err) => {
            tracing::debug!(user_id = %subject.id(), error = %err, "Could not send DM");
            Some(format!(
                "I could not send a DM to {}, so they were not notified.",
                subject.mention()
            ))
        }
    }
}

fn dm(title: &str, description: String, reason: &str) -> Embed {
    let mut embed = Embed::new(title, colour::ERROR).description(description);
    embed.field("Reason", reason, false);
    embed
}

fn confirmation(title: &str, description: String, reason: &str, notices: Vec<String>) -> Reply {
    let mut embed = Embed::new(title, colour::SUCCESS).description(description);
    embed.field("Reason", reason, false);
    Reply::embed(embed).with_notices(notices)
}

async fn require_mute_role(state: &AppState) -> Result<RoleId, CommandError> {
    mute_role(state)
        .await?
        .ok_or_else(|| CommandError::rejected("The mute role has not been set."))
}

// ============================================================================
// Warn / Report
// ============================================================================

/// `warn <user> <reason>`
#[tracing::instrument(skip(state, ctx, request), fields(user_id = %ctx.author.id, subject = %request.subject))]
pub async fn warn(
    state: &AppState,
    ctx: &Invocation,
    request: ModerationRequest,
) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::Warn).await?;
    request.validate()?;

    let subject = resolve_known(state, request.subject).await?;
    if subject.id() == state.platform.bot_user().id {
        return Err(CommandError::rejected("You cannot warn the bot."));
    }

    let notice = notify(
        state,
        &subject,
        dm("Warn", "You have been warned on this server.".into(), &request.reason),
    )
    .await;

    state
        .store
        .append_event(
            subject.id(),
            &subject.name(),
            AuditEventKind::Warn {
                moderator: ctx.author.id,
                reason: request.reason.clone(),
            },
            state.now(),
        )
        .await?;
    tracing::info!("Member warned");

    state
        .send_to_changelog(format!(
            "{} has been warned by {}. Reason: {}",
            subject.mention(),
            ctx.author.mention(),
            request.reason
        ))
        .await;
    Ok(confirmation(
        "Warn",
        format!("{} has been warned.", subject.mention()),
        &request.reason,
        notice.into_iter().collect(),
    ))
}

/// `report <user> <reason>`, open to everyone.
#[tracing::instrument(skip(state, ctx, request), fields(user_id = %ctx.author.id, subject = %request.subject))]
pub async fn report(
    state: &AppState,
    ctx: &Invocation,
    request: ModerationRequest,
) -> Result<Reply, CommandError> {
    request.validate()?;

    let subject = resolve_known(state, request.subject).await?;
    if subject.id() == state.platform.bot_user().id {
        return Err(CommandError::rejected("You cannot report the bot."));
    }

    state
        .store
        .append_event(
            subject.id(),
            &subject.name(),
            AuditEventKind::Report {
                reporter: ctx.author.id,
                reason: request.reason.clone(),
            },
            state.now(),
        )
        .await?;

    state
        .send_to_changelog(format!(
            "{} has been reported by {}. Reason: {}",
            subject.mention(),
            ctx.author.mention(),
            request.reason
        ))
        .await;
    Ok(Reply::text("Thank you, your report has been recorded."))
}

// ============================================================================
// Mute
// ============================================================================

/// `mute <user> <days|inf> <reason>`
#[tracing::instrument(skip(state, ctx, request), fields(user_id = %ctx.author.id, subject = %request.subject))]
pub async fn mute(
    state: &AppState,
    ctx: &Invocation,
    request: SanctionRequest,
) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::Mute).await?;
    request.validate()?;

    let role = require_mute_role(state).await?;
    let subject = resolve_known(state, request.subject).await?;
    ensure_sanctionable(state, &subject, "mute").await?;

    let _guard = state.locks.lock(SanctionKind::Mute, subject.id()).await;

    let already_muted = state
        .store
        .find_active_sanction(SanctionKind::Mute, subject.id())
        .await?
        .is_some()
        || subject.as_member().is_some_and(|m| m.has_role(role));
    if already_muted {
        return Err(CommandError::rejected("User is already muted."));
    }

    if subject.as_member().is_some() {
        state.platform.add_role(subject.id(), role).await?;
    }

    let notice = notify(
        state,
        &subject,
        dm(
            "Mute",
            format!("You have been muted on this server {}.", describe(request.duration)),
            &request.reason,
        ),
    )
    .await;

    let created = state
        .store
        .create_sanction(NewSanction {
            kind: SanctionKind::Mute,
            subject_id: subject.id(),
            subject_name: subject.name(),
            moderator_id: ctx.author.id,
            reason: request.reason.clone(),
            days: request.duration.as_days(),
            created_at: state.now(),
        })
        .await;
    let sanction = match created {
        Ok(sanction) => sanction,
        Err(err) => {
            if subject.as_member().is_some() {
                let rollback = state.platform.remove_role(subject.id(), role).await;
                log_rollback("mute", subject.id(), &rollback);
            }
            return Err(err.into());
        }
    };
    tracing::info!(sanction_id = %sanction.id, days = sanction.days, "Member muted");

    state
        .send_to_changelog(format!(
            "{} has been muted {} by {}. Reason: {}",
            subject.mention(),
            describe(request.duration),
            ctx.author.mention(),
            request.reason
        ))
        .await;
    Ok(confirmation(
        "Mute",
        format!("{} has been muted {}.", subject.mention(), describe(request.duration)),
        &request.reason,
        notice.into_iter().collect(),
    ))
}

/// `unmute <user> <reason>`
#[tracing::instrument(skip(state, ctx, request), fields(user_id = %ctx.author.id, subject = %request.subject))]
pub async fn unmute(
    state: &AppState,
    ctx: &Invocation,
    request: ModerationRequest,
) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::Mute).await?;
    request.validate()?;

    let role = require_mute_role(state).await?;
    let subject = resolve_subject(state.platform.as_ref(), request.subject).await?;

    let _guard = state.locks.lock(SanctionKind::Mute, subject.id()).await;

    let mut was_muted = false;
    if subject.as_member().is_some_and(|m| m.has_role(role)) {
        match state.platform.remove_role(subject.id(), role).await {
            Ok(()) | Err(PlatformError::NotFound) => was_muted = true,
            Err(err) => return Err(err.into()),
        }
    }

    let now = state.now();
    for sanction in state
        .store
        .list_sanctions_for_subject(SanctionKind::Mute, subject.id())
        .await?
        .into_iter()
        .filter(|s| s.active)
    {
        was_muted |= state
            .store
            .deactivate_sanction(sanction.id, now, Some(ctx.author.id), Some(&request.reason))
            .await?;
    }

    if !was_muted {
        return Err(CommandError::rejected("User is not muted."));
    }
    tracing::info!("Member unmuted");

    state
        .send_to_changelog(format!(
            "{} has been unmuted by {}. Reason: {}",
            subject.mention(),
            ctx.author.mention(),
            request.reason
        ))
        .await;
    Ok(confirmation(
        "Unmute",
        format!("{} has been unmuted.", subject.mention()),
        &request.reason,
        Vec::new(),
    ))
}

// ============================================================================
// Kick
// ============================================================================

/// `kick <member> <reason>`
#[tracing::instrument(skip(state, ctx, request), fields(user_id = %ctx.author.id, subject = %request.subject))]
pub async fn kick(
    state: &AppState,
    ctx: &Invocation,
    request: ModerationRequest,
) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::Kick).await?;
    request.validate()?;

    let capabilities = state.platform.bot_capabilities().await?;
    if !capabilities.kick_members {
        return Err(CommandError::rejected(
            "I do not have the permission to kick members.",
        ));
    }

    let subject = resolve_known(state, request.subject).await?;
    let Some(member) = subject.as_member() else {
        return Err(CommandError::rejected("User is not a member of this server."));
    };
    ensure_sanctionable(state, &subject, "kick").await?;
    ensure_below_bot(state, member, capabilities.top_role_position, "kick").await?;

    let notice = notify(
        state,
        &subject,
        dm("Kick", "You have been kicked from this server.".into(), &request.reason),
    )
    .await;

    state.platform.kick(subject.id(), &request.reason).await?;
    state
        .store
        .append_event(
            subject.id(),
            &subject.name(),
            AuditEventKind::Kick {
                moderator: Some(ctx.author.id),
                reason: Some(request.reason.clone()),
            },
            state.now(),
        )
        .await?;
    tracing::info!("Member kicked");

    state
        .send_to_changelog(format!(
            "{} has been kicked by {}. Reason: {}",
            subject.mention(),
            ctx.author.mention(),
            request.reason
        ))
        .await;
    Ok(confirmation(
        "Kick",
        format!("{} has been kicked.", subject.mention()),
        &request.reason,
        notice.into_iter().collect(),
    ))
}

// ============================================================================
// Ban
// ============================================================================

/// `ban <user> <days|inf> <reason>`
#[tracing::instrument(skip(state, ctx, request), fields(user_id = %ctx.author.id, subject = %request.subject))]
pub async fn ban(
    state: &AppState,
    ctx: &Invocation,
    request: SanctionRequest,
) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::Ban).await?;

    let capabilities = state.platform.bot_capabilities().await?;
    if !capabilities.ban_members {
        return Err(CommandError::rejected(
            "I do not have the permission to ban members.",
        ));
    }
    request.validate()?;

    let subject = resolve_known(state, request.subject).await?;
    ensure_sanctionable(state, &subject, "ban").await?;
    if let Some(member) = subject.as_member() {
        ensure_below_bot(state, member, capabilities.top_role_position, "ban").await?;
    }

    let _guard = state.locks.lock(SanctionKind::Ban, subject.id()).await;

    if state
        .store
        .find_active_sanction(SanctionKind::Ban, subject.id())
        .await?
        .is_some()
    {
        return Err(CommandError::rejected("User is already banned."));
    }

    let notice = notify(
        state,
        &subject,
        dm(
            "Ban",
            format!("You have been banned from this server {}.", describe(request.duration)),
            &request.reason,
        ),
    )
    .await;

    state
        .platform
        .ban(subject.id(), &request.reason, BAN_DELETE_MESSAGE_DAYS)
        .await?;

    let created = state
        .store
        .create_sanction(NewSanction {
            kind: SanctionKind::Ban,
            subject_id: subject.id(),
            subject_name: subject.name(),
            moderator_id: ctx.author.id,
            reason: request.reason.clone(),
            days: request.duration.as_days(),
            created_at: state.now(),
        })
        .await;
    let sanction = match created {
        Ok(sanction) => sanction,
        Err(err) => {
            let rollback = state.platform.unban(subject.id(), None).await;
            log_rollback("ban", subject.id(), &rollback);
            return Err(err.into());
        }
    };
    tracing::info!(sanction_id = %sanction.id, days = sanction.days, "User banned");

    state
        .send_to_changelog(format!(
            "{} has been banned {} by {}. Reason: {}",
            subject.mention(),
            describe(request.duration),
            ctx.author.mention(),
            request.reason
        ))
        .await;
    Ok(confirmation(
        "Ban",
        format!("{} has been banned {}.", subject.mention(), describe(request.duration)),
        &request.reason,
        notice.into_iter().collect(),
    ))
}

/// `unban <user> <reason>`
#[tracing::instrument(skip(state, ctx, request), fields(user_id = %ctx.author.id, subject = %request.subject))]
pub async fn unban(
    state: &AppState,
    ctx: &Invocation,
    request: ModerationRequest,
) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::Ban).await?;

    let capabilities = state.platform.bot_capabilities().await?;
    if !capabilities.ban_members {
        return Err(CommandError::rejected(
            "I do not have the permission to unban members.",
        ));
    }
    request.validate()?;

    let subject = resolve_subject(state.platform.as_ref(), request.subject).await?;
    let _guard = state.locks.lock(SanctionKind::Ban, subject.id()).await;

    let mut was_banned = match state
        .platform
        .unban(subject.id(), Some(&request.reason))
        .await
    {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!(error = %err, "Platform unban failed");
            false
        }
    };

    let now = state.now();
    for sanction in state
        .store
        .list_sanctions_for_subject(SanctionKind::Ban, subject.id())
        .await?
        .into_iter()
        .filter(|s| s.active)
    {
        was_banned |= state
            .store
            .deactivate_sanction(sanction.id, now, Some(ctx.author.id), Some(&request.reason))
            .await?;
    }

    if !was_banned {
        return Err(CommandError::rejected("User is not banned."));
    }
    tracing::info!("User unbanned");

    state
        .send_to_changelog(format!(
            "{} has been unbanned by {}. Reason: {}",
            subject.mention(),
            ctx.author.mention(),
            request.reason
        ))
        .await;
    Ok(confirmation(
        "Unban",
        format!("{} has been unbanned.", subject.mention()),
        &request.reason,
        Vec::new(),
    ))
}

// ============================================================================
// Join log
// ============================================================================

/// `init_join_log`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn init_join_log(state: &AppState, ctx: &Invocation) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::InitJoinLog).await?;

    let mut count = 0usize;
    for member in state.platform.members().await? {
        if let Some(joined_at) = member.joined_at {
            state
                .store
                .upsert_join(member.id(), &member.user.name, joined_at)
                .await?;
            count += 1;
        }
    }
    tracing::info!(count, "Join log initialized");
    Ok(Reply::text(format!("Join log initialized for {count} members.")))
}

fn describe(duration: SanctionDuration) -> String {
    match duration {
        SanctionDuration::Days(_) => format!("for {duration}"),
        SanctionDuration::Permanent => duration.to_string(),
    }
}

fn log_rollback(action: &str, subject: UserId, result: &Result<(), PlatformError>) {
    match result {
        Ok(()) => tracing::warn!(
            action,
            user_id = %subject,
            "Sanction record could not be created, platform effect reverted"
        ),
        Err(err) => tracing::error!(
            action,
            user_id = %subject,
            error = %err,
            "Sanction record could not be created and the platform effect could not be reverted"
        ),
    }
}
