//! Read side of the moderation history: `stats` and `userlogs`.

use chrono::{DateTime, Utc};
use warden_common::UserId;

use super::lifecycle::mute_role;
use super::subject::{resolve_subject, Subject};
use crate::commands::Invocation;
use crate::db::{AuditEvent, AuditEventKind, AuditEventType, Sanction, SanctionKind};
use crate::error::CommandError;
use crate::permissions::Permission;
use crate::reply::{colour, Content, Embed, Reply};
use crate::state::AppState;

const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Check access and resolve the subject. Without an explicit user the caller
/// looks at themselves, which needs no permission.
async fn target(
    state: &AppState,
    ctx: &Invocation,
    user: Option<UserId>,
) -> Result<Subject, CommandError> {
    let id = user.unwrap_or(ctx.author.id);
    if id != ctx.author.id {
        state.require(ctx.author.id, Permission::ViewStats).await?;
    }
    Ok(resolve_subject(state.platform.as_ref(), id).await?)
}

/// Reply in the channel, or by DM with a check mark when no user was given.
async fn deliver(
    state: &AppState,
    ctx: &Invocation,
    explicit: bool,
    embed: Embed,
) -> Result<Reply, CommandError> {
    if explicit {
        return Ok(Reply::embed(embed));
    }
    state
        .platform
        .send_dm(ctx.author.id, &Content::from(embed))
        .await
        .map_err(|_| CommandError::rejected("I could not send you a direct message."))?;
    Ok(Reply::ack())
}

// ============================================================================
// Stats
// ============================================================================

/// Number of records of each kind a user issued and received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub active: usize,
    pub passive: usize,
}

fn count_events(events: &[AuditEvent], kind: AuditEventType) -> usize {
    events.iter().filter(|e| e.kind.event_type() == kind).count()
}

/// `stats [user]`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn stats(
    state: &AppState,
    ctx: &Invocation,
    user: Option<UserId>,
) -> Result<Reply, CommandError> {
    let subject = target(state, ctx, user).await?;
    let id = subject.id();

    if let Some(joined_at) = subject.as_member().and_then(|m| m.joined_at) {
        state.store.upsert_join(id, &subject.name(), joined_at).await?;
    }

    let issued = state.store.events_by_actor(id).await?;
    let received = state.store.events_for_member(id).await?;
    let mutes = state
        .store
        .list_sanctions_for_subject(SanctionKind::Mute, id)
        .await?;
    let bans = state
        .store
        .list_sanctions_for_subject(SanctionKind::Ban, id)
        .await?;

    let rows = [
        (
            "Reported",
            Counts {
                active: count_events(&issued, AuditEventType::Report),
                passive: count_events(&received, AuditEventType::Report),
            },
        ),
        (
            "Warned",
            Counts {
                active: count_events(&issued, AuditEventType::Warn),
                passive: count_events(&received, AuditEventType::Warn),
            },
        ),
        (
            "Muted",
            Counts {
                active: sanction_count(state, SanctionKind::Mute, id).await?,
                passive: mutes.len(),
            },
        ),
        (
            "Kicked",
            Counts {
                active: count_events(&issued, AuditEventType::Kick),
                passive: count_events(&received, AuditEventType::Kick),
            },
        ),
        (
            "Banned",
            Counts {
                active: sanction_count(state, SanctionKind::Ban, id).await?,
                passive: bans.len(),
            },
        ),
    ];

    let mut embed = Embed::new("User Stats", colour::STATS).author(subject.name());
    for (name, counts) in rows {
        embed.field(
            name,
            format!("{} active / {} passive", counts.active, counts.passive),
            true,
        );
    }
    embed.field("Status", status(state, &subject, &mutes, &bans).await?, false);

    deliver(state, ctx, user.is_some(), embed).await
}

async fn sanction_count(
    state: &AppState,
    kind: SanctionKind,
    moderator: UserId,
) -> Result<usize, CommandError> {
    let count = state.store.count_sanctions_by_moderator(kind, moderator).await?;
    Ok(usize::try_from(count).unwrap_or_default())
}

async fn status(
    state: &AppState,
    subject: &Subject,
    mutes: &[Sanction],
    bans: &[Sanction],
) -> Result<String, CommandError> {
    let now = state.now();
    if let Some(ban) = bans.iter().find(|b| b.active) {
        return Ok(match ban.expires_at() {
            None => "Banned permanently".to_string(),
            Some(expires_at) => {
                let days = (expires_at - now).num_days().max(0);
                format!("Banned ({days} days left)")
            }
        });
    }

    let Some(member) = subject.as_member() else {
        return Ok("Not a member of this server".to_string());
    };

    let muted = mutes.iter().any(|m| m.active)
        || mute_role(state)
            .await?
            .is_some_and(|role| member.has_role(role));
    if muted {
        return Ok("Muted".to_string());
    }

    Ok(match member.joined_at {
        Some(joined_at) => format!("Member since {}", joined_at.format(TIMESTAMP_FORMAT)),
        None => "Member".to_string(),
    })
}

// ============================================================================
// User logs
// ============================================================================

fn describe_event(event: &AuditEvent) -> String {
    match &event.kind {
        AuditEventKind::Join => "Joined the server".to_string(),
        AuditEventKind::Leave => "Left the server".to_string(),
        AuditEventKind::UsernameUpdate {
            old_name,
            new_name,
            is_nick,
        } => {
            let what = if *is_nick { "nickname" } else { "username" };
            match (old_name, new_name) {
                (None, Some(new)) => format!("Set {what} to {new}"),
                (Some(old), None) => format!("Removed {what} {old}"),
                (Some(old), Some(new)) => format!("Changed {what} from {old} to {new}"),
                (None, None) => format!("Changed {what}"),
            }
        }
        AuditEventKind::Report { reporter, reason } => {
            format!("Reported by <@{reporter}>: {reason}")
        }
        AuditEventKind::Warn { moderator, reason } => {
            format!("Warned by <@{moderator}>: {reason}")
        }
        AuditEventKind::Kick {
            moderator: Some(moderator),
            reason,
        } => format!(
            "Kicked by <@{moderator}>: {}",
            reason.as_deref().unwrap_or("no reason")
        ),
        AuditEventKind::Kick {
            moderator: None, ..
        } => "Autokicked".to_string(),
    }
}

fn push_sanction(entries: &mut Vec<(DateTime<Utc>, String)>, sanction: &Sanction) {
    let (issued, lifted) = match sanction.kind {
        SanctionKind::Mute => ("Muted", "Unmuted"),
        SanctionKind::Ban => ("Banned", "Unbanned"),
    };
    let duration = if sanction.is_permanent() {
        "permanently".to_string()
    } else {
        format!("for {} days", sanction.days)
    };
    entries.push((
        sanction.created_at,
        format!(
            "{issued} by <@{}> {duration}: {}",
            sanction.moderator_id, sanction.reason
        ),
    ));

    if let Some(at) = sanction.deactivated_at {
        let text = match (sanction.deactivated_by, &sanction.deactivation_reason) {
            (None, _) => format!("{lifted} (expired)"),
            (Some(moderator), Some(reason)) => format!("{lifted} by <@{moderator}>: {reason}"),
            (Some(moderator), None) => format!("{lifted} by <@{moderator}>"),
        };
        entries.push((at, text));
    }
}

/// Merge all records about `user` into one chronological list.
pub async fn user_log(
    state: &AppState,
    user: UserId,
) -> Result<Vec<(DateTime<Utc>, String)>, CommandError> {
    let mut entries = vec![(user.created_at(), "Account created".to_string())];

    for event in state.store.events_for_member(user).await? {
        entries.push((event.created_at, describe_event(&event)));
    }
    for kind in SanctionKind::all() {
        for sanction in state.store.list_sanctions_for_subject(*kind, user).await? {
            push_sanction(&mut entries, &sanction);
        }
    }

    entries.sort_by_key(|(at, _)| *at);
    Ok(entries)
}

/// `userlogs [user]`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn userlogs(
    state: &AppState,
    ctx: &Invocation,
    user: Option<UserId>,
) -> Result<Reply, CommandError> {
    let subject = target(state, ctx, user).await?;

    let mut embed = Embed::new("User Logs", colour::USERLOGS).author(subject.name());
    for (at, text) in user_log(state, subject.id()).await? {
        embed.field(at.format(TIMESTAMP_FORMAT).to_string(), text, false);
    }
    embed.footer = Some("UTC".to_string());

    deliver(state, ctx, user.is_some(), embed).await
}
