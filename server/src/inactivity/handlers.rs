//! `scan`, `user`, `inactive` and `inactive_duration` commands.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use warden_common::{MemberInfo, UserId};

use super::{scan_history, threshold_days};
use crate::clock::MAX_DAYS;
use crate::commands::Invocation;
use crate::error::CommandError;
use crate::permissions::{Permission, RoleSlot};
use crate::reply::{colour, Embed, Reply};
use crate::settings;
use crate::state::AppState;

const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

fn invalid_duration() -> CommandError {
    CommandError::input("Invalid duration.")
}

/// `scan <days>`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn scan(state: &AppState, ctx: &Invocation, days: i64) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::ScanMessages).await?;
    if !(1..=MAX_DAYS).contains(&days) {
        return Err(invalid_duration());
    }

    let summary = scan_history(state, days).await?;
    Ok(Reply::text(format!(
        "Scanned {} channels and updated the activity of {} members.",
        summary.channels, summary.members
    )))
}

/// Activity status of a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityStatus {
    Bot,
    /// Never seen writing.
    Inactive,
    InactiveSince(DateTime<Utc>),
    /// Last message this many days ago.
    Active(i64),
    /// Not expected to be active.
    Watcher,
}

impl ActivityStatus {
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Bot => "Bot".to_string(),
            Self::Inactive => "Inactive".to_string(),
            Self::InactiveSince(at) => format!("Inactive since {}", at.format(TIMESTAMP_FORMAT)),
            Self::Active(0) => "Active (today)".to_string(),
            Self::Active(1) => "Active (1 day ago)".to_string(),
            Self::Active(days) => format!("Active ({days} days ago)"),
            Self::Watcher => "Watcher".to_string(),
        }
    }
}

/// Classify a member given their last activity and the threshold.
#[must_use]
pub fn activity_status(
    member: &MemberInfo,
    expected_active: bool,
    last_message: Option<DateTime<Utc>>,
    threshold_days: i64,
    now: DateTime<Utc>,
) -> ActivityStatus {
    if member.user.bot {
        return ActivityStatus::Bot;
    }
    if !expected_active {
        return ActivityStatus::Watcher;
    }
    match last_message {
        None => ActivityStatus::Inactive,
        Some(at) => {
            let days = (now - at).num_days();
            if days >= threshold_days {
                ActivityStatus::InactiveSince(at)
            } else {
                ActivityStatus::Active(days)
            }
        }
    }
}

/// `user <member> [inactive_days]`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn user(
    state: &AppState,
    ctx: &Invocation,
    member: UserId,
    inactive_days: Option<i64>,
) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::ViewUser).await?;

    let threshold = threshold_days(state, inactive_days)
        .await?
        .ok_or_else(invalid_duration)?;
    let member = state
        .platform
        .member(member)
        .await?
        .ok_or_else(|| CommandError::input("Member not found."))?;

    let bindings = state.bindings().await?;
    let last_message = state
        .store
        .activity(member.id())
        .await?
        .map(|a| a.last_message);
    let status = activity_status(
        &member,
        bindings.holds(&member, RoleSlot::Active),
        last_message,
        threshold,
        state.now(),
    );

    let mut embed = Embed::new("User information", colour::STATS)
        .author(format!("{} ({})", member.user.name, member.id()));
    embed.field("Status", status.describe(), false);
    Ok(Reply::embed(embed))
}

/// `inactive [days]`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn inactive(
    state: &AppState,
    ctx: &Invocation,
    days: Option<i64>,
) -> Result<Reply, CommandError> {
    state
        .require(ctx.author.id, Permission::ViewInactiveUsers)
        .await?;

    let threshold = threshold_days(state, days).await?.ok_or_else(invalid_duration)?;
    let bindings = state.bindings().await?;
    let activity: HashMap<UserId, DateTime<Utc>> = state
        .store
        .all_activity()
        .await?
        .into_iter()
        .map(|a| (a.user_id, a.last_message))
        .collect();
    let now = state.now();

    let mut inactive: Vec<(MemberInfo, Option<DateTime<Utc>>)> = state
        .platform
        .members()
        .await?
        .into_iter()
        .filter(|m| !m.user.bot && bindings.holds(m, RoleSlot::Active))
        .filter_map(|m| {
            let last = activity.get(&m.id()).copied();
            match last {
                None => Some((m, None)),
                Some(at) if (now - at).num_days() >= threshold => Some((m, Some(at))),
                Some(_) => None,
            }
        })
        .collect();
    inactive.sort_by(|a, b| {
        (a.1.is_some(), a.1, &a.0.user.name).cmp(&(b.1.is_some(), b.1, &b.0.user.name))
    });

    if inactive.is_empty() {
        return Ok(Reply::embed(
            Embed::new("Inactive users", colour::SUCCESS).description("No inactive users."),
        ));
    }
    let lines: Vec<String> = inactive
        .iter()
        .map(|(member, last)| match last {
            None => format!(":small_orange_diamond: {} (never seen)", member.user.mention()),
            Some(at) => format!(
                ":small_orange_diamond: {} (last seen {})",
                member.user.mention(),
                at.format(TIMESTAMP_FORMAT)
            ),
        })
        .collect();
    Ok(Reply::embed(
        Embed::new("Inactive users", colour::INFO).description(lines.join("\n")),
    ))
}

/// `inactive_duration [days]`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn inactive_duration(
    state: &AppState,
    ctx: &Invocation,
    days: Option<i64>,
) -> Result<Reply, CommandError> {
    state
        .require(ctx.author.id, Permission::SetInactiveDuration)
        .await?;

    let Some(days) = days else {
        let current = settings::get_int(
            state.store(),
            settings::INACTIVE_DAYS,
            settings::DEFAULT_INACTIVE_DAYS,
        )
        .await?;
        return Ok(Reply::text(format!(
            "Members are considered inactive after {current} days."
        )));
    };
    if !(1..=MAX_DAYS).contains(&days) {
        return Err(invalid_duration());
    }

    settings::set_int(state.store(), settings::INACTIVE_DAYS, days).await?;
    state
        .send_to_changelog(format!("Inactivity duration has been set to {days} days."))
        .await;
    Ok(Reply::text(format!(
        "Members are now considered inactive after {days} days."
    )))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use warden_common::UserInfo;

    use super::*;

    fn member(bot: bool) -> MemberInfo {
        MemberInfo {
            user: UserInfo {
                id: UserId(5),
                name: "member".into(),
                bot,
            },
            nick: None,
            roles: vec![],
            administrator: false,
            top_role_position: 0,
            joined_at: None,
        }
    }

    #[test]
    fn classification() {
        let now = Utc::now();
        let human = member(false);

        assert_eq!(activity_status(&member(true), true, None, 14, now), ActivityStatus::Bot);
        assert_eq!(activity_status(&human, false, None, 14, now), ActivityStatus::Watcher);
        assert_eq!(activity_status(&human, true, None, 14, now), ActivityStatus::Inactive);

        let recent = now - Duration::days(3);
        assert_eq!(activity_status(&human, true, Some(recent), 14, now), ActivityStatus::Active(3));

        let old = now - Duration::days(14);
        assert_eq!(
            activity_status(&human, true, Some(old), 14, now),
            ActivityStatus::InactiveSince(old)
        );
    }
}
