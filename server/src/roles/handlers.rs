//! `roles` commands.

use warden_common::{RoleId, RoleInfo, UserId};

use super::delegation::{self, Delegations};
use crate::commands::Invocation;
use crate::db::AuthorizationEdge;
use crate::error::CommandError;
use crate::permissions::{Permission, PermissionError, RoleSlot};
use crate::reply::{code, colour, Embed, Reply};
use crate::settings;
use crate::state::AppState;

/// `roles`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn overview(state: &AppState, ctx: &Invocation) -> Result<Reply, CommandError> {
    state.require_admin(ctx.author.id).await?;

    let bindings = state.bindings().await?;
    let mut embed = Embed::new("Roles", colour::INFO);
    for slot in RoleSlot::all() {
        let value = match bindings.get(*slot) {
            Some(role) => match state.platform.role(role).await? {
                Some(info) => info.mention(),
                None => "Not set".to_string(),
            },
            None => "Not set".to_string(),
        };
        embed.field(slot.name(), value, true);
    }
    Ok(Reply::embed(embed))
}

/// `roles <slot> <role>`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn bind(
    state: &AppState,
    ctx: &Invocation,
    slot: RoleSlot,
    role: RoleId,
) -> Result<Reply, CommandError> {
    state.require_admin(ctx.author.id).await?;

    let role = state
        .platform
        .role(role)
        .await?
        .ok_or_else(|| CommandError::input("Role not found."))?;

    if slot == RoleSlot::Mute {
        let capabilities = state.platform.bot_capabilities().await?;
        if role.position >= capabilities.top_role_position {
            return Err(CommandError::rejected(format!(
                "Role could not be set because {} is not below my highest role.",
                role.mention()
            )));
        }
        if role.managed {
            return Err(CommandError::rejected(format!(
                "Role could not be set because {} is managed by an integration.",
                role.mention()
            )));
        }
    }

    settings::set_role(state.store(), slot.setting_key(), role.id).await?;
    tracing::info!(slot = %slot, role_id = %role.id, "Role slot bound");

    state
        .send_to_changelog(format!(
            "The {} role has been set to {} ({}).",
            code(slot.name()),
            role.name,
            role.id
        ))
        .await;
    Ok(Reply::text("Role has been set."))
}

// ============================================================================
// Delegation
// ============================================================================

fn delegation_lines<T>(groups: &[(T, Vec<RoleInfo>)], mention: impl Fn(&T) -> String) -> String {
    groups
        .iter()
        .map(|(source, targets)| {
            let targets: Vec<String> = targets.iter().map(|t| t.mention()).collect();
            format!(":small_orange_diamond: {} -> {}", mention(source), targets.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `roles auth`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn auth_list(state: &AppState, ctx: &Invocation) -> Result<Reply, CommandError> {
    state.require_admin(ctx.author.id).await?;

    let delegations = delegation::list(state).await?;
    if delegations.is_empty() {
        return Ok(Reply::embed(
            Embed::new("Role assignment authorizations", colour::ERROR)
                .description("No authorizations have been created."),
        ));
    }

    let mut embed = Embed::new("Role assignment authorizations", colour::INFO);
    let Delegations { by_role, by_user } = delegations;
    if !by_role.is_empty() {
        embed.field("Role authorizations", delegation_lines(&by_role, RoleInfo::mention), false);
    }
    if !by_user.is_empty() {
        embed.field(
            "User authorizations",
            delegation_lines(&by_user, |m| m.user.mention()),
            false,
        );
    }
    Ok(Reply::embed(embed))
}

/// Turn a user or role id into an edge source, rejecting ids that are
/// neither a member nor a role.
async fn edge_source(state: &AppState, source: i64) -> Result<String, CommandError> {
    if let Some(member) = state.platform.member(UserId(source)).await? {
        return Ok(member.user.mention());
    }
    if let Some(role) = state.platform.role(RoleId(source)).await? {
        return Ok(role.mention());
    }
    Err(CommandError::input("Member or role not found."))
}

/// `roles auth add <source> <target>`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn auth_add(
    state: &AppState,
    ctx: &Invocation,
    source: i64,
    target: RoleId,
) -> Result<Reply, CommandError> {
    state.require_admin(ctx.author.id).await?;

    let source_mention = edge_source(state, source).await?;
    let target = state
        .platform
        .role(target)
        .await?
        .ok_or_else(|| CommandError::input("Role not found."))?;

    delegation::authorize(
        state,
        AuthorizationEdge {
            source_id: source,
            target_role: target.id,
        },
    )
    .await?;

    state
        .send_to_changelog(format!(
            "{source_mention} may now assign {}.",
            target.mention()
        ))
        .await;
    Ok(Reply::text("Authorization has been created."))
}

/// `roles auth remove <source> <target>`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn auth_remove(
    state: &AppState,
    ctx: &Invocation,
    source: i64,
    target: RoleId,
) -> Result<Reply, CommandError> {
    state.require_admin(ctx.author.id).await?;

    delegation::revoke(
        state,
        AuthorizationEdge {
            source_id: source,
            target_role: target,
        },
    )
    .await?;

    state
        .send_to_changelog(format!(
            "Authorization of {source} to assign <@&{target}> has been removed."
        ))
        .await;
    Ok(Reply::text("Authorization has been removed."))
}

/// Fail unless the caller holds an authorization for `target`.
async fn require_authorized(
    state: &AppState,
    ctx: &Invocation,
    target: RoleId,
) -> Result<(), CommandError> {
    let roles = state
        .platform
        .member(ctx.author.id)
        .await?
        .map(|m| m.roles)
        .unwrap_or_default();
    if delegation::is_authorized(state, ctx.author.id, &roles, target).await? {
        Ok(())
    } else {
        Err(PermissionError::NotAuthorized(target).into())
    }
}

/// `roles add <member> <role>`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn add(
    state: &AppState,
    ctx: &Invocation,
    member: UserId,
    role: RoleId,
) -> Result<Reply, CommandError> {
    require_authorized(state, ctx, role).await?;
    if state.platform.member(member).await?.is_none() {
        return Err(CommandError::input("Member not found."));
    }

    state.platform.add_role(member, role).await?;
    tracing::info!(member = %member, role_id = %role, "Delegated role granted");
    Ok(Reply::ack())
}

/// `roles remove <member> <role>`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn remove(
    state: &AppState,
    ctx: &Invocation,
    member: UserId,
    role: RoleId,
) -> Result<Reply, CommandError> {
    require_authorized(state, ctx, role).await?;
    if state.platform.member(member).await?.is_none() {
        return Err(CommandError::input("Member not found."));
    }

    state.platform.remove_role(member, role).await?;
    tracing::info!(member = %member, role_id = %role, "Delegated role removed");
    Ok(Reply::ack())
}

/// `roles list <role>`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn list_members(
    state: &AppState,
    ctx: &Invocation,
    role: RoleId,
) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::ListMembers).await?;

    let role = state
        .platform
        .role(role)
        .await?
        .ok_or_else(|| CommandError::input("Role not found."))?;

    let lines: Vec<String> = state
        .platform
        .members()
        .await?
        .iter()
        .filter(|m| m.has_role(role.id))
        .map(|m| format!(":small_orange_diamond: {} ({})", m.user.mention(), code(format!("@{}", m.user.name))))
        .collect();

    let embed = if lines.is_empty() {
        Embed::new("Member list", colour::ERROR).description("No members have this role.")
    } else {
        Embed::new("Member list", colour::INFO).description(lines.join("\n"))
    };
    Ok(Reply::embed(embed))
}
