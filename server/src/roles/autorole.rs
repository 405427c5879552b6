//! Roles granted to every member on join.

use warden_common::{MemberInfo, RoleId};

use crate::commands::Invocation;
use crate::error::CommandError;
use crate::permissions::Permission;
use crate::platform::PlatformError;
use crate::reply::{colour, Embed, Reply};
use crate::state::AppState;

/// `autorole`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn list(state: &AppState, ctx: &Invocation) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::ManageAutoRoles).await?;

    let mut lines = Vec::new();
    for role_id in state.store.auto_roles().await? {
        match state.platform.role(role_id).await? {
            Some(role) => lines.push(format!(":small_orange_diamond: {}", role.mention())),
            None => {
                state.store.remove_auto_role(role_id).await?;
            }
        }
    }

    let embed = if lines.is_empty() {
        Embed::new("Autorole", colour::ERROR).description("No autoroles have been configured.")
    } else {
        Embed::new("Autorole", colour::INFO).description(lines.join("\n"))
    };
    Ok(Reply::embed(embed))
}

/// `autorole add <role>`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn add(state: &AppState, ctx: &Invocation, role: RoleId) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::ManageAutoRoles).await?;

    let role = state
        .platform
        .role(role)
        .await?
        .ok_or_else(|| CommandError::input("Role not found."))?;
    if !state.store.add_auto_role(role.id).await? {
        return Err(CommandError::rejected("This role is already an autorole."));
    }

    state
        .send_to_changelog(format!("Autorole {} has been added.", role.mention()))
        .await;
    Ok(Reply::text("Autorole has been added."))
}

/// `autorole remove <role>`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn remove(
    state: &AppState,
    ctx: &Invocation,
    role: RoleId,
) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::ManageAutoRoles).await?;

    if !state.store.remove_auto_role(role).await? {
        return Err(CommandError::rejected("This role is not an autorole."));
    }

    state
        .send_to_changelog(format!("Autorole <@&{role}> has been removed."))
        .await;
    Ok(Reply::text("Autorole has been removed."))
}

/// Grant every existing autorole to a member who just joined. Returns the
/// number of roles granted.
pub async fn grant_on_join(state: &AppState, member: &MemberInfo) -> Result<usize, CommandError> {
    let mut granted = 0;
    for role_id in state.store.auto_roles().await? {
        if state.platform.role(role_id).await?.is_none() || member.has_role(role_id) {
            continue;
        }
        match state.platform.add_role(member.id(), role_id).await {
            Ok(()) => granted += 1,
            Err(PlatformError::NotFound) => {}
            Err(err) => {
                tracing::warn!(user_id = %member.id(), role_id = %role_id, error = %err, "Could not grant autorole");
            }
        }
    }
    Ok(granted)
}
