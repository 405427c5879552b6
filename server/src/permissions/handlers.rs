//! `permissions` commands.

use super::{Permission, RoleLevel};
use crate::commands::Invocation;
use crate::error::CommandError;
use crate::reply::{code, colour, Embed, Reply};
use crate::state::AppState;

async fn list_permissions(
    state: &AppState,
    title: &str,
    ceiling: RoleLevel,
) -> Result<Reply, CommandError> {
    let groups = state.permissions.list(ceiling).await?;

    if groups.is_empty() {
        return Ok(Reply::embed(
            Embed::new(title, colour::ERROR).description("No permissions"),
        ));
    }

    let mut embed = Embed::new(title, colour::INFO);
    for (level, permissions) in groups {
        let lines: Vec<String> = permissions
            .iter()
            .map(|p| format!("{} - {}", code(p.name()), p.description()))
            .collect();
        embed.field(level.name(), lines.join("\n"), false);
    }
    Ok(Reply::embed(embed))
}

/// `permissions list [max_level]`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn list(
    state: &AppState,
    ctx: &Invocation,
    max_level: Option<&str>,
) -> Result<Reply, CommandError> {
    state
        .require(ctx.author.id, Permission::ViewAllPermissions)
        .await?;

    let ceiling = match max_level {
        Some(arg) => arg.parse::<RoleLevel>()?,
        None => RoleLevel::Administrator,
    };
    list_permissions(state, "Permissions", ceiling).await
}

/// `permissions my`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn my(state: &AppState, ctx: &Invocation) -> Result<Reply, CommandError> {
    state
        .require(ctx.author.id, Permission::ViewOwnPermissions)
        .await?;

    let level = state.level_of(ctx.author.id).await?;
    list_permissions(state, "My Permissions", level).await
}

/// `permissions set <name> <level>`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn set(
    state: &AppState,
    ctx: &Invocation,
    name: &str,
    level: &str,
) -> Result<Reply, CommandError> {
    state.require_admin(ctx.author.id).await?;

    let permission = name
        .to_lowercase()
        .parse::<Permission>()
        .map_err(|_| CommandError::rejected("Invalid permission."))?;
    let level = level.parse::<RoleLevel>()?;

    state.permissions.set(permission, level).await?;
    tracing::info!(permission = %permission, level = %level, "Permission level changed");

    state
        .send_to_changelog(format!(
            "Permission {} has been set to {}.",
            code(permission.name()),
            level.name()
        ))
        .await;
    Ok(Reply::text(format!(
        "Permission level of {} has been set to {}.",
        code(permission.name()),
        level.name()
    )))
}
