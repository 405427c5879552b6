//! `info` and `admininfo`: what the bot is and what it offers.

use crate::commands::Invocation;
use crate::error::CommandError;
use crate::permissions::Permission;
use crate::prefix;
use crate::reply::{code, colour, Embed, Reply};
use crate::state::AppState;

const FEATURES: &[&str] = &[
    "Reaction roles",
    "Own stats and moderation log by DM",
    "Reports to the moderation team",
];

const ADMIN_FEATURES: &[&str] = &[
    "Configurable permission levels",
    "Timed mutes and bans with automatic expiry",
    "Delegated role assignment",
    "Auto roles for new members",
    "Edit, delete and leave logging",
    "Inactivity tracking",
];

async fn info_embed(state: &AppState, admin_view: bool) -> Result<Embed, CommandError> {
    let prefix = prefix::current(state).await?;

    let staff: &[&str] = if admin_view { ADMIN_FEATURES } else { &[] };
    let features: Vec<String> = FEATURES
        .iter()
        .chain(staff)
        .map(|feature| format!(":small_orange_diamond: {feature}"))
        .collect();

    let mut embed = Embed::new("Warden", colour::INFO)
        .description(env!("CARGO_PKG_DESCRIPTION"));
    embed.field("Features", features.join("\n"), false);
    embed.field("Version", env!("CARGO_PKG_VERSION"), true);
    embed.field(
        "Prefix",
        format!("{} or {}", code(prefix), state.platform.bot_user().mention()),
        true,
    );
    embed.field("Source", env!("CARGO_PKG_REPOSITORY"), false);
    Ok(embed)
}

/// `info`, open to everyone.
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn info(state: &AppState, ctx: &Invocation) -> Result<Reply, CommandError> {
    Ok(Reply::embed(info_embed(state, false).await?))
}

/// `admininfo`: `info` including the staff features.
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn admin_info(state: &AppState, ctx: &Invocation) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::AdminInfo).await?;
    Ok(Reply::embed(info_embed(state, true).await?))
}
