//! Command prefix.

use std::sync::LazyLock;

use regex::Regex;

use crate::commands::Invocation;
use crate::error::CommandError;
use crate::permissions::Permission;
use crate::reply::{code, Reply};
use crate::settings;
use crate::state::AppState;

static PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9!-/:-@\[-`{-~]{1,16}$").expect("valid regex")
});

/// Current prefix, falling back to the default.
pub async fn current(state: &AppState) -> Result<String, CommandError> {
    Ok(settings::get_str(state.store(), settings::PREFIX, settings::DEFAULT_PREFIX).await?)
}

/// `prefix <new>`
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.author.id))]
pub async fn change_prefix(
    state: &AppState,
    ctx: &Invocation,
    new_prefix: &str,
) -> Result<Reply, CommandError> {
    state.require(ctx.author.id, Permission::ChangePrefix).await?;

    if !PREFIX_REGEX.is_match(new_prefix) {
        return Err(CommandError::input(
            "The prefix must be 1 to 16 letters, digits or punctuation characters.",
        ));
    }

    state
        .store
        .set_setting(settings::PREFIX, new_prefix)
        .await?;
    tracing::info!(prefix = new_prefix, "Prefix changed");

    state
        .send_to_changelog(format!("Prefix has been changed to {}.", code(new_prefix)))
        .await;
    Ok(Reply::text("Prefix has been updated."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ascii_punctuation() {
        for prefix in [".", "!", "$$", "warden.", "~>", "a1-b2"] {
            assert!(PREFIX_REGEX.is_match(prefix), "{prefix}");
        }
    }

    #[test]
    fn rejects_spaces_unicode_and_length() {
        for prefix in ["", " ", "a b", "ä", &"x".repeat(17)] {
            assert!(!PREFIX_REGEX.is_match(prefix), "{prefix}");
        }
    }
}
