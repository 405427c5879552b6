//! Audit log
//!
//! Logs message edits and deletions to configurable channels, announces
//! members leaving and trims old log entries. Channels on the exclude list
//! are never logged.

mod cleanup;
mod distance;
pub mod handlers;
mod ignored;

use warden_common::{Attachment, ChannelId, MessageId, MessageInfo, UserInfo};

pub use cleanup::{run_log_cleanup, spawn_log_cleanup_task};
pub use distance::edit_distance;
pub use ignored::IgnoredMessages;

use crate::events::EventError;
use crate::platform::PlatformError;
use crate::reply::{colour, Content, Embed};
use crate::settings;
use crate::state::AppState;

/// Default minimum edit distance for an edit to be logged.
pub const DEFAULT_EDIT_MINDIFF: i64 = 1;

/// Whether `channel` receives edit or delete log entries.
async fn is_log_channel(state: &AppState, channel: ChannelId) -> Result<bool, EventError> {
    for key in [settings::LOGGING_EDIT, settings::LOGGING_DELETE] {
        if settings::get_channel(state.store(), key).await? == Some(channel) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Delete a message without logging the deletion.
pub async fn delete_nolog(
    state: &AppState,
    channel: ChannelId,
    message: MessageId,
) -> Result<(), PlatformError> {
    state.ignored_messages.insert(message);
    state.platform.delete_message(channel, message).await
}

// ============================================================================
// Edits
// ============================================================================

/// A message edit. `before` is `None` when the old version is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEdit {
    pub before: Option<MessageInfo>,
    pub after: MessageInfo,
}

#[tracing::instrument(skip(state, edit), fields(message_id = %edit.after.id))]
pub async fn on_message_edit(state: &AppState, edit: &MessageEdit) -> Result<(), EventError> {
    let after = &edit.after;
    if !after.in_guild {
        return Ok(());
    }
    if state.ignored_messages.take(after.id) {
        return Ok(());
    }
    if let Some(before) = &edit.before {
        let mindiff = settings::get_int(
            state.store(),
            settings::LOGGING_EDIT_MINDIFF,
            DEFAULT_EDIT_MINDIFF,
        )
        .await?;
        let distance = edit_distance(&before.content, &after.content);
        if i64::try_from(distance).unwrap_or(i64::MAX) < mindiff {
            return Ok(());
        }
    }
    let Some(log_channel) = settings::get_channel(state.store(), settings::LOGGING_EDIT).await?
    else {
        return Ok(());
    };
    if state.store.is_log_excluded(after.channel_id).await? {
        return Ok(());
    }

    let mut embed = Embed::new("Message edited", colour::EDIT);
    embed.field("Channel", format!("<#{}>", after.channel_id), true);
    embed.field("Author", after.author.mention(), true);
    embed.field("URL", after.jump_url(state.platform.guild_id()), false);
    if let Some(before) = &edit.before {
        embed.long_field("Old content", &before.content);
    }
    embed.long_field("New content", &after.content);

    state.platform.send(log_channel, &Content::from(embed)).await?;
    Ok(())
}

// ============================================================================
// Deletions
// ============================================================================

/// A message deletion. `message` is `None` when the content is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDelete {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub in_guild: bool,
    pub message: Option<MessageInfo>,
}

/// File size with a decimal unit, e.g. `1.5 K`.
#[must_use]
pub fn human_size(bytes: u64) -> String {
    #[allow(clippy::cast_precision_loss)]
    let mut size = bytes as f64;
    let mut unit = 'B';
    for next in ['K', 'M', 'G'] {
        if size < 1000.0 {
            break;
        }
        size /= 1000.0;
        unit = next;
    }
    format!("{size:.1} {unit}")
}

fn attachment_lines(attachments: &[Attachment]) -> String {
    attachments
        .iter()
        .map(|a| format!("{} ({})", a.filename, human_size(a.size)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[tracing::instrument(skip(state, deletion), fields(message_id = %deletion.message_id))]
pub async fn on_message_delete(
    state: &AppState,
    deletion: &MessageDelete,
) -> Result<(), EventError> {
    if !deletion.in_guild {
        return Ok(());
    }
    if state.ignored_messages.take(deletion.message_id) {
        return Ok(());
    }
    let Some(log_channel) = settings::get_channel(state.store(), settings::LOGGING_DELETE).await?
    else {
        return Ok(());
    };
    if is_log_channel(state, deletion.channel_id).await? {
        return Ok(());
    }
    if state.store.is_log_excluded(deletion.channel_id).await? {
        return Ok(());
    }

    let mut embed = Embed::new("Message deleted", colour::DELETE);
    embed.field("Channel", format!("<#{}>", deletion.channel_id), true);
    match &deletion.message {
        Some(message) => {
            embed.field("Author", message.author.mention(), true);
            embed.long_field("Old content", &message.content);
            if !message.attachments.is_empty() {
                embed.field("Attachments", attachment_lines(&message.attachments), false);
            }
        }
        None => embed.field("Message ID", deletion.message_id.to_string(), false),
    }

    state.platform.send(log_channel, &Content::from(embed)).await?;
    Ok(())
}

// ============================================================================
// Members
// ============================================================================

/// Announce a member leaving, if enabled.
pub async fn on_member_leave(state: &AppState, user: &UserInfo) -> Result<(), EventError> {
    let Some(channel) =
        settings::get_channel(state.store(), settings::LOGGING_MEMBERLEAVE).await?
    else {
        return Ok(());
    };
    state
        .platform
        .send(
            channel,
            &Content::text(format!("{} ({}) has left the server.", user.mention(), user.name)),
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_sizes() {
        assert_eq!(human_size(12), "12.0 B");
        assert_eq!(human_size(1500), "1.5 K");
        assert_eq!(human_size(2_000_000), "2.0 M");
        assert_eq!(human_size(3_000_000_000_000), "3000.0 G");
    }
}
