//! Retention of edit and delete log entries.

use std::sync::Arc;

use futures::StreamExt;

use crate::clock;
use crate::events::EventError;
use crate::platform::PlatformError;
use crate::settings;
use crate::state::AppState;

/// Delete log entries older than `logging_maxage` days, oldest first.
/// Returns the number of deleted messages.
#[tracing::instrument(skip(state))]
pub async fn run_log_cleanup(state: &AppState) -> Result<usize, EventError> {
    let days = settings::get_int(state.store(), settings::LOGGING_MAXAGE, settings::UNSET).await?;
    if days <= 0 {
        return Ok(0);
    }
    let Some(cutoff) = clock::days_before(state.now(), days) else {
        // Nothing is older than the representable range
        return Ok(0);
    };

    let mut deleted = 0;
    for key in [settings::LOGGING_EDIT, settings::LOGGING_DELETE] {
        let Some(channel) = settings::get_channel(state.store(), key).await? else {
            continue;
        };

        let mut history = state.platform.history(channel, true);
        while let Some(message) = history.next().await {
            let message = message?;
            if message.created_at > cutoff {
                break;
            }
            match state.platform.delete_message(channel, message.id).await {
                Ok(()) => deleted += 1,
                Err(PlatformError::NotFound) => {}
                Err(err) => return Err(err.into()),
            }
        }
    }

    if deleted > 0 {
        tracing::info!(deleted, "Old log entries deleted");
    }
    Ok(deleted)
}

/// Spawn the periodic log cleanup.
///
/// Runs every `Config::log_cleanup_interval`, starting immediately.
pub fn spawn_log_cleanup_task(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(state.config.log_cleanup_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(err) = run_log_cleanup(&state).await {
                tracing::warn!(error = %err, "Log cleanup failed");
            }
        }
    })
}
