//! Inactivity tracking.
//!
//! Every guild message refreshes its author's last activity. Members holding
//! the role bound to the `active` slot are expected to write regularly;
//! everyone else is a watcher.

pub mod handlers;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use warden_common::{MessageInfo, UserId};

use crate::clock::{self, MAX_DAYS};
use crate::db::StoreError;
use crate::events::EventError;
use crate::settings;
use crate::state::AppState;

/// Refresh the author's last activity.
pub async fn on_message(state: &AppState, message: &MessageInfo) -> Result<(), StoreError> {
    if message.author.bot || !message.in_guild {
        return Ok(());
    }
    state
        .store
        .upsert_activity(message.author.id, message.created_at)
        .await
}

/// Threshold from settings, or the explicit argument if it is in range.
pub async fn threshold_days(state: &AppState, days: Option<i64>) -> Result<Option<i64>, StoreError> {
    match days {
        Some(days) if !(1..=MAX_DAYS).contains(&days) => Ok(None),
        Some(days) => Ok(Some(days)),
        None => Ok(Some(
            settings::get_int(
                state.store(),
                settings::INACTIVE_DAYS,
                settings::DEFAULT_INACTIVE_DAYS,
            )
            .await?,
        )),
    }
}

/// Outcome of a history scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub channels: usize,
    pub members: usize,
}

/// Walk every text channel newest first until messages are older than
/// `days`, then store each author's latest message time.
#[tracing::instrument(skip(state))]
pub async fn scan_history(state: &AppState, days: i64) -> Result<ScanSummary, EventError> {
    let cutoff = clock::days_before(state.now(), days).unwrap_or(DateTime::<Utc>::MIN_UTC);
    let channels = state.platform.text_channels().await?;

    let mut latest: HashMap<UserId, DateTime<Utc>> = HashMap::new();
    for channel in &channels {
        let mut history = state.platform.history(channel.id, false);
        while let Some(message) = history.next().await {
            let message = message?;
            if message.created_at < cutoff {
                break;
            }
            if message.author.bot {
                continue;
            }
            latest
                .entry(message.author.id)
                .and_modify(|at| *at = (*at).max(message.created_at))
                .or_insert(message.created_at);
        }
        tracing::debug!(channel_id = %channel.id, "Channel scanned");
    }

    for (user, at) in &latest {
        state.store.upsert_activity(*user, *at).await?;
    }

    tracing::info!(channels = channels.len(), members = latest.len(), "History scan finished");
    Ok(ScanSummary {
        channels: channels.len(),
        members: latest.len(),
    })
}
