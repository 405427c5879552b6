//! Sanction lifecycle.
//!
//! Expiry of timed mutes and bans, and reconciliation of the mute role with
//! the stored mute records. The expiry scan runs in a background task; see
//! [`spawn_expiry_task`].

use std::sync::Arc;

use warden_common::{MemberInfo, RoleId};

use crate::db::{Sanction, SanctionKind, StoreError};
use crate::permissions::RoleSlot;
use crate::platform::PlatformError;
use crate::settings;
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of one expiry pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub expired: usize,
    pub failed: usize,
}

/// The bound mute role, if it is set and still exists.
pub async fn mute_role(state: &AppState) -> Result<Option<RoleId>, LifecycleError> {
    let Some(role) = settings::get_role(state.store(), RoleSlot::Mute.setting_key()).await? else {
        return Ok(None);
    };
    Ok(state.platform.role(role).await?.map(|info| info.id))
}

// ============================================================================
// Expiry
// ============================================================================

/// Deactivate every expired ban and mute.
///
/// A failure on one sanction is logged and counted; the pass continues with
/// the next one. Mutes are skipped entirely when no mute role is available.
#[tracing::instrument(skip(state))]
pub async fn run_expiry_cycle(state: &AppState) -> Result<ScanReport, LifecycleError> {
    let now = state.now();
    let mut report = ScanReport::default();

    for sanction in state
        .store
        .list_active_sanctions(SanctionKind::Ban)
        .await?
    {
        if !sanction.is_expired(now) {
            continue;
        }
        tally(&mut report, &sanction, expire_ban(state, &sanction).await);
    }

    match mute_role(state).await? {
        Some(role) => {
            for sanction in state
                .store
                .list_active_sanctions(SanctionKind::Mute)
                .await?
            {
                if !sanction.is_expired(now) {
                    continue;
                }
                tally(&mut report, &sanction, expire_mute(state, &sanction, role).await);
            }
        }
        None => tracing::debug!("Mute role not available, skipping mute expiry"),
    }

    if report.expired > 0 || report.failed > 0 {
        tracing::info!(
            expired = report.expired,
            failed = report.failed,
            "Sanction expiry pass finished"
        );
    }
    Ok(report)
}

fn tally(report: &mut ScanReport, sanction: &Sanction, result: Result<bool, LifecycleError>) {
    match result {
        Ok(true) => report.expired += 1,
        Ok(false) => {}
        Err(err) => {
            report.failed += 1;
            tracing::error!(
                sanction_id = %sanction.id,
                kind = %sanction.kind,
                user_id = %sanction.subject_id,
                error = %err,
                "Failed to expire sanction"
            );
        }
    }
}

/// Whether `sanction` is still the active record of its subject.
async fn still_active(state: &AppState, sanction: &Sanction) -> Result<bool, StoreError> {
    Ok(state
        .store
        .find_active_sanction(sanction.kind, sanction.subject_id)
        .await?
        .is_some_and(|current| current.id == sanction.id))
}

#[tracing::instrument(skip(state, sanction), fields(sanction_id = %sanction.id, user_id = %sanction.subject_id))]
async fn expire_ban(state: &AppState, sanction: &Sanction) -> Result<bool, LifecycleError> {
    let _guard = state.locks.lock(SanctionKind::Ban, sanction.subject_id).await;
    if !still_active(state, sanction).await? {
        return Ok(false);
    }

    match state.platform.unban(sanction.subject_id, None).await {
        Ok(()) | Err(PlatformError::NotFound) => {}
        Err(err) => return Err(err.into()),
    }
    let deactivated = state
        .store
        .deactivate_sanction(sanction.id, state.now(), None, None)
        .await?;

    state
        .send_to_changelog(format!(
            "<@{}> ({}) has been unbanned (expired).",
            sanction.subject_id, sanction.subject_name
        ))
        .await;
    Ok(deactivated)
}

#[tracing::instrument(skip(state, sanction), fields(sanction_id = %sanction.id, user_id = %sanction.subject_id))]
async fn expire_mute(
    state: &AppState,
    sanction: &Sanction,
    role: RoleId,
) -> Result<bool, LifecycleError> {
    let _guard = state.locks.lock(SanctionKind::Mute, sanction.subject_id).await;
    if !still_active(state, sanction).await? {
        return Ok(false);
    }

    let member = state.platform.member(sanction.subject_id).await?;
    if member.is_some_and(|m| m.has_role(role)) {
        match state.platform.remove_role(sanction.subject_id, role).await {
            Ok(()) | Err(PlatformError::NotFound) => {}
            Err(err) => return Err(err.into()),
        }
    }
    let deactivated = state
        .store
        .deactivate_sanction(sanction.id, state.now(), None, None)
        .await?;

    state
        .send_to_changelog(format!(
            "<@{}> ({}) has been unmuted (expired).",
            sanction.subject_id, sanction.subject_name
        ))
        .await;
    Ok(deactivated)
}

// ============================================================================
// Reconciliation
// ============================================================================

/// Give the mute role back to every muted member who lost it while the bot
/// was offline. Returns the number of members fixed.
#[tracing::instrument(skip(state))]
pub async fn reconcile_mutes(state: &AppState) -> Result<usize, LifecycleError> {
    let Some(role) = mute_role(state).await? else {
        tracing::info!("Mute role not available, skipping mute reconciliation");
        return Ok(0);
    };

    let mut restored = 0;
    for sanction in state
        .store
        .list_active_sanctions(SanctionKind::Mute)
        .await?
    {
        let member = match state.platform.member(sanction.subject_id).await {
            Ok(Some(member)) => member,
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!(user_id = %sanction.subject_id, error = %err, "Could not look up muted member");
                continue;
            }
        };
        if member.has_role(role) {
            continue;
        }
        match state.platform.add_role(member.id(), role).await {
            Ok(()) => restored += 1,
            Err(err) => {
                tracing::warn!(user_id = %member.id(), error = %err, "Could not restore mute role");
            }
        }
    }

    tracing::info!(restored, "Mute role reconciled");
    Ok(restored)
}

/// Re-apply the mute role to a member rejoining with an active mute.
pub async fn reapply_mute_on_join(
    state: &AppState,
    member: &MemberInfo,
) -> Result<bool, LifecycleError> {
    if state
        .store
        .find_active_sanction(SanctionKind::Mute, member.id())
        .await?
        .is_none()
    {
        return Ok(false);
    }
    let Some(role) = mute_role(state).await? else {
        return Ok(false);
    };
    if member.has_role(role) {
        return Ok(false);
    }
    state.platform.add_role(member.id(), role).await?;
    tracing::info!(user_id = %member.id(), "Mute role re-applied on join");
    Ok(true)
}

// ============================================================================
// Background Task
// ============================================================================

/// Spawn the periodic expiry scan.
///
/// The first pass runs immediately, then once per
/// `Config::sanction_scan_interval`.
pub fn spawn_expiry_task(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(state.config.sanction_scan_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(err) = run_expiry_cycle(&state).await {
                tracing::error!(error = %err, "Sanction expiry pass failed");
            }
            state.locks.prune();
        }
    })
}
