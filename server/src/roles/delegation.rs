//! Authorization delegation graph.
//!
//! An edge `(source, target)` lets the holder of `source` (a user id or a
//! role id) grant and remove `target` with `roles add|remove`. Edges are
//! independent of role levels.

use warden_common::{MemberInfo, RoleId, RoleInfo, UserId};

use crate::db::{AuthorizationEdge, StoreError};
use crate::error::CommandError;
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum DelegationError {
    #[error("This authorization already exists.")]
    AlreadyExists,

    #[error("This authorization does not exist.")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Add an edge, rejecting duplicates.
#[tracing::instrument(skip(state))]
pub async fn authorize(state: &AppState, edge: AuthorizationEdge) -> Result<(), DelegationError> {
    if !state.store.add_edge(edge).await? {
        return Err(DelegationError::AlreadyExists);
    }
    tracing::info!("Authorization added");
    Ok(())
}

/// Remove an edge, rejecting absent ones.
#[tracing::instrument(skip(state))]
pub async fn revoke(state: &AppState, edge: AuthorizationEdge) -> Result<(), DelegationError> {
    if !state.store.remove_edge(edge).await? {
        return Err(DelegationError::NotFound);
    }
    tracing::info!("Authorization removed");
    Ok(())
}

/// Whether a subject with the given roles may grant `target`.
pub async fn is_authorized(
    state: &AppState,
    subject: UserId,
    roles: &[RoleId],
    target: RoleId,
) -> Result<bool, StoreError> {
    let edges = state.store.edges_for_target(target).await?;
    Ok(edges
        .iter()
        .any(|edge| edge.source_id == subject.get() || roles.iter().any(|r| r.get() == edge.source_id)))
}

/// Current edges grouped by source kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delegations {
    pub by_role: Vec<(RoleInfo, Vec<RoleInfo>)>,
    pub by_user: Vec<(MemberInfo, Vec<RoleInfo>)>,
}

impl Delegations {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_role.is_empty() && self.by_user.is_empty()
    }
}

/// All edges, resolved against the platform. Edges whose source or target
/// no longer exists are deleted on the way.
pub async fn list(state: &AppState) -> Result<Delegations, CommandError> {
    let mut delegations = Delegations::default();

    for edge in state.store.edges().await? {
        let Some(target) = state.platform.role(edge.target_role).await? else {
            prune(state, edge).await?;
            continue;
        };

        if let Some(member) = state.platform.member(UserId(edge.source_id)).await? {
            match delegations.by_user.iter_mut().find(|(m, _)| m.id() == member.id()) {
                Some((_, targets)) => targets.push(target),
                None => delegations.by_user.push((member, vec![target])),
            }
        } else if let Some(role) = state.platform.role(RoleId(edge.source_id)).await? {
            match delegations.by_role.iter_mut().find(|(r, _)| r.id == role.id) {
                Some((_, targets)) => targets.push(target),
                None => delegations.by_role.push((role, vec![target])),
            }
        } else {
            prune(state, edge).await?;
        }
    }

    delegations.by_role.sort_by(|a, b| a.0.name.cmp(&b.0.name));
    delegations
        .by_user
        .sort_by(|a, b| a.0.user.name.cmp(&b.0.user.name));
    Ok(delegations)
}

async fn prune(state: &AppState, edge: AuthorizationEdge) -> Result<(), StoreError> {
    tracing::debug!(source_id = edge.source_id, target = %edge.target_role, "Pruning stale authorization");
    state.store.remove_edge(edge).await?;
    Ok(())
}
