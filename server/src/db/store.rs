//! Storage traits.
//!
//! One trait per entity family. Both [`super::MemoryStore`] and
//! [`super::PgStore`] implement all of them; components hold an
//! `Arc<dyn Store>`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use warden_common::{ChannelId, MessageId, RoleId, UserId};

use super::models::{
    Activity, AuditEvent, AuditEventKind, AuthorizationEdge, NewSanction, PermissionOverride,
    ReactionKey, ReactionRoleLink, Sanction, SanctionKind,
};

/// Persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row could not be mapped back to its model.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// String-keyed configuration values.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_setting(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set_setting(&self, key: &str, value: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait PermissionOverrideStore: Send + Sync {
    async fn permission_overrides(&self) -> StoreResult<Vec<PermissionOverride>>;

    async fn set_permission_override(&self, name: &str, level: i16) -> StoreResult<()>;

    /// Returns `false` if no override was stored.
    async fn clear_permission_override(&self, name: &str) -> StoreResult<bool>;
}

/// Mute and ban records.
#[async_trait]
pub trait SanctionStore: Send + Sync {
    async fn create_sanction(&self, new: NewSanction) -> StoreResult<Sanction>;

    /// The active sanction of `kind` for `subject`, if any.
    async fn find_active_sanction(
        &self,
        kind: SanctionKind,
        subject: UserId,
    ) -> StoreResult<Option<Sanction>>;

    async fn list_active_sanctions(&self, kind: SanctionKind) -> StoreResult<Vec<Sanction>>;

    async fn list_sanctions_for_subject(
        &self,
        kind: SanctionKind,
        subject: UserId,
    ) -> StoreResult<Vec<Sanction>>;

    async fn count_sanctions_by_moderator(
        &self,
        kind: SanctionKind,
        moderator: UserId,
    ) -> StoreResult<i64>;

    /// Mark an active sanction inactive.
    ///
    /// `moderator` and `reason` are both `None` for automatic expiry. Returns
    /// `false` if the sanction does not exist or is already inactive.
    async fn deactivate_sanction(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        moderator: Option<UserId>,
        reason: Option<&str>,
    ) -> StoreResult<bool>;
}

/// Append-only member history.
#[async_trait]
pub trait AuditEventStore: Send + Sync {
    async fn append_event(
        &self,
        member: UserId,
        member_name: &str,
        kind: AuditEventKind,
        at: DateTime<Utc>,
    ) -> StoreResult<AuditEvent>;

    /// Move the member's latest join record to `at`, creating one if needed.
    async fn upsert_join(&self, member: UserId, member_name: &str, at: DateTime<Utc>)
        -> StoreResult<()>;

    async fn events_for_member(&self, member: UserId) -> StoreResult<Vec<AuditEvent>>;

    async fn events_by_actor(&self, actor: UserId) -> StoreResult<Vec<AuditEvent>>;
}

/// Delegated role grant rights.
#[async_trait]
pub trait DelegationStore: Send + Sync {
    /// Returns `false` if the edge already existed.
    async fn add_edge(&self, edge: AuthorizationEdge) -> StoreResult<bool>;

    /// Returns `false` if the edge did not exist.
    async fn remove_edge(&self, edge: AuthorizationEdge) -> StoreResult<bool>;

    async fn edges(&self) -> StoreResult<Vec<AuthorizationEdge>>;

    async fn edges_for_target(&self, target: RoleId) -> StoreResult<Vec<AuthorizationEdge>>;
}

#[async_trait]
pub trait ReactionRoleStore: Send + Sync {
    async fn reaction_role(&self, key: &ReactionKey) -> StoreResult<Option<ReactionRoleLink>>;

    /// Returns `false` if a link with the same key exists.
    async fn insert_reaction_role(&self, link: ReactionRoleLink) -> StoreResult<bool>;

    async fn delete_reaction_role(&self, key: &ReactionKey) -> StoreResult<bool>;

    /// All links, or only those of one message.
    async fn reaction_roles(
        &self,
        message: Option<(ChannelId, MessageId)>,
    ) -> StoreResult<Vec<ReactionRoleLink>>;
}

#[async_trait]
pub trait AutoRoleStore: Send + Sync {
    async fn auto_roles(&self) -> StoreResult<Vec<RoleId>>;

    async fn add_auto_role(&self, role: RoleId) -> StoreResult<bool>;

    async fn remove_auto_role(&self, role: RoleId) -> StoreResult<bool>;
}

#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Record activity, keeping the later of the stored and given timestamp.
    async fn upsert_activity(&self, user: UserId, at: DateTime<Utc>) -> StoreResult<()>;

    async fn activity(&self, user: UserId) -> StoreResult<Option<Activity>>;

    async fn all_activity(&self) -> StoreResult<Vec<Activity>>;
}

/// Channels excluded from message logging.
#[async_trait]
pub trait LogExcludeStore: Send + Sync {
    async fn log_excludes(&self) -> StoreResult<Vec<ChannelId>>;

    async fn is_log_excluded(&self, channel: ChannelId) -> StoreResult<bool>;

    async fn add_log_exclude(&self, channel: ChannelId) -> StoreResult<bool>;

    async fn remove_log_exclude(&self, channel: ChannelId) -> StoreResult<bool>;
}

/// Every storage capability the bot needs.
pub trait Store:
    SettingsStore
    + PermissionOverrideStore
    + SanctionStore
    + AuditEventStore
    + DelegationStore
    + ReactionRoleStore
    + AutoRoleStore
    + ActivityStore
    + LogExcludeStore
{
}

impl<T> Store for T where
    T: SettingsStore
        + PermissionOverrideStore
        + SanctionStore
        + AuditEventStore
        + DelegationStore
        + ReactionRoleStore
        + AutoRoleStore
        + ActivityStore
        + LogExcludeStore
{
}
