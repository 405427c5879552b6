//! In-process store.
//!
//! Used by the test-suite and when no `DATABASE_URL` is configured. State is
//! lost on restart.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;
use warden_common::{ChannelId, MessageId, RoleId, UserId};

use super::models::{
    Activity, AuditEvent, AuditEventKind, AuthorizationEdge, NewSanction, PermissionOverride,
    ReactionKey, ReactionRoleLink, Sanction, SanctionKind,
};
use super::store::{
    ActivityStore, AuditEventStore, AutoRoleStore, DelegationStore, LogExcludeStore,
    PermissionOverrideStore, ReactionRoleStore, SanctionStore, SettingsStore, StoreError,
    StoreResult,
};

#[derive(Debug, Default)]
struct Tables {
    settings: HashMap<String, String>,
    permission_overrides: BTreeMap<String, i16>,
    sanctions: Vec<Sanction>,
    events: Vec<AuditEvent>,
    edges: BTreeSet<AuthorizationEdge>,
    reaction_roles: BTreeMap<ReactionKey, ReactionRoleLink>,
    auto_roles: BTreeSet<RoleId>,
    activity: BTreeMap<UserId, DateTime<Utc>>,
    log_excludes: BTreeSet<ChannelId>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_sanction_writes: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create_sanction` fail until switched off again.
    pub fn fail_sanction_writes(&self, fail: bool) {
        self.fail_sanction_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get_setting(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.tables.read().await.settings.get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: &str) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .settings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[async_trait]
impl PermissionOverrideStore for MemoryStore {
    async fn permission_overrides(&self) -> StoreResult<Vec<PermissionOverride>> {
        Ok(self
            .tables
            .read()
            .await
            .permission_overrides
            .iter()
            .map(|(name, level)| PermissionOverride {
                name: name.clone(),
                level: *level,
            })
            .collect())
    }

    async fn set_permission_override(&self, name: &str, level: i16) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .permission_overrides
            .insert(name.to_string(), level);
        Ok(())
    }

    async fn clear_permission_override(&self, name: &str) -> StoreResult<bool> {
        Ok(self
            .tables
            .write()
            .await
            .permission_overrides
            .remove(name)
            .is_some())
    }
}

#[async_trait]
impl SanctionStore for MemoryStore {
    async fn create_sanction(&self, new: NewSanction) -> StoreResult<Sanction> {
        if self.fail_sanction_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let sanction = Sanction {
            id: Uuid::now_v7(),
            kind: new.kind,
            subject_id: new.subject_id,
            subject_name: new.subject_name,
            moderator_id: new.moderator_id,
            reason: new.reason,
            days: new.days,
            created_at: new.created_at,
            active: true,
            deactivated_at: None,
            deactivated_by: None,
            deactivation_reason: None,
        };
        self.tables.write().await.sanctions.push(sanction.clone());
        Ok(sanction)
    }

    async fn find_active_sanction(
        &self,
        kind: SanctionKind,
        subject: UserId,
    ) -> StoreResult<Option<Sanction>> {
        Ok(self
            .tables
            .read()
            .await
            .sanctions
            .iter()
            .find(|s| s.active && s.kind == kind && s.subject_id == subject)
            .cloned())
    }

    async fn list_active_sanctions(&self, kind: SanctionKind) -> StoreResult<Vec<Sanction>> {
        Ok(self
            .tables
            .read()
            .await
            .sanctions
            .iter()
            .filter(|s| s.active && s.kind == kind)
            .cloned()
            .collect())
    }

    async fn list_sanctions_for_subject(
        &self,
        kind: SanctionKind,
        subject: UserId,
    ) -> StoreResult<Vec<Sanction>> {
        Ok(self
            .tables
            .read()
            .await
            .sanctions
            .iter()
            .filter(|s| s.kind == kind && s.subject_id == subject)
            .cloned()
            .collect())
    }

    async fn count_sanctions_by_moderator(
        &self,
        kind: SanctionKind,
        moderator: UserId,
    ) -> StoreResult<i64> {
        let count = self
            .tables
            .read()
            .await
            .sanctions
            .iter()
            .filter(|s| s.kind == kind && s.moderator_id == moderator)
            .count();
        Ok(count as i64)
    }

    async fn deactivate_sanction(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        moderator: Option<UserId>,
        reason: Option<&str>,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let Some(sanction) = tables
            .sanctions
            .iter_mut()
            .find(|s| s.id == id && s.active)
        else {
            return Ok(false);
        };

        sanction.active = false;
        sanction.deactivated_at = Some(at);
        sanction.deactivated_by = moderator;
        sanction.deactivation_reason = reason.map(str::to_string);
        Ok(true)
    }
}

#[async_trait]
impl AuditEventStore for MemoryStore {
    async fn append_event(
        &self,
        member: UserId,
        member_name: &str,
        kind: AuditEventKind,
        at: DateTime<Utc>,
    ) -> StoreResult<AuditEvent> {
        let event = AuditEvent {
            id: Uuid::now_v7(),
            member_id: member,
            member_name: member_name.to_string(),
            kind,
            created_at: at,
        };
        self.tables.write().await.events.push(event.clone());
        Ok(event)
    }

    async fn upsert_join(
        &self,
        member: UserId,
        member_name: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let latest = tables
            .events
            .iter_mut()
            .filter(|e| e.member_id == member && e.kind == AuditEventKind::Join)
            .max_by_key(|e| e.created_at);

        if let Some(join) = latest {
            join.member_name = member_name.to_string();
            join.created_at = at;
        } else {
            tables.events.push(AuditEvent {
                id: Uuid::now_v7(),
                member_id: member,
                member_name: member_name.to_string(),
                kind: AuditEventKind::Join,
                created_at: at,
            });
        }
        Ok(())
    }

    async fn events_for_member(&self, member: UserId) -> StoreResult<Vec<AuditEvent>> {
        Ok(self
            .tables
            .read()
            .await
            .events
            .iter()
            .filter(|e| e.member_id == member)
            .cloned()
            .collect())
    }

    async fn events_by_actor(&self, actor: UserId) -> StoreResult<Vec<AuditEvent>> {
        Ok(self
            .tables
            .read()
            .await
            .events
            .iter()
            .filter(|e| e.kind.actor() == Some(actor))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DelegationStore for MemoryStore {
    async fn add_edge(&self, edge: AuthorizationEdge) -> StoreResult<bool> {
        Ok(self.tables.write().await.edges.insert(edge))
    }

    async fn remove_edge(&self, edge: AuthorizationEdge) -> StoreResult<bool> {
        Ok(self.tables.write().await.edges.remove(&edge))
    }

    async fn edges(&self) -> StoreResult<Vec<AuthorizationEdge>> {
        Ok(self.tables.read().await.edges.iter().copied().collect())
    }

    async fn edges_for_target(&self, target: RoleId) -> StoreResult<Vec<AuthorizationEdge>> {
        Ok(self
            .tables
            .read()
            .await
            .edges
            .iter()
            .filter(|e| e.target_role == target)
            .copied()
            .collect())
    }
}

#[async_trait]
impl ReactionRoleStore for MemoryStore {
    async fn reaction_role(&self, key: &ReactionKey) -> StoreResult<Option<ReactionRoleLink>> {
        Ok(self.tables.read().await.reaction_roles.get(key).cloned())
    }

    async fn insert_reaction_role(&self, link: ReactionRoleLink) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.reaction_roles.contains_key(&link.key) {
            return Ok(false);
        }
        tables.reaction_roles.insert(link.key.clone(), link);
        Ok(true)
    }

    async fn delete_reaction_role(&self, key: &ReactionKey) -> StoreResult<bool> {
        Ok(self.tables.write().await.reaction_roles.remove(key).is_some())
    }

    async fn reaction_roles(
        &self,
        message: Option<(ChannelId, MessageId)>,
    ) -> StoreResult<Vec<ReactionRoleLink>> {
        Ok(self
            .tables
            .read()
            .await
            .reaction_roles
            .values()
            .filter(|link| {
                message.map_or(true, |(channel, msg)| {
                    link.key.channel_id == channel && link.key.message_id == msg
                })
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AutoRoleStore for MemoryStore {
    async fn auto_roles(&self) -> StoreResult<Vec<RoleId>> {
        Ok(self.tables.read().await.auto_roles.iter().copied().collect())
    }

    async fn add_auto_role(&self, role: RoleId) -> StoreResult<bool> {
        Ok(self.tables.write().await.auto_roles.insert(role))
    }

    async fn remove_auto_role(&self, role: RoleId) -> StoreResult<bool> {
        Ok(self.tables.write().await.auto_roles.remove(&role))
    }
}

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn upsert_activity(&self, user: UserId, at: DateTime<Utc>) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let entry = tables.activity.entry(user).or_insert(at);
        if at > *entry {
            *entry = at;
        }
        Ok(())
    }

    async fn activity(&self, user: UserId) -> StoreResult<Option<Activity>> {
        Ok(self
            .tables
            .read()
            .await
            .activity
            .get(&user)
            .map(|at| Activity {
                user_id: user,
                last_message: *at,
            }))
    }

    async fn all_activity(&self) -> StoreResult<Vec<Activity>> {
        Ok(self
            .tables
            .read()
            .await
            .activity
            .iter()
            .map(|(user, at)| Activity {
                user_id: *user,
                last_message: *at,
            })
            .collect())
    }
}

#[async_trait]
impl LogExcludeStore for MemoryStore {
    async fn log_excludes(&self) -> StoreResult<Vec<ChannelId>> {
        Ok(self.tables.read().await.log_excludes.iter().copied().collect())
    }

    async fn is_log_excluded(&self, channel: ChannelId) -> StoreResult<bool> {
        Ok(self.tables.read().await.log_excludes.contains(&channel))
    }

    async fn add_log_exclude(&self, channel: ChannelId) -> StoreResult<bool> {
        Ok(self.tables.write().await.log_excludes.insert(channel))
    }

    async fn remove_log_exclude(&self, channel: ChannelId) -> StoreResult<bool> {
        Ok(self.tables.write().await.log_excludes.remove(&channel))
    }
}
