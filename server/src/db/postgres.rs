//! `PostgreSQL` store.
//!
//! Runtime queries (no compile-time `DATABASE_URL` required). Every query
//! logs its failure with context before the error is propagated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::error;
use uuid::Uuid;
use warden_common::{ChannelId, MessageId, RoleId, UserId};

use super::models::{
    Activity, AuditEvent, AuditEventKind, AuditEventType, AuthorizationEdge, NewSanction,
    PermissionOverride, ReactionKey, ReactionRoleLink, Sanction, SanctionKind,
};
use super::store::{
    ActivityStore, AuditEventStore, AutoRoleStore, DelegationStore, LogExcludeStore,
    PermissionOverrideStore, ReactionRoleStore, SanctionStore, SettingsStore, StoreError,
    StoreResult,
};

/// Log and return a database error with context.
macro_rules! db_error {
    ($query:expr) => {
        |e| {
            error!(query = $query, error = %e, "Database query failed");
            StoreError::from(e)
        }
    };
    ($query:expr, $($field:tt)*) => {
        |e| {
            error!(query = $query, $($field)*, error = %e, "Database query failed");
            StoreError::from(e)
        }
    };
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, FromRow)]
struct SanctionRow {
    id: Uuid,
    kind: SanctionKind,
    subject_id: i64,
    subject_name: String,
    moderator_id: i64,
    reason: String,
    days: i32,
    created_at: DateTime<Utc>,
    active: bool,
    deactivated_at: Option<DateTime<Utc>>,
    deactivated_by: Option<i64>,
    deactivation_reason: Option<String>,
}

impl From<SanctionRow> for Sanction {
    fn from(row: SanctionRow) -> Self {
        Self {
            id: row.id,
            kind: row.kind,
            subject_id: UserId(row.subject_id),
            subject_name: row.subject_name,
            moderator_id: UserId(row.moderator_id),
            reason: row.reason,
            days: row.days,
            created_at: row.created_at,
            active: row.active,
            deactivated_at: row.deactivated_at,
            deactivated_by: row.deactivated_by.map(UserId),
            deactivation_reason: row.deactivation_reason,
        }
    }
}

#[derive(Debug, FromRow)]
struct AuditEventRow {
    id: Uuid,
    kind: AuditEventType,
    member_id: i64,
    member_name: String,
    actor_id: Option<i64>,
    reason: Option<String>,
    old_name: Option<String>,
    new_name: Option<String>,
    is_nick: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditEventRow> for AuditEvent {
    type Error = StoreError;

    fn try_from(row: AuditEventRow) -> Result<Self, Self::Error> {
        let missing = |field: &str| {
            StoreError::Corrupt(format!("audit event {} without {field}", row.id))
        };

        let kind = match row.kind {
            AuditEventType::Join => AuditEventKind::Join,
            AuditEventType::Leave => AuditEventKind::Leave,
            AuditEventType::UsernameUpdate => AuditEventKind::UsernameUpdate {
                old_name: row.old_name,
                new_name: row.new_name,
                is_nick: row.is_nick,
            },
            AuditEventType::Report => AuditEventKind::Report {
                reporter: UserId(row.actor_id.ok_or_else(|| missing("reporter"))?),
                reason: row.reason.ok_or_else(|| missing("reason"))?,
            },
            AuditEventType::Warn => AuditEventKind::Warn {
                moderator: UserId(row.actor_id.ok_or_else(|| missing("moderator"))?),
                reason: row.reason.ok_or_else(|| missing("reason"))?,
            },
            AuditEventType::Kick => AuditEventKind::Kick {
                moderator: row.actor_id.map(UserId),
                reason: row.reason,
            },
        };

        Ok(Self {
            id: row.id,
            member_id: UserId(row.member_id),
            member_name: row.member_name,
            kind,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ReactionRoleRow {
    channel_id: i64,
    message_id: i64,
    emoji: String,
    role_id: i64,
    reverse: bool,
    auto_remove: bool,
}

impl From<ReactionRoleRow> for ReactionRoleLink {
    fn from(row: ReactionRoleRow) -> Self {
        Self {
            key: ReactionKey {
                channel_id: ChannelId(row.channel_id),
                message_id: MessageId(row.message_id),
                emoji: row.emoji,
            },
            role_id: RoleId(row.role_id),
            reverse: row.reverse,
            auto_remove: row.auto_remove,
        }
    }
}

const SANCTION_COLUMNS: &str = "id, kind, subject_id, subject_name, moderator_id, reason, days, \
     created_at, active, deactivated_at, deactivated_by, deactivation_reason";

const EVENT_COLUMNS: &str =
    "id, kind, member_id, member_name, actor_id, reason, old_name, new_name, is_nick, created_at";

// ============================================================================
// Settings
// ============================================================================

#[async_trait]
impl SettingsStore for PgStore {
    async fn get_setting(&self, key: &str) -> StoreResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error!("get_setting", key = %key))?;
        Ok(row.map(|(value,)| value))
    }

    async fn set_setting(&self, key: &str, value: &str) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(db_error!("set_setting", key = %key))?;
        Ok(())
    }
}

// ============================================================================
// Permission Overrides
// ============================================================================

#[async_trait]
impl PermissionOverrideStore for PgStore {
    async fn permission_overrides(&self) -> StoreResult<Vec<PermissionOverride>> {
        let rows: Vec<(String, i16)> =
            sqlx::query_as("SELECT name, level FROM permission_overrides ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error!("permission_overrides"))?;
        Ok(rows
            .into_iter()
            .map(|(name, level)| PermissionOverride { name, level })
            .collect())
    }

    async fn set_permission_override(&self, name: &str, level: i16) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO permission_overrides (name, level) VALUES ($1, $2) \
             ON CONFLICT (name) DO UPDATE SET level = EXCLUDED.level",
        )
        .bind(name)
        .bind(level)
        .execute(&self.pool)
        .await
        .map_err(db_error!("set_permission_override", permission = %name))?;
        Ok(())
    }

    async fn clear_permission_override(&self, name: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM permission_overrides WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(db_error!("clear_permission_override", permission = %name))?;
        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// Sanctions
// ============================================================================

#[async_trait]
impl SanctionStore for PgStore {
    #[tracing::instrument(skip(self, new), fields(kind = %new.kind, subject_id = %new.subject_id))]
    async fn create_sanction(&self, new: NewSanction) -> StoreResult<Sanction> {
        let row = sqlx::query_as::<_, SanctionRow>(&format!(
            "INSERT INTO sanctions (id, kind, subject_id, subject_name, moderator_id, reason, days, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {SANCTION_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(new.kind)
        .bind(new.subject_id.get())
        .bind(&new.subject_name)
        .bind(new.moderator_id.get())
        .bind(&new.reason)
        .bind(new.days)
        .bind(new.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error!("create_sanction"))?;
        Ok(row.into())
    }

    async fn find_active_sanction(
        &self,
        kind: SanctionKind,
        subject: UserId,
    ) -> StoreResult<Option<Sanction>> {
        let row = sqlx::query_as::<_, SanctionRow>(&format!(
            "SELECT {SANCTION_COLUMNS} FROM sanctions \
             WHERE kind = $1 AND subject_id = $2 AND active \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(kind)
        .bind(subject.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error!("find_active_sanction", subject_id = %subject))?;
        Ok(row.map(Into::into))
    }

    async fn list_active_sanctions(&self, kind: SanctionKind) -> StoreResult<Vec<Sanction>> {
        let rows = sqlx::query_as::<_, SanctionRow>(&format!(
            "SELECT {SANCTION_COLUMNS} FROM sanctions WHERE kind = $1 AND active ORDER BY created_at"
        ))
        .bind(kind)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error!("list_active_sanctions", kind = %kind))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_sanctions_for_subject(
        &self,
        kind: SanctionKind,
        subject: UserId,
    ) -> StoreResult<Vec<Sanction>> {
        let rows = sqlx::query_as::<_, SanctionRow>(&format!(
            "SELECT {SANCTION_COLUMNS} FROM sanctions \
             WHERE kind = $1 AND subject_id = $2 ORDER BY created_at"
        ))
        .bind(kind)
        .bind(subject.get())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error!("list_sanctions_for_subject", subject_id = %subject))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_sanctions_by_moderator(
        &self,
        kind: SanctionKind,
        moderator: UserId,
    ) -> StoreResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sanctions WHERE kind = $1 AND moderator_id = $2")
                .bind(kind)
                .bind(moderator.get())
                .fetch_one(&self.pool)
                .await
                .map_err(db_error!("count_sanctions_by_moderator", moderator_id = %moderator))?;
        Ok(count)
    }

    #[tracing::instrument(skip(self, reason))]
    async fn deactivate_sanction(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        moderator: Option<UserId>,
        reason: Option<&str>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE sanctions \
             SET active = FALSE, deactivated_at = $2, deactivated_by = $3, deactivation_reason = $4 \
             WHERE id = $1 AND active",
        )
        .bind(id)
        .bind(at)
        .bind(moderator.map(UserId::get))
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(db_error!("deactivate_sanction", sanction_id = %id))?;
        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// Audit Events
// ============================================================================

#[async_trait]
impl AuditEventStore for PgStore {
    async fn append_event(
        &self,
        member: UserId,
        member_name: &str,
        kind: AuditEventKind,
        at: DateTime<Utc>,
    ) -> StoreResult<AuditEvent> {
        let event_type = kind.event_type();
        let actor = kind.actor().map(UserId::get);
        let (reason, old_name, new_name, is_nick) = match &kind {
            AuditEventKind::Report { reason, .. } | AuditEventKind::Warn { reason, .. } => {
                (Some(reason.clone()), None, None, false)
            }
            AuditEventKind::Kick { reason, .. } => (reason.clone(), None, None, false),
            AuditEventKind::UsernameUpdate {
                old_name,
                new_name,
                is_nick,
            } => (None, old_name.clone(), new_name.clone(), *is_nick),
            AuditEventKind::Join | AuditEventKind::Leave => (None, None, None, false),
        };

        let row = sqlx::query_as::<_, AuditEventRow>(&format!(
            "INSERT INTO audit_events \
             (id, kind, member_id, member_name, actor_id, reason, old_name, new_name, is_nick, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {EVENT_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(event_type)
        .bind(member.get())
        .bind(member_name)
        .bind(actor)
        .bind(reason)
        .bind(old_name)
        .bind(new_name)
        .bind(is_nick)
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error!("append_event", member_id = %member))?;
        row.try_into()
    }

    async fn upsert_join(
        &self,
        member: UserId,
        member_name: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let updated = sqlx::query(
            "UPDATE audit_events SET member_name = $2, created_at = $3 \
             WHERE id = (SELECT id FROM audit_events \
                         WHERE kind = 'join' AND member_id = $1 \
                         ORDER BY created_at DESC LIMIT 1)",
        )
        .bind(member.get())
        .bind(member_name)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(db_error!("upsert_join", member_id = %member))?;

        if updated.rows_affected() == 0 {
            self.append_event(member, member_name, AuditEventKind::Join, at)
                .await?;
        }
        Ok(())
    }

    async fn events_for_member(&self, member: UserId) -> StoreResult<Vec<AuditEvent>> {
        let rows = sqlx::query_as::<_, AuditEventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM audit_events WHERE member_id = $1 ORDER BY created_at"
        ))
        .bind(member.get())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error!("events_for_member", member_id = %member))?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn events_by_actor(&self, actor: UserId) -> StoreResult<Vec<AuditEvent>> {
        let rows = sqlx::query_as::<_, AuditEventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM audit_events WHERE actor_id = $1 ORDER BY created_at"
        ))
        .bind(actor.get())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error!("events_by_actor", actor_id = %actor))?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

// ============================================================================
// Delegation
// ============================================================================

#[async_trait]
impl DelegationStore for PgStore {
    async fn add_edge(&self, edge: AuthorizationEdge) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO authorization_edges (source_id, target_role_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(edge.source_id)
        .bind(edge.target_role.get())
        .execute(&self.pool)
        .await
        .map_err(db_error!("add_edge", source_id = edge.source_id))?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_edge(&self, edge: AuthorizationEdge) -> StoreResult<bool> {
        let result = sqlx::query(
            "DELETE FROM authorization_edges WHERE source_id = $1 AND target_role_id = $2",
        )
        .bind(edge.source_id)
        .bind(edge.target_role.get())
        .execute(&self.pool)
        .await
        .map_err(db_error!("remove_edge", source_id = edge.source_id))?;
        Ok(result.rows_affected() > 0)
    }

    async fn edges(&self) -> StoreResult<Vec<AuthorizationEdge>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT source_id, target_role_id FROM authorization_edges ORDER BY target_role_id, source_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error!("edges"))?;
        Ok(rows
            .into_iter()
            .map(|(source_id, target)| AuthorizationEdge {
                source_id,
                target_role: RoleId(target),
            })
            .collect())
    }

    async fn edges_for_target(&self, target: RoleId) -> StoreResult<Vec<AuthorizationEdge>> {
        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT source_id FROM authorization_edges WHERE target_role_id = $1")
                .bind(target.get())
                .fetch_all(&self.pool)
                .await
                .map_err(db_error!("edges_for_target", role_id = %target))?;
        Ok(rows
            .into_iter()
            .map(|(source_id,)| AuthorizationEdge {
                source_id,
                target_role: target,
            })
            .collect())
    }
}

// ============================================================================
// Reaction Roles
// ============================================================================

#[async_trait]
impl ReactionRoleStore for PgStore {
    async fn reaction_role(&self, key: &ReactionKey) -> StoreResult<Option<ReactionRoleLink>> {
        let row = sqlx::query_as::<_, ReactionRoleRow>(
            "SELECT channel_id, message_id, emoji, role_id, reverse, auto_remove FROM reaction_roles \
             WHERE channel_id = $1 AND message_id = $2 AND emoji = $3",
        )
        .bind(key.channel_id.get())
        .bind(key.message_id.get())
        .bind(&key.emoji)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error!("reaction_role", message_id = %key.message_id))?;
        Ok(row.map(Into::into))
    }

    async fn insert_reaction_role(&self, link: ReactionRoleLink) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO reaction_roles (channel_id, message_id, emoji, role_id, reverse, auto_remove) \
             VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT DO NOTHING",
        )
        .bind(link.key.channel_id.get())
        .bind(link.key.message_id.get())
        .bind(&link.key.emoji)
        .bind(link.role_id.get())
        .bind(link.reverse)
        .bind(link.auto_remove)
        .execute(&self.pool)
        .await
        .map_err(db_error!("insert_reaction_role", message_id = %link.key.message_id))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_reaction_role(&self, key: &ReactionKey) -> StoreResult<bool> {
        let result = sqlx::query(
            "DELETE FROM reaction_roles WHERE channel_id = $1 AND message_id = $2 AND emoji = $3",
        )
        .bind(key.channel_id.get())
        .bind(key.message_id.get())
        .bind(&key.emoji)
        .execute(&self.pool)
        .await
        .map_err(db_error!("delete_reaction_role", message_id = %key.message_id))?;
        Ok(result.rows_affected() > 0)
    }

    async fn reaction_roles(
        &self,
        message: Option<(ChannelId, MessageId)>,
    ) -> StoreResult<Vec<ReactionRoleLink>> {
        let rows = match message {
            Some((channel, msg)) => sqlx::query_as::<_, ReactionRoleRow>(
                "SELECT channel_id, message_id, emoji, role_id, reverse, auto_remove FROM reaction_roles \
                 WHERE channel_id = $1 AND message_id = $2 ORDER BY emoji",
            )
            .bind(channel.get())
            .bind(msg.get())
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query_as::<_, ReactionRoleRow>(
                "SELECT channel_id, message_id, emoji, role_id, reverse, auto_remove FROM reaction_roles \
                 ORDER BY channel_id, message_id, emoji",
            )
            .fetch_all(&self.pool)
            .await,
        }
        .map_err(db_error!("reaction_roles"))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// Auto Roles
// ============================================================================

#[async_trait]
impl AutoRoleStore for PgStore {
    async fn auto_roles(&self) -> StoreResult<Vec<RoleId>> {
        let rows: Vec<(i64,)> = sqlx::query_as("SELECT role_id FROM auto_roles ORDER BY role_id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error!("auto_roles"))?;
        Ok(rows.into_iter().map(|(id,)| RoleId(id)).collect())
    }

    async fn add_auto_role(&self, role: RoleId) -> StoreResult<bool> {
        let result =
            sqlx::query("INSERT INTO auto_roles (role_id) VALUES ($1) ON CONFLICT DO NOTHING")
                .bind(role.get())
                .execute(&self.pool)
                .await
                .map_err(db_error!("add_auto_role", role_id = %role))?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_auto_role(&self, role: RoleId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM auto_roles WHERE role_id = $1")
            .bind(role.get())
            .execute(&self.pool)
            .await
            .map_err(db_error!("remove_auto_role", role_id = %role))?;
        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// Activity
// ============================================================================

#[async_trait]
impl ActivityStore for PgStore {
    async fn upsert_activity(&self, user: UserId, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO activity (user_id, last_message) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE \
             SET last_message = GREATEST(activity.last_message, EXCLUDED.last_message)",
        )
        .bind(user.get())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(db_error!("upsert_activity", user_id = %user))?;
        Ok(())
    }

    async fn activity(&self, user: UserId) -> StoreResult<Option<Activity>> {
        let row: Option<(DateTime<Utc>,)> =
            sqlx::query_as("SELECT last_message FROM activity WHERE user_id = $1")
                .bind(user.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error!("activity", user_id = %user))?;
        Ok(row.map(|(last_message,)| Activity {
            user_id: user,
            last_message,
        }))
    }

    async fn all_activity(&self) -> StoreResult<Vec<Activity>> {
        let rows: Vec<(i64, DateTime<Utc>)> =
            sqlx::query_as("SELECT user_id, last_message FROM activity")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error!("all_activity"))?;
        Ok(rows
            .into_iter()
            .map(|(user, last_message)| Activity {
                user_id: UserId(user),
                last_message,
            })
            .collect())
    }
}

// ============================================================================
// Log Exclusions
// ============================================================================

#[async_trait]
impl LogExcludeStore for PgStore {
    async fn log_excludes(&self) -> StoreResult<Vec<ChannelId>> {
        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT channel_id FROM log_excludes ORDER BY channel_id")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error!("log_excludes"))?;
        Ok(rows.into_iter().map(|(id,)| ChannelId(id)).collect())
    }

    async fn is_log_excluded(&self, channel: ChannelId) -> StoreResult<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM log_excludes WHERE channel_id = $1)")
                .bind(channel.get())
                .fetch_one(&self.pool)
                .await
                .map_err(db_error!("is_log_excluded", channel_id = %channel))?;
        Ok(exists)
    }

    async fn add_log_exclude(&self, channel: ChannelId) -> StoreResult<bool> {
        let result =
            sqlx::query("INSERT INTO log_excludes (channel_id) VALUES ($1) ON CONFLICT DO NOTHING")
                .bind(channel.get())
                .execute(&self.pool)
                .await
                .map_err(db_error!("add_log_exclude", channel_id = %channel))?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_log_exclude(&self, channel: ChannelId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM log_excludes WHERE channel_id = $1")
            .bind(channel.get())
            .execute(&self.pool)
            .await
            .map_err(db_error!("remove_log_exclude", channel_id = %channel))?;
        Ok(result.rows_affected() > 0)
    }
}
