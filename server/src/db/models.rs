//! Database Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_common::{ChannelId, MessageId, RoleId, UserId};

use crate::clock;

/// Days value of a sanction that never expires.
pub const PERMANENT_DAYS: i32 = -1;

/// Kind of a timed sanction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "sanction_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SanctionKind {
    Mute,
    Ban,
}

impl SanctionKind {
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Mute, Self::Ban]
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mute => "mute",
            Self::Ban => "ban",
        }
    }
}

impl std::fmt::Display for SanctionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mute or ban record.
///
/// `active` goes from `true` to `false` exactly once. Records are never
/// deleted; the deactivation fields tell manual reversal (moderator set)
/// apart from expiry (moderator `None`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sanction {
    pub id: Uuid,
    pub kind: SanctionKind,
    pub subject_id: UserId,
    pub subject_name: String,
    pub moderator_id: UserId,
    pub reason: String,
    /// Whole days from `created_at`, or [`PERMANENT_DAYS`].
    pub days: i32,
    pub created_at: DateTime<Utc>,
    pub active: bool,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub deactivated_by: Option<UserId>,
    pub deactivation_reason: Option<String>,
}

impl Sanction {
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        self.days == PERMANENT_DAYS
    }

    /// Point in time at which the sanction lapses.
    ///
    /// `None` if permanent or if the deadline lies beyond the representable
    /// range, both of which never expire.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        if self.is_permanent() {
            None
        } else {
            clock::days_after(self.created_at, i64::from(self.days))
        }
    }

    /// Whether the automatic expiry should pick this sanction up at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at().is_some_and(|at| now >= at)
    }
}

/// Input for [`crate::db::SanctionStore::create_sanction`].
#[derive(Debug, Clone)]
pub struct NewSanction {
    pub kind: SanctionKind,
    pub subject_id: UserId,
    pub subject_name: String,
    pub moderator_id: UserId,
    pub reason: String,
    pub days: i32,
    pub created_at: DateTime<Utc>,
}

/// Discriminant of an [`AuditEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_event_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    Join,
    Leave,
    UsernameUpdate,
    Report,
    Warn,
    Kick,
}

/// Payload of an append-only member history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventKind {
    Join,
    Leave,
    UsernameUpdate {
        old_name: Option<String>,
        new_name: Option<String>,
        is_nick: bool,
    },
    Report {
        reporter: UserId,
        reason: String,
    },
    Warn {
        moderator: UserId,
        reason: String,
    },
    /// `moderator` is `None` for kicks not issued through a command.
    Kick {
        moderator: Option<UserId>,
        reason: Option<String>,
    },
}

impl AuditEventKind {
    #[must_use]
    pub const fn event_type(&self) -> AuditEventType {
        match self {
            Self::Join => AuditEventType::Join,
            Self::Leave => AuditEventType::Leave,
            Self::UsernameUpdate { .. } => AuditEventType::UsernameUpdate,
            Self::Report { .. } => AuditEventType::Report,
            Self::Warn { .. } => AuditEventType::Warn,
            Self::Kick { .. } => AuditEventType::Kick,
        }
    }

    /// The user on whose behalf the event was recorded (reporter or moderator).
    #[must_use]
    pub const fn actor(&self) -> Option<UserId> {
        match self {
            Self::Report { reporter, .. } => Some(*reporter),
            Self::Warn { moderator, .. } => Some(*moderator),
            Self::Kick { moderator, .. } => *moderator,
            Self::Join | Self::Leave | Self::UsernameUpdate { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub member_id: UserId,
    pub member_name: String,
    pub kind: AuditEventKind,
    pub created_at: DateTime<Utc>,
}

/// Right of `source` (a user or a role) to grant and revoke `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AuthorizationEdge {
    pub source_id: i64,
    pub target_role: RoleId,
}

/// Key of a reaction role link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReactionKey {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub emoji: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionRoleLink {
    pub key: ReactionKey,
    pub role_id: RoleId,
    /// Adding the reaction removes the role instead.
    pub reverse: bool,
    /// The reaction is stripped right after it was handled.
    pub auto_remove: bool,
}

/// Last time a user wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub user_id: UserId,
    pub last_message: DateTime<Utc>,
}

/// Persisted minimum-level override of a named permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverride {
    pub name: String,
    pub level: i16,
}
