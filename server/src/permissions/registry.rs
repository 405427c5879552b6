//! Named permissions and their minimum levels.
//!
//! Every permission carries a static default level. Administrators can
//! override it; overrides are persisted and cached in process, loaded on
//! first use and refreshed on every write.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::level::RoleLevel;
use crate::db::{Store, StoreError};

/// Fine-grained permission gating a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ChangePrefix,
    AdminInfo,
    ViewOwnPermissions,
    ViewAllPermissions,
    Warn,
    Mute,
    Kick,
    Ban,
    ViewStats,
    InitJoinLog,
    ManageReactionRoles,
    ManageAutoRoles,
    LogManage,
    ScanMessages,
    ViewUser,
    ViewInactiveUsers,
    SetInactiveDuration,
    ListMembers,
}

impl Permission {
    /// Returns the permission name used in commands and storage.
    ///
    /// # Examples
    ///
    /// ```
    /// use warden_server::permissions::Permission;
    ///
    /// assert_eq!(Permission::ManageReactionRoles.name(), "manage_rr");
    /// ```
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ChangePrefix => "change_prefix",
            Self::AdminInfo => "admininfo",
            Self::ViewOwnPermissions => "view_own_permissions",
            Self::ViewAllPermissions => "view_all_permissions",
            Self::Warn => "warn",
            Self::Mute => "mute",
            Self::Kick => "kick",
            Self::Ban => "ban",
            Self::ViewStats => "view_stats",
            Self::InitJoinLog => "init_join_log",
            Self::ManageReactionRoles => "manage_rr",
            Self::ManageAutoRoles => "manage_ar",
            Self::LogManage => "log_manage",
            Self::ScanMessages => "scan_messages",
            Self::ViewUser => "view_user",
            Self::ViewInactiveUsers => "view_inactive_users",
            Self::SetInactiveDuration => "set_inactive_duration",
            Self::ListMembers => "list_members",
        }
    }

    /// Returns all permissions as a slice.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::ChangePrefix,
            Self::AdminInfo,
            Self::ViewOwnPermissions,
            Self::ViewAllPermissions,
            Self::Warn,
            Self::Mute,
            Self::Kick,
            Self::Ban,
            Self::ViewStats,
            Self::InitJoinLog,
            Self::ManageReactionRoles,
            Self::ManageAutoRoles,
            Self::LogManage,
            Self::ScanMessages,
            Self::ViewUser,
            Self::ViewInactiveUsers,
            Self::SetInactiveDuration,
            Self::ListMembers,
        ]
    }

    /// Level required when no override is stored.
    #[must_use]
    pub const fn default_level(&self) -> RoleLevel {
        match self {
            Self::ViewOwnPermissions => RoleLevel::Public,
            _ => RoleLevel::Administrator,
        }
    }

    /// Returns a human-readable description of the permission.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::ChangePrefix => "change the bot prefix",
            Self::AdminInfo => "view admin information",
            Self::ViewOwnPermissions => "view own permissions",
            Self::ViewAllPermissions => "view all permissions",
            Self::Warn => "warn members",
            Self::Mute => "mute and unmute members",
            Self::Kick => "kick members",
            Self::Ban => "ban and unban users",
            Self::ViewStats => "view stats and logs of other users",
            Self::InitJoinLog => "create a join log entry for every member",
            Self::ManageReactionRoles => "manage reaction roles",
            Self::ManageAutoRoles => "manage auto roles",
            Self::LogManage => "manage message logging",
            Self::ScanMessages => "scan message history for activity",
            Self::ViewUser => "view activity of a user",
            Self::ViewInactiveUsers => "list inactive users",
            Self::SetInactiveDuration => "configure the inactivity threshold",
            Self::ListMembers => "list members holding a role",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown permission: {0}")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

/// Resolves permissions to their effective minimum level.
pub struct PermissionRegistry {
    store: Arc<dyn Store>,
    overrides: RwLock<Option<HashMap<Permission, RoleLevel>>>,
}

impl PermissionRegistry {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            overrides: RwLock::new(None),
        }
    }

    async fn load(&self) -> Result<HashMap<Permission, RoleLevel>, StoreError> {
        let mut overrides = HashMap::new();
        for row in self.store.permission_overrides().await? {
            let Ok(permission) = row.name.parse::<Permission>() else {
                tracing::warn!(permission = %row.name, "Ignoring override of unknown permission");
                continue;
            };
            let Some(level) = RoleLevel::from_i16(row.level) else {
                tracing::warn!(permission = %row.name, level = row.level, "Ignoring invalid override level");
                continue;
            };
            overrides.insert(permission, level);
        }
        Ok(overrides)
    }

    async fn overrides(&self) -> Result<HashMap<Permission, RoleLevel>, StoreError> {
        if let Some(cached) = self.overrides.read().await.as_ref() {
            return Ok(cached.clone());
        }

        let mut slot = self.overrides.write().await;
        if let Some(cached) = slot.as_ref() {
            return Ok(cached.clone());
        }
        let loaded = self.load().await?;
        *slot = Some(loaded.clone());
        Ok(loaded)
    }

    async fn refresh(&self) -> Result<(), StoreError> {
        let loaded = self.load().await?;
        *self.overrides.write().await = Some(loaded);
        Ok(())
    }

    /// Effective minimum level: the override if present, else the default.
    pub async fn resolve(&self, permission: Permission) -> Result<RoleLevel, StoreError> {
        Ok(self
            .overrides()
            .await?
            .get(&permission)
            .copied()
            .unwrap_or_else(|| permission.default_level()))
    }

    /// Persist an override.
    #[tracing::instrument(skip(self))]
    pub async fn set(&self, permission: Permission, level: RoleLevel) -> Result<(), StoreError> {
        self.store
            .set_permission_override(permission.name(), level.as_i16())
            .await?;
        self.refresh().await
    }

    /// Drop an override. Returns `false` if none was stored.
    #[tracing::instrument(skip(self))]
    pub async fn reset(&self, permission: Permission) -> Result<bool, StoreError> {
        let removed = self
            .store
            .clear_permission_override(permission.name())
            .await?;
        self.refresh().await?;
        Ok(removed)
    }

    /// Whether a subject at `level` may exercise `permission`.
    pub async fn check(&self, level: RoleLevel, permission: Permission) -> Result<bool, StoreError> {
        Ok(level >= self.resolve(permission).await?)
    }

    /// Permissions grouped by resolved level, highest level first, names
    /// sorted within a group. Levels above `ceiling` are left out.
    pub async fn list(
        &self,
        ceiling: RoleLevel,
    ) -> Result<Vec<(RoleLevel, Vec<Permission>)>, StoreError> {
        let overrides = self.overrides().await?;
        let mut groups: BTreeMap<RoleLevel, Vec<Permission>> = BTreeMap::new();

        for permission in Permission::all() {
            let level = overrides
                .get(permission)
                .copied()
                .unwrap_or_else(|| permission.default_level());
            if level <= ceiling {
                groups.entry(level).or_default().push(*permission);
            }
        }

        Ok(groups
            .into_iter()
            .rev()
            .map(|(level, mut permissions)| {
                permissions.sort_by_key(|p| p.name());
                (level, permissions)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, PermissionOverrideStore};

    fn registry() -> (Arc<MemoryStore>, PermissionRegistry) {
        let store = Arc::new(MemoryStore::new());
        let registry = PermissionRegistry::new(store.clone());
        (store, registry)
    }

    #[test]
    fn test_names_are_unique_snake_case() {
        let names: Vec<&str> = Permission::all().iter().map(|p| p.name()).collect();
        for (i, name) in names.iter().enumerate() {
            assert!(name.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
            assert!(!names[i + 1..].contains(name), "duplicate name {name}");
        }
        assert_eq!(names.len(), 18);
    }

    #[test]
    fn test_parse_by_name() {
        assert_eq!("manage_rr".parse::<Permission>(), Ok(Permission::ManageReactionRoles));
        assert_eq!(
            "fly".parse::<Permission>(),
            Err(UnknownPermission("fly".to_string()))
        );
        assert_eq!(
            "fly".parse::<Permission>().unwrap_err().to_string(),
            "Unknown permission: fly"
        );
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Permission::ViewOwnPermissions.default_level(), RoleLevel::Public);
        assert_eq!(Permission::Mute.default_level(), RoleLevel::Administrator);
    }

    #[tokio::test]
    async fn test_override_wins_over_default() {
        let (_, registry) = registry();
        assert_eq!(
            registry.resolve(Permission::Mute).await.unwrap(),
            RoleLevel::Administrator
        );

        registry.set(Permission::Mute, RoleLevel::Head).await.unwrap();
        assert_eq!(registry.resolve(Permission::Mute).await.unwrap(), RoleLevel::Head);

        assert!(registry.reset(Permission::Mute).await.unwrap());
        assert_eq!(
            registry.resolve(Permission::Mute).await.unwrap(),
            RoleLevel::Administrator
        );
    }

    #[tokio::test]
    async fn test_overrides_survive_a_new_registry() {
        let (store, registry) = registry();
        registry.set(Permission::Kick, RoleLevel::HeadAssistant).await.unwrap();

        let fresh = PermissionRegistry::new(store);
        assert_eq!(
            fresh.resolve(Permission::Kick).await.unwrap(),
            RoleLevel::HeadAssistant
        );
    }

    #[tokio::test]
    async fn test_check_is_monotone_in_level() {
        let (_, registry) = registry();
        registry.set(Permission::Warn, RoleLevel::Head).await.unwrap();

        for permission in Permission::all() {
            let mut allowed = false;
            for level in RoleLevel::all() {
                let now = registry.check(*level, *permission).await.unwrap();
                assert!(!allowed || now, "{permission} lost at {level}");
                assert_eq!(now, *level >= registry.resolve(*permission).await.unwrap());
                allowed = now;
            }
            assert!(allowed, "owner must pass {permission}");
        }
    }

    #[tokio::test]
    async fn test_list_groups_highest_first() {
        let (_, registry) = registry();
        registry.set(Permission::Warn, RoleLevel::HeadAssistant).await.unwrap();

        let groups = registry.list(RoleLevel::Administrator).await.unwrap();
        let levels: Vec<RoleLevel> = groups.iter().map(|(l, _)| *l).collect();
        assert_eq!(
            levels,
            vec![RoleLevel::Administrator, RoleLevel::HeadAssistant, RoleLevel::Public]
        );
        assert_eq!(groups[1].1, vec![Permission::Warn]);

        let admin = &groups[0].1;
        let mut sorted = admin.clone();
        sorted.sort_by_key(|p| p.name());
        assert_eq!(admin, &sorted);
    }

    #[tokio::test]
    async fn test_list_respects_ceiling() {
        let (_, registry) = registry();
        let groups = registry.list(RoleLevel::Head).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0], (RoleLevel::Public, vec![Permission::ViewOwnPermissions]));
    }

    #[tokio::test]
    async fn test_unknown_stored_override_is_ignored() {
        let (store, registry) = registry();
        store.set_permission_override("manage_roles", 1).await.unwrap();
        assert_eq!(
            registry.resolve(Permission::Ban).await.unwrap(),
            RoleLevel::Administrator
        );
    }
}
