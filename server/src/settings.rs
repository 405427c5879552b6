//! Typed access to the settings table.
//!
//! Values are stored as strings. Channel and role settings use `-1` for
//! "not set".

use warden_common::{ChannelId, RoleId};

use crate::db::{Store, StoreError};

pub const PREFIX: &str = "prefix";
pub const DEFAULT_PREFIX: &str = ".";

pub const LOGGING_EDIT: &str = "logging_edit";
pub const LOGGING_DELETE: &str = "logging_delete";
pub const LOGGING_CHANGELOG: &str = "logging_changelog";
pub const LOGGING_MEMBERLEAVE: &str = "logging_memberleave";
pub const LOGGING_MAXAGE: &str = "logging_maxage";
pub const LOGGING_EDIT_MINDIFF: &str = "logging_edit_mindiff";

pub const INACTIVE_DAYS: &str = "inactive_days";
pub const DEFAULT_INACTIVE_DAYS: i64 = 14;

/// Marker for a disabled channel, role or age setting.
pub const UNSET: i64 = -1;

pub async fn get_int(store: &dyn Store, key: &str, default: i64) -> Result<i64, StoreError> {
    let value = store.get_setting(key).await?;
    Ok(value.and_then(|v| v.parse().ok()).unwrap_or(default))
}

pub async fn set_int(store: &dyn Store, key: &str, value: i64) -> Result<(), StoreError> {
    store.set_setting(key, &value.to_string()).await
}

pub async fn get_str(store: &dyn Store, key: &str, default: &str) -> Result<String, StoreError> {
    Ok(store
        .get_setting(key)
        .await?
        .unwrap_or_else(|| default.to_string()))
}

/// A channel setting, `None` when disabled.
pub async fn get_channel(store: &dyn Store, key: &str) -> Result<Option<ChannelId>, StoreError> {
    let id = get_int(store, key, UNSET).await?;
    Ok((id > 0).then_some(ChannelId(id)))
}

pub async fn set_channel(
    store: &dyn Store,
    key: &str,
    channel: Option<ChannelId>,
) -> Result<(), StoreError> {
    set_int(store, key, channel.map_or(UNSET, ChannelId::get)).await
}

/// A role setting, `None` when unset.
pub async fn get_role(store: &dyn Store, key: &str) -> Result<Option<RoleId>, StoreError> {
    let id = get_int(store, key, UNSET).await?;
    Ok((id > 0).then_some(RoleId(id)))
}

pub async fn set_role(store: &dyn Store, key: &str, role: RoleId) -> Result<(), StoreError> {
    set_int(store, key, role.get()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, SettingsStore};

    #[tokio::test]
    async fn defaults_and_unset_markers() {
        let store = MemoryStore::new();
        assert_eq!(get_int(&store, INACTIVE_DAYS, 14).await.unwrap(), 14);
        assert_eq!(get_channel(&store, LOGGING_EDIT).await.unwrap(), None);

        set_channel(&store, LOGGING_EDIT, Some(ChannelId(5))).await.unwrap();
        assert_eq!(
            get_channel(&store, LOGGING_EDIT).await.unwrap(),
            Some(ChannelId(5))
        );

        set_channel(&store, LOGGING_EDIT, None).await.unwrap();
        assert_eq!(get_channel(&store, LOGGING_EDIT).await.unwrap(), None);
    }

    #[tokio::test]
    async fn garbage_falls_back_to_default() {
        let store = MemoryStore::new();
        store.set_setting(LOGGING_MAXAGE, "soon").await.unwrap();
        assert_eq!(get_int(&store, LOGGING_MAXAGE, UNSET).await.unwrap(), UNSET);
    }
}
