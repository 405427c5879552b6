//! Shared application state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use warden_common::{MemberInfo, UserId};

use crate::audit_log::IgnoredMessages;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::{Store, StoreError};
use crate::error::CommandError;
use crate::moderation::SubjectLocks;
use crate::observability::report_error;
use crate::permissions::{
    level_for, Permission, PermissionError, PermissionRegistry, RoleLevel, SlotBindings,
};
use crate::platform::Platform;
use crate::reply::Content;
use crate::settings;

/// Everything a command or event handler needs.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub platform: Arc<dyn Platform>,
    pub clock: Arc<dyn Clock>,
    pub permissions: PermissionRegistry,
    pub ignored_messages: IgnoredMessages,
    pub locks: SubjectLocks,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        platform: Arc<dyn Platform>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ignored_messages =
            IgnoredMessages::new(config.ignored_message_capacity, config.ignored_message_ttl);
        Self {
            permissions: PermissionRegistry::new(store.clone()),
            ignored_messages,
            locks: SubjectLocks::default(),
            config,
            store,
            platform,
            clock,
        }
    }

    /// State on the system clock.
    #[must_use]
    pub fn with_system_clock(
        config: Config,
        store: Arc<dyn Store>,
        platform: Arc<dyn Platform>,
    ) -> Self {
        Self::new(config, store, platform, Arc::new(SystemClock))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub async fn bindings(&self) -> Result<SlotBindings, StoreError> {
        SlotBindings::load(self.store()).await
    }

    /// Effective level of a subject.
    pub async fn level_of(&self, user: UserId) -> Result<RoleLevel, CommandError> {
        if user == self.config.owner_id {
            return Ok(RoleLevel::Owner);
        }
        let member = self.platform.member(user).await?;
        let bindings = self.bindings().await?;
        Ok(level_for(
            self.config.owner_id,
            user,
            member.as_ref(),
            &bindings,
        ))
    }

    /// Fail with [`PermissionError::InsufficientPermission`] unless `user`
    /// may exercise `permission`.
    pub async fn require(&self, user: UserId, permission: Permission) -> Result<(), CommandError> {
        let actual = self.level_of(user).await?;
        let required = self.permissions.resolve(permission).await?;
        if actual >= required {
            Ok(())
        } else {
            Err(PermissionError::InsufficientPermission {
                permission,
                required,
                actual,
            }
            .into())
        }
    }

    pub async fn require_admin(&self, user: UserId) -> Result<(), CommandError> {
        if self.level_of(user).await? >= RoleLevel::Administrator {
            Ok(())
        } else {
            Err(PermissionError::AdminOnly.into())
        }
    }

    /// Whether `member` holds any of the team or staff slots.
    pub async fn is_team_member(&self, member: &MemberInfo) -> Result<bool, StoreError> {
        Ok(self.bindings().await?.is_team_member(member))
    }

    /// Post a line to the changelog channel, if one is configured.
    ///
    /// Failures are logged; a missing changelog never fails a command.
    pub async fn send_to_changelog(&self, text: impl Into<String>) {
        let channel = match settings::get_channel(self.store(), settings::LOGGING_CHANGELOG).await
        {
            Ok(Some(channel)) => channel,
            Ok(None) => return,
            Err(err) => {
                report_error("changelog", &err);
                return;
            }
        };

        if let Err(err) = self.platform.send(channel, &Content::text(text)).await {
            tracing::warn!(channel_id = %channel, error = %err, "Could not write changelog");
        }
    }
}
