//! Role level resolution.
//!
//! Computes the effective [`RoleLevel`] of a subject from the configured
//! owner identity, guild membership and slot bindings.

use warden_common::{MemberInfo, RoleId, UserId};

use super::level::RoleLevel;
use super::registry::Permission;
use super::slots::{RoleSlot, SlotBindings};

/// Compute the level of a subject.
///
/// Resolution order, first match wins:
/// 1. The configured owner identity is OWNER
/// 2. Non-members are PUBLIC
/// 3. Native administrator flag or the `admin` slot role is ADMINISTRATOR
/// 4. The `head` slot role is HEAD
/// 5. The `head_assistant` slot role is HEAD_ASSISTANT
/// 6. Everyone else is PUBLIC
#[must_use]
pub fn level_for(
    owner_id: UserId,
    subject: UserId,
    member: Option<&MemberInfo>,
    bindings: &SlotBindings,
) -> RoleLevel {
    if subject == owner_id {
        return RoleLevel::Owner;
    }

    let Some(member) = member else {
        return RoleLevel::Public;
    };

    if member.administrator || bindings.holds(member, RoleSlot::Admin) {
        RoleLevel::Administrator
    } else if bindings.holds(member, RoleSlot::Head) {
        RoleLevel::Head
    } else if bindings.holds(member, RoleSlot::HeadAssistant) {
        RoleLevel::HeadAssistant
    } else {
        RoleLevel::Public
    }
}

/// Permission check errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionError {
    /// Subject level is below the permission's resolved minimum.
    #[error("Insufficient permission: {permission} requires {required}, you are {actual}")]
    InsufficientPermission {
        permission: Permission,
        required: RoleLevel,
        actual: RoleLevel,
    },

    /// Action reserved for administrators.
    #[error("This command is reserved for administrators")]
    AdminOnly,

    /// No delegation edge covers the role.
    #[error("You are not authorized to manage role {0}")]
    NotAuthorized(RoleId),
}
