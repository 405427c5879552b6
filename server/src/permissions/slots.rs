//! Logical role slots and their bindings.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use warden_common::{MemberInfo, RoleId};

use crate::db::{Store, StoreError};
use crate::settings;

/// A named role category bound to a platform role through settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleSlot {
    Admin,
    Head,
    HeadAssistant,
    Mute,
    /// Members exempt from sanctions, in addition to the staff slots.
    Team,
    /// Members expected to write regularly.
    Active,
}

impl RoleSlot {
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Admin,
            Self::Head,
            Self::HeadAssistant,
            Self::Mute,
            Self::Team,
            Self::Active,
        ]
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Head => "head",
            Self::HeadAssistant => "head_assistant",
            Self::Mute => "mute",
            Self::Team => "team",
            Self::Active => "active",
        }
    }

    #[must_use]
    pub const fn setting_key(self) -> &'static str {
        match self {
            Self::Admin => "admin_role",
            Self::Head => "head_role",
            Self::HeadAssistant => "head_assistant_role",
            Self::Mute => "mute_role",
            Self::Team => "team_role",
            Self::Active => "active_role",
        }
    }

    /// Slots whose holders cannot be sanctioned.
    #[must_use]
    pub const fn team_slots() -> &'static [Self] {
        &[Self::Team, Self::Admin, Self::Head, Self::HeadAssistant]
    }
}

impl fmt::Display for RoleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RoleSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|slot| slot.name() == s.to_lowercase())
            .ok_or_else(|| format!("Unknown role slot: {s}"))
    }
}

/// Snapshot of all slot bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotBindings {
    roles: HashMap<RoleSlot, RoleId>,
}

impl SlotBindings {
    pub async fn load(store: &dyn Store) -> Result<Self, StoreError> {
        let mut roles = HashMap::new();
        for slot in RoleSlot::all() {
            if let Some(role) = settings::get_role(store, slot.setting_key()).await? {
                roles.insert(*slot, role);
            }
        }
        Ok(Self { roles })
    }

    #[must_use]
    pub fn with(mut self, slot: RoleSlot, role: RoleId) -> Self {
        self.roles.insert(slot, role);
        self
    }

    #[must_use]
    pub fn get(&self, slot: RoleSlot) -> Option<RoleId> {
        self.roles.get(&slot).copied()
    }

    /// Whether the member holds the role bound to `slot`. Unbound slots are
    /// held by nobody.
    #[must_use]
    pub fn holds(&self, member: &MemberInfo, slot: RoleSlot) -> bool {
        self.get(slot).is_some_and(|role| member.has_role(role))
    }

    #[must_use]
    pub fn is_team_member(&self, member: &MemberInfo) -> bool {
        RoleSlot::team_slots()
            .iter()
            .any(|slot| self.holds(member, *slot))
    }
}

#[cfg(test)]
mod tests {
    use warden_common::{UserId, UserInfo};

    use super::*;
    use crate::db::MemoryStore;

    fn member(roles: Vec<RoleId>) -> MemberInfo {
        MemberInfo {
            user: UserInfo {
                id: UserId(1),
                name: "m".into(),
                bot: false,
            },
            nick: None,
            roles,
            administrator: false,
            top_role_position: 0,
            joined_at: None,
        }
    }

    #[test]
    fn unbound_slot_is_held_by_nobody() {
        let bindings = SlotBindings::default();
        assert!(!bindings.holds(&member(vec![RoleId(1)]), RoleSlot::Admin));
    }

    #[test]
    fn team_covers_staff_slots() {
        let bindings = SlotBindings::default().with(RoleSlot::HeadAssistant, RoleId(4));
        assert!(bindings.is_team_member(&member(vec![RoleId(4)])));
        assert!(!bindings.is_team_member(&member(vec![RoleId(5)])));
    }

    #[tokio::test]
    async fn load_reads_settings() {
        let store = MemoryStore::new();
        settings::set_role(&store, RoleSlot::Mute.setting_key(), RoleId(42))
            .await
            .unwrap();

        let bindings = SlotBindings::load(&store).await.unwrap();
        assert_eq!(bindings.get(RoleSlot::Mute), Some(RoleId(42)));
        assert_eq!(bindings.get(RoleSlot::Admin), None);
    }

    #[test]
    fn slot_names_parse() {
        assert_eq!("head_assistant".parse::<RoleSlot>(), Ok(RoleSlot::HeadAssistant));
        assert!("moderator".parse::<RoleSlot>().is_err());
    }
}
