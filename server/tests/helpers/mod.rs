//! Reusable fixtures for integration tests.
//!
//! [`TestBot`] wires an [`AppState`] to the in-memory platform, the memory
//! store and a manual clock, and keeps typed handles to all three so tests
//! can arrange and inspect them directly.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use warden_common::{ChannelId, ChannelInfo, MemberInfo, MessageId, RoleId, RoleInfo, UserId, UserInfo};
use warden_server::clock::ManualClock;
use warden_server::commands::{dispatch, Command, Invocation};
use warden_server::config::Config;
use warden_server::db::MemoryStore;
use warden_server::permissions::RoleSlot;
use warden_server::platform::memory::InMemoryPlatform;
use warden_server::reply::{Content, Reply};
use warden_server::settings;
use warden_server::state::AppState;

pub const GUILD_ID: i64 = 1;
pub const BOT_ID: UserId = UserId(2);

pub const ADMIN_ROLE: RoleId = RoleId(10);
pub const HEAD_ROLE: RoleId = RoleId(11);
pub const HEAD_ASSISTANT_ROLE: RoleId = RoleId(12);
pub const TEAM_ROLE: RoleId = RoleId(13);
pub const ACTIVE_ROLE: RoleId = RoleId(14);
pub const MUTE_ROLE: RoleId = RoleId(50);
pub const PLAIN_ROLE: RoleId = RoleId(60);

pub const GENERAL: ChannelId = ChannelId(100);
pub const CHANGELOG: ChannelId = ChannelId(101);
pub const EDIT_LOG: ChannelId = ChannelId(102);
pub const DELETE_LOG: ChannelId = ChannelId(103);

/// Wall-clock time every test starts at.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
}

// ============================================================================
// Test Bot
// ============================================================================

pub struct TestBot {
    pub state: Arc<AppState>,
    pub platform: Arc<InMemoryPlatform>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    next_message: std::sync::atomic::AtomicI64,
}

impl TestBot {
    /// A guild with staff, team, active and mute roles bound and a changelog
    /// channel configured.
    pub async fn new() -> Self {
        let bot = Self::bare();

        for (id, name, position) in [
            (ADMIN_ROLE, "Admin", 40),
            (HEAD_ROLE, "Head", 30),
            (HEAD_ASSISTANT_ROLE, "Head Assistant", 20),
            (TEAM_ROLE, "Team", 15),
            (PLAIN_ROLE, "Gamer", 8),
            (MUTE_ROLE, "Muted", 5),
            (ACTIVE_ROLE, "Active", 3),
        ] {
            bot.add_role(id, name, position);
        }
        for (slot, role) in [
            (RoleSlot::Admin, ADMIN_ROLE),
            (RoleSlot::Head, HEAD_ROLE),
            (RoleSlot::HeadAssistant, HEAD_ASSISTANT_ROLE),
            (RoleSlot::Team, TEAM_ROLE),
            (RoleSlot::Active, ACTIVE_ROLE),
            (RoleSlot::Mute, MUTE_ROLE),
        ] {
            settings::set_role(bot.state.store(), slot.setting_key(), role)
                .await
                .unwrap();
        }

        for (id, name) in [
            (GENERAL, "general"),
            (CHANGELOG, "changelog"),
            (EDIT_LOG, "edit-log"),
            (DELETE_LOG, "delete-log"),
        ] {
            bot.add_channel(id, name);
        }
        settings::set_channel(bot.state.store(), settings::LOGGING_CHANGELOG, Some(CHANGELOG))
            .await
            .unwrap();

        bot
    }

    /// A guild without any roles, channels or settings.
    pub fn bare() -> Self {
        let platform = Arc::new(InMemoryPlatform::new(
            GUILD_ID,
            UserInfo {
                id: BOT_ID,
                name: "warden".into(),
                bot: true,
            },
            UserId(3),
        ));
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(start_time()));
        let state = Arc::new(AppState::new(
            Config::default_for_test(),
            store.clone(),
            platform.clone(),
            clock.clone(),
        ));

        Self {
            state,
            platform,
            store,
            clock,
            next_message: std::sync::atomic::AtomicI64::new(1_000),
        }
    }

    pub fn add_role(&self, id: RoleId, name: &str, position: i32) {
        self.platform.add_role_info(RoleInfo {
            id,
            name: name.into(),
            position,
            managed: false,
            is_default: false,
        });
    }

    pub fn add_channel(&self, id: ChannelId, name: &str) {
        self.platform.add_channel(
            ChannelInfo {
                id,
                name: name.into(),
            },
            true,
            true,
        );
    }

    /// Add a guild member holding `roles`. The top role position follows
    /// the highest of them.
    pub async fn member(&self, id: i64, name: &str, roles: &[RoleId]) -> MemberInfo {
        let mut top_role_position = 0;
        for role in roles {
            if let Some(info) = self.state.platform.role(*role).await.unwrap() {
                top_role_position = top_role_position.max(info.position);
            }
        }
        let member = MemberInfo {
            user: user_info(id, name),
            nick: None,
            roles: roles.to_vec(),
            administrator: false,
            top_role_position,
            joined_at: Some(self.clock_now()),
        };
        self.platform.add_member(member.clone());
        member
    }

    /// Add a platform account that is not a guild member.
    pub fn user(&self, id: i64, name: &str) -> UserInfo {
        let user = user_info(id, name);
        self.platform.add_user(user.clone());
        user
    }

    /// Invocation context for a member, as if typed in `#general`.
    pub fn ctx(&self, author: &UserInfo) -> Invocation {
        Invocation {
            author: author.clone(),
            channel_id: GENERAL,
            message_id: MessageId(
                self.next_message
                    .fetch_add(1, std::sync::atomic::Ordering::SeqCst),
            ),
        }
    }

    /// An administrator, via the bound admin role.
    pub async fn admin(&self) -> Invocation {
        let admin = self.member(900, "admin", &[ADMIN_ROLE]).await;
        self.ctx(&admin.user)
    }

    /// Parse and run a command line (without prefix).
    pub async fn run(&self, ctx: &Invocation, line: &str) -> Reply {
        match Command::parse(line) {
            Ok(command) => dispatch(&self.state, ctx, command).await,
            Err(err) => err.into_reply(),
        }
    }

    /// Texts posted to the changelog channel.
    pub fn changelog(&self) -> Vec<String> {
        texts(&self.platform.sent_to(CHANGELOG))
    }

    pub fn has_role(&self, user: UserId, role: RoleId) -> bool {
        self.platform
            .member_snapshot(user)
            .is_some_and(|m| m.has_role(role))
    }

    fn clock_now(&self) -> DateTime<Utc> {
        self.state.now()
    }
}

pub fn user_info(id: i64, name: &str) -> UserInfo {
    UserInfo {
        id: UserId(id),
        name: name.into(),
        bot: false,
    }
}

pub fn texts(contents: &[Content]) -> Vec<String> {
    contents
        .iter()
        .filter_map(|c| c.as_text().map(str::to_string))
        .collect()
}

/// Main text of a reply, whether plain or embed description.
pub fn reply_text(reply: &Reply) -> String {
    if let Some(text) = reply.as_text() {
        return text.to_string();
    }
    reply
        .as_embed()
        .and_then(|e| e.description.clone())
        .unwrap_or_default()
}
