//! Role levels, permission overrides and the `permissions` commands.
//!
//! Run with: `cargo test --test permissions_test`

mod helpers;

use helpers::{reply_text, TestBot, ADMIN_ROLE, HEAD_ASSISTANT_ROLE, HEAD_ROLE, MUTE_ROLE};
use warden_common::UserId;
use warden_server::commands::Invocation;
use warden_server::permissions::{Permission, RoleLevel};

#[tokio::test]
async fn test_levels_follow_slot_roles() {
    let bot = TestBot::new().await;
    let admin = bot.member(10, "admin", &[ADMIN_ROLE]).await;
    let head = bot.member(11, "head", &[HEAD_ROLE]).await;
    let assistant = bot.member(12, "assistant", &[HEAD_ASSISTANT_ROLE]).await;
    let public = bot.member(13, "public", &[]).await;
    bot.user(14, "stranger");

    let level = |id: UserId| {
        let state = bot.state.clone();
        async move { state.level_of(id).await.unwrap() }
    };
    assert_eq!(level(admin.id()).await, RoleLevel::Administrator);
    assert_eq!(level(head.id()).await, RoleLevel::Head);
    assert_eq!(level(assistant.id()).await, RoleLevel::HeadAssistant);
    assert_eq!(level(public.id()).await, RoleLevel::Public);
    assert_eq!(level(UserId(14)).await, RoleLevel::Public);
}

#[tokio::test]
async fn test_owner_ignores_roles() {
    let bot = TestBot::new().await;
    let owner = bot.state.config.owner_id;

    assert_eq!(bot.state.level_of(owner).await.unwrap(), RoleLevel::Owner);

    // Also as a member without any staff role
    bot.member(owner.get(), "owner", &[]).await;
    assert_eq!(bot.state.level_of(owner).await.unwrap(), RoleLevel::Owner);
}

#[tokio::test]
async fn test_check_matches_level_comparison() {
    let bot = TestBot::new().await;
    bot.state
        .permissions
        .set(Permission::Warn, RoleLevel::Head)
        .await
        .unwrap();

    for &permission in Permission::all() {
        let required = bot.state.permissions.resolve(permission).await.unwrap();
        let mut allowed_before = false;
        for &level in RoleLevel::all() {
            let allowed = bot
                .state
                .permissions
                .check(level, permission)
                .await
                .unwrap();
            assert_eq!(allowed, level >= required, "{permission} at {level}");
            // Monotone in the level
            assert!(!allowed_before || allowed);
            allowed_before = allowed;
        }
    }
}

#[tokio::test]
async fn test_set_mute_to_head() {
    let bot = TestBot::new().await;
    let admin = bot.admin().await;
    let head = bot.member(11, "head", &[HEAD_ROLE]).await;
    let head = bot.ctx(&head.user);
    bot.member(500, "spammer", &[]).await;

    let reply = bot.run(&head, "mute <@500> 1 spam").await;
    assert!(reply_text(&reply).starts_with("Insufficient permission"));
    assert!(!bot.has_role(UserId(500), MUTE_ROLE));

    let reply = bot.run(&admin, "permissions set mute HEAD").await;
    assert_eq!(
        reply_text(&reply),
        "Permission level of `mute` has been set to HEAD."
    );
    assert_eq!(
        bot.state.permissions.resolve(Permission::Mute).await.unwrap(),
        RoleLevel::Head
    );

    let reply = bot.run(&head, "mute <@500> 1 spam").await;
    assert_eq!(reply_text(&reply), "<@500> has been muted for 1 day.");
    assert!(bot.has_role(UserId(500), MUTE_ROLE));
}

#[tokio::test]
async fn test_permissions_set_is_admin_only() {
    let bot = TestBot::new().await;
    let head = bot.member(11, "head", &[HEAD_ROLE]).await;
    let head = bot.ctx(&head.user);

    let reply = bot.run(&head, "permissions set mute public").await;
    assert_eq!(
        reply_text(&reply),
        "This command is reserved for administrators"
    );
}

#[tokio::test]
async fn test_permissions_set_rejects_unknown_names_and_owner() {
    let bot = TestBot::new().await;
    let admin = bot.admin().await;

    let reply = bot.run(&admin, "permissions set fly HEAD").await;
    assert_eq!(reply_text(&reply), "Invalid permission.");

    let reply = bot.run(&admin, "permissions set mute OWNER").await;
    assert_eq!(
        reply_text(&reply),
        "Invalid arguments: Invalid permission level: OWNER"
    );
}

#[tokio::test]
async fn test_overrides_survive_a_restart() {
    let bot = TestBot::new().await;
    let admin = bot.admin().await;
    bot.run(&admin, "permissions set ban head_assistant").await;

    let restarted = warden_server::permissions::PermissionRegistry::new(bot.store.clone());
    assert_eq!(
        restarted.resolve(Permission::Ban).await.unwrap(),
        RoleLevel::HeadAssistant
    );
}

#[tokio::test]
async fn test_my_permissions_lists_up_to_own_level() {
    let bot = TestBot::new().await;
    let public = bot.member(13, "public", &[]).await;
    let ctx: Invocation = bot.ctx(&public.user);

    let reply = bot.run(&ctx, "permissions my").await;
    let embed = reply.as_embed().expect("embed");
    assert_eq!(embed.title, "My Permissions");
    assert_eq!(embed.fields.len(), 1);
    assert_eq!(embed.fields[0].name, "PUBLIC");
    assert!(embed.fields[0].value.contains("`view_own_permissions`"));

    let reply = bot.run(&ctx, "permissions list").await;
    assert!(reply_text(&reply).starts_with("Insufficient permission"));
}

#[tokio::test]
async fn test_permissions_list_groups_by_level() {
    let bot = TestBot::new().await;
    let admin = bot.admin().await;
    bot.run(&admin, "permissions set warn head").await;

    let reply = bot.run(&admin, "permissions list head").await;
    let embed = reply.as_embed().expect("embed");
    let names: Vec<&str> = embed.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["HEAD", "PUBLIC"]);
    assert!(embed.fields[0].value.contains("`warn`"));
}
