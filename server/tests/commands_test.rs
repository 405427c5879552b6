//! Message routing: prefix handling and command parsing errors.
//!
//! Run with: `cargo test --test commands_test`

mod helpers;

use helpers::{reply_text, user_info, TestBot, GENERAL};
use warden_common::MessageInfo;
use warden_server::commands::handle_message;
use warden_server::platform::memory::message;

fn typed(bot: &TestBot, author: i64, name: &str, content: &str) -> MessageInfo {
    message(1, GENERAL, &user_info(author, name), content, bot.state.now())
}

async fn typed_text(bot: &TestBot, author: i64, content: &str) -> Option<String> {
    handle_message(&bot.state, &typed(bot, author, "someone", content))
        .await
        .map(|reply| reply_text(&reply))
}

#[tokio::test]
async fn test_default_prefix_and_change() {
    let bot = TestBot::new().await;
    bot.admin().await;

    assert_eq!(
        typed_text(&bot, 900, ".prefix !").await.as_deref(),
        Some("Prefix has been updated.")
    );
    assert!(bot
        .changelog()
        .contains(&"Prefix has been changed to `!`.".to_string()));

    // The old prefix no longer triggers commands
    assert_eq!(typed_text(&bot, 900, ".inactive_duration").await, None);
    assert_eq!(
        typed_text(&bot, 900, "!inactive_duration").await.as_deref(),
        Some("Members are considered inactive after 14 days.")
    );
}

#[tokio::test]
async fn test_invalid_prefix_is_rejected() {
    let bot = TestBot::new().await;
    bot.admin().await;

    let reply = typed_text(&bot, 900, ".prefix seventeen-chars-xx").await;
    assert_eq!(
        reply.as_deref(),
        Some(
            "Invalid arguments: The prefix must be 1 to 16 letters, digits or punctuation characters."
        )
    );
}

#[tokio::test]
async fn test_prefix_change_requires_permission() {
    let bot = TestBot::new().await;
    bot.member(300, "member", &[]).await;

    let reply = typed_text(&bot, 300, ".prefix !").await.unwrap_or_default();
    assert!(reply.starts_with("Insufficient permission"));
}

#[tokio::test]
async fn test_messages_that_are_not_commands() {
    let bot = TestBot::new().await;

    assert_eq!(typed_text(&bot, 300, "hello there").await, None);
    assert_eq!(typed_text(&bot, 300, ".").await, None);
    assert_eq!(typed_text(&bot, 300, ".   ").await, None);

    let mut from_bot = typed(&bot, 2, "warden", ".stats");
    from_bot.author.bot = true;
    assert!(handle_message(&bot.state, &from_bot).await.is_none());

    let mut direct = typed(&bot, 300, "member", ".stats");
    direct.in_guild = false;
    assert!(handle_message(&bot.state, &direct).await.is_none());
}

#[tokio::test]
async fn test_parse_errors_are_replied() {
    let bot = TestBot::new().await;
    bot.admin().await;

    assert_eq!(
        typed_text(&bot, 900, ".fly away").await.as_deref(),
        Some("Invalid arguments: Unknown command: fly")
    );

    let reply = typed_text(&bot, 900, ".mute").await.unwrap_or_default();
    assert!(reply.starts_with("Invalid arguments:"), "{reply}");

    let reply = typed_text(&bot, 900, ".inactive 3 extra").await.unwrap_or_default();
    assert!(reply.starts_with("Invalid arguments:"), "{reply}");
}

#[tokio::test]
async fn test_info_is_public() {
    let bot = TestBot::new().await;
    let member = bot.member(300, "member", &[]).await;
    let ctx = bot.ctx(&member.user);

    let reply = bot.run(&ctx, "about").await;
    let embed = reply.as_embed().expect("embed");
    assert_eq!(embed.title, "Warden");
    assert_eq!(embed.field_value("Prefix"), Some("`.` or <@2>"));
    let features = embed.field_value("Features").unwrap_or_default();
    assert!(features.contains("Reaction roles"));
    assert!(!features.contains("Inactivity tracking"));
}

#[tokio::test]
async fn test_admininfo_shows_staff_features() {
    let bot = TestBot::new().await;
    let admin = bot.admin().await;
    let member = bot.member(300, "member", &[]).await;
    let member = bot.ctx(&member.user);

    let reply = bot.run(&member, "admininfo").await;
    assert!(reply_text(&reply).starts_with("Insufficient permission"));

    let reply = bot.run(&admin, "admininfo").await;
    let features = reply
        .as_embed()
        .and_then(|e| e.field_value("Features"))
        .unwrap_or_default()
        .to_string();
    assert!(features.contains("Reaction roles"));
    assert!(features.contains("Inactivity tracking"));

    bot.run(&admin, "permissions set admininfo public").await;
    let reply = bot.run(&member, "admininfos").await;
    assert!(reply.as_embed().is_some());
}
