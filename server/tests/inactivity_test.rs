//! Activity tracking, history scans and inactivity reports.
//!
//! Run with: `cargo test --test inactivity_test`

mod helpers;

use chrono::Duration;
use helpers::{reply_text, user_info, TestBot, ACTIVE_ROLE, GENERAL};
use warden_common::{ChannelId, UserId};
use warden_server::events::{handle_event, Event};
use warden_server::platform::memory::message;

async fn say(bot: &TestBot, id: i64, author: i64, name: &str) {
    let message = message(id, GENERAL, &user_info(author, name), "hi", bot.state.now());
    handle_event(&bot.state, &Event::Message(message)).await;
}

fn status(reply: &warden_server::reply::Reply) -> String {
    reply
        .as_embed()
        .and_then(|e| e.field_value("Status"))
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn test_messages_refresh_activity() {
    let bot = TestBot::new().await;
    bot.member(300, "writer", &[ACTIVE_ROLE]).await;

    say(&bot, 1, 300, "writer").await;
    let first = bot.state.store.activity(UserId(300)).await.unwrap().unwrap();
    assert_eq!(first.last_message, bot.state.now());

    bot.clock.advance(Duration::days(2));
    say(&bot, 2, 300, "writer").await;
    let second = bot.state.store.activity(UserId(300)).await.unwrap().unwrap();
    assert_eq!(second.last_message, bot.state.now());
}

#[tokio::test]
async fn test_bot_and_direct_messages_are_not_tracked() {
    let bot = TestBot::new().await;

    let mut from_bot = message(1, GENERAL, &user_info(2, "warden"), "beep", bot.state.now());
    from_bot.author.bot = true;
    handle_event(&bot.state, &Event::Message(from_bot)).await;

    let mut direct = message(2, GENERAL, &user_info(300, "writer"), "hi", bot.state.now());
    direct.in_guild = false;
    handle_event(&bot.state, &Event::Message(direct)).await;

    assert!(bot.state.store.all_activity().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_user_status() {
    let bot = TestBot::new().await;
    let admin = bot.admin().await;
    bot.member(300, "writer", &[ACTIVE_ROLE]).await;
    bot.member(301, "lurker", &[ACTIVE_ROLE]).await;
    bot.member(302, "watcher", &[]).await;

    say(&bot, 1, 300, "writer").await;
    bot.clock.advance(Duration::days(3));

    let reply = bot.run(&admin, "user <@300>").await;
    assert_eq!(status(&reply), "Active (3 days ago)");
    assert_eq!(
        reply.as_embed().and_then(|e| e.author.clone()).as_deref(),
        Some("writer (300)")
    );

    let reply = bot.run(&admin, "user <@300> 2").await;
    assert!(status(&reply).starts_with("Inactive since 01.01.2026 12:00:00"));

    let reply = bot.run(&admin, "user <@301>").await;
    assert_eq!(status(&reply), "Inactive");

    let reply = bot.run(&admin, "user <@302>").await;
    assert_eq!(status(&reply), "Watcher");

    let reply = bot.run(&admin, "user <@303>").await;
    assert_eq!(reply_text(&reply), "Invalid arguments: Member not found.");
}

#[tokio::test]
async fn test_inactive_list() {
    let bot = TestBot::new().await;
    let admin = bot.admin().await;
    bot.member(300, "writer", &[ACTIVE_ROLE]).await;
    bot.member(301, "old", &[ACTIVE_ROLE]).await;
    bot.member(302, "ghost", &[ACTIVE_ROLE]).await;
    bot.member(303, "watcher", &[]).await;

    say(&bot, 1, 301, "old").await;
    bot.clock.advance(Duration::days(20));
    say(&bot, 2, 300, "writer").await;

    let reply = bot.run(&admin, "inactive").await;
    assert_eq!(
        reply_text(&reply),
        ":small_orange_diamond: <@302> (never seen)\n\
         :small_orange_diamond: <@301> (last seen 01.01.2026 12:00:00)"
    );

    let reply = bot.run(&admin, "inactive 30").await;
    assert_eq!(
        reply_text(&reply),
        ":small_orange_diamond: <@302> (never seen)"
    );

    for line in ["inactive 0", "inactive 999999999999999", "user <@300> 2147483647"] {
        let reply = bot.run(&admin, line).await;
        assert_eq!(reply_text(&reply), "Invalid arguments: Invalid duration.", "{line}");
    }
}

#[tokio::test]
async fn test_inactive_list_empty() {
    let bot = TestBot::new().await;
    let admin = bot.admin().await;
    bot.member(300, "writer", &[ACTIVE_ROLE]).await;
    say(&bot, 1, 300, "writer").await;

    let reply = bot.run(&admin, "in").await;
    assert_eq!(reply_text(&reply), "No inactive users.");
}

#[tokio::test]
async fn test_inactive_duration_setting() {
    let bot = TestBot::new().await;
    let admin = bot.admin().await;

    let reply = bot.run(&admin, "inactive_duration").await;
    assert_eq!(
        reply_text(&reply),
        "Members are considered inactive after 14 days."
    );

    let reply = bot.run(&admin, "indur 7").await;
    assert_eq!(
        reply_text(&reply),
        "Members are now considered inactive after 7 days."
    );
    assert!(bot
        .changelog()
        .contains(&"Inactivity duration has been set to 7 days.".to_string()));

    for days in ["-3", "1000001"] {
        let reply = bot.run(&admin, &format!("inactive_duration {days}")).await;
        assert_eq!(reply_text(&reply), "Invalid arguments: Invalid duration.", "{days}");
    }

    bot.member(300, "writer", &[ACTIVE_ROLE]).await;
    say(&bot, 1, 300, "writer").await;
    bot.clock.advance(Duration::days(8));
    let reply = bot.run(&admin, "user <@300>").await;
    assert!(status(&reply).starts_with("Inactive since"));
}

#[tokio::test]
async fn test_scan_records_latest_message_per_author() {
    let bot = TestBot::new().await;
    let admin = bot.admin().await;
    bot.add_channel(ChannelId(110), "offtopic");
    let now = bot.state.now();
    let alice = user_info(300, "alice");
    let bob = user_info(301, "bob");

    bot.platform
        .post(message(1, GENERAL, &alice, "a", now - Duration::days(5)));
    bot.platform
        .post(message(2, ChannelId(110), &alice, "b", now - Duration::days(1)));
    bot.platform
        .post(message(3, GENERAL, &bob, "c", now - Duration::days(40)));
    let mut beep = message(4, GENERAL, &user_info(2, "warden"), "beep", now);
    beep.author.bot = true;
    bot.platform.post(beep);

    let reply = bot.run(&admin, "scan 30").await;
    assert_eq!(
        reply_text(&reply),
        "Scanned 5 channels and updated the activity of 1 members."
    );

    let alice = bot.state.store.activity(UserId(300)).await.unwrap().unwrap();
    assert_eq!(alice.last_message, now - Duration::days(1));
    assert!(bot.state.store.activity(UserId(301)).await.unwrap().is_none());
    assert!(bot.state.store.activity(UserId(2)).await.unwrap().is_none());

    for days in ["0", "1000001", "999999999999999"] {
        let reply = bot.run(&admin, &format!("scan {days}")).await;
        assert_eq!(reply_text(&reply), "Invalid arguments: Invalid duration.", "{days}");
    }
}

#[tokio::test]
async fn test_scan_never_moves_activity_backwards() {
    let bot = TestBot::new().await;
    let now = bot.state.now();
    bot.state
        .store
        .upsert_activity(UserId(300), now)
        .await
        .unwrap();
    bot.platform.post(message(
        1,
        GENERAL,
        &user_info(300, "alice"),
        "old",
        now - Duration::days(3),
    ));

    warden_server::inactivity::scan_history(&bot.state, 30)
        .await
        .unwrap();
    // A window beyond the representable range scans everything
    warden_server::inactivity::scan_history(&bot.state, i64::MAX)
        .await
        .unwrap();

    let activity = bot.state.store.activity(UserId(300)).await.unwrap().unwrap();
    assert_eq!(activity.last_message, now);
}

#[tokio::test]
async fn test_inactivity_commands_require_permission() {
    let bot = TestBot::new().await;
    let member = bot.member(300, "member", &[]).await;
    let ctx = bot.ctx(&member.user);

    for line in ["scan 7", "inactive", "user <@300>", "inactive_duration 3"] {
        let reply = bot.run(&ctx, line).await;
        assert!(
            reply_text(&reply).starts_with("Insufficient permission"),
            "{line}"
        );
    }
}
