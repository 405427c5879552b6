//! Reaction role links and their event handling.
//!
//! Run with: `cargo test --test reaction_roles_test`

mod helpers;

use helpers::{reply_text, start_time, user_info, TestBot, BOT_ID, GENERAL, PLAIN_ROLE};
use warden_common::{MessageId, UserId};
use warden_server::events::{handle_event, Event, EventOutcome};
use warden_server::platform::memory::message;
use warden_server::reaction_roles::ReactionEvent;

const POST: MessageId = MessageId(7000);
const MEMBER: UserId = UserId(300);

async fn bot_with_post() -> TestBot {
    let bot = TestBot::new().await;
    let author = user_info(900, "admin");
    bot.platform
        .post(message(POST.get(), GENERAL, &author, "Pick your roles", start_time()));
    bot.member(MEMBER.get(), "member", &[]).await;
    bot
}

fn reaction(emoji: &str) -> ReactionEvent {
    ReactionEvent {
        channel_id: GENERAL,
        message_id: POST,
        emoji: emoji.into(),
        user: user_info(MEMBER.get(), "member"),
        in_guild: true,
    }
}

#[tokio::test]
async fn test_add_and_remove_reaction_toggles_role() {
    let bot = bot_with_post().await;
    let admin = bot.admin().await;

    let reply = bot.run(&admin, "rr add <#100> 7000 🎮 <@&60> no no").await;
    assert_eq!(reply_text(&reply), "Reaction role link has been created.");
    assert!(bot
        .platform
        .reactions_on(GENERAL, POST)
        .contains(&("🎮".to_string(), BOT_ID)));

    let outcome = handle_event(&bot.state, &Event::ReactionAdd(reaction("🎮"))).await;
    assert_eq!(outcome, EventOutcome::Handled);
    assert!(bot.has_role(MEMBER, PLAIN_ROLE));

    let outcome = handle_event(&bot.state, &Event::ReactionRemove(reaction("🎮"))).await;
    assert_eq!(outcome, EventOutcome::Handled);
    assert!(!bot.has_role(MEMBER, PLAIN_ROLE));
}

#[tokio::test]
async fn test_reverse_link_removes_role() {
    let bot = bot_with_post().await;
    let admin = bot.admin().await;
    bot.state
        .platform
        .add_role(MEMBER, PLAIN_ROLE)
        .await
        .unwrap();

    bot.run(&admin, "rr add <#100> 7000 🚫 <@&60> yes no").await;

    handle_event(&bot.state, &Event::ReactionAdd(reaction("🚫"))).await;
    assert!(!bot.has_role(MEMBER, PLAIN_ROLE));

    handle_event(&bot.state, &Event::ReactionRemove(reaction("🚫"))).await;
    assert!(bot.has_role(MEMBER, PLAIN_ROLE));
}

#[tokio::test]
async fn test_auto_remove_ignores_later_removal() {
    let bot = bot_with_post().await;
    let admin = bot.admin().await;
    bot.run(&admin, "rr add <#100> 7000 ✅ <@&60> no yes").await;

    bot.platform.react(GENERAL, POST, "✅", MEMBER);
    handle_event(&bot.state, &Event::ReactionAdd(reaction("✅"))).await;
    assert!(bot.has_role(MEMBER, PLAIN_ROLE));
    assert!(!bot
        .platform
        .reactions_on(GENERAL, POST)
        .contains(&("✅".to_string(), MEMBER)));

    // The platform reports the reaction removal the bot itself caused
    let outcome = handle_event(&bot.state, &Event::ReactionRemove(reaction("✅"))).await;
    assert_eq!(outcome, EventOutcome::Continue);
    assert!(bot.has_role(MEMBER, PLAIN_ROLE));
}

#[tokio::test]
async fn test_unlinked_and_bot_reactions_pass_through() {
    let bot = bot_with_post().await;
    let admin = bot.admin().await;
    bot.run(&admin, "rr add <#100> 7000 🎮 <@&60> no no").await;

    let outcome = handle_event(&bot.state, &Event::ReactionAdd(reaction("🍕"))).await;
    assert_eq!(outcome, EventOutcome::Continue);

    let mut from_bot = reaction("🎮");
    from_bot.user = user_info(BOT_ID.get(), "warden");
    from_bot.user.bot = true;
    let outcome = handle_event(&bot.state, &Event::ReactionAdd(from_bot)).await;
    assert_eq!(outcome, EventOutcome::Continue);
    assert!(!bot.has_role(BOT_ID, PLAIN_ROLE));
}

#[tokio::test]
async fn test_link_validation() {
    let bot = bot_with_post().await;
    let admin = bot.admin().await;
    bot.add_role(warden_common::RoleId(90), "Above Bot", 120);

    let reply = bot.run(&admin, "rr add <#100> 7001 🎮 <@&60> no no").await;
    assert_eq!(reply_text(&reply), "Invalid arguments: Message not found.");

    let reply = bot.run(&admin, "rr add <#100> 7000 🎮 <@&90> no no").await;
    assert_eq!(
        reply_text(&reply),
        "Link could not be created because <@&90> is not below my highest role."
    );

    bot.run(&admin, "rr add <#100> 7000 🎮 <@&60> no no").await;
    let reply = bot.run(&admin, "rr add <#100> 7000 🎮 <@&60> yes yes").await;
    assert_eq!(
        reply_text(&reply),
        "A link for this emoji on this message already exists."
    );
}

#[tokio::test]
async fn test_list_and_remove_links() {
    let bot = bot_with_post().await;
    let admin = bot.admin().await;
    bot.run(&admin, "rr add <#100> 7000 🎮 <@&60> yes yes").await;

    let reply = bot.run(&admin, "rr list <#100> 7000").await;
    assert_eq!(
        reply_text(&reply),
        "🎮 -> `@Gamer` (reversed, auto remove)"
    );

    let reply = bot.run(&admin, "rr list").await;
    assert_eq!(
        reply_text(&reply),
        "<#100>:\nhttps://discord.com/channels/1/100/7000 🎮"
    );

    let reply = bot.run(&admin, "rr remove <#100> 7000 🎮").await;
    assert_eq!(reply_text(&reply), "Reaction role link has been removed.");
    assert!(bot.platform.reactions_on(GENERAL, POST).is_empty());

    let reply = bot.run(&admin, "rr remove <#100> 7000 🎮").await;
    assert_eq!(reply_text(&reply), "Link not found.");
}

#[tokio::test]
async fn test_list_prunes_links_to_deleted_roles() {
    let bot = bot_with_post().await;
    let admin = bot.admin().await;
    bot.run(&admin, "rr add <#100> 7000 🎮 <@&60> no no").await;
    bot.platform.delete_role(PLAIN_ROLE);

    let reply = bot.run(&admin, "rr list").await;
    assert_eq!(reply_text(&reply), "No reaction role links have been created.");
    assert!(bot.state.store.reaction_roles(None).await.unwrap().is_empty());
}
