//! Role slots, delegated role assignment and autoroles.
//!
//! Run with: `cargo test --test roles_test`

mod helpers;

use helpers::{reply_text, TestBot, MUTE_ROLE, PLAIN_ROLE};
use warden_common::{RoleId, UserId};
use warden_server::db::AuthorizationEdge;
use warden_server::events::{handle_event, Event};
use warden_server::reply::ACK;
use warden_server::roles::{authorize, is_authorized, revoke, DelegationError};

const SOURCE_ROLE: RoleId = RoleId(70);
const TARGET_ROLE: RoleId = RoleId(71);

async fn delegation_bot() -> TestBot {
    let bot = TestBot::new().await;
    bot.add_role(SOURCE_ROLE, "Event Team", 9);
    bot.add_role(TARGET_ROLE, "Event Participant", 2);
    bot
}

// ============================================================================
// Delegation graph
// ============================================================================

#[tokio::test]
async fn test_authorization_via_role_and_revoke() {
    let bot = delegation_bot().await;
    let edge = AuthorizationEdge {
        source_id: SOURCE_ROLE.get(),
        target_role: TARGET_ROLE,
    };
    authorize(&bot.state, edge).await.unwrap();

    let subject = UserId(42);
    assert!(is_authorized(&bot.state, subject, &[SOURCE_ROLE], TARGET_ROLE)
        .await
        .unwrap());
    assert!(!is_authorized(&bot.state, subject, &[PLAIN_ROLE], TARGET_ROLE)
        .await
        .unwrap());
    assert!(!is_authorized(&bot.state, subject, &[SOURCE_ROLE], PLAIN_ROLE)
        .await
        .unwrap());

    assert!(matches!(
        authorize(&bot.state, edge).await,
        Err(DelegationError::AlreadyExists)
    ));

    revoke(&bot.state, edge).await.unwrap();
    assert!(!is_authorized(&bot.state, subject, &[SOURCE_ROLE], TARGET_ROLE)
        .await
        .unwrap());
    assert!(matches!(
        revoke(&bot.state, edge).await,
        Err(DelegationError::NotFound)
    ));
}

#[tokio::test]
async fn test_authorization_via_user_id() {
    let bot = delegation_bot().await;
    authorize(
        &bot.state,
        AuthorizationEdge {
            source_id: 42,
            target_role: TARGET_ROLE,
        },
    )
    .await
    .unwrap();

    assert!(is_authorized(&bot.state, UserId(42), &[], TARGET_ROLE)
        .await
        .unwrap());
    assert!(!is_authorized(&bot.state, UserId(43), &[], TARGET_ROLE)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_delegated_role_commands() {
    let bot = delegation_bot().await;
    let admin = bot.admin().await;
    let organizer = bot.member(300, "organizer", &[SOURCE_ROLE]).await;
    let organizer = bot.ctx(&organizer.user);
    let outsider = bot.member(301, "outsider", &[]).await;
    let outsider = bot.ctx(&outsider.user);
    bot.member(302, "participant", &[]).await;

    let reply = bot.run(&admin, "roles auth add <@&70> <@&71>").await;
    assert_eq!(reply_text(&reply), "Authorization has been created.");
    let reply = bot.run(&admin, "roles auth add <@&70> <@&71>").await;
    assert_eq!(reply_text(&reply), "This authorization already exists.");

    let reply = bot.run(&organizer, "roles add <@302> <@&71>").await;
    assert_eq!(reply.reaction.as_deref(), Some(ACK));
    assert!(bot.has_role(UserId(302), TARGET_ROLE));

    let reply = bot.run(&outsider, "roles remove <@302> <@&71>").await;
    assert_eq!(
        reply_text(&reply),
        "You are not authorized to manage role 71"
    );
    assert!(bot.has_role(UserId(302), TARGET_ROLE));

    let reply = bot.run(&organizer, "roles remove <@302> <@&71>").await;
    assert_eq!(reply.reaction.as_deref(), Some(ACK));
    assert!(!bot.has_role(UserId(302), TARGET_ROLE));

    bot.run(&admin, "roles auth remove <@&70> <@&71>").await;
    let reply = bot.run(&organizer, "roles add <@302> <@&71>").await;
    assert_eq!(
        reply_text(&reply),
        "You are not authorized to manage role 71"
    );
}

#[tokio::test]
async fn test_auth_list_prunes_dead_edges() {
    let bot = delegation_bot().await;
    let admin = bot.admin().await;
    bot.member(300, "organizer", &[]).await;

    bot.run(&admin, "roles auth add <@&70> <@&71>").await;
    bot.run(&admin, "roles auth add <@300> <@&71>").await;

    let reply = bot.run(&admin, "roles auth").await;
    let embed = reply.as_embed().expect("embed");
    assert_eq!(
        embed.field_value("Role authorizations"),
        Some(":small_orange_diamond: <@&70> -> <@&71>")
    );
    assert_eq!(
        embed.field_value("User authorizations"),
        Some(":small_orange_diamond: <@300> -> <@&71>")
    );

    bot.platform.delete_role(TARGET_ROLE);
    let reply = bot.run(&admin, "roles auth").await;
    assert_eq!(reply_text(&reply), "No authorizations have been created.");
    assert!(bot.state.store.edges().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_auth_commands_are_admin_only() {
    let bot = delegation_bot().await;
    let member = bot.member(300, "member", &[SOURCE_ROLE]).await;
    let member = bot.ctx(&member.user);

    let reply = bot.run(&member, "roles auth add <@&70> <@&71>").await;
    assert_eq!(
        reply_text(&reply),
        "This command is reserved for administrators"
    );
}

// ============================================================================
// Slots
// ============================================================================

#[tokio::test]
async fn test_bind_slot() {
    let bot = TestBot::new().await;
    let admin = bot.admin().await;
    bot.add_role(RoleId(80), "New Heads", 35);

    let reply = bot.run(&admin, "roles head <@&80>").await;
    assert_eq!(reply_text(&reply), "Role has been set.");

    let head = bot.member(301, "new head", &[RoleId(80)]).await;
    assert_eq!(
        bot.state.level_of(head.id()).await.unwrap(),
        warden_server::permissions::RoleLevel::Head
    );
    assert!(bot
        .changelog()
        .iter()
        .any(|line| line == "The `head` role has been set to New Heads (80)."));

    let reply = bot.run(&admin, "roles").await;
    let embed = reply.as_embed().expect("embed");
    assert_eq!(embed.field_value("head"), Some("<@&80>"));
    assert_eq!(embed.field_value("mute"), Some(&*format!("<@&{MUTE_ROLE}>")));
}

#[tokio::test]
async fn test_mute_slot_must_be_below_bot() {
    let bot = TestBot::new().await;
    let admin = bot.admin().await;
    bot.add_role(RoleId(81), "Too High", 100);

    let reply = bot.run(&admin, "roles mute <@&81>").await;
    assert_eq!(
        reply_text(&reply),
        "Role could not be set because <@&81> is not below my highest role."
    );
}

#[tokio::test]
async fn test_list_members_of_role() {
    let bot = TestBot::new().await;
    let admin = bot.admin().await;
    bot.member(300, "alice", &[PLAIN_ROLE]).await;
    bot.member(301, "bob", &[]).await;

    let reply = bot.run(&admin, "roles list <@&60>").await;
    assert_eq!(
        reply_text(&reply),
        ":small_orange_diamond: <@300> (`@alice`)"
    );
}

// ============================================================================
// Autorole
// ============================================================================

#[tokio::test]
async fn test_autorole_granted_on_join() {
    let bot = TestBot::new().await;
    let admin = bot.admin().await;

    let reply = bot.run(&admin, "autorole add <@&60>").await;
    assert_eq!(reply_text(&reply), "Autorole has been added.");
    let reply = bot.run(&admin, "autorole add <@&60>").await;
    assert_eq!(reply_text(&reply), "This role is already an autorole.");

    let newcomer = bot.member(400, "newcomer", &[]).await;
    handle_event(&bot.state, &Event::MemberJoin(newcomer)).await;
    assert!(bot.has_role(UserId(400), PLAIN_ROLE));

    let reply = bot.run(&admin, "autorole").await;
    assert_eq!(reply_text(&reply), ":small_orange_diamond: <@&60>");

    let reply = bot.run(&admin, "autorole remove <@&60>").await;
    assert_eq!(reply_text(&reply), "Autorole has been removed.");
    let reply = bot.run(&admin, "autorole remove <@&60>").await;
    assert_eq!(reply_text(&reply), "This role is not an autorole.");
}

#[tokio::test]
async fn test_autorole_list_prunes_deleted_roles() {
    let bot = TestBot::new().await;
    let admin = bot.admin().await;
    bot.run(&admin, "autorole add <@&60>").await;
    bot.platform.delete_role(PLAIN_ROLE);

    let reply = bot.run(&admin, "autorole").await;
    assert_eq!(reply_text(&reply), "No autoroles have been configured.");
    assert!(bot.state.store.auto_roles().await.unwrap().is_empty());
}
