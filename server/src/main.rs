//! Warden - Local Console
//!
//! Runs the moderation core against the in-memory platform. Every line read
//! from stdin is handled as a guild message written by the configured owner
//! and the reply is printed as JSON.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use warden_common::{ChannelId, ChannelInfo, MemberInfo, MessageId, MessageInfo, UserId, UserInfo};
use warden_server::commands::handle_message;
use warden_server::config::Config;
use warden_server::db::open_store;
use warden_server::events::{handle_event, Event};
use warden_server::observability::init_tracing;
use warden_server::platform::memory::InMemoryPlatform;
use warden_server::runtime::Runtime;
use warden_server::state::AppState;

const CONSOLE_GUILD: i64 = 1;
const CONSOLE_CHANNEL: ChannelId = ChannelId(2);
const BOT_ID: UserId = UserId(3);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    init_tracing(&config);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Warden console");

    let store = open_store(config.database_url.as_deref()).await?;
    let owner = UserInfo {
        id: config.owner_id,
        name: "owner".to_string(),
        bot: false,
    };
    let platform = Arc::new(InMemoryPlatform::new(
        CONSOLE_GUILD,
        UserInfo {
            id: BOT_ID,
            name: "warden".to_string(),
            bot: true,
        },
        owner.id,
    ));
    platform.add_member(MemberInfo {
        user: owner.clone(),
        nick: None,
        roles: Vec::new(),
        administrator: true,
        top_role_position: 0,
        joined_at: Some(Utc::now()),
    });
    platform.add_channel(
        ChannelInfo {
            id: CONSOLE_CHANNEL,
            name: "console".to_string(),
        },
        true,
        true,
    );

    let state = Arc::new(AppState::with_system_clock(config, store, platform));
    let runtime = Runtime::new(Arc::clone(&state));
    runtime.mark_ready().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut next_id = 1_i64;
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal, cleaning up...");
                None
            }
        };
        let Some(line) = line else { break };

        let message = MessageInfo {
            id: MessageId(next_id),
            channel_id: CONSOLE_CHANNEL,
            author: owner.clone(),
            content: line,
            created_at: Utc::now(),
            attachments: Vec::new(),
            in_guild: true,
        };
        next_id += 1;

        handle_event(&state, &Event::Message(message.clone())).await;
        if let Some(reply) = handle_message(&state, &message).await {
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
    }

    runtime.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}
