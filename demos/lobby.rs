//! # Lobby demo
//!
//! Connects to a WordParty server, joins a group and prints a render plan for
//! every state change until Ctrl+C or disconnect.
//!
//! ```sh
//! WORDPARTY_URL=ws://localhost:8080/ws \
//! WORDPARTY_NAME=Ann \
//! WORDPARTY_GROUP=room1 \
//! cargo run --example lobby
//! ```
//!
//! Without `WORDPARTY_GROUP` the server picks a fresh group.

use wordparty_client::session::LifecycleState;
use wordparty_client::{
    render_plan, ClientConfig, ClientEvent, GameClient, StoredIdentity, WebSocketTransport,
};

const DEFAULT_URL: &str = "ws://localhost:8080/ws";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let url = std::env::var("WORDPARTY_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let mut identity = StoredIdentity::default();
    if let Ok(group) = std::env::var("WORDPARTY_GROUP") {
        identity = identity.with_invite_group(group);
    }
    let mut config = ClientConfig::new().with_identity(identity.clone());
    if let Ok(name) = std::env::var("WORDPARTY_NAME") {
        config = config.with_player_name(name);
    }

    tracing::info!("connecting to {url}");
    let transport = WebSocketTransport::connect(&url).await?;
    let (mut client, mut events) = GameClient::start(transport, config);
    let mut asked_for_group = false;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    ClientEvent::Connected => tracing::info!("transport up, waiting for server"),
                    ClientEvent::StateChanged(snapshot) => {
                        let plan = render_plan(&snapshot, None);
                        println!("── {} ({})", plan.status, snapshot.lifecycle);
                        if let Some(title) = &plan.group_title {
                            println!("{title}");
                        }
                        for line in &plan.roster {
                            let marker = if line.is_self { " (you)" } else { "" };
                            println!("  {}. {}{marker}", line.position, line.name);
                        }
                        for row in &plan.teams {
                            let [first, second] = &row.players;
                            println!("  {}: {first} + {second}", row.label);
                        }
                        if !plan.words.is_empty() {
                            let words: Vec<_> = plan.words.iter().map(|w| w.text.as_str()).collect();
                            println!("  words: {}", words.join(" | "));
                        }
                        if let Some(line) = plan.chat.last() {
                            println!("  {line}");
                        }

                        // No invite: ask the server for a fresh group once.
                        if snapshot.lifecycle == LifecycleState::InLobby
                            && identity.invite_group.is_none()
                            && !asked_for_group
                        {
                            asked_for_group = true;
                            client.join_group(None)?;
                        }
                    }
                    ClientEvent::ServerError { code, message } => {
                        tracing::warn!(code = code.as_str(), "{message}");
                    }
                    ClientEvent::IntentRejected(reason) => tracing::warn!("{reason}"),
                    ClientEvent::Disconnected { clean, reason } => {
                        tracing::info!(clean, "disconnected: {}", reason.as_deref().unwrap_or("-"));
                        break;
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C, shutting down");
                client.shutdown().await;
                break;
            }
        }
    }

    Ok(())
}
