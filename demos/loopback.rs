//! # Loopback demo
//!
//! Plays a short scripted game against an in-process fake server, showing how
//! to implement [`Transport`] over channels and how the session reacts to the
//! server's pushes.
//!
//! ```sh
//! RUST_LOG=debug cargo run --example loopback
//! ```

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;
use wordparty_client::session::{GamePhase, Role};
use wordparty_client::{
    codec, render_plan, ClientConfig, ClientError, ClientEvent, Command, GameClient,
    LifecycleState, Transport,
};

type DemoResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Client half of an in-process connection.
struct LoopbackTransport {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

/// Server half: reads client frames, pushes server frames.
struct FakeServer {
    rx: mpsc::UnboundedReceiver<String>,
    tx: mpsc::UnboundedSender<String>,
}

fn loopback_pair() -> (LoopbackTransport, FakeServer) {
    let (client_tx, server_rx) = mpsc::unbounded_channel();
    let (server_tx, client_rx) = mpsc::unbounded_channel();
    (
        LoopbackTransport {
            tx: client_tx,
            rx: client_rx,
        },
        FakeServer {
            rx: server_rx,
            tx: server_tx,
        },
    )
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&mut self, frame: String) -> Result<(), ClientError> {
        self.tx
            .send(frame)
            .map_err(|e| ClientError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, ClientError>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        self.rx.close();
        Ok(())
    }
}

impl FakeServer {
    fn push(&self, code: &str, data: serde_json::Value) -> DemoResult<()> {
        self.tx.send(json!({"s": 1, "c": code, "d": data}).to_string())?;
        Ok(())
    }

    async fn expect(&mut self) -> DemoResult<Command> {
        let frame = self.rx.recv().await.ok_or("client went away")?;
        let command = codec::decode_command(frame.as_bytes())?;
        tracing::info!(command = command.name(), "server received");
        Ok(command)
    }

    /// Walk one client through a lobby, a round and the end of the game.
    async fn run(mut self) -> DemoResult<()> {
        let roster = json!([
            {"uid": "u1", "name": "Ann"},
            {"uid": "u2", "name": "Bob"},
            {"uid": "u3", "name": "Cid"},
            {"uid": "u4", "name": "Dee"},
        ]);

        self.push("CONNECT_START", serde_json::Value::Null)?;
        let Command::NewConnect { name } = self.expect().await? else {
            return Err("expected NEW_CONNECT".into());
        };
        let name = name.unwrap_or_else(|| "Ann".into());
        self.push("HELLO", json!({"uid": "u1", "name": name}))?;

        self.expect().await?; // JOIN_GROUP
        self.push("GROUP_JOIN", json!({"name": "demo", "members": roster}))?;

        self.expect().await?; // GAME_START
        self.push(
            "GAME_START",
            json!({"teams": [[{"name": "Ann"}, {"name": "Bob"}], [{"name": "Cid"}, {"name": "Dee"}]]}),
        )?;
        self.push("ROUND_START", json!({"questioner": {"name": "Bob"}, "answerer": {"name": "Ann"}, "round": 1}))?;
        self.push("ANSWERER_START", serde_json::Value::Null)?;

        self.expect().await?; // CHAT_MESSAGE guess
        self.push("CORRECT_WORD", json!({"index": 0, "word": "kite"}))?;
        self.push("ROUND_END", json!({"words": [["kite", true], ["moon", false], ["fish", false], ["rain", false], ["lamp", false]]}))?;
        self.push("GAME_END", json!({"scores": [{"team": [{"name": "Ann"}, {"name": "Bob"}], "score": 1}]}))?;

        // Client shutdown sends CLOSE_CONNECTION.
        self.expect().await?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> DemoResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (transport, server) = loopback_pair();
    let server = tokio::spawn(server.run());

    let (mut client, mut events) =
        GameClient::start(transport, ClientConfig::new().with_player_name("Ann"));

    while let Some(event) = events.recv().await {
        let snapshot = match event {
            ClientEvent::StateChanged(snapshot) => snapshot,
            other => {
                tracing::info!("{other:?}");
                continue;
            }
        };
        let plan = render_plan(&snapshot, None);
        let words: Vec<_> = plan.words.iter().map(|w| w.text.as_str()).collect();
        println!("{:<12} {:<9?} words=[{}]", snapshot.lifecycle.as_str(), snapshot.game.phase, words.join(", "));

        match snapshot.lifecycle {
            LifecycleState::InLobby if snapshot.group.group_id.is_none() => {
                client.join_group(Some("demo".into()))?;
            }
            LifecycleState::InGroup if plan.start_enabled => {
                client.start_game()?;
            }
            _ => {}
        }
        match snapshot.game.role {
            Role::Answerer
                if snapshot.game.phase == GamePhase::RoundActive
                    && snapshot.game.words.iter().all(|w| !w.revealed) =>
            {
                client.send_chat("kite")?;
            }
            _ => {}
        }
        if snapshot.game.phase == GamePhase::Finished {
            break;
        }
    }

    client.shutdown().await;
    server.await??;
    Ok(())
}
