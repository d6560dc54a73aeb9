#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Shared fixtures for the WordParty client integration tests.
//!
//! [`MockTransport`] replays a script of server frames and records what the
//! client sends. The frame builders produce the exact JSON the game server
//! emits, integer success flags and `null` payloads included.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use wordparty_client::protocol::{Envelope, Identity, ServerEvent};
use wordparty_client::session::Session;
use wordparty_client::{codec, ClientError, ClientEvent, Command, StoredIdentity, Transport};

// ── MockTransport ───────────────────────────────────────────────────

/// One scripted `recv` result. `None` closes the connection cleanly.
pub type Scripted = Option<Result<String, ClientError>>;

/// Scripted transport. Once the script runs out `recv` never returns, so the
/// loop stays up until the test shuts it down.
pub struct MockTransport {
    incoming: VecDeque<Scripted>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn new(incoming: Vec<Scripted>) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            incoming: VecDeque::from(incoming),
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        (transport, sent, closed)
    }

    /// A transport that delivers `frames` in order and then stays open.
    pub fn scripted(frames: &[String]) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
        Self::new(frames.iter().cloned().map(|f| Some(Ok(f))).collect())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, frame: String) -> Result<(), ClientError> {
        self.sent.lock().unwrap().push(frame);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, ClientError>> {
        match self.incoming.pop_front() {
            Some(item) => item,
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

/// Decode everything the client sent so far.
pub fn sent_commands(sent: &Arc<StdMutex<Vec<String>>>) -> Vec<Command> {
    sent.lock()
        .unwrap()
        .iter()
        .map(|frame| codec::decode_command(frame.as_bytes()).unwrap())
        .collect()
}

// ── Event helpers ───────────────────────────────────────────────────

/// Receive events until one matches `pred`, failing after two seconds.
pub async fn wait_for(
    events: &mut mpsc::Receiver<ClientEvent>,
    mut pred: impl FnMut(&ClientEvent) -> bool,
) -> ClientEvent {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = events.recv().await.expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Drain every event until the channel closes.
pub async fn drain(events: &mut mpsc::Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut out = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout(Duration::from_secs(2), events.recv()).await {
        out.push(event);
    }
    out
}

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ── Server frames ───────────────────────────────────────────────────

fn success(code: &str, data: Value) -> String {
    json!({"s": 1, "c": code, "d": data}).to_string()
}

pub fn connect_start() -> String {
    success("CONNECT_START", Value::Null)
}

pub fn hello(uid: &str, name: &str) -> String {
    success("HELLO", json!({"uid": uid, "name": name, "group": null}))
}

/// Roster of `n` players `u1..un` named `p1..pn`; `u1` is the local client.
pub fn members(n: usize) -> Vec<(String, String)> {
    (1..=n).map(|i| (format!("u{i}"), format!("p{i}"))).collect()
}

fn member_values(members: &[(String, String)]) -> Value {
    Value::Array(
        members
            .iter()
            .map(|(uid, name)| json!({"uid": uid, "name": name}))
            .collect(),
    )
}

pub fn group_join(group: &str, members: &[(String, String)]) -> String {
    success(
        "GROUP_JOIN",
        json!({"name": group, "members": member_values(members)}),
    )
}

pub fn group_leave(members: &[(String, String)]) -> String {
    success("GROUP_LEAVE", json!({"members": member_values(members)}))
}

pub fn user_update(members: &[(String, String)]) -> String {
    success("USER_UPDATE", json!({"members": member_values(members)}))
}

/// `GAME_START` pairing `p1+p2`, `p3+p4`, ...
pub fn game_start(players: usize) -> String {
    let teams: Vec<Value> = (1..=players)
        .step_by(2)
        .map(|i| json!([{"name": format!("p{i}")}, {"name": format!("p{}", i + 1)}]))
        .collect();
    success("GAME_START", json!({"teams": teams, "cooldown": 5}))
}

pub fn round_start(round: u32) -> String {
    success(
        "ROUND_START",
        json!({"questioner": {"name": "p1"}, "answerer": {"name": "p2"}, "round": round}),
    )
}

pub fn questioner_start(words: &[&str]) -> String {
    success("QUESTIONER_START", json!({"words": words}))
}

pub fn answerer_start() -> String {
    success("ANSWERER_START", Value::Null)
}

pub fn correct_word(index: i64, word: &str) -> String {
    success("CORRECT_WORD", json!({"index": index, "word": word}))
}

pub fn round_end(words: &[(&str, bool)]) -> String {
    let words: Vec<Value> = words
        .iter()
        .map(|(word, scored)| json!({"word": word, "scored": scored}))
        .collect();
    success("ROUND_END", json!({"words": words, "cooldown": 3}))
}

pub fn chat(from: &str, message: &str) -> String {
    success(
        "CHAT_MESSAGE",
        json!({"user": {"name": from}, "message": message}),
    )
}

pub fn game_end(scores: &[u32]) -> String {
    let scores: Vec<Value> = scores
        .iter()
        .enumerate()
        .map(|(i, score)| json!({"team": [{"name": format!("t{i}a")}, {"name": format!("t{i}b")}], "score": score}))
        .collect();
    success("GAME_END", json!({"scores": scores}))
}

pub fn delete_group() -> String {
    success("DELETE_GROUP", Value::Null)
}

pub fn error(code: &str) -> String {
    json!({"s": 0, "c": code}).to_string()
}

// ── Session fixtures ────────────────────────────────────────────────

/// Feed `frames` to `session`, one transition each.
pub fn feed(session: &mut Session, frames: &[String]) {
    for frame in frames {
        session.receive(frame.as_bytes());
    }
}

/// A session that completed the handshake as `u1`/`p1`.
pub fn lobby_session() -> Session {
    let mut session = Session::new(StoredIdentity::default());
    session.connect().unwrap();
    feed(&mut session, &[connect_start(), hello("u1", "p1")]);
    session
}

/// A session in group `g` with `n` members.
pub fn group_session(n: usize) -> Session {
    let mut session = lobby_session();
    feed(&mut session, &[group_join("g", &members(n))]);
    session
}

/// A session in a running game with a round in progress.
pub fn game_session() -> Session {
    let mut session = group_session(4);
    feed(&mut session, &[game_start(4), round_start(1)]);
    session
}

pub fn ok(event: ServerEvent) -> Envelope {
    Envelope::Success(event)
}

pub fn me() -> Identity {
    Identity::new("u1", "p1")
}
