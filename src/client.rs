//! Async driver for the WordParty session.
//!
//! [`GameClient`] is a thin handle over a background transport loop. The loop
//! owns the [`Session`] and is the only place it is mutated: inbound frames
//! and queued [`Intent`]s are applied one at a time, each to completion, in
//! the order they are picked up. Results come back as [`ClientEvent`]s on a
//! bounded channel returned from [`GameClient::start`].
//!
//! # Example
//!
//! ```rust,ignore
//! let transport = WebSocketTransport::connect("ws://localhost:8080/ws").await?;
//! let config = ClientConfig::new().with_player_name("Ann");
//! let (client, mut events) = GameClient::start(transport, config);
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         ClientEvent::StateChanged(snapshot) if snapshot.lifecycle == LifecycleState::InLobby => {
//!             client.join_group(None)?;
//!         }
//!         ClientEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, error, info, warn};

use crate::codec;
use crate::error::{ClientError, Result};
use crate::event::ClientEvent;
use crate::identity::StoredIdentity;
use crate::protocol::Command;
use crate::session::{Intent, Outcome, Session, SessionSnapshot};
use crate::transport::Transport;

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default time [`GameClient::shutdown`] waits for the loop to exit.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default number of chat lines kept in the session.
const DEFAULT_CHAT_HISTORY_LIMIT: usize = 200;

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`GameClient`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use wordparty_client::client::ClientConfig;
/// use wordparty_client::identity::StoredIdentity;
///
/// let config = ClientConfig::new()
///     .with_player_name("Ann")
///     .with_identity(StoredIdentity::default().with_invite_group("room1"))
///     .with_shutdown_timeout(Duration::from_millis(250));
/// assert_eq!(config.event_channel_capacity, 256);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Name proposed in `NEW_CONNECT`. The server picks one when absent.
    pub player_name: Option<String>,
    /// Resume token and invite group.
    pub identity: StoredIdentity,
    /// Capacity of the event channel. Clamped to at least 1.
    pub event_channel_capacity: usize,
    pub shutdown_timeout: Duration,
    /// Oldest chat lines beyond this many are dropped. Clamped to at least 1.
    pub chat_history_limit: usize,
}

impl ClientConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self {
            player_name: None,
            identity: StoredIdentity::default(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            chat_history_limit: DEFAULT_CHAT_HISTORY_LIMIT,
        }
    }

    #[must_use]
    pub fn with_player_name(mut self, name: impl Into<String>) -> Self {
        self.player_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_identity(mut self, identity: StoredIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Set the event channel capacity. Zero is clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set how many chat lines are kept. Zero is clamped to 1.
    #[must_use]
    pub fn with_chat_history_limit(mut self, limit: usize) -> Self {
        self.chat_history_limit = limit.max(1);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ── Shared state ────────────────────────────────────────────────────

/// State readable from the handle while the loop runs.
struct ClientState {
    connected: AtomicBool,
    snapshot: Mutex<SessionSnapshot>,
}

// ── Client handle ───────────────────────────────────────────────────

/// Handle to a running WordParty session.
///
/// User actions are queued as [`Intent`]s and return as soon as they are
/// queued. The loop validates them against the session; rejected ones come
/// back as [`ClientEvent::IntentRejected`] and are never sent.
pub struct GameClient {
    cmd_tx: mpsc::UnboundedSender<Intent>,
    state: Arc<ClientState>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl GameClient {
    /// Start the session over a connected `transport`.
    ///
    /// The server speaks first (`CONNECT_START`); nothing is sent until then.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start(
        transport: impl Transport,
        config: ClientConfig,
    ) -> (Self, mpsc::Receiver<ClientEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Intent>();
        let (event_tx, event_rx) = mpsc::channel::<ClientEvent>(config.event_channel_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let session = Session::new(config.identity).with_preferred_name(config.player_name);
        let state = Arc::new(ClientState {
            connected: AtomicBool::new(true),
            snapshot: Mutex::new(session.snapshot()),
        });

        let task = tokio::spawn(transport_loop(
            transport,
            session,
            LoopChannels {
                cmd_rx,
                event_tx,
                shutdown_rx,
            },
            Arc::clone(&state),
            config.chat_history_limit.max(1),
        ));

        let client = Self {
            cmd_tx,
            state,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };
        (client, event_rx)
    }

    // ── Actions ─────────────────────────────────────────────────────

    /// Join `group`, or a fresh group chosen by the server when `None`.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] once the connection has ended.
    pub fn join_group(&self, group: Option<String>) -> Result<()> {
        self.submit(Intent::JoinGroup { group })
    }

    /// Leave the current group.
    pub fn leave_group(&self) -> Result<()> {
        self.submit(Intent::LeaveGroup)
    }

    /// Ask the server to rename this client.
    pub fn edit_name(&self, name: impl Into<String>) -> Result<()> {
        self.submit(Intent::EditUser { name: name.into() })
    }

    /// Start the game for the current group.
    pub fn start_game(&self) -> Result<()> {
        self.submit(Intent::StartGame)
    }

    /// Send a chat line (answerers guess this way).
    pub fn send_chat(&self, message: impl Into<String>) -> Result<()> {
        self.submit(Intent::Chat {
            message: message.into(),
        })
    }

    /// Change the round count and/or word list before the game starts.
    pub fn edit_game(&self, round_count: Option<u8>, wordlist: Option<Vec<String>>) -> Result<()> {
        self.submit(Intent::EditGame {
            round_count,
            wordlist,
        })
    }

    /// Queue any [`Intent`].
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] once the connection has ended.
    pub fn submit(&self, intent: Intent) -> Result<()> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        self.cmd_tx
            .send(intent)
            .map_err(|_| ClientError::NotConnected)
    }

    /// Close the session gracefully.
    ///
    /// Sends `CLOSE_CONNECTION` if the server knows this client, closes the
    /// transport and waits up to the configured timeout for the loop to
    /// finish before aborting it.
    pub async fn shutdown(&mut self) {
        debug!("GameClient: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => warn!("transport loop ended with join error: {join_err}"),
                Err(_) => {
                    warn!("transport loop did not exit in time, aborting");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("transport loop aborted: {join_err}");
                    }
                }
            }
        }

        self.state.connected.store(false, Ordering::Release);
    }

    // ── State ───────────────────────────────────────────────────────

    /// Whether the connection is believed to be up.
    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::Acquire)
    }

    /// The most recent session snapshot.
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot.lock().await.clone()
    }
}

impl std::fmt::Debug for GameClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameClient")
            .field("connected", &self.is_connected())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for GameClient {
    fn drop(&mut self) {
        // No executor to drive a graceful close here.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Transport loop ──────────────────────────────────────────────────

struct LoopChannels {
    cmd_rx: mpsc::UnboundedReceiver<Intent>,
    event_tx: mpsc::Sender<ClientEvent>,
    shutdown_rx: oneshot::Receiver<()>,
}

/// How the loop ended.
struct Ending {
    clean: bool,
    reason: Option<String>,
}

/// Drive `session` from the transport and the intent queue until the
/// connection ends.
async fn transport_loop(
    mut transport: impl Transport,
    mut session: Session,
    channels: LoopChannels,
    state: Arc<ClientState>,
    chat_history_limit: usize,
) {
    let LoopChannels {
        mut cmd_rx,
        event_tx,
        mut shutdown_rx,
    } = channels;

    debug!("transport loop started");
    if let Err(e) = session.connect() {
        error!("session could not start: {e}");
    }
    session.transport_opened();
    emit_event(&event_tx, ClientEvent::Connected);
    publish(session.snapshot(), &state, &event_tx).await;

    let ending = loop {
        tokio::select! {
            intent = cmd_rx.recv() => {
                let Some(intent) = intent else {
                    debug!("intent channel closed");
                    if let Err(e) = transport.close().await {
                        debug!("transport close failed: {e}");
                    }
                    break Ending { clean: true, reason: Some("client dropped".into()) };
                };
                let before = state.snapshot.lock().await.clone();
                match session.intent(intent) {
                    Ok(command) => {
                        if let Err(e) = send_commands(&mut transport, &[command]).await {
                            error!("transport send error: {e}");
                            break Ending { clean: false, reason: Some(e.to_string()) };
                        }
                        if session.snapshot() != before {
                            publish(session.snapshot(), &state, &event_tx).await;
                        }
                    }
                    Err(rejected) => {
                        info!("intent rejected: {rejected}");
                        emit_event(&event_tx, ClientEvent::IntentRejected(rejected));
                    }
                }
            }

            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                if session.identity().is_some() {
                    if let Err(e) = send_commands(&mut transport, &[Command::CloseConnection {}]).await {
                        debug!("could not send CLOSE_CONNECTION: {e}");
                    }
                }
                if let Err(e) = transport.close().await {
                    debug!("transport close failed: {e}");
                }
                break Ending { clean: true, reason: Some("client shut down".into()) };
            }

            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(frame)) => {
                        let transition = session.receive(frame.as_bytes());
                        if let Err(e) = send_commands(&mut transport, &transition.outbound).await {
                            error!("transport send error: {e}");
                            break Ending { clean: false, reason: Some(e.to_string()) };
                        }
                        match transition.outcome {
                            Outcome::Changed => {
                                session.trim_chat(chat_history_limit);
                                publish(session.snapshot(), &state, &event_tx).await;
                            }
                            Outcome::ServerError(_) => {
                                if let Some(code) = session.take_pending_error() {
                                    emit_event(&event_tx, ClientEvent::ServerError {
                                        code,
                                        message: code.description(),
                                    });
                                }
                            }
                            Outcome::Unchanged | Outcome::Dropped(_) | Outcome::Undecodable => {}
                        }
                    }
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        break Ending { clean: false, reason: Some(e.to_string()) };
                    }
                    None => {
                        info!("connection closed by server");
                        break Ending { clean: true, reason: None };
                    }
                }
            }
        }
    };

    session.transport_closed(ending.clean);
    publish(session.snapshot(), &state, &event_tx).await;
    emit_disconnected(&event_tx, &state, ending).await;
    debug!("transport loop exited");
}

/// Encode and send `commands` in order.
///
/// A command that fails to encode is logged and skipped.
async fn send_commands(transport: &mut impl Transport, commands: &[Command]) -> Result<()> {
    for command in commands {
        let frame = match codec::encode(command) {
            Ok(frame) => frame,
            Err(e) => {
                error!(command = command.name(), "failed to encode command: {e}");
                continue;
            }
        };
        debug!(command = command.name(), "sending");
        transport.send(frame).await?;
    }
    Ok(())
}

/// Store the current snapshot for the handle and hand a copy to the front end.
async fn publish(
    snapshot: SessionSnapshot,
    state: &ClientState,
    event_tx: &mpsc::Sender<ClientEvent>,
) {
    *state.snapshot.lock().await = snapshot.clone();
    emit_event(event_tx, ClientEvent::StateChanged(Box::new(snapshot)));
}

/// Emit an event without blocking the loop. A full channel drops the event.
fn emit_event(event_tx: &mpsc::Sender<ClientEvent>, event: ClientEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!(
                "event channel full, dropping event: {:?}",
                std::mem::discriminant(&dropped)
            );
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Emit [`ClientEvent::Disconnected`]. It is the last event, so it waits for
/// room in the channel instead of being dropped.
async fn emit_disconnected(event_tx: &mpsc::Sender<ClientEvent>, state: &ClientState, ending: Ending) {
    state.connected.store(false, Ordering::Release);
    let event = ClientEvent::Disconnected {
        clean: ending.clean,
        reason: ending.reason,
    };
    if event_tx.send(event).await.is_err() {
        debug!("event channel closed, receiver dropped");
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// A transport whose `close` never finishes.
    struct HangingCloseTransport {
        dropped: Arc<AtomicBool>,
    }

    impl Drop for HangingCloseTransport {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::Release);
        }
    }

    #[async_trait]
    impl Transport for HangingCloseTransport {
        async fn send(&mut self, _frame: String) -> Result<()> {
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<String>> {
            std::future::pending().await
        }

        async fn close(&mut self) -> Result<()> {
            std::future::pending().await
        }
    }

    /// A transport that never receives and records `close`.
    struct RecordingCloseTransport {
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Transport for RecordingCloseTransport {
        async fn send(&mut self, _frame: String) -> Result<()> {
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<String>> {
            std::future::pending().await
        }

        async fn close(&mut self) -> Result<()> {
            self.closed.store(true, Ordering::Release);
            Err(ClientError::TransportClosed)
        }
    }

    #[test]
    fn config_defaults() {
        let config = ClientConfig::default();
        assert!(config.player_name.is_none());
        assert_eq!(config.identity, StoredIdentity::default());
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
        assert_eq!(config.chat_history_limit, 200);
    }

    #[test]
    fn zero_limits_are_clamped() {
        let config = ClientConfig::new()
            .with_event_channel_capacity(0)
            .with_chat_history_limit(0);
        assert_eq!(config.event_channel_capacity, 1);
        assert_eq!(config.chat_history_limit, 1);
    }

    fn assert_send<F: std::future::Future + Send>(_: &F) {}

    #[test]
    fn transport_loop_can_be_spawned() {
        let (_cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, _event_rx) = mpsc::channel(1);
        let (_shutdown_tx, shutdown_rx) = oneshot::channel();
        let session = Session::new(StoredIdentity::default());
        let state = Arc::new(ClientState {
            connected: AtomicBool::new(true),
            snapshot: Mutex::new(session.snapshot()),
        });
        let transport = HangingCloseTransport {
            dropped: Arc::new(AtomicBool::new(false)),
        };

        let looped = transport_loop(
            transport,
            session,
            LoopChannels {
                cmd_rx,
                event_tx,
                shutdown_rx,
            },
            state,
            10,
        );
        assert_send(&looped);
    }

    #[tokio::test]
    async fn closed_intent_queue_closes_the_transport() {
        let closed = Arc::new(AtomicBool::new(false));
        let transport = RecordingCloseTransport {
            closed: Arc::clone(&closed),
        };
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, mut events) = mpsc::channel(16);
        let (_shutdown_tx, shutdown_rx) = oneshot::channel();
        let session = Session::new(StoredIdentity::default());
        let state = Arc::new(ClientState {
            connected: AtomicBool::new(true),
            snapshot: Mutex::new(session.snapshot()),
        });

        drop(cmd_tx);
        tokio::time::timeout(
            Duration::from_secs(2),
            transport_loop(
                transport,
                session,
                LoopChannels {
                    cmd_rx,
                    event_tx,
                    shutdown_rx,
                },
                Arc::clone(&state),
                10,
            ),
        )
        .await
        .expect("loop must end once the intent queue closes");

        let mut last = None;
        while let Some(event) = events.recv().await {
            last = Some(event);
        }
        assert!(matches!(
            last,
            Some(ClientEvent::Disconnected { clean: true, .. })
        ));
        assert!(closed.load(Ordering::Acquire));
        assert!(!state.connected.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn shutdown_aborts_a_stuck_transport() {
        let dropped = Arc::new(AtomicBool::new(false));
        let transport = HangingCloseTransport {
            dropped: Arc::clone(&dropped),
        };
        let config = ClientConfig::new().with_shutdown_timeout(Duration::from_millis(50));
        let (mut client, _events) = GameClient::start(transport, config);

        tokio::time::timeout(Duration::from_secs(2), client.shutdown())
            .await
            .expect("shutdown must honour its timeout");
        assert!(dropped.load(Ordering::Acquire));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn debug_shows_connection_state() {
        let dropped = Arc::new(AtomicBool::new(false));
        let (client, _events) = GameClient::start(
            HangingCloseTransport { dropped },
            ClientConfig::new(),
        );
        let debug = format!("{client:?}");
        assert!(debug.contains("GameClient"));
        assert!(debug.contains("connected: true"));
    }
}
