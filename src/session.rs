//! Session state machine for the WordParty client.
//!
//! [`Session`] is the single owner of the local view of the world: the
//! connection lifecycle, this client's [`Identity`], the group roster and the
//! game in progress. It performs no I/O. The driver feeds it
//! transport callbacks and decoded envelopes, sends whatever [`Command`]s a
//! [`Transition`] carries, and hands [`SessionSnapshot`]s to the renderer.
//!
//! # Lifecycle
//!
//! ```text
//! DISCONNECTED ─connect─> CONNECTING ─CONNECT_START─> HANDSHAKING ─HELLO─> IN_LOBBY
//!                                                                           │   ▲
//!                                                          GROUP_JOIN       │   │ leave / DELETE_GROUP
//!                                                                           ▼   │
//!                                                   IN_GAME <─GAME_START── IN_GROUP
//!
//! any state ──transport closed──> DISCONNECTED
//! ```
//!
//! Events that arrive in the wrong lifecycle state are protocol violations:
//! they are logged and dropped without touching any state. Server error
//! envelopes only fill the ephemeral pending-error slot.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::codec;
use crate::error_codes::ErrorCode;
use crate::identity::IdentityStore;
use crate::protocol::{
    ChatEntry, Command, Envelope, EventCode, Identity, RoundStartPayload, ServerEvent, TeamPair,
    TeamScore, WordEntry,
};

/// Smallest group that may start a game (two teams of two).
pub const MIN_START_MEMBERS: usize = 4;

/// Number of words the server deals per round.
pub const ROUND_WORD_COUNT: usize = 5;

/// Display names must be shorter than this many characters.
pub const MAX_NAME_CHARS: usize = 32;

/// Whether a group of `members` players may start a game.
pub fn start_eligible(members: usize) -> bool {
    members >= MIN_START_MEMBERS && members % 2 == 0
}

// ── State records ───────────────────────────────────────────────────

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Disconnected,
    Connecting,
    Handshaking,
    InLobby,
    InGroup,
    InGame,
}

impl LifecycleState {
    /// Returns the upper-case name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Handshaking => "HANDSHAKING",
            Self::InLobby => "IN_LOBBY",
            Self::InGroup => "IN_GROUP",
            Self::InGame => "IN_GAME",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the last connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseKind {
    Clean,
    Died,
}

/// Whether this client is in a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupPhase {
    #[default]
    None,
    Joined,
}

/// Group id and roster.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct GroupState {
    pub group_id: Option<String>,
    /// Roster in server order; never holds two entries with the same uid.
    pub members: Vec<Identity>,
    pub phase: GroupPhase,
}

impl GroupState {
    /// Whether the roster allows starting a game.
    pub fn can_start_game(&self) -> bool {
        self.phase == GroupPhase::Joined && start_eligible(self.members.len())
    }
}

/// Progress of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    #[default]
    Idle,
    Started,
    RoundActive,
    RoundEnded,
    Finished,
}

/// This client's part in the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    Spectator,
    Questioner,
    Answerer,
}

/// Who plays the current round.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RoundInfo {
    pub number: Option<u32>,
    pub questioner: Option<String>,
    pub answerer: Option<String>,
}

impl From<RoundStartPayload> for RoundInfo {
    fn from(p: RoundStartPayload) -> Self {
        Self {
            number: p.round,
            questioner: p.questioner.map(|m| m.name),
            answerer: p.answerer.map(|m| m.name),
        }
    }
}

/// Teams, role and words of the game in progress.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct GameState {
    pub phase: GamePhase,
    pub teams: Vec<TeamPair>,
    pub role: Role,
    pub words: Vec<WordEntry>,
    pub round: Option<RoundInfo>,
    /// Seconds until the next round, as last announced.
    pub cooldown_secs: Option<u64>,
    /// Final scores, once the game has finished.
    pub scores: Vec<TeamScore>,
}

/// Immutable view of the session handed to renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub lifecycle: LifecycleState,
    pub last_close: Option<CloseKind>,
    pub status: &'static str,
    pub identity: Option<Identity>,
    /// Name requested with `EDIT_USER` and not yet echoed by the server.
    pub pending_name: Option<String>,
    pub group: GroupState,
    pub game: GameState,
    pub chat: Vec<ChatEntry>,
    pub can_start_game: bool,
}

/// Connection status text for a lifecycle state.
pub fn status_text(lifecycle: LifecycleState, last_close: Option<CloseKind>) -> &'static str {
    match (lifecycle, last_close) {
        (LifecycleState::Disconnected, Some(CloseKind::Clean)) => "Connection closed!",
        (LifecycleState::Disconnected, Some(CloseKind::Died)) => "Connection died!",
        (LifecycleState::Disconnected, None) => "Not connected",
        (LifecycleState::Connecting | LifecycleState::Handshaking, _) => "Connecting...",
        _ => "Loaded!",
    }
}

// ── Intents ─────────────────────────────────────────────────────────

/// A user action that may produce an outbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Join a group by id, or let the server pick a fresh one.
    JoinGroup { group: Option<String> },
    LeaveGroup,
    EditUser { name: String },
    StartGame,
    Chat { message: String },
    EditGame {
        round_count: Option<u8>,
        wordlist: Option<Vec<String>>,
    },
}

impl Intent {
    /// Short name used in logs and rejections.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinGroup { .. } => "join group",
            Self::LeaveGroup => "leave group",
            Self::EditUser { .. } => "edit user",
            Self::StartGame => "start game",
            Self::Chat { .. } => "chat",
            Self::EditGame { .. } => "edit game",
        }
    }
}

/// Why the session refused a user action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentRejected {
    #[error("cannot {intent} while {state}")]
    InvalidState {
        intent: &'static str,
        state: LifecycleState,
    },

    #[error(
        "a game needs an even number of at least {min} players, the group has {members}",
        min = MIN_START_MEMBERS
    )]
    NotStartEligible { members: usize },

    #[error("name is empty")]
    EmptyName,

    #[error("name is {len} characters, the limit is {max}", max = MAX_NAME_CHARS - 1)]
    NameTooLong { len: usize },

    #[error("message is empty")]
    EmptyMessage,
}

// ── Transitions ─────────────────────────────────────────────────────

/// A well-formed event the session refused to apply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("{code} is not expected while {state}")]
    UnexpectedEvent {
        code: EventCode,
        state: LifecycleState,
    },

    #[error("{code} requires a joined group")]
    NotJoined { code: EventCode },

    #[error("word index {index} is out of range for {len} words")]
    WordIndexOutOfRange { index: usize, len: usize },

    #[error("{code} roster does not contain this client")]
    MissingSelf { code: EventCode },
}

/// What applying an input did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// State was updated; the renderer should receive a fresh snapshot.
    Changed,
    /// Nothing observable changed.
    Unchanged,
    /// The server reported an application error (now in the pending slot).
    ServerError(ErrorCode),
    /// The event was dropped.
    Dropped(ProtocolViolation),
    /// The frame could not be decoded and was dropped.
    Undecodable,
}

/// Result of feeding one input to the [`Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Commands the driver must send, in order.
    pub outbound: Vec<Command>,
    pub outcome: Outcome,
}

impl Transition {
    fn new(outcome: Outcome) -> Self {
        Self {
            outbound: Vec::new(),
            outcome,
        }
    }

    /// Whether the session state changed.
    pub fn changed(&self) -> bool {
        self.outcome == Outcome::Changed
    }
}

// ── Session ─────────────────────────────────────────────────────────

/// The session state machine.
pub struct Session {
    lifecycle: LifecycleState,
    last_close: Option<CloseKind>,
    preferred_name: Option<String>,
    store: Box<dyn IdentityStore>,
    identity: Option<Identity>,
    pending_name: Option<String>,
    group: GroupState,
    game: GameState,
    chat: Vec<ChatEntry>,
    pending_error: Option<ErrorCode>,
}

impl Session {
    /// Create a disconnected session that reads resume/invite hints from `store`.
    pub fn new(store: impl IdentityStore + 'static) -> Self {
        Self {
            lifecycle: LifecycleState::Disconnected,
            last_close: None,
            preferred_name: None,
            store: Box::new(store),
            identity: None,
            pending_name: None,
            group: GroupState::default(),
            game: GameState::default(),
            chat: Vec::new(),
            pending_error: None,
        }
    }

    /// Propose `name` in `NEW_CONNECT` when no session is resumed.
    #[must_use]
    pub fn with_preferred_name(mut self, name: Option<String>) -> Self {
        self.preferred_name = name;
        self
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn group(&self) -> &GroupState {
        &self.group
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn chat(&self) -> &[ChatEntry] {
        &self.chat
    }

    /// Peek at the last server error without consuming it.
    pub fn pending_error(&self) -> Option<ErrorCode> {
        self.pending_error
    }

    /// Consume the last server error. Each error is handed out once.
    pub fn take_pending_error(&mut self) -> Option<ErrorCode> {
        self.pending_error.take()
    }

    /// Whether the start-game action is currently enabled.
    pub fn can_start_game(&self) -> bool {
        self.lifecycle == LifecycleState::InGroup && self.group.can_start_game()
    }

    /// Whether `uid` is this client.
    pub fn is_self(&self, uid: &str) -> bool {
        self.identity.as_ref().is_some_and(|me| me.uid == uid)
    }

    /// Build an immutable snapshot for the renderer.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            lifecycle: self.lifecycle,
            last_close: self.last_close,
            status: status_text(self.lifecycle, self.last_close),
            identity: self.identity.clone(),
            pending_name: self.pending_name.clone(),
            group: self.group.clone(),
            game: self.game.clone(),
            chat: self.chat.clone(),
            can_start_game: self.can_start_game(),
        }
    }

    /// Drop the oldest chat lines so at most `keep` remain.
    pub fn trim_chat(&mut self, keep: usize) {
        let excess = self.chat.len().saturating_sub(keep);
        if excess > 0 {
            self.chat.drain(..excess);
        }
    }

    // ── Transport callbacks ─────────────────────────────────────────

    /// The driver is opening a connection.
    pub fn connect(&mut self) -> Result<(), IntentRejected> {
        if self.lifecycle != LifecycleState::Disconnected {
            return Err(IntentRejected::InvalidState {
                intent: "connect",
                state: self.lifecycle,
            });
        }
        self.lifecycle = LifecycleState::Connecting;
        self.last_close = None;
        debug!("session: connecting");
        Ok(())
    }

    /// The transport finished opening. The server speaks first, so this only
    /// confirms the state.
    pub fn transport_opened(&mut self) {
        if self.lifecycle == LifecycleState::Connecting {
            debug!("session: transport open, awaiting CONNECT_START");
        } else {
            warn!(state = %self.lifecycle, "transport opened outside CONNECTING, ignoring");
        }
    }

    /// The transport closed. Clears everything and returns to `DISCONNECTED`.
    pub fn transport_closed(&mut self, clean: bool) -> Transition {
        info!(clean, state = %self.lifecycle, "session: transport closed");
        self.lifecycle = LifecycleState::Disconnected;
        self.last_close = Some(if clean {
            CloseKind::Clean
        } else {
            CloseKind::Died
        });
        self.identity = None;
        self.pending_name = None;
        self.clear_group();
        self.pending_error = None;
        Transition::new(Outcome::Changed)
    }

    // ── Inbound ─────────────────────────────────────────────────────

    /// Decode a raw frame and apply it. Undecodable frames are logged and
    /// dropped.
    pub fn receive(&mut self, frame: &[u8]) -> Transition {
        match codec::decode(frame) {
            Ok(envelope) => self.apply(envelope),
            Err(e) => {
                warn!(error = %e, "dropping undecodable frame");
                Transition::new(Outcome::Undecodable)
            }
        }
    }

    /// Apply a decoded envelope.
    pub fn apply(&mut self, envelope: Envelope) -> Transition {
        match envelope {
            Envelope::Failure(code) => {
                info!(code = code.as_str(), "server reported error");
                if matches!(code, ErrorCode::TakenName | ErrorCode::InvalidName) {
                    if let Some(name) = self.pending_name.take() {
                        debug!(%name, "name change refused");
                    }
                }
                self.pending_error = Some(code);
                Transition::new(Outcome::ServerError(code))
            }
            Envelope::Success(event) => {
                let code = event.code();
                match self.apply_event(event) {
                    Ok(outbound) => {
                        debug!(%code, state = %self.lifecycle, "applied event");
                        Transition {
                            outbound,
                            outcome: Outcome::Changed,
                        }
                    }
                    Err(violation) => {
                        warn!(%code, state = %self.lifecycle, "protocol violation: {violation}");
                        Transition::new(Outcome::Dropped(violation))
                    }
                }
            }
        }
    }

    fn apply_event(&mut self, event: ServerEvent) -> Result<Vec<Command>, ProtocolViolation> {
        use LifecycleState::{Connecting, Handshaking, InGame, InGroup, InLobby};

        let code = event.code();
        match event {
            ServerEvent::ConnectStart => {
                self.expect(code, &[Connecting])?;
                let command = match self.store.read_resume_token() {
                    Some(token) => Command::JoinGroup {
                        group: None,
                        session: Some(token),
                    },
                    None => Command::NewConnect {
                        name: self.preferred_name.clone(),
                    },
                };
                self.lifecycle = Handshaking;
                Ok(vec![command])
            }
            ServerEvent::Hello(identity) => {
                self.expect(code, &[Handshaking])?;
                info!(uid = %identity.uid, name = %identity.name, "session: hello");
                self.identity = Some(identity);
                self.lifecycle = InLobby;
                Ok(self
                    .store
                    .read_invite_group()
                    .map(|group| Command::JoinGroup {
                        group: Some(group),
                        session: None,
                    })
                    .into_iter()
                    .collect())
            }
            ServerEvent::GroupJoin(p) => {
                self.expect(code, &[InLobby, InGroup])?;
                let members = self.checked_roster(code, p.members)?;
                self.group = GroupState {
                    group_id: Some(p.name),
                    members,
                    phase: GroupPhase::Joined,
                };
                self.refresh_own_name();
                // Lobby renames are never echoed; the join roster settles them.
                if self.lifecycle == InLobby {
                    self.pending_name = None;
                }
                self.lifecycle = InGroup;
                Ok(Vec::new())
            }
            ServerEvent::GroupLeave(p) | ServerEvent::UserUpdate(p) => {
                self.expect(code, &[InGroup, InGame])?;
                self.expect_joined(code)?;
                self.group.members = self.checked_roster(code, p.members)?;
                self.refresh_own_name();
                Ok(Vec::new())
            }
            ServerEvent::GameStart(p) => {
                self.expect(code, &[InGroup])?;
                self.expect_joined(code)?;
                self.game = GameState {
                    phase: GamePhase::Started,
                    teams: p.teams,
                    cooldown_secs: p.cooldown,
                    ..GameState::default()
                };
                self.lifecycle = InGame;
                Ok(Vec::new())
            }
            ServerEvent::RoundStart(p) => {
                self.expect(code, &[InGame])?;
                self.game.phase = GamePhase::RoundActive;
                self.game.role = Role::Spectator;
                self.game.words = vec![WordEntry::hidden(); ROUND_WORD_COUNT];
                self.game.round = Some(RoundInfo::from(p));
                self.game.cooldown_secs = None;
                Ok(Vec::new())
            }
            ServerEvent::QuestionerStart(words) => {
                self.expect(code, &[InGame])?;
                self.game.phase = GamePhase::RoundActive;
                self.game.role = Role::Questioner;
                self.game.words = words.into_iter().map(WordEntry::revealed).collect();
                Ok(Vec::new())
            }
            ServerEvent::AnswererStart => {
                self.expect(code, &[InGame])?;
                self.game.phase = GamePhase::RoundActive;
                self.game.role = Role::Answerer;
                Ok(Vec::new())
            }
            ServerEvent::CorrectWord(p) => {
                self.expect(code, &[InGame])?;
                let len = self.game.words.len();
                let slot = self.game.words.get_mut(p.index).ok_or(
                    ProtocolViolation::WordIndexOutOfRange {
                        index: p.index,
                        len,
                    },
                )?;
                *slot = WordEntry::guessed(p.word);
                Ok(Vec::new())
            }
            ServerEvent::RoundEnd(p) => {
                self.expect(code, &[InGame])?;
                self.game.phase = GamePhase::RoundEnded;
                self.game.words = p.words.into_iter().map(WordEntry::from).collect();
                self.game.cooldown_secs = p.cooldown;
                Ok(Vec::new())
            }
            ServerEvent::ChatMessage(p) => {
                self.expect(code, &[InGroup, InGame])?;
                self.chat.push(ChatEntry {
                    from: p.user.name,
                    message: p.message,
                });
                Ok(Vec::new())
            }
            ServerEvent::GameEnd(p) => {
                self.expect(code, &[InGame])?;
                self.game.phase = GamePhase::Finished;
                self.game.scores = p.scores;
                self.game.cooldown_secs = None;
                Ok(Vec::new())
            }
            ServerEvent::DeleteGroup => {
                self.expect(code, &[InGroup, InGame])?;
                self.clear_group();
                self.lifecycle = InLobby;
                Ok(Vec::new())
            }
        }
    }

    fn expect(&self, code: EventCode, allowed: &[LifecycleState]) -> Result<(), ProtocolViolation> {
        if allowed.contains(&self.lifecycle) {
            Ok(())
        } else {
            Err(ProtocolViolation::UnexpectedEvent {
                code,
                state: self.lifecycle,
            })
        }
    }

    fn expect_joined(&self, code: EventCode) -> Result<(), ProtocolViolation> {
        if self.group.phase == GroupPhase::Joined {
            Ok(())
        } else {
            Err(ProtocolViolation::NotJoined { code })
        }
    }

    /// Collapse duplicate uids (first wins) and require this client's entry.
    fn checked_roster(
        &self,
        code: EventCode,
        members: Vec<Identity>,
    ) -> Result<Vec<Identity>, ProtocolViolation> {
        let mut roster: Vec<Identity> = Vec::with_capacity(members.len());
        for member in members {
            if roster.iter().any(|m| m.uid == member.uid) {
                warn!(%code, uid = %member.uid, "duplicate uid in roster, keeping first");
                continue;
            }
            roster.push(member);
        }

        if let Some(me) = &self.identity {
            if !roster.iter().any(|m| m.uid == me.uid) {
                return Err(ProtocolViolation::MissingSelf { code });
            }
        }
        Ok(roster)
    }

    /// Adopt the name the server lists for this client.
    fn refresh_own_name(&mut self) {
        let Some(me) = self.identity.as_mut() else {
            return;
        };
        let Some(listed) = self.group.members.iter().find(|m| m.uid == me.uid) else {
            return;
        };
        if listed.name != me.name {
            info!(old = %me.name, new = %listed.name, "session: name confirmed");
            me.name.clone_from(&listed.name);
        }
        if self.pending_name.as_deref() == Some(me.name.as_str()) {
            self.pending_name = None;
        }
    }

    fn clear_group(&mut self) {
        self.group = GroupState::default();
        self.game = GameState::default();
        self.chat.clear();
    }

    // ── Outbound ────────────────────────────────────────────────────

    /// Turn a user action into a command, or refuse it for the current state.
    ///
    /// Refused intents are never queued.
    pub fn intent(&mut self, intent: Intent) -> Result<Command, IntentRejected> {
        use LifecycleState::{InGame, InGroup, InLobby};

        let result = match intent {
            Intent::JoinGroup { group } => {
                self.allow("join group", &[InLobby, InGroup])?;
                Ok(Command::JoinGroup {
                    group,
                    session: None,
                })
            }
            Intent::LeaveGroup => {
                self.allow("leave group", &[InGroup, InGame])?;
                // The server only tells the members who stay.
                let group = self.group.group_id.clone();
                self.clear_group();
                self.lifecycle = InLobby;
                Ok(Command::LeaveGroup { group })
            }
            Intent::EditUser { name } => {
                self.allow("edit user", &[InLobby, InGroup, InGame])?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(IntentRejected::EmptyName);
                }
                let len = name.chars().count();
                if len >= MAX_NAME_CHARS {
                    return Err(IntentRejected::NameTooLong { len });
                }
                self.pending_name = Some(name.to_owned());
                Ok(Command::EditUser {
                    name: name.to_owned(),
                })
            }
            Intent::StartGame => {
                self.allow("start game", &[InGroup])?;
                if !self.group.can_start_game() {
                    return Err(IntentRejected::NotStartEligible {
                        members: self.group.members.len(),
                    });
                }
                Ok(Command::GameStart {})
            }
            Intent::Chat { message } => {
                self.allow("chat", &[InGroup, InGame])?;
                if message.trim().is_empty() {
                    return Err(IntentRejected::EmptyMessage);
                }
                Ok(Command::ChatMessage { message })
            }
            Intent::EditGame {
                round_count,
                wordlist,
            } => {
                self.allow("edit game", &[InGroup])?;
                Ok(Command::EditGame {
                    round_count: round_count.map(|n| n.to_string()),
                    wordlist,
                })
            }
        };

        if let Ok(command) = &result {
            debug!(command = command.name(), state = %self.lifecycle, "intent accepted");
        }
        result
    }

    fn allow(&self, intent: &'static str, allowed: &[LifecycleState]) -> Result<(), IntentRejected> {
        if allowed.contains(&self.lifecycle) {
            Ok(())
        } else {
            Err(IntentRejected::InvalidState {
                intent,
                state: self.lifecycle,
            })
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("lifecycle", &self.lifecycle)
            .field("identity", &self.identity)
            .field("group", &self.group.group_id)
            .field("members", &self.group.members.len())
            .field("game_phase", &self.game.phase)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::identity::StoredIdentity;
    use crate::protocol::{GroupJoinPayload, RosterPayload};

    fn ok(event: ServerEvent) -> Envelope {
        Envelope::Success(event)
    }

    fn lobby_session() -> Session {
        let mut s = Session::new(StoredIdentity::default());
        s.connect().unwrap();
        s.apply(ok(ServerEvent::ConnectStart));
        s.apply(ok(ServerEvent::Hello(Identity::new("u1", "Ann"))));
        s
    }

    fn roster(n: usize) -> Vec<Identity> {
        (1..=n)
            .map(|i| Identity::new(format!("u{i}"), format!("p{i}")))
            .collect()
    }

    #[test]
    fn start_eligibility_table() {
        for n in [0, 1, 2, 3, 5, 7] {
            assert!(!start_eligible(n), "{n} should not be eligible");
        }
        for n in [4, 6, 8] {
            assert!(start_eligible(n), "{n} should be eligible");
        }
    }

    #[test]
    fn connect_start_sends_new_connect_with_name() {
        let mut s = Session::new(StoredIdentity::default()).with_preferred_name(Some("Ann".into()));
        s.connect().unwrap();
        let t = s.apply(ok(ServerEvent::ConnectStart));
        assert_eq!(
            t.outbound,
            vec![Command::NewConnect {
                name: Some("Ann".into())
            }]
        );
        assert_eq!(s.lifecycle(), LifecycleState::Handshaking);
    }

    #[test]
    fn connect_twice_is_rejected() {
        let mut s = Session::new(StoredIdentity::default());
        s.connect().unwrap();
        assert!(s.connect().is_err());
    }

    #[test]
    fn duplicate_uids_are_collapsed() {
        let mut s = lobby_session();
        let mut members = roster(3);
        members.push(Identity::new("u2", "impostor"));
        s.apply(ok(ServerEvent::GroupJoin(GroupJoinPayload {
            name: "g".into(),
            members,
            member: None,
        })));
        assert_eq!(s.group().members.len(), 3);
        assert_eq!(s.group().members[1].name, "p2");
    }

    #[test]
    fn roster_without_self_is_dropped() {
        let mut s = lobby_session();
        let t = s.apply(ok(ServerEvent::GroupJoin(GroupJoinPayload {
            name: "g".into(),
            members: vec![Identity::new("u9", "Zed")],
            member: None,
        })));
        assert_eq!(
            t.outcome,
            Outcome::Dropped(ProtocolViolation::MissingSelf {
                code: EventCode::GroupJoin
            })
        );
        assert_eq!(s.lifecycle(), LifecycleState::InLobby);
    }

    #[test]
    fn refused_name_clears_pending_name() {
        let mut s = lobby_session();
        s.intent(Intent::EditUser { name: "Zed".into() }).unwrap();
        assert_eq!(s.snapshot().pending_name.as_deref(), Some("Zed"));

        let t = s.apply(Envelope::Failure(ErrorCode::TakenName));
        assert_eq!(t.outcome, Outcome::ServerError(ErrorCode::TakenName));
        assert!(s.snapshot().pending_name.is_none());
        assert_eq!(s.take_pending_error(), Some(ErrorCode::TakenName));
    }

    #[test]
    fn unrelated_error_keeps_pending_name() {
        let mut s = lobby_session();
        s.intent(Intent::EditUser { name: "Zed".into() }).unwrap();
        s.apply(Envelope::Failure(ErrorCode::RateLimit));
        assert_eq!(s.snapshot().pending_name.as_deref(), Some("Zed"));
    }

    #[test]
    fn lobby_rename_is_settled_by_group_join() {
        let mut s = lobby_session();
        s.intent(Intent::EditUser { name: "Zed".into() }).unwrap();

        let mut members = roster(2);
        members[0].name = "Zed".into();
        s.apply(ok(ServerEvent::GroupJoin(GroupJoinPayload {
            name: "g".into(),
            members,
            member: None,
        })));
        assert_eq!(s.identity().unwrap().name, "Zed");
        assert!(s.snapshot().pending_name.is_none());
    }

    #[test]
    fn edit_user_is_confirmed_by_roster_echo() {
        let mut s = lobby_session();
        s.apply(ok(ServerEvent::GroupJoin(GroupJoinPayload {
            name: "g".into(),
            members: roster(2),
            member: None,
        })));
        s.intent(Intent::EditUser {
            name: "  Annie ".into(),
        })
        .unwrap();
        assert_eq!(s.snapshot().pending_name.as_deref(), Some("Annie"));

        let mut members = roster(2);
        members[0].name = "Annie".into();
        s.apply(ok(ServerEvent::UserUpdate(RosterPayload {
            members,
            member: None,
        })));
        assert_eq!(s.identity().unwrap().name, "Annie");
        assert!(s.snapshot().pending_name.is_none());
    }

    #[test]
    fn trim_chat_keeps_newest() {
        let mut s = lobby_session();
        s.apply(ok(ServerEvent::GroupJoin(GroupJoinPayload {
            name: "g".into(),
            members: roster(1),
            member: None,
        })));
        for i in 0..5 {
            s.apply(ok(ServerEvent::ChatMessage(crate::protocol::ChatPayload {
                user: crate::protocol::ChatUser { name: "p1".into() },
                message: format!("m{i}"),
            })));
        }
        s.trim_chat(2);
        let lines: Vec<_> = s.chat().iter().map(|c| c.message.as_str()).collect();
        assert_eq!(lines, ["m3", "m4"]);
    }

    #[test]
    fn status_text_follows_lifecycle() {
        assert_eq!(status_text(LifecycleState::Disconnected, None), "Not connected");
        assert_eq!(status_text(LifecycleState::Connecting, None), "Connecting...");
        assert_eq!(status_text(LifecycleState::InGroup, None), "Loaded!");
        assert_eq!(
            status_text(LifecycleState::Disconnected, Some(CloseKind::Died)),
            "Connection died!"
        );
    }
}
