//! Wire-compatible protocol types for the WordParty lobby protocol.
//!
//! Both directions use a compact JSON envelope:
//!
//! ```text
//! outbound: {"c": <COMMAND>, "d": {...}}
//! inbound:  {"s": <bool|0|1>, "c": <EVENT_CODE|ERROR_CODE>, "d"?: <payload>}
//! ```
//!
//! Outbound [`Command`]s map onto the envelope through serde's adjacent
//! tagging. Inbound envelopes are decoded by [`crate::codec::decode`] into an
//! [`Envelope`], whose success arm carries a typed [`ServerEvent`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error_codes::ErrorCode;

// ── Domain records ──────────────────────────────────────────────────

/// A connected user as the server describes them.
///
/// The `uid` is opaque and stable for the lifetime of the connection. Extra
/// fields the server includes (such as `group`) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub name: String,
}

impl Identity {
    /// Create a new identity.
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
        }
    }
}

/// One member of a team as listed in `GAME_START` and `GAME_END`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl TeamMember {
    /// Create a team member known only by name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uid: None,
        }
    }
}

/// A team of exactly two players, encoded on the wire as a two-element array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamPair(pub TeamMember, pub TeamMember);

/// A word slot of the current round.
///
/// `revealed` decides whether the text is shown; `guessed` whether the word
/// was scored. A questioner sees every word before any of them is guessed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    pub text: String,
    pub revealed: bool,
    #[serde(default)]
    pub guessed: bool,
}

impl WordEntry {
    /// Text shown for a word that has not been revealed yet.
    pub const PLACEHOLDER: &'static str = "???";

    /// A hidden placeholder slot.
    pub fn hidden() -> Self {
        Self {
            text: Self::PLACEHOLDER.to_string(),
            revealed: false,
            guessed: false,
        }
    }

    /// A revealed slot carrying `text` that nobody guessed yet.
    pub fn revealed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            revealed: true,
            guessed: false,
        }
    }

    /// A slot whose word was guessed.
    pub fn guessed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            revealed: true,
            guessed: true,
        }
    }
}

/// A chat line received from the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub from: String,
    pub message: String,
}

/// Final score of one team, sent with `GAME_END`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamScore {
    pub team: Vec<TeamMember>,
    pub score: u32,
}

// ── Outbound commands ───────────────────────────────────────────────

/// Commands sent from client to server.
///
/// Serialized as `{"c": "JOIN_GROUP", "d": {...}}`. Dataless commands still
/// carry an empty object so every outbound envelope has the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "c", content = "d", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// First message of a fresh session, optionally proposing a display name.
    NewConnect {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// Join a group by id (`None` asks the server to create one), or resume a
    /// previous session when `session` is set.
    JoinGroup {
        #[serde(default)]
        group: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session: Option<String>,
    },
    /// Leave the current group.
    LeaveGroup {
        #[serde(default)]
        group: Option<String>,
    },
    /// Change the display name.
    EditUser { name: String },
    /// Change game settings before the game starts.
    EditGame {
        /// Number of rounds, as decimal digits.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        round_count: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        wordlist: Option<Vec<String>>,
    },
    /// Ask the server to start the game for the current group.
    GameStart {},
    /// Send a chat line (also how answerers submit guesses).
    ChatMessage { message: String },
    /// Tell the server this client is going away.
    CloseConnection {},
}

impl Command {
    /// Returns the wire name of this command.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewConnect { .. } => "NEW_CONNECT",
            Self::JoinGroup { .. } => "JOIN_GROUP",
            Self::LeaveGroup { .. } => "LEAVE_GROUP",
            Self::EditUser { .. } => "EDIT_USER",
            Self::EditGame { .. } => "EDIT_GAME",
            Self::GameStart {} => "GAME_START",
            Self::ChatMessage { .. } => "CHAT_MESSAGE",
            Self::CloseConnection {} => "CLOSE_CONNECTION",
        }
    }
}

// ── Inbound event codes ─────────────────────────────────────────────

/// Codes carried by successful server envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCode {
    ConnectStart,
    Hello,
    GroupJoin,
    GroupLeave,
    UserUpdate,
    GameStart,
    RoundStart,
    RoundEnd,
    ChatMessage,
    QuestionerStart,
    AnswererStart,
    CorrectWord,
    GameEnd,
    DeleteGroup,
}

impl EventCode {
    /// Returns the wire name of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectStart => "CONNECT_START",
            Self::Hello => "HELLO",
            Self::GroupJoin => "GROUP_JOIN",
            Self::GroupLeave => "GROUP_LEAVE",
            Self::UserUpdate => "USER_UPDATE",
            Self::GameStart => "GAME_START",
            Self::RoundStart => "ROUND_START",
            Self::RoundEnd => "ROUND_END",
            Self::ChatMessage => "CHAT_MESSAGE",
            Self::QuestionerStart => "QUESTIONER_START",
            Self::AnswererStart => "ANSWERER_START",
            Self::CorrectWord => "CORRECT_WORD",
            Self::GameEnd => "GAME_END",
            Self::DeleteGroup => "DELETE_GROUP",
        }
    }
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Payload structs ─────────────────────────────────────────────────

/// Payload of `GROUP_JOIN`: the group id and its full roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupJoinPayload {
    /// The group id.
    pub name: String,
    pub members: Vec<Identity>,
    /// The member whose arrival triggered the update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<Identity>,
}

/// Payload of `GROUP_LEAVE` and `USER_UPDATE`: the roster after the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterPayload {
    pub members: Vec<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<Identity>,
}

/// Payload of `GAME_START`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStartPayload {
    pub teams: Vec<TeamPair>,
    /// Seconds until the first round begins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<u64>,
}

/// Payload of `ROUND_START`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundStartPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questioner: Option<TeamMember>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answerer: Option<TeamMember>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
}

/// A word as the server reports it at the end of a round.
///
/// Accepts the compact `[text, correct]` pair, the
/// `{"word": text, "scored": correct}` object form, and a bare string
/// (not yet guessed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WordWire {
    Pair(String, bool),
    Entry {
        word: String,
        #[serde(default)]
        scored: bool,
    },
    Text(String),
}

impl From<WordWire> for WordEntry {
    fn from(wire: WordWire) -> Self {
        match wire {
            WordWire::Pair(text, correct) => Self {
                text,
                revealed: correct,
                guessed: correct,
            },
            WordWire::Entry { word, scored } => Self {
                text: word,
                revealed: scored,
                guessed: scored,
            },
            WordWire::Text(text) => Self {
                text,
                revealed: false,
                guessed: false,
            },
        }
    }
}

/// Payload of `ROUND_END`: the final word set of the round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundEndPayload {
    pub words: Vec<WordWire>,
    /// Seconds until the next round begins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<u64>,
}

/// Payload of `QUESTIONER_START` in either of its wire shapes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub(crate) enum QuestionerWords {
    Plain(Vec<String>),
    Wrapped { words: Vec<WordWire> },
}

impl From<QuestionerWords> for Vec<String> {
    fn from(words: QuestionerWords) -> Self {
        match words {
            QuestionerWords::Plain(words) => words,
            QuestionerWords::Wrapped { words } => words
                .into_iter()
                .map(|w| WordEntry::from(w).text)
                .collect(),
        }
    }
}

/// Author of a chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUser {
    pub name: String,
}

/// Payload of `CHAT_MESSAGE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub user: ChatUser,
    pub message: String,
}

/// Payload of `CORRECT_WORD`: the word at `index` was guessed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectWordPayload {
    pub index: usize,
    pub word: String,
}

/// Payload of `GAME_END`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEndPayload {
    pub scores: Vec<TeamScore>,
}

// ── Decoded inbound messages ────────────────────────────────────────

/// A successfully decoded server event with its typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// The server is ready for the first command of the session.
    ConnectStart,
    /// The server assigned this connection its identity.
    Hello(Identity),
    /// This client (or another member) joined the group.
    GroupJoin(GroupJoinPayload),
    /// A member left the group.
    GroupLeave(RosterPayload),
    /// A member changed their details.
    UserUpdate(RosterPayload),
    /// The game started with the given teams.
    GameStart(GameStartPayload),
    /// A round started; this client is a spectator unless told otherwise.
    RoundStart(RoundStartPayload),
    /// The round ended.
    RoundEnd(RoundEndPayload),
    /// A chat line from the group.
    ChatMessage(ChatPayload),
    /// This client gives clues for the listed words this round.
    QuestionerStart(Vec<String>),
    /// This client guesses this round.
    AnswererStart,
    /// A word was guessed.
    CorrectWord(CorrectWordPayload),
    /// The game finished.
    GameEnd(GameEndPayload),
    /// The group was disbanded.
    DeleteGroup,
}

impl ServerEvent {
    /// Returns the code this event is carried under.
    pub fn code(&self) -> EventCode {
        match self {
            Self::ConnectStart => EventCode::ConnectStart,
            Self::Hello(_) => EventCode::Hello,
            Self::GroupJoin(_) => EventCode::GroupJoin,
            Self::GroupLeave(_) => EventCode::GroupLeave,
            Self::UserUpdate(_) => EventCode::UserUpdate,
            Self::GameStart(_) => EventCode::GameStart,
            Self::RoundStart(_) => EventCode::RoundStart,
            Self::RoundEnd(_) => EventCode::RoundEnd,
            Self::ChatMessage(_) => EventCode::ChatMessage,
            Self::QuestionerStart(_) => EventCode::QuestionerStart,
            Self::AnswererStart => EventCode::AnswererStart,
            Self::CorrectWord(_) => EventCode::CorrectWord,
            Self::GameEnd(_) => EventCode::GameEnd,
            Self::DeleteGroup => EventCode::DeleteGroup,
        }
    }
}

/// A decoded inbound envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// `{"s": true, "c": <EventCode>, "d": ...}`
    Success(ServerEvent),
    /// `{"s": false, "c": <ErrorCode>}`
    Failure(ErrorCode),
}

impl Envelope {
    /// Returns the success flag of the envelope.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the wire code of the envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Success(event) => event.code().as_str(),
            Self::Failure(code) => code.as_str(),
        }
    }
}
