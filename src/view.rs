//! Render plan: the pure effect step between a [`SessionSnapshot`] and the UI.
//!
//! [`render_plan`] derives everything a front end needs to draw from the
//! snapshot alone. Panel visibility follows the lifecycle state; nothing here
//! reads back from the UI.

use serde::Serialize;

use crate::error_codes::ErrorCode;
use crate::protocol::WordEntry;
use crate::session::{LifecycleState, SessionSnapshot};

/// Which top-level panels are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Panels {
    pub loader: bool,
    pub group_picker: bool,
    pub group_info: bool,
    pub game: bool,
}

impl Panels {
    /// Panel visibility for a lifecycle state.
    pub fn for_state(state: LifecycleState) -> Self {
        match state {
            LifecycleState::Disconnected
            | LifecycleState::Connecting
            | LifecycleState::Handshaking => Self {
                loader: true,
                ..Self::default()
            },
            LifecycleState::InLobby => Self {
                group_picker: true,
                ..Self::default()
            },
            LifecycleState::InGroup => Self {
                group_info: true,
                ..Self::default()
            },
            LifecycleState::InGame => Self {
                group_info: true,
                game: true,
                ..Self::default()
            },
        }
    }
}

/// One line of the group roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterLine {
    /// 1-based position in the roster.
    pub position: usize,
    pub name: String,
    /// Rendered with the change-name affordance.
    pub is_self: bool,
}

/// One team row of the game panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamRow {
    pub label: String,
    pub players: [String; 2],
}

/// Styling of a word cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WordClass {
    Correct,
    Incorrect,
}

/// One cell of the word list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordCell {
    pub text: String,
    pub class: WordClass,
}

impl WordCell {
    fn from_entry(entry: &WordEntry) -> Self {
        Self {
            text: entry.text.clone(),
            class: if entry.guessed {
                WordClass::Correct
            } else {
                WordClass::Incorrect
            },
        }
    }
}

/// Everything needed to draw one frame of the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderPlan {
    pub panels: Panels,
    pub status: &'static str,
    pub group_title: Option<String>,
    pub start_enabled: bool,
    pub roster: Vec<RosterLine>,
    pub teams: Vec<TeamRow>,
    pub words: Vec<WordCell>,
    /// Chat lines formatted as `name: message`.
    pub chat: Vec<String>,
    /// Notification text for a server error, shown once.
    pub snackbar: Option<&'static str>,
}

/// Derive the render plan for `snapshot`, with the server error to announce
/// (if one was just taken from the session).
pub fn render_plan(snapshot: &SessionSnapshot, pending_error: Option<ErrorCode>) -> RenderPlan {
    let self_uid = snapshot.identity.as_ref().map(|me| me.uid.as_str());

    let roster = snapshot
        .group
        .members
        .iter()
        .enumerate()
        .map(|(i, member)| RosterLine {
            position: i + 1,
            name: member.name.clone(),
            is_self: self_uid == Some(member.uid.as_str()),
        })
        .collect();

    let teams = snapshot
        .game
        .teams
        .iter()
        .enumerate()
        .map(|(i, pair)| TeamRow {
            label: format!("team {}", i + 1),
            players: [pair.0.name.clone(), pair.1.name.clone()],
        })
        .collect();

    let words = snapshot.game.words.iter().map(WordCell::from_entry).collect();

    let chat = snapshot
        .chat
        .iter()
        .map(|line| format!("{}: {}", line.from, line.message))
        .collect();

    RenderPlan {
        panels: Panels::for_state(snapshot.lifecycle),
        status: snapshot.status,
        group_title: snapshot
            .group
            .group_id
            .as_ref()
            .map(|id| format!("Group {id}")),
        start_enabled: snapshot.can_start_game,
        roster,
        teams,
        words,
        chat,
        snackbar: pending_error.map(|code| code.description()),
    }
}
