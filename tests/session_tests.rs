#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Session state machine behaviour: transition scenarios and properties over
//! generated event sequences.

mod common;

use common::*;
use proptest::prelude::*;
use wordparty_client::error_codes::ErrorCode;
use wordparty_client::protocol::{
    Command, CorrectWordPayload, EventCode, Identity, RosterPayload, ServerEvent, WordEntry,
};
use wordparty_client::session::{
    start_eligible, CloseKind, GamePhase, GroupPhase, Intent, IntentRejected, LifecycleState,
    Outcome, ProtocolViolation, Role, Session,
};
use wordparty_client::StoredIdentity;

// ── Handshake ───────────────────────────────────────────────────────

#[test]
fn fresh_session_is_disconnected() {
    let session = Session::new(StoredIdentity::default());
    let snapshot = session.snapshot();
    assert_eq!(snapshot.lifecycle, LifecycleState::Disconnected);
    assert!(snapshot.identity.is_none());
    assert!(!snapshot.can_start_game);
}

#[test]
fn transport_open_waits_for_server() {
    let mut session = Session::new(StoredIdentity::default());
    session.connect().unwrap();
    session.transport_opened();
    assert_eq!(session.lifecycle(), LifecycleState::Connecting);
    assert_eq!(session.snapshot().status, "Connecting...");
}

#[test]
fn connect_start_without_token_sends_new_connect() {
    let mut session = Session::new(StoredIdentity::default());
    session.connect().unwrap();
    let t = session.receive(connect_start().as_bytes());
    assert_eq!(t.outbound, vec![Command::NewConnect { name: None }]);
    assert_eq!(session.lifecycle(), LifecycleState::Handshaking);
}

#[test]
fn connect_start_with_token_resumes_session() {
    let mut session = Session::new(StoredIdentity::default().with_resume_token("tok-1"));
    session.connect().unwrap();
    let t = session.receive(connect_start().as_bytes());
    assert_eq!(
        t.outbound,
        vec![Command::JoinGroup {
            group: None,
            session: Some("tok-1".into())
        }]
    );
}

#[test]
fn hello_with_invite_joins_group() {
    let mut session = Session::new(StoredIdentity::default().with_invite_group("room1"));
    session.connect().unwrap();
    session.receive(connect_start().as_bytes());
    let t = session.receive(hello("u1", "Ann").as_bytes());
    assert_eq!(
        t.outbound,
        vec![Command::JoinGroup {
            group: Some("room1".into()),
            session: None
        }]
    );
    assert_eq!(session.lifecycle(), LifecycleState::InLobby);
    assert_eq!(session.identity(), Some(&Identity::new("u1", "Ann")));
    assert_eq!(session.snapshot().status, "Loaded!");
}

#[test]
fn hello_before_connect_start_is_dropped() {
    let mut session = Session::new(StoredIdentity::default());
    session.connect().unwrap();
    let t = session.receive(hello("u1", "Ann").as_bytes());
    assert_eq!(
        t.outcome,
        Outcome::Dropped(ProtocolViolation::UnexpectedEvent {
            code: EventCode::Hello,
            state: LifecycleState::Connecting
        })
    );
    assert!(session.identity().is_none());
}

// ── Group ───────────────────────────────────────────────────────────

#[test]
fn join_group_scenario_is_start_eligible() {
    let mut session = Session::new(StoredIdentity::default());
    session.connect().unwrap();
    feed(&mut session, &[connect_start(), hello("u1", "Ann")]);

    let cmd = session
        .intent(Intent::JoinGroup {
            group: Some("room1".into()),
        })
        .unwrap();
    assert_eq!(cmd.name(), "JOIN_GROUP");

    let roster: Vec<(String, String)> = [("u1", "Ann"), ("u2", "Bob"), ("u3", "Cid"), ("u4", "Dee")]
        .iter()
        .map(|(u, n)| (u.to_string(), n.to_string()))
        .collect();
    session.receive(group_join("room1", &roster).as_bytes());

    let snapshot = session.snapshot();
    assert_eq!(snapshot.lifecycle, LifecycleState::InGroup);
    assert_eq!(snapshot.group.group_id.as_deref(), Some("room1"));
    assert_eq!(snapshot.group.phase, GroupPhase::Joined);
    assert!(snapshot.can_start_game);
}

#[test]
fn group_leave_shrinks_roster_and_disables_start() {
    let mut session = group_session(4);
    assert!(session.can_start_game());
    session.receive(group_leave(&members(3)).as_bytes());
    assert_eq!(session.group().members.len(), 3);
    assert!(!session.can_start_game());
}

#[test]
fn start_intent_needs_even_roster_of_four() {
    let mut session = group_session(3);
    assert_eq!(
        session.intent(Intent::StartGame),
        Err(IntentRejected::NotStartEligible { members: 3 })
    );
    session.receive(group_join("g", &members(4)).as_bytes());
    assert_eq!(session.intent(Intent::StartGame), Ok(Command::GameStart {}));
}

#[test]
fn leaving_clears_group_locally() {
    let mut session = group_session(2);
    let cmd = session.intent(Intent::LeaveGroup).unwrap();
    assert_eq!(
        cmd,
        Command::LeaveGroup {
            group: Some("g".into())
        }
    );
    assert_eq!(session.lifecycle(), LifecycleState::InLobby);
    assert_eq!(session.group().phase, GroupPhase::None);
    assert!(session.group().members.is_empty());
}

#[test]
fn delete_group_returns_to_lobby() {
    let mut session = game_session();
    assert!(session.receive(delete_group().as_bytes()).changed());
    assert_eq!(session.lifecycle(), LifecycleState::InLobby);
    assert_eq!(session.game().phase, GamePhase::Idle);
}

#[test]
fn intents_are_rejected_outside_their_states() {
    let mut session = lobby_session();
    assert_eq!(
        session.intent(Intent::Chat {
            message: "hi".into()
        }),
        Err(IntentRejected::InvalidState {
            intent: "chat",
            state: LifecycleState::InLobby
        })
    );
    assert!(session.intent(Intent::LeaveGroup).is_err());
    assert!(session
        .intent(Intent::EditGame {
            round_count: Some(3),
            wordlist: None
        })
        .is_err());

    let mut fresh = Session::new(StoredIdentity::default());
    assert!(fresh.intent(Intent::JoinGroup { group: None }).is_err());
}

#[test]
fn blank_chat_and_bad_names_are_rejected() {
    let mut session = group_session(2);
    assert_eq!(
        session.intent(Intent::Chat {
            message: "   ".into()
        }),
        Err(IntentRejected::EmptyMessage)
    );
    assert_eq!(
        session.intent(Intent::EditUser { name: " ".into() }),
        Err(IntentRejected::EmptyName)
    );
    assert_eq!(
        session.intent(Intent::EditUser {
            name: "x".repeat(32)
        }),
        Err(IntentRejected::NameTooLong { len: 32 })
    );
    assert!(session
        .intent(Intent::EditUser {
            name: "x".repeat(31)
        })
        .is_ok());
}

#[test]
fn edit_game_sends_round_count_as_digits() {
    let mut session = group_session(2);
    let cmd = session
        .intent(Intent::EditGame {
            round_count: Some(7),
            wordlist: Some(vec!["kite".into()]),
        })
        .unwrap();
    assert_eq!(
        cmd,
        Command::EditGame {
            round_count: Some("7".into()),
            wordlist: Some(vec!["kite".into()])
        }
    );
}

// ── Game ────────────────────────────────────────────────────────────

#[test]
fn game_start_stores_teams() {
    let mut session = group_session(4);
    session.receive(game_start(4).as_bytes());
    let game = session.game();
    assert_eq!(session.lifecycle(), LifecycleState::InGame);
    assert_eq!(game.phase, GamePhase::Started);
    assert_eq!(game.teams.len(), 2);
    assert_eq!(game.teams[1].0.name, "p3");
    assert_eq!(game.cooldown_secs, Some(5));
}

#[test]
fn round_start_deals_hidden_placeholders() {
    let session = game_session();
    let game = session.game();
    assert_eq!(game.phase, GamePhase::RoundActive);
    assert_eq!(game.role, Role::Spectator);
    assert_eq!(game.words, vec![WordEntry::hidden(); 5]);
    let round = game.round.as_ref().unwrap();
    assert_eq!(round.number, Some(1));
    assert_eq!(round.questioner.as_deref(), Some("p1"));
}

#[test]
fn questioner_sees_every_word() {
    let mut session = game_session();
    session.receive(questioner_start(&["a", "b", "c", "d", "e"]).as_bytes());
    let game = session.game();
    assert_eq!(game.role, Role::Questioner);
    assert!(game.words.iter().all(|w| w.revealed && !w.guessed));
    assert_eq!(game.words[4].text, "e");
}

#[test]
fn answerer_keeps_words() {
    let mut session = game_session();
    let before = session.game().words.clone();
    session.receive(answerer_start().as_bytes());
    assert_eq!(session.game().role, Role::Answerer);
    assert_eq!(session.game().words, before);
}

#[test]
fn correct_word_scenario() {
    let mut session = game_session();
    session.receive(correct_word(2, "apple").as_bytes());
    assert_eq!(session.game().words[2], WordEntry::guessed("apple"));

    let before = session.snapshot();
    let t = session.receive(correct_word(9, "pear").as_bytes());
    assert_eq!(
        t.outcome,
        Outcome::Dropped(ProtocolViolation::WordIndexOutOfRange { index: 9, len: 5 })
    );
    assert_eq!(session.snapshot(), before);
}

#[test]
fn negative_word_index_is_undecodable() {
    let mut session = game_session();
    let before = session.snapshot();
    let t = session.receive(correct_word(-1, "pear").as_bytes());
    assert_eq!(t.outcome, Outcome::Undecodable);
    assert_eq!(session.snapshot(), before);
}

#[test]
fn round_end_replaces_words() {
    let mut session = game_session();
    session.receive(round_end(&[("a", true), ("b", false)]).as_bytes());
    let game = session.game();
    assert_eq!(game.phase, GamePhase::RoundEnded);
    assert_eq!(game.words.len(), 2);
    assert!(game.words[0].revealed && game.words[0].guessed);
    assert!(!game.words[1].revealed && !game.words[1].guessed);
    assert_eq!(game.cooldown_secs, Some(3));
}

#[test]
fn game_end_records_scores() {
    let mut session = game_session();
    session.receive(game_end(&[3, 1]).as_bytes());
    assert_eq!(session.game().phase, GamePhase::Finished);
    assert_eq!(session.game().scores[0].score, 3);
    assert_eq!(session.lifecycle(), LifecycleState::InGame);
}

#[test]
fn chat_is_appended_in_group_and_game() {
    let mut session = group_session(2);
    session.receive(chat("p2", "hello").as_bytes());
    session.receive(game_start(4).as_bytes());
    session.receive(chat("p1", "guess").as_bytes());
    let lines: Vec<_> = session
        .chat()
        .iter()
        .map(|c| format!("{}: {}", c.from, c.message))
        .collect();
    assert_eq!(lines, ["p2: hello", "p1: guess"]);
}

#[test]
fn chat_in_lobby_is_dropped() {
    let mut session = lobby_session();
    let t = session.receive(chat("p2", "hello").as_bytes());
    assert!(!t.changed());
    assert!(session.chat().is_empty());
}

// ── Errors and closing ──────────────────────────────────────────────

#[test]
fn error_envelope_fills_pending_error_only() {
    let mut session = game_session();
    let before = session.game().clone();
    let t = session.receive(error("CANT_START").as_bytes());
    assert_eq!(t.outcome, Outcome::ServerError(ErrorCode::CantStart));
    assert_eq!(session.game(), &before);
    assert_eq!(session.take_pending_error(), Some(ErrorCode::CantStart));
    assert_eq!(session.take_pending_error(), None);
}

#[test]
fn undecodable_frames_change_nothing() {
    let mut session = group_session(4);
    let before = session.snapshot();
    for frame in [
        "not json",
        r#"{"s":1,"c":"NOPE","d":null}"#,
        r#"{"s":1,"c":"GROUP_JOIN","d":{"name":"g"}}"#,
        r#"{"c":"HELLO"}"#,
    ] {
        assert_eq!(session.receive(frame.as_bytes()).outcome, Outcome::Undecodable);
    }
    assert_eq!(session.snapshot(), before);
}

#[test]
fn transport_close_resets_everything() {
    let mut session = game_session();
    session.transport_closed(false);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.lifecycle, LifecycleState::Disconnected);
    assert_eq!(snapshot.last_close, Some(CloseKind::Died));
    assert_eq!(snapshot.status, "Connection died!");
    assert!(snapshot.identity.is_none());
    assert!(snapshot.group.members.is_empty());
    assert!(snapshot.game.words.is_empty());

    let mut clean = lobby_session();
    clean.transport_closed(true);
    assert_eq!(clean.snapshot().status, "Connection closed!");
}

#[test]
fn roster_update_during_game_keeps_game() {
    let mut session = game_session();
    let mut roster = members(4);
    roster[1].1 = "Bobby".into();
    session.receive(user_update(&roster).as_bytes());
    assert_eq!(session.lifecycle(), LifecycleState::InGame);
    assert_eq!(session.group().members[1].name, "Bobby");
    assert_eq!(session.game().words.len(), 5);
}

// ── Properties ──────────────────────────────────────────────────────

/// A roster-affecting event over uids drawn from a small pool, so duplicates
/// and missing-self rosters are common.
fn roster_event_strategy() -> impl Strategy<Value = ServerEvent> {
    let roster = prop::collection::vec((0..6u8, "[a-z]{1,4}"), 0..10).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(uid, name)| Identity::new(format!("u{uid}"), name))
            .collect::<Vec<_>>()
    });

    prop_oneof![
        roster.clone().prop_map(|members| {
            ServerEvent::GroupJoin(wordparty_client::protocol::GroupJoinPayload {
                name: "g".into(),
                members,
                member: None,
            })
        }),
        roster.clone().prop_map(|members| ServerEvent::GroupLeave(RosterPayload {
            members,
            member: None
        })),
        roster.prop_map(|members| ServerEvent::UserUpdate(RosterPayload {
            members,
            member: None
        })),
    ]
}

/// Events that are only valid during a game.
fn in_game_event_strategy() -> impl Strategy<Value = ServerEvent> {
    prop_oneof![
        Just(ServerEvent::RoundStart(Default::default())),
        Just(ServerEvent::AnswererStart),
        prop::collection::vec("[a-z]{1,6}", 0..6).prop_map(ServerEvent::QuestionerStart),
        (0..8usize, "[a-z]{1,6}")
            .prop_map(|(index, word)| ServerEvent::CorrectWord(CorrectWordPayload { index, word })),
    ]
}

proptest! {
    /// Rosters never hold duplicate uids and always hold self exactly once.
    #[test]
    fn prop_roster_invariant(events in prop::collection::vec(roster_event_strategy(), 0..40)) {
        let mut session = lobby_session();
        for event in events {
            session.apply(ok(event));
            let members = &session.group().members;

            let mut uids: Vec<&str> = members.iter().map(|m| m.uid.as_str()).collect();
            uids.sort_unstable();
            uids.dedup();
            prop_assert_eq!(uids.len(), members.len());

            if session.lifecycle() == LifecycleState::InGroup {
                let selves = members.iter().filter(|m| session.is_self(&m.uid)).count();
                prop_assert_eq!(selves, 1);
            }
        }
    }

    /// The start action is enabled exactly for even rosters of four or more.
    #[test]
    fn prop_start_eligibility(n in 1..12usize) {
        let session = group_session(n);
        prop_assert_eq!(session.can_start_game(), n >= 4 && n % 2 == 0);
        prop_assert_eq!(start_eligible(n), n >= 4 && n % 2 == 0);
    }

    /// Game-only events in the lobby or a group leave the session untouched.
    #[test]
    fn prop_state_gating(
        in_group in any::<bool>(),
        events in prop::collection::vec(in_game_event_strategy(), 1..20),
    ) {
        let mut session = if in_group { group_session(4) } else { lobby_session() };
        let before = session.snapshot();
        for event in events {
            let t = session.apply(ok(event));
            prop_assert!(
                matches!(t.outcome, Outcome::Dropped(ProtocolViolation::UnexpectedEvent { .. })),
                "unexpected outcome {:?}", t.outcome
            );
            prop_assert!(t.outbound.is_empty());
        }
        prop_assert_eq!(session.snapshot(), before);
    }

    /// Re-applying an identical roster update is a no-op on the snapshot.
    #[test]
    fn prop_idempotent_roster_update(n in 1..9usize) {
        let mut session = group_session(n);
        let roster = members(n);
        session.receive(user_update(&roster).as_bytes());
        let once = session.snapshot();
        session.receive(user_update(&roster).as_bytes());
        prop_assert_eq!(session.snapshot(), once);
    }
}
