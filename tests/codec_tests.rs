#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Wire-format tests against frames shaped like the game server's output.

mod common;

use common::*;
use serde_json::json;
use wordparty_client::codec::{self, DecodeError};
use wordparty_client::error_codes::ErrorCode;
use wordparty_client::protocol::{
    ChatPayload, ChatUser, Command, Envelope, EventCode, GameEndPayload, GameStartPayload,
    GroupJoinPayload, Identity, RoundEndPayload, RoundStartPayload, ServerEvent, TeamMember,
    TeamPair, TeamScore, WordWire,
};

fn decode_ok(frame: &str) -> ServerEvent {
    match codec::decode(frame.as_bytes()).unwrap() {
        Envelope::Success(event) => event,
        Envelope::Failure(code) => panic!("expected success, got {code:?}"),
    }
}

// ── Outbound ────────────────────────────────────────────────────────

#[test]
fn commands_match_server_expectations() {
    let cases = [
        (
            Command::NewConnect {
                name: Some("Ann".into()),
            },
            json!({"c": "NEW_CONNECT", "d": {"name": "Ann"}}),
        ),
        (
            Command::JoinGroup {
                group: None,
                session: None,
            },
            json!({"c": "JOIN_GROUP", "d": {"group": null}}),
        ),
        (
            Command::LeaveGroup {
                group: Some("g".into()),
            },
            json!({"c": "LEAVE_GROUP", "d": {"group": "g"}}),
        ),
        (
            Command::EditUser { name: "Bo".into() },
            json!({"c": "EDIT_USER", "d": {"name": "Bo"}}),
        ),
        (
            Command::EditGame {
                round_count: Some("4".into()),
                wordlist: None,
            },
            json!({"c": "EDIT_GAME", "d": {"round_count": "4"}}),
        ),
        (Command::GameStart {}, json!({"c": "GAME_START", "d": {}})),
        (
            Command::ChatMessage {
                message: "hi".into(),
            },
            json!({"c": "CHAT_MESSAGE", "d": {"message": "hi"}}),
        ),
        (
            Command::CloseConnection {},
            json!({"c": "CLOSE_CONNECTION", "d": {}}),
        ),
    ];

    for (command, expected) in cases {
        let frame = codec::encode(&command).unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value, expected, "{}", command.name());
        assert_eq!(codec::decode_command(frame.as_bytes()).unwrap(), command);
    }
}

#[test]
fn unknown_command_name_is_rejected() {
    let err = codec::decode_command(br#"{"c":"SHOUT","d":{}}"#).unwrap_err();
    assert!(matches!(err, DecodeError::UnknownCode(c) if c == "SHOUT"));
}

// ── Inbound ─────────────────────────────────────────────────────────

#[test]
fn server_frames_decode() {
    assert_eq!(decode_ok(&connect_start()), ServerEvent::ConnectStart);
    assert_eq!(
        decode_ok(&hello("u1", "Ann")),
        ServerEvent::Hello(Identity::new("u1", "Ann"))
    );
    assert_eq!(decode_ok(&answerer_start()), ServerEvent::AnswererStart);
    assert_eq!(decode_ok(&delete_group()), ServerEvent::DeleteGroup);

    let ServerEvent::GroupJoin(join) = decode_ok(&group_join("room1", &members(2))) else {
        panic!("expected GROUP_JOIN");
    };
    assert_eq!(join.name, "room1");
    assert_eq!(join.members[1], Identity::new("u2", "p2"));

    let ServerEvent::GameStart(start) = decode_ok(&game_start(4)) else {
        panic!("expected GAME_START");
    };
    assert_eq!(start.teams.len(), 2);
    assert_eq!(start.cooldown, Some(5));

    let ServerEvent::RoundStart(round) = decode_ok(&round_start(2)) else {
        panic!("expected ROUND_START");
    };
    assert_eq!(round.round, Some(2));
    assert_eq!(round.answerer, Some(TeamMember::named("p2")));

    let ServerEvent::GameEnd(end) = decode_ok(&game_end(&[4, 2])) else {
        panic!("expected GAME_END");
    };
    assert_eq!(end.scores[1].score, 2);
}

#[test]
fn questioner_words_accept_plain_list() {
    assert_eq!(
        decode_ok(r#"{"s":true,"c":"QUESTIONER_START","d":["a","b"]}"#),
        ServerEvent::QuestionerStart(vec!["a".into(), "b".into()])
    );
    assert_eq!(
        decode_ok(&questioner_start(&["x"])),
        ServerEvent::QuestionerStart(vec!["x".into()])
    );
}

#[test]
fn every_error_code_decodes() {
    for code in ErrorCode::ALL {
        let frame = error(code.as_str());
        assert_eq!(
            codec::decode(frame.as_bytes()).unwrap(),
            Envelope::Failure(code)
        );
    }
}

#[test]
fn bad_frames_are_decode_errors() {
    assert!(matches!(
        codec::decode(br#"{"s":1,"c":"TELEPORT"}"#),
        Err(DecodeError::UnknownCode(_))
    ));
    assert!(matches!(
        codec::decode(br#"{"s":0,"c":"TELEPORT"}"#),
        Err(DecodeError::UnknownCode(_))
    ));
    assert!(matches!(
        codec::decode(br#"{"s":1,"c":"CHAT_MESSAGE","d":null}"#),
        Err(DecodeError::MissingPayload(EventCode::ChatMessage))
    ));
    assert!(matches!(
        codec::decode(br#"{"s":1,"c":"GAME_START","d":{"teams":[[{"name":"a"}]]}}"#),
        Err(DecodeError::Payload {
            code: EventCode::GameStart,
            ..
        })
    ));
    assert!(matches!(
        codec::decode(b"\xff\xfe"),
        Err(DecodeError::Malformed(_))
    ));
}

#[test]
fn mirrored_envelopes_decode_to_the_same_value() {
    let envelopes = [
        Envelope::Success(ServerEvent::GroupJoin(GroupJoinPayload {
            name: "g".into(),
            members: vec![Identity::new("u1", "Ann")],
            member: Some(Identity::new("u1", "Ann")),
        })),
        Envelope::Success(ServerEvent::GameStart(GameStartPayload {
            teams: vec![TeamPair(TeamMember::named("a"), TeamMember::named("b"))],
            cooldown: None,
        })),
        Envelope::Success(ServerEvent::RoundStart(RoundStartPayload::default())),
        Envelope::Success(ServerEvent::RoundEnd(RoundEndPayload {
            words: vec![WordWire::Pair("kite".into(), true)],
            cooldown: Some(10),
        })),
        Envelope::Success(ServerEvent::ChatMessage(ChatPayload {
            user: ChatUser { name: "Ann".into() },
            message: "hi".into(),
        })),
        Envelope::Success(ServerEvent::GameEnd(GameEndPayload {
            scores: vec![TeamScore {
                team: vec![TeamMember::named("a")],
                score: 3,
            }],
        })),
        Envelope::Failure(ErrorCode::RateLimit),
    ];

    for envelope in envelopes {
        let frame = codec::encode_envelope(&envelope).unwrap();
        assert_eq!(codec::decode(frame.as_bytes()).unwrap(), envelope, "{frame}");
    }
}
