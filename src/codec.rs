//! Command/event codec for the WordParty wire format.
//!
//! [`encode`] turns an outbound [`Command`] into a JSON text frame and
//! [`decode`] turns an inbound frame into an [`Envelope`]. Decoding is a
//! closed step: every known code maps to exactly one typed
//! [`ServerEvent`] or [`ErrorCode`], and anything else is a [`DecodeError`].
//! Nothing in this module panics on untrusted input.
//!
//! [`encode_envelope`] and [`decode_command`] are the mirrored server-side
//! halves, used by fixtures, fake servers and fuzzing.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::Result;
use crate::error_codes::ErrorCode;
use crate::protocol::{Command, Envelope, EventCode, QuestionerWords, ServerEvent};

/// Wire names of every outbound command.
const COMMAND_NAMES: [&str; 8] = [
    "NEW_CONNECT",
    "JOIN_GROUP",
    "LEAVE_GROUP",
    "EDIT_USER",
    "EDIT_GAME",
    "GAME_START",
    "CHAT_MESSAGE",
    "CLOSE_CONNECTION",
];

/// Reasons an inbound frame could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame is not a JSON envelope (`s` and `c` are required).
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The `c` field names no known event, error or command.
    #[error("unknown code {0:?}")]
    UnknownCode(String),

    /// The event requires a `d` payload but none was sent.
    #[error("{0} is missing its payload")]
    MissingPayload(EventCode),

    /// The `d` payload does not have the shape the event requires.
    #[error("invalid {code} payload: {source}")]
    Payload {
        code: EventCode,
        #[source]
        source: serde_json::Error,
    },
}

/// The server sends the success flag as a boolean or as `0`/`1`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SuccessFlag {
    Bool(bool),
    Int(i64),
}

impl SuccessFlag {
    fn is_success(&self) -> bool {
        match self {
            Self::Bool(flag) => *flag,
            Self::Int(flag) => *flag != 0,
        }
    }
}

#[derive(Deserialize)]
struct RawEnvelope {
    s: SuccessFlag,
    c: String,
    #[serde(default)]
    d: Option<Value>,
}

// ── Outbound ────────────────────────────────────────────────────────

/// Serialize a command into a JSON text frame.
///
/// Commands are plain data built by the session or UI layer, so this does
/// not fail for any constructible value; the `Result` only mirrors serde.
pub fn encode(command: &Command) -> Result<String> {
    Ok(serde_json::to_string(command)?)
}

/// Decode a command frame the way the server would.
pub fn decode_command(bytes: &[u8]) -> std::result::Result<Command, DecodeError> {
    let value: Value = serde_json::from_slice(bytes).map_err(DecodeError::Malformed)?;
    let name = value.get("c").and_then(Value::as_str).unwrap_or_default();
    if !COMMAND_NAMES.contains(&name) {
        return Err(DecodeError::UnknownCode(name.to_owned()));
    }
    serde_json::from_value(value).map_err(DecodeError::Malformed)
}

// ── Inbound ─────────────────────────────────────────────────────────

/// Decode an inbound frame into an [`Envelope`].
///
/// # Errors
///
/// Returns a [`DecodeError`] for invalid JSON, an unknown code, or a payload
/// that is missing or has the wrong shape.
pub fn decode(bytes: &[u8]) -> std::result::Result<Envelope, DecodeError> {
    let raw: RawEnvelope = serde_json::from_slice(bytes).map_err(DecodeError::Malformed)?;

    if !raw.s.is_success() {
        return parse_code::<ErrorCode>(&raw.c).map(Envelope::Failure);
    }

    let code = parse_code::<EventCode>(&raw.c)?;
    decode_event(code, raw.d).map(Envelope::Success)
}

fn parse_code<T: DeserializeOwned>(code: &str) -> std::result::Result<T, DecodeError> {
    serde_json::from_value(Value::String(code.to_owned()))
        .map_err(|_| DecodeError::UnknownCode(code.to_owned()))
}

fn decode_event(code: EventCode, data: Option<Value>) -> std::result::Result<ServerEvent, DecodeError> {
    let event = match code {
        EventCode::ConnectStart => ServerEvent::ConnectStart,
        EventCode::Hello => ServerEvent::Hello(payload(code, data)?),
        EventCode::GroupJoin => ServerEvent::GroupJoin(payload(code, data)?),
        EventCode::GroupLeave => ServerEvent::GroupLeave(payload(code, data)?),
        EventCode::UserUpdate => ServerEvent::UserUpdate(payload(code, data)?),
        EventCode::GameStart => ServerEvent::GameStart(payload(code, data)?),
        EventCode::RoundStart => ServerEvent::RoundStart(optional_payload(code, data)?),
        EventCode::RoundEnd => ServerEvent::RoundEnd(payload(code, data)?),
        EventCode::ChatMessage => ServerEvent::ChatMessage(payload(code, data)?),
        EventCode::QuestionerStart => {
            ServerEvent::QuestionerStart(payload::<QuestionerWords>(code, data)?.into())
        }
        EventCode::AnswererStart => ServerEvent::AnswererStart,
        EventCode::CorrectWord => ServerEvent::CorrectWord(payload(code, data)?),
        EventCode::GameEnd => ServerEvent::GameEnd(payload(code, data)?),
        EventCode::DeleteGroup => ServerEvent::DeleteGroup,
    };
    Ok(event)
}

fn payload<T: DeserializeOwned>(
    code: EventCode,
    data: Option<Value>,
) -> std::result::Result<T, DecodeError> {
    let value = data.ok_or(DecodeError::MissingPayload(code))?;
    serde_json::from_value(value).map_err(|source| DecodeError::Payload { code, source })
}

fn optional_payload<T: DeserializeOwned + Default>(
    code: EventCode,
    data: Option<Value>,
) -> std::result::Result<T, DecodeError> {
    match data {
        Some(value) => serde_json::from_value(value)
            .map_err(|source| DecodeError::Payload { code, source }),
        None => Ok(T::default()),
    }
}

/// Encode an envelope the way the server would. Used for fixtures.
pub fn encode_envelope(envelope: &Envelope) -> Result<String> {
    let mut obj = Map::new();
    match envelope {
        Envelope::Failure(code) => {
            obj.insert("s".into(), Value::Bool(false));
            obj.insert("c".into(), Value::String(code.as_str().into()));
        }
        Envelope::Success(event) => {
            obj.insert("s".into(), Value::Bool(true));
            obj.insert("c".into(), Value::String(event.code().as_str().into()));
            if let Some(data) = event_payload(event)? {
                obj.insert("d".into(), data);
            }
        }
    }
    Ok(serde_json::to_string(&Value::Object(obj))?)
}

fn event_payload(event: &ServerEvent) -> serde_json::Result<Option<Value>> {
    let value = match event {
        ServerEvent::ConnectStart | ServerEvent::AnswererStart | ServerEvent::DeleteGroup => {
            return Ok(None)
        }
        ServerEvent::Hello(identity) => serde_json::to_value(identity)?,
        ServerEvent::GroupJoin(p) => serde_json::to_value(p)?,
        ServerEvent::GroupLeave(p) | ServerEvent::UserUpdate(p) => serde_json::to_value(p)?,
        ServerEvent::GameStart(p) => serde_json::to_value(p)?,
        ServerEvent::RoundStart(p) => serde_json::to_value(p)?,
        ServerEvent::RoundEnd(p) => serde_json::to_value(p)?,
        ServerEvent::ChatMessage(p) => serde_json::to_value(p)?,
        ServerEvent::QuestionerStart(words) => serde_json::to_value(words)?,
        ServerEvent::CorrectWord(p) => serde_json::to_value(p)?,
        ServerEvent::GameEnd(p) => serde_json::to_value(p)?,
    };
    Ok(Some(value))
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
    use crate::protocol::{CorrectWordPayload, Identity, WordEntry, WordWire};

    fn decode_str(s: &str) -> std::result::Result<Envelope, DecodeError> {
        decode(s.as_bytes())
    }

    #[test]
    fn hello_decodes_identity() {
        let env = decode_str(r#"{"s": true, "c": "HELLO", "d": {"uid": "u1", "name": "Ann"}}"#)
            .unwrap();
        assert_eq!(
            env,
            Envelope::Success(ServerEvent::Hello(Identity::new("u1", "Ann")))
        );
    }

    #[test]
    fn integer_success_flag_and_null_payload() {
        let env = decode_str(r#"{"s": 1, "c": "CONNECT_START", "d": null}"#).unwrap();
        assert_eq!(env, Envelope::Success(ServerEvent::ConnectStart));

        let env = decode_str(r#"{"s": 0, "c": "TAKEN_NAME", "d": null}"#).unwrap();
        assert_eq!(env, Envelope::Failure(ErrorCode::TakenName));
    }

    #[test]
    fn failure_envelope_without_payload() {
        let env = decode_str(r#"{"s": false, "c": "CANT_START"}"#).unwrap();
        assert!(!env.is_success());
        assert_eq!(env.code(), "CANT_START");
    }

    #[test]
    fn unknown_event_code_is_rejected() {
        let err = decode_str(r#"{"s": true, "c": "TELEPORT", "d": {}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownCode(c) if c == "TELEPORT"));
    }

    #[test]
    fn event_code_in_failure_envelope_is_unknown() {
        let err = decode_str(r#"{"s": false, "c": "HELLO"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownCode(_)));
    }

    #[test]
    fn missing_payload_is_rejected() {
        let err = decode_str(r#"{"s": true, "c": "GROUP_JOIN"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingPayload(EventCode::GroupJoin)));
    }

    #[test]
    fn wrong_payload_shape_is_rejected() {
        let err = decode_str(r#"{"s": true, "c": "USER_UPDATE", "d": {"members": 3}}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Payload {
                code: EventCode::UserUpdate,
                ..
            }
        ));
    }

    #[test]
    fn negative_word_index_is_rejected() {
        let err = decode_str(r#"{"s": true, "c": "CORRECT_WORD", "d": {"index": -1, "word": "x"}}"#)
            .unwrap_err();
        assert!(matches!(err, DecodeError::Payload { .. }));
    }

    #[test]
    fn not_json_is_malformed() {
        assert!(matches!(
            decode(b"\xff\x00garbage"),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            decode_str(r#"{"c": "HELLO"}"#),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn questioner_start_accepts_both_shapes() {
        let plain = decode_str(r#"{"s": true, "c": "QUESTIONER_START", "d": ["a", "b"]}"#).unwrap();
        let wrapped = decode_str(
            r#"{"s": 1, "c": "QUESTIONER_START", "d": {"words": [{"word": "a", "scored": false}, "b"]}}"#,
        )
        .unwrap();
        let expected = Envelope::Success(ServerEvent::QuestionerStart(vec!["a".into(), "b".into()]));
        assert_eq!(plain, expected);
        assert_eq!(wrapped, expected);
    }

    #[test]
    fn round_start_payload_is_optional() {
        let env = decode_str(r#"{"s": true, "c": "ROUND_START"}"#).unwrap();
        assert_eq!(
            env,
            Envelope::Success(ServerEvent::RoundStart(Default::default()))
        );
    }

    #[test]
    fn round_end_words_decode_to_entries() {
        let env = decode_str(
            r#"{"s": true, "c": "ROUND_END", "d": {"words": [["apple", true], ["pear", false]], "cooldown": 10}}"#,
        )
        .unwrap();
        let Envelope::Success(ServerEvent::RoundEnd(p)) = env else {
            panic!("expected ROUND_END");
        };
        let words: Vec<WordEntry> = p.words.into_iter().map(WordEntry::from).collect();
        assert_eq!(words[0], WordEntry::guessed("apple"));
        assert!(!words[1].revealed);
        assert_eq!(p.cooldown, Some(10));
    }

    #[test]
    fn envelope_mirror_decodes_back() {
        let events = vec![
            Envelope::Success(ServerEvent::ConnectStart),
            Envelope::Success(ServerEvent::CorrectWord(CorrectWordPayload {
                index: 2,
                word: "apple".into(),
            })),
            Envelope::Success(ServerEvent::RoundEnd(crate::protocol::RoundEndPayload {
                words: vec![WordWire::Pair("kiwi".into(), true)],
                cooldown: None,
            })),
            Envelope::Failure(ErrorCode::RateLimit),
        ];
        for env in events {
            let json = encode_envelope(&env).unwrap();
            assert_eq!(decode_str(&json).unwrap(), env);
        }
    }

    #[test]
    fn decode_command_mirrors_encode() {
        let cmd = Command::EditUser { name: "Ann".into() };
        let json = encode(&cmd).unwrap();
        assert_eq!(decode_command(json.as_bytes()).unwrap(), cmd);
    }

    #[test]
    fn decode_command_rejects_unknown_name() {
        let err = decode_command(br#"{"c": "SELF_DESTRUCT", "d": {}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownCode(c) if c == "SELF_DESTRUCT"));
    }
}
