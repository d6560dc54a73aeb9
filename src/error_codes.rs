//! Application error codes reported by the WordParty server.
//!
//! A failed request comes back as `{"s": false, "c": "<CODE>"}`. The codes
//! serialize as `SCREAMING_SNAKE_CASE` to match the wire format exactly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured error codes returned by the server in a failure envelope.
///
/// Use [`description()`](ErrorCode::description) for the human-readable
/// notification text shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Group membership
    InGroup,
    NoGroup,
    InvalidGroup,
    GroupExists,
    MaxMembers,
    InGame,

    // Request validation
    InvalidJson,
    NoData,
    InvalidString,
    InvalidType,
    InvalidRange,

    // Identity
    InvalidName,
    TakenName,

    // Game flow
    CantStart,
    InvalidMessage,
    CantMessage,

    // Throttling
    RateLimit,
}

impl ErrorCode {
    /// Every code the server is known to send.
    pub const ALL: [ErrorCode; 17] = [
        Self::InGroup,
        Self::NoGroup,
        Self::InvalidGroup,
        Self::GroupExists,
        Self::MaxMembers,
        Self::InGame,
        Self::InvalidJson,
        Self::NoData,
        Self::InvalidString,
        Self::InvalidType,
        Self::InvalidRange,
        Self::InvalidName,
        Self::TakenName,
        Self::CantStart,
        Self::InvalidMessage,
        Self::CantMessage,
        Self::RateLimit,
    ];

    /// Returns the wire name of this code (e.g. `"CANT_START"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InGroup => "IN_GROUP",
            Self::NoGroup => "NO_GROUP",
            Self::InvalidGroup => "INVALID_GROUP",
            Self::GroupExists => "GROUP_EXISTS",
            Self::MaxMembers => "MAX_MEMBERS",
            Self::InGame => "IN_GAME",
            Self::InvalidJson => "INVALID_JSON",
            Self::NoData => "NO_DATA",
            Self::InvalidString => "INVALID_STRING",
            Self::InvalidType => "INVALID_TYPE",
            Self::InvalidRange => "INVALID_RANGE",
            Self::InvalidName => "INVALID_NAME",
            Self::TakenName => "TAKEN_NAME",
            Self::CantStart => "CANT_START",
            Self::InvalidMessage => "INVALID_MESSAGE",
            Self::CantMessage => "CANT_MESSAGE",
            Self::RateLimit => "RATE_LIMIT",
        }
    }

    /// Returns the human-readable notification text for this error code.
    pub fn description(&self) -> &'static str {
        match self {
            // Group membership
            Self::InGroup => "You are already in that group",
            Self::NoGroup => "You are not in a group",
            Self::InvalidGroup => "Could not find a free group, please try again",
            Self::GroupExists => "That group already exists",
            Self::MaxMembers => "That group is full",
            Self::InGame => "That group is already playing a game",

            // Request validation
            Self::InvalidJson => "Given data was invalid",
            Self::NoData => "The request was missing its data",
            Self::InvalidString => "That text contains invalid characters",
            Self::InvalidType => "A setting had the wrong type",
            Self::InvalidRange => "A setting was out of range",

            // Identity
            Self::InvalidName => "That name is invalid",
            Self::TakenName => "That name is taken already",

            // Game flow
            Self::CantStart => "There aren't enough players to start",
            Self::InvalidMessage => "That message is too long or empty",
            Self::CantMessage => "The questioner can't send messages this round",

            // Throttling
            Self::RateLimit => "You're doing that too often, slow down",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
