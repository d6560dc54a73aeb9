//! Events delivered by [`GameClient`](crate::GameClient) to the front end.

use crate::error_codes::ErrorCode;
use crate::session::{IntentRejected, SessionSnapshot};

/// Something the front end should react to.
///
/// Received from the channel returned by
/// [`GameClient::start`](crate::GameClient::start). `Disconnected` is always the
/// last event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The transport loop is running.
    Connected,

    /// The session changed; redraw from this snapshot.
    StateChanged(Box<SessionSnapshot>),

    /// The server refused a request. Delivered once per error envelope.
    ServerError {
        code: ErrorCode,
        /// Notification text for `code`.
        message: &'static str,
    },

    /// A user action was not valid in the current state and was not sent.
    IntentRejected(IntentRejected),

    /// The connection ended.
    Disconnected {
        /// `true` when the peer or the client closed the connection normally.
        clean: bool,
        reason: Option<String>,
    },
}
