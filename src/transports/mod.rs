//! Built-in [`Transport`](crate::Transport) implementations.
//!
//! | Feature               | Transport              |
//! |-----------------------|------------------------|
//! | `transport-websocket` | [`WebSocketTransport`] |

#[cfg(feature = "transport-websocket")]
pub mod websocket;

#[cfg(feature = "transport-websocket")]
pub use websocket::WebSocketTransport;
