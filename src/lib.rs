//! # WordParty Client
//!
//! Client-side session logic for WordParty, a team word-guessing game played
//! in server-managed groups over a persistent connection.
//!
//! The crate is layered:
//!
//! - [`codec`] turns [`Command`]s into JSON frames and inbound frames into
//!   typed [`Envelope`]s.
//! - [`session`] is a pure state machine: it applies envelopes, validates
//!   user [`Intent`]s and produces [`SessionSnapshot`]s.
//! - [`view`] derives a [`RenderPlan`] from a snapshot.
//! - [`GameClient`] drives a session over any [`Transport`] on a tokio task and
//!   reports [`ClientEvent`]s.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! # #[cfg(feature = "transport-websocket")]
//! # async fn example() -> Result<(), wordparty_client::ClientError> {
//! use wordparty_client::{ClientConfig, ClientEvent, GameClient, LifecycleState, WebSocketTransport};
//!
//! let transport = WebSocketTransport::connect("ws://localhost:8080/ws").await?;
//! let (client, mut events) = GameClient::start(transport, ClientConfig::new().with_player_name("Ann"));
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         ClientEvent::StateChanged(snapshot) if snapshot.lifecycle == LifecycleState::InLobby => {
//!             client.join_group(None)?;
//!         }
//!         ClientEvent::ServerError { message, .. } => eprintln!("{message}"),
//!         ClientEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "tokio-runtime")]
pub mod client;
pub mod codec;
pub mod error;
pub mod error_codes;
#[cfg(feature = "tokio-runtime")]
pub mod event;
pub mod identity;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod transports;
pub mod view;

#[cfg(feature = "tokio-runtime")]
pub use client::{ClientConfig, GameClient};
pub use codec::{decode, encode, DecodeError};
pub use error::ClientError;
pub use error_codes::ErrorCode;
#[cfg(feature = "tokio-runtime")]
pub use event::ClientEvent;
pub use identity::{IdentityStore, StoredIdentity};
pub use protocol::{Command, Envelope, EventCode, ServerEvent};
pub use session::{Intent, IntentRejected, LifecycleState, Session, SessionSnapshot};
pub use transport::Transport;
#[cfg(feature = "transport-websocket")]
pub use transports::WebSocketTransport;
pub use view::{render_plan, RenderPlan};
