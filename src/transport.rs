//! Transport seam of the WordParty client.
//!
//! A [`Transport`] carries whole JSON text frames in both directions. Opening
//! the connection is not part of the trait: build a connected transport (a
//! WebSocket, an in-process channel pair, a test script) and hand it to
//! [`GameClient::start`](crate::GameClient::start).
//!
//! How the connection ends decides how the session reports it:
//!
//! | `recv` result  | Meaning                          |
//! |----------------|----------------------------------|
//! | `Some(Ok(_))`  | one inbound frame                |
//! | `None`         | clean close (`Connection closed!`) |
//! | `Some(Err(_))` | connection died (`Connection died!`) |
//!
//! # Implementing a transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use tokio::sync::mpsc;
//! use wordparty_client::error::ClientError;
//! use wordparty_client::transport::Transport;
//!
//! struct ChannelTransport {
//!     outbound: mpsc::Sender<String>,
//!     inbound: mpsc::Receiver<String>,
//! }
//!
//! #[async_trait]
//! impl Transport for ChannelTransport {
//!     async fn send(&mut self, frame: String) -> Result<(), ClientError> {
//!         self.outbound
//!             .send(frame)
//!             .await
//!             .map_err(|e| ClientError::TransportSend(e.to_string()))
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, ClientError>> {
//!         self.inbound.recv().await.map(Ok)
//!     }
//!
//!     async fn close(&mut self) -> Result<(), ClientError> {
//!         self.inbound.close();
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::ClientError;

/// A duplex channel of JSON text frames between the client and the server.
///
/// The trait is object-safe; `Box<dyn Transport>` works where dynamic
/// dispatch is needed.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) is polled inside `tokio::select!` and **must** be
/// cancel-safe: dropping the future before it completes must not lose a frame.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send one frame.
    ///
    /// # Errors
    ///
    /// [`ClientError::TransportSend`] or [`ClientError::TransportClosed`].
    async fn send(&mut self, frame: String) -> Result<(), ClientError>;

    /// Wait for the next frame. `None` means the peer closed cleanly.
    async fn recv(&mut self) -> Option<Result<String, ClientError>>;

    /// Close the connection. Calling it twice is not an error.
    async fn close(&mut self) -> Result<(), ClientError>;
}
