#![forbid(unsafe_code)]

//! WebSocket transport for FrankenWeb clients.
//!
//! One socket serves one browser tab. [`serve`] runs the whole socket
//! lifecycle on the current `LocalSet`:
//!
//! 1. Wait for the `handshake` message naming the client and, after a
//!    reconnect, the last sequence number the tab processed.
//! 2. Attach the socket to the client (replaying missed frames).
//! 3. Pump outbound frames to the socket and inbound messages to the client
//!    until either side closes.
//! 4. Detach the socket, which may arm the client's reconnect timer.
//!
//! # Failure Modes
//!
//! - **No handshake** within `connect_timeout`: [`TransportError::Handshake`].
//! - **Unknown client** (e.g. deleted after its reconnect window): the socket
//!   is closed and [`TransportError::Client`] is returned; the browser is
//!   expected to reload.
//! - **Malformed inbound message** after the handshake: logged and skipped.
//! - **Client deleted while connected**: the socket is closed normally.

mod pump;

pub use pump::{accept, serve};

use fweb_core::ClientId;

/// Failures of one socket session.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("client {client} is not available: {source}")]
    Client {
        client: ClientId,
        #[source]
        source: fweb_core::Error,
    },

    #[error(transparent)]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = TransportError> = std::result::Result<T, E>;
