#![forbid(unsafe_code)]

use std::time::Duration;

use fweb_core::protocol::{Frame, Inbound};
use fweb_core::SocketId;
use fweb_dom::Client;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use crate::{Result, TransportError};

/// Complete the WebSocket upgrade on `stream`, then [`serve`] it.
pub async fn accept<S>(stream: S, handshake_timeout: Duration) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let socket = tokio_tungstenite::accept_async(stream).await?;
    serve(socket, handshake_timeout).await
}

/// Run one socket session until either side closes.
pub async fn serve<S>(socket: WebSocketStream<S>, handshake_timeout: Duration) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut write, mut read) = socket.split();

    let (client_id, last_seq) = match tokio::time::timeout(handshake_timeout, next_inbound(&mut read)).await {
        Ok(Some(Ok(Inbound::Handshake { client_id, last_seq }))) => (client_id, last_seq),
        Ok(Some(Ok(other))) => {
            return Err(TransportError::Handshake(format!(
                "expected handshake, got {other:?}"
            )));
        }
        Ok(Some(Err(err))) => return Err(err),
        Ok(None) => return Err(TransportError::Handshake("socket closed before handshake".into())),
        Err(_) => {
            return Err(TransportError::Handshake(format!(
                "no handshake within {handshake_timeout:?}"
            )));
        }
    };

    let client = match Client::lookup(client_id) {
        Ok(client) => client,
        Err(source) => {
            tracing::debug!(client = %client_id, "ws.unknown_client");
            let _ = write.send(close(CloseCode::Policy, "unknown client")).await;
            return Err(TransportError::Client { client: client_id, source });
        }
    };

    let socket_id = SocketId::next();
    let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();
    client
        .handle_handshake(socket_id, tx, last_seq)
        .map_err(|source| TransportError::Client { client: client_id, source })?;
    tracing::debug!(client = %client_id, socket = %socket_id, ?last_seq, "ws.attach");

    let outcome = loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else {
                    // The client was deleted and dropped our sender.
                    let _ = write.send(close(CloseCode::Away, "client deleted")).await;
                    break Ok(());
                };
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(err) => break Err(err.into()),
                };
                if let Err(err) = write.send(Message::text(text)).await {
                    break Err(err.into());
                }
            }
            inbound = next_inbound(&mut read) => match inbound {
                None => break Ok(()),
                Some(Ok(message)) => client.handle_message(socket_id, message),
                Some(Err(TransportError::Json(err))) => {
                    tracing::warn!(client = %client_id, socket = %socket_id, error = %err, "ws.malformed_message");
                }
                Some(Err(err)) => break Err(err),
            },
        }
    };

    client.handle_disconnect(socket_id);
    tracing::debug!(client = %client_id, socket = %socket_id, ok = outcome.is_ok(), "ws.detach");
    outcome
}

/// Next parsed inbound message; `None` once the peer closed.
async fn next_inbound<R>(read: &mut R) -> Option<Result<Inbound>>
where
    R: futures_util::Stream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let message = match read.next().await? {
            Ok(message) => message,
            Err(err) => return Some(Err(err.into())),
        };
        let text = match message {
            Message::Text(text) => text.as_str().to_owned(),
            Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => text,
                Err(_) => continue,
            },
            Message::Close(_) => return None,
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        };
        return Some(serde_json::from_str(&text).map_err(TransportError::from));
    }
}

fn close(code: CloseCode, reason: &str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: reason.to_string().into(),
    }))
}
