//! End-to-end socket sessions over an in-memory duplex stream.

use std::time::Duration;

use fweb_core::protocol::{EventMessage, Inbound};
use fweb_core::{ClientId, Config, Error};
use fweb_dom::{Client, ClientKind, Element, Handler};
use fweb_ws::{TransportError, serve};
use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::io::DuplexStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::Role;

type Browser = WebSocketStream<DuplexStream>;

fn run(future: impl Future<Output = ()>) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    tokio::task::LocalSet::new().block_on(&runtime, future);
}

async fn open() -> (Browser, JoinHandle<fweb_ws::Result<()>>) {
    let (browser_io, server_io) = tokio::io::duplex(64 * 1024);
    let server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
    let browser = WebSocketStream::from_raw_socket(browser_io, Role::Client, None).await;
    let session = tokio::task::spawn_local(serve(server, Duration::from_secs(1)));
    (browser, session)
}

async fn send(browser: &mut Browser, message: &Inbound) {
    let text = serde_json::to_string(message).unwrap();
    browser.send(Message::text(text)).await.unwrap();
}

async fn handshake(browser: &mut Browser, client: ClientId, last_seq: Option<u64>) {
    send(browser, &Inbound::Handshake { client_id: client, last_seq }).await;
}

/// Next frame as JSON; `None` when the server closed.
async fn next_frame(browser: &mut Browser) -> Option<Value> {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(1), browser.next())
            .await
            .expect("frame in time")?
            .ok()?;
        match message {
            Message::Text(text) => return Some(serde_json::from_str(text.as_str()).unwrap()),
            Message::Close(_) => return None,
            _ => {}
        }
    }
}

#[test]
fn frames_flow_to_the_browser_and_events_back() {
    run(async {
        let client = Client::new(ClientKind::Page, Config::default());
        let button = client.build(|| Element::new("button")).unwrap();
        let listener = button
            .on(
                "click",
                Handler::sync(|event| {
                    event.sender.set_text("clicked")?;
                    Ok(())
                }),
            )
            .unwrap();

        let (mut browser, session) = open().await;
        handshake(&mut browser, client.id(), None).await;
        client.connected(Some(Duration::from_secs(1))).await.unwrap();

        let first = next_frame(&mut browser).await.unwrap();
        assert_eq!(first["type"], "update");
        assert_eq!(first["seq"], 1);
        assert!(first["elements"][button.id().to_string()].is_object());

        send(
            &mut browser,
            &Inbound::Event(EventMessage {
                element_id: button.id(),
                listener_id: listener,
                args: Value::Null,
            }),
        )
        .await;
        let update = loop {
            tokio::task::yield_now().await;
            if client.has_pending() {
                client.flush();
                break next_frame(&mut browser).await.unwrap();
            }
        };
        assert_eq!(update["seq"], 2);
        assert_eq!(update["elements"][button.id().to_string()]["text"], "clicked");

        browser.close(None).await.unwrap();
        session.await.unwrap().unwrap();
        assert!(!client.has_socket_connection());
    });
}

#[test]
fn malformed_messages_are_skipped() {
    run(async {
        let client = Client::new(ClientKind::Page, Config::default());
        let (mut browser, session) = open().await;
        handshake(&mut browser, client.id(), None).await;
        client.connected(Some(Duration::from_secs(1))).await.unwrap();

        browser.send(Message::text("{not json")).await.unwrap();
        client.notify(fweb_core::protocol::NotifyOptions::new("still here"));
        client.flush();
        let frame = next_frame(&mut browser).await.unwrap();
        assert_eq!(frame["type"], "notify");
        assert_eq!(frame["options"]["message"], json!("still here"));

        browser.close(None).await.unwrap();
        session.await.unwrap().unwrap();
    });
}

#[test]
fn unknown_clients_are_refused() {
    run(async {
        let gone = Client::new(ClientKind::Page, Config::default());
        let id = gone.id();
        gone.delete();

        let (mut browser, session) = open().await;
        handshake(&mut browser, id, None).await;
        assert_eq!(next_frame(&mut browser).await, None);
        let err = session.await.unwrap().unwrap_err();
        assert!(matches!(err, TransportError::Client { client, source: Error::ClientDeleted { .. } } if client == id));
    });
}

#[test]
fn the_first_message_must_be_a_handshake() {
    run(async {
        let client = Client::new(ClientKind::Page, Config::default());
        let (mut browser, session) = open().await;
        let root = client.root();
        send(
            &mut browser,
            &Inbound::Event(EventMessage {
                element_id: root.id(),
                listener_id: fweb_core::ListenerId::next(),
                args: Value::Null,
            }),
        )
        .await;
        let err = session.await.unwrap().unwrap_err();
        assert!(matches!(err, TransportError::Handshake(_)));
    });
}

#[test]
fn deleting_the_client_closes_the_socket() {
    run(async {
        let client = Client::new(ClientKind::Page, Config::default());
        let (mut browser, session) = open().await;
        handshake(&mut browser, client.id(), None).await;
        client.connected(Some(Duration::from_secs(1))).await.unwrap();

        client.delete();
        assert_eq!(next_frame(&mut browser).await, None);
        session.await.unwrap().unwrap();
    });
}
