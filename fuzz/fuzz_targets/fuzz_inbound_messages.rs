#![no_main]

use fweb_core::protocol::Inbound;
use fweb_core::{Config, SocketId};
use fweb_dom::{Client, ClientKind, Element, Handler};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(message) = serde_json::from_slice::<Inbound>(data) else {
        return;
    };
    let client = Client::new(ClientKind::Page, Config::default());
    let _ = client.build(|| {
        let button = Element::new("button")?;
        button.on("click", Handler::sync(|_| Ok(())))
    });
    client.handle_message(SocketId::next(), message);
    client.delete();
});
