#![no_main]

use arbitrary::Arbitrary;
use fweb_core::Config;
use fweb_dom::{Client, ClientKind, Element};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Edit {
    Create { parent: u8 },
    Move { element: u8, target: u8, index: Option<u8> },
    Delete { element: u8 },
    Clear { element: u8 },
    Hide { element: u8, hidden: bool },
}

fn pick(client: &Client, index: u8) -> Element {
    let elements = client.elements();
    elements[usize::from(index) % elements.len()]
}

fuzz_target!(|edits: Vec<Edit>| {
    let client = Client::new(ClientKind::Page, Config::default());
    for edit in edits.into_iter().take(256) {
        match edit {
            Edit::Create { parent } => {
                let _ = pick(&client, parent).build(|| Element::new("div"));
            }
            Edit::Move { element, target, index } => {
                let _ = pick(&client, element).move_to(Some(pick(&client, target)), index.map(usize::from), None);
            }
            Edit::Delete { element } => pick(&client, element).delete(),
            Edit::Clear { element } => {
                let _ = pick(&client, element).clear();
            }
            Edit::Hide { element, hidden } => {
                let _ = pick(&client, element).set_visible(!hidden);
            }
        }
    }
    let live = client.elements().len();
    assert_eq!(client.root().descendants().count() + 1, live);
    client.delete();
    assert!(client.elements().is_empty());
});
