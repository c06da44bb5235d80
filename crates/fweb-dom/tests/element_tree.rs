//! Element creation, mutation, structure, events, and queries.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use fweb_core::protocol::{EventMessage, Frame, Outbound};
use fweb_core::{Config, Error, ListenerId, SocketId};
use fweb_dom::{Client, ClientKind, Element, ElementFilter, Handler, ListenerOptions, Refreshable, context};
use fweb_runtime::reactive::{Observable, ValueMap, refresh_step, RefreshConfig};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::sync::mpsc;

fn page() -> Client {
    Client::new(ClientKind::Page, Config::default())
}

fn attach(client: &Client) -> mpsc::UnboundedReceiver<Frame> {
    let (tx, rx) = mpsc::unbounded_channel();
    client.handle_handshake(SocketId::next(), tx, None).unwrap();
    rx
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Frame>) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

fn click(client: &Client, element: Element, listener: ListenerId) {
    client.handle_event(EventMessage {
        element_id: element.id(),
        listener_id: listener,
        args: Value::Null,
    });
}

// ── Creation ─────────────────────────────────────────────────────────

#[test]
fn creation_requires_a_building_scope() {
    let err = Element::new("div").unwrap_err();
    assert!(matches!(err, Error::Context { .. }), "{err}");
    assert!(err.to_string().contains("building scope"));
}

#[test]
fn malformed_tags_are_rejected() {
    let client = page();
    client.build(|| {
        for tag in ["", "1x", "a b", "-x", "<div>"] {
            let err = Element::new(tag).unwrap_err();
            assert!(matches!(err, Error::Validation { .. }), "{tag}: {err}");
        }
        assert!(Element::new("q-btn").is_ok());
    });
}

#[test]
fn nested_creation_appends_to_the_current_slot() {
    let client = page();
    let (card, first, second) = client
        .build(|| {
            let card = Element::new("div")?;
            let (first, second) = card.build(|| Ok::<_, Error>((Element::new("span")?, Element::new("span")?)))?;
            Ok::<_, Error>((card, first, second))
        })
        .unwrap();
    assert_eq!(card.children().unwrap(), [first, second]);
    assert_eq!(first.parent().unwrap(), Some(card));
    assert_eq!(card.parent().unwrap(), Some(client.root()));
    assert_eq!(client.element_count(), 4);
    assert_eq!(context::depth(), None);
}

#[test]
fn explicit_client_without_slot_creates_a_detached_element() {
    let client = page();
    let element = Element::builder("div").client(&client).create().unwrap();
    assert_eq!(element.parent().unwrap(), None);
    assert_eq!(element.client().unwrap(), client);
}

#[test]
fn explicit_client_must_match_the_active_slot() {
    let a = page();
    let b = page();
    let err = a.build(|| Element::builder("div").client(&b).create()).unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
}

// ── Attributes ───────────────────────────────────────────────────────

#[test]
fn classes_style_props_and_markers() {
    let client = page();
    let element = client
        .build(|| {
            Element::new("div")?
                .classes("a b")?
                .style("color: red; margin: 0")?
                .props(r#"dense label="Hi there""#)?
                .mark("x y")
        })
        .unwrap();
    assert_eq!(element.class_list().unwrap(), ["a", "b"]);
    assert_eq!(element.style_value("margin").unwrap().as_deref(), Some("0"));
    assert_eq!(element.prop("dense").unwrap(), Some(json!(true)));
    assert_eq!(element.prop("label").unwrap(), Some(json!("Hi there")));
    assert_eq!(element.markers().unwrap(), ["x", "y"]);

    element.remove_props("dense").unwrap();
    assert_eq!(element.prop("dense").unwrap(), None);
    element.mark("z").unwrap();
    assert_eq!(element.markers().unwrap(), ["z"]);
}

#[test]
fn visibility_toggles_the_hidden_class() {
    let client = page();
    let element = client.build(|| Element::new("div")).unwrap();
    assert!(element.visible().unwrap());
    element.set_visible(false).unwrap();
    assert!(element.class_list().unwrap().contains(&"hidden".to_string()));
    element.set_visible(true).unwrap();
    assert!(element.class_list().unwrap().is_empty());
}

#[test]
fn visibility_follows_a_bound_observable() {
    let client = page();
    let element = client.build(|| Element::new("div")).unwrap();
    let shown = Observable::new(false);
    element.bind_visibility_from(&shown, "value", None);
    assert!(!element.visible().unwrap());
    shown.set(true);
    assert!(element.visible().unwrap());
}

#[test]
fn props_are_polled_binding_endpoints() {
    let client = page();
    let element = client.build(|| Element::new("div")).unwrap();
    let model = ValueMap::new();
    model.insert("title", json!("first"));
    element.bind_from("title", &model, "title", None);
    assert_eq!(element.prop("title").unwrap(), Some(json!("first")));

    model.insert("title", json!("second"));
    let report = refresh_step(&RefreshConfig::default());
    assert_eq!(report.changed_sources, 1);
    assert_eq!(element.prop("title").unwrap(), Some(json!("second")));
}

// ── Structure ────────────────────────────────────────────────────────

#[test]
fn move_between_containers_and_slots() {
    let client = page();
    let (a, b, child) = client
        .build(|| {
            let a = Element::new("div")?;
            let b = Element::new("div")?;
            let child = a.build(|| Element::new("span"))?;
            Ok::<_, Error>((a, b, child))
        })
        .unwrap();
    let other = b.build(|| Element::new("i")).unwrap();

    child.move_to(Some(b), Some(0), None).unwrap();
    assert!(a.children().unwrap().is_empty());
    assert_eq!(b.children().unwrap(), [child, other]);

    let err = child.move_to(Some(a), None, Some("header")).unwrap_err();
    assert!(matches!(err, Error::Lookup { .. }));
    assert!(err.to_string().contains("add_slot(\"header\")"));

    let header = a.add_slot("header", Some("<b>{{ title }}</b>".into())).unwrap();
    child.move_to(Some(a), None, Some("header")).unwrap();
    assert_eq!(header.children().unwrap(), [child]);
    assert_eq!(child.parent_slot().unwrap().unwrap().name(), "header");
    assert_eq!(header.template().unwrap().as_deref(), Some("<b>{{ title }}</b>"));
}

#[test]
fn move_rejects_cycles_and_roots() {
    let client = page();
    let (outer, inner) = client
        .build(|| {
            let outer = Element::new("div")?;
            let inner = outer.build(|| Element::new("div"))?;
            Ok::<_, Error>((outer, inner))
        })
        .unwrap();
    assert!(matches!(outer.move_to(Some(inner), None, None), Err(Error::Validation { .. })));
    assert!(matches!(outer.move_to(Some(outer), None, None), Err(Error::Validation { .. })));
    assert!(matches!(client.root().move_to(Some(outer), None, None), Err(Error::Validation { .. })));
    assert_eq!(inner.parent().unwrap(), Some(outer));
}

#[test]
fn delete_removes_the_subtree_in_pre_order() {
    let client = page();
    let order = Rc::new(RefCell::new(Vec::new()));
    let (outer, inner, leaf) = client
        .build(|| {
            let outer = Element::new("div")?;
            let (inner, leaf) = outer.build(|| {
                let inner = Element::new("div")?;
                let leaf = inner.build(|| Element::new("span"))?;
                Ok::<_, Error>((inner, leaf))
            })?;
            Ok::<_, Error>((outer, inner, leaf))
        })
        .unwrap();
    for element in [outer, inner, leaf] {
        let order = Rc::clone(&order);
        element.on_delete(move |e| order.borrow_mut().push(e.id())).unwrap();
    }
    let observed = Observable::new(true);
    leaf.bind_visibility_from(&observed, "value", None);

    outer.delete();
    assert_eq!(*order.borrow(), [outer.id(), inner.id(), leaf.id()]);
    assert!(leaf.is_deleted());
    assert!(fweb_runtime::reactive::links_of(leaf.object_id()).is_empty());
    assert!(client.root().children().unwrap().is_empty());
    assert!(matches!(leaf.text(), Err(Error::ElementDeleted { .. })));

    // Writes through stale links and repeated deletes are harmless.
    observed.set(false);
    outer.delete();
}

#[test]
fn remove_and_clear() {
    let client = page();
    let (list, items) = client
        .build(|| {
            let list = Element::new("ul")?;
            let items = list.build(|| (0..3).map(|_| Element::new("li")).collect::<Result<Vec<_>, _>>())?;
            Ok::<_, Error>((list, items))
        })
        .unwrap();
    list.remove_at(1).unwrap();
    assert_eq!(list.children().unwrap(), [items[0], items[2]]);
    list.remove(items[0]).unwrap();
    assert!(matches!(list.remove(items[0]), Err(Error::ElementDeleted { .. })));
    assert!(matches!(list.remove_at(5), Err(Error::Lookup { .. })));
    list.clear().unwrap();
    assert!(list.children().unwrap().is_empty());
    assert!(items.iter().all(Element::is_deleted));
}

#[test]
fn traversal_is_lazy_and_restartable() {
    let client = page();
    let (a, b, c) = client
        .build(|| {
            let a = Element::new("div")?;
            let (b, c) = a.build(|| {
                let b = Element::new("div")?;
                let c = b.build(|| Element::new("span"))?;
                Ok::<_, Error>((b, c))
            })?;
            Ok::<_, Error>((a, b, c))
        })
        .unwrap();
    let walk = a.descendants();
    assert_eq!(walk.clone().collect::<Vec<_>>(), [b, c]);
    assert_eq!(a.descendants().collect::<Vec<_>>(), [b, c]);
    assert_eq!(c.ancestors().collect::<Vec<_>>(), [b, a, client.root()]);

    let mut walk = a.descendants();
    assert_eq!(walk.next(), Some(b));
    c.delete();
    assert_eq!(walk.next(), None);
}

#[test]
fn display_renders_an_outline() {
    let client = page();
    let card = client
        .build(|| {
            let card = Element::new("div")?.mark("main")?;
            card.build(|| {
                Element::new("span")?.set_text("hello")?;
                Ok::<_, Error>(())
            })?;
            Ok::<_, Error>(card)
        })
        .unwrap();
    assert_eq!(card.to_string(), "Element [markers=main]\n Element [text=hello]");
}

// ── Outbox ───────────────────────────────────────────────────────────

#[test]
fn repeated_updates_collapse_into_one_record() {
    let client = page();
    let mut rx = attach(&client);
    let element = client.build(|| Element::new("div")).unwrap();
    client.flush();
    drain(&mut rx);

    for i in 0..5 {
        element.set_text(format!("v{i}")).unwrap();
        element.update();
    }
    assert_eq!(client.flush(), 1);
    let frames = drain(&mut rx);
    assert_eq!(frames.len(), 1);
    let Outbound::Update { elements } = &frames[0].message else {
        panic!("expected update, got {:?}", frames[0].message);
    };
    assert_eq!(elements.len(), 1);
    let state = elements[&element.id()].as_ref().unwrap();
    assert_eq!(state.text.as_deref(), Some("v4"));
}

#[test]
fn creation_and_deletion_are_serialized() {
    let client = page();
    let mut rx = attach(&client);
    let element = client.build(|| Element::new("span")).unwrap();
    client.flush();
    let frames = drain(&mut rx);
    let Outbound::Update { elements } = &frames[0].message else {
        panic!("expected update");
    };
    assert_eq!(elements[&client.root().id()].as_ref().unwrap().children, [element.id()]);
    assert_eq!(elements[&element.id()].as_ref().unwrap().tag, "span");

    element.delete();
    client.flush();
    let frames = drain(&mut rx);
    let Outbound::Update { elements } = &frames[0].message else {
        panic!("expected update");
    };
    assert_eq!(elements[&element.id()], None);
    assert!(elements[&client.root().id()].as_ref().unwrap().children.is_empty());
}

#[test]
fn nothing_is_drained_without_a_socket() {
    let client = page();
    client.build(|| Element::new("div")).unwrap();
    assert_eq!(client.flush(), 0);
    assert!(client.has_pending());
    let state = client.initial_state();
    assert_eq!(state.len(), 2);
    assert!(!client.has_pending());
}

#[test]
fn listeners_serialize_camel_cased() {
    let client = page();
    let element = client.build(|| Element::new("q-input")).unwrap();
    element
        .on_with(
            "update:model-value",
            Handler::sync(|_| Ok(())),
            ListenerOptions::default().args(["value"]).throttle(0.2),
        )
        .unwrap();
    let state = client.initial_state();
    let events = &state[&element.id()].events;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "update:modelValue");
    assert_eq!(events[0].args.as_deref(), Some(&["value".to_string()][..]));
}

// ── Events ───────────────────────────────────────────────────────────

#[test]
fn events_reach_handlers_inside_the_parent_slot() {
    let client = page();
    let (card, button) = client
        .build(|| {
            let card = Element::new("div")?;
            let button = card.build(|| Element::new("button"))?;
            Ok::<_, Error>((card, button))
        })
        .unwrap();
    let clicks = Rc::new(Cell::new(0));
    let counter = Rc::clone(&clicks);
    let listener = button
        .on(
            "click",
            Handler::sync(move |event| {
                counter.set(counter.get() + 1);
                assert_eq!(&*event.event_type, "click");
                Element::new("span")?;
                Ok(())
            }),
        )
        .unwrap();

    click(&client, button, listener);
    assert_eq!(clicks.get(), 1);
    assert_eq!(card.children().unwrap().len(), 2);
}

#[test]
fn stale_and_gated_events_are_dropped() {
    let client = page();
    let button = client.build(|| Element::new("button")).unwrap();
    let clicks = Rc::new(Cell::new(0));
    let counter = Rc::clone(&clicks);
    let listener = button
        .on("click", Handler::sync(move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        }))
        .unwrap();

    click(&client, button, ListenerId::next());
    button.set_visible(false).unwrap();
    click(&client, button, listener);
    button.set_visible(true).unwrap();

    button.ignore_events_when_disabled(true).unwrap();
    button.set_prop("disable", json!(true)).unwrap();
    click(&client, button, listener);
    button.set_prop("disable", json!(false)).unwrap();
    click(&client, button, listener);
    assert_eq!(clicks.get(), 1);

    button.delete();
    click(&client, button, listener);
    assert_eq!(clicks.get(), 1);
}

#[test]
fn handler_errors_go_to_the_exception_hook() {
    let client = page();
    let button = client.build(|| Element::new("button")).unwrap();
    let listener = button
        .on("click", Handler::sync(|_| Err("nope".into())))
        .unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    fweb_core::exception::set_exception_hook(move |origin, err| {
        sink.borrow_mut().push(format!("{origin}: {err}"));
    });
    click(&client, button, listener);
    fweb_core::exception::clear_exception_hook();
    assert_eq!(seen.borrow().len(), 1);
    assert!(seen.borrow()[0].starts_with("event handler `click`"));
    assert!(seen.borrow()[0].ends_with("nope"));
}

// ── Queries ──────────────────────────────────────────────────────────

#[test]
fn filter_finds_the_marked_button_inside_the_marked_card() {
    let client = page();
    let target = client
        .build(|| {
            Element::builder("q-btn").kind("Button").create()?;
            let card = Element::builder("q-card").kind("Card").create()?.mark("y")?;
            let target = card.build(|| {
                Element::builder("q-btn").kind("Button").create()?;
                Element::builder("q-btn").kind("Button").create()?.mark("x")
            })?;
            Ok::<_, Error>(target)
        })
        .unwrap();
    let found: Vec<Element> = client.build(|| {
        ElementFilter::new()
            .kind("Button")
            .marker("x")
            .within_marker("y")
            .iter()
            .map(Iterator::collect)
            .unwrap()
    });
    assert_eq!(found, [target]);
}

#[test]
fn filter_constraints_and_scopes() {
    let client = page();
    let (card, inside, outside) = client
        .build(|| {
            let card = Element::builder("q-card").kind("Card").create()?;
            let inside = card.build(|| {
                let label = Element::builder("div").kind("Label").create()?;
                label.set_text("Hello world")?;
                Ok::<_, Error>(label)
            })?;
            let outside = Element::builder("div").kind("Label").create()?.props("label=Hello")?;
            Ok::<_, Error>((card, inside, outside))
        })
        .unwrap();

    let query = |filter: ElementFilter| -> Vec<Element> { client.build(|| filter.iter().unwrap().collect()) };
    assert_eq!(query(ElementFilter::new().content("Hello")), [inside, outside]);
    assert_eq!(query(ElementFilter::new().kind("Label").within_kind("Card")), [inside]);
    assert_eq!(query(ElementFilter::new().kind("Label").not_within_kind("Card")), [outside]);
    assert_eq!(query(ElementFilter::new().kind("Label").not_within(card)), [outside]);
    assert_eq!(query(ElementFilter::new().kind("Label").exclude_content("world")), [outside]);
    assert_eq!(query(ElementFilter::new().exclude_kind("Label")), [card]);
    assert_eq!(card.build(|| ElementFilter::new().local_scope().iter().unwrap().collect::<Vec<_>>()), [inside]);
    assert_eq!(ElementFilter::new().under(card).iter().unwrap().collect::<Vec<_>>(), [inside]);

    // Evaluated at iteration time, not when built.
    let labels = ElementFilter::new().kind("Label").under(client.root());
    inside.delete();
    assert_eq!(labels.iter().unwrap().collect::<Vec<_>>(), [outside]);
}

#[test]
fn filter_outside_a_scope_needs_an_explicit_root() {
    assert!(matches!(ElementFilter::new().iter(), Err(Error::Context { .. })));
}

// ── Refreshable ──────────────────────────────────────────────────────

#[test]
fn refreshable_rebuilds_live_containers() {
    let client = page();
    let count = Rc::new(Cell::new(0));
    let source = Rc::clone(&count);
    let view = Refreshable::new(move || {
        for _ in 0..source.get() {
            Element::new("span")?;
        }
        Ok(())
    });
    let (first, second) = client.build(|| Ok::<_, Error>((view.render()?, view.render()?))).unwrap();
    assert!(first.children().unwrap().is_empty());

    count.set(2);
    assert_eq!(view.refresh().unwrap(), 2);
    assert_eq!(first.children().unwrap().len(), 2);
    assert_eq!(second.children().unwrap().len(), 2);

    second.delete();
    count.set(1);
    assert_eq!(view.refresh().unwrap(), 1);
    assert_eq!(first.children().unwrap().len(), 1);
    assert_eq!(view.len(), 1);
}
