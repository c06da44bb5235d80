#![forbid(unsafe_code)]

//! Element storage of one client.
//!
//! # Invariants
//!
//! 1. `parent` of a node names a slot of a live node whose children contain
//!    the node exactly once.
//! 2. Element ids are allocated from a monotonically increasing counter and
//!    never reused.
//! 3. Every node has a `default` slot.

use std::fmt::Write as _;
use std::rc::Rc;

use ahash::AHashMap;
use fweb_core::protocol::{ElementState, SlotState};
use fweb_core::{ClientId, ElementId, ListenerId};
use fweb_runtime::reactive::ObjectId;
use indexmap::IndexMap;
use serde_json::Value;

use crate::element::{ChangeHook, DeleteHook, Element};
use crate::listener::Listener;

pub(crate) const DEFAULT_SLOT: &str = "default";

#[derive(Debug, Default)]
pub(crate) struct SlotData {
    pub(crate) children: Vec<ElementId>,
    pub(crate) template: Option<String>,
}

pub(crate) struct BindableAttr {
    pub(crate) value: Value,
    pub(crate) hooks: Vec<ChangeHook>,
}

pub(crate) struct Node {
    pub(crate) object: ObjectId,
    pub(crate) kind: &'static str,
    pub(crate) tag: String,
    pub(crate) text: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) style: IndexMap<String, String>,
    pub(crate) props: IndexMap<String, Value>,
    pub(crate) slots: IndexMap<Rc<str>, SlotData>,
    pub(crate) listeners: IndexMap<ListenerId, Listener>,
    pub(crate) markers: Vec<String>,
    pub(crate) component: Option<String>,
    pub(crate) libraries: Vec<String>,
    pub(crate) parent: Option<(ElementId, Rc<str>)>,
    pub(crate) bindables: IndexMap<Rc<str>, BindableAttr>,
    pub(crate) delete_hooks: Vec<DeleteHook>,
    /// Drop inbound events while the `disable` prop is true.
    pub(crate) gate_on_disable: bool,
}

impl Node {
    pub(crate) fn new(kind: &'static str, tag: String) -> Self {
        let mut slots = IndexMap::new();
        slots.insert(Rc::from(DEFAULT_SLOT), SlotData::default());
        Self {
            object: ObjectId::next(),
            kind,
            tag,
            text: None,
            classes: Vec::new(),
            style: IndexMap::new(),
            props: IndexMap::new(),
            slots,
            listeners: IndexMap::new(),
            markers: Vec::new(),
            component: None,
            libraries: Vec::new(),
            parent: None,
            bindables: IndexMap::new(),
            delete_hooks: Vec::new(),
            gate_on_disable: false,
        }
    }

    pub(crate) fn children(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.slots.values().flat_map(|slot| slot.children.iter().copied())
    }

    pub(crate) fn is_hidden(&self) -> bool {
        self.classes.iter().any(|c| c == "hidden")
    }

    pub(crate) fn is_disabled(&self) -> bool {
        self.gate_on_disable && self.props.get("disable").and_then(Value::as_bool) == Some(true)
    }

    pub(crate) fn state(&self, id: ElementId) -> ElementState {
        let mut slots = IndexMap::new();
        let mut children = Vec::new();
        for (name, slot) in &self.slots {
            if &**name == DEFAULT_SLOT {
                children.clone_from(&slot.children);
            } else {
                slots.insert(
                    name.to_string(),
                    SlotState {
                        ids: slot.children.clone(),
                        template: slot.template.clone(),
                    },
                );
            }
        }
        ElementState {
            id,
            tag: self.tag.clone(),
            text: self.text.clone(),
            classes: self.classes.clone(),
            style: self.style.clone(),
            props: self.props.clone(),
            slots,
            children,
            events: self.listeners.values().map(Listener::state).collect(),
            component: self.component.clone(),
            libraries: self.libraries.clone(),
        }
    }

    /// One-line summary used by the tree `Display`.
    pub(crate) fn summary(&self) -> String {
        let mut additions = Vec::new();
        if !self.markers.is_empty() {
            additions.push(format!("markers={}", self.markers.join(", ")));
        }
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            additions.push(format!("text={}", shorten(text)));
        }
        for (key, value) in &self.props {
            let rendered = match value {
                Value::String(s) => shorten(s),
                other => other.to_string(),
            };
            additions.push(format!("{key}={rendered}"));
        }
        let mut line = self.kind.to_string();
        if !additions.is_empty() {
            let _ = write!(line, " [{}]", additions.join(", "));
        }
        line
    }
}

fn shorten(text: &str) -> String {
    const MAX: usize = 20;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX - 3).collect();
        format!("{head}...")
    }
}

pub(crate) struct Tree {
    client: ClientId,
    pub(crate) nodes: AHashMap<ElementId, Node>,
    next_id: u64,
}

impl Tree {
    pub(crate) fn new(client: ClientId) -> Self {
        Self {
            client,
            nodes: AHashMap::new(),
            next_id: 0,
        }
    }

    pub(crate) fn handle(&self, id: ElementId) -> Option<Element> {
        self.nodes
            .get(&id)
            .map(|node| Element::from_parts(self.client, id, node.object))
    }

    pub(crate) fn allocate(&mut self) -> ElementId {
        let id = ElementId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn get(&self, id: ElementId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: ElementId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// `id` followed by its descendants, depth first, slots in declaration
    /// order.
    pub(crate) fn subtree(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(node) = self.nodes.get(&next) else {
                continue;
            };
            out.push(next);
            let children: Vec<_> = node.children().collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Parents of `id`, nearest first.
    pub(crate) fn ancestors(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut cursor = self.nodes.get(&id).and_then(|n| n.parent.as_ref().map(|(p, _)| *p));
        while let Some(parent) = cursor {
            out.push(parent);
            cursor = self.nodes.get(&parent).and_then(|n| n.parent.as_ref().map(|(p, _)| *p));
        }
        out
    }

    /// Remove `id` from its parent's slot. Returns the former parent.
    pub(crate) fn detach(&mut self, id: ElementId) -> Option<ElementId> {
        let (parent, slot) = self.nodes.get_mut(&id)?.parent.take()?;
        if let Some(children) = self
            .nodes
            .get_mut(&parent)
            .and_then(|p| p.slots.get_mut(&slot))
            .map(|s| &mut s.children)
        {
            children.retain(|child| *child != id);
        }
        Some(parent)
    }

    /// Insert `id` into `parent.slot` at `index` (clamped; `None` appends).
    pub(crate) fn attach(&mut self, id: ElementId, parent: ElementId, slot: &Rc<str>, index: Option<usize>) {
        if let Some(children) = self
            .nodes
            .get_mut(&parent)
            .and_then(|p| p.slots.get_mut(slot))
            .map(|s| &mut s.children)
        {
            let index = index.map_or(children.len(), |i| i.min(children.len()));
            children.insert(index, id);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Some((parent, Rc::clone(slot)));
        }
    }
}
