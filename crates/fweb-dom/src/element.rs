#![forbid(unsafe_code)]

//! Element handles: creation, mutation, re-parenting, deletion, traversal.
//!
//! # Design
//!
//! An [`Element`] is a `Copy` handle `(client, element id, object id)`. The
//! node itself lives in its client's tree and every access resolves the
//! client through the registry, so a handle that outlives its client fails
//! with [`Error::ClientDeleted`] instead of dangling, and a handle to a
//! deleted node fails with [`Error::ElementDeleted`].
//!
//! Mutations schedule a full-state update in the client's outbox; the outbox
//! collapses repeated updates of one element until the next flush.
//!
//! Elements take part in bindings: declared bindable attributes (`visible`,
//! plus whatever a widget declares) are instrumented and propagate on
//! write, any other attribute name addresses a prop and is polled.
//!
//! # Invariants
//!
//! 1. Creation registers the node with its client and, when a slot is
//!    active, appends it to that slot before anything else observes it.
//! 2. Deleting a node deletes its whole subtree in pre-order, runs every
//!    delete hook, and removes every binding link of the removed nodes.
//! 3. No tree borrow is held while user callbacks run.

use std::fmt;
use std::rc::Rc;

use fweb_core::{ClientId, ElementId, Error, ListenerId, Result};
use fweb_runtime::reactive::{self, Bindable, BindingError, LinkId, ObjectId, Transform, TwoWayLink};
use serde_json::Value;

use crate::attrs::{ClassUpdate, parse_props, parse_style};
use crate::client::{Client, ScriptCall};
use crate::context::{self, SlotGuard};
use crate::listener::{Handler, Listener, ListenerOptions, event_type_to_camel_case};
use crate::slot::Slot;
use crate::tree::{BindableAttr, DEFAULT_SLOT, Node, Tree};

/// Kind reported by elements created without a widget kind.
pub const DEFAULT_KIND: &str = "Element";

/// Bindable attribute toggling the `hidden` class.
pub const VISIBLE_ATTR: &str = "visible";

/// Runs after a bindable attribute changed.
pub type ChangeHook = Rc<dyn Fn(Element, &Value) -> Result<()>>;

/// Runs once when the element is deleted.
pub type DeleteHook = Box<dyn FnOnce(Element)>;

// ─── Tag grammar ─────────────────────────────────────────────────────────────

fn is_tag_start(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}' | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' | '\u{10000}'..='\u{EFFFF}')
}

fn is_tag_char(c: char) -> bool {
    is_tag_start(c)
        || matches!(c, '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

/// Check `tag` against the XML name production.
///
/// ```
/// use fweb_dom::element::validate_tag;
///
/// assert!(validate_tag("q-btn").is_ok());
/// assert!(validate_tag("svg:path").is_ok());
/// assert!(validate_tag("1div").is_err());
/// assert!(validate_tag("di v").is_err());
/// ```
pub fn validate_tag(tag: &str) -> Result<()> {
    let mut chars = tag.chars();
    let valid = chars.next().is_some_and(is_tag_start) && chars.all(is_tag_char);
    if valid {
        Ok(())
    } else {
        Err(Error::invalid("HTML tag", tag, "not a valid element name"))
    }
}

// ─── Builder ─────────────────────────────────────────────────────────────────

/// Options for creating an element.
#[derive(Debug)]
#[must_use]
pub struct ElementBuilder {
    tag: String,
    kind: &'static str,
    client: Option<Client>,
    component: Option<String>,
    libraries: Vec<String>,
}

impl ElementBuilder {
    /// Kind name used by filters and the tree `Display`.
    pub fn kind(mut self, kind: &'static str) -> Self {
        self.kind = kind;
        self
    }

    /// Create for `client` instead of the client of the current context.
    pub fn client(mut self, client: &Client) -> Self {
        self.client = Some(client.clone());
        self
    }

    /// Browser-side component rendering this element.
    pub fn component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn library(mut self, library: impl Into<String>) -> Self {
        self.libraries.push(library.into());
        self
    }

    /// Create the element inside the current slot.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for a malformed tag or when the active slot
    ///   belongs to a different client than the requested one.
    /// - [`Error::Context`] when no client is given and no slot is active.
    pub fn create(self) -> Result<Element> {
        validate_tag(&self.tag)?;
        let slot = context::current_slot().ok();
        let client = match self.client {
            Some(client) => client,
            None => slot.as_ref().ok_or_else(Error::no_scope)?.element().client()?,
        };
        if client.is_deleted() {
            return Err(Error::ClientDeleted { client: client.id() });
        }
        if let Some(slot) = &slot
            && slot.element().client_id() != client.id()
        {
            return Err(Error::invalid(
                "parent slot",
                format!("{slot:?}"),
                format!("the active slot does not belong to {}", client.id()),
            ));
        }

        let element = {
            let mut tree = client.tree().borrow_mut();
            if let Some(slot) = &slot {
                let parent = tree
                    .get(slot.element().id())
                    .ok_or(Error::ElementDeleted { element: slot.element().id() })?;
                if !parent.slots.contains_key(slot.name()) {
                    return Err(Error::missing_slot(slot.element().id(), slot.name()));
                }
            }
            let id = tree.allocate();
            let mut node = Node::new(self.kind, self.tag);
            node.component = self.component;
            node.libraries = self.libraries;
            let object = node.object;
            tree.nodes.insert(id, node);
            if let Some(slot) = &slot {
                tree.attach(id, slot.element().id(), slot.name_rc(), None);
            }
            Element::from_parts(client.id(), id, object)
        };
        client.enqueue_update(element.id);
        if let Some(slot) = &slot {
            client.enqueue_update(slot.element().id());
        }
        element.declare_bindable(VISIBLE_ATTR, Value::Bool(true), Some(Rc::new(apply_visibility)))?;
        tracing::trace!(client = %client.id(), element = %element.id, kind = self.kind, "element.create");
        Ok(element)
    }
}

fn apply_visibility(element: Element, value: &Value) -> Result<()> {
    let visible = value.as_bool().unwrap_or(true);
    let update = if visible {
        ClassUpdate::remove("hidden")
    } else {
        ClassUpdate::add("hidden")
    };
    element.update_classes(&update)?;
    Ok(())
}

// ─── Element ─────────────────────────────────────────────────────────────────

/// Handle to one node of a client's tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Element {
    client: ClientId,
    id: ElementId,
    object: ObjectId,
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Element({}#{})", self.client, self.id)
    }
}

impl Element {
    pub(crate) fn from_parts(client: ClientId, id: ElementId, object: ObjectId) -> Self {
        Self { client, id, object }
    }

    /// Create a plain element with `tag` in the current slot.
    pub fn new(tag: &str) -> Result<Self> {
        Self::builder(tag).create()
    }

    pub fn builder(tag: impl Into<String>) -> ElementBuilder {
        ElementBuilder {
            tag: tag.into(),
            kind: DEFAULT_KIND,
            client: None,
            component: None,
            libraries: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ElementId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn client_id(&self) -> ClientId {
        self.client
    }

    #[inline]
    #[must_use]
    pub fn object_id(&self) -> ObjectId {
        self.object
    }

    /// The owning client.
    pub fn client(&self) -> Result<Client> {
        Client::lookup(self.client)
    }

    #[must_use]
    pub fn html_id(&self) -> String {
        self.id.html_id()
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.with_node(|_| ()).is_err()
    }

    // ── Node access ──────────────────────────────────────────────────

    pub(crate) fn with_tree<R>(&self, f: impl FnOnce(&Tree) -> R) -> Result<R> {
        let client = self.client()?;
        let tree = client.tree().borrow();
        Ok(f(&tree))
    }

    pub(crate) fn with_node<R>(&self, f: impl FnOnce(&Node) -> R) -> Result<R> {
        self.with_tree(|tree| tree.get(self.id).map(f))?
            .ok_or(Error::ElementDeleted { element: self.id })
    }

    pub(crate) fn with_node_mut<R>(&self, f: impl FnOnce(&mut Node) -> R) -> Result<R> {
        let client = self.client()?;
        let mut tree = client.tree().borrow_mut();
        let node = tree
            .get_mut(self.id)
            .ok_or(Error::ElementDeleted { element: self.id })?;
        Ok(f(node))
    }

    /// Mutate the node and schedule an update.
    fn modify<R>(&self, f: impl FnOnce(&mut Node) -> R) -> Result<R> {
        let out = self.with_node_mut(f)?;
        self.update();
        Ok(out)
    }

    /// Schedule a full-state update. A no-op for deleted elements.
    pub fn update(&self) {
        if let Ok(client) = self.client()
            && !self.is_deleted()
        {
            client.enqueue_update(self.id);
        }
    }

    // ── Content ──────────────────────────────────────────────────────

    pub fn kind(&self) -> Result<&'static str> {
        self.with_node(|node| node.kind)
    }

    pub fn tag(&self) -> Result<String> {
        self.with_node(|node| node.tag.clone())
    }

    pub fn text(&self) -> Result<Option<String>> {
        self.with_node(|node| node.text.clone())
    }

    pub fn set_text(&self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.modify(|node| node.text = Some(text))
    }

    /// Add whitespace-separated classes.
    pub fn classes(self, add: &str) -> Result<Self> {
        self.update_classes(&ClassUpdate::add(add))?;
        Ok(self)
    }

    /// Apply a class update; returns whether the class list changed.
    pub fn update_classes(&self, update: &ClassUpdate) -> Result<bool> {
        let changed = self.with_node_mut(|node| update.apply(&mut node.classes))?;
        if changed {
            self.update();
        }
        Ok(changed)
    }

    pub fn class_list(&self) -> Result<Vec<String>> {
        self.with_node(|node| node.classes.clone())
    }

    /// Merge `;`-separated style declarations.
    pub fn style(self, declarations: &str) -> Result<Self> {
        let parsed = parse_style(declarations);
        self.modify(|node| node.style.extend(parsed))?;
        Ok(self)
    }

    pub fn remove_style(self, keys: &[&str]) -> Result<Self> {
        self.modify(|node| node.style.retain(|k, _| !keys.contains(&k.as_str())))?;
        Ok(self)
    }

    pub fn style_value(&self, key: &str) -> Result<Option<String>> {
        self.with_node(|node| node.style.get(key).cloned())
    }

    /// Merge props from a prop string such as `dense label="A b"`.
    pub fn props(self, props: &str) -> Result<Self> {
        let parsed = parse_props(props);
        self.modify(|node| node.props.extend(parsed))?;
        Ok(self)
    }

    /// Remove whitespace-separated prop keys.
    pub fn remove_props(self, keys: &str) -> Result<Self> {
        let keys: Vec<&str> = keys.split_whitespace().collect();
        self.modify(|node| node.props.retain(|k, _| !keys.contains(&k.as_str())))?;
        Ok(self)
    }

    /// Set one prop. Returns whether it changed.
    pub fn set_prop(&self, key: &str, value: Value) -> Result<bool> {
        let changed = self.with_node_mut(|node| {
            if node.props.get(key) == Some(&value) {
                false
            } else {
                node.props.insert(key.to_string(), value);
                true
            }
        })?;
        if changed {
            self.update();
        }
        Ok(changed)
    }

    pub fn prop(&self, key: &str) -> Result<Option<Value>> {
        self.with_node(|node| node.props.get(key).cloned())
    }

    /// Replace the markers with whitespace-separated `markers`.
    pub fn mark(self, markers: &str) -> Result<Self> {
        let markers = markers.split_whitespace().map(str::to_string).collect();
        self.with_node_mut(|node| node.markers = markers)?;
        Ok(self)
    }

    pub fn markers(&self) -> Result<Vec<String>> {
        self.with_node(|node| node.markers.clone())
    }

    // ── Slots and structure ──────────────────────────────────────────

    #[must_use]
    pub fn default_slot(&self) -> Slot {
        Slot::new(*self, Rc::from(DEFAULT_SLOT))
    }

    /// Add a named slot, or replace the template of an existing one.
    pub fn add_slot(&self, name: &str, template: Option<String>) -> Result<Slot> {
        let name: Rc<str> = self.modify(|node| {
            let key = node
                .slots
                .get_key_value(name)
                .map_or_else(|| Rc::from(name), |(k, _)| Rc::clone(k));
            node.slots.entry(Rc::clone(&key)).or_default().template = template;
            key
        })?;
        Ok(Slot::new(*self, name))
    }

    /// Look up a named slot.
    ///
    /// # Errors
    ///
    /// [`Error::Lookup`] if the slot was never added.
    pub fn slot(&self, name: &str) -> Result<Slot> {
        let key = self.with_node(|node| node.slots.get_key_value(name).map(|(k, _)| Rc::clone(k)))?;
        key.map(|key| Slot::new(*self, key))
            .ok_or_else(|| Error::missing_slot(self.id, name))
    }

    pub fn slot_names(&self) -> Result<Vec<String>> {
        self.with_node(|node| node.slots.keys().map(|k| k.to_string()).collect())
    }

    /// Enter the default slot until the guard drops.
    pub fn enter(&self) -> Result<SlotGuard> {
        self.default_slot().enter()
    }

    /// Run `f` with the default slot entered.
    pub fn build<R>(&self, f: impl FnOnce() -> R) -> R {
        self.default_slot().build(f)
    }

    /// The slot containing this element; `None` for roots.
    pub fn parent_slot(&self) -> Result<Option<Slot>> {
        self.with_tree(|tree| {
            let node = tree.get(self.id).ok_or(Error::ElementDeleted { element: self.id })?;
            Ok(node
                .parent
                .as_ref()
                .and_then(|(parent, name)| tree.handle(*parent).map(|p| Slot::new(p, Rc::clone(name)))))
        })?
    }

    pub fn parent(&self) -> Result<Option<Element>> {
        Ok(self.parent_slot()?.map(|slot| slot.element()))
    }

    /// Children of the default slot.
    pub fn children(&self) -> Result<Vec<Element>> {
        self.default_slot().children()
    }

    /// Parents, nearest first. Each call starts a fresh walk.
    #[must_use]
    pub fn ancestors(&self) -> Ancestors {
        Ancestors { next: Some(*self) }
    }

    /// Descendants in pre-order, every slot included, `self` excluded.
    #[must_use]
    pub fn descendants(&self) -> Descendants {
        Descendants {
            stack: self.all_children().into_iter().rev().collect(),
        }
    }

    fn all_children(&self) -> Vec<Element> {
        self.with_tree(|tree| {
            tree.get(self.id)
                .map(|node| node.children().filter_map(|id| tree.handle(id)).collect())
                .unwrap_or_default()
        })
        .unwrap_or_default()
    }

    /// Move into `target`'s slot at `index`.
    ///
    /// `target` defaults to the current parent, `index` to the end, `slot` to
    /// `default`.
    ///
    /// # Errors
    ///
    /// - [`Error::Lookup`] if the target slot does not exist.
    /// - [`Error::Validation`] when moving a root, moving into the element's
    ///   own subtree, or across clients.
    pub fn move_to(&self, target: Option<Element>, index: Option<usize>, slot: Option<&str>) -> Result<()> {
        let client = self.client()?;
        let target = match target {
            Some(target) => target,
            None => self
                .parent()?
                .ok_or_else(|| Error::invalid("move", self.id.to_string(), "a root element cannot be moved"))?,
        };
        if target.client != self.client {
            return Err(Error::invalid(
                "move target",
                target.id.to_string(),
                "elements cannot move between clients",
            ));
        }
        let slot_name = slot.unwrap_or(DEFAULT_SLOT);
        let old_parent = {
            let mut tree = client.tree().borrow_mut();
            let node = tree.get(self.id).ok_or(Error::ElementDeleted { element: self.id })?;
            if node.parent.is_none() {
                return Err(Error::invalid("move", self.id.to_string(), "a root element cannot be moved"));
            }
            let name = tree
                .get(target.id)
                .ok_or(Error::ElementDeleted { element: target.id })?
                .slots
                .get_key_value(slot_name)
                .map(|(k, _)| Rc::clone(k))
                .ok_or_else(|| Error::missing_slot(target.id, slot_name))?;
            if target.id == self.id || tree.ancestors(target.id).contains(&self.id) {
                return Err(Error::invalid(
                    "move target",
                    target.id.to_string(),
                    "an element cannot move into its own subtree",
                ));
            }
            let old_parent = tree.detach(self.id);
            tree.attach(self.id, target.id, &name, index);
            old_parent
        };
        if let Some(parent) = old_parent {
            client.enqueue_update(parent);
        }
        client.enqueue_update(target.id);
        Ok(())
    }

    /// Delete `child`, which must sit in one of this element's slots.
    pub fn remove(&self, child: Element) -> Result<()> {
        if child.parent()? != Some(*self) {
            return Err(Error::lookup(format!("element {} is not a child of element {}", child.id, self.id)));
        }
        child.delete();
        Ok(())
    }

    /// Delete the child at `index` of the default slot.
    pub fn remove_at(&self, index: usize) -> Result<()> {
        let child = self
            .children()?
            .get(index)
            .copied()
            .ok_or_else(|| Error::lookup(format!("element {} has no child at index {index}", self.id)))?;
        child.delete();
        Ok(())
    }

    /// Delete this element and its subtree. Deleting a client root clears
    /// it instead; deleting twice is a no-op.
    pub fn delete(&self) {
        let Ok(client) = self.client() else {
            return;
        };
        if self.id == client.root().id {
            let _ = self.clear();
            return;
        }
        delete_subtree(&client, self.id);
    }

    /// Delete every child in every slot.
    pub fn clear(&self) -> Result<()> {
        let client = self.client()?;
        for child in self.all_children() {
            delete_subtree(&client, child.id);
        }
        self.update();
        Ok(())
    }

    /// Run `hook` once when this element is deleted.
    pub fn on_delete(&self, hook: impl FnOnce(Element) + 'static) -> Result<()> {
        self.with_node_mut(|node| node.delete_hooks.push(Box::new(hook)))
    }

    // ── Events ───────────────────────────────────────────────────────

    /// Register `handler` for `event_type` with default options.
    pub fn on(&self, event_type: &str, handler: Handler) -> Result<ListenerId> {
        self.on_with(event_type, handler, ListenerOptions::default())
    }

    pub fn on_with(&self, event_type: &str, handler: Handler, options: ListenerOptions) -> Result<ListenerId> {
        let listener = Listener {
            id: ListenerId::next(),
            event_type: Rc::from(event_type_to_camel_case(event_type)),
            options,
            handler,
        };
        let id = listener.id;
        self.modify(|node| node.listeners.insert(id, listener))?;
        Ok(id)
    }

    pub fn remove_listener(&self, id: ListenerId) -> Result<bool> {
        self.modify(|node| node.listeners.shift_remove(&id).is_some())
    }

    /// Drop inbound events while the `disable` prop is `true`.
    pub fn ignore_events_when_disabled(&self, enabled: bool) -> Result<()> {
        self.with_node_mut(|node| node.gate_on_disable = enabled)
    }

    /// Call `name` on the browser-side component and await its result.
    pub fn run_method(&self, name: &str, args: &[Value]) -> Result<ScriptCall> {
        let code = format!(
            "return runMethod({}, {}, {})",
            self.id,
            serde_json::to_string(name)?,
            serde_json::to_string(args)?
        );
        Ok(self.client()?.run_script(code, None))
    }

    // ── Bindable attributes ──────────────────────────────────────────

    /// Declare an instrumented attribute and apply `initial` through
    /// `on_change`.
    pub fn declare_bindable(&self, attr: &str, initial: Value, on_change: Option<ChangeHook>) -> Result<()> {
        let hook = on_change.clone();
        self.with_node_mut(|node| {
            node.bindables.insert(
                Rc::from(attr),
                BindableAttr {
                    value: initial.clone(),
                    hooks: on_change.into_iter().collect(),
                },
            )
        })?;
        if let Some(hook) = hook {
            hook(*self, &initial)?;
        }
        Ok(())
    }

    /// Run `hook` after every change of a declared bindable attribute.
    ///
    /// # Errors
    ///
    /// [`Error::Lookup`] if `attr` was never declared.
    pub fn observe_bindable(&self, attr: &str, hook: ChangeHook) -> Result<()> {
        self.with_node_mut(|node| match node.bindables.get_mut(attr) {
            Some(bindable) => {
                bindable.hooks.push(hook);
                Ok(())
            }
            None => Err(Error::lookup(format!(
                "element {} has no bindable attribute `{attr}`",
                self.id
            ))),
        })?
    }

    /// Current value of a declared bindable attribute.
    pub fn bindable(&self, attr: &str) -> Result<Option<Value>> {
        self.with_node(|node| node.bindables.get(attr).map(|b| b.value.clone()))
    }

    /// Write a declared bindable attribute, run its change hooks, then
    /// propagate. Returns whether the value changed.
    pub fn set_bindable(&self, attr: &str, value: Value) -> Result<bool> {
        let changed = self.apply_bindable(attr, value)?;
        if changed {
            reactive::propagate(self.object, attr);
        }
        Ok(changed)
    }

    fn apply_bindable(&self, attr: &str, value: Value) -> Result<bool> {
        let hooks = self.with_node_mut(|node| match node.bindables.get_mut(attr) {
            None => Err(Error::lookup(format!(
                "element {} has no bindable attribute `{attr}`",
                self.id
            ))),
            Some(bindable) if bindable.value == value => Ok(None),
            Some(bindable) => {
                bindable.value = value.clone();
                Ok(Some(bindable.hooks.clone()))
            }
        })??;
        let Some(hooks) = hooks else {
            return Ok(false);
        };
        for hook in hooks {
            hook(*self, &value)?;
        }
        Ok(true)
    }

    pub fn visible(&self) -> Result<bool> {
        Ok(self
            .bindable(VISIBLE_ATTR)?
            .and_then(|v| v.as_bool())
            .unwrap_or(true))
    }

    pub fn set_visible(&self, visible: bool) -> Result<()> {
        self.set_bindable(VISIBLE_ATTR, Value::Bool(visible))?;
        Ok(())
    }

    /// Link `self.attr → target.target_attr`.
    pub fn bind_to<T>(&self, attr: &str, target: &T, target_attr: &str, forward: Option<Transform>) -> LinkId
    where
        T: Bindable + Clone + 'static,
    {
        reactive::bind_to(self, attr, target, target_attr, forward)
    }

    /// Link `source.source_attr → self.attr`.
    pub fn bind_from<S>(&self, attr: &str, source: &S, source_attr: &str, backward: Option<Transform>) -> LinkId
    where
        S: Bindable + Clone + 'static,
    {
        reactive::bind_from(self, attr, source, source_attr, backward)
    }

    /// Two-way link; `self.attr` takes the other side's value first.
    pub fn bind<O>(
        &self,
        attr: &str,
        other: &O,
        other_attr: &str,
        forward: Option<Transform>,
        backward: Option<Transform>,
    ) -> TwoWayLink
    where
        O: Bindable + Clone + 'static,
    {
        reactive::bind(self, attr, other, other_attr, forward, backward)
    }

    pub fn bind_visibility_from<S>(&self, source: &S, source_attr: &str, backward: Option<Transform>) -> LinkId
    where
        S: Bindable + Clone + 'static,
    {
        self.bind_from(VISIBLE_ATTR, source, source_attr, backward)
    }
}

/// Delete `root` and its subtree from `client`.
fn delete_subtree(client: &Client, root: ElementId) {
    let ids = client.tree().borrow().subtree(root);
    if ids.is_empty() {
        return;
    }
    for id in &ids {
        let hooks = {
            let mut tree = client.tree().borrow_mut();
            tree.get_mut(*id)
                .map(|node| (std::mem::take(&mut node.delete_hooks), node.object))
        };
        if let Some((hooks, object)) = hooks {
            let element = Element::from_parts(client.id(), *id, object);
            for hook in hooks {
                hook(element);
            }
        }
    }
    let (parent, objects) = {
        let mut tree = client.tree().borrow_mut();
        let parent = tree.detach(root);
        let objects: Vec<ObjectId> = ids
            .iter()
            .filter_map(|id| tree.nodes.remove(id))
            .map(|node| node.object)
            .collect();
        (parent, objects)
    };
    reactive::remove(objects);
    for id in &ids {
        client.enqueue_update(*id);
    }
    if let Some(parent) = parent {
        client.enqueue_update(parent);
    }
    tracing::trace!(client = %client.id(), element = %root, removed = ids.len(), "element.delete");
}

impl Bindable for Element {
    fn object_id(&self) -> ObjectId {
        self.object
    }

    fn read(&self, attr: &str) -> Option<Value> {
        self.with_node(|node| {
            node.bindables
                .get(attr)
                .map(|b| b.value.clone())
                .or_else(|| node.props.get(attr).cloned())
        })
        .ok()
        .flatten()
    }

    fn write(&self, attr: &str, value: Value) -> std::result::Result<(), BindingError> {
        let Ok(declared) = self.with_node(|node| node.bindables.contains_key(attr)) else {
            return Ok(());
        };
        if declared {
            self.apply_bindable(attr, value)?;
        } else {
            self.set_prop(attr, value)?;
        }
        Ok(())
    }

    fn is_instrumented(&self, attr: &str) -> bool {
        self.with_node(|node| node.bindables.contains_key(attr))
            .unwrap_or(false)
    }

    fn is_alive(&self) -> bool {
        !self.is_deleted()
    }
}

// ─── Traversal ───────────────────────────────────────────────────────────────

/// Lazy walk towards the root.
#[derive(Debug, Clone)]
pub struct Ancestors {
    next: Option<Element>,
}

impl Iterator for Ancestors {
    type Item = Element;

    fn next(&mut self) -> Option<Element> {
        let parent = self.next.take()?.parent().ok().flatten();
        self.next = parent;
        parent
    }
}

/// Lazy pre-order walk below an element.
#[derive(Debug, Clone)]
pub struct Descendants {
    stack: Vec<Element>,
}

impl Iterator for Descendants {
    type Item = Element;

    fn next(&mut self) -> Option<Element> {
        loop {
            let next = self.stack.pop()?;
            if next.is_deleted() {
                continue;
            }
            self.stack.extend(next.all_children().into_iter().rev());
            return Some(next);
        }
    }
}

// ─── Display ─────────────────────────────────────────────────────────────────

impl fmt::Display for Element {
    /// Indented outline of the default-slot subtree.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(lines) = self.with_tree(|tree| {
            let mut lines = Vec::new();
            outline(tree, self.id, 0, &mut lines);
            lines
        }) else {
            return write!(f, "<element {} of deleted {}>", self.id, self.client);
        };
        if lines.is_empty() {
            return write!(f, "<deleted element {}>", self.id);
        }
        f.write_str(&lines.join("\n"))
    }
}

fn outline(tree: &Tree, id: ElementId, depth: usize, lines: &mut Vec<String>) {
    let Some(node) = tree.get(id) else {
        return;
    };
    lines.push(format!("{:depth$}{}", "", node.summary()));
    if let Some(slot) = node.slots.get(DEFAULT_SLOT) {
        for child in &slot.children {
            outline(tree, *child, depth + 1, lines);
        }
    }
}
