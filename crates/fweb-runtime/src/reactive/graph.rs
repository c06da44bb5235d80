#![forbid(unsafe_code)]

//! The binding graph and its propagation pass.
//!
//! # Design
//!
//! Links live in a [`SlotMap`] arena and are addressed by opaque [`LinkId`]
//! handles. Two indexes sit next to the arena:
//!
//! - `outgoing`: `(object, attr)` → links whose source is that vertex;
//! - `by_object`: object → every link touching it as source or target.
//!
//! Endpoint handles (`Rc<dyn Bindable>`) are reference counted by the number
//! of links touching the object and dropped with the last one, so removing an
//! object costs O(degree).
//!
//! The graph is owned by the runtime thread. Nothing here is `Send`.
//!
//! # Invariants
//!
//! 1. Every `LinkId` stored in an index refers to a live arena slot.
//! 2. An endpoint exists iff at least one link references its object.
//! 3. During one propagation pass a vertex is written at most once, and the
//!    vertex that started the pass is never written.
//! 4. No graph borrow is held while user code (reads, writes, transforms)
//!    runs.
//!
//! # Failure Modes
//!
//! - **Transform or write error**: reported through
//!   [`fweb_core::exception::report`]; the affected edge is skipped and the
//!   pass continues with its siblings.
//! - **Dead target**: skipped silently.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};
use serde_json::Value;
use slotmap::{SlotMap, new_key_type};

use super::bindable::{Bindable, NodeKey, ObjectId};
use super::transform::Transform;

new_key_type! {
    /// Handle of one directed link.
    pub struct LinkId;
}

/// The two links created by [`bind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwoWayLink {
    /// `a → b`
    pub forward: LinkId,
    /// `b → a`
    pub backward: LinkId,
}

/// Counters describing the current graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphStats {
    pub links: usize,
    pub polled_links: usize,
    pub objects: usize,
}

pub(super) struct Link {
    pub(super) source: NodeKey,
    pub(super) target: NodeKey,
    transform: Option<Transform>,
    /// Last observed source value; present only for polled links.
    pub(super) snapshot: Option<Option<Value>>,
}

struct Endpoint {
    handle: Rc<dyn Bindable>,
    links: usize,
}

#[derive(Default)]
pub(super) struct Graph {
    pub(super) links: SlotMap<LinkId, Link>,
    outgoing: AHashMap<NodeKey, Vec<LinkId>>,
    by_object: AHashMap<ObjectId, Vec<LinkId>>,
    endpoints: AHashMap<ObjectId, Endpoint>,
}

/// An edge copied out of the graph so the borrow can be released.
struct Edge {
    target: NodeKey,
    handle: Rc<dyn Bindable>,
    transform: Option<Transform>,
}

thread_local! {
    static GRAPH: RefCell<Graph> = RefCell::new(Graph::default());
}

pub(super) fn with_graph<R>(f: impl FnOnce(&mut Graph) -> R) -> R {
    GRAPH.with(|graph| f(&mut graph.borrow_mut()))
}

impl Graph {
    fn retain_endpoint(&mut self, handle: &Rc<dyn Bindable>) {
        self.endpoints
            .entry(handle.object_id())
            .or_insert_with(|| Endpoint {
                handle: Rc::clone(handle),
                links: 0,
            })
            .links += 1;
    }

    fn release_endpoint(&mut self, object: ObjectId) {
        if let Some(endpoint) = self.endpoints.get_mut(&object) {
            endpoint.links = endpoint.links.saturating_sub(1);
            if endpoint.links == 0 {
                self.endpoints.remove(&object);
            }
        }
    }

    fn insert(
        &mut self,
        source: &Rc<dyn Bindable>,
        source_attr: &str,
        target: &Rc<dyn Bindable>,
        target_attr: &str,
        transform: Option<Transform>,
        polled: bool,
    ) -> LinkId {
        let source_key = NodeKey::new(source.object_id(), source_attr);
        let target_key = NodeKey::new(target.object_id(), target_attr);
        let same_object = source_key.object == target_key.object;

        let id = self.links.insert(Link {
            source: source_key.clone(),
            target: target_key.clone(),
            transform,
            snapshot: polled.then_some(None),
        });
        self.outgoing.entry(source_key.clone()).or_default().push(id);
        self.by_object.entry(source_key.object).or_default().push(id);
        self.retain_endpoint(source);
        if !same_object {
            self.by_object.entry(target_key.object).or_default().push(id);
            self.retain_endpoint(target);
        }
        id
    }

    fn remove_link(&mut self, id: LinkId) -> bool {
        let Some(link) = self.links.remove(id) else {
            return false;
        };
        if let Some(out) = self.outgoing.get_mut(&link.source) {
            out.retain(|l| *l != id);
            if out.is_empty() {
                self.outgoing.remove(&link.source);
            }
        }
        let mut objects = vec![link.source.object];
        if link.target.object != link.source.object {
            objects.push(link.target.object);
        }
        for object in objects {
            if let Some(list) = self.by_object.get_mut(&object) {
                list.retain(|l| *l != id);
                if list.is_empty() {
                    self.by_object.remove(&object);
                }
            }
            self.release_endpoint(object);
        }
        true
    }

    fn edges_from(&self, key: &NodeKey) -> Vec<Edge> {
        let Some(ids) = self.outgoing.get(key) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| self.links.get(*id))
            .filter_map(|link| {
                let endpoint = self.endpoints.get(&link.target.object)?;
                Some(Edge {
                    target: link.target.clone(),
                    handle: Rc::clone(&endpoint.handle),
                    transform: link.transform.clone(),
                })
            })
            .collect()
    }

    pub(super) fn handle(&self, object: ObjectId) -> Option<Rc<dyn Bindable>> {
        self.endpoints.get(&object).map(|e| Rc::clone(&e.handle))
    }

    pub(super) fn stats(&self) -> GraphStats {
        GraphStats {
            links: self.links.len(),
            polled_links: self.links.values().filter(|l| l.snapshot.is_some()).count(),
            objects: self.endpoints.len(),
        }
    }
}

// ─── Public API ──────────────────────────────────────────────────────────────

fn erase<B: Bindable + Clone + 'static>(object: &B) -> Rc<dyn Bindable> {
    Rc::new(object.clone())
}

/// Link `source.source_attr → target.target_attr` and synchronize once.
///
/// The link is polled when `source_attr` is not instrumented.
pub fn bind_to<S, T>(
    source: &S,
    source_attr: &str,
    target: &T,
    target_attr: &str,
    forward: Option<Transform>,
) -> LinkId
where
    S: Bindable + Clone + 'static,
    T: Bindable + Clone + 'static,
{
    let source = erase(source);
    let target = erase(target);
    let id = link(&source, source_attr, &target, target_attr, forward);
    propagate(source.object_id(), source_attr);
    snapshot_sources(&source, source_attr);
    id
}

/// Link `source.source_attr → target.target_attr`, seen from the target.
pub fn bind_from<T, S>(
    target: &T,
    target_attr: &str,
    source: &S,
    source_attr: &str,
    backward: Option<Transform>,
) -> LinkId
where
    T: Bindable + Clone + 'static,
    S: Bindable + Clone + 'static,
{
    bind_to(source, source_attr, target, target_attr, backward)
}

/// Two-way link between `a.a_attr` and `b.b_attr`.
///
/// Only the backward direction synchronizes at creation: `a` takes
/// `backward(b)` and `b` keeps its existing value.
pub fn bind<A, B>(
    a: &A,
    a_attr: &str,
    b: &B,
    b_attr: &str,
    forward: Option<Transform>,
    backward: Option<Transform>,
) -> TwoWayLink
where
    A: Bindable + Clone + 'static,
    B: Bindable + Clone + 'static,
{
    let a = erase(a);
    let b = erase(b);
    let forward_id = link(&a, a_attr, &b, b_attr, forward);
    let backward_id = link(&b, b_attr, &a, a_attr, backward);
    propagate(b.object_id(), b_attr);
    snapshot_sources(&a, a_attr);
    snapshot_sources(&b, b_attr);
    TwoWayLink {
        forward: forward_id,
        backward: backward_id,
    }
}

fn link(
    source: &Rc<dyn Bindable>,
    source_attr: &str,
    target: &Rc<dyn Bindable>,
    target_attr: &str,
    transform: Option<Transform>,
) -> LinkId {
    let polled = !source.is_instrumented(source_attr);
    let id = with_graph(|g| g.insert(source, source_attr, target, target_attr, transform, polled));
    tracing::trace!(
        source = %NodeKey::new(source.object_id(), source_attr),
        target = %NodeKey::new(target.object_id(), target_attr),
        polled,
        "binding.link"
    );
    id
}

/// Record the current value of `source.attr` on every polled link leaving it.
pub(super) fn snapshot_sources(source: &Rc<dyn Bindable>, attr: &str) {
    let key = NodeKey::new(source.object_id(), attr);
    let polled = with_graph(|g| {
        g.outgoing
            .get(&key)
            .is_some_and(|ids| ids.iter().any(|id| g.links.get(*id).is_some_and(|l| l.snapshot.is_some())))
    });
    if !polled {
        return;
    }
    let current = source.read(attr);
    with_graph(|g| {
        if let Some(ids) = g.outgoing.get(&key).cloned() {
            for id in ids {
                if let Some(link) = g.links.get_mut(id)
                    && link.snapshot.is_some()
                {
                    link.snapshot = Some(current.clone());
                }
            }
        }
    });
}

/// Remove one link. Returns `false` if it was already gone.
pub fn unbind(link: LinkId) -> bool {
    with_graph(|g| g.remove_link(link))
}

/// Remove both directions of a two-way link.
pub fn unbind_two_way(link: TwoWayLink) {
    with_graph(|g| {
        g.remove_link(link.forward);
        g.remove_link(link.backward);
    });
}

/// Remove every link where one of `objects` is source or target.
///
/// Returns the number of links removed.
pub fn remove(objects: impl IntoIterator<Item = ObjectId>) -> usize {
    let removed = with_graph(|g| {
        let mut removed = 0;
        for object in objects {
            let ids = g.by_object.remove(&object).unwrap_or_default();
            for id in ids {
                if g.remove_link(id) {
                    removed += 1;
                }
            }
            g.endpoints.remove(&object);
        }
        removed
    });
    if removed > 0 {
        tracing::debug!(removed, "binding.remove");
    }
    removed
}

/// Drop every link and endpoint of the current thread.
pub fn reset() {
    with_graph(|g| *g = Graph::default());
}

#[must_use]
pub fn stats() -> GraphStats {
    with_graph(|g| g.stats())
}

/// Whether any link touches `object`.
#[must_use]
pub fn is_bound(object: ObjectId) -> bool {
    with_graph(|g| g.by_object.contains_key(&object))
}

/// Links touching `object`, in creation order per role.
#[must_use]
pub fn links_of(object: ObjectId) -> Vec<LinkId> {
    with_graph(|g| g.by_object.get(&object).cloned().unwrap_or_default())
}

// ─── Propagation ─────────────────────────────────────────────────────────────

/// Push the current value of `object.attr` through the graph.
///
/// Depth-first; each `(object, attr)` vertex is written at most once and the
/// origin is never written back.
pub fn propagate(object: ObjectId, attr: &str) {
    let origin = NodeKey::new(object, attr);
    let has_links = with_graph(|g| g.outgoing.contains_key(&origin));
    if !has_links {
        return;
    }
    let mut visited = AHashSet::new();
    propagate_from(origin, &mut visited);
}

fn propagate_from(key: NodeKey, visited: &mut AHashSet<NodeKey>) {
    visited.insert(key.clone());
    let (source, edges) = with_graph(|g| (g.handle(key.object), g.edges_from(&key)));
    let Some(source) = source else {
        return;
    };
    if edges.is_empty() {
        return;
    }
    let Some(value) = source.read(&key.attr) else {
        return;
    };
    for edge in edges {
        if visited.contains(&edge.target) || !edge.handle.is_alive() {
            continue;
        }
        let next = match &edge.transform {
            Some(transform) => match transform.apply(&value) {
                Ok(next) => next,
                Err(err) => {
                    fweb_core::exception::report("binding transform", &err);
                    continue;
                }
            },
            None => value.clone(),
        };
        if edge.handle.read(&edge.target.attr).as_ref() == Some(&next) {
            continue;
        }
        if let Err(err) = edge.handle.write(&edge.target.attr, next) {
            fweb_core::exception::report("binding write", &err);
            continue;
        }
        tracing::trace!(source = %key, target = %edge.target, "binding.propagate");
        propagate_from(edge.target, visited);
    }
}
