#![forbid(unsafe_code)]

//! Endpoint abstraction for the binding graph.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use super::transform::BindingError;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a bindable object.
///
/// Two handles to the same underlying object report the same id; the graph
/// keys every endpoint by `(ObjectId, attribute)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj-{}", self.0)
    }
}

/// An object whose attributes can take part in bindings.
///
/// `write` applies the value together with the attribute's own change
/// effects (on-change hooks, subscriber notification) but must not start a
/// propagation pass; the engine drives propagation itself.
pub trait Bindable {
    fn object_id(&self) -> ObjectId;

    /// Current value of `attr`, or `None` if the attribute does not exist.
    fn read(&self, attr: &str) -> Option<Value>;

    fn write(&self, attr: &str, value: Value) -> Result<(), BindingError>;

    /// Whether writes to `attr` propagate on their own. Links from
    /// attributes that are not instrumented are polled by the refresh pass.
    fn is_instrumented(&self, attr: &str) -> bool;

    /// Dead endpoints are skipped during propagation.
    fn is_alive(&self) -> bool {
        true
    }
}

/// One `(object, attribute)` vertex of the binding graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub object: ObjectId,
    pub attr: Rc<str>,
}

impl NodeKey {
    #[must_use]
    pub fn new(object: ObjectId, attr: &str) -> Self {
        Self {
            object,
            attr: Rc::from(attr),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.object, self.attr)
    }
}
