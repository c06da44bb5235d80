#![forbid(unsafe_code)]

//! Endpoints without change instrumentation.
//!
//! Writes to these objects do not propagate by themselves. Links leaving
//! them are polled by [`refresh_step`](super::refresh_step), which compares
//! the current value with the last snapshot.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use super::bindable::{Bindable, ObjectId};
use super::transform::BindingError;

/// A plain string-keyed dictionary.
#[derive(Clone)]
pub struct ValueMap {
    id: ObjectId,
    entries: Rc<RefCell<IndexMap<String, Value>>>,
}

impl ValueMap {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: ObjectId::next(),
            entries: Rc::new(RefCell::new(IndexMap::new())),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.borrow().get(key).cloned()
    }

    /// Insert without propagating; bound targets catch up on the next
    /// refresh pass.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.borrow_mut().insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.entries.borrow_mut().shift_remove(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    #[inline]
    #[must_use]
    pub fn object_id(&self) -> ObjectId {
        self.id
    }
}

impl Default for ValueMap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ValueMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueMap")
            .field("id", &self.id)
            .field("entries", &self.entries.borrow())
            .finish()
    }
}

impl Bindable for ValueMap {
    fn object_id(&self) -> ObjectId {
        self.id
    }

    fn read(&self, attr: &str) -> Option<Value> {
        self.get(attr)
    }

    fn write(&self, attr: &str, value: Value) -> Result<(), BindingError> {
        self.insert(attr, value);
        Ok(())
    }

    fn is_instrumented(&self, _attr: &str) -> bool {
        false
    }
}

type Getter = dyn Fn(&str) -> Option<Value>;
type Setter = dyn Fn(&str, Value) -> Result<(), BindingError>;

/// Adapter exposing a foreign object through a getter/setter pair.
#[derive(Clone)]
pub struct Accessor {
    id: ObjectId,
    getter: Rc<Getter>,
    setter: Rc<Setter>,
    alive: Option<Rc<dyn Fn() -> bool>>,
}

impl Accessor {
    pub fn new(
        getter: impl Fn(&str) -> Option<Value> + 'static,
        setter: impl Fn(&str, Value) -> Result<(), BindingError> + 'static,
    ) -> Self {
        Self {
            id: ObjectId::next(),
            getter: Rc::new(getter),
            setter: Rc::new(setter),
            alive: None,
        }
    }

    /// Report the wrapped object as dead once `alive` returns `false`.
    #[must_use]
    pub fn with_liveness(mut self, alive: impl Fn() -> bool + 'static) -> Self {
        self.alive = Some(Rc::new(alive));
        self
    }

    #[inline]
    #[must_use]
    pub fn object_id(&self) -> ObjectId {
        self.id
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor").field("id", &self.id).finish()
    }
}

impl Bindable for Accessor {
    fn object_id(&self) -> ObjectId {
        self.id
    }

    fn read(&self, attr: &str) -> Option<Value> {
        (self.getter)(attr)
    }

    fn write(&self, attr: &str, value: Value) -> Result<(), BindingError> {
        (self.setter)(attr, value)
    }

    fn is_instrumented(&self, _attr: &str) -> bool {
        false
    }

    fn is_alive(&self) -> bool {
        self.alive.as_ref().is_none_or(|alive| alive())
    }
}
