#![forbid(unsafe_code)]

//! Instrumented observable cells.
//!
//! # Design
//!
//! `Observable<T>` is a shared, version-tracked value behind
//! `Rc<RefCell<..>>`. Subscribers are held as `Weak` callbacks and pruned
//! lazily during notification. A user write through [`Observable::set`]
//! notifies subscribers first and then starts a propagation pass on the
//! binding graph; a write performed by the graph itself only notifies.
//!
//! The bindable attribute of an observable is [`VALUE_ATTR`].
//!
//! # Invariants
//!
//! 1. The version increments exactly once per write that changes the value.
//! 2. Subscribers are notified in registration order.
//! 3. Writing a value equal to the current one is a no-op.
//! 4. Dropping a [`Subscription`] removes its callback before the next
//!    notification.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::bindable::{Bindable, ObjectId};
use super::graph;
use super::transform::BindingError;

/// Attribute name under which an observable takes part in bindings.
pub const VALUE_ATTR: &str = "value";

type Callback<T> = dyn Fn(&T);

struct ObservableInner<T> {
    value: T,
    version: u64,
    subscribers: Vec<Weak<Callback<T>>>,
}

/// Shared observable value.
///
/// Cloning creates another handle to the same cell.
pub struct Observable<T> {
    id: ObjectId,
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("id", &self.id)
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

/// Keeps a subscriber callback alive; dropping it unsubscribes.
pub struct Subscription {
    _callback: Box<dyn Any>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Subscription")
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            id: ObjectId::next(),
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the value without cloning.
    ///
    /// # Panics
    ///
    /// Panics if `f` writes to the same observable.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    #[inline]
    #[must_use]
    pub fn object_id(&self) -> ObjectId {
        self.id
    }

    /// Write a new value, notify subscribers, then propagate to bound
    /// endpoints.
    pub fn set(&self, value: T) {
        if self.replace(value) {
            graph::propagate(self.id, VALUE_ATTR);
        }
    }

    /// Modify the value in place; behaves like [`set`](Self::set).
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut next = self.get();
        f(&mut next);
        self.set(next);
    }

    /// Register a callback invoked with the new value after each change.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let callback: Rc<Callback<T>> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&callback));
        Subscription {
            _callback: Box::new(callback),
        }
    }

    /// Live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Store `value` and notify subscribers without propagating.
    ///
    /// Returns whether the value changed.
    fn replace(&self, value: T) -> bool {
        let (callbacks, current) = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return false;
            }
            inner.value = value;
            inner.version += 1;
            inner.subscribers.retain(|w| w.strong_count() > 0);
            let callbacks: Vec<Rc<Callback<T>>> =
                inner.subscribers.iter().filter_map(Weak::upgrade).collect();
            (callbacks, inner.value.clone())
        };
        for callback in callbacks {
            callback(&current);
        }
        true
    }
}

impl<T> Bindable for Observable<T>
where
    T: Clone + PartialEq + Serialize + DeserializeOwned + 'static,
{
    fn object_id(&self) -> ObjectId {
        self.id
    }

    fn read(&self, attr: &str) -> Option<Value> {
        if attr != VALUE_ATTR {
            return None;
        }
        serde_json::to_value(&self.inner.borrow().value).ok()
    }

    fn write(&self, attr: &str, value: Value) -> Result<(), BindingError> {
        if attr != VALUE_ATTR {
            return Err(BindingError::UnknownAttribute {
                attr: attr.to_string(),
            });
        }
        let value = serde_json::from_value(value).map_err(|source| BindingError::Conversion {
            attr: attr.to_string(),
            source,
        })?;
        self.replace(value);
        Ok(())
    }

    fn is_instrumented(&self, attr: &str) -> bool {
        attr == VALUE_ATTR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn equal_write_is_a_no_op() {
        let obs = Observable::new(5);
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        let _sub = obs.subscribe(move |_| c.set(c.get() + 1));
        obs.set(5);
        assert_eq!(obs.version(), 0);
        assert_eq!(calls.get(), 0);
        obs.set(6);
        assert_eq!(obs.version(), 1);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn dropped_subscription_stops_notifications() {
        let obs = Observable::new(String::from("a"));
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        let sub = obs.subscribe(move |_| c.set(c.get() + 1));
        obs.set("b".into());
        drop(sub);
        obs.set("c".into());
        assert_eq!(calls.get(), 1);
        assert_eq!(obs.subscriber_count(), 0);
    }

    #[test]
    fn subscriber_may_read_the_cell() {
        let obs = Observable::new(1);
        let seen = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        let handle = obs.clone();
        let _sub = obs.subscribe(move |_| s.set(handle.get()));
        obs.update(|v| *v += 41);
        assert_eq!(seen.get(), 42);
    }

    #[test]
    fn engine_write_converts_through_serde() {
        let obs = Observable::new(0u8);
        assert!(obs.write(VALUE_ATTR, serde_json::json!(7)).is_ok());
        assert_eq!(obs.get(), 7);
        assert!(matches!(
            obs.write(VALUE_ATTR, serde_json::json!("x")),
            Err(BindingError::Conversion { .. })
        ));
        assert!(matches!(
            obs.write("other", serde_json::json!(1)),
            Err(BindingError::UnknownAttribute { .. })
        ));
    }
}
