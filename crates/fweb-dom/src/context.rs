#![forbid(unsafe_code)]

//! Per-task slot stack.
//!
//! # Design
//!
//! The stack lives in a `tokio::task_local!`, so every logical flow that is
//! run through [`isolate`] (or spawned through a client's task set) sees its
//! own stack, even when flows interleave at suspension points. Synchronous
//! code enters a stack with [`scope`]. Pushing returns a [`SlotGuard`] that
//! truncates the stack back to its previous depth when dropped.
//!
//! # Invariants
//!
//! 1. A flow never observes a slot pushed by another flow.
//! 2. Dropping a guard never pops below the depth the guard was created at.
//! 3. Guards are `!Send`; they cannot leave the thread that created them.
//!
//! # Failure Modes
//!
//! - **No scope**: reading the current slot outside any scope, or with an
//!   empty stack, fails with [`Error::Context`](fweb_core::Error::Context).
//!
//! # Example
//!
//! ```ignore
//! let client = Client::new(ClientKind::Page, Config::default());
//! context::scope(vec![client.content()], || {
//!     let card = Element::new("div")?;
//!     card.build(|| Element::new("span"))?;
//!     Ok::<_, Error>(())
//! })?;
//! ```

use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::rc::Rc;

use fweb_core::{Error, Result};

use crate::client::Client;
use crate::element::Element;
use crate::slot::Slot;

tokio::task_local! {
    static SLOT_STACK: RefCell<Vec<Slot>>;
}

/// Run `f` with a fresh stack seeded with `stack`.
pub fn scope<R>(stack: Vec<Slot>, f: impl FnOnce() -> R) -> R {
    SLOT_STACK.sync_scope(RefCell::new(stack), f)
}

/// Run `future` with its own stack seeded with `stack`.
///
/// Use this for every concurrently running flow that builds UI.
pub async fn isolate<F: Future>(stack: Vec<Slot>, future: F) -> F::Output {
    SLOT_STACK.scope(RefCell::new(stack), future).await
}

/// Copy of the current stack, empty outside any scope.
#[must_use]
pub fn snapshot() -> Vec<Slot> {
    SLOT_STACK.try_with(|stack| stack.borrow().clone()).unwrap_or_default()
}

/// Number of entered slots, `None` outside any scope.
#[must_use]
pub fn depth() -> Option<usize> {
    SLOT_STACK.try_with(|stack| stack.borrow().len()).ok()
}

/// Push `slot` onto the current stack.
///
/// # Errors
///
/// [`Error::Context`] when called outside any scope.
pub fn push(slot: Slot) -> Result<SlotGuard> {
    SLOT_STACK
        .try_with(|stack| {
            let mut stack = stack.borrow_mut();
            let depth = stack.len();
            stack.push(slot);
            SlotGuard {
                depth,
                _not_send: PhantomData,
            }
        })
        .map_err(|_| {
            Error::context("cannot enter a slot outside a building scope; use `context::scope` or `Client::build`")
        })
}

/// Run `f` with `slot` entered, opening a scope if none is active.
pub fn with_slot<R>(slot: Slot, f: impl FnOnce() -> R) -> R {
    if depth().is_some()
        && let Ok(_guard) = push(slot.clone())
    {
        return f();
    }
    scope(vec![slot], f)
}

/// Innermost entered slot.
pub fn current_slot() -> Result<Slot> {
    SLOT_STACK
        .try_with(|stack| stack.borrow().last().cloned())
        .ok()
        .flatten()
        .ok_or_else(Error::no_scope)
}

/// Owner of the innermost entered slot.
pub fn current_element() -> Result<Element> {
    current_slot().map(|slot| slot.element())
}

/// Client owning the innermost entered slot.
pub fn current_client() -> Result<Client> {
    current_slot()?.element().client()
}

/// Pops the stack back to its previous depth on drop.
#[must_use = "the slot is exited as soon as the guard is dropped"]
#[derive(Debug)]
pub struct SlotGuard {
    depth: usize,
    _not_send: PhantomData<Rc<()>>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let _ = SLOT_STACK.try_with(|stack| stack.borrow_mut().truncate(self.depth));
    }
}
