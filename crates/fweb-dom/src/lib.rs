#![forbid(unsafe_code)]

//! Server-side element tree and its synchronization with browser clients.
//!
//! - [`context`]: per-task slot stack that tells new elements where they go.
//! - [`element`]: element handles with classes, style, props, slots,
//!   listeners, bindable attributes, traversal, and deletion.
//! - [`client`]: one rendering surface owning a tree, an [`outbox`], sockets,
//!   script round trips, and lifecycle hooks.
//! - [`filter`]: [`ElementFilter`] queries.
//! - [`refreshable`], [`functions`], [`app`]: conveniences on top.

pub mod app;
pub mod attrs;
pub mod client;
pub mod context;
pub mod element;
pub mod filter;
pub mod functions;
pub mod listener;
pub mod outbox;
pub mod refreshable;
pub mod slot;
mod tree;

pub use app::{App, AppState};
pub use attrs::ClassUpdate;
pub use client::{Client, ClientKind, ScriptCall};
pub use context::SlotGuard;
pub use element::{Ancestors, ChangeHook, Descendants, Element, ElementBuilder};
pub use filter::ElementFilter;
pub use listener::{EventArgs, Handler, HandlerResult, ListenerOptions};
pub use outbox::{History, Outbox, Target};
pub use refreshable::Refreshable;
pub use slot::Slot;
