#![forbid(unsafe_code)]

//! Event listeners and handler invocation.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use fweb_core::protocol::ListenerState;
use fweb_core::{BoxError, ListenerId};
use serde_json::Value;

use crate::client::Client;
use crate::element::Element;

/// Outcome of a user event handler.
pub type HandlerResult = Result<(), BoxError>;

type SyncFn = dyn Fn(&EventArgs) -> HandlerResult;
type AsyncFn = dyn Fn(EventArgs) -> Pin<Box<dyn Future<Output = HandlerResult>>>;

/// Arguments passed to an event handler.
#[derive(Debug, Clone)]
pub struct EventArgs {
    pub client: Client,
    pub sender: Element,
    /// Normalized event type, e.g. `update:modelValue`.
    pub event_type: Rc<str>,
    pub args: Value,
}

/// A registered event callback.
///
/// Synchronous handlers run inline while the inbound message is dispatched.
/// Asynchronous handlers are spawned on the owning client's task set and are
/// cancelled with it.
#[derive(Clone)]
pub enum Handler {
    Sync(Rc<SyncFn>),
    Async(Rc<AsyncFn>),
}

impl Handler {
    pub fn sync(f: impl Fn(&EventArgs) -> HandlerResult + 'static) -> Self {
        Self::Sync(Rc::new(f))
    }

    pub fn asynchronous<F, Fut>(f: F) -> Self
    where
        F: Fn(EventArgs) -> Fut + 'static,
        Fut: Future<Output = HandlerResult> + 'static,
    {
        Self::Async(Rc::new(move |args| Box::pin(f(args))))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("Handler::Sync"),
            Self::Async(_) => f.write_str("Handler::Async"),
        }
    }
}

/// Browser-side options of a listener.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerOptions {
    /// Event fields forwarded to the server; `None` forwards everything.
    pub args: Option<Vec<String>>,
    /// Minimum seconds between two forwarded events.
    pub throttle: f64,
    pub leading: bool,
    pub trailing: bool,
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self {
            args: None,
            throttle: 0.0,
            leading: true,
            trailing: true,
        }
    }
}

impl ListenerOptions {
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn throttle(mut self, seconds: f64) -> Self {
        self.throttle = seconds;
        self
    }

    #[must_use]
    pub fn leading(mut self, leading: bool) -> Self {
        self.leading = leading;
        self
    }

    #[must_use]
    pub fn trailing(mut self, trailing: bool) -> Self {
        self.trailing = trailing;
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Listener {
    pub(crate) id: ListenerId,
    pub(crate) event_type: Rc<str>,
    pub(crate) options: ListenerOptions,
    pub(crate) handler: Handler,
}

impl Listener {
    pub(crate) fn state(&self) -> ListenerState {
        ListenerState {
            id: self.id,
            event_type: self.event_type.to_string(),
            args: self.options.args.clone(),
            throttle: self.options.throttle,
            leading: self.options.leading,
            trailing: self.options.trailing,
        }
    }
}

/// Normalize an event type to the browser's camelCase form.
///
/// Every `.`-separated segment is converted separately, so key modifiers
/// survive. A segment that starts or ends with `-` is left alone.
///
/// ```
/// use fweb_dom::listener::event_type_to_camel_case;
///
/// assert_eq!(event_type_to_camel_case("update:model-value"), "update:modelValue");
/// assert_eq!(event_type_to_camel_case("keydown.enter"), "keydown.enter");
/// assert_eq!(event_type_to_camel_case("row-click.stop"), "rowClick.stop");
/// ```
#[must_use]
pub fn event_type_to_camel_case(event_type: &str) -> String {
    event_type
        .split('.')
        .map(|part| {
            if part.starts_with('-') || part.ends_with('-') {
                return part.to_string();
            }
            let mut words = part.split('-');
            let mut out = words.next().unwrap_or_default().to_string();
            for word in words {
                let mut chars = word.chars();
                if let Some(first) = chars.next() {
                    out.extend(first.to_uppercase());
                    out.push_str(&chars.as_str().to_lowercase());
                }
            }
            out
        })
        .collect::<Vec<_>>()
        .join(".")
}
