#![forbid(unsafe_code)]

//! Basic widgets on top of the element tree.
//!
//! Every widget is a `Copy` handle around one [`Element`] and dereferences to
//! it, so the generic element API (classes, props, slots, `move_to`,
//! `delete`, ...) is available on widgets directly. Shared behavior lives in
//! capability traits:
//!
//! - [`TextContent`]: a bindable `text` attribute.
//! - [`ValueContent`]: a bindable `value` mirrored to the `model-value` prop
//!   and updated by the browser through `update:model-value` events.
//! - [`Disableable`]: a bindable `enabled` attribute mirrored to the
//!   `disable` prop; disabled widgets ignore inbound events.
//!
//! # Example
//!
//! ```ignore
//! let count = Observable::new(0);
//! client.build(|| {
//!     let label = Label::new("clicks: 0")?;
//!     label.bind_text_from(&count, "value", Some(Transform::typed(|n: i64| format!("clicks: {n}"))));
//!     Button::new("add")?.on_click(move |_| {
//!         count.update(|n| *n += 1);
//!         Ok(())
//!     })?;
//!     Ok::<_, Error>(())
//! })?;
//! ```

use std::rc::Rc;

use fweb_core::Result;
use fweb_dom::{Element, HandlerResult};
use fweb_runtime::reactive::{Bindable, LinkId, Transform, TwoWayLink};
use serde_json::Value;

mod button;
mod card;
mod checkbox;
mod input;
mod label;
mod layout;

pub use button::Button;
pub use card::Card;
pub use checkbox::Checkbox;
pub use input::Input;
pub use label::Label;
pub use layout::{Column, Row};

/// Attribute names of the capability traits.
pub const TEXT_ATTR: &str = "text";
pub const VALUE_ATTR: &str = "value";
pub const ENABLED_ATTR: &str = "enabled";
/// Prop carrying the value to the browser component.
pub const VALUE_PROP: &str = "model-value";
/// Event the browser component emits when the user edits the value.
pub const VALUE_EVENT: &str = "update:model-value";

/// A handle around one element.
pub trait Widget: Copy {
    fn element(&self) -> Element;
}

/// Declares a `Copy` widget handle that dereferences to its element.
macro_rules! widget_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(fweb_dom::Element);

        impl $crate::Widget for $name {
            #[inline]
            fn element(&self) -> fweb_dom::Element {
                self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = fweb_dom::Element;

            fn deref(&self) -> &fweb_dom::Element {
                &self.0
            }
        }

        impl From<$name> for fweb_dom::Element {
            fn from(widget: $name) -> Self {
                widget.0
            }
        }
    };
}
pub(crate) use widget_handle;

// ─── Text ────────────────────────────────────────────────────────────────────

/// Where a widget renders its `text` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextTarget {
    /// The element's own text node.
    Node,
    /// A prop such as `label`.
    Prop(&'static str),
}

pub(crate) fn declare_text(element: Element, text: String, target: TextTarget) -> Result<()> {
    let hook: fweb_dom::ChangeHook = Rc::new(move |element: Element, value: &Value| {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        match target {
            TextTarget::Node => element.set_text(text),
            TextTarget::Prop(prop) => element.set_prop(prop, Value::String(text)).map(drop),
        }
    });
    element.declare_bindable(TEXT_ATTR, Value::String(text), Some(hook))
}

/// Widgets showing a bindable text.
pub trait TextContent: Widget {
    fn text(&self) -> Result<String> {
        let value = self.element().bindable(TEXT_ATTR)?;
        Ok(match value {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        })
    }

    fn set_text(&self, text: impl Into<String>) -> Result<()> {
        self.element()
            .set_bindable(TEXT_ATTR, Value::String(text.into()))
            .map(drop)
    }

    fn bind_text_to<T>(&self, target: &T, target_attr: &str, forward: Option<Transform>) -> LinkId
    where
        T: Bindable + Clone + 'static,
    {
        self.element().bind_to(TEXT_ATTR, target, target_attr, forward)
    }

    fn bind_text_from<S>(&self, source: &S, source_attr: &str, backward: Option<Transform>) -> LinkId
    where
        S: Bindable + Clone + 'static,
    {
        self.element().bind_from(TEXT_ATTR, source, source_attr, backward)
    }

    fn bind_text<O>(
        &self,
        other: &O,
        other_attr: &str,
        forward: Option<Transform>,
        backward: Option<Transform>,
    ) -> TwoWayLink
    where
        O: Bindable + Clone + 'static,
    {
        self.element().bind(TEXT_ATTR, other, other_attr, forward, backward)
    }
}

// ─── Value ───────────────────────────────────────────────────────────────────

/// Payload of a value-change handler.
#[derive(Debug, Clone)]
pub struct ValueChange {
    pub sender: Element,
    pub value: Value,
}

pub(crate) fn declare_value(element: Element, initial: Value) -> Result<()> {
    let mirror: fweb_dom::ChangeHook =
        Rc::new(|element: Element, value: &Value| element.set_prop(VALUE_PROP, value.clone()).map(drop));
    element.declare_bindable(VALUE_ATTR, initial, Some(mirror))?;
    element.on(
        VALUE_EVENT,
        fweb_dom::Handler::sync(|event| {
            event.sender.set_bindable(VALUE_ATTR, event.args.clone())?;
            Ok(())
        }),
    )?;
    Ok(())
}

/// Widgets holding a user-editable value.
///
/// Browser edits arrive as `update:model-value` events and are written to
/// the `value` attribute, which then propagates like any other write.
pub trait ValueContent: Widget {
    fn value(&self) -> Result<Value> {
        Ok(self.element().bindable(VALUE_ATTR)?.unwrap_or(Value::Null))
    }

    fn set_value(&self, value: impl Into<Value>) -> Result<()> {
        self.element().set_bindable(VALUE_ATTR, value.into()).map(drop)
    }

    /// Call `handler` after every change, whether it came from the browser,
    /// a binding, or [`set_value`](Self::set_value). Handler errors go to the
    /// exception hook.
    fn on_value_change(&self, handler: impl Fn(&ValueChange) -> HandlerResult + 'static) -> Result<()> {
        let hook: fweb_dom::ChangeHook = Rc::new(move |sender: Element, value: &Value| {
            let change = ValueChange {
                sender,
                value: value.clone(),
            };
            if let Err(err) = handler(&change) {
                let origin = format!("value change handler on element {}", sender.id());
                fweb_core::exception::report(&origin, err.as_ref());
            }
            Ok(())
        });
        self.element().observe_bindable(VALUE_ATTR, hook)
    }

    fn bind_value_to<T>(&self, target: &T, target_attr: &str, forward: Option<Transform>) -> LinkId
    where
        T: Bindable + Clone + 'static,
    {
        self.element().bind_to(VALUE_ATTR, target, target_attr, forward)
    }

    fn bind_value_from<S>(&self, source: &S, source_attr: &str, backward: Option<Transform>) -> LinkId
    where
        S: Bindable + Clone + 'static,
    {
        self.element().bind_from(VALUE_ATTR, source, source_attr, backward)
    }

    fn bind_value<O>(
        &self,
        other: &O,
        other_attr: &str,
        forward: Option<Transform>,
        backward: Option<Transform>,
    ) -> TwoWayLink
    where
        O: Bindable + Clone + 'static,
    {
        self.element().bind(VALUE_ATTR, other, other_attr, forward, backward)
    }
}

// ─── Enabled ─────────────────────────────────────────────────────────────────

pub(crate) fn declare_enabled(element: Element) -> Result<()> {
    let hook: fweb_dom::ChangeHook = Rc::new(|element: Element, value: &Value| {
        let enabled = value.as_bool().unwrap_or(true);
        element.set_prop("disable", Value::Bool(!enabled)).map(drop)
    });
    element.declare_bindable(ENABLED_ATTR, Value::Bool(true), Some(hook))?;
    element.ignore_events_when_disabled(true)
}

/// Widgets that can be disabled. Disabled widgets drop inbound events.
pub trait Disableable: Widget {
    fn enabled(&self) -> Result<bool> {
        Ok(self
            .element()
            .bindable(ENABLED_ATTR)?
            .and_then(|v| v.as_bool())
            .unwrap_or(true))
    }

    fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.element()
            .set_bindable(ENABLED_ATTR, Value::Bool(enabled))
            .map(drop)
    }

    fn enable(&self) -> Result<()> {
        self.set_enabled(true)
    }

    fn disable(&self) -> Result<()> {
        self.set_enabled(false)
    }

    fn bind_enabled_from<S>(&self, source: &S, source_attr: &str, backward: Option<Transform>) -> LinkId
    where
        S: Bindable + Clone + 'static,
    {
        self.element().bind_from(ENABLED_ATTR, source, source_attr, backward)
    }
}
