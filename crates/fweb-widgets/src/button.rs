#![forbid(unsafe_code)]

use fweb_core::{ListenerId, Result};
use fweb_dom::{Element, EventArgs, Handler, HandlerResult, ListenerOptions};
use serde_json::Value;

use crate::{Disableable, TextContent, TextTarget, declare_enabled, declare_text, widget_handle};

widget_handle!(
    /// A clickable button. The text is rendered through the `label` prop.
    Button
);

impl Button {
    pub const KIND: &'static str = "Button";

    /// Create a primary-colored button in the current slot.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let element = Element::builder("q-btn")
            .kind(Self::KIND)
            .create()?;
        element.set_prop("color", Value::from("primary"))?;
        declare_text(element, text.into(), TextTarget::Prop("label"))?;
        declare_enabled(element)?;
        Ok(Self(element))
    }

    /// Register a click handler. Clicks carry no arguments.
    pub fn on_click(self, handler: impl Fn(&EventArgs) -> HandlerResult + 'static) -> Result<ListenerId> {
        self.0.on_with(
            "click",
            Handler::sync(handler),
            ListenerOptions::default().args(Vec::<String>::new()),
        )
    }

    /// Register an asynchronous click handler.
    pub fn on_click_async<F, Fut>(self, handler: F) -> Result<ListenerId>
    where
        F: Fn(EventArgs) -> Fut + 'static,
        Fut: Future<Output = HandlerResult> + 'static,
    {
        self.0.on_with(
            "click",
            Handler::asynchronous(handler),
            ListenerOptions::default().args(Vec::<String>::new()),
        )
    }
}

impl TextContent for Button {}
impl Disableable for Button {}
