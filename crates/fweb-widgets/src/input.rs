#![forbid(unsafe_code)]

use fweb_core::Result;
use fweb_dom::Element;
use serde_json::Value;

use crate::{Disableable, ValueContent, declare_enabled, declare_value, widget_handle};

widget_handle!(
    /// Single-line text input.
    Input
);

impl Input {
    pub const KIND: &'static str = "Input";

    /// Create an empty input with a floating `label`.
    pub fn new(label: impl Into<String>) -> Result<Self> {
        let element = Element::builder("q-input").kind(Self::KIND).create()?;
        element.set_prop("label", Value::String(label.into()))?;
        declare_value(element, Value::String(String::new()))?;
        declare_enabled(element)?;
        Ok(Self(element))
    }

    pub fn placeholder(self, text: impl Into<String>) -> Result<Self> {
        self.0.set_prop("placeholder", Value::String(text.into()))?;
        Ok(self)
    }

    /// Current text; non-string values are rendered as JSON.
    pub fn text_value(&self) -> Result<String> {
        Ok(match self.value()? {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }
}

impl ValueContent for Input {}
impl Disableable for Input {}
