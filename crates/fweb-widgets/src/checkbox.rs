#![forbid(unsafe_code)]

use fweb_core::Result;
use fweb_dom::Element;
use serde_json::Value;

use crate::{
    Disableable, TextContent, TextTarget, ValueContent, declare_enabled, declare_text, declare_value,
    widget_handle,
};

widget_handle!(
    /// A labelled boolean toggle.
    Checkbox
);

impl Checkbox {
    pub const KIND: &'static str = "Checkbox";

    pub fn new(text: impl Into<String>, checked: bool) -> Result<Self> {
        let element = Element::builder("q-checkbox").kind(Self::KIND).create()?;
        declare_text(element, text.into(), TextTarget::Node)?;
        declare_value(element, Value::Bool(checked))?;
        declare_enabled(element)?;
        Ok(Self(element))
    }

    pub fn is_checked(&self) -> Result<bool> {
        Ok(self.value()?.as_bool().unwrap_or(false))
    }
}

impl TextContent for Checkbox {}
impl ValueContent for Checkbox {}
impl Disableable for Checkbox {}
