#![forbid(unsafe_code)]

use fweb_core::Result;
use fweb_dom::Element;

use crate::{TextContent, TextTarget, declare_text, widget_handle};

widget_handle!(
    /// Plain text.
    Label
);

impl Label {
    pub const KIND: &'static str = "Label";

    /// Create a label in the current slot.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let element = Element::builder("div").kind(Self::KIND).create()?;
        declare_text(element, text.into(), TextTarget::Node)?;
        Ok(Self(element))
    }
}

impl TextContent for Label {}
