#![forbid(unsafe_code)]

//! Flex containers.

use fweb_core::Result;
use fweb_dom::Element;

use crate::widget_handle;

widget_handle!(
    /// Children laid out horizontally, wrapping by default.
    Row
);

widget_handle!(
    /// Children laid out vertically.
    Column
);

impl Row {
    pub const KIND: &'static str = "Row";

    pub fn new() -> Result<Self> {
        let element = Element::builder("div")
            .kind(Self::KIND)
            .create()?
            .classes("fweb-row wrap")?;
        Ok(Self(element))
    }

    /// Keep all children on one line.
    pub fn no_wrap(self) -> Result<Self> {
        self.0.update_classes(&fweb_dom::ClassUpdate::remove("wrap"))?;
        Ok(self)
    }
}

impl Column {
    pub const KIND: &'static str = "Column";

    pub fn new() -> Result<Self> {
        let element = Element::builder("div")
            .kind(Self::KIND)
            .create()?
            .classes("fweb-column")?;
        Ok(Self(element))
    }
}
