#![forbid(unsafe_code)]

use fweb_core::Result;
use fweb_dom::Element;

use crate::widget_handle;

widget_handle!(
    /// A raised container.
    Card
);

impl Card {
    pub const KIND: &'static str = "Card";

    pub fn new() -> Result<Self> {
        let element = Element::builder("q-card")
            .kind(Self::KIND)
            .create()?
            .classes("fweb-card")?;
        Ok(Self(element))
    }

    /// Drop the padding and gaps between children.
    pub fn tight(self) -> Result<Self> {
        self.0.classes("fweb-card-tight")?;
        Ok(self)
    }
}
