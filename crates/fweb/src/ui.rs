#![forbid(unsafe_code)]

//! Element constructors and functions acting on the current context.
//!
//! Everything here creates into, or resolves its client from, the slot that
//! is active for the calling flow.

use fweb_core::Result;
use fweb_dom::{Element, Refreshable};
use fweb_widgets::{Button, Card, Checkbox, Column, Input, Label, Row};

pub use fweb_dom::functions::{
    clipboard, download, navigate, notify, notify_with, on, page_title, run_javascript, update,
};

/// A plain element with `tag`.
pub fn element(tag: &str) -> Result<Element> {
    Element::new(tag)
}

pub fn label(text: impl Into<String>) -> Result<Label> {
    Label::new(text)
}

pub fn button(text: impl Into<String>) -> Result<Button> {
    Button::new(text)
}

pub fn card() -> Result<Card> {
    Card::new()
}

pub fn row() -> Result<Row> {
    Row::new()
}

pub fn column() -> Result<Column> {
    Column::new()
}

pub fn input(label: impl Into<String>) -> Result<Input> {
    Input::new(label)
}

pub fn checkbox(text: impl Into<String>, checked: bool) -> Result<Checkbox> {
    Checkbox::new(text, checked)
}

/// Wrap `build` so it can be re-run with [`Refreshable::refresh`].
pub fn refreshable(build: impl Fn() -> Result<()> + 'static) -> Refreshable {
    Refreshable::new(build)
}
