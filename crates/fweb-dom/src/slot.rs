#![forbid(unsafe_code)]

//! Named child containers of an element.

use std::fmt;
use std::rc::Rc;

use fweb_core::Result;

use crate::context::{self, SlotGuard};
use crate::element::Element;

/// Handle to one named slot of an element.
///
/// The slot's children live in the owning element's node; a `Slot` only
/// names them, so it stays cheap to clone and to keep on the context stack.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Slot {
    element: Element,
    name: Rc<str>,
}

impl Slot {
    pub(crate) fn new(element: Element, name: Rc<str>) -> Self {
        Self { element, name }
    }

    /// The element owning this slot.
    #[inline]
    #[must_use]
    pub fn element(&self) -> Element {
        self.element
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_rc(&self) -> &Rc<str> {
        &self.name
    }

    /// Current children, in order.
    pub fn children(&self) -> Result<Vec<Element>> {
        let id = self.element.id();
        self.element.with_tree(|tree| {
            tree.get(id)
                .and_then(|node| node.slots.get(&self.name))
                .map(|slot| slot.children.iter().filter_map(|child| tree.handle(*child)).collect())
                .unwrap_or_default()
        })
    }

    pub fn template(&self) -> Result<Option<String>> {
        self.element
            .with_node(|node| node.slots.get(&self.name).and_then(|slot| slot.template.clone()))
    }

    /// Push this slot onto the current flow's stack.
    pub fn enter(&self) -> Result<SlotGuard> {
        context::push(self.clone())
    }

    /// Run `f` with this slot entered.
    pub fn build<R>(&self, f: impl FnOnce() -> R) -> R {
        context::with_slot(self.clone(), f)
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({}#{}.{})", self.element.client_id(), self.element.id(), self.name)
    }
}
