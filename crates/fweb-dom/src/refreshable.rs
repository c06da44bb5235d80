#![forbid(unsafe_code)]

//! Containers whose content is rebuilt on demand.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use fweb_core::Result;

use crate::element::Element;

/// Kind of the container created by [`Refreshable::render`].
pub const REFRESHABLE_KIND: &str = "Refreshable";

type Build = dyn Fn() -> Result<()>;

/// A build function plus every container it currently renders into.
#[derive(Clone)]
pub struct Refreshable {
    build: Rc<Build>,
    containers: Rc<RefCell<Vec<Element>>>,
}

impl fmt::Debug for Refreshable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Refreshable")
            .field("containers", &self.containers.borrow().len())
            .finish()
    }
}

impl Refreshable {
    pub fn new(build: impl Fn() -> Result<()> + 'static) -> Self {
        Self {
            build: Rc::new(build),
            containers: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Create a container in the current slot and build into it.
    pub fn render(&self) -> Result<Element> {
        let container = Element::builder("div").kind(REFRESHABLE_KIND).create()?;
        container.build(|| (self.build)())?;
        self.containers.borrow_mut().push(container);
        Ok(container)
    }

    /// Clear and rebuild every live container. Returns how many were
    /// rebuilt; deleted containers are forgotten.
    pub fn refresh(&self) -> Result<usize> {
        self.prune();
        let containers = self.containers.borrow().clone();
        for container in &containers {
            container.clear()?;
            container.build(|| (self.build)())?;
        }
        Ok(containers.len())
    }

    /// Number of live containers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prune();
        self.containers.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prune(&self) {
        self.containers.borrow_mut().retain(|c| !c.is_deleted());
    }
}
