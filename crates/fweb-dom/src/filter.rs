#![forbid(unsafe_code)]

//! Querying elements by kind, marker, content, and ancestry.
//!
//! A filter is a plain description; nothing is evaluated until
//! [`ElementFilter::iter`] walks the tree, so a filter built once reflects
//! the tree's shape at every iteration.
//!
//! # Example
//!
//! ```ignore
//! let buttons: Vec<Element> = ElementFilter::new()
//!     .kind("Button")
//!     .marker("x")
//!     .within_marker("y")
//!     .iter()?
//!     .collect();
//! ```

use fweb_core::Result;
use indexmap::IndexMap;
use serde_json::Value;

use crate::context;
use crate::element::{Descendants, Element};

/// Props whose values count as an element's content.
pub const CONTENT_PROPS: &[&str] = &[
    "text",
    "label",
    "icon",
    "placeholder",
    "value",
    "model-value",
    "error-message",
    "message",
    "content",
    "source",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Whole tree of the current client.
    Client,
    /// Below the current container.
    Local,
    /// Below a given element.
    Under(Element),
}

/// Lazy query over a subtree.
#[derive(Debug, Clone)]
#[must_use]
pub struct ElementFilter {
    scope: Scope,
    kinds: Vec<&'static str>,
    markers: Vec<String>,
    content: Vec<String>,
    within_kinds: Vec<&'static str>,
    within_markers: Vec<String>,
    within_instances: Vec<Element>,
    not_within_kinds: Vec<&'static str>,
    not_within_markers: Vec<String>,
    not_within_instances: Vec<Element>,
    exclude_kinds: Vec<&'static str>,
    exclude_markers: Vec<String>,
    exclude_content: Vec<String>,
}

impl Default for ElementFilter {
    fn default() -> Self {
        Self::new()
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace().map(str::to_string)
}

impl ElementFilter {
    /// Match everything in the current client's tree.
    pub fn new() -> Self {
        Self {
            scope: Scope::Client,
            kinds: Vec::new(),
            markers: Vec::new(),
            content: Vec::new(),
            within_kinds: Vec::new(),
            within_markers: Vec::new(),
            within_instances: Vec::new(),
            not_within_kinds: Vec::new(),
            not_within_markers: Vec::new(),
            not_within_instances: Vec::new(),
            exclude_kinds: Vec::new(),
            exclude_markers: Vec::new(),
            exclude_content: Vec::new(),
        }
    }

    /// Search below the current container instead of the whole tree.
    pub fn local_scope(mut self) -> Self {
        self.scope = Scope::Local;
        self
    }

    /// Search below `element`.
    pub fn under(mut self, element: Element) -> Self {
        self.scope = Scope::Under(element);
        self
    }

    /// Keep elements of `kind`; several calls accept any of the kinds.
    pub fn kind(mut self, kind: &'static str) -> Self {
        self.kinds.push(kind);
        self
    }

    /// Require every whitespace-separated marker.
    pub fn marker(mut self, markers: &str) -> Self {
        self.markers.extend(words(markers));
        self
    }

    /// Require `text` as a substring of the element's content.
    pub fn content(mut self, text: impl Into<String>) -> Self {
        self.content.push(text.into());
        self
    }

    pub fn within_kind(mut self, kind: &'static str) -> Self {
        self.within_kinds.push(kind);
        self
    }

    pub fn within_marker(mut self, markers: &str) -> Self {
        self.within_markers.extend(words(markers));
        self
    }

    pub fn within(mut self, ancestor: Element) -> Self {
        self.within_instances.push(ancestor);
        self
    }

    pub fn not_within_kind(mut self, kind: &'static str) -> Self {
        self.not_within_kinds.push(kind);
        self
    }

    pub fn not_within_marker(mut self, markers: &str) -> Self {
        self.not_within_markers.extend(words(markers));
        self
    }

    pub fn not_within(mut self, ancestor: Element) -> Self {
        self.not_within_instances.push(ancestor);
        self
    }

    pub fn exclude_kind(mut self, kind: &'static str) -> Self {
        self.exclude_kinds.push(kind);
        self
    }

    pub fn exclude_marker(mut self, markers: &str) -> Self {
        self.exclude_markers.extend(words(markers));
        self
    }

    pub fn exclude_content(mut self, text: impl Into<String>) -> Self {
        self.exclude_content.push(text.into());
        self
    }

    /// Start a walk.
    ///
    /// # Errors
    ///
    /// [`Error::Context`](fweb_core::Error::Context) for the client and local
    /// scopes when no slot is active.
    pub fn iter(&self) -> Result<FilterIter> {
        let root = match self.scope {
            Scope::Client => context::current_client()?.root(),
            Scope::Local => context::current_element()?,
            Scope::Under(element) => element,
        };
        Ok(FilterIter {
            filter: self.clone(),
            walk: root.descendants(),
        })
    }

    fn matches(&self, element: Element) -> bool {
        let Ok((kind, markers, content)) = element.with_node(|node| {
            (
                node.kind,
                node.markers.clone(),
                content_of(node.text.as_deref(), &node.props),
            )
        }) else {
            return false;
        };
        if !self.kinds.is_empty() && !self.kinds.contains(&kind) {
            return false;
        }
        if self.exclude_kinds.contains(&kind) {
            return false;
        }
        if !self.markers.iter().all(|m| markers.contains(m)) {
            return false;
        }
        if self.exclude_markers.iter().any(|m| markers.contains(m)) {
            return false;
        }
        let mentions = |needle: &String| content.iter().any(|s| s.contains(needle.as_str()));
        if !self.content.iter().all(mentions) || self.exclude_content.iter().any(mentions) {
            return false;
        }
        if !self.has_ancestor_constraints() {
            return true;
        }
        let ancestors: Vec<Ancestor> = element
            .ancestors()
            .filter_map(|a| {
                a.with_node(|node| Ancestor {
                    element: a,
                    kind: node.kind,
                    markers: node.markers.clone(),
                })
                .ok()
            })
            .collect();
        self.ancestors_match(&ancestors)
    }

    fn has_ancestor_constraints(&self) -> bool {
        !(self.within_kinds.is_empty()
            && self.within_markers.is_empty()
            && self.within_instances.is_empty()
            && self.not_within_kinds.is_empty()
            && self.not_within_markers.is_empty()
            && self.not_within_instances.is_empty())
    }

    fn ancestors_match(&self, ancestors: &[Ancestor]) -> bool {
        let has_kind = |kind: &&'static str| ancestors.iter().any(|a| a.kind == *kind);
        let has_marker = |marker: &String| ancestors.iter().any(|a| a.markers.contains(marker));
        let has_instance = |element: &Element| ancestors.iter().any(|a| a.element == *element);
        self.within_kinds.iter().all(has_kind)
            && self.within_markers.iter().all(has_marker)
            && self.within_instances.iter().all(has_instance)
            && !self.not_within_kinds.iter().any(has_kind)
            && !self.not_within_markers.iter().any(has_marker)
            && !self.not_within_instances.iter().any(has_instance)
    }
}

struct Ancestor {
    element: Element,
    kind: &'static str,
    markers: Vec<String>,
}

fn content_of(text: Option<&str>, props: &IndexMap<String, Value>) -> Vec<String> {
    let mut content: Vec<String> = text.map(str::to_string).into_iter().collect();
    for key in CONTENT_PROPS {
        match props.get(*key) {
            Some(Value::String(s)) => content.push(s.clone()),
            Some(Value::Null) | None => {}
            Some(other) => content.push(other.to_string()),
        }
    }
    content
}

/// Iterator returned by [`ElementFilter::iter`].
#[derive(Debug)]
pub struct FilterIter {
    filter: ElementFilter,
    walk: Descendants,
}

impl Iterator for FilterIter {
    type Item = Element;

    fn next(&mut self) -> Option<Element> {
        let filter = &self.filter;
        self.walk.by_ref().find(|element| filter.matches(*element))
    }
}
