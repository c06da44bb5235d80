#![forbid(unsafe_code)]

//! Error taxonomy shared across the workspace.
//!
//! Construction-time failures (`Context`, `Validation`, `Lookup`) are
//! programming errors and surface synchronously to the caller. `Timeout` is
//! the only variant a caller is expected to retry. Stale inbound references
//! are never errors; they are dropped where they are detected.

use std::time::Duration;

use thiserror::Error;

use crate::ids::{ClientId, ElementId};

/// Boxed error produced by user code (handlers, hooks, transforms).
pub type BoxError = Box<dyn std::error::Error + 'static>;

pub type Result<T> = std::result::Result<T, Error>;

const NO_SCOPE_HINT: &str = "UI cannot be created outside an active building scope, \
    for example from a background task that was not spawned through its client. \
    Enter the target slot explicitly (`slot.enter()` or `client.build(..)`) before creating elements";

#[derive(Debug, Error)]
pub enum Error {
    #[error("{message}")]
    Context { message: String },

    #[error("invalid {what} `{value}`: {reason}")]
    Validation {
        what: &'static str,
        value: String,
        reason: String,
    },

    #[error("{message}")]
    Lookup { message: String },

    #[error("{what} did not respond within {after:?}")]
    Timeout { what: String, after: Duration },

    #[error("client {client} has been deleted")]
    ClientDeleted { client: ClientId },

    #[error("element {element} has been deleted")]
    ElementDeleted { element: ElementId },

    #[error("script failed: {message}")]
    Script { message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("{origin} failed: {source}")]
    Handler {
        origin: String,
        #[source]
        source: BoxError,
    },
}

impl Error {
    /// The slot stack is empty or the caller is outside any building scope.
    #[must_use]
    pub fn no_scope() -> Self {
        Self::Context {
            message: format!("cannot determine the current slot. {NO_SCOPE_HINT}"),
        }
    }

    #[must_use]
    pub fn context(message: impl Into<String>) -> Self {
        Self::Context {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid(what: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            what,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// A move targeted a slot that the container never declared.
    #[must_use]
    pub fn missing_slot(owner: ElementId, slot: &str) -> Self {
        Self::Lookup {
            message: format!(
                "slot `{slot}` does not exist on element {owner}; add it first with `add_slot(\"{slot}\")`"
            ),
        }
    }

    #[must_use]
    pub fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn timeout(what: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            after,
        }
    }

    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn handler(origin: impl Into<String>, source: BoxError) -> Self {
        Self::Handler {
            origin: origin.into(),
            source,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// True for failures caused by an owner that no longer exists.
    #[inline]
    #[must_use]
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::ClientDeleted { .. } | Self::ElementDeleted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_slot_message_tells_caller_to_add_it() {
        let err = Error::missing_slot(ElementId::new(4), "header");
        let text = err.to_string();
        assert!(text.contains("`header`"));
        assert!(text.contains("add_slot(\"header\")"));
    }

    #[test]
    fn no_scope_message_mentions_background_tasks() {
        let text = Error::no_scope().to_string();
        assert!(text.contains("background task"));
        assert!(text.contains("slot"));
    }

    #[test]
    fn timeout_classification() {
        let err = Error::timeout("script", Duration::from_millis(5));
        assert!(err.is_timeout());
        assert!(!err.is_gone());
        assert!(err.to_string().contains("did not respond within"));
    }
}
