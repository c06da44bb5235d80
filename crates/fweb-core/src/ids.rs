#![forbid(unsafe_code)]

//! Opaque identifiers shared by every FrankenWeb crate.
//!
//! Client, socket, and listener ids come from process-wide monotonically
//! increasing counters. Element ids are allocated by their owning client, so
//! two clients may hand out the same [`ElementId`]; the pair
//! `(ClientId, ElementId)` is what identifies an element globally.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! counter_id {
    ($(#[$meta:meta])* $name:ident, $counter:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        static $counter: AtomicU64 = AtomicU64::new(1);

        impl $name {
            /// Allocate the next process-unique id.
            #[must_use]
            pub fn next() -> Self {
                Self($counter.fetch_add(1, Ordering::Relaxed))
            }

            /// Raw numeric value.
            #[inline]
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }

            /// Rebuild an id from a raw value received over the wire.
            #[inline]
            #[must_use]
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

counter_id!(
    /// Identity of one rendering surface.
    ClientId,
    NEXT_CLIENT_ID,
    "client-"
);

counter_id!(
    /// Identity of one physical connection attached to a client.
    SocketId,
    NEXT_SOCKET_ID,
    "socket-"
);

counter_id!(
    /// Identity of an event listener registered on an element.
    ListenerId,
    NEXT_LISTENER_ID,
    "listener-"
);

/// Identity of an element within its client.
///
/// Allocated sequentially by the owning client and never reused while the
/// client is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(u64);

impl ElementId {
    /// Wrap a raw id.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The id the browser-side runtime uses for the DOM node (`c<id>`).
    #[must_use]
    pub fn html_id(self) -> String {
        format!("c{}", self.0)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlation id of a script round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a fresh random id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
