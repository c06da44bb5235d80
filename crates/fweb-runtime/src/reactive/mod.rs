#![forbid(unsafe_code)]

//! Property bindings between arbitrary objects.
//!
//! - [`Observable`]: instrumented cell; writes propagate before `set` returns.
//! - [`ValueMap`] / [`Accessor`]: plain endpoints whose outgoing links are
//!   polled by [`refresh_step`].
//! - [`bind_to`] / [`bind_from`] / [`bind`]: create one-way or two-way links
//!   with optional [`Transform`]s.
//! - [`remove`]: tear down every link of deleted objects.
//!
//! # Architecture
//!
//! Endpoints implement [`Bindable`] and are addressed by
//! `(ObjectId, attribute)`. Links live in a per-thread arena indexed by source
//! vertex and by object. A change starts a depth-first propagation pass that
//! records visited vertices, so cycles such as two-way links terminate after
//! touching every vertex at most once.
//!
//! # Invariants
//!
//! 1. A propagation pass writes each vertex at most once and never writes its
//!    origin.
//! 2. A write whose value equals the destination's current value is skipped,
//!    along with everything downstream of it.
//! 3. For two-way links the backward direction wins the initial
//!    synchronization.
//! 4. After [`remove`], no link references the removed objects.
//!
//! # Example
//!
//! ```
//! use fweb_runtime::reactive::{Observable, Transform, bind};
//!
//! let celsius = Observable::new(100.0_f64);
//! let fahrenheit = Observable::new(32.0_f64);
//! bind(
//!     &celsius, "value", &fahrenheit, "value",
//!     Some(Transform::typed(|c: f64| c * 9.0 / 5.0 + 32.0)),
//!     Some(Transform::typed(|f: f64| (f - 32.0) * 5.0 / 9.0)),
//! );
//! assert_eq!(celsius.get(), 0.0);
//! celsius.set(100.0);
//! assert_eq!(fahrenheit.get(), 212.0);
//! ```

mod bindable;
mod graph;
mod observable;
mod polled;
mod refresh;
mod transform;

pub use bindable::{Bindable, NodeKey, ObjectId};
pub use graph::{
    GraphStats, LinkId, TwoWayLink, bind, bind_from, bind_to, is_bound, links_of, propagate,
    remove, reset, stats, unbind, unbind_two_way,
};
pub use observable::{Observable, Subscription, VALUE_ATTR};
pub use polled::{Accessor, ValueMap};
pub use refresh::{RefreshConfig, RefreshReport, refresh_loop, refresh_step};
pub use transform::{BindingError, Transform};
