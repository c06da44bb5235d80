#![forbid(unsafe_code)]

//! FrankenWeb public facade crate.
//!
//! Build a server-held UI tree in Rust and keep browser tabs in sync with it.
//! Import the [`prelude`] for the common types and use the [`ui`] namespace
//! for element constructors and context-bound functions:
//!
//! ```ignore
//! use fweb::prelude::*;
//!
//! let app = App::new(Config::default())?;
//! let (client, _) = app.page(|_| {
//!     ui::label("hello")?;
//!     ui::button("notify")?.on_click(|_| Ok(ui::notify("clicked")?))?;
//!     Ok(())
//! })?;
//! ```

pub use fweb_core as core;
pub use fweb_dom as dom;
pub use fweb_runtime as runtime;
pub use fweb_widgets as widgets;
#[cfg(feature = "ws")]
pub use fweb_ws as ws;

pub mod ui;

pub mod prelude {
    pub use fweb_core::{Config, Error, Result};
    pub use fweb_dom::{
        App, Client, ClientKind, Element, ElementFilter, EventArgs, Handler, ListenerOptions, Refreshable, Slot,
    };
    pub use fweb_runtime::reactive::{Accessor, Bindable, Observable, Transform, ValueMap};
    pub use fweb_runtime::CancelPolicy;
    pub use fweb_widgets::{Disableable, TextContent, ValueContent, Widget};

    pub use crate::ui;
}

/// Install the `tracing` subscriber configured by `FWEB_LOG`.
///
/// Returns `false` when a subscriber was already installed.
#[cfg(feature = "logging")]
pub fn init_logging() -> bool {
    fweb_core::logging::init()
}
