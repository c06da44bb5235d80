#![forbid(unsafe_code)]

//! Core: identifiers, wire protocol, configuration, errors, and the
//! exception hook shared by every FrankenWeb crate.

pub mod config;
pub mod error;
pub mod exception;
pub mod ids;
#[cfg(feature = "logging")]
pub mod logging;
pub mod protocol;

pub use config::Config;
pub use error::{BoxError, Error, Result};
pub use ids::{ClientId, ElementId, ListenerId, RequestId, SocketId};
