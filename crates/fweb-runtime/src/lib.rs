#![forbid(unsafe_code)]

//! Runtime: the binding engine and owned background tasks.

pub mod reactive;
pub mod tasks;

pub use tasks::{CancelPolicy, ShutdownReport, TaskHandle, TaskSet};
