//! Common utilities for the UVC USB runtime
//!
//! This crate provides the error type and logging setup shared by the
//! native bridge and anything embedding it.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
pub use logging::{LOG_TAG, setup_logging};
