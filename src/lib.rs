//! bilirelay - bilibili API relay and download-and-remux server
//!
//! This library crate exposes the core functionality for integration testing.

pub mod cache;
pub mod config;
pub mod download;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod pipeline;
pub mod remux;
pub mod server;
pub mod upstream;

pub use error::{Error, Result};
