//! # bilirelay-av
//!
//! External media tooling for the bilirelay download pipeline.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`check_tools`], [`require_tool`]) -- locate ffmpeg
//!   and report its version.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support for running external processes.
//! - **Remuxing** ([`combine`]) -- losslessly stream-copy one or more inputs
//!   into a single container.
//!
//! ## Example
//!
//! ```no_run
//! use bilirelay_av::{combine, require_tool, RemuxInput};
//! use bilirelay_common::{OutputFormat, StreamKind};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! # async fn example() -> bilirelay_av::Result<()> {
//! let ffmpeg = require_tool("ffmpeg")?;
//! let inputs = [
//!     RemuxInput::new("/cache/a123.m4s", StreamKind::Audio),
//!     RemuxInput::new("/cache/v456.m4s", StreamKind::Video),
//! ];
//! combine(&ffmpeg, &inputs, Path::new("/cache/clip.mkv"), OutputFormat::Mkv, Duration::from_secs(600)).await?;
//! # Ok(())
//! # }
//! ```

pub mod command;
mod error;
pub mod remux;
pub mod tools;

// Re-exports
pub use command::{ToolCommand, ToolOutput};
pub use error::{Error, Result};
pub use remux::{combine, RemuxInput};
pub use tools::{check_tool, check_tools, get_tool_path, require_tool, ToolInfo};
