//! Bilirelay-Common: Shared types and path utilities.
//!
//! This crate provides common functionality used across bilirelay:
//!
//! - **Core Types**: stream kinds and the output formats the remux pipeline produces
//! - **Path Utilities**: validation of untrusted file names before they touch the cache
//!
//! # Examples
//!
//! ```
//! use bilirelay_common::OutputFormat;
//! use bilirelay_common::paths::validate_file_name;
//!
//! assert_eq!(OutputFormat::Mkv.file_name("clip"), "clip.mkv");
//! assert!(validate_file_name("clip").is_ok());
//! assert!(validate_file_name("../etc/passwd").is_err());
//! ```

pub mod paths;
pub mod types;

pub use paths::NameError;
pub use types::*;
