//! Path utilities for names that end up as files in the cache directory.
//!
//! Both caller-supplied logical names and the basenames derived from source
//! URLs are untrusted. They are checked here before any path is composed.

use crate::types::OutputFormat;
use std::path::{Path, PathBuf};

/// Longest accepted file name, in bytes.
pub const MAX_FILE_NAME_LEN: usize = 200;

/// Suffix used for files that are still being written.
pub const PART_SUFFIX: &str = "part";

/// Characters rejected in file names in addition to control characters.
const FORBIDDEN_CHARS: &[char] = &['/', '\\', '<', '>', ':', '"', '|', '?', '*'];

/// Reasons a name cannot be used as a cache file name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("name is empty")]
    Empty,

    #[error("name '{0}' is reserved")]
    Reserved(String),

    #[error("name may not start with '.'")]
    LeadingDot,

    #[error("name contains forbidden character {0:?}")]
    ForbiddenChar(char),

    #[error("name is {0} bytes long, limit is {MAX_FILE_NAME_LEN}")]
    TooLong(usize),
}

/// Check that `name` is a single, safe path component.
///
/// Non-ASCII text is allowed (video titles are frequently CJK), but path
/// separators, traversal components, hidden-file prefixes, control
/// characters and characters that are invalid on common filesystems are not.
///
/// # Examples
///
/// ```
/// use bilirelay_common::paths::validate_file_name;
///
/// assert!(validate_file_name("clip").is_ok());
/// assert!(validate_file_name("第1集 開幕").is_ok());
/// assert!(validate_file_name("..").is_err());
/// assert!(validate_file_name("a/b").is_err());
/// ```
pub fn validate_file_name(name: &str) -> Result<(), NameError> {
    if name.trim().is_empty() {
        return Err(NameError::Empty);
    }
    if name == "." || name == ".." {
        return Err(NameError::Reserved(name.to_string()));
    }
    if name.starts_with('.') {
        return Err(NameError::LeadingDot);
    }
    if name.len() > MAX_FILE_NAME_LEN {
        return Err(NameError::TooLong(name.len()));
    }
    if let Some(c) = name
        .chars()
        .find(|c| c.is_control() || FORBIDDEN_CHARS.contains(c))
    {
        return Err(NameError::ForbiddenChar(c));
    }
    Ok(())
}

/// Path of the temporary file a writer fills before renaming it to `path`.
///
/// ```
/// use std::path::Path;
/// use bilirelay_common::paths::part_path;
///
/// assert_eq!(part_path(Path::new("/cache/clip.mkv")), Path::new("/cache/clip.mkv.part"));
/// ```
pub fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(PART_SUFFIX);
    PathBuf::from(name)
}

/// Whether a path is an in-progress temporary file.
pub fn is_part_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == PART_SUFFIX)
        .unwrap_or(false)
}

/// Whether a path carries the extension of a pipeline output
/// (`.flac`, `.mkv`), ignoring case.
pub fn is_output_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(OutputFormat::from_extension)
        .is_some()
}
