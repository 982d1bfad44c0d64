//! Flat on-disk cache of downloaded streams and finished files.
//!
//! The cache has no index: a file's presence under its derived name is the
//! only state. Writers go through `*.part` temporaries and rename, so a
//! present file is always complete.

use crate::{Error, Result};
use bilirelay_common::paths::{is_output_file, is_part_file, validate_file_name};
use bilirelay_common::OutputFormat;
use reqwest::Url;
use std::path::{Path, PathBuf};

/// Cache directory and the naming rules for files inside it.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Open the cache at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        tracing::info!("Cache directory: {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `path` is present in the cache.
    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    /// Local path for a source URL: the last segment of its path, placed
    /// directly under the cache root.
    ///
    /// Two URLs with the same final segment map to the same file; that file
    /// is then shared between them. Basenames that look like a temporary or a
    /// finished output (`.part`, `.flac`, `.mkv`) are rejected, so a source
    /// never occupies a path that another request treats as its output.
    pub fn source_path(&self, url: &Url) -> Result<PathBuf> {
        let name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::invalid(format!("URL has no file name: {}", url.path())))?;

        let name = urlencoding::decode(name)
            .map_err(|_| Error::invalid("URL file name is not valid UTF-8"))?;
        validate_file_name(&name)?;
        let path = self.root.join(&*name);
        if is_part_file(&path) || is_output_file(&path) {
            return Err(Error::invalid(format!("reserved file name: {}", name)));
        }
        Ok(path)
    }

    /// Final output path: `{name}.{ext}` under the cache root.
    pub fn output_path(&self, logical_name: &str, format: OutputFormat) -> Result<PathBuf> {
        validate_file_name(logical_name)?;
        let file_name = format.file_name(logical_name);
        validate_file_name(&file_name)?;
        Ok(self.root.join(file_name))
    }
}
