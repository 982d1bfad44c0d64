//! Download-and-remux pipeline.
//!
//! A request names one or two remote streams and a logical output name. The
//! pipeline resolves everything to paths under the cache, downloads what is
//! missing, and hands the local files to the remuxer in request order.

mod executor;
pub mod locks;

pub use executor::MediaPipeline;
pub use locks::{PathGuard, PathLocks};

use bilirelay_common::{OutputFormat, StreamKind};
use reqwest::Url;
use std::path::PathBuf;

/// One remote stream and where it lives in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    pub url: Url,
    pub local_path: PathBuf,
    pub kind: StreamKind,
}

/// Everything needed to produce one output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemuxJob {
    /// Inputs in the order they are passed to the remuxer.
    pub sources: Vec<MediaSource>,
    pub output: PathBuf,
    pub format: OutputFormat,
}

impl RemuxJob {
    /// Sources with duplicate local paths removed, first occurrence kept.
    pub fn unique_sources(&self) -> Vec<&MediaSource> {
        let mut seen = Vec::with_capacity(self.sources.len());
        self.sources
            .iter()
            .filter(|source| {
                if seen.contains(&&source.local_path) {
                    false
                } else {
                    seen.push(&source.local_path);
                    true
                }
            })
            .collect()
    }
}
