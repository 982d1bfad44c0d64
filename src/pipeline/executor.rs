use super::{MediaSource, PathLocks, RemuxJob};
use crate::cache::CacheStore;
use crate::config::Config;
use crate::download::{Downloader, HttpDownloader};
use crate::fetch::{parse_source_url, Fetcher, HeaderBundle};
use crate::remux::{FfmpegRemuxer, Remuxer};
use crate::{Error, Result};
use bilirelay_av::RemuxInput;
use bilirelay_common::{OutputFormat, StreamKind};
use std::path::PathBuf;
use std::sync::Arc;

/// Orchestrates cache lookup, downloads and the remux for one output file.
#[derive(Clone)]
pub struct MediaPipeline {
    cache: CacheStore,
    downloader: Arc<dyn Downloader>,
    remuxer: Arc<dyn Remuxer>,
    locks: PathLocks,
}

impl MediaPipeline {
    pub fn new(cache: CacheStore, downloader: Arc<dyn Downloader>, remuxer: Arc<dyn Remuxer>) -> Self {
        Self {
            cache,
            downloader,
            remuxer,
            locks: PathLocks::new(),
        }
    }

    /// Build the production pipeline: HTTP downloads and ffmpeg remuxing
    /// into the configured cache directory.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = CacheStore::open(&config.cache.directory)?;
        let fetcher = Fetcher::new(config.upstream.request_timeout());
        let downloader = HttpDownloader::new(fetcher, &config.download);
        let remuxer = FfmpegRemuxer::new(&config.tools);
        Ok(Self::new(cache, Arc::new(downloader), Arc::new(remuxer)))
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Produce `{name}.flac` holding the audio stream at `audio_url`.
    pub async fn audio_only(&self, audio_url: &str, name: &str, headers: &HeaderBundle) -> Result<PathBuf> {
        require("aurl", audio_url)?;
        require("filename", name)?;

        let job = self.plan(&[("aurl", audio_url, StreamKind::Audio)], name, OutputFormat::Flac)?;
        self.run(job, headers).await
    }

    /// Produce `{name}.mkv` holding the audio stream followed by the video
    /// stream.
    pub async fn audio_video(
        &self,
        audio_url: &str,
        video_url: &str,
        name: &str,
        headers: &HeaderBundle,
    ) -> Result<PathBuf> {
        require("aurl", audio_url)?;
        require("vurl", video_url)?;
        require("filename", name)?;

        let job = self.plan(
            &[
                ("aurl", audio_url, StreamKind::Audio),
                ("vurl", video_url, StreamKind::Video),
            ],
            name,
            OutputFormat::Mkv,
        )?;
        self.run(job, headers).await
    }

    /// Resolve every URL and name to a cache path without touching the
    /// network.
    fn plan(&self, sources: &[(&str, &str, StreamKind)], name: &str, format: OutputFormat) -> Result<RemuxJob> {
        let sources = sources
            .iter()
            .map(|&(param, raw, kind)| -> Result<MediaSource> {
                let url = parse_source_url(raw).map_err(|e| match e {
                    Error::InvalidInput(message) => Error::invalid(format!("{}: {}", param, message)),
                    other => other,
                })?;
                let local_path = self.cache.source_path(&url)?;
                Ok(MediaSource { url, local_path, kind })
            })
            .collect::<Result<Vec<_>>>()?;

        // Source paths never carry an output extension, so output locks and
        // source locks never share a key.
        let output = self.cache.output_path(name, format)?;

        Ok(RemuxJob {
            sources,
            output,
            format,
        })
    }

    async fn run(&self, job: RemuxJob, headers: &HeaderBundle) -> Result<PathBuf> {
        if self.cache.exists(&job.output).await {
            tracing::info!("Cache hit: {}", job.output.display());
            return Ok(job.output);
        }

        let _guard = self.locks.acquire(&job.output).await;
        // Another request may have produced it while we waited.
        if self.cache.exists(&job.output).await {
            tracing::info!("Cache hit after wait: {}", job.output.display());
            return Ok(job.output);
        }

        self.fetch_sources(&job, headers).await?;

        let inputs: Vec<RemuxInput> = job
            .sources
            .iter()
            .map(|source| RemuxInput::new(&source.local_path, source.kind))
            .collect();

        tracing::info!(
            "Remuxing {} input(s) into {} ({})",
            inputs.len(),
            job.output.display(),
            job.format
        );
        self.remuxer.combine(&inputs, &job.output, job.format).await?;

        tracing::info!("Produced {}", job.output.display());
        Ok(job.output)
    }

    /// Download every source not yet cached, concurrently.
    ///
    /// All downloads run to completion before an error is reported, so a
    /// source that succeeded stays cached even when its sibling failed. The
    /// first failure in job order wins.
    async fn fetch_sources(&self, job: &RemuxJob, headers: &HeaderBundle) -> Result<()> {
        let downloads = job
            .unique_sources()
            .into_iter()
            .map(|source| self.ensure_source(source, headers));

        futures::future::join_all(downloads)
            .await
            .into_iter()
            .collect::<Result<Vec<()>>>()?;
        Ok(())
    }

    async fn ensure_source(&self, source: &MediaSource, headers: &HeaderBundle) -> Result<()> {
        if self.cache.exists(&source.local_path).await {
            tracing::debug!("Source already cached: {}", source.local_path.display());
            return Ok(());
        }

        // Other outputs may share this source.
        let _guard = self.locks.acquire(&source.local_path).await;
        if self.cache.exists(&source.local_path).await {
            tracing::debug!("Source cached while waiting: {}", source.local_path.display());
            return Ok(());
        }

        self.downloader
            .fetch_to_file(&source.url, &source.local_path, headers)
            .await
            .map(|bytes| {
                tracing::debug!("Fetched {} source ({} bytes)", source.kind, bytes);
            })
    }
}

fn require(param: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::missing(param));
    }
    Ok(())
}
