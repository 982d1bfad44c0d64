//! Streaming downloads of remote media into the cache.

use crate::config::DownloadConfig;
use crate::fetch::{display_url, Fetcher, HeaderBundle};
use crate::{Error, Result};
use bilirelay_common::paths::part_path;
use futures::StreamExt;
use rand::Rng;
use reqwest::Url;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Fetches one remote resource into a local file.
#[async_trait::async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` to `dest`, returning the number of bytes written.
    ///
    /// Every failure (connection, HTTP status, local write, timeout) is
    /// reported as [`Error::DownloadFailed`].
    async fn fetch_to_file(&self, url: &Url, dest: &Path, headers: &HeaderBundle) -> Result<u64>;
}

/// [`Downloader`] backed by a streaming HTTP GET.
pub struct HttpDownloader {
    fetcher: Fetcher,
    chunk_size: usize,
    jitter: Duration,
    timeout: Duration,
}

impl HttpDownloader {
    pub fn new(fetcher: Fetcher, config: &DownloadConfig) -> Self {
        Self {
            fetcher,
            chunk_size: config.chunk_size.max(1),
            jitter: config.jitter(),
            timeout: config.timeout(),
        }
    }

    /// Random pause before hitting the CDN, in `[0, jitter]`.
    fn jitter_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return Duration::ZERO;
        }
        let max = self.jitter.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..=max))
    }

    async fn stream_to(&self, url: &Url, temp: &Path, headers: &HeaderBundle) -> Result<u64> {
        let shown = display_url(url);
        let response = self.fetcher.get_stream(url, headers).await?;
        let expected = response.content_length();

        let file = tokio::fs::File::create(temp)
            .await
            .map_err(|e| Error::download(&shown, format!("cannot create {}: {}", temp.display(), e)))?;
        let mut writer = BufWriter::with_capacity(self.chunk_size, file);

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::download(&shown, e.without_url().to_string()))?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| Error::download(&shown, format!("write failed: {}", e)))?;
            written += chunk.len() as u64;
        }

        writer
            .flush()
            .await
            .map_err(|e| Error::download(&shown, format!("write failed: {}", e)))?;
        writer
            .into_inner()
            .sync_all()
            .await
            .map_err(|e| Error::download(&shown, format!("sync failed: {}", e)))?;

        if let Some(expected) = expected {
            if expected != written {
                return Err(Error::download(
                    &shown,
                    format!("connection closed after {} of {} bytes", written, expected),
                ));
            }
        }

        Ok(written)
    }
}

#[async_trait::async_trait]
impl Downloader for HttpDownloader {
    async fn fetch_to_file(&self, url: &Url, dest: &Path, headers: &HeaderBundle) -> Result<u64> {
        let shown = display_url(url);

        let delay = self.jitter_delay();
        if !delay.is_zero() {
            tracing::debug!("Waiting {:?} before downloading {}", delay, shown);
            tokio::time::sleep(delay).await;
        }

        tracing::info!("Downloading {} -> {}", shown, dest.display());
        let temp = part_path(dest);

        let result = match tokio::time::timeout(self.timeout, self.stream_to(url, &temp, headers)).await {
            Ok(result) => result,
            Err(_) => Err(Error::download(
                &shown,
                format!("timed out after {:?}", self.timeout),
            )),
        };

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("Download failed: {} - File: {} - Headers: {:?}", e, dest.display(), headers);
                let _ = tokio::fs::remove_file(&temp).await;
                return Err(e);
            }
        };

        tokio::fs::rename(&temp, dest)
            .await
            .map_err(|e| Error::download(&shown, format!("cannot move into place: {}", e)))?;

        tracing::info!("Downloaded {} bytes to {}", bytes, dest.display());
        Ok(bytes)
    }
}
