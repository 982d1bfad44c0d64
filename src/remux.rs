//! Remuxer seam between the pipeline and the ffmpeg subprocess.

use crate::config::ToolsConfig;
use crate::Result;
use bilirelay_av::RemuxInput;
use bilirelay_common::OutputFormat;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Losslessly combines local inputs into one container.
#[async_trait::async_trait]
pub trait Remuxer: Send + Sync {
    /// Stream-copy `inputs`, in order, into `output`, overwriting it.
    ///
    /// Returns [`crate::Error::RemuxFailed`] when the tool reports failure
    /// and [`crate::Error::ToolUnavailable`] when it cannot be started.
    async fn combine(&self, inputs: &[RemuxInput], output: &Path, format: OutputFormat) -> Result<()>;
}

/// [`Remuxer`] that shells out to ffmpeg.
pub struct FfmpegRemuxer {
    tool: String,
    configured_path: Option<PathBuf>,
    timeout: Duration,
}

impl FfmpegRemuxer {
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            tool: "ffmpeg".to_string(),
            configured_path: config.ffmpeg_path.clone(),
            timeout: config.remux_timeout(),
        }
    }

    /// Resolved lazily so the server can start, and keep relaying API
    /// calls, on hosts without ffmpeg.
    fn ffmpeg(&self) -> Result<PathBuf> {
        Ok(bilirelay_av::get_tool_path(
            &self.tool,
            self.configured_path.as_deref(),
        )?)
    }
}

#[async_trait::async_trait]
impl Remuxer for FfmpegRemuxer {
    async fn combine(&self, inputs: &[RemuxInput], output: &Path, format: OutputFormat) -> Result<()> {
        let ffmpeg = self.ffmpeg()?;
        bilirelay_av::combine(&ffmpeg, inputs, output, format, self.timeout)
            .await
            .map_err(|e| {
                tracing::error!("FFmpeg failed for {}: {}", output.display(), e);
                e.into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use bilirelay_common::StreamKind;

    #[tokio::test]
    async fn test_missing_tool_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.m4s");
        std::fs::write(&input, b"audio").unwrap();

        let remuxer = FfmpegRemuxer {
            tool: "nonexistent_ffmpeg_12345".to_string(),
            configured_path: Some(dir.path().join("no-such-ffmpeg")),
            timeout: Duration::from_secs(5),
        };
        let result = remuxer
            .combine(
                &[RemuxInput::new(&input, StreamKind::Audio)],
                &dir.path().join("song.flac"),
                OutputFormat::Flac,
            )
            .await;

        assert!(
            matches!(result, Err(Error::ToolUnavailable(ref tool)) if tool == "nonexistent_ffmpeg_12345")
        );
        assert!(!dir.path().join("song.flac").exists());
    }
}
