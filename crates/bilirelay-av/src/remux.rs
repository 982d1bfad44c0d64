//! Lossless stream-copy of one or more inputs into a single container.

use crate::{Error, Result, ToolCommand};
use bilirelay_common::paths::part_path;
use bilirelay_common::{OutputFormat, StreamKind};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One input of a remux job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemuxInput {
    /// Local path of the downloaded stream.
    pub path: PathBuf,
    /// What the stream carries. Informational only.
    pub kind: StreamKind,
}

impl RemuxInput {
    pub fn new(path: impl Into<PathBuf>, kind: StreamKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Build the ffmpeg argument list for a remux job.
///
/// Every input is mapped in the order given, all streams are copied without
/// re-encoding, and the container is selected explicitly with `-f`.
pub fn remux_args(inputs: &[RemuxInput], output: &Path, format: OutputFormat) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-y", "-loglevel", "error"]
        .iter()
        .map(OsString::from)
        .collect();

    for input in inputs {
        args.push("-i".into());
        args.push(input.path.clone().into_os_string());
    }
    for index in 0..inputs.len() {
        args.push("-map".into());
        args.push(index.to_string().into());
    }

    args.extend(["-c", "copy", "-f", format.muxer()].iter().map(OsString::from));
    args.push(output.as_os_str().to_owned());
    args
}

/// Combine `inputs` into `output` without re-encoding.
///
/// The muxer writes to a temporary sibling of `output` which is renamed into
/// place only after ffmpeg reports success, so `output` either holds a
/// complete file or is left untouched. An existing `output` is overwritten.
pub async fn combine(
    ffmpeg: &Path,
    inputs: &[RemuxInput],
    output: &Path,
    format: OutputFormat,
    timeout: Duration,
) -> Result<()> {
    if inputs.is_empty() {
        return Err(Error::InvalidInput(
            "remux requires at least one input".to_string(),
        ));
    }
    for input in inputs {
        if !tokio::fs::try_exists(&input.path).await? {
            return Err(Error::file_not_found(&input.path));
        }
    }

    let temp = part_path(output);

    tracing::info!(
        "Remuxing {} input(s) into {} ({})",
        inputs.len(),
        output.display(),
        format.muxer()
    );
    for input in inputs {
        tracing::debug!("  {} <- {}", input.kind, input.path.display());
    }

    let result = ToolCommand::new(ffmpeg.to_path_buf())
        .args(remux_args(inputs, &temp, format))
        .timeout(timeout)
        .execute()
        .await;

    if let Err(e) = result {
        if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove {}: {}", temp.display(), cleanup);
            }
        }
        return Err(e);
    }

    tokio::fs::rename(&temp, output).await?;

    tracing::info!("Remux complete: {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lossy(args: &[OsString]) -> Vec<String> {
        args.iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_remux_args_keep_input_order() {
        let inputs = [
            RemuxInput::new("/cache/a123.m4s", StreamKind::Audio),
            RemuxInput::new("/cache/v456.m4s", StreamKind::Video),
        ];
        let args = lossy(&remux_args(&inputs, Path::new("/cache/clip.mkv.part"), OutputFormat::Mkv));

        assert_eq!(
            args,
            vec![
                "-hide_banner",
                "-nostdin",
                "-y",
                "-loglevel",
                "error",
                "-i",
                "/cache/a123.m4s",
                "-i",
                "/cache/v456.m4s",
                "-map",
                "0",
                "-map",
                "1",
                "-c",
                "copy",
                "-f",
                "matroska",
                "/cache/clip.mkv.part",
            ]
        );
    }

    #[test]
    fn test_remux_args_single_audio() {
        let inputs = [RemuxInput::new("/cache/a.m4s", StreamKind::Audio)];
        let args = lossy(&remux_args(&inputs, Path::new("/cache/song.flac"), OutputFormat::Flac));
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 1);
        assert!(args.windows(2).any(|w| w[0] == "-f" && w[1] == "flac"));
        assert_eq!(args.last().map(String::as_str), Some("/cache/song.flac"));
    }

    #[test]
    fn test_stream_kind_does_not_change_args() {
        let as_audio = [RemuxInput::new("/cache/x.m4s", StreamKind::Audio)];
        let as_video = [RemuxInput::new("/cache/x.m4s", StreamKind::Video)];
        let out = Path::new("/cache/out.mkv");
        assert_eq!(
            remux_args(&as_audio, out, OutputFormat::Mkv),
            remux_args(&as_video, out, OutputFormat::Mkv)
        );
    }

    #[tokio::test]
    async fn test_combine_requires_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let result = combine(
            Path::new("ffmpeg"),
            &[],
            &dir.path().join("out.mkv"),
            OutputFormat::Mkv,
            Duration::from_secs(5),
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_combine_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.m4s");
        let result = combine(
            Path::new("ffmpeg"),
            &[RemuxInput::new(&missing, StreamKind::Audio)],
            &dir.path().join("out.flac"),
            OutputFormat::Flac,
            Duration::from_secs(5),
        )
        .await;
        assert!(matches!(result, Err(Error::FileNotFound { ref path }) if *path == missing));
    }

    #[cfg(unix)]
    fn fake_tool(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_combine_renames_into_place() {
        let dir = tempfile::tempdir().unwrap();
        // Writes the argument count to the last argument (the output path).
        let tool = fake_tool(dir.path(), r#"for last; do :; done; echo "$#" > "$last""#);
        let input = dir.path().join("a.m4s");
        std::fs::write(&input, b"audio").unwrap();
        let output = dir.path().join("song.flac");
        std::fs::write(&output, b"stale").unwrap();

        combine(
            &tool,
            &[RemuxInput::new(&input, StreamKind::Audio)],
            &output,
            OutputFormat::Flac,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(written.trim(), "14");
        assert!(!part_path(&output).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_combine_failure_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(
            dir.path(),
            r#"for last; do :; done; echo partial > "$last"; echo "Invalid data found" >&2; exit 1"#,
        );
        let input = dir.path().join("a.m4s");
        std::fs::write(&input, b"audio").unwrap();
        let output = dir.path().join("song.flac");

        let err = combine(
            &tool,
            &[RemuxInput::new(&input, StreamKind::Audio)],
            &output,
            OutputFormat::Flac,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        match err {
            Error::ToolFailed { message, .. } => assert!(message.contains("Invalid data found")),
            other => panic!("expected ToolFailed, got {other:?}"),
        }
        assert!(!output.exists());
        assert!(!part_path(&output).exists());
        assert!(input.exists());
    }
}
