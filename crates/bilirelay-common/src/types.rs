//! Core type definitions for media streams and output containers.
//!
//! All enums are serialized in lowercase so they read naturally in config
//! files and JSON payloads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of an elementary stream fed to the remuxer.
///
/// Currently advisory only: it is carried alongside each remux input and
/// shows up in logs, but it does not change the muxer arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    /// An audio-only stream.
    Audio,
    /// A video-only stream.
    Video,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Container produced by the remux pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// FLAC container holding a single audio stream.
    Flac,
    /// Matroska container holding audio and video.
    Mkv,
}

impl OutputFormat {
    /// Every format the pipeline can produce.
    pub const ALL: [OutputFormat; 2] = [Self::Flac, Self::Mkv];

    /// Format whose file extension is `ext`, ignoring ASCII case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(ext))
    }

    /// File extension, without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Flac => "flac",
            Self::Mkv => "mkv",
        }
    }

    /// FFmpeg muxer name.
    ///
    /// Passed explicitly with `-f` because the remuxer writes to a temporary
    /// file whose extension does not identify the container.
    pub fn muxer(&self) -> &'static str {
        match self {
            Self::Flac => "flac",
            Self::Mkv => "matroska",
        }
    }

    /// MIME type used when serving the finished file.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Flac => "audio/flac",
            Self::Mkv => "video/x-matroska",
        }
    }

    /// Final file name for a logical name, e.g. `song` -> `song.flac`.
    pub fn file_name(&self, logical_name: &str) -> String {
        format!("{}.{}", logical_name, self.extension())
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flac" => Ok(Self::Flac),
            "mkv" | "matroska" => Ok(Self::Mkv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}
