use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub download: DownloadConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Directory holding downloaded streams and finished files.
    /// Created on startup if missing.
    #[serde(default = "default_cache_dir")]
    pub directory: PathBuf,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
        }
    }
}

/// Upstream bilibili endpoints and the headers sent with every request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// QR-code login: generate a new code.
    #[serde(default = "default_generate_url")]
    pub generate_url: String,

    /// QR-code login: poll scan status.
    #[serde(default = "default_poll_url")]
    pub poll_url: String,

    /// Video metadata.
    #[serde(default = "default_view_url")]
    pub view_url: String,

    /// Play URL resolution (DASH audio/video stream URLs).
    #[serde(default = "default_playurl_url")]
    pub playurl_url: String,

    /// Referer sent with every outbound request; the CDN rejects requests without it.
    #[serde(default = "default_referer")]
    pub referer: String,

    /// User-Agent used when the inbound request carries none.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for relayed API calls, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_generate_url() -> String {
    "https://passport.bilibili.com/x/passport-login/web/qrcode/generate".to_string()
}
fn default_poll_url() -> String {
    "https://passport.bilibili.com/x/passport-login/web/qrcode/poll".to_string()
}
fn default_view_url() -> String {
    "https://api.bilibili.com/x/web-interface/wbi/view".to_string()
}
fn default_playurl_url() -> String {
    "https://api.bilibili.com/x/player/wbi/playurl".to_string()
}
fn default_referer() -> String {
    "https://www.bilibili.com/".to_string()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string()
}
fn default_request_timeout() -> u64 {
    30
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            generate_url: default_generate_url(),
            poll_url: default_poll_url(),
            view_url: default_view_url(),
            playurl_url: default_playurl_url(),
            referer: default_referer(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl UpstreamConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadConfig {
    /// Write buffer size in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Upper bound of the random delay before each download, in
    /// milliseconds. 0 disables the delay.
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    /// Timeout for a single download, in seconds.
    #[serde(default = "default_download_timeout")]
    pub timeout_secs: u64,
}

fn default_chunk_size() -> usize {
    64 * 1024
}
fn default_jitter_ms() -> u64 {
    1000
}
fn default_download_timeout() -> u64 {
    600
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            jitter_ms: default_jitter_ms(),
            timeout_secs: default_download_timeout(),
        }
    }
}

impl DownloadConfig {
    pub fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Explicit ffmpeg binary. Looked up on PATH when unset.
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Timeout for a single remux, in seconds.
    #[serde(default = "default_remux_timeout")]
    pub remux_timeout_secs: u64,
}

fn default_remux_timeout() -> u64 {
    600
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            remux_timeout_secs: default_remux_timeout(),
        }
    }
}

impl ToolsConfig {
    pub fn remux_timeout(&self) -> Duration {
        Duration::from_secs(self.remux_timeout_secs)
    }
}

/// Rolling log files written alongside stdout.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Write a log file in addition to stdout.
    #[serde(default = "default_log_file")]
    pub file: bool,

    /// Directory holding `bilirelay.<date>.log`. Created if missing.
    #[serde(default = "default_log_dir")]
    pub directory: PathBuf,

    /// Rotated files kept before the oldest is deleted.
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

fn default_log_file() -> bool {
    true
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}
fn default_max_log_files() -> usize {
    5
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            directory: default_log_dir(),
            max_files: default_max_log_files(),
        }
    }
}
