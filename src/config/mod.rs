mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./bilirelay.toml",
        "~/.config/bilirelay/config.toml",
        "/etc/bilirelay/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.download.chunk_size == 0 {
        anyhow::bail!("Download chunk size cannot be 0");
    }

    if config.download.timeout_secs == 0 {
        anyhow::bail!("Download timeout cannot be 0");
    }

    if config.tools.remux_timeout_secs == 0 {
        anyhow::bail!("Remux timeout cannot be 0");
    }

    if config.logging.file && config.logging.max_files == 0 {
        anyhow::bail!("logging.max_files cannot be 0");
    }

    let endpoints = [
        ("generate_url", &config.upstream.generate_url),
        ("poll_url", &config.upstream.poll_url),
        ("view_url", &config.upstream.view_url),
        ("playurl_url", &config.upstream.playurl_url),
    ];
    for (name, url) in endpoints {
        reqwest::Url::parse(url)
            .with_context(|| format!("Invalid upstream.{}: {}", name, url))?;
    }

    if let Some(ref ffmpeg) = config.tools.ffmpeg_path {
        if !ffmpeg.exists() {
            tracing::warn!("Configured ffmpeg path does not exist: {:?}", ffmpeg);
        }
    }

    Ok(())
}
