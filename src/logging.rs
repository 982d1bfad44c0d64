//! Log output: stdout always, plus a daily-rotated file when enabled.

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_PREFIX: &str = "bilirelay";

/// Default directives when `RUST_LOG` is unset.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "bilirelay=trace,bilirelay_av=debug,tower_http=debug"
    } else {
        "bilirelay=info,bilirelay_av=info,tower_http=info"
    }
}

/// Appender writing `bilirelay.<date>.log` under the configured directory,
/// keeping at most `max_files` of them.
pub fn file_appender(config: &LoggingConfig) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(&config.directory)
        .with_context(|| format!("Failed to create log directory: {:?}", config.directory))?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_PREFIX)
        .filename_suffix("log")
        .max_log_files(config.max_files)
        .build(&config.directory)
        .with_context(|| format!("Failed to open log file in {:?}", config.directory))
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the defaults. The returned guard flushes the file
/// writer on drop and must live as long as the process logs.
pub fn init(verbose: bool, config: Option<&LoggingConfig>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let (file_layer, guard) = match config.filter(|c| c.file) {
        Some(config) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(config)?);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    if let Some(config) = config.filter(|c| c.file) {
        tracing::debug!("Writing logs to {}", config.directory.display());
    }

    Ok(guard)
}
