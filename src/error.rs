//! Unified error type for the relay and the download-and-remux pipeline.
//!
//! Every failure that can reach an HTTP client is one of these variants, and
//! each carries enough context for the route layer to derive a status code
//! via [`Error::http_status`] and to name the stage that failed.

use bilirelay_common::NameError;

/// Errors surfaced by the relay routes and the media pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller omitted a required input.
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    /// An input was present but unusable (bad URL, unsafe name).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A relayed upstream API call failed.
    #[error("Upstream request failed [{url}]: {message}")]
    Upstream {
        /// Endpoint that was called, without query string.
        url: String,
        /// Human-readable error description.
        message: String,
    },

    /// Fetching a media stream to the cache failed.
    #[error("Download failed [{url}]: {message}")]
    DownloadFailed {
        /// Source URL, without query string.
        url: String,
        /// Human-readable error description.
        message: String,
    },

    /// The media tool ran and reported failure, or timed out.
    #[error("Remux failed: {0}")]
    RemuxFailed(String),

    /// The media tool could not be located or started.
    #[error("Tool unavailable: {0}")]
    ToolUnavailable(String),

    /// A local I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::MissingParameter(_) => 400,
            Error::InvalidInput(_) => 400,
            Error::Upstream { .. } => 502,
            Error::DownloadFailed { .. } => 502,
            Error::RemuxFailed(_) => 500,
            Error::ToolUnavailable(_) => 503,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Error::MissingParameter(_) => "missing_parameter",
            Error::InvalidInput(_) => "invalid_input",
            Error::Upstream { .. } => "upstream_error",
            Error::DownloadFailed { .. } => "download_failed",
            Error::RemuxFailed(_) => "remux_failed",
            Error::ToolUnavailable(_) => "tool_unavailable",
            Error::Io { .. } => "io_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Pipeline stage the error belongs to.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::MissingParameter(_) | Error::InvalidInput(_) => "validate",
            Error::Upstream { .. } => "upstream",
            Error::DownloadFailed { .. } => "download",
            Error::RemuxFailed(_) | Error::ToolUnavailable(_) => "remux",
            Error::Io { .. } | Error::Internal(_) => "internal",
        }
    }

    /// Convenience constructor for [`Error::MissingParameter`].
    pub fn missing(name: impl Into<String>) -> Self {
        Error::MissingParameter(name.into())
    }

    /// Convenience constructor for [`Error::InvalidInput`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }

    /// Convenience constructor for [`Error::Upstream`].
    pub fn upstream(url: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Upstream {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::DownloadFailed`].
    pub fn download(url: impl Into<String>, message: impl Into<String>) -> Self {
        Error::DownloadFailed {
            url: url.into(),
            message: message.into(),
        }
    }
}

impl From<NameError> for Error {
    fn from(err: NameError) -> Self {
        Error::InvalidInput(err.to_string())
    }
}

impl From<bilirelay_av::Error> for Error {
    fn from(err: bilirelay_av::Error) -> Self {
        use bilirelay_av::Error as AvError;
        match err {
            AvError::ToolNotFound { tool } => Error::ToolUnavailable(tool),
            AvError::ToolFailed { .. } | AvError::Timeout { .. } => {
                Error::RemuxFailed(err.to_string())
            }
            AvError::FileNotFound { .. } | AvError::InvalidInput(_) => {
                Error::RemuxFailed(err.to_string())
            }
            AvError::Io(source) => Error::Io { source },
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
