//! Unified error types for the dockstream workspace.
//!
//! Fetch-layer failures ([`FetchError`]) are produced by resource fetchers.
//! The streaming engine classifies them into [`StreamError`], which is the
//! taxonomy a stream session reasons about. Configuration problems are
//! reported as [`ConfigError`].

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure of a single call against the container daemon.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The call did not complete before its deadline.
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        /// Operation that timed out (e.g. `inspect of 3f2a`).
        operation: String,
        /// Deadline that was exceeded.
        after: Duration,
    },

    /// The daemon has no container with this identifier.
    #[error("no such container: {id}")]
    NotFound {
        /// Identifier that was looked up.
        id: String,
    },

    /// The daemon answered with a non-success status.
    #[error("daemon returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// The daemon could not be reached.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the connectivity failure.
        message: String,
    },

    /// The response could not be decoded.
    #[error("unexpected response shape: {message}")]
    Decode {
        /// Description of the decoding failure.
        message: String,
    },
}

impl FetchError {
    /// Returns whether this failure is a deadline expiry.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Failures a stream session can observe.
///
/// Everything except [`StreamError::DeliveryFault`] is recoverable and is
/// turned into an error message on the stream instead of ending it.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The requested name is absent from the current listing.
    #[error("{name} not found")]
    ResolutionNotFound {
        /// Name that could not be resolved.
        name: String,
    },

    /// A bounded fetch exceeded its deadline.
    #[error("{source}")]
    FetchTimeout {
        /// Underlying timeout.
        source: FetchError,
    },

    /// Any other fetch-layer failure.
    #[error("{source}")]
    FetchFailure {
        /// Underlying fetch error.
        source: FetchError,
    },

    /// The push channel failed for a reason other than subscriber disconnect.
    #[error("delivery fault: {message}")]
    DeliveryFault {
        /// Description of the channel failure.
        message: String,
    },
}

impl StreamError {
    /// Returns whether the session may keep running after this error.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::DeliveryFault { .. })
    }

    /// Returns a short stable label for log fields.
    #[must_use]
    pub const fn as_label(&self) -> &'static str {
        match self {
            Self::ResolutionNotFound { .. } => "resolution_not_found",
            Self::FetchTimeout { .. } => "fetch_timeout",
            Self::FetchFailure { .. } => "fetch_failure",
            Self::DeliveryFault { .. } => "delivery_fault",
        }
    }
}

impl From<FetchError> for StreamError {
    fn from(source: FetchError) -> Self {
        if source.is_timeout() {
            Self::FetchTimeout { source }
        } else {
            Self::FetchFailure { source }
        }
    }
}

/// Invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for the config model.
    #[error("invalid configuration file {path}: {source}")]
    Parse {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_yaml::Error,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {message}")]
    Invalid {
        /// Description of the invalid value.
        message: String,
    },
}

/// Convenience alias for fetch results.
pub type FetchResult<T> = std::result::Result<T, FetchError>;
