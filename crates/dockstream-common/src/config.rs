//! Global configuration model for dockstream.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::ConfigError;

/// Root configuration for the dockstream server.
///
/// Fields missing from a configuration file fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DockstreamConfig {
    /// Socket address the HTTP server listens on.
    pub listen_addr: String,
    /// Base URL of the Docker Engine API.
    pub docker_host: String,
    /// Interval between poll cycles, in milliseconds.
    pub poll_interval_ms: u64,
    /// Deadline of one fetch against the daemon, in milliseconds.
    pub fetch_timeout_ms: u64,
    /// Undelivered messages buffered per subscriber.
    pub channel_capacity: usize,
}

impl Default for DockstreamConfig {
    fn default() -> Self {
        Self {
            listen_addr: constants::DEFAULT_LISTEN_ADDR.to_string(),
            docker_host: constants::DEFAULT_DOCKER_HOST.to_string(),
            poll_interval_ms: constants::DEFAULT_POLL_INTERVAL_MS,
            fetch_timeout_ms: constants::DEFAULT_FETCH_TIMEOUT_MS,
            channel_capacity: constants::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl DockstreamConfig {
    /// Loads a configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms must be greater than zero"));
        }
        if self.fetch_timeout_ms == 0 {
            return Err(invalid("fetch_timeout_ms must be greater than zero"));
        }
        if self.channel_capacity == 0 {
            return Err(invalid("channel_capacity must be greater than zero"));
        }
        if self.docker_host.trim().is_empty() {
            return Err(invalid("docker_host must not be empty"));
        }
        Ok(())
    }

    /// Poll interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Fetch deadline as a [`Duration`].
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid {
        message: message.to_string(),
    }
}
