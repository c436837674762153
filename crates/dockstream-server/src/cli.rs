//! Command-line arguments and configuration layering.
//!
//! Precedence, lowest first: built-in defaults, the YAML file given by
//! `--config` (or `DOCKSTREAM_CONFIG`), then individual flags and their
//! environment variables.

use std::path::PathBuf;

use clap::Parser;
use dockstream_common::config::DockstreamConfig;
use dockstream_common::constants;
use dockstream_common::error::ConfigError;

/// dockstream: live container state over server-sent events.
#[derive(Parser, Debug)]
#[command(name = constants::BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Path to a YAML configuration file.
    #[arg(long, env = constants::CONFIG_FILE_ENV)]
    pub config: Option<PathBuf>,

    /// Address to listen on (e.g. 0.0.0.0:3000).
    #[arg(long, env = constants::LISTEN_ADDR_ENV)]
    pub listen: Option<String>,

    /// Docker Engine API base URL.
    #[arg(long, env = constants::DOCKER_HOST_ENV)]
    pub docker_host: Option<String>,

    /// Interval between poll cycles, in milliseconds.
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Deadline of one daemon call, in milliseconds.
    #[arg(long)]
    pub fetch_timeout_ms: Option<u64>,

    /// Messages buffered per subscriber before the session waits.
    #[arg(long)]
    pub channel_capacity: Option<usize>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    /// Builds the effective configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded or the
    /// merged result is invalid.
    pub fn resolve_config(&self) -> Result<DockstreamConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => DockstreamConfig::from_file(path)?,
            None => DockstreamConfig::default(),
        };
        if let Some(listen) = &self.listen {
            config.listen_addr.clone_from(listen);
        }
        if let Some(host) = &self.docker_host {
            config.docker_host.clone_from(host);
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval_ms = ms;
        }
        if let Some(ms) = self.fetch_timeout_ms {
            config.fetch_timeout_ms = ms;
        }
        if let Some(capacity) = self.channel_capacity {
            config.channel_capacity = capacity;
        }
        config.validate()?;
        Ok(config)
    }
}
