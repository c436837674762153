//! System-wide constants and defaults.

/// Default address the HTTP server binds to.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";

/// Default Docker Engine API endpoint: the daemon's local unix socket.
pub const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";

/// Default interval between two poll cycles of a stream session.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Default deadline for a single fetch against the Docker daemon.
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 1000;

/// Default number of undelivered messages buffered per subscriber.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Environment variable overriding the Docker Engine API endpoint.
pub const DOCKER_HOST_ENV: &str = "DOCKSTREAM_DOCKER_HOST";

/// Environment variable overriding the listen address.
pub const LISTEN_ADDR_ENV: &str = "DOCKSTREAM_LISTEN";

/// Environment variable pointing at a YAML configuration file.
pub const CONFIG_FILE_ENV: &str = "DOCKSTREAM_CONFIG";

/// Application name sent in the daemon user agent.
pub const APP_NAME: &str = "dockstream";

/// Binary name for the server.
pub const BIN_NAME: &str = "dockstream";

/// Separator used when joining a container's declared names into one alias.
pub const ALIAS_SEPARATOR: &str = ",";
