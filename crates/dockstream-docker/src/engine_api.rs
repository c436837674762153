//! Docker Engine API fetcher.
//!
//! Reaches the daemon either over its local unix socket
//! (`unix:///var/run/docker.sock`, the daemon default) or over plain HTTP
//! when it is exposed on TCP (`dockerd -H tcp://...`).

#[cfg(unix)]
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use dockstream_common::constants;
use dockstream_common::error::{ConfigError, FetchError, FetchResult};
use dockstream_common::types::{ContainerDetail, ContainerId, ContainerSummary};
use hyper::body::Bytes;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::fetcher::ResourceFetcher;

/// Host placeholder used to build request paths for socket transports.
#[cfg(unix)]
const SOCKET_BASE_URL: &str = "http://localhost/";

/// How requests reach the daemon.
#[derive(Debug, Clone)]
enum Transport {
    Tcp(reqwest::Client),
    #[cfg(unix)]
    Unix(PathBuf),
}

/// Failure below the HTTP status layer.
enum RequestFailure {
    TimedOut,
    Failed(String),
}

/// Fetcher backed by the Docker Engine HTTP API.
#[derive(Debug, Clone)]
pub struct EngineApiFetcher {
    transport: Transport,
    base_url: Url,
    request_timeout: Duration,
}

impl EngineApiFetcher {
    /// Creates a fetcher for the daemon at `docker_host`.
    ///
    /// Accepts `unix://<absolute socket path>` and `http(s)://` URLs.
    /// `request_timeout` bounds every call; expiry is reported as
    /// `FetchError::Timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if `docker_host` is neither a unix socket URL nor an
    /// absolute HTTP URL, or the HTTP client cannot be built.
    pub fn new(docker_host: &str, request_timeout: Duration) -> Result<Self, ConfigError> {
        if let Some(socket) = docker_host.strip_prefix("unix://") {
            return Self::unix(socket, request_timeout);
        }

        let base_url = Url::parse(docker_host).map_err(|e| ConfigError::Invalid {
            message: format!("invalid docker host {docker_host}: {e}"),
        })?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                message: format!("docker host must be a unix:// or http(s) URL: {docker_host}"),
            });
        }
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(user_agent())
            .build()
            .map_err(|e| ConfigError::Invalid {
                message: format!("cannot build HTTP client: {e}"),
            })?;
        Ok(Self {
            transport: Transport::Tcp(client),
            base_url,
            request_timeout,
        })
    }

    #[cfg(unix)]
    fn unix(socket: &str, request_timeout: Duration) -> Result<Self, ConfigError> {
        if !socket.starts_with('/') {
            return Err(ConfigError::Invalid {
                message: format!("docker socket path must be absolute: {socket}"),
            });
        }
        let base_url = Url::parse(SOCKET_BASE_URL).map_err(|e| ConfigError::Invalid {
            message: e.to_string(),
        })?;
        Ok(Self {
            transport: Transport::Unix(PathBuf::from(socket)),
            base_url,
            request_timeout,
        })
    }

    #[cfg(not(unix))]
    fn unix(socket: &str, _request_timeout: Duration) -> Result<Self, ConfigError> {
        Err(ConfigError::Invalid {
            message: format!("unix sockets are not supported on this platform: {socket}"),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            let _ = path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        operation: &str,
        missing: Option<&ContainerId>,
    ) -> FetchResult<T> {
        tracing::trace!(url = %url, "daemon request");
        let (status, body) = tokio::time::timeout(self.request_timeout, self.get(url))
            .await
            .map_err(|_| self.timeout_error(operation))?
            .map_err(|failure| match failure {
                RequestFailure::TimedOut => self.timeout_error(operation),
                RequestFailure::Failed(message) => FetchError::Transport { message },
            })?;

        if status == StatusCode::NOT_FOUND {
            if let Some(id) = missing {
                return Err(FetchError::NotFound {
                    id: id.to_string(),
                });
            }
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                message: daemon_message(&body, status),
            });
        }

        serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
            message: e.to_string(),
        })
    }

    async fn get(&self, url: Url) -> Result<(StatusCode, Bytes), RequestFailure> {
        match &self.transport {
            Transport::Tcp(client) => {
                let response = client.get(url).send().await.map_err(request_failure)?;
                let status = response.status();
                let body = response.bytes().await.map_err(request_failure)?;
                Ok((status, body))
            }
            #[cfg(unix)]
            Transport::Unix(socket) => unix_get(socket, &url).await,
        }
    }

    fn timeout_error(&self, operation: &str) -> FetchError {
        FetchError::Timeout {
            operation: operation.to_string(),
            after: self.request_timeout,
        }
    }
}

#[async_trait]
impl ResourceFetcher for EngineApiFetcher {
    async fn list_all(&self) -> FetchResult<Vec<ContainerSummary>> {
        let url = self.endpoint(&["containers", "json"]);
        self.get_json(url, "container listing", None).await
    }

    async fn inspect_by_id(&self, id: &ContainerId) -> FetchResult<ContainerDetail> {
        let url = self.endpoint(&["containers", id.as_str(), "json"]);
        let operation = format!("inspect of {id}");
        self.get_json(url, &operation, Some(id)).await
    }
}

/// Sends one GET over a fresh connection to the daemon socket.
#[cfg(unix)]
async fn unix_get(
    socket: &std::path::Path,
    url: &Url,
) -> Result<(StatusCode, Bytes), RequestFailure> {
    use http_body_util::{BodyExt, Empty};
    use hyper_util::rt::TokioIo;
    use tokio::net::UnixStream;

    let stream = UnixStream::connect(socket).await.map_err(|e| {
        RequestFailure::Failed(format!("cannot connect to {}: {e}", socket.display()))
    })?;
    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .map_err(|e| RequestFailure::Failed(e.to_string()))?;
    let _ = tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::debug!(error = %e, "daemon connection closed");
        }
    });

    let request = hyper::Request::get(url.path())
        .header(hyper::header::HOST, url.host_str().unwrap_or("localhost"))
        .header(hyper::header::USER_AGENT, user_agent())
        .body(Empty::<Bytes>::new())
        .map_err(|e| RequestFailure::Failed(e.to_string()))?;
    let response = sender
        .send_request(request)
        .await
        .map_err(|e| RequestFailure::Failed(e.to_string()))?;
    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|e| RequestFailure::Failed(e.to_string()))?
        .to_bytes();
    Ok((status, body))
}

fn request_failure(err: reqwest::Error) -> RequestFailure {
    if err.is_timeout() {
        RequestFailure::TimedOut
    } else {
        RequestFailure::Failed(err.to_string())
    }
}

fn user_agent() -> String {
    format!("{}/{}", constants::APP_NAME, env!("CARGO_PKG_VERSION"))
}

/// Extracts the `message` field the daemon puts in error bodies.
fn daemon_message(body: &[u8], status: StatusCode) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_string()
        })
}
