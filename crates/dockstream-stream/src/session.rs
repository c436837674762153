//! Stream sessions: one subscriber, one target, one poll loop.
//!
//! A [`Session`] is created by the route layer for each inbound stream
//! request and consumed by [`Session::run`]. All change-detection state (the
//! resolved container id and the last transmitted digest) lives in the
//! session's poller and is only touched from the session's own task.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dockstream_common::config::DockstreamConfig;
use dockstream_common::constants;
use dockstream_common::error::{FetchError, StreamError};
use dockstream_common::types::{ContainerId, SessionId};
use dockstream_docker::ResourceFetcher;
use tokio::sync::watch;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::channel::SubscriberSink;
use crate::digest::{SnapshotDigest, digest};
use crate::emitter::Emitter;
use crate::resolver::NameResolver;
use crate::scheduler::{PollOutcome, Poller, Scheduler};

/// What a session watches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The listing of all containers.
    AllContainers,
    /// One container addressed by its identifier.
    ContainerId(ContainerId),
    /// One container addressed by name, resolved lazily.
    ContainerName(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllContainers => write!(f, "all"),
            Self::ContainerId(id) => write!(f, "id:{id}"),
            Self::ContainerName(name) => write!(f, "name:{name}"),
        }
    }
}

/// Lifecycle of a session.
///
/// `Starting → Running → {Stopped, Faulted}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Constructed, `Loading` not yet delivered.
    Starting,
    /// Polling.
    Running,
    /// Ended by cancellation or subscriber disconnect.
    Stopped,
    /// Ended by a delivery fault.
    Faulted,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Faulted => write!(f, "faulted"),
        }
    }
}

/// Timing parameters of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Interval between poll cycles.
    pub poll_interval: Duration,
    /// Deadline of each fetch against the daemon.
    pub fetch_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(constants::DEFAULT_POLL_INTERVAL_MS),
            fetch_timeout: Duration::from_millis(constants::DEFAULT_FETCH_TIMEOUT_MS),
        }
    }
}

impl From<&DockstreamConfig> for SessionConfig {
    fn from(config: &DockstreamConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            fetch_timeout: config.fetch_timeout(),
        }
    }
}

/// Handle for stopping a session and observing its phase.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    cancel: CancellationToken,
    phase: watch::Receiver<SessionPhase>,
}

impl SessionHandle {
    /// Returns the session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Stops the session. Stopping more than once has no further effect.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Returns whether the session was asked to stop.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns the current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }
}

/// One subscriber's stream of change messages.
pub struct Session<S> {
    id: SessionId,
    target: Target,
    fetcher: Arc<dyn ResourceFetcher>,
    sink: S,
    cancel: CancellationToken,
    config: SessionConfig,
    phase: watch::Sender<SessionPhase>,
}

impl<S> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: SubscriberSink> Session<S> {
    /// Creates a session watching `target` through `fetcher` and writing to
    /// `sink`. Setting `cancel` stops the session.
    pub fn new(
        fetcher: Arc<dyn ResourceFetcher>,
        target: Target,
        sink: S,
        cancel: CancellationToken,
        config: SessionConfig,
    ) -> Self {
        let (phase, _) = watch::channel(SessionPhase::Starting);
        Self {
            id: SessionId::generate(),
            target,
            fetcher,
            sink,
            cancel,
            config,
            phase,
        }
    }

    /// Returns the session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Returns a handle that can stop the session from another task.
    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            id: self.id,
            cancel: self.cancel.clone(),
            phase: self.phase.subscribe(),
        }
    }

    /// Runs the session until it is stopped or its channel faults.
    ///
    /// # Errors
    ///
    /// Returns `StreamError::DeliveryFault` if the subscriber channel broke
    /// while the subscriber was still connected. The caller should then
    /// terminate the underlying connection.
    pub async fn run(self) -> Result<(), StreamError> {
        tracing::info!(session = %self.id, target = %self.target, "stream session started");

        let emitter = Emitter::new(self.sink, self.cancel.clone(), self.id);
        let mut poller = SessionPoller::new(
            self.id,
            Arc::clone(&self.fetcher),
            self.target.clone(),
            self.config.fetch_timeout,
        );
        let result = Scheduler::new(self.config.poll_interval, self.id)
            .with_phase(self.phase)
            .run(&mut poller, &emitter, &self.cancel)
            .await;

        match &result {
            Ok(()) => tracing::info!(session = %self.id, "stream session stopped"),
            Err(e) => tracing::error!(session = %self.id, error = %e, "stream session faulted"),
        }
        result
    }
}

/// Per-session change-detection state, driven by the scheduler.
pub struct SessionPoller {
    session: SessionId,
    fetcher: Arc<dyn ResourceFetcher>,
    target: Target,
    resolver: Option<NameResolver>,
    resolved: Option<ContainerId>,
    last_digest: Option<SnapshotDigest>,
    fetch_timeout: Duration,
}

impl SessionPoller {
    /// Creates a poller for `target` with nothing transmitted yet.
    pub fn new(
        session: SessionId,
        fetcher: Arc<dyn ResourceFetcher>,
        target: Target,
        fetch_timeout: Duration,
    ) -> Self {
        let (resolver, resolved) = match &target {
            Target::ContainerName(name) => (Some(NameResolver::new(name.clone())), None),
            Target::ContainerId(id) => (None, Some(id.clone())),
            Target::AllContainers => (None, None),
        };
        Self {
            session,
            fetcher,
            target,
            resolver,
            resolved,
            last_digest: None,
            fetch_timeout,
        }
    }

    async fn cycle(&mut self) -> Result<Option<serde_json::Value>, StreamError> {
        let snapshot = if matches!(self.target, Target::AllContainers) {
            let listing = self
                .bounded("container listing", self.fetcher.list_all())
                .await?;
            to_snapshot(&listing)?
        } else {
            let id = self.container_id().await?;
            self.bounded(&format!("inspect of {id}"), self.fetcher.inspect_by_id(&id))
                .await?
        };

        let current = digest(&snapshot);
        if self.last_digest.as_ref() == Some(&current) {
            return Ok(None);
        }
        tracing::debug!(session = %self.session, digest = %current, "snapshot changed");
        self.last_digest = Some(current);
        Ok(Some(snapshot))
    }

    async fn container_id(&mut self) -> Result<ContainerId, StreamError> {
        if let Some(id) = &self.resolved {
            return Ok(id.clone());
        }
        let Some(resolver) = &self.resolver else {
            return Err(StreamError::ResolutionNotFound {
                name: self.target.to_string(),
            });
        };
        let listing = self
            .bounded("container listing", self.fetcher.list_all())
            .await?;
        let id = resolver.resolve(&listing)?;
        tracing::info!(session = %self.session, name = resolver.name(), id = %id, "container name resolved");
        self.resolved = Some(id.clone());
        Ok(id)
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        fetch: impl Future<Output = Result<T, FetchError>>,
    ) -> Result<T, StreamError> {
        match time::timeout(self.fetch_timeout, fetch).await {
            Ok(result) => result.map_err(StreamError::from),
            Err(_elapsed) => Err(StreamError::from(FetchError::Timeout {
                operation: operation.to_string(),
                after: self.fetch_timeout,
            })),
        }
    }
}

#[async_trait]
impl Poller for SessionPoller {
    async fn poll(&mut self) -> PollOutcome {
        match self.cycle().await {
            Ok(None) => PollOutcome::NoChange,
            Ok(Some(snapshot)) => PollOutcome::Changed(snapshot),
            Err(e) => {
                tracing::warn!(
                    session = %self.session,
                    target = %self.target,
                    kind = e.as_label(),
                    error = %e,
                    "poll failed"
                );
                PollOutcome::RecoverableError(e.to_string())
            }
        }
    }
}

fn to_snapshot<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, StreamError> {
    serde_json::to_value(value).map_err(|e| StreamError::FetchFailure {
        source: FetchError::Decode {
            message: e.to_string(),
        },
    })
}
