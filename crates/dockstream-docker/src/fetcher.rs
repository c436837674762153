//! Resource fetcher abstraction for platform-agnostic polling.

use async_trait::async_trait;
use dockstream_common::error::FetchResult;
use dockstream_common::types::{ContainerDetail, ContainerId, ContainerSummary};

/// Read-only access to the containers managed by a daemon.
///
/// Implementors must be safe to share between concurrently running stream
/// sessions; each session only ever calls these two methods.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Lists all containers currently known to the daemon.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached or answers with an
    /// unexpected payload.
    async fn list_all(&self) -> FetchResult<Vec<ContainerSummary>>;

    /// Returns the detailed record of one container.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::NotFound` if the daemon has no such container,
    /// `FetchError::Timeout` if the call exceeded its deadline, and other
    /// variants for transport or decoding failures.
    async fn inspect_by_id(&self, id: &ContainerId) -> FetchResult<ContainerDetail>;
}
