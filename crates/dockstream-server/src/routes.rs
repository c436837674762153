//! HTTP routes.
//!
//! ## Endpoints
//!
//! - `GET /api/sse/docker`        - SSE stream of the container listing
//! - `GET /api/sse/docker/:slug`  - SSE stream of one container, by name
//! - `GET /api/services`          - container summaries (slug, title, status)
//! - `GET /api/services/:slug`    - container detail, by id
//!
//! Each stream request gets its own session; the session stops when the
//! client disconnects and the response body is dropped.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use dockstream_common::config::DockstreamConfig;
use dockstream_common::error::FetchError;
use dockstream_common::types::{ContainerDetail, ContainerId};
use dockstream_docker::ResourceFetcher;
use dockstream_stream::channel::child_subscriber_channel;
use dockstream_stream::{Session, SessionConfig, Target};
use futures::StreamExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::listing::{ServiceSummary, service_summaries};

/// Shared state of the route layer.
#[derive(Clone)]
pub struct AppState {
    fetcher: Arc<dyn ResourceFetcher>,
    session: SessionConfig,
    channel_capacity: usize,
    shutdown: CancellationToken,
}

impl AppState {
    /// Creates the route state; cancelling `shutdown` ends every open stream.
    pub fn new(
        fetcher: Arc<dyn ResourceFetcher>,
        config: &DockstreamConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            session: SessionConfig::from(config),
            channel_capacity: config.channel_capacity,
            shutdown,
        }
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/sse/docker", get(containers_stream))
        .route("/api/sse/docker/:slug", get(container_stream))
        .route("/api/services", get(services))
        .route("/api/services/:slug", get(service))
        .with_state(state)
}

async fn containers_stream(State(state): State<AppState>) -> Response {
    open_stream(&state, Target::AllContainers)
}

async fn container_stream(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    open_stream(&state, Target::ContainerName(slug))
}

fn open_stream(state: &AppState, target: Target) -> Response {
    let (sink, stream, cancel) = child_subscriber_channel(&state.shutdown, state.channel_capacity);
    let session = Session::new(
        Arc::clone(&state.fetcher),
        target,
        sink,
        cancel,
        state.session,
    );
    let id = session.id();
    let _ = tokio::spawn(async move {
        // The sink is dropped with the session, which ends the response body.
        if let Err(e) = session.run().await {
            tracing::error!(session = %id, error = %e, "closing stream connection");
        }
    });

    let events = stream.map(|message| Event::default().json_data(&message));
    (
        [(header::CONNECTION, "keep-alive")],
        Sse::new(events),
    )
        .into_response()
}

async fn services(State(state): State<AppState>) -> Result<Json<Vec<ServiceSummary>>, ApiError> {
    let listing = state.fetcher.list_all().await?;
    Ok(Json(service_summaries(&listing)))
}

async fn service(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ContainerDetail>, ApiError> {
    let detail = state.fetcher.inspect_by_id(&ContainerId::new(slug)).await?;
    Ok(Json(detail))
}

/// Failure of a JSON endpoint.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] FetchError);

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            FetchError::NotFound { .. } => StatusCode::NOT_FOUND,
            FetchError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        };
        if status != StatusCode::NOT_FOUND {
            tracing::warn!(error = %self.0, "daemon request failed");
        }
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
