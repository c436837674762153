//! # dockstream-stream
//!
//! Push engine that turns the pollable state of one container, or of the
//! whole container listing, into a stream of change messages for a single
//! subscriber.
//!
//! Components, leaves first:
//! - [`digest`]: canonical change detection.
//! - [`resolver`]: lazy name to identifier resolution.
//! - [`channel`] and [`emitter`]: the subscriber sink and safe delivery.
//! - [`scheduler`]: the serialized poll-and-emit loop.
//! - [`session`]: the composition handed to the route layer.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use dockstream_docker::EngineApiFetcher;
//! use dockstream_stream::channel::subscriber_channel;
//! use dockstream_stream::session::{Session, SessionConfig, Target};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Arc::new(EngineApiFetcher::new("unix:///var/run/docker.sock", Duration::from_secs(1))?);
//! let (sink, stream, cancel) = subscriber_channel(16);
//! let session = Session::new(fetcher, Target::AllContainers, sink, cancel, SessionConfig::default());
//! let _task = tokio::spawn(session.run());
//! // hand `stream` to the transport; dropping it stops the session.
//! # drop(stream);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod channel;
pub mod digest;
pub mod emitter;
pub mod message;
pub mod resolver;
pub mod scheduler;
pub mod session;

pub use message::Message;
pub use session::{Session, SessionConfig, SessionHandle, SessionPhase, Target};
