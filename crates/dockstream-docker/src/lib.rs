//! # dockstream-docker
//!
//! Access to the container daemon for dockstream.
//!
//! - [`ResourceFetcher`](fetcher::ResourceFetcher): the interface the
//!   streaming engine polls.
//! - [`EngineApiFetcher`](engine_api::EngineApiFetcher): implementation
//!   backed by the Docker Engine HTTP API.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod engine_api;
pub mod fetcher;

pub use engine_api::EngineApiFetcher;
pub use fetcher::ResourceFetcher;
