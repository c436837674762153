//! # dockstream-server
//!
//! Route layer of dockstream: configuration, the axum router, and the
//! services listing. The `dockstream` binary in `main.rs` wires them to a
//! Docker Engine API fetcher.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod cli;
pub mod listing;
pub mod routes;
