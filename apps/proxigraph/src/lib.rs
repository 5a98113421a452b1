//! # Proxigraph
//!
//! Application layer around `proxigraph-core`: HTTP API, background
//! scheduler, CLI and layered configuration.

pub mod api;
pub mod cli;
pub mod config;
pub mod scheduler;
