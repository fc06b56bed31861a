#![forbid(unsafe_code)]

//! Public entry point for the reusable tubemeta crate.
//!
//! The library fetches channel, video and playlist descriptors from the
//! YouTube Data API, keeps them as immutable snapshots and derives a few
//! summaries from them (playlist watch-time, most liked video, channel
//! popularity). The `tubemeta` binary is a thin shell around it.

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod duration;
pub mod error;
#[cfg(test)]
mod fixtures;
pub mod ordering;
pub mod provider;
pub mod snapshot;

pub use error::{Error, Result};
