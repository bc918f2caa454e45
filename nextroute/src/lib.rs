//! Service side of the relay backend.
//!
//! Wires the [`nextroute_core`] building blocks together: relay updates
//! feed a [`StatsStore`], cost matrices are built from it, route matrices
//! are published to readers and ping statistics are drained into a
//! [`PingStatsSink`]. Everything is driven by a [`BackendConfig`].
//!
//! [`StatsStore`]: nextroute_core::StatsStore

pub mod backend;
pub mod config;
pub mod duration;
pub mod logging;
pub mod sink;

pub use self::{
    backend::{RelayBackend, unix_now},
    config::{BackendConfig, SinkKind},
    sink::PingStatsSink,
};
pub use nextroute_core;
