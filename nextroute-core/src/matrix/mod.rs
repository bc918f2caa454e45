//! Versioned snapshots of the relay topology.
//!
//! A [`CostMatrix`] carries the cost of every relay pair, a
//! [`RouteMatrix`] carries up to [`MAX_ROUTES_PER_ENTRY`] candidate routes
//! for every relay pair. Both are immutable once built: they are encoded
//! once into a [`ResponseCache`] and the cached bytes are served to every
//! reader until a new matrix replaces them.
//!
//! [`MAX_ROUTES_PER_ENTRY`]: crate::defaults::MAX_ROUTES_PER_ENTRY

mod analysis;
mod cache;
mod cost_matrix;
mod encoding;
mod route_entry;
mod route_matrix;
mod topology;

pub use self::{
    analysis::MatrixAnalysis,
    cache::ResponseCache,
    cost_matrix::{COST_MATRIX_BINARY_VERSION, COST_MATRIX_V1, COST_MATRIX_VERSION, CostMatrix},
    encoding::MatrixError,
    route_entry::{CandidateRoute, RouteEntry, RouteSet, route_hash32},
    route_matrix::{ROUTE_MATRIX_VERSION, RouteMatrix},
    topology::Topology,
};
use std::time::Duration;

/// `true` once `created_at + stale < now`, all in seconds.
///
/// ```
/// # use nextroute_core::matrix::is_stale;
/// # use std::time::Duration;
/// assert!(!is_stale(100, Duration::from_secs(30), 130));
/// assert!(is_stale(100, Duration::from_secs(30), 131));
/// ```
pub fn is_stale(created_at: u64, stale: Duration, now: u64) -> bool {
    created_at.saturating_add(stale.as_secs()) < now
}

fn check_version(version: u32, supported: u32) -> Result<(), MatrixError> {
    if version == supported {
        Ok(())
    } else {
        Err(MatrixError::UnsupportedVersion { version })
    }
}
