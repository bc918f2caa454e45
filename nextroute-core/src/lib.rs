//! Route computation core of a relay overlay.
//!
//! Relays report ping statistics to each other. The [`stats::StatsStore`]
//! keeps a conservative view of those reports and turns them into
//! triangular cost arrays (see [`pair`]). Cost and route matrices
//! ([`matrix`]) are immutable snapshots of the relay topology that are
//! serialised once and served many times. [`near`] narrows a topology down
//! to the relays worth pinging for a given client and [`route`] gives
//! relay chains a stable identity.

pub mod defaults;
pub mod geo;
pub mod matrix;
pub mod near;
pub mod pair;
pub mod relay;
pub mod route;
pub mod stats;

pub use self::{
    geo::{GeoError, Location},
    matrix::{CostMatrix, MatrixError, RouteEntry, RouteMatrix, Topology},
    near::{NearRelay, NearRelayPolicy},
    relay::{Relay, RelayId},
    route::{Route, RouteError},
    stats::{PingStatsEntry, RelayStatsPing, RelayStatsUpdate, Sample, StatsStore},
};
