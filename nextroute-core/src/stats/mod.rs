//! Conservative relay to relay statistics.
//!
//! Every relay periodically reports the round trip time, jitter and packet
//! loss it measured towards the other relays ([`RelayStatsUpdate`]). For
//! each directed pair the [`StatsStore`] keeps a fixed window of history
//! and reports the worst value seen in that window. A relay pair is as
//! good as the worst of its two directions.

mod history;
mod store;

pub use self::{
    history::{History, PairStats},
    store::StatsStore,
};
use crate::{defaults::INVALID_ROUTE_VALUE, relay::RelayId};
use serde::{Deserialize, Serialize};

/// One measurement reported by a relay towards `relay_id`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelayStatsPing {
    pub relay_id: RelayId,
    pub rtt: f32,
    pub jitter: f32,
    pub packet_loss: f32,
}

impl RelayStatsPing {
    pub fn new(relay_id: RelayId, rtt: f32, jitter: f32, packet_loss: f32) -> Self {
        Self {
            relay_id,
            rtt,
            jitter,
            packet_loss,
        }
    }
}

/// All the measurements reported by the relay `id` in one update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayStatsUpdate {
    pub id: RelayId,
    pub ping_stats: Vec<RelayStatsPing>,
}

/// Round trip time, jitter and packet loss of a relay pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub rtt: f32,
    pub jitter: f32,
    pub packet_loss: f32,
}

impl Sample {
    /// The sample of a pair with no usable measurement.
    pub const INVALID: Self = Self {
        rtt: INVALID_ROUTE_VALUE,
        jitter: INVALID_ROUTE_VALUE,
        packet_loss: INVALID_ROUTE_VALUE,
    };

    /// Elementwise maximum of two samples.
    ///
    /// ```
    /// # use nextroute_core::Sample;
    /// let a = Sample { rtt: 10.0, jitter: 3.0, packet_loss: 0.0 };
    /// let b = Sample { rtt: 12.0, jitter: 1.0, packet_loss: 0.5 };
    /// assert_eq!(a.worst(b), Sample { rtt: 12.0, jitter: 3.0, packet_loss: 0.5 });
    /// ```
    pub fn worst(self, other: Self) -> Self {
        Self {
            rtt: self.rtt.max(other.rtt),
            jitter: self.jitter.max(other.jitter),
            packet_loss: self.packet_loss.max(other.packet_loss),
        }
    }

    /// `true` when one of the metrics holds the invalid sentinel.
    pub fn has_invalid(&self) -> bool {
        self.rtt == INVALID_ROUTE_VALUE
            || self.jitter == INVALID_ROUTE_VALUE
            || self.packet_loss == INVALID_ROUTE_VALUE
    }

    /// `true` when the sample holds real measurements within the given
    /// jitter and packet loss thresholds.
    ///
    /// A round trip time at or above [`INVALID_ROUTE_VALUE`] is never
    /// routable, it would not fit a cost.
    ///
    /// ```
    /// # use nextroute_core::Sample;
    /// let sample = Sample { rtt: 20.0, jitter: 1.0, packet_loss: 0.0 };
    /// assert!(sample.is_routable(10.0, 0.1));
    /// assert!(!sample.is_routable(0.5, 0.1));
    /// assert!(!Sample { rtt: 10000.5, ..sample }.is_routable(10.0, 0.1));
    /// assert!(!Sample::INVALID.is_routable(f32::MAX, f32::MAX));
    /// ```
    pub fn is_routable(&self, max_jitter: f32, max_packet_loss: f32) -> bool {
        self.rtt < INVALID_ROUTE_VALUE
            && !self.has_invalid()
            && self.jitter <= max_jitter
            && self.packet_loss <= max_packet_loss
    }
}

/// Statistics of one unordered relay pair, as published to analytics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingStatsEntry {
    pub relay_a: RelayId,
    pub relay_b: RelayId,
    pub rtt: f32,
    pub jitter: f32,
    pub packet_loss: f32,
    pub routable: bool,
    pub instance_id: String,
    pub debug: bool,
}
