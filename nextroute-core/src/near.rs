//! Selection of the relays worth pinging between two endpoints.

use crate::{
    defaults::{
        DEFAULT_NEAR_RELAY_LATENCY_SCALE, DEFAULT_NEAR_RELAY_LATENCY_THRESHOLD_MS,
        DEFAULT_NEAR_RELAY_MAX_DISTANCE_KM,
    },
    geo::{Location, haversine_distance_km, speed_of_light_ms, speed_of_light_time_ms},
    matrix::Topology,
    relay::RelayId,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, net::SocketAddr};

/// A relay admitted by [`NearRelayPolicy::near_relays`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NearRelay {
    pub id: RelayId,
    pub address: SocketAddr,
}

/// Tuning of the near relay selection
///
/// A relay is admitted when the speed of light round trip through it,
/// scaled by `latency_scale`, stays within `latency_threshold_ms` of the
/// direct latency. Relays are considered closest to the source first,
/// up to `max_distance_km` away, then closest to the destination first
/// with no distance limit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NearRelayPolicy {
    pub max_distance_km: i64,
    pub latency_threshold_ms: f32,
    pub latency_scale: f32,
}

impl Default for NearRelayPolicy {
    fn default() -> Self {
        Self {
            max_distance_km: DEFAULT_NEAR_RELAY_MAX_DISTANCE_KM,
            latency_threshold_ms: DEFAULT_NEAR_RELAY_LATENCY_THRESHOLD_MS,
            latency_scale: DEFAULT_NEAR_RELAY_LATENCY_SCALE,
        }
    }
}

struct Candidate {
    id: RelayId,
    address: SocketAddr,
    location: Location,
    distance_km: i64,
}

impl NearRelayPolicy {
    /// Selects up to `max` relays between `source` and `destination`, in
    /// admission order.
    ///
    /// All locations are truncated to whole degrees. A `direct_latency_ms`
    /// of zero or less means the direct latency is unknown, it is then
    /// estimated as twice the speed of light time between both ends.
    ///
    /// ```
    /// # use nextroute_core::{NearRelayPolicy, Relay, RelayId, Topology, geo::Location};
    /// # use nextroute_core::relay::UNSPECIFIED_ADDRESS;
    /// let relay = |id: u64, latitude: f32, longitude: f32| {
    ///     Relay::new(RelayId::new(id), UNSPECIFIED_ADDRESS, "")
    ///         .with_location(latitude, longitude)
    /// };
    /// let topology = Topology::new(vec![
    ///     relay(1, 39.0, -104.0),
    ///     relay(2, 34.0, -118.0),
    ///     relay(3, 37.0, -122.0),
    /// ])
    /// .unwrap();
    ///
    /// let los_angeles = Location::from_degrees(34.05, -118.24).unwrap();
    /// let new_york = Location::from_degrees(40.71, -74.0).unwrap();
    ///
    /// let near = NearRelayPolicy::default().near_relays(&topology, 80.0, los_angeles, new_york, 2);
    /// let ids: Vec<_> = near.iter().map(|relay| relay.id).collect();
    /// assert_eq!(ids, [RelayId::new(2), RelayId::new(3)]);
    /// ```
    pub fn near_relays(
        &self,
        topology: &Topology,
        direct_latency_ms: f32,
        source: Location,
        destination: Location,
        max: usize,
    ) -> Vec<NearRelay> {
        let source = source.truncated();
        let destination = destination.truncated();

        let direct_latency_ms = if direct_latency_ms <= 0.0 {
            speed_of_light_ms(haversine_distance_km(source, destination)) as f32 * 2.0
        } else {
            direct_latency_ms
        };
        let max_latency_ms = direct_latency_ms + self.latency_threshold_ms;

        let mut candidates = Vec::with_capacity(topology.len());
        for relay in topology.relays() {
            match Location::from_degrees(f64::from(relay.latitude), f64::from(relay.longitude)) {
                Ok(location) => candidates.push(Candidate {
                    id: relay.id,
                    address: relay.address,
                    location: location.truncated(),
                    distance_km: 0,
                }),
                Err(error) => {
                    tracing::warn!(relay = %relay.id, %error, "relay skipped from near relay selection");
                }
            }
        }

        let admissible = |candidate: &Candidate| {
            let latency_ms =
                speed_of_light_time_ms(source, candidate.location, destination) as f32;
            self.latency_scale * latency_ms <= max_latency_ms
        };

        let mut selected = Vec::with_capacity(max.min(candidates.len()));
        let mut admitted = HashSet::new();

        sort_by_distance(&mut candidates, source);
        for candidate in &candidates {
            if selected.len() == max || candidate.distance_km > self.max_distance_km {
                break;
            }
            if !admissible(candidate) {
                continue;
            }
            admitted.insert(candidate.id);
            selected.push(NearRelay {
                id: candidate.id,
                address: candidate.address,
            });
        }

        if selected.len() == max {
            return selected;
        }

        sort_by_distance(&mut candidates, destination);
        for candidate in &candidates {
            if selected.len() == max {
                break;
            }
            if admitted.contains(&candidate.id) || !admissible(candidate) {
                continue;
            }
            admitted.insert(candidate.id);
            selected.push(NearRelay {
                id: candidate.id,
                address: candidate.address,
            });
        }

        selected
    }
}

/// stable: relays at the same distance keep their topology order
fn sort_by_distance(candidates: &mut [Candidate], from: Location) {
    for candidate in candidates.iter_mut() {
        candidate.distance_km = haversine_distance_km(from, candidate.location) as i64;
    }
    candidates.sort_by_key(|candidate| candidate.distance_km);
}
