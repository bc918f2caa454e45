use crate::{
    defaults::MAX_RELAYS_PER_ROUTE,
    relay::{RelayId, UNSPECIFIED_ADDRESS},
    stats::Sample,
};
use fnv::FnvHasher;
use std::{
    fmt,
    hash::{Hash, Hasher},
    net::SocketAddr,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("a route needs at least one relay")]
    Empty,
    #[error("a route holds at most {max} relays, got {count}", max = MAX_RELAYS_PER_ROUTE)]
    TooManyRelays { count: usize },
    #[error("relay index {index} is not part of the topology")]
    UnknownRelayIndex { index: i32 },
}

/// One hop of a [`Route`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRelay {
    pub id: RelayId,
    pub name: String,
    pub address: SocketAddr,
    pub public_key: [u8; 32],
    pub seller: String,
}

impl RouteRelay {
    pub fn new(id: RelayId) -> Self {
        Self {
            id,
            name: String::new(),
            address: UNSPECIFIED_ADDRESS,
            public_key: [0; 32],
            seller: String::new(),
        }
    }
}

/// A selected path through the relay fleet
///
/// Two routes are equal when they go through the same relays in the same
/// order. Names, addresses and statistics do not take part in the
/// identity of a route.
///
/// ```
/// # use nextroute_core::{Route, RelayId, Sample, route::RouteRelay};
/// let chain = |ids: &[u64]| -> Vec<RouteRelay> {
///     ids.iter().map(|id| RouteRelay::new(RelayId::new(*id))).collect()
/// };
///
/// let a = Route::new(&chain(&[1, 2, 3]), Sample::INVALID).unwrap();
/// let b = Route::new(&chain(&[1, 2, 3]), Sample::INVALID).unwrap();
/// let c = Route::new(&chain(&[3, 2, 1]), Sample::INVALID).unwrap();
///
/// assert_eq!(a.hash64(), b.hash64());
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// ```
#[derive(Debug, Clone)]
pub struct Route {
    num_relays: usize,
    relay_ids: [RelayId; MAX_RELAYS_PER_ROUTE],
    relay_names: [String; MAX_RELAYS_PER_ROUTE],
    relay_addresses: [SocketAddr; MAX_RELAYS_PER_ROUTE],
    relay_public_keys: [[u8; 32]; MAX_RELAYS_PER_ROUTE],
    relay_sellers: [String; MAX_RELAYS_PER_ROUTE],
    stats: Sample,
}

impl Route {
    pub fn new(relays: &[RouteRelay], stats: Sample) -> Result<Self, RouteError> {
        if relays.is_empty() {
            return Err(RouteError::Empty);
        }
        if relays.len() > MAX_RELAYS_PER_ROUTE {
            return Err(RouteError::TooManyRelays {
                count: relays.len(),
            });
        }

        let mut route = Self {
            num_relays: relays.len(),
            relay_ids: [RelayId::ZERO; MAX_RELAYS_PER_ROUTE],
            relay_names: Default::default(),
            relay_addresses: [UNSPECIFIED_ADDRESS; MAX_RELAYS_PER_ROUTE],
            relay_public_keys: [[0; 32]; MAX_RELAYS_PER_ROUTE],
            relay_sellers: Default::default(),
            stats,
        };

        for (index, relay) in relays.iter().enumerate() {
            route.relay_ids[index] = relay.id;
            route.relay_names[index] = relay.name.clone();
            route.relay_addresses[index] = relay.address;
            route.relay_public_keys[index] = relay.public_key;
            route.relay_sellers[index] = relay.seller.clone();
        }

        Ok(route)
    }

    pub fn num_relays(&self) -> usize {
        self.num_relays
    }

    pub fn relay_ids(&self) -> &[RelayId] {
        &self.relay_ids[..self.num_relays]
    }

    pub fn relay_names(&self) -> &[String] {
        &self.relay_names[..self.num_relays]
    }

    pub fn relay_addresses(&self) -> &[SocketAddr] {
        &self.relay_addresses[..self.num_relays]
    }

    pub fn relay_public_keys(&self) -> &[[u8; 32]] {
        &self.relay_public_keys[..self.num_relays]
    }

    pub fn relay_sellers(&self) -> &[String] {
        &self.relay_sellers[..self.num_relays]
    }

    pub fn stats(&self) -> Sample {
        self.stats
    }

    /// 64 bit FNV-1a hash of the little endian relay ids, in route order.
    ///
    /// Only the relays of the route take part in the hash, never the
    /// unused capacity.
    pub fn hash64(&self) -> u64 {
        let mut hasher = FnvHasher::default();
        for id in self.relay_ids() {
            hasher.write(&id.into_u64().to_le_bytes());
        }
        hasher.finish()
    }
}

impl PartialEq for Route {
    fn eq(&self, other: &Self) -> bool {
        self.relay_ids() == other.relay_ids()
    }
}

impl Eq for Route {}

impl Hash for Route {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash64());
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (id, name)) in self.relay_ids().iter().zip(self.relay_names()).enumerate() {
            if index > 0 {
                f.write_str(" -> ")?;
            }
            if name.is_empty() {
                write!(f, "{id:016x}")?;
            } else {
                f.write_str(name)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn route(ids: &[u64]) -> Route {
        let relays: Vec<_> = ids.iter().map(|id| RouteRelay::new(RelayId::new(*id))).collect();
        Route::new(&relays, Sample::INVALID).unwrap()
    }

    #[test]
    fn known_hash() {
        // FNV-1a 64 offset basis, nothing hashed
        assert_eq!(FnvHasher::default().finish(), 0xcbf2_9ce4_8422_2325);

        let mut hasher = FnvHasher::default();
        hasher.write(&[1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(route(&[1]).hash64(), hasher.finish());
    }

    #[test]
    fn stable_across_copies() {
        let a = route(&[1, 2, 3]);
        let b = a.clone();
        assert_eq!(a.hash64(), b.hash64());
        assert_eq!(a.hash64(), route(&[1, 2, 3]).hash64());
    }

    #[test]
    fn order_matters() {
        assert_ne!(route(&[1, 2, 3]), route(&[3, 2, 1]));
        assert_ne!(route(&[1, 2, 3]).hash64(), route(&[3, 2, 1]).hash64());
    }

    #[test]
    fn length_matters() {
        assert_ne!(route(&[1, 2]), route(&[1, 2, 0]));
        assert_ne!(route(&[1, 2]).hash64(), route(&[1, 2, 0]).hash64());
    }

    #[test]
    fn equality_ignores_metadata() {
        let mut relays = vec![RouteRelay::new(RelayId::new(1)), RouteRelay::new(RelayId::new(2))];
        let plain = Route::new(&relays, Sample::INVALID).unwrap();

        relays[0].name = "la".to_owned();
        relays[1].seller = "seller".to_owned();
        let stats = Sample {
            rtt: 10.0,
            jitter: 1.0,
            packet_loss: 0.0,
        };
        let named = Route::new(&relays, stats).unwrap();

        assert_eq!(plain, named);
        let set: HashSet<Route> = [plain, named].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn invalid_routes() {
        assert_eq!(Route::new(&[], Sample::INVALID).unwrap_err(), RouteError::Empty);

        let relays: Vec<_> = (0..6).map(|id| RouteRelay::new(RelayId::new(id))).collect();
        assert_eq!(
            Route::new(&relays, Sample::INVALID).unwrap_err(),
            RouteError::TooManyRelays { count: 6 }
        );
    }

    #[test]
    fn display() {
        let mut relays = vec![RouteRelay::new(RelayId::new(0x2a)), RouteRelay::new(RelayId::new(2))];
        relays[1].name = "relay.2".to_owned();
        let route = Route::new(&relays, Sample::INVALID).unwrap();
        assert_eq!(route.to_string(), "000000000000002a -> relay.2");
    }
}
