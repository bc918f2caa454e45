use super::encoding::{MatrixError, MatrixReader, MatrixWriter};
use crate::defaults::{INVALID_ROUTE_COST, MAX_RELAYS_PER_ROUTE, MAX_ROUTES_PER_ENTRY, NO_ROUTE_COST};

/// size of one encoded [`RouteEntry`]
pub(crate) const ENCODED_ROUTE_ENTRY: usize =
    4 + 4 + MAX_ROUTES_PER_ENTRY * (4 + 4 + 4 + 4 * MAX_RELAYS_PER_ROUTE);

/// 32 bit hash of a chain of relay indices
///
/// FNV style: starting from zero, each byte of each index (most
/// significant first) is xored in then multiplied by the FNV prime.
///
/// ```
/// # use nextroute_core::matrix::route_hash32;
/// assert_eq!(route_hash32(&[]), 0);
/// assert_ne!(route_hash32(&[1, 2]), route_hash32(&[2, 1]));
/// ```
pub fn route_hash32(relays: &[i32]) -> u32 {
    const PRIME: u32 = 16_777_619;

    relays
        .iter()
        .flat_map(|relay| relay.to_be_bytes())
        .fold(0, |hash, byte| (hash ^ u32::from(byte)).wrapping_mul(PRIME))
}

/// Candidate routes of one relay pair
///
/// Only the first `num_routes` slots are meaningful, and in each of them
/// only the first `route_num_relays[i]` relay indices. Everything else is
/// zero and must be ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteEntry {
    pub direct_cost: i32,
    pub num_routes: i32,
    pub route_cost: [i32; MAX_ROUTES_PER_ENTRY],
    pub route_num_relays: [i32; MAX_ROUTES_PER_ENTRY],
    pub route_relays: [[i32; MAX_RELAYS_PER_ROUTE]; MAX_ROUTES_PER_ENTRY],
    pub route_hash: [u32; MAX_ROUTES_PER_ENTRY],
}

/// One candidate route of a [`RouteEntry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateRoute<'a> {
    pub cost: i32,
    pub hash: u32,
    /// relay indices, in the stored orientation
    pub relays: &'a [i32],
}

impl RouteEntry {
    /// An entry with no candidate route.
    pub fn direct(direct_cost: i32) -> Self {
        Self {
            direct_cost,
            ..Self::default()
        }
    }

    /// Number of candidate routes, clamped to the capacity of the entry.
    pub fn num_routes(&self) -> usize {
        self.num_routes.clamp(0, MAX_ROUTES_PER_ENTRY as i32) as usize
    }

    /// The candidate routes, cheapest first.
    pub fn routes(&self) -> impl Iterator<Item = CandidateRoute<'_>> + '_ {
        (0..self.num_routes()).map(move |index| {
            let length = self.route_num_relays[index].clamp(0, MAX_RELAYS_PER_ROUTE as i32) as usize;
            CandidateRoute {
                cost: self.route_cost[index],
                hash: self.route_hash[index],
                relays: &self.route_relays[index][..length],
            }
        })
    }

    pub fn best_cost(&self) -> Option<i32> {
        self.routes().next().map(|route| route.cost)
    }

    /// Encodes the entry, whose active relay indices must be below
    /// `num_relays`.
    pub(crate) fn encode(&self, writer: &mut MatrixWriter, num_relays: usize) -> Result<(), MatrixError> {
        writer.put_ranged_i32("direct cost", self.direct_cost, NO_ROUTE_COST, INVALID_ROUTE_COST)?;
        writer.put_ranged_i32("route count", self.num_routes, 0, MAX_ROUTES_PER_ENTRY as i32)?;
        let max_relay_index = max_relay_index(num_relays);

        for index in 0..MAX_ROUTES_PER_ENTRY {
            writer.put_ranged_i32("route cost", self.route_cost[index], NO_ROUTE_COST, INVALID_ROUTE_COST)?;
            writer.put_ranged_i32(
                "route length",
                self.route_num_relays[index],
                0,
                MAX_RELAYS_PER_ROUTE as i32,
            )?;
            writer.put_u32(self.route_hash[index]);

            let active = self.active_relays(index);
            for (slot, relay) in self.route_relays[index].into_iter().enumerate() {
                if slot < active {
                    writer.put_ranged_i32("relay index", relay, 0, max_relay_index)?;
                } else {
                    writer.put_i32(relay);
                }
            }
        }

        Ok(())
    }

    /// number of meaningful relay indices of the slot `index`
    fn active_relays(&self, index: usize) -> usize {
        if index < self.num_routes() {
            self.route_num_relays[index].clamp(0, MAX_RELAYS_PER_ROUTE as i32) as usize
        } else {
            0
        }
    }

    /// Decodes an entry whose active relay indices must be below
    /// `num_relays`.
    pub(crate) fn decode(reader: &mut MatrixReader<'_>, num_relays: usize) -> Result<Self, MatrixError> {
        let mut entry = Self {
            direct_cost: reader.get_ranged_i32("direct cost", NO_ROUTE_COST, INVALID_ROUTE_COST)?,
            num_routes: reader.get_ranged_i32("route count", 0, MAX_ROUTES_PER_ENTRY as i32)?,
            ..Self::default()
        };
        let max_relay_index = max_relay_index(num_relays);

        for index in 0..MAX_ROUTES_PER_ENTRY {
            entry.route_cost[index] = reader.get_ranged_i32("route cost", NO_ROUTE_COST, INVALID_ROUTE_COST)?;
            entry.route_num_relays[index] =
                reader.get_ranged_i32("route length", 0, MAX_RELAYS_PER_ROUTE as i32)?;
            entry.route_hash[index] = reader.get_u32()?;

            let active = entry.active_relays(index);
            for slot in 0..MAX_RELAYS_PER_ROUTE {
                entry.route_relays[index][slot] = if slot < active {
                    reader.get_ranged_i32("relay index", 0, max_relay_index)?
                } else {
                    reader.get_i32()?
                };
            }
        }

        Ok(entry)
    }
}

/// `-1` for an empty topology: no index is valid
fn max_relay_index(num_relays: usize) -> i32 {
    (num_relays as i64 - 1).min(i32::MAX as i64) as i32
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    cost: i32,
    hash: u32,
    num_relays: usize,
    relays: [i32; MAX_RELAYS_PER_ROUTE],
}

/// Builder of the candidate routes of one relay pair
///
/// Keeps at most [`MAX_ROUTES_PER_ENTRY`] routes sorted by cost. Routes
/// that visit a relay twice, that go through two relays of the same
/// datacenter or that are already known are rejected.
///
/// ```
/// # use nextroute_core::matrix::RouteSet;
/// // datacenter of relays 0, 1, 2 and 3
/// let datacenters = [10, 11, 12, 12];
/// let mut routes = RouteSet::new(&datacenters);
///
/// assert!(routes.add_route(40, &[0, 1]));
/// assert!(routes.add_route(30, &[0, 2, 1]));
/// // loop
/// assert!(!routes.add_route(20, &[0, 1, 0]));
/// // two relays in datacenter 12
/// assert!(!routes.add_route(20, &[0, 2, 3]));
///
/// let entry = routes.into_entry(50);
/// assert_eq!(entry.num_routes, 2);
/// assert_eq!(entry.best_cost(), Some(30));
/// ```
#[derive(Debug, Clone)]
pub struct RouteSet<'a> {
    datacenters: &'a [u64],
    routes: Vec<Candidate>,
}

impl<'a> RouteSet<'a> {
    /// `datacenters` holds the datacenter of every relay, by index.
    pub fn new(datacenters: &'a [u64]) -> Self {
        Self {
            datacenters,
            routes: Vec::with_capacity(MAX_ROUTES_PER_ENTRY),
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Returns `true` if the route was kept.
    pub fn add_route(&mut self, cost: i32, relays: &[i32]) -> bool {
        if relays.is_empty() || relays.len() > MAX_RELAYS_PER_ROUTE {
            return false;
        }

        let mut datacenters = [0u64; MAX_RELAYS_PER_ROUTE];
        for (position, relay) in relays.iter().enumerate() {
            let Some(datacenter) = usize::try_from(*relay)
                .ok()
                .and_then(|index| self.datacenters.get(index))
            else {
                return false;
            };
            if relays[..position].contains(relay) || datacenters[..position].contains(datacenter) {
                return false;
            }
            datacenters[position] = *datacenter;
        }

        let full = self.routes.len() == MAX_ROUTES_PER_ENTRY;
        let worst = self.routes.last().map(|route| route.cost);
        if full && worst.is_some_and(|worst| cost >= worst) {
            return false;
        }

        let hash = route_hash32(relays);
        if self.routes.iter().any(|route| route.hash == hash) {
            return false;
        }

        let mut candidate = Candidate {
            cost,
            hash,
            num_relays: relays.len(),
            relays: [0; MAX_RELAYS_PER_ROUTE],
        };
        candidate.relays[..relays.len()].copy_from_slice(relays);

        // equal costs: a new route goes after the last route but before
        // any other route of the same cost
        let position = match worst {
            Some(worst) if !full && cost >= worst => self.routes.len(),
            _ => self.routes.partition_point(|route| route.cost < cost),
        };
        self.routes.insert(position, candidate);
        self.routes.truncate(MAX_ROUTES_PER_ENTRY);

        true
    }

    pub fn into_entry(self, direct_cost: i32) -> RouteEntry {
        let mut entry = RouteEntry::direct(direct_cost);
        entry.num_routes = self.routes.len() as i32;

        for (index, route) in self.routes.iter().enumerate() {
            entry.route_cost[index] = route.cost;
            entry.route_hash[index] = route.hash;
            entry.route_num_relays[index] = route.num_relays as i32;
            entry.route_relays[index] = route.relays;
        }

        entry
    }
}
