use super::{
    MatrixAnalysis, ResponseCache, RouteEntry, Topology, check_version, is_stale,
    encoding::{MatrixError, MatrixReader, MatrixWriter},
    route_entry::ENCODED_ROUTE_ENTRY,
};
use crate::{
    pair::{tri_matrix_index, tri_matrix_length},
    route::{Route, RouteError, RouteRelay},
    stats::Sample,
};
use bytes::Bytes;
use std::{
    io::{self, Read, Write},
    time::Duration,
};

/// Version written by [`RouteMatrix::encode`].
pub const ROUTE_MATRIX_VERSION: u32 = 1;

/// A topology with the candidate routes of every relay pair
///
/// Route entries are stored in triangular order. The relay chains of the
/// entry of `(i, j)`, `i > j`, go from relay `i` to relay `j`.
///
/// Every relay also carries a destination flag: only the pairs with at
/// least one destination relay are part of the [`analysis`]. All relays
/// are destination relays unless told otherwise.
///
/// ```
/// # use nextroute_core::{RouteMatrix, Topology, Relay, RelayId};
/// # use nextroute_core::{matrix::RouteSet, relay::UNSPECIFIED_ADDRESS};
/// let topology = Topology::new(vec![
///     Relay::new(RelayId::new(1), UNSPECIFIED_ADDRESS, "a").with_datacenter(1),
///     Relay::new(RelayId::new(2), UNSPECIFIED_ADDRESS, "b").with_datacenter(2),
/// ])
/// .unwrap();
///
/// let datacenters = topology.datacenters();
/// let mut routes = RouteSet::new(&datacenters);
/// routes.add_route(35, &[0, 1]);
/// let entry = routes.into_entry(65);
///
/// let matrix = RouteMatrix::new(topology, vec![entry], 1_700_000_000).unwrap();
/// let decoded = RouteMatrix::decode(&matrix.encode().unwrap()).unwrap();
/// assert_eq!(decoded, matrix);
/// ```
///
/// [`analysis`]: RouteMatrix::analysis
#[derive(Debug, Clone)]
pub struct RouteMatrix {
    topology: Topology,
    entries: Vec<RouteEntry>,
    destination_relays: Vec<bool>,
    created_at: u64,
    response: ResponseCache,
    analysis: ResponseCache,
}

impl RouteMatrix {
    /// `entries` must hold one entry per relay pair of `topology`.
    pub fn new(topology: Topology, entries: Vec<RouteEntry>, created_at: u64) -> Result<Self, MatrixError> {
        let expected = tri_matrix_length(topology.len());
        if entries.len() != expected {
            return Err(MatrixError::InconsistentLength {
                field: "route entries",
                expected,
                actual: entries.len(),
            });
        }

        let destination_relays = vec![true; topology.len()];
        Ok(Self {
            topology,
            entries,
            destination_relays,
            created_at,
            response: ResponseCache::default(),
            analysis: ResponseCache::default(),
        })
    }

    /// Replaces the destination flag of every relay.
    pub fn with_destination_relays(mut self, destination_relays: Vec<bool>) -> Result<Self, MatrixError> {
        if destination_relays.len() != self.topology.len() {
            return Err(MatrixError::InconsistentLength {
                field: "destination relays",
                expected: self.topology.len(),
                actual: destination_relays.len(),
            });
        }
        self.destination_relays = destination_relays;
        Ok(self)
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Entry of the relays at index `a` and `b`.
    pub fn entry(&self, a: usize, b: usize) -> Option<&RouteEntry> {
        if a == b || a >= self.topology.len() || b >= self.topology.len() {
            return None;
        }
        self.entries.get(tri_matrix_index(a, b))
    }

    pub fn destination_relays(&self) -> &[bool] {
        &self.destination_relays
    }

    /// Creation time, in seconds since the unix epoch.
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// `true` once `created_at + stale < now`.
    pub fn is_stale(&self, stale: Duration, now: u64) -> bool {
        is_stale(self.created_at, stale, now)
    }

    /// The candidate routes from the relay at index `from` to the relay at
    /// index `to`, cheapest first.
    ///
    /// Route statistics only carry the route cost as round trip time.
    pub fn routes(&self, from: usize, to: usize) -> Result<Vec<Route>, RouteError> {
        let Some(entry) = self.entry(from, to) else {
            return Ok(Vec::new());
        };
        // stored chains go from the larger index to the smaller one
        let reverse = from < to;

        let mut routes = Vec::with_capacity(entry.num_routes());
        for candidate in entry.routes() {
            let mut relays = candidate
                .relays
                .iter()
                .map(|index| {
                    let relay = usize::try_from(*index)
                        .ok()
                        .and_then(|i| self.topology.relay(i))
                        .ok_or(RouteError::UnknownRelayIndex { index: *index })?;
                    let mut hop = RouteRelay::new(relay.id);
                    hop.name = relay.name.clone();
                    hop.address = relay.address;
                    Ok(hop)
                })
                .collect::<Result<Vec<_>, RouteError>>()?;
            if reverse {
                relays.reverse();
            }

            let stats = Sample {
                rtt: candidate.cost as f32,
                jitter: 0.0,
                packet_loss: 0.0,
            };
            routes.push(Route::new(&relays, stats)?);
        }

        Ok(routes)
    }

    pub fn encode(&self) -> Result<Bytes, MatrixError> {
        let capacity = 64
            + self.topology.len() * 97
            + self.entries.len() * ENCODED_ROUTE_ENTRY;
        let mut writer = MatrixWriter::with_capacity(capacity);

        writer.put_u32(ROUTE_MATRIX_VERSION);
        self.topology.encode(&mut writer)?;
        writer.put_count("route entry count", self.entries.len())?;
        for entry in &self.entries {
            entry.encode(&mut writer, self.topology.len())?;
        }
        writer.put_u64(self.created_at);
        for destination in &self.destination_relays {
            writer.put_bool(*destination);
        }

        Ok(writer.finish())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, MatrixError> {
        let mut reader = MatrixReader::new(bytes);

        check_version(reader.get_u32()?, ROUTE_MATRIX_VERSION)?;
        let topology = Topology::decode(&mut reader)?;

        let count = reader.get_count(ENCODED_ROUTE_ENTRY)?;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(RouteEntry::decode(&mut reader, topology.len())?);
        }
        let created_at = reader.get_u64()?;

        let mut destination_relays = Vec::with_capacity(topology.len());
        for _ in 0..topology.len() {
            destination_relays.push(reader.get_bool()?);
        }
        reader.finish()?;

        Self::new(topology, entries, created_at)?.with_destination_relays(destination_relays)
    }

    /// Reads an encoded matrix until the end of `reader`.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self, MatrixError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::decode(&bytes)
    }

    /// Writes the encoded matrix, returns the number of bytes written.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<usize, MatrixError> {
        let bytes = self.encode()?;
        writer.write_all(&bytes)?;
        Ok(bytes.len())
    }

    /// Encodes the matrix and keeps the result for [`response_data`].
    ///
    /// [`response_data`]: RouteMatrix::response_data
    pub fn write_response_data(&self) -> Result<(), MatrixError> {
        self.response.store(self.encode()?);
        Ok(())
    }

    /// The bytes stored by the last [`write_response_data`], empty if it
    /// was never called.
    ///
    /// [`write_response_data`]: RouteMatrix::write_response_data
    pub fn response_data(&self) -> Bytes {
        self.response.load()
    }

    pub fn analysis(&self) -> MatrixAnalysis {
        MatrixAnalysis::new(&self.entries, &self.destination_relays)
    }

    /// Writes the text report of [`analysis`].
    ///
    /// [`analysis`]: RouteMatrix::analysis
    pub fn write_analysis_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        write!(writer, "{}", self.analysis())
    }

    /// Renders the text report once and keeps it for [`analysis_data`].
    ///
    /// [`analysis_data`]: RouteMatrix::analysis_data
    pub fn write_analysis_data(&self) {
        self.analysis.store(Bytes::from(self.analysis().to_string()));
    }

    pub fn analysis_data(&self) -> Bytes {
        self.analysis.load()
    }
}

impl PartialEq for RouteMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.created_at == other.created_at
            && self.topology == other.topology
            && self.entries == other.entries
            && self.destination_relays == other.destination_relays
    }
}
