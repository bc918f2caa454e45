use super::{
    ResponseCache, Topology, check_version, is_stale,
    encoding::{MatrixError, MatrixReader, MatrixWriter},
};
use crate::{
    defaults::{INVALID_ROUTE_COST, MAX_RELAY_NAME_LENGTH, NO_ROUTE_COST},
    pair::{tri_matrix_index, tri_matrix_length},
    relay::{Relay, RelayId},
};
use bytes::Bytes;
use std::{
    io::{Read, Write},
    net::SocketAddr,
    time::Duration,
};

/// Version written by [`CostMatrix::encode`].
pub const COST_MATRIX_VERSION: u32 = 1;

/// First version of the compact format of [`CostMatrix::encode_binary`].
pub const COST_MATRIX_V1: u32 = 1;

/// Version written by [`CostMatrix::encode_binary`].
pub const COST_MATRIX_BINARY_VERSION: u32 = COST_MATRIX_V1;

/// A topology with the cost of every relay pair
///
/// Costs are stored in triangular order (see [`crate::pair`]); a cost of
/// [`NO_ROUTE_COST`] means the pair cannot be used. The matrix has two
/// independent encodings: the streamed one of [`encode`] and the compact
/// one of [`encode_binary`], which spells out the relay addresses as
/// text. They are not interchangeable.
///
/// [`encode`]: CostMatrix::encode
/// [`encode_binary`]: CostMatrix::encode_binary
#[derive(Debug, Clone)]
pub struct CostMatrix {
    topology: Topology,
    costs: Vec<i32>,
    created_at: u64,
    response: ResponseCache,
    binary_response: ResponseCache,
}

impl CostMatrix {
    /// `costs` must hold one value per relay pair of `topology`.
    pub fn new(topology: Topology, costs: Vec<i32>, created_at: u64) -> Result<Self, MatrixError> {
        let expected = tri_matrix_length(topology.len());
        if costs.len() != expected {
            return Err(MatrixError::InconsistentLength {
                field: "costs",
                expected,
                actual: costs.len(),
            });
        }

        Ok(Self {
            topology,
            costs,
            created_at,
            response: ResponseCache::default(),
            binary_response: ResponseCache::default(),
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn costs(&self) -> &[i32] {
        &self.costs
    }

    /// Cost between the relays at index `a` and `b`.
    pub fn cost(&self, a: usize, b: usize) -> Option<i32> {
        if a == b || a >= self.topology.len() || b >= self.topology.len() {
            return None;
        }
        self.costs.get(tri_matrix_index(a, b)).copied()
    }

    /// Cost between two relays identified by id.
    pub fn relay_cost(&self, a: RelayId, b: RelayId) -> Option<i32> {
        self.cost(self.topology.relay_index(a)?, self.topology.relay_index(b)?)
    }

    /// Creation time, in seconds since the unix epoch.
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// `true` once `created_at + stale < now`.
    pub fn is_stale(&self, stale: Duration, now: u64) -> bool {
        is_stale(self.created_at, stale, now)
    }

    /// Streamed encoding.
    pub fn encode(&self) -> Result<Bytes, MatrixError> {
        let mut writer = MatrixWriter::with_capacity(self.encoded_size_hint());

        writer.put_u32(COST_MATRIX_VERSION);
        self.topology.encode(&mut writer)?;
        writer.put_count("cost count", self.costs.len())?;
        for cost in &self.costs {
            writer.put_ranged_i32("cost", *cost, NO_ROUTE_COST, INVALID_ROUTE_COST)?;
        }
        writer.put_u64(self.created_at);

        Ok(writer.finish())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, MatrixError> {
        let mut reader = MatrixReader::new(bytes);

        check_version(reader.get_u32()?, COST_MATRIX_VERSION)?;
        let topology = Topology::decode(&mut reader)?;
        let count = reader.get_count(4)?;
        let mut costs = Vec::with_capacity(count);
        for _ in 0..count {
            costs.push(reader.get_ranged_i32("cost", NO_ROUTE_COST, INVALID_ROUTE_COST)?);
        }
        let created_at = reader.get_u64()?;
        reader.finish()?;

        Self::new(topology, costs, created_at)
    }

    /// Compact encoding, tagged with [`COST_MATRIX_BINARY_VERSION`].
    pub fn encode_binary(&self) -> Result<Bytes, MatrixError> {
        let count = u16::try_from(self.topology.len()).map_err(|_| MatrixError::TooManyRelays {
            count: self.topology.len(),
        })?;

        let mut writer = MatrixWriter::with_capacity(self.encoded_size_hint());
        writer.put_u32(COST_MATRIX_BINARY_VERSION);
        writer.put_u64(self.created_at);
        writer.put_u16(count);

        for relay in self.topology.relays() {
            writer.put_u64(relay.id.into_u64());

            let address = relay.address.to_string();
            let length = u8::try_from(address.len())
                .map_err(|_| MatrixError::InvalidAddress { address: address.clone() })?;
            writer.put_u8(length);
            writer.put_bytes(address.as_bytes());

            writer.put_string(&relay.name, MAX_RELAY_NAME_LENGTH)?;
            writer.put_f32(relay.latitude);
            writer.put_f32(relay.longitude);
            writer.put_u64(relay.datacenter);
        }

        writer.put_count("cost count", self.costs.len())?;
        for cost in &self.costs {
            writer.put_ranged_i32("cost", *cost, NO_ROUTE_COST, INVALID_ROUTE_COST)?;
        }

        Ok(writer.finish())
    }

    pub fn decode_binary(bytes: &[u8]) -> Result<Self, MatrixError> {
        let mut reader = MatrixReader::new(bytes);

        check_version(reader.get_u32()?, COST_MATRIX_BINARY_VERSION)?;
        let created_at = reader.get_u64()?;
        let count = reader.get_u16()? as usize;

        let mut relays = Vec::with_capacity(count);
        for _ in 0..count {
            let id = RelayId::new(reader.get_u64()?);

            let length = reader.get_u8()? as usize;
            let raw = reader.get_bytes(length)?;
            let address = std::str::from_utf8(raw)
                .ok()
                .and_then(|text| text.parse::<SocketAddr>().ok())
                .ok_or_else(|| MatrixError::InvalidAddress {
                    address: String::from_utf8_lossy(raw).into_owned(),
                })?;

            relays.push(Relay {
                id,
                address,
                name: reader.get_string(MAX_RELAY_NAME_LENGTH)?,
                latitude: reader.get_f32()?,
                longitude: reader.get_f32()?,
                datacenter: reader.get_u64()?,
            });
        }
        let topology = Topology::new(relays)?;

        let count = reader.get_count(4)?;
        let mut costs = Vec::with_capacity(count);
        for _ in 0..count {
            costs.push(reader.get_ranged_i32("cost", NO_ROUTE_COST, INVALID_ROUTE_COST)?);
        }
        reader.finish()?;

        Self::new(topology, costs, created_at)
    }

    /// Reads a streamed matrix until the end of `reader`.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self, MatrixError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::decode(&bytes)
    }

    /// Writes the streamed encoding, returns the number of bytes written.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<usize, MatrixError> {
        let bytes = self.encode()?;
        writer.write_all(&bytes)?;
        Ok(bytes.len())
    }

    /// Encodes the matrix and keeps the result for [`response_data`].
    ///
    /// [`response_data`]: CostMatrix::response_data
    pub fn write_response_data(&self) -> Result<(), MatrixError> {
        self.response.store(self.encode()?);
        Ok(())
    }

    /// The bytes stored by the last [`write_response_data`], empty if it
    /// was never called.
    ///
    /// [`write_response_data`]: CostMatrix::write_response_data
    pub fn response_data(&self) -> Bytes {
        self.response.load()
    }

    /// Same as [`write_response_data`] for the compact encoding.
    ///
    /// [`write_response_data`]: CostMatrix::write_response_data
    pub fn write_response_data_binary(&self) -> Result<(), MatrixError> {
        self.binary_response.store(self.encode_binary()?);
        Ok(())
    }

    pub fn response_data_binary(&self) -> Bytes {
        self.binary_response.load()
    }

    fn encoded_size_hint(&self) -> usize {
        32 + self.topology.len() * 96 + self.costs.len() * 4
    }
}

impl PartialEq for CostMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.created_at == other.created_at
            && self.topology == other.topology
            && self.costs == other.costs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::topology::tests::topology;
    use rand_chacha::ChaChaRng;
    use rand_core::{Rng as _, SeedableRng as _};

    fn random_matrix(rng: &mut ChaChaRng, size: u64) -> CostMatrix {
        let topology = topology(size);
        let costs = (0..tri_matrix_length(topology.len()))
            .map(|_| (rng.next_u32() % (INVALID_ROUTE_COST as u32 + 2)) as i32 - 1)
            .collect();
        CostMatrix::new(topology, costs, rng.next_u64()).unwrap()
    }

    #[test]
    fn inconsistent_costs() {
        assert!(matches!(
            CostMatrix::new(topology(3), vec![1, 2], 0),
            Err(MatrixError::InconsistentLength {
                expected: 3,
                actual: 2,
                ..
            })
        ));
    }

    #[test]
    fn streamed() {
        let mut rng = ChaChaRng::seed_from_u64(42);
        for size in [0, 1, 2, 17] {
            let matrix = random_matrix(&mut rng, size);
            let decoded = CostMatrix::decode(&matrix.encode().unwrap()).unwrap();
            assert_eq!(decoded, matrix);
        }
    }

    #[test]
    fn compact() {
        let mut rng = ChaChaRng::seed_from_u64(42);
        for size in [0, 1, 2, 17] {
            let matrix = random_matrix(&mut rng, size);
            let decoded = CostMatrix::decode_binary(&matrix.encode_binary().unwrap()).unwrap();
            assert_eq!(decoded, matrix);
        }
    }

    #[test]
    fn formats_are_distinct() {
        let mut rng = ChaChaRng::seed_from_u64(7);
        let matrix = random_matrix(&mut rng, 4);
        let streamed = matrix.encode().unwrap();
        let compact = matrix.encode_binary().unwrap();

        assert_ne!(streamed, compact);
        assert!(CostMatrix::decode_binary(&streamed).is_err());
    }

    #[test]
    fn cost_above_invalid_route_value() {
        let mut costs = vec![10; 3];
        costs[1] = INVALID_ROUTE_COST + 1;
        let matrix = CostMatrix::new(topology(3), costs, 0).unwrap();

        assert!(matches!(
            matrix.encode(),
            Err(MatrixError::ValueOutOfRange { value: 10_001, .. })
        ));
        assert!(matrix.encode_binary().is_err());
        assert!(matrix.write_response_data().is_err());
        assert!(matrix.response_data().is_empty());
    }

    #[test]
    fn unknown_version() {
        let matrix = CostMatrix::new(topology(2), vec![5], 0).unwrap();

        let mut bytes = matrix.encode_binary().unwrap().to_vec();
        bytes[0] = 2;
        assert!(matches!(
            CostMatrix::decode_binary(&bytes),
            Err(MatrixError::UnsupportedVersion { version: 2 })
        ));

        let mut bytes = matrix.encode().unwrap().to_vec();
        bytes[0] = 0;
        assert!(matches!(
            CostMatrix::decode(&bytes),
            Err(MatrixError::UnsupportedVersion { version: 0 })
        ));
    }

    #[test]
    fn truncated_input() {
        let mut rng = ChaChaRng::seed_from_u64(42);
        let matrix = random_matrix(&mut rng, 5);
        let bytes = matrix.encode().unwrap();
        let compact = matrix.encode_binary().unwrap();

        for length in 0..bytes.len() {
            assert!(CostMatrix::decode(&bytes[..length]).is_err(), "{length}");
        }
        for length in 0..compact.len() {
            assert!(CostMatrix::decode_binary(&compact[..length]).is_err(), "{length}");
        }
    }

    #[test]
    fn trailing_bytes() {
        let matrix = CostMatrix::new(topology(3), vec![10, -1, 20], 7).unwrap();

        let mut bytes = matrix.encode().unwrap().to_vec();
        bytes.push(0);
        assert!(matches!(
            CostMatrix::decode(&bytes),
            Err(MatrixError::TrailingBytes { remaining: 1 })
        ));

        let mut compact = matrix.encode_binary().unwrap().to_vec();
        compact.extend_from_slice(&[0; 4]);
        assert!(matches!(
            CostMatrix::decode_binary(&compact),
            Err(MatrixError::TrailingBytes { remaining: 4 })
        ));
    }

    #[test]
    fn compact_layout() {
        let matrix = CostMatrix::new(topology(2), vec![42], 99).unwrap();
        let bytes = matrix.encode_binary().unwrap();

        assert_eq!(&bytes[0..4], &COST_MATRIX_V1.to_le_bytes());
        assert_eq!(&bytes[4..12], &99u64.to_le_bytes());
        assert_eq!(&bytes[12..14], &2u16.to_le_bytes());
        // relay 1: id then the address as text
        assert_eq!(&bytes[14..22], &1u64.to_le_bytes());
        let address = b"10.0.0.1:40000";
        assert_eq!(bytes[22] as usize, address.len());
        assert_eq!(&bytes[23..23 + address.len()], address);
        // costs come last
        assert_eq!(&bytes[bytes.len() - 8..bytes.len() - 4], &1u32.to_le_bytes());
        assert_eq!(&bytes[bytes.len() - 4..], &42i32.to_le_bytes());
    }

    #[test]
    fn response_cache() {
        let matrix = CostMatrix::new(topology(3), vec![1, 2, 3], 10).unwrap();
        assert!(matrix.response_data().is_empty());
        assert!(matrix.response_data_binary().is_empty());

        matrix.write_response_data().unwrap();
        matrix.write_response_data_binary().unwrap();

        assert_eq!(matrix.response_data(), matrix.encode().unwrap());
        assert_eq!(matrix.response_data_binary(), matrix.encode_binary().unwrap());
    }

    #[test]
    fn io() {
        let matrix = CostMatrix::new(topology(3), vec![1, -1, 3], 10).unwrap();
        let mut buffer = Vec::new();
        let written = matrix.write_to(&mut buffer).unwrap();
        assert_eq!(written, buffer.len());

        let read = CostMatrix::read_from(buffer.as_slice()).unwrap();
        assert_eq!(read, matrix);
        assert_eq!(read.relay_cost(RelayId::new(1), RelayId::new(3)), Some(-1));
        assert_eq!(read.cost(2, 2), None);
    }

    #[test]
    fn staleness() {
        let matrix = CostMatrix::new(topology(2), vec![1], 1_000).unwrap();
        assert!(!matrix.is_stale(Duration::from_secs(30), 1_030));
        assert!(matrix.is_stale(Duration::from_secs(30), 1_031));
    }
}
