use super::encoding::{MatrixError, MatrixReader, MatrixWriter};
use crate::{
    defaults::MAX_RELAY_NAME_LENGTH,
    relay::{Relay, RelayId},
};
use std::collections::HashMap;

/// smallest encoded relay: id, empty address, empty name, lat, lon, datacenter
const MIN_ENCODED_RELAY: usize = 8 + 1 + 4 + 4 + 4 + 8;

/// The relays of a matrix, indexed `0..n`
///
/// The index of a relay in the topology is the index used by the
/// triangular arrays of the matrix built on top of it.
///
/// ```
/// # use nextroute_core::{Relay, RelayId, Topology, relay::UNSPECIFIED_ADDRESS};
/// let topology = Topology::new(vec![
///     Relay::new(RelayId::new(10), UNSPECIFIED_ADDRESS, "a").with_datacenter(7),
///     Relay::new(RelayId::new(20), UNSPECIFIED_ADDRESS, "b").with_datacenter(7),
/// ])
/// .unwrap();
///
/// assert_eq!(topology.relay_index(RelayId::new(20)), Some(1));
/// assert_eq!(topology.datacenter_relay_ids(7), [RelayId::new(10), RelayId::new(20)]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    relays: Vec<Relay>,
    indices: HashMap<RelayId, usize>,
}

impl Topology {
    pub fn new(relays: Vec<Relay>) -> Result<Self, MatrixError> {
        let mut indices = HashMap::with_capacity(relays.len());

        for (index, relay) in relays.iter().enumerate() {
            if indices.insert(relay.id, index).is_some() {
                return Err(MatrixError::DuplicateRelay { id: relay.id });
            }
        }

        Ok(Self { relays, indices })
    }

    pub fn len(&self) -> usize {
        self.relays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relays.is_empty()
    }

    pub fn relays(&self) -> &[Relay] {
        &self.relays
    }

    pub fn relay(&self, index: usize) -> Option<&Relay> {
        self.relays.get(index)
    }

    pub fn relay_index(&self, id: RelayId) -> Option<usize> {
        self.indices.get(&id).copied()
    }

    pub fn relay_ids(&self) -> impl Iterator<Item = RelayId> + '_ {
        self.relays.iter().map(|relay| relay.id)
    }

    /// Datacenter of every relay, by index.
    pub fn datacenters(&self) -> Vec<u64> {
        self.relays.iter().map(|relay| relay.datacenter).collect()
    }

    /// Ids of the relays hosted in `datacenter`, in index order.
    pub fn datacenter_relay_ids(&self, datacenter: u64) -> Vec<RelayId> {
        self.relays
            .iter()
            .filter(|relay| relay.datacenter == datacenter)
            .map(|relay| relay.id)
            .collect()
    }

    pub(crate) fn encode(&self, writer: &mut MatrixWriter) -> Result<(), MatrixError> {
        writer.put_count("relay count", self.relays.len())?;

        for relay in &self.relays {
            writer.put_u64(relay.id.into_u64());
            writer.put_address(&relay.address);
            writer.put_string(&relay.name, MAX_RELAY_NAME_LENGTH)?;
            writer.put_f32(relay.latitude);
            writer.put_f32(relay.longitude);
            writer.put_u64(relay.datacenter);
        }

        Ok(())
    }

    pub(crate) fn decode(reader: &mut MatrixReader<'_>) -> Result<Self, MatrixError> {
        let count = reader.get_count(MIN_ENCODED_RELAY)?;

        let mut relays = Vec::with_capacity(count);
        for _ in 0..count {
            relays.push(Relay {
                id: RelayId::new(reader.get_u64()?),
                address: reader.get_address()?,
                name: reader.get_string(MAX_RELAY_NAME_LENGTH)?,
                latitude: reader.get_f32()?,
                longitude: reader.get_f32()?,
                datacenter: reader.get_u64()?,
            });
        }

        Self::new(relays)
    }
}
