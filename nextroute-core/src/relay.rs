use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    str,
};

/// Address used for relays that have no known public address.
pub const UNSPECIFIED_ADDRESS: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0));

/// The identifier of a relay in the fleet
///
/// Identifiers are stable across matrices, unlike the fleet relative
/// index a relay gets inside a given [`Topology`].
///
/// ```
/// # use nextroute_core::RelayId;
/// let id: RelayId = "0x2a".parse().unwrap();
/// assert_eq!(id, RelayId::new(42));
/// assert_eq!(format!("{id:016x}"), "000000000000002a");
/// ```
///
/// [`Topology`]: crate::matrix::Topology
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(C)]
pub struct RelayId(u64);

impl RelayId {
    pub const ZERO: Self = RelayId::new(0);
    pub const ONE: Self = RelayId::new(1);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn into_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for RelayId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl str::FromStr for RelayId {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => s.parse(),
        };
        parsed
            .map(Self)
            .map_err(|error| anyhow!("Invalid relay id `{s}': {error}"))
    }
}

impl fmt::Display for RelayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl fmt::LowerHex for RelayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl fmt::UpperHex for RelayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One relay of a topology snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Relay {
    pub id: RelayId,
    /// external address, [`UNSPECIFIED_ADDRESS`] when unknown
    pub address: SocketAddr,
    /// display name, at most [`MAX_RELAY_NAME_LENGTH`] bytes once encoded
    ///
    /// [`MAX_RELAY_NAME_LENGTH`]: crate::defaults::MAX_RELAY_NAME_LENGTH
    pub name: String,
    pub latitude: f32,
    pub longitude: f32,
    pub datacenter: u64,
}

impl Relay {
    pub fn new(id: RelayId, address: SocketAddr, name: impl Into<String>) -> Self {
        Self {
            id,
            address,
            name: name.into(),
            latitude: 0.0,
            longitude: 0.0,
            datacenter: 0,
        }
    }

    pub fn with_location(mut self, latitude: f32, longitude: f32) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }

    pub fn with_datacenter(mut self, datacenter: u64) -> Self {
        self.datacenter = datacenter;
        self
    }
}
