use std::time::Duration;

/// Sentinel used for any metric that has no usable measurement.
///
/// It is larger than any plausible round trip time so that it always
/// compares as worse than a real measurement.
///
/// ```
/// # use nextroute_core::defaults::*;
/// assert_eq!(INVALID_ROUTE_VALUE as i32, INVALID_ROUTE_COST);
/// ```
pub const INVALID_ROUTE_VALUE: f32 = 10_000.0;

/// [`INVALID_ROUTE_VALUE`] as the upper bound of an encoded cost.
pub const INVALID_ROUTE_COST: i32 = 10_000;

/// Cost of a relay pair that cannot be routed.
pub const NO_ROUTE_COST: i32 = -1;

/// Number of samples kept per metric and per directed relay pair
///
/// Relays report once per second, this is five minutes of history.
pub const HISTORY_SIZE: usize = 300;

/// Maximum number of candidate routes kept for one relay pair.
pub const MAX_ROUTES_PER_ENTRY: usize = 16;

/// Maximum number of relays in one route.
pub const MAX_RELAYS_PER_ROUTE: usize = 5;

/// Maximum length, in bytes, of a relay display name.
pub const MAX_RELAY_NAME_LENGTH: usize = 63;

/// Speed of light in vacuum, in kilometres per second.
pub const SPEED_OF_LIGHT_KM_PER_SEC: f64 = 299_792.458;

/// Mean radius of the earth used by the haversine formula, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Near relays further than this from the source are not considered
/// during the source side pass.
pub const DEFAULT_NEAR_RELAY_MAX_DISTANCE_KM: i64 = 2500;

/// Extra latency, in milliseconds, a near relay may add on top of the
/// direct latency.
pub const DEFAULT_NEAR_RELAY_LATENCY_THRESHOLD_MS: f32 = 30.0;

/// Factor applied to the speed of light bound through a near relay.
pub const DEFAULT_NEAR_RELAY_LATENCY_SCALE: f32 = 1.5;

/// Default age after which a published matrix is no longer trusted.
///
/// ```
/// # use nextroute_core::defaults::*;
/// assert_eq!(DEFAULT_STALE_DURATION.as_secs(), 30);
/// ```
pub const DEFAULT_STALE_DURATION: Duration = Duration::from_secs(30);
