use crate::defaults::{EARTH_RADIUS_KM, SPEED_OF_LIGHT_KM_PER_SEC};
use anyhow::{Context as _, anyhow, ensure};
use std::{fmt, str::FromStr};
use thiserror::Error;

const DEGREE_SUFFIX: &str = "º";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("latitude out of range [-90, 90]: {value}")]
    InvalidLatitude { value: f64 },
    #[error("longitude out of range [-180, 180]: {value}")]
    InvalidLongitude { value: f64 },
    #[error("coordinate is not a finite number")]
    NonFinite,
}

/// A point on earth, in decimal degrees.
///
/// ```
/// use nextroute_core::geo::Location;
///
/// let los_angeles = Location::from_degrees(34.0522, -118.2437).unwrap();
/// assert_eq!(los_angeles.truncated(), Location::from_degrees(34.0, -118.0).unwrap());
///
/// let parsed: Location = "34.0522, -118.2437".parse().unwrap();
/// assert_eq!(parsed, los_angeles);
/// assert_eq!(parsed.to_string(), "34.0522º, -118.2437º");
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    latitude: f64,
    longitude: f64,
}

impl Location {
    pub fn from_degrees(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(GeoError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::InvalidLatitude { value: latitude });
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::InvalidLongitude { value: longitude });
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Drops the fractional part of both coordinates.
    ///
    /// Truncating towards zero keeps the location in range.
    pub fn truncated(self) -> Self {
        Self {
            latitude: self.latitude.trunc(),
            longitude: self.longitude.trunc(),
        }
    }

    /// Great circle distance to `other`, in kilometres.
    pub fn distance_km(self, other: Self) -> f64 {
        haversine_distance_km(self, other)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.4}{DEGREE_SUFFIX}, {:.4}{DEGREE_SUFFIX}",
            self.latitude, self.longitude
        )
    }
}

fn parse_coordinate_degrees(s: &str) -> anyhow::Result<f64> {
    let trimmed = s.trim().trim_end_matches(DEGREE_SUFFIX).trim();
    ensure!(!trimmed.is_empty(), "empty coordinate");
    trimmed
        .parse()
        .map_err(|error| anyhow!("invalid coordinate `{trimmed}': {error}"))
}

impl FromStr for Location {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((latitude, longitude)) = s.split_once(',') else {
            return Err(anyhow!(
                "Failed to parse Location: expected format `<latitude>, <longitude>`"
            ));
        };
        ensure!(
            !longitude.contains(','),
            "Failed to parse Location: expected a single comma separator"
        );

        let latitude =
            parse_coordinate_degrees(latitude).context("Failed to parse Location latitude")?;
        let longitude =
            parse_coordinate_degrees(longitude).context("Failed to parse Location longitude")?;

        Self::from_degrees(latitude, longitude)
            .map_err(|error| anyhow!("Failed to parse Location: {error}"))
    }
}

/// Haversine distance between two locations, in kilometres, on a sphere
/// of radius [`EARTH_RADIUS_KM`].
///
/// ```
/// # use nextroute_core::geo::{Location, haversine_distance_km};
/// let a = Location::from_degrees(0.0, 0.0).unwrap();
/// let b = Location::from_degrees(0.0, 1.0).unwrap();
/// let d = haversine_distance_km(a, b);
/// assert!((d - 111.195).abs() < 0.001);
/// ```
pub fn haversine_distance_km(a: Location, b: Location) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lat = lat2 - lat1;
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let lat_sine = (delta_lat / 2.0).sin();
    let lon_sine = (delta_lon / 2.0).sin();
    let h = lat_sine * lat_sine + lat1.cos() * lat2.cos() * lon_sine * lon_sine;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Time, in milliseconds, light takes to travel `distance_km`.
pub fn speed_of_light_ms(distance_km: f64) -> f64 {
    distance_km / SPEED_OF_LIGHT_KM_PER_SEC * 1_000.0
}

/// Time, in milliseconds, light takes to travel from `a` to `c` through
/// `b`, following great circles.
pub fn speed_of_light_time_ms(a: Location, b: Location, c: Location) -> f64 {
    speed_of_light_ms(haversine_distance_km(a, b) + haversine_distance_km(b, c))
}
