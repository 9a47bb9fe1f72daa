use crate::utils::constants::DEFAULT_GEOHASH_PRECISION;
use crate::utils::geohash;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// A sampling location in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct Point {
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
}

impl Point {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(lon: {}, lat: {})", self.longitude, self.latitude)
    }
}

/// Stable geohash identity of a point.
///
/// Names every per-point file and replaces the solver's code in the record header.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationKey(String);

impl LocationKey {
    pub fn encode(point: &Point) -> Self {
        Self::encode_with_precision(point, DEFAULT_GEOHASH_PRECISION)
    }

    pub fn encode_with_precision(point: &Point, precision: usize) -> Self {
        Self(geohash::encode(point.latitude, point.longitude, precision))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Header code stamped into a solver record
    pub fn record_code(&self) -> String {
        format!("*{}", self.0)
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LocationKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_validation() {
        assert!(Point::new(-15.657, 16.107).validate().is_ok());
        assert!(Point::new(-15.657, 91.0).validate().is_err());
        assert!(Point::new(181.0, 0.0).validate().is_err());
    }

    #[test]
    fn test_location_key() {
        let point = Point::new(-15.657, 16.107);
        let key = LocationKey::encode(&point);

        assert_eq!(key.as_str(), "edugesnyj6");
        assert_eq!(key, LocationKey::encode(&point));
        assert_eq!(key.record_code(), "*edugesnyj6");
    }

    #[test]
    fn test_distant_points_have_distinct_keys() {
        let a = LocationKey::encode(&Point::new(-15.657, 16.107));
        let b = LocationKey::encode(&Point::new(-15.647, 16.107));
        let c = LocationKey::encode(&Point::new(-15.657, 16.117));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }
}
