use crate::models::Point;
use crate::utils::constants::{WGS84_SEMI_MAJOR_M, WGS84_SEMI_MINOR_M};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Geographic extent in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lon_min: f64,
    pub lat_min: f64,
    pub lon_max: f64,
    pub lat_max: f64,
}

impl BoundingBox {
    pub fn width(&self) -> f64 {
        self.lon_max - self.lon_min
    }

    pub fn height(&self) -> f64 {
        self.lat_max - self.lat_min
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.lon_min + self.lon_max) / 2.0,
            (self.lat_min + self.lat_max) / 2.0,
        )
    }

    /// Comma separated `lon_min,lat_min,lon_max,lat_max`, as coverage requests expect
    pub fn to_query_value(&self) -> String {
        format!(
            "{},{},{},{}",
            self.lon_min, self.lat_min, self.lon_max, self.lat_max
        )
    }
}

pub fn deg_to_rad(degrees: f64) -> f64 {
    degrees * PI / 180.0
}

pub fn rad_to_deg(radians: f64) -> f64 {
    radians * 180.0 / PI
}

/// Local earth radius in metres at a latitude given in radians
pub fn earth_radius(lat_rad: f64) -> f64 {
    let an = WGS84_SEMI_MAJOR_M * WGS84_SEMI_MAJOR_M * lat_rad.cos();
    let bn = WGS84_SEMI_MINOR_M * WGS84_SEMI_MINOR_M * lat_rad.sin();
    let ad = WGS84_SEMI_MAJOR_M * lat_rad.cos();
    let bd = WGS84_SEMI_MINOR_M * lat_rad.sin();

    ((an * an + bn * bn) / (ad * ad + bd * bd)).sqrt()
}

/// Box extending `radius_m` metres on each side of the point.
///
/// The longitudinal extent uses the radius of the parallel (`R cos(lat)`), so the
/// box widens in degrees as the point moves toward the poles.
pub fn bounding_box(point: &Point, radius_m: f64) -> BoundingBox {
    let lon_rad = deg_to_rad(point.longitude);
    let lat_rad = deg_to_rad(point.latitude);

    let radius = earth_radius(lat_rad);
    let parallel_radius = radius * lat_rad.cos();

    let lat_range = radius_m / radius;
    let lon_range = radius_m / parallel_radius;

    BoundingBox {
        lon_min: rad_to_deg(lon_rad - lon_range),
        lat_min: rad_to_deg(lat_rad - lat_range),
        lon_max: rad_to_deg(lon_rad + lon_range),
        lat_max: rad_to_deg(lat_rad + lat_range),
    }
}
