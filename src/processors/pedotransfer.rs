use crate::utils::numeric::round2;
use serde::Serialize;

/// Normalised Saxton-Rawls regression inputs from percentages on a 0-100 scale.
///
/// Organic matter in percent, clay and sand as fractions. The carbon-to-matter
/// step is an identity (`2 * oc / 2`); the intended factor is unconfirmed.
fn regression_inputs(clay: f64, oc: f64, sand: f64) -> (f64, f64, f64) {
    let om = 2.0 * oc / 2.0;
    (clay / 100.0, om, sand / 100.0)
}

/// Volumetric water content at field capacity (-33 kPa)
pub fn field_capacity(clay: f64, oc: f64, sand: f64) -> f64 {
    let (clay, om, sand) = regression_inputs(clay, oc, sand);

    let theta_33_t = 0.299 - 0.251 * sand + 0.195 * clay + 0.011 * om + 0.006 * sand * om
        - 0.027 * clay * om
        + 0.452 * sand * clay;

    let theta_33 = theta_33_t + (1.283 * theta_33_t * theta_33_t - 0.374 * theta_33_t - 0.015);

    round2(theta_33)
}

/// Volumetric water content at permanent wilting point (-1500 kPa)
pub fn permanent_wilting_point(clay: f64, oc: f64, sand: f64) -> f64 {
    let (clay, om, sand) = regression_inputs(clay, oc, sand);

    let theta_1500_t = 0.031 - 0.024 * sand + 0.487 * clay + 0.006 * om + 0.005 * sand * om
        - 0.013 * clay * om
        + 0.068 * sand * clay;

    round2(1.14 * theta_1500_t - 0.02)
}

/// Both retention points for one soil texture
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaterRetention {
    pub field_capacity: f64,
    pub permanent_wilting_point: f64,
}

impl WaterRetention {
    pub fn from_texture(clay: f64, oc: f64, sand: f64) -> Self {
        Self {
            field_capacity: field_capacity(clay, oc, sand),
            permanent_wilting_point: permanent_wilting_point(clay, oc, sand),
        }
    }

    /// Plant-available water between the two retention points
    pub fn available_water(&self) -> f64 {
        round2(self.field_capacity - self.permanent_wilting_point)
    }
}
