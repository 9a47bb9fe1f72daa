use crate::utils::constants::{SENTINEL_NO_DATA, SENTINEL_UNAVAILABLE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Soil property served by the coverage provider.
///
/// Variants are declared in alphabetical order of their aliases, which is the
/// column order the solver reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SoilLayer {
    BulkDensity,
    Clay,
    OrganicSoil,
    SandFraction,
}

impl SoilLayer {
    pub const ALL: [SoilLayer; 4] = [
        SoilLayer::BulkDensity,
        SoilLayer::Clay,
        SoilLayer::OrganicSoil,
        SoilLayer::SandFraction,
    ];

    pub fn alias(&self) -> &'static str {
        match self {
            SoilLayer::BulkDensity => "bulkdensity",
            SoilLayer::Clay => "clay",
            SoilLayer::OrganicSoil => "organicsoil",
            SoilLayer::SandFraction => "sandfraction",
        }
    }

    /// Layer identifier on the SoilGrids map server
    pub fn provider_id(&self) -> &'static str {
        match self {
            SoilLayer::BulkDensity => "bdod",
            SoilLayer::Clay => "clay",
            SoilLayer::OrganicSoil => "soc",
            SoilLayer::SandFraction => "sand",
        }
    }

    pub fn from_alias(alias: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|layer| layer.alias() == alias)
    }
}

impl fmt::Display for SoilLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias())
    }
}

/// Depth range in centimetres
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepthInterval {
    pub top_cm: u32,
    pub bottom_cm: u32,
}

impl DepthInterval {
    pub const ALL: [DepthInterval; 6] = [
        DepthInterval::new(0, 5),
        DepthInterval::new(5, 15),
        DepthInterval::new(15, 30),
        DepthInterval::new(30, 60),
        DepthInterval::new(60, 100),
        DepthInterval::new(100, 200),
    ];

    pub const fn new(top_cm: u32, bottom_cm: u32) -> Self {
        Self { top_cm, bottom_cm }
    }

    pub fn thickness_cm(&self) -> u32 {
        self.bottom_cm - self.top_cm
    }

    /// Identifier of the mean coverage for a layer over this interval,
    /// e.g. `clay_0-5cm_mean`
    pub fn coverage_id(&self, layer: SoilLayer) -> String {
        format!(
            "{}_{}-{}cm_mean",
            layer.provider_id(),
            self.top_cm,
            self.bottom_cm
        )
    }

    /// Column and tile name keyed by interval thickness, e.g. `bdod_10cm_mean`
    pub fn column_name(&self, layer: SoilLayer) -> String {
        format!("{}_{}cm_mean", layer.provider_id(), self.thickness_cm())
    }
}

impl fmt::Display for DepthInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}cm", self.top_cm, self.bottom_cm)
    }
}

/// Aggregated value of one coverage tile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RasterValue {
    Measured(f64),
    /// Tile retrieved but every pixel was no-data
    NoData,
    /// Layer missing from the catalog or the tile could not be retrieved
    Unavailable,
}

impl RasterValue {
    pub fn is_measured(&self) -> bool {
        matches!(self, RasterValue::Measured(_))
    }

    pub fn measured(&self) -> Option<f64> {
        match self {
            RasterValue::Measured(v) => Some(*v),
            _ => None,
        }
    }

    /// Apply `f` to a measured value; sentinels pass through untouched
    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            RasterValue::Measured(v) => RasterValue::Measured(f(v)),
            other => other,
        }
    }

    /// Numeric form written to sample records
    pub fn to_output(&self) -> f64 {
        match self {
            RasterValue::Measured(v) => *v,
            RasterValue::NoData => SENTINEL_NO_DATA,
            RasterValue::Unavailable => SENTINEL_UNAVAILABLE,
        }
    }
}

impl fmt::Display for RasterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterValue::Measured(v) => write!(f, "{}", v),
            RasterValue::NoData => write!(f, "no data ({})", SENTINEL_NO_DATA),
            RasterValue::Unavailable => write!(f, "unavailable ({})", SENTINEL_UNAVAILABLE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layers_are_alphabetical_by_alias() {
        let aliases: Vec<&str> = SoilLayer::ALL.iter().map(|l| l.alias()).collect();
        let mut sorted = aliases.clone();
        sorted.sort();
        assert_eq!(aliases, sorted);
        assert_eq!(SoilLayer::from_alias("organicsoil"), Some(SoilLayer::OrganicSoil));
        assert_eq!(SoilLayer::from_alias("silt"), None);
    }

    #[test]
    fn test_coverage_and_column_names() {
        let depth = DepthInterval::ALL[1];
        assert_eq!(depth.coverage_id(SoilLayer::BulkDensity), "bdod_5-15cm_mean");
        assert_eq!(depth.column_name(SoilLayer::BulkDensity), "bdod_10cm_mean");
        assert_eq!(
            DepthInterval::ALL[5].coverage_id(SoilLayer::OrganicSoil),
            "soc_100-200cm_mean"
        );
    }

    #[test]
    fn test_raster_value_output() {
        assert_eq!(RasterValue::Measured(12.5).to_output(), 12.5);
        assert_eq!(RasterValue::NoData.to_output(), -89.0);
        assert_eq!(RasterValue::Unavailable.to_output(), -99.0);
    }

    #[test]
    fn test_map_leaves_sentinels_alone() {
        assert_eq!(
            RasterValue::Measured(150.0).map(|v| v / 100.0),
            RasterValue::Measured(1.5)
        );
        assert_eq!(RasterValue::Unavailable.map(|v| v / 100.0), RasterValue::Unavailable);
        assert_eq!(RasterValue::NoData.map(|v| v / 100.0), RasterValue::NoData);
    }
}
