use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{DotSolError, Result};
use crate::models::{DepthInterval, LocationKey, Point, RasterValue, SoilLayer};
use crate::utils::constants::{BULK_DENSITY_SCALE, PROFILE_DEPTH_CM};
use crate::utils::numeric::{format_float, round2};

/// Arrangement of the tab-separated sample file handed to the solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleLayout {
    /// One row, one column per layer and depth interval
    #[default]
    Wide,
    /// One row per depth interval, one column per layer alias
    Profile,
}

/// Sampled soil properties for one point, ready for the solver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRecord {
    pub key: LocationKey,
    pub point: Point,
    pub depth_cm: u32,
    /// Values per layer in `DepthInterval::ALL` order, unit-converted and rounded
    pub profiles: BTreeMap<SoilLayer, Vec<RasterValue>>,
}

impl SampleRecord {
    pub fn values(&self, layer: SoilLayer) -> &[RasterValue] {
        self.profiles.get(&layer).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn column_count(&self, layout: SampleLayout) -> usize {
        self.header(layout).len()
    }

    pub fn header(&self, layout: SampleLayout) -> Vec<String> {
        let mut columns: Vec<String> = match layout {
            SampleLayout::Wide => SoilLayer::ALL
                .iter()
                .flat_map(|layer| {
                    DepthInterval::ALL
                        .iter()
                        .map(move |depth| depth.column_name(*layer))
                })
                .collect(),
            SampleLayout::Profile => SoilLayer::ALL
                .iter()
                .map(|layer| layer.alias().to_string())
                .collect(),
        };
        columns.extend(["Latitude", "Longitude", "Depth"].map(String::from));
        columns
    }

    pub fn rows(&self, layout: SampleLayout) -> Vec<Vec<String>> {
        match layout {
            SampleLayout::Wide => {
                let mut row: Vec<String> = SoilLayer::ALL
                    .iter()
                    .flat_map(|layer| self.values(*layer).iter())
                    .map(|value| format_float(value.to_output()))
                    .collect();
                row.extend(self.metadata_fields());
                vec![row]
            }
            SampleLayout::Profile => (0..DepthInterval::ALL.len())
                .map(|i| {
                    let mut row: Vec<String> = SoilLayer::ALL
                        .iter()
                        .map(|layer| format_float(self.values(*layer)[i].to_output()))
                        .collect();
                    row.extend(self.metadata_fields());
                    row
                })
                .collect(),
        }
    }

    fn metadata_fields(&self) -> [String; 3] {
        [
            format_float(self.point.latitude),
            format_float(self.point.longitude),
            self.depth_cm.to_string(),
        ]
    }
}

pub struct SampleRecordBuilder {
    key: LocationKey,
    point: Point,
    profiles: BTreeMap<SoilLayer, Vec<RasterValue>>,
}

impl SampleRecordBuilder {
    pub fn new(key: LocationKey, point: Point) -> Self {
        Self {
            key,
            point,
            profiles: BTreeMap::new(),
        }
    }

    /// Raw aggregated values for one layer, in depth order
    pub fn layer(mut self, layer: SoilLayer, values: Vec<RasterValue>) -> Self {
        self.profiles.insert(layer, values);
        self
    }

    /// Convert bulk density to g/cm3 and round every measured value to 2 decimals
    pub fn build(self) -> Result<SampleRecord> {
        let mut profiles = BTreeMap::new();

        for layer in SoilLayer::ALL {
            let values = self.profiles.get(&layer).ok_or_else(|| {
                DotSolError::InvalidFormat(format!("Sample is missing layer '{}'", layer))
            })?;

            if values.len() != DepthInterval::ALL.len() {
                return Err(DotSolError::InvalidFormat(format!(
                    "Layer '{}' has {} values, expected {}",
                    layer,
                    values.len(),
                    DepthInterval::ALL.len()
                )));
            }

            let normalized = values
                .iter()
                .map(|value| match layer {
                    SoilLayer::BulkDensity => value.map(|v| round2(v / BULK_DENSITY_SCALE)),
                    _ => value.map(round2),
                })
                .collect();
            profiles.insert(layer, normalized);
        }

        Ok(SampleRecord {
            key: self.key,
            point: self.point,
            depth_cm: PROFILE_DEPTH_CM,
            profiles,
        })
    }
}
