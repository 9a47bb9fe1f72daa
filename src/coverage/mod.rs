pub mod raster;
pub mod wcs_client;

pub use raster::{average, RasterTile};
pub use wcs_client::{parse_coverage_ids, WcsClient};

use crate::error::Result;
use crate::models::{DepthInterval, SoilLayer};
use crate::utils::geodesy::BoundingBox;

/// Outcome of a coverage request that reached the service
#[derive(Debug, Clone, PartialEq)]
pub enum CoverageResponse {
    /// Encoded raster bytes as returned by the service
    Tile(Vec<u8>),
    /// The coverage identifier is not in the service catalog
    NotFound,
}

/// Source of soil coverage tiles (allows mocking in tests); [`WcsClient`] is the
/// production implementation
#[async_trait::async_trait]
pub trait CoverageSource: Send + Sync {
    async fn fetch(
        &self,
        layer: SoilLayer,
        depth: DepthInterval,
        bbox: &BoundingBox,
    ) -> Result<CoverageResponse>;
}
