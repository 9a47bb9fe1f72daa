use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::coverage::{average, CoverageResponse, CoverageSource, RasterTile};
use crate::error::Result;
use crate::models::{
    DepthInterval, LocationKey, Point, RasterValue, SampleRecord, SampleRecordBuilder, SoilLayer,
};
use crate::utils::constants::{TILES_DIR, TILE_EXTENSION};
use crate::utils::filename::sample_file_name;
use crate::utils::geodesy::{bounding_box, BoundingBox};
use crate::writers::SampleWriter;

/// Samples every soil layer at every depth interval around a point
pub struct SoilPropertySampler {
    source: Arc<dyn CoverageSource>,
    radius_m: f64,
    fetch_timeout: Duration,
    concurrency: usize,
    writer: SampleWriter,
}

impl SoilPropertySampler {
    pub fn new(source: Arc<dyn CoverageSource>, settings: &Settings) -> Self {
        Self {
            source,
            radius_m: settings.bbox_radius_m,
            fetch_timeout: Duration::from_secs(settings.fetch_timeout_secs),
            concurrency: settings.fetch_concurrency.max(1),
            writer: SampleWriter::new().with_layout(settings.sample_layout),
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Fetch and aggregate all layer/depth pairs.
    ///
    /// Retrieved tiles are kept under `arena/tiles` until the arena is cleaned up.
    /// Requests may complete in any order; values are assembled in layer then
    /// depth order.
    pub async fn sample(&self, point: &Point, key: &LocationKey, arena: &Path) -> Result<SampleRecord> {
        let bbox = bounding_box(point, self.radius_m);
        let tiles_dir = arena.join(TILES_DIR);
        tokio::fs::create_dir_all(&tiles_dir).await?;

        let requests: Vec<(SoilLayer, DepthInterval)> = SoilLayer::ALL
            .iter()
            .flat_map(|layer| DepthInterval::ALL.iter().map(move |depth| (*layer, *depth)))
            .collect();

        let values: Vec<RasterValue> = stream::iter(requests)
            .map(|(layer, depth)| self.sample_value(layer, depth, &bbox, &tiles_dir))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut builder = SampleRecordBuilder::new(key.clone(), *point);
        for (layer, profile) in SoilLayer::ALL
            .iter()
            .zip(values.chunks(DepthInterval::ALL.len()))
        {
            builder = builder.layer(*layer, profile.to_vec());
        }

        builder.build()
    }

    /// Write the record as `sample_asc_{key}.csv` inside the arena
    pub fn persist(&self, record: &SampleRecord, arena: &Path) -> Result<PathBuf> {
        let path = arena.join(sample_file_name(record.key.as_str()));
        self.writer.write_record(record, &path)?;
        debug!(path = %path.display(), "Sample record written");
        Ok(path)
    }

    async fn sample_value(
        &self,
        layer: SoilLayer,
        depth: DepthInterval,
        bbox: &BoundingBox,
        tiles_dir: &Path,
    ) -> RasterValue {
        let value = match timeout(self.fetch_timeout, self.source.fetch(layer, depth, bbox)).await
        {
            Ok(Ok(CoverageResponse::Tile(bytes))) => {
                self.aggregate(layer, depth, &bytes, tiles_dir).await
            }
            Ok(Ok(CoverageResponse::NotFound)) => {
                info!(
                    coverage = %depth.coverage_id(layer),
                    "Could not find a layer that matches"
                );
                RasterValue::Unavailable
            }
            Ok(Err(e)) => {
                warn!(%layer, %depth, error = %e, "Coverage request failed");
                RasterValue::Unavailable
            }
            Err(_) => {
                warn!(
                    %layer,
                    %depth,
                    timeout_secs = self.fetch_timeout.as_secs(),
                    "Coverage request timed out"
                );
                RasterValue::Unavailable
            }
        };

        debug!("Evaluating {} at {} ==> {}", layer, depth, value);
        value
    }

    async fn aggregate(
        &self,
        layer: SoilLayer,
        depth: DepthInterval,
        bytes: &[u8],
        tiles_dir: &Path,
    ) -> RasterValue {
        let tile_path = tiles_dir.join(format!("{}.{}", depth.column_name(layer), TILE_EXTENSION));
        if let Err(e) = tokio::fs::write(&tile_path, bytes).await {
            warn!(path = %tile_path.display(), error = %e, "Could not keep tile");
        }

        match RasterTile::decode(bytes) {
            Ok(tile) => average(&tile),
            Err(e) => {
                warn!(%layer, %depth, error = %e, "Coverage tile could not be decoded");
                RasterValue::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DotSolError;
    use std::io::Cursor;
    use tempfile::TempDir;
    use tiff::encoder::{colortype, TiffEncoder};

    fn gray16_tile(value: u16) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        TiffEncoder::new(&mut cursor)
            .unwrap()
            .write_image::<colortype::Gray16>(8, 8, &[value; 64])
            .unwrap();
        cursor.into_inner()
    }

    /// Serves a fixed pixel value per layer; `soc` is missing from the catalog
    /// and the deepest sand interval errors.
    struct LayeredSource;

    #[async_trait::async_trait]
    impl CoverageSource for LayeredSource {
        async fn fetch(
            &self,
            layer: SoilLayer,
            depth: DepthInterval,
            _bbox: &BoundingBox,
        ) -> Result<CoverageResponse> {
            match layer {
                SoilLayer::BulkDensity => Ok(CoverageResponse::Tile(gray16_tile(150))),
                SoilLayer::Clay => Ok(CoverageResponse::Tile(gray16_tile(255))),
                SoilLayer::OrganicSoil => Ok(CoverageResponse::NotFound),
                SoilLayer::SandFraction if depth.top_cm == 100 => {
                    Err(DotSolError::Coverage("connection reset".to_string()))
                }
                SoilLayer::SandFraction => Ok(CoverageResponse::Tile(gray16_tile(700))),
            }
        }
    }

    struct StalledSource;

    #[async_trait::async_trait]
    impl CoverageSource for StalledSource {
        async fn fetch(
            &self,
            _layer: SoilLayer,
            _depth: DepthInterval,
            _bbox: &BoundingBox,
        ) -> Result<CoverageResponse> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(CoverageResponse::NotFound)
        }
    }

    fn test_settings(root: &Path) -> Settings {
        Settings::rooted_at(root)
    }

    #[tokio::test]
    async fn test_sample_maps_outcomes_to_values() -> Result<()> {
        let arena = TempDir::new()?;
        let sampler = SoilPropertySampler::new(Arc::new(LayeredSource), &test_settings(arena.path()));
        let point = Point::new(-15.657, 16.107);
        let key = LocationKey::encode(&point);

        let record = sampler.sample(&point, &key, arena.path()).await?;

        assert_eq!(record.values(SoilLayer::BulkDensity), &[RasterValue::Measured(1.5); 6]);
        assert_eq!(record.values(SoilLayer::Clay), &[RasterValue::NoData; 6]);
        assert_eq!(record.values(SoilLayer::OrganicSoil), &[RasterValue::Unavailable; 6]);

        let sand = record.values(SoilLayer::SandFraction);
        assert_eq!(&sand[..5], &[RasterValue::Measured(700.0); 5]);
        assert_eq!(sand[5], RasterValue::Unavailable);

        // Tiles are kept for every retrieved coverage: 6 bdod + 6 clay + 5 sand
        let tiles = std::fs::read_dir(arena.path().join(TILES_DIR))?.count();
        assert_eq!(tiles, 17);
        assert!(arena.path().join(TILES_DIR).join("bdod_10cm_mean.tif").exists());

        Ok(())
    }

    #[tokio::test]
    async fn test_timeout_counts_as_unavailable() -> Result<()> {
        let arena = TempDir::new()?;
        let sampler = SoilPropertySampler::new(Arc::new(StalledSource), &test_settings(arena.path()))
            .with_fetch_timeout(Duration::from_millis(20));
        let point = Point::new(10.0, 50.0);

        let record = sampler
            .sample(&point, &LocationKey::encode(&point), arena.path())
            .await?;

        for layer in SoilLayer::ALL {
            assert_eq!(record.values(layer), &[RasterValue::Unavailable; 6]);
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_persist_names_file_by_key() -> Result<()> {
        let arena = TempDir::new()?;
        let sampler = SoilPropertySampler::new(Arc::new(LayeredSource), &test_settings(arena.path()));
        let point = Point::new(-15.657, 16.107);
        let key = LocationKey::encode(&point);

        let record = sampler.sample(&point, &key, arena.path()).await?;
        let path = sampler.persist(&record, arena.path())?;

        assert_eq!(path, arena.path().join("sample_asc_edugesnyj6.csv"));
        let content = std::fs::read_to_string(&path)?;
        assert!(content.starts_with("bdod_5cm_mean\tbdod_10cm_mean\t"));

        Ok(())
    }
}
