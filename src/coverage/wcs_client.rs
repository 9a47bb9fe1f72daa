use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::{header, Client};
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use crate::config::Settings;
use crate::coverage::{CoverageResponse, CoverageSource};
use crate::error::{DotSolError, Result};
use crate::models::{DepthInterval, SoilLayer};
use crate::utils::constants::WCS_VERSION;
use crate::utils::geodesy::BoundingBox;

/// WCS 1.0.0 client for the SoilGrids map server.
///
/// Each soil layer is its own map file (`{coverage_url}{layer}.map`). A layer's
/// capability listing is fetched once per client, even under concurrent
/// requests, and reused for all of its depth intervals.
pub struct WcsClient {
    client: Client,
    coverage_url: String,
    crs: String,
    format: String,
    tile_size: u32,
    catalogs: Mutex<HashMap<SoilLayer, Arc<OnceCell<Arc<HashSet<String>>>>>>,
}

impl WcsClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.fetch_timeout_secs))
            .connect_timeout(Duration::from_secs(settings.fetch_timeout_secs.min(30)))
            .build()?;

        Ok(Self {
            client,
            coverage_url: settings.coverage_url.clone(),
            crs: settings.crs.clone(),
            format: settings.coverage_format.clone(),
            tile_size: settings.tile_size,
            catalogs: Mutex::new(HashMap::new()),
        })
    }

    fn service_url(&self, layer: SoilLayer) -> String {
        format!("{}{}.map", self.coverage_url, layer.provider_id())
    }

    /// Coverage identifiers the service offers for a layer
    pub async fn coverage_ids(&self, layer: SoilLayer) -> Result<Arc<HashSet<String>>> {
        let cell = {
            let mut catalogs = self
                .catalogs
                .lock()
                .map_err(|_| DotSolError::Coverage("capabilities cache poisoned".to_string()))?;
            catalogs.entry(layer).or_default().clone()
        };

        if let Some(ids) = cell.get() {
            debug!(%layer, "Capabilities cache hit");
            return Ok(ids.clone());
        }

        let ids = cell
            .get_or_try_init(|| self.fetch_capabilities(layer))
            .await?;
        Ok(ids.clone())
    }

    async fn fetch_capabilities(&self, layer: SoilLayer) -> Result<Arc<HashSet<String>>> {
        let xml = self
            .client
            .get(self.service_url(layer))
            .query(&[
                ("SERVICE", "WCS"),
                ("VERSION", WCS_VERSION),
                ("REQUEST", "GetCapabilities"),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let ids = parse_coverage_ids(&xml)?;
        debug!(%layer, coverages = ids.len(), "Capabilities cached");

        Ok(Arc::new(ids))
    }

    async fn get_coverage(
        &self,
        layer: SoilLayer,
        coverage_id: &str,
        bbox: &BoundingBox,
    ) -> Result<Vec<u8>> {
        let size = self.tile_size.to_string();
        let response = self
            .client
            .get(self.service_url(layer))
            .query(&[
                ("SERVICE", "WCS"),
                ("VERSION", WCS_VERSION),
                ("REQUEST", "GetCoverage"),
                ("COVERAGE", coverage_id),
                ("CRS", self.crs.as_str()),
                ("BBOX", bbox.to_query_value().as_str()),
                ("WIDTH", size.as_str()),
                ("HEIGHT", size.as_str()),
                ("FORMAT", self.format.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        // Map servers report request errors as XML with a 200 status
        let is_xml = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(false, |v| v.contains("xml"));
        if is_xml {
            let body = response.text().await?;
            return Err(DotSolError::Coverage(format!(
                "Service exception for '{}': {}",
                coverage_id,
                body.trim()
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait::async_trait]
impl CoverageSource for WcsClient {
    #[instrument(skip_all, fields(layer = %layer, depth = %depth))]
    async fn fetch(
        &self,
        layer: SoilLayer,
        depth: DepthInterval,
        bbox: &BoundingBox,
    ) -> Result<CoverageResponse> {
        let coverage_id = depth.coverage_id(layer);

        if !self.coverage_ids(layer).await?.contains(&coverage_id) {
            debug!(%coverage_id, "Coverage not offered by service");
            return Ok(CoverageResponse::NotFound);
        }

        let bytes = self.get_coverage(layer, &coverage_id, bbox).await?;
        Ok(CoverageResponse::Tile(bytes))
    }
}

/// Collect coverage identifiers from a capabilities document.
///
/// Understands WCS 1.0 (`CoverageOfferingBrief/name`) and WCS 2.0
/// (`CoverageSummary/CoverageId`) listings, with or without namespace prefixes.
pub fn parse_coverage_ids(xml: &str) -> Result<HashSet<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut ids = HashSet::new();
    let mut in_offering = false;
    let mut in_identifier = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"CoverageOfferingBrief" | b"CoverageSummary" => in_offering = true,
                b"name" | b"CoverageId" if in_offering => in_identifier = true,
                _ => {}
            },
            Event::Text(t) if in_identifier => {
                let id = t.unescape()?;
                if !id.trim().is_empty() {
                    ids.insert(id.trim().to_string());
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"CoverageOfferingBrief" | b"CoverageSummary" => in_offering = false,
                b"name" | b"CoverageId" => in_identifier = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WCS10_CAPABILITIES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<WCS_Capabilities xmlns="http://www.opengis.net/wcs" version="1.0.0">
  <Service><name>MapServer WCS</name><label>SoilGrids</label></Service>
  <ContentMetadata>
    <CoverageOfferingBrief>
      <name>clay_0-5cm_mean</name>
      <label>Clay content 0-5cm</label>
    </CoverageOfferingBrief>
    <CoverageOfferingBrief>
      <name>clay_5-15cm_mean</name>
      <label>Clay content 5-15cm</label>
    </CoverageOfferingBrief>
  </ContentMetadata>
</WCS_Capabilities>"#;

    #[test]
    fn test_parse_wcs10_capabilities() {
        let ids = parse_coverage_ids(WCS10_CAPABILITIES).unwrap();

        assert_eq!(ids.len(), 2);
        assert!(ids.contains("clay_0-5cm_mean"));
        assert!(ids.contains("clay_5-15cm_mean"));
        // The service name sits outside any offering
        assert!(!ids.contains("MapServer WCS"));
    }

    #[test]
    fn test_parse_prefixed_wcs20_capabilities() {
        let xml = r#"<wcs:Capabilities xmlns:wcs="http://www.opengis.net/wcs/2.0">
  <wcs:Contents>
    <wcs:CoverageSummary><wcs:CoverageId>soc_0-5cm_mean</wcs:CoverageId></wcs:CoverageSummary>
  </wcs:Contents>
</wcs:Capabilities>"#;
        let ids = parse_coverage_ids(xml).unwrap();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains("soc_0-5cm_mean"));
    }

    #[test]
    fn test_parse_empty_listing() {
        let ids = parse_coverage_ids("<WCS_Capabilities/>").unwrap();
        assert!(ids.is_empty());
    }
}
