use crate::error::{DotSolError, Result};
use crate::models::RasterValue;
use crate::utils::constants::RASTER_NO_DATA;
use crate::utils::numeric::round2;
use std::io::Cursor;
use tiff::decoder::{Decoder, DecodingResult};

/// First band of a decoded coverage tile
#[derive(Debug, Clone, PartialEq)]
pub struct RasterTile {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<f64>,
}

impl RasterTile {
    pub fn new(width: u32, height: u32, pixels: Vec<f64>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Decode a TIFF/GeoTIFF tile. Multi-sample images keep only the first band.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut decoder = Decoder::new(Cursor::new(bytes))?;
        let (width, height) = decoder.dimensions()?;

        let pixels: Vec<f64> = match decoder.read_image()? {
            DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::U64(v) => v.into_iter().map(|p| p as f64).collect(),
            DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::I64(v) => v.into_iter().map(|p| p as f64).collect(),
            DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::F64(v) => v,
        };

        let pixel_count = width as usize * height as usize;
        if pixel_count == 0 || pixels.len() % pixel_count != 0 {
            return Err(DotSolError::InvalidFormat(format!(
                "Tile of {}x{} has {} samples",
                width,
                height,
                pixels.len()
            )));
        }

        let bands = pixels.len() / pixel_count;
        let pixels = if bands > 1 {
            pixels.into_iter().step_by(bands).collect()
        } else {
            pixels
        };

        Ok(Self::new(width, height, pixels))
    }
}

/// Mean of the valid pixels of a tile, rounded to 2 decimals.
///
/// Pixels equal to the no-data value (255) are ignored; a tile with no valid
/// pixel left (including an empty tile) is `NoData`.
pub fn average(tile: &RasterTile) -> RasterValue {
    let (sum, count) = tile
        .pixels
        .iter()
        .filter(|&&p| p != RASTER_NO_DATA)
        .fold((0.0, 0usize), |(sum, count), &p| (sum + p, count + 1));

    if count == 0 {
        RasterValue::NoData
    } else {
        RasterValue::Measured(round2(sum / count as f64))
    }
}
