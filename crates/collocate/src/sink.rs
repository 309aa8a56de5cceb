use std::sync::Mutex;

use geo::{PixelRect, RasterSize};

use crate::{Error, Result};

/// Receives the computed tiles of the target bands.
///
/// Every tile of a band is delivered in a single call, tiles of different bands and different tiles
/// can be written concurrently.
pub trait TileSink: Send + Sync {
    /// `data` contains the row-major values of `rect` for the target band with index `target_band`
    fn write_tile(&self, target_band: usize, rect: PixelRect, data: &[f64]) -> Result<()>;
}

/// Collects the target bands in memory
#[derive(Debug)]
pub struct MemoryTileSink {
    size: RasterSize,
    bands: Vec<Mutex<Vec<f64>>>,
}

impl MemoryTileSink {
    /// Sink for `band_count` bands of the given size, pixels that are never written are NaN
    pub fn new(size: RasterSize, band_count: usize) -> Self {
        MemoryTileSink {
            size,
            bands: (0..band_count).map(|_| Mutex::new(vec![f64::NAN; size.cell_count()])).collect(),
        }
    }

    pub fn size(&self) -> RasterSize {
        self.size
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Copy of the values of a band, row-major
    pub fn band(&self, index: usize) -> Result<Vec<f64>> {
        let band = self
            .bands
            .get(index)
            .ok_or_else(|| Error::InvalidArgument(format!("Invalid band index: {index}")))?;

        Ok(band.lock().map_err(|e| Error::Runtime(format!("Band {index} is poisoned: {e}")))?.clone())
    }

    /// Consumes the sink, returning the values of all bands
    pub fn into_bands(self) -> Result<Vec<Vec<f64>>> {
        self.bands
            .into_iter()
            .map(|band| band.into_inner().map_err(|e| Error::Runtime(format!("Band is poisoned: {e}"))))
            .collect()
    }
}

impl TileSink for MemoryTileSink {
    fn write_tile(&self, target_band: usize, rect: PixelRect, data: &[f64]) -> Result<()> {
        if !PixelRect::for_raster(self.size).contains(&rect) {
            return Err(Error::InvalidArgument(format!("Tile {rect} is outside of the target raster {}", self.size)));
        }

        if data.len() != rect.pixel_count() {
            return Err(Error::InvalidArgument(format!(
                "Tile {rect} requires {} values, got {}",
                rect.pixel_count(),
                data.len()
            )));
        }

        let band = self
            .bands
            .get(target_band)
            .ok_or_else(|| Error::InvalidArgument(format!("Invalid band index: {target_band}")))?;

        let mut band = band
            .lock()
            .map_err(|e| Error::Runtime(format!("Band {target_band} is poisoned: {e}")))?;

        let width = rect.width as usize;
        for (tile_row, row) in data.chunks_exact(width).zip(rect.y..) {
            let start = row as usize * self.size.cols + rect.x as usize;
            band[start..start + width].copy_from_slice(tile_row);
        }

        Ok(())
    }
}
