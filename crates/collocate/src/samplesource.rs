use geo::{PixelRect, RasterSize};

use crate::{Error, Result, SampleBuffer, SampleData};

/// Read access to the raw samples of the bands of a product.
///
/// Implementations must be safe for concurrent reads, tiles are computed in parallel.
pub trait SampleSource: Send + Sync {
    /// Reads the samples of `band` inside `rect`.
    /// Fails with `Error::GridContractViolation` when `rect` is not fully inside the grid of the product.
    fn read_window(&self, band: usize, rect: PixelRect) -> Result<SampleBuffer>;
}

/// Sample source for products that are fully held in memory
#[derive(Debug, Clone)]
pub struct MemorySampleSource {
    name: String,
    size: RasterSize,
    bands: Vec<(String, SampleData)>,
}

impl MemorySampleSource {
    pub fn new(name: impl Into<String>, size: RasterSize) -> Self {
        MemorySampleSource {
            name: name.into(),
            size,
            bands: Vec::new(),
        }
    }

    /// Adds a band, the samples are row-major and must cover the full grid
    pub fn add_band(&mut self, name: impl Into<String>, data: impl Into<SampleData>) -> Result<usize> {
        let name = name.into();
        let data = data.into();
        if data.len() != self.size.cell_count() {
            return Err(Error::InvalidArgument(format!(
                "Band '{name}' has {} samples, grid {} requires {}",
                data.len(),
                self.size,
                self.size.cell_count()
            )));
        }

        self.bands.push((name, data));
        Ok(self.bands.len() - 1)
    }

    pub fn with_band(mut self, name: impl Into<String>, data: impl Into<SampleData>) -> Result<Self> {
        self.add_band(name, data)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> RasterSize {
        self.size
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }
}

impl SampleSource for MemorySampleSource {
    fn read_window(&self, band: usize, rect: PixelRect) -> Result<SampleBuffer> {
        let (band_name, data) = self
            .bands
            .get(band)
            .ok_or_else(|| Error::InvalidArgument(format!("Product '{}' has no band with index {band}", self.name)))?;

        if !PixelRect::for_raster(self.size).contains(&rect) {
            return Err(Error::GridContractViolation {
                grid: self.name.clone(),
                band: band_name.clone(),
                rect,
                grid_size: self.size,
            });
        }

        SampleBuffer::new(rect, data.copy_window(self.size.cols, rect))
    }
}
