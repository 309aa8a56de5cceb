use std::sync::Arc;

use crate::{GeoTransform, PixelRect, RasterSize};

/// A rectangular pixel grid with its geo-coding, shared by all bands of a product
#[derive(Clone)]
pub struct RasterGrid {
    size: RasterSize,
    transform: Arc<dyn GeoTransform>,
}

impl RasterGrid {
    pub fn new(size: RasterSize, transform: Arc<dyn GeoTransform>) -> Self {
        RasterGrid { size, transform }
    }

    pub fn size(&self) -> RasterSize {
        self.size
    }

    pub fn width(&self) -> usize {
        self.size.cols
    }

    pub fn height(&self) -> usize {
        self.size.rows
    }

    pub fn bounds(&self) -> PixelRect {
        PixelRect::for_raster(self.size)
    }

    pub fn transform(&self) -> &dyn GeoTransform {
        self.transform.as_ref()
    }
}

impl std::fmt::Debug for RasterGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RasterGrid{}", self.size)
    }
}
