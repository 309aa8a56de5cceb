use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use geo::{AffineGeoTransform, PixelRect, Point, RasterGrid, RasterSize, SampleNum, TiePointGeoTransform};

use crate::{BandDescriptor, MemorySampleSource, Result, SampleBuffer, SampleData, SampleSource, SourceProduct};

pub const NOD: f64 = -1.0;

pub fn number_cast<T: SampleNum>(val: f64) -> T {
    num::NumCast::from(val).expect("F64 could not be converted to the specified type")
}

/// Grid in geographic coordinates with square cells, `left`/`top` is the top left corner of the grid
pub fn degree_grid_with_cell_size(size: RasterSize, left: f64, top: f64, cell_size: f64) -> RasterGrid {
    let transform = AffineGeoTransform::from_top_left_and_cell_size(Point::new(left, top), cell_size, -cell_size).expect("valid transform");
    RasterGrid::new(size, Arc::new(transform))
}

/// Grid with cells of one degree, source pixel `(c, r)` covers longitude `[left + c, left + c + 1]`
pub fn degree_grid(size: RasterSize, left: f64, top: f64) -> RasterGrid {
    degree_grid_with_cell_size(size, left, top, 1.0)
}

/// 41x41 grid geo-coded by a 5x5 tie point grid with curved latitude lines,
/// covers roughly longitude [3, 4.2] and latitude [48.8, 50]
pub fn curved_grid() -> geo::Result<RasterGrid> {
    let tie_size = RasterSize::with_rows_cols(5, 5);
    let mut lats = Vec::with_capacity(tie_size.cell_count());
    let mut lons = Vec::with_capacity(tie_size.cell_count());
    for row in 0..tie_size.rows {
        for col in 0..tie_size.cols {
            let (r, c) = (row as f64, col as f64);
            lats.push(50.0 - 0.25 * r - 0.01 * c * c);
            lons.push(3.0 + 0.25 * c + 0.005 * r * c);
        }
    }

    let tie_points = TiePointGeoTransform::new(tie_size, 10.0, 10.0, lats, lons)?;
    Ok(RasterGrid::new(RasterSize::square(41), Arc::new(tie_points)))
}

/// Product without sample data, reads fail
pub fn empty_product(name: &str, size: RasterSize, bands: Vec<BandDescriptor>) -> SourceProduct {
    SourceProduct::new(
        name,
        degree_grid(size, 0.0, 0.0),
        bands,
        Arc::new(MemorySampleSource::new(name, size)),
    )
}

/// Product with in memory bands on the given grid
pub fn memory_product(name: &str, grid: RasterGrid, bands: Vec<(BandDescriptor, SampleData)>) -> Result<SourceProduct> {
    let mut source = MemorySampleSource::new(name, grid.size());
    let mut descriptors = Vec::with_capacity(bands.len());
    for (descriptor, data) in bands {
        source.add_band(descriptor.name.clone(), data)?;
        descriptors.push(descriptor);
    }

    Ok(SourceProduct::new(name, grid, descriptors, Arc::new(source)))
}

/// Sample source that counts the window reads of the wrapped source
pub struct CountingSampleSource {
    inner: Arc<dyn SampleSource>,
    reads: AtomicUsize,
}

impl CountingSampleSource {
    pub fn new(inner: Arc<dyn SampleSource>) -> Self {
        CountingSampleSource {
            inner,
            reads: AtomicUsize::new(0),
        }
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl SampleSource for CountingSampleSource {
    fn read_window(&self, band: usize, rect: PixelRect) -> Result<SampleBuffer> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_window(band, rect)
    }
}

/// Replaces the sample source of a product by a counting wrapper
pub fn with_read_counter(mut product: SourceProduct) -> (SourceProduct, Arc<CountingSampleSource>) {
    let counter = Arc::new(CountingSampleSource::new(Arc::clone(&product.source)));
    product.source = Arc::clone(&counter) as Arc<dyn SampleSource>;
    (product, counter)
}
