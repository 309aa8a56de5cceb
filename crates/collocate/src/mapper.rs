//! Mapping of destination tile pixels to fractional source pixel positions.

use std::ops::RangeInclusive;

use geo::{GeoPosition, GeoTransform, PixelPosition, PixelRect, RasterGrid};

/// Source positions of the pixels of a destination tile, together with the source window that covers them.
#[derive(Debug, Clone, PartialEq)]
pub struct TileMapping {
    rect: PixelRect,
    positions: Vec<Option<PixelPosition>>,
    window: Option<PixelRect>,
}

impl TileMapping {
    /// The destination tile
    pub fn rect(&self) -> PixelRect {
        self.rect
    }

    /// Source position per destination pixel (row-major), `None` when the pixel has no valid correspondence
    pub fn positions(&self) -> &[Option<PixelPosition>] {
        &self.positions
    }

    /// The source region required to resample the tile, `None` when no pixel has a valid correspondence
    pub fn window(&self) -> Option<PixelRect> {
        self.window
    }

    pub fn valid_count(&self) -> usize {
        self.positions.iter().filter(|pos| pos.is_some()).count()
    }
}

/// Computes the correspondence between destination tile pixels and source grid positions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PixelMapper {
    error_threshold: f64,
}

impl PixelMapper {
    /// Mapper that transforms every pixel exactly
    pub fn new() -> Self {
        Self::default()
    }

    /// When `error_threshold` is positive the positions of a row segment are linearly interpolated
    /// between exactly transformed anchors when the deviation at the midpoint is below the threshold (in source pixels).
    pub fn with_error_threshold(error_threshold: f64) -> Self {
        PixelMapper {
            error_threshold: error_threshold.max(0.0),
        }
    }

    pub fn error_threshold(&self) -> f64 {
        self.error_threshold
    }

    /// Maps every pixel of `dest_rect` to the source grid.
    /// `margin` is the number of pixels the window is grown beyond the footprint of the valid positions (at least the kernel radius).
    pub fn map_tile(&self, dest: &dyn GeoTransform, dest_rect: PixelRect, source: &RasterGrid, margin: usize) -> TileMapping {
        let width = dest_rect.width.max(0) as usize;
        let mut positions = vec![None; dest_rect.pixel_count()];

        if width > 0 {
            let mut row_mapper = RowMapper::new(dest, source, width);
            for (row_positions, row) in positions.chunks_mut(width).zip(dest_rect.y..) {
                if self.error_threshold > 0.0 {
                    row_mapper.map_interpolated(row, dest_rect.x, row_positions, self.error_threshold);
                } else {
                    row_mapper.map_exact(row, dest_rect.x, row_positions);
                }
            }
        }

        let window = source_window(&positions, source, margin);
        TileMapping {
            rect: dest_rect,
            positions,
            window,
        }
    }
}

/// Integer bounding box of the floor of all valid positions, grown by `margin` and clipped to the grid
fn source_window(positions: &[Option<PixelPosition>], source: &RasterGrid, margin: usize) -> Option<PixelRect> {
    let mut bounds: Option<(i32, i32, i32, i32)> = None;
    for pos in positions.iter().flatten() {
        let (x, y) = (pos.x.floor() as i32, pos.y.floor() as i32);
        bounds = Some(match bounds {
            Some((min_x, min_y, max_x, max_y)) => (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y)),
            None => (x, y, x, y),
        });
    }

    let (min_x, min_y, max_x, max_y) = bounds?;
    let margin = i32::try_from(margin).unwrap_or(i32::MAX);
    let window = PixelRect::from_bounds(
        min_x.saturating_sub(margin),
        min_y.saturating_sub(margin),
        max_x.saturating_add(margin),
        max_y.saturating_add(margin),
    )
    .intersection(&source.bounds());

    (!window.is_empty()).then_some(window)
}

/// Transforms the pixels of a destination row, the working buffers are reused between rows
struct RowMapper<'a> {
    dest: &'a dyn GeoTransform,
    source: &'a RasterGrid,
    pixels: Vec<PixelPosition>,
    geos: Vec<Option<GeoPosition>>,
    transformed: Vec<Option<PixelPosition>>,
}

impl<'a> RowMapper<'a> {
    fn new(dest: &'a dyn GeoTransform, source: &'a RasterGrid, width: usize) -> Self {
        RowMapper {
            dest,
            source,
            pixels: Vec::with_capacity(width),
            geos: Vec::with_capacity(width),
            transformed: Vec::with_capacity(width),
        }
    }

    fn on_source_grid(&self, pos: PixelPosition) -> Option<PixelPosition> {
        pos.is_inside(self.source.width(), self.source.height()).then_some(pos)
    }

    /// Transforms the given destination columns of `row`
    fn transform(&mut self, row: i32, columns: impl Iterator<Item = i32>) -> &[Option<PixelPosition>] {
        self.pixels.clear();
        self.pixels.extend(columns.map(|col| PixelPosition::pixel_center(col, row)));
        self.dest.to_geographic_batch(&self.pixels, &mut self.geos);
        self.source.transform().to_pixel_batch(&self.geos, &mut self.transformed);
        &self.transformed
    }

    /// Transforms every pixel of the row, `first_col` is the destination column of `out[0]`
    fn map_exact(&mut self, row: i32, first_col: i32, out: &mut [Option<PixelPosition>]) {
        let cols = first_col..first_col + out.len() as i32;
        self.transform(row, cols);
        for (dst, pos) in out.iter_mut().zip(self.transformed.iter()) {
            *dst = pos.and_then(|pos| self.on_source_grid(pos));
        }
    }

    fn map_interpolated(&mut self, row: i32, first_col: i32, out: &mut [Option<PixelPosition>], error_threshold: f64) {
        if out.len() <= 2 {
            return self.map_exact(row, first_col, out);
        }

        let last_col = first_col + out.len() as i32 - 1;
        self.subdivide_segment(row, first_col..=last_col, first_col, out, error_threshold);
    }

    /// Interpolates the segment linearly between its end points when the error at the middle is small enough,
    /// subdivides it otherwise
    fn subdivide_segment(
        &mut self,
        row: i32,
        columns: RangeInclusive<i32>,
        first_col: i32,
        out: &mut [Option<PixelPosition>],
        error_threshold: f64,
    ) {
        let start_col = *columns.start();
        let end_col = *columns.end();
        let middle_col = (start_col + end_col) / 2;
        let segment = (start_col - first_col) as usize..=(end_col - first_col) as usize;

        if end_col - start_col + 1 <= 2 {
            return self.map_exact(row, start_col, &mut out[segment]);
        }

        let anchors = self.transform(row, [start_col, middle_col, end_col].into_iter());
        let (Some(start), Some(middle), Some(end)) = (anchors[0], anchors[1], anchors[2]) else {
            // rows that leave the domain of the transformation are transformed exactly
            return self.map_exact(row, start_col, &mut out[segment]);
        };

        let t = (middle_col - start_col) as f64 / (end_col - start_col) as f64;
        let interpolated_middle = linear_interpolate(start, end, t);
        let error = (middle.x - interpolated_middle.x).hypot(middle.y - interpolated_middle.y);

        if error < error_threshold {
            let span = (end_col - start_col) as f64;
            for (i, dst) in out[segment].iter_mut().enumerate() {
                *dst = self.on_source_grid(linear_interpolate(start, end, i as f64 / span));
            }
        } else {
            self.subdivide_segment(row, start_col..=middle_col, first_col, out, error_threshold);
            self.subdivide_segment(row, middle_col + 1..=end_col, first_col, out, error_threshold);
        }
    }
}

#[inline]
fn linear_interpolate(start: PixelPosition, end: PixelPosition, t: f64) -> PixelPosition {
    PixelPosition::new(start.x + t * (end.x - start.x), start.y + t * (end.y - start.y))
}
