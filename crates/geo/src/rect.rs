//! Integer rectangles in pixel space, used for tiles and source windows.

use crate::RasterSize;

/// Rectangular region of a raster grid, `x`/`y` is the top left pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        PixelRect { x, y, width, height }
    }

    /// The rectangle that covers an entire grid of the given size
    pub const fn for_raster(size: RasterSize) -> Self {
        PixelRect::new(0, 0, size.cols as i32, size.rows as i32)
    }

    /// Creates a rectangle from inclusive pixel bounds
    pub fn from_bounds(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        if max_x < min_x || max_y < min_y {
            return PixelRect::default();
        }

        PixelRect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
    }

    /// Last column inside the rectangle
    pub const fn max_x(&self) -> i32 {
        self.x + self.width - 1
    }

    /// Last row inside the rectangle
    pub const fn max_y(&self) -> i32 {
        self.y + self.height - 1
    }

    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub const fn pixel_count(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.width as usize * self.height as usize
        }
    }

    pub const fn size(&self) -> RasterSize {
        if self.is_empty() {
            RasterSize::empty()
        } else {
            RasterSize::with_rows_cols(self.height as usize, self.width as usize)
        }
    }

    pub const fn contains_pixel(&self, col: i32, row: i32) -> bool {
        col >= self.x && col <= self.max_x() && row >= self.y && row <= self.max_y()
    }

    pub fn contains(&self, other: &PixelRect) -> bool {
        !other.is_empty() && self.contains_pixel(other.x, other.y) && self.contains_pixel(other.max_x(), other.max_y())
    }

    pub fn intersects(&self, other: &PixelRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x <= other.max_x()
            && self.max_x() >= other.x
            && self.y <= other.max_y()
            && self.max_y() >= other.y
    }

    pub fn intersection(&self, other: &PixelRect) -> PixelRect {
        if !self.intersects(other) {
            // Rectangles do not overlap, return an empty rectangle
            return PixelRect::default();
        }

        PixelRect::from_bounds(
            self.x.max(other.x),
            self.y.max(other.y),
            self.max_x().min(other.max_x()),
            self.max_y().min(other.max_y()),
        )
    }

    /// Grows the rectangle by `margin` pixels on each side
    pub const fn expanded(&self, margin: i32) -> PixelRect {
        PixelRect::new(self.x - margin, self.y - margin, self.width + 2 * margin, self.height + 2 * margin)
    }

    /// Splits the rectangle in tiles of at most `tile_size`, row-major, the last row and column of tiles may be smaller.
    pub fn tiles(&self, tile_size: RasterSize) -> Vec<PixelRect> {
        if self.is_empty() || tile_size.is_empty() {
            return Vec::new();
        }

        let tile_width = tile_size.cols as i32;
        let tile_height = tile_size.rows as i32;

        let mut tiles = Vec::new();
        for y in (self.y..self.y + self.height).step_by(tile_size.rows) {
            for x in (self.x..self.x + self.width).step_by(tile_size.cols) {
                let width = tile_width.min(self.x + self.width - x);
                let height = tile_height.min(self.y + self.height - y);
                tiles.push(PixelRect::new(x, y, width, height));
            }
        }

        tiles
    }
}

impl std::fmt::Display for PixelRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[x: {}, y: {}, width: {}, height: {}]", self.x, self.y, self.width, self.height)
    }
}
