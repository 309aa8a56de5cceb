use std::fmt::Debug;

use approx::{AbsDiffEq, RelativeEq};

use crate::{Error, GeoPosition, PixelPosition, Point, Result};

/// Bidirectional mapping between the pixel space of a raster grid and geographic coordinates.
///
/// Implementations are immutable after construction and shared between the threads that process tiles.
/// Failure to map a coordinate (outside the valid domain of the model, numerical failure) is reported as `None`,
/// callers treat this as "no correspondence", never as an error.
pub trait GeoTransform: Send + Sync {
    fn to_geographic(&self, pixel: PixelPosition) -> Option<GeoPosition>;

    fn to_pixel(&self, geo: GeoPosition) -> Option<PixelPosition>;

    /// Converts a batch of pixel positions, `out` is cleared before the results are added.
    /// Implementations with a costly setup per conversion should override this.
    fn to_geographic_batch(&self, pixels: &[PixelPosition], out: &mut Vec<Option<GeoPosition>>) {
        out.clear();
        out.extend(pixels.iter().map(|&pixel| self.to_geographic(pixel)));
    }

    /// Converts a batch of geographic positions, `out` is cleared before the results are added.
    fn to_pixel_batch(&self, geos: &[Option<GeoPosition>], out: &mut Vec<Option<PixelPosition>>) {
        out.clear();
        out.extend(geos.iter().map(|geo| geo.and_then(|geo| self.to_pixel(geo))));
    }
}

/// Affine transformation between pixel corner coordinates and (longitude, latitude).
/// The inverse is computed once at construction.
#[derive(Clone, Copy, PartialEq)]
pub struct AffineGeoTransform {
    forward: [f64; 6],
    inverse: [f64; 6],
}

impl AffineGeoTransform {
    /// Creates a new `AffineGeoTransform` from the provided coefficients.
    ///
    /// The coefficients are in the order:
    /// [top left x, pixel width, rotation (0 if north is up), top left y, rotation (0 if north is up), pixel height].
    /// Fails when the coefficients can not be inverted.
    pub fn new(coefficients: [f64; 6]) -> Result<Self> {
        Ok(AffineGeoTransform {
            forward: coefficients,
            inverse: invert(&coefficients)?,
        })
    }

    pub fn from_top_left_and_cell_size(top_left: Point, cell_size_x: f64, cell_size_y: f64) -> Result<Self> {
        Self::new([top_left.x(), cell_size_x, 0.0, top_left.y(), 0.0, cell_size_y])
    }

    /// Translates pixel corner coordinates to a point.
    /// (0, 0) is the top left corner of the raster.
    pub fn apply(&self, col: f64, row: f64) -> Point {
        apply(&self.forward, col, row)
    }

    /// Translates a point to pixel corner coordinates.
    pub fn apply_inverse(&self, point: Point) -> Point {
        apply(&self.inverse, point.x(), point.y())
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.forward[0], self.forward[3])
    }

    /// The horizontal cell size
    pub fn cell_size_x(&self) -> f64 {
        self.forward[1]
    }

    /// The vertical cell size
    pub fn cell_size_y(&self) -> f64 {
        self.forward[5]
    }

    /// Returns the coefficients of the transformation.
    pub fn coefficients(&self) -> [f64; 6] {
        self.forward
    }
}

impl GeoTransform for AffineGeoTransform {
    fn to_geographic(&self, pixel: PixelPosition) -> Option<GeoPosition> {
        let p = self.apply(pixel.x + 0.5, pixel.y + 0.5);
        Some(GeoPosition::new(p.y(), p.x()))
    }

    fn to_pixel(&self, geo: GeoPosition) -> Option<PixelPosition> {
        let corner = self.apply_inverse(geo.into());
        let pos = PixelPosition::new(corner.x() - 0.5, corner.y() - 0.5);
        pos.is_finite().then_some(pos)
    }
}

fn apply(gt: &[f64; 6], col: f64, row: f64) -> Point {
    let x = gt[0] + gt[1] * col + gt[2] * row;
    let y = gt[3] + gt[4] * col + gt[5] * row;
    Point::new(x, y)
}

fn invert(gt_in: &[f64; 6]) -> Result<[f64; 6]> {
    if gt_in[2] == 0.0 && gt_in[4] == 0.0 && gt_in[1] != 0.0 && gt_in[5] != 0.0 {
        // Special case: no rotation, to avoid computing determinate and potential precision issues.
        // X = gt_in[0] + x * gt_in[1]
        // Y = gt_in[3] + y * gt_in[5]
        // -->
        // x = -gt_in[0] / gt_in[1] + (1 / gt_in[1]) * X
        // y = -gt_in[3] / gt_in[5] + (1 / gt_in[5]) * Y
        return Ok([
            -gt_in[0] / gt_in[1],
            1.0 / gt_in[1],
            0.0,
            -gt_in[3] / gt_in[5],
            0.0,
            1.0 / gt_in[5],
        ]);
    }

    // Assume a 3rd row that is [1 0 0].
    let det = gt_in[1] * gt_in[5] - gt_in[2] * gt_in[4];
    let magnitude = f64::max(f64::max(gt_in[1].abs(), gt_in[2].abs()), f64::max(gt_in[4].abs(), gt_in[5].abs()));

    if !det.is_finite() || det.abs() <= 1e-10 * magnitude * magnitude {
        return Err(Error::InvalidArgument(
            "AffineGeoTransform: determinate is too small, cannot compute inverse".to_string(),
        ));
    }

    let inv_det = 1.0 / det;

    // Compute adjoint, and divide by determinate
    Ok([
        (gt_in[2] * gt_in[3] - gt_in[0] * gt_in[5]) * inv_det,
        gt_in[5] * inv_det,
        -gt_in[2] * inv_det,
        (-gt_in[1] * gt_in[3] + gt_in[0] * gt_in[4]) * inv_det,
        -gt_in[4] * inv_det,
        gt_in[1] * inv_det,
    ])
}

impl Debug for AffineGeoTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "AffineGeoTransform(topleft: ({}, {}), pixel_width: {}, pixel_height: {})",
            self.forward[0],
            self.forward[3],
            self.cell_size_x(),
            self.cell_size_y()
        )
    }
}

impl AbsDiffEq for AffineGeoTransform {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.forward.abs_diff_eq(&other.forward, epsilon)
    }
}

impl RelativeEq for AffineGeoTransform {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: Self::Epsilon, max_relative: Self::Epsilon) -> bool {
        self.forward.relative_eq(&other.forward, epsilon, max_relative)
    }
}
