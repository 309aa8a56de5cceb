//! Geo-coding based on coarse latitude/longitude tie-point grids, as delivered with swath products.

use crate::{AffineGeoTransform, Error, GeoPosition, GeoTransform, PixelPosition, RasterSize, Result};

const MAX_ITERATIONS: usize = 30;
const CONVERGENCE_THRESHOLD: f64 = 1e-9;

/// Latitude and longitude sampled every `sub_sampling` pixels of the raster grid.
///
/// Tie point `(i, j)` is located at the pixel centre `(i * sub_sampling_x, j * sub_sampling_y)`.
/// Positions in between are bilinearly interpolated, beyond the outer tie points the outer cells are extrapolated.
/// The inverse mapping uses Newton iteration, seeded by an affine approximation through the corner tie points.
#[derive(Debug, Clone)]
pub struct TiePointGeoTransform {
    size: RasterSize,
    sub_sampling_x: f64,
    sub_sampling_y: f64,
    lats: Vec<f64>,
    lons: Vec<f64>,
    seed: AffineGeoTransform,
}

impl TiePointGeoTransform {
    pub fn new(size: RasterSize, sub_sampling_x: f64, sub_sampling_y: f64, lats: Vec<f64>, lons: Vec<f64>) -> Result<Self> {
        if size.rows < 2 || size.cols < 2 {
            return Err(Error::InvalidArgument(format!(
                "Tie point grid needs at least 2x2 tie points, got {size}"
            )));
        }

        if lats.len() != size.cell_count() || lons.len() != size.cell_count() {
            return Err(Error::SizeMismatch {
                size1: (size.cols, size.rows),
                size2: (lats.len(), lons.len()),
            });
        }

        if sub_sampling_x <= 0.0 || sub_sampling_y <= 0.0 {
            return Err(Error::InvalidArgument("Tie point sub sampling must be positive".to_string()));
        }

        if lats.iter().chain(lons.iter()).any(|v| !v.is_finite()) {
            return Err(Error::InvalidArgument("Tie point grid contains non finite values".to_string()));
        }

        let seed = corner_approximation(size, sub_sampling_x, sub_sampling_y, &lats, &lons)?;
        log::debug!("Tie point geo-coding {size} (sub sampling {sub_sampling_x}x{sub_sampling_y}), seed {seed:?}");

        Ok(TiePointGeoTransform {
            size,
            sub_sampling_x,
            sub_sampling_y,
            lats,
            lons,
            seed,
        })
    }

    fn tie_point(&self, col: usize, row: usize) -> (f64, f64) {
        let index = row * self.size.cols + col;
        (self.lons[index], self.lats[index])
    }

    /// Interpolates (lon, lat) and returns the partial derivatives d(lon, lat)/dx and d(lon, lat)/dy
    fn interpolate(&self, pixel: PixelPosition) -> ((f64, f64), (f64, f64), (f64, f64)) {
        let tx = pixel.x / self.sub_sampling_x;
        let ty = pixel.y / self.sub_sampling_y;

        let i0 = (tx.floor().max(0.0) as usize).min(self.size.cols - 2);
        let j0 = (ty.floor().max(0.0) as usize).min(self.size.rows - 2);
        let fx = tx - i0 as f64;
        let fy = ty - j0 as f64;

        let p00 = self.tie_point(i0, j0);
        let p10 = self.tie_point(i0 + 1, j0);
        let p01 = self.tie_point(i0, j0 + 1);
        let p11 = self.tie_point(i0 + 1, j0 + 1);

        let bilinear = |v00: f64, v10: f64, v01: f64, v11: f64| {
            let value = v00 * (1.0 - fx) * (1.0 - fy) + v10 * fx * (1.0 - fy) + v01 * (1.0 - fx) * fy + v11 * fx * fy;
            let d_fx = (v10 - v00) * (1.0 - fy) + (v11 - v01) * fy;
            let d_fy = (v01 - v00) * (1.0 - fx) + (v11 - v10) * fx;
            (value, d_fx / self.sub_sampling_x, d_fy / self.sub_sampling_y)
        };

        let (lon, dlon_dx, dlon_dy) = bilinear(p00.0, p10.0, p01.0, p11.0);
        let (lat, dlat_dx, dlat_dy) = bilinear(p00.1, p10.1, p01.1, p11.1);

        ((lon, lat), (dlon_dx, dlat_dx), (dlon_dy, dlat_dy))
    }
}

impl GeoTransform for TiePointGeoTransform {
    fn to_geographic(&self, pixel: PixelPosition) -> Option<GeoPosition> {
        if !pixel.is_finite() {
            return None;
        }

        let ((lon, lat), _, _) = self.interpolate(pixel);
        Some(GeoPosition::new(lat, lon))
    }

    fn to_pixel(&self, geo: GeoPosition) -> Option<PixelPosition> {
        if !geo.is_valid() {
            return None;
        }

        let mut pixel = self.seed.to_pixel(geo)?;
        for _ in 0..MAX_ITERATIONS {
            let ((lon, lat), (dlon_dx, dlat_dx), (dlon_dy, dlat_dy)) = self.interpolate(pixel);

            let det = dlon_dx * dlat_dy - dlon_dy * dlat_dx;
            if !det.is_finite() || det.abs() < f64::EPSILON {
                return None;
            }

            // Solve J * delta = -residual
            let res_lon = lon - geo.lon;
            let res_lat = lat - geo.lat;
            let dx = -(dlat_dy * res_lon - dlon_dy * res_lat) / det;
            let dy = -(-dlat_dx * res_lon + dlon_dx * res_lat) / det;

            pixel.x += dx;
            pixel.y += dy;

            if !pixel.is_finite() {
                return None;
            }

            if dx.abs() < CONVERGENCE_THRESHOLD && dy.abs() < CONVERGENCE_THRESHOLD {
                return Some(pixel);
            }
        }

        None
    }
}

/// Affine approximation through the top left, top right and bottom left tie points
fn corner_approximation(
    size: RasterSize,
    sub_sampling_x: f64,
    sub_sampling_y: f64,
    lats: &[f64],
    lons: &[f64],
) -> Result<AffineGeoTransform> {
    let last_col = size.cols - 1;
    let last_row = size.rows - 1;
    let top_right = last_col;
    let bottom_left = last_row * size.cols;

    // pixel centres of the corner tie points expressed as pixel corner coordinates
    let span_x = last_col as f64 * sub_sampling_x;
    let span_y = last_row as f64 * sub_sampling_y;

    let lon_per_x = (lons[top_right] - lons[0]) / span_x;
    let lat_per_x = (lats[top_right] - lats[0]) / span_x;
    let lon_per_y = (lons[bottom_left] - lons[0]) / span_y;
    let lat_per_y = (lats[bottom_left] - lats[0]) / span_y;

    // tie point (0, 0) is the centre of pixel (0, 0), which is corner coordinate (0.5, 0.5)
    let origin_lon = lons[0] - 0.5 * (lon_per_x + lon_per_y);
    let origin_lat = lats[0] - 0.5 * (lat_per_x + lat_per_y);

    AffineGeoTransform::new([origin_lon, lon_per_x, lon_per_y, origin_lat, lat_per_x, lat_per_y])
}
