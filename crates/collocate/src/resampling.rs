//! Resampling kernels.
//!
//! A kernel computes the value at a fractional [`PixelPosition`] from the decoded samples of a [`SampleWindow`].
//! The neighbourhood is gathered around `floor(position)` and indices that fall outside the grid are clamped
//! to the nearest edge pixel. When any gathered sample is no-data the result is invalid.

use std::f64::consts::PI;

use geo::PixelPosition;

use crate::{Error, Result, SampleWindow, sampledata::OutsideWindow};

/// Minimum number of pixels a source window is grown beyond the footprint of a tile
pub const MIN_WINDOW_MARGIN: usize = 2;

/// Supported number of points per axis of the `BiSinc` kernel
pub const BISINC_POINT_COUNTS: [usize; 3] = [5, 11, 21];

pub type KernelResult = std::result::Result<Option<f64>, OutsideWindow>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResamplingMethod {
    /// Value of the pixel that contains the position
    #[default]
    NearestNeighbour,
    /// Distance weighted mean of the 2x2 neighbourhood
    Bilinear,
    /// Keys cubic convolution (a = -0.5) of the 4x4 neighbourhood
    CubicConvolution,
    /// Hann windowed sinc interpolation using the given number of points per axis
    BiSinc(usize),
    /// Bicubic Hermite patch, gradients are estimated with central differences
    BiCubic,
}

impl ResamplingMethod {
    /// How far the neighbourhood reaches from `floor(position)`
    pub const fn radius(&self) -> usize {
        match self {
            ResamplingMethod::NearestNeighbour | ResamplingMethod::Bilinear => 1,
            ResamplingMethod::CubicConvolution | ResamplingMethod::BiCubic => 2,
            ResamplingMethod::BiSinc(points) => *points / 2,
        }
    }

    /// Number of pixels the source window must be grown beyond the footprint of a tile
    pub const fn margin(&self) -> usize {
        let radius = self.radius();
        if radius > MIN_WINDOW_MARGIN { radius } else { MIN_WINDOW_MARGIN }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ResamplingMethod::BiSinc(points) if !BISINC_POINT_COUNTS.contains(points) => Err(Error::InvalidArgument(format!(
                "BiSinc resampling supports {BISINC_POINT_COUNTS:?} points, got {points}"
            ))),
            _ => Ok(()),
        }
    }

    /// Computes the value at `pos`, `Ok(None)` when the result is invalid.
    /// An error is returned when the window does not contain the neighbourhood of the position.
    pub fn resample(&self, pos: PixelPosition, window: &SampleWindow) -> KernelResult {
        match self {
            ResamplingMethod::NearestNeighbour => nearest_neighbour(pos, window),
            ResamplingMethod::Bilinear => bilinear(pos, window),
            ResamplingMethod::CubicConvolution => cubic_convolution(pos, window),
            ResamplingMethod::BiSinc(points) => bisinc(pos, window, *points / 2),
            ResamplingMethod::BiCubic => bicubic(pos, window),
        }
    }
}

impl std::fmt::Display for ResamplingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResamplingMethod::NearestNeighbour => write!(f, "NEAREST_NEIGHBOUR"),
            ResamplingMethod::Bilinear => write!(f, "BILINEAR_INTERPOLATION"),
            ResamplingMethod::CubicConvolution => write!(f, "CUBIC_CONVOLUTION"),
            ResamplingMethod::BiSinc(points) => write!(f, "BISINC_{points}_POINT_INTERPOLATION"),
            ResamplingMethod::BiCubic => write!(f, "BICUBIC_INTERPOLATION"),
        }
    }
}

impl std::str::FromStr for ResamplingMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NEAREST_NEIGHBOUR" | "NEAREST_NEIGHBOR" | "NEAREST" => Ok(ResamplingMethod::NearestNeighbour),
            "BILINEAR_INTERPOLATION" | "BILINEAR" => Ok(ResamplingMethod::Bilinear),
            "CUBIC_CONVOLUTION" => Ok(ResamplingMethod::CubicConvolution),
            "BISINC_5_POINT_INTERPOLATION" | "BISINC" => Ok(ResamplingMethod::BiSinc(5)),
            "BISINC_11_POINT_INTERPOLATION" => Ok(ResamplingMethod::BiSinc(11)),
            "BISINC_21_POINT_INTERPOLATION" => Ok(ResamplingMethod::BiSinc(21)),
            "BICUBIC_INTERPOLATION" | "BICUBIC" => Ok(ResamplingMethod::BiCubic),
            _ => Err(Error::InvalidArgument(format!("Unknown resampling method: {s}"))),
        }
    }
}

#[inline]
fn floor_index(pos: PixelPosition) -> (i32, i32) {
    (pos.x.floor() as i32, pos.y.floor() as i32)
}

fn nearest_neighbour(pos: PixelPosition, window: &SampleWindow) -> KernelResult {
    let (col, row) = pos.containing_pixel();
    window.clamped_sample(col, row)
}

/// Gathers the `N x N` neighbourhood starting at offset `first` from `(col, row)`, `None` if any sample is no-data
#[inline]
fn gather<const N: usize>(
    window: &SampleWindow,
    col: i32,
    row: i32,
    first: i32,
) -> std::result::Result<Option<[[f64; N]; N]>, OutsideWindow> {
    let mut values = [[0.0; N]; N];
    for (j, value_row) in values.iter_mut().enumerate() {
        for (i, value) in value_row.iter_mut().enumerate() {
            match window.clamped_sample(col + first + i as i32, row + first + j as i32)? {
                Some(v) => *value = v,
                None => return Ok(None),
            }
        }
    }

    Ok(Some(values))
}

fn bilinear(pos: PixelPosition, window: &SampleWindow) -> KernelResult {
    let (col, row) = floor_index(pos);
    let Some(v) = gather::<2>(window, col, row, 0)? else {
        return Ok(None);
    };

    let fx = pos.x - col as f64;
    let fy = pos.y - row as f64;

    let top = v[0][0] + fx * (v[0][1] - v[0][0]);
    let bottom = v[1][0] + fx * (v[1][1] - v[1][0]);
    Ok(Some(top + fy * (bottom - top)))
}

/// Keys cubic convolution weight with a = -0.5
#[inline]
fn cubic_weight(t: f64) -> f64 {
    const A: f64 = -0.5;

    let t = t.abs();
    if t <= 1.0 {
        ((A + 2.0) * t - (A + 3.0)) * t * t + 1.0
    } else if t < 2.0 {
        ((A * t - 5.0 * A) * t + 8.0 * A) * t - 4.0 * A
    } else {
        0.0
    }
}

fn cubic_convolution(pos: PixelPosition, window: &SampleWindow) -> KernelResult {
    let (col, row) = floor_index(pos);
    let Some(v) = gather::<4>(window, col, row, -1)? else {
        return Ok(None);
    };

    let fx = pos.x - col as f64;
    let fy = pos.y - row as f64;

    // offsets -1..=2
    let wx: [f64; 4] = std::array::from_fn(|i| cubic_weight(fx - (i as f64 - 1.0)));
    let wy: [f64; 4] = std::array::from_fn(|j| cubic_weight(fy - (j as f64 - 1.0)));

    let value = v
        .iter()
        .zip(wy)
        .map(|(value_row, wy)| wy * value_row.iter().zip(wx).map(|(v, wx)| v * wx).sum::<f64>())
        .sum();

    Ok(Some(value))
}

/// Cubic Hermite basis functions at `t` in `[0, 1]`: `(h00, h10, h01, h11)`
#[inline]
fn hermite_basis(t: f64) -> (f64, f64, f64, f64) {
    let t2 = t * t;
    let t3 = t2 * t;
    (2.0 * t3 - 3.0 * t2 + 1.0, t3 - 2.0 * t2 + t, -2.0 * t3 + 3.0 * t2, t3 - t2)
}

fn bicubic(pos: PixelPosition, window: &SampleWindow) -> KernelResult {
    let (col, row) = floor_index(pos);
    let Some(v) = gather::<4>(window, col, row, -1)? else {
        return Ok(None);
    };

    let fx = pos.x - col as f64;
    let fy = pos.y - row as f64;

    // value, gradients and cross derivative at a corner of the cell, (i, j) index the gathered 4x4 neighbourhood
    let corner = |i: usize, j: usize| {
        let f = v[j][i];
        let dx = (v[j][i + 1] - v[j][i - 1]) / 2.0;
        let dy = (v[j + 1][i] - v[j - 1][i]) / 2.0;
        let dxy = (v[j + 1][i + 1] - v[j - 1][i + 1] - v[j + 1][i - 1] + v[j - 1][i - 1]) / 4.0;
        (f, dx, dy, dxy)
    };

    let (hx0, gx0, hx1, gx1) = hermite_basis(fx);
    let (hy0, gy0, hy1, gy1) = hermite_basis(fy);

    let mut value = 0.0;
    for (i, j, hx, gx, hy, gy) in [
        (1, 1, hx0, gx0, hy0, gy0),
        (2, 1, hx1, gx1, hy0, gy0),
        (1, 2, hx0, gx0, hy1, gy1),
        (2, 2, hx1, gx1, hy1, gy1),
    ] {
        let (f, dx, dy, dxy) = corner(i, j);
        value += f * hx * hy + dx * gx * hy + dy * hx * gy + dxy * gx * gy;
    }

    Ok(Some(value))
}

#[inline]
fn sinc(t: f64) -> f64 {
    if t == 0.0 {
        1.0
    } else {
        let x = PI * t;
        x.sin() / x
    }
}

/// Hann windowed sinc weight for a kernel of half width `half`
#[inline]
fn bisinc_weight(t: f64, half: usize) -> f64 {
    let window = 0.5 + 0.5 * (PI * t / (half as f64 + 1.0)).cos();
    sinc(t) * window
}

fn bisinc(pos: PixelPosition, window: &SampleWindow, half: usize) -> KernelResult {
    let (col, row) = floor_index(pos);
    let fx = pos.x - col as f64;
    let fy = pos.y - row as f64;
    let half_i = half as i32;

    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    for dy in -half_i..=half_i {
        let wy = bisinc_weight(fy - dy as f64, half);
        for dx in -half_i..=half_i {
            let Some(value) = window.clamped_sample(col + dx, row + dy)? else {
                return Ok(None);
            };

            let weight = wy * bisinc_weight(fx - dx as f64, half);
            weighted_sum += weight * value;
            weight_sum += weight;
        }
    }

    if weight_sum == 0.0 {
        return Ok(None);
    }

    Ok(Some(weighted_sum / weight_sum))
}
