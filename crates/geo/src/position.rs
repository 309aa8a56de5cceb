use approx::{AbsDiffEq, RelativeEq};

/// Fractional location in the pixel space of a raster grid.
///
/// Integer coordinates are pixel centres: pixel `(col, row)` covers the half open area
/// `[col - 0.5, col + 0.5) x [row - 0.5, row + 0.5)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PixelPosition {
    pub x: f64,
    pub y: f64,
}

impl PixelPosition {
    pub const fn new(x: f64, y: f64) -> Self {
        PixelPosition { x, y }
    }

    /// The position of the centre of the given pixel
    pub const fn pixel_center(col: i32, row: i32) -> Self {
        PixelPosition::new(col as f64, row as f64)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// The column and row of the pixel that contains this position.
    pub fn containing_pixel(&self) -> (i32, i32) {
        ((self.x + 0.5).floor() as i32, (self.y + 0.5).floor() as i32)
    }

    /// Checks if the position lies inside a grid with the given dimensions.
    pub fn is_inside(&self, cols: usize, rows: usize) -> bool {
        self.x >= -0.5 && self.x < cols as f64 - 0.5 && self.y >= -0.5 && self.y < rows as f64 - 0.5
    }
}

/// Geographic location in decimal degrees (WGS84 latitude and longitude)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPosition {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPosition {
    pub const fn new(lat: f64, lon: f64) -> Self {
        GeoPosition { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite() && (-90.0..=90.0).contains(&self.lat)
    }
}

impl From<GeoPosition> for geo_types::Point<f64> {
    fn from(pos: GeoPosition) -> Self {
        geo_types::Point::new(pos.lon, pos.lat)
    }
}

impl From<geo_types::Point<f64>> for GeoPosition {
    fn from(p: geo_types::Point<f64>) -> Self {
        GeoPosition::new(p.y(), p.x())
    }
}

macro_rules! impl_approx_xy {
    ( $t:ident, $a:ident, $b:ident ) => {
        impl AbsDiffEq for $t {
            type Epsilon = f64;

            fn default_epsilon() -> Self::Epsilon {
                f64::default_epsilon()
            }

            fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
                self.$a.abs_diff_eq(&other.$a, epsilon) && self.$b.abs_diff_eq(&other.$b, epsilon)
            }
        }

        impl RelativeEq for $t {
            fn default_max_relative() -> Self::Epsilon {
                f64::default_max_relative()
            }

            fn relative_eq(&self, other: &Self, epsilon: Self::Epsilon, max_relative: Self::Epsilon) -> bool {
                self.$a.relative_eq(&other.$a, epsilon, max_relative) && self.$b.relative_eq(&other.$b, epsilon, max_relative)
            }
        }
    };
}

impl_approx_xy!(PixelPosition, x, y);
impl_approx_xy!(GeoPosition, lat, lon);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containing_pixel_rounds_to_nearest_center() {
        assert_eq!(PixelPosition::new(0.49, 0.0).containing_pixel(), (0, 0));
        assert_eq!(PixelPosition::new(0.5, 0.0).containing_pixel(), (1, 0));
        assert_eq!(PixelPosition::new(-0.5, -0.2).containing_pixel(), (0, 0));
        assert_eq!(PixelPosition::new(-0.51, 2.6).containing_pixel(), (-1, 3));
    }

    #[test]
    fn inside_grid_uses_pixel_edges() {
        assert!(PixelPosition::new(-0.5, -0.5).is_inside(4, 4));
        assert!(PixelPosition::new(3.49, 3.49).is_inside(4, 4));
        assert!(!PixelPosition::new(3.5, 0.0).is_inside(4, 4));
        assert!(!PixelPosition::new(0.0, -0.51).is_inside(4, 4));
        assert!(!PixelPosition::new(f64::NAN, 0.0).is_inside(4, 4));
    }

    #[test]
    fn geo_position_validity() {
        assert!(GeoPosition::new(51.0, 4.0).is_valid());
        assert!(!GeoPosition::new(91.0, 4.0).is_valid());
        assert!(!GeoPosition::new(f64::NAN, 4.0).is_valid());
    }
}
