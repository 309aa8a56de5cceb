use proj4rs::Proj;
use proj4rs::transform::transform;

use crate::{AffineGeoTransform, Error, GeoPosition, GeoTransform, PixelPosition, Point, Result};

const WGS84_PROJ: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// Raster grid in a projected coordinate system: an affine mapping from pixels to map coordinates,
/// combined with a proj4rs transformation between the map coordinates and WGS84.
pub struct ProjectedGeoTransform {
    affine: AffineGeoTransform,
    map: Proj,
    wgs84: Proj,
    proj_str: String,
}

impl ProjectedGeoTransform {
    /// `proj_str` is the proj4 definition of the map coordinate system, `coefficients` the affine pixel to map transformation.
    pub fn new(proj_str: &str, coefficients: [f64; 6]) -> Result<Self> {
        if proj_str.is_empty() {
            return Err(Error::InvalidArgument("Empty projection string".into()));
        }

        Ok(ProjectedGeoTransform {
            affine: AffineGeoTransform::new(coefficients)?,
            map: Proj::from_proj_string(proj_str)?,
            wgs84: Proj::from_proj_string(WGS84_PROJ)?,
            proj_str: proj_str.to_string(),
        })
    }

    pub fn from_epsg(epsg: u16, coefficients: [f64; 6]) -> Result<Self> {
        let proj_str = crs_definitions::from_code(epsg)
            .map(|def| def.proj4.to_string())
            .ok_or_else(|| Error::Runtime(format!("Failed to generate Proj4 string for EPSG code {epsg}")))?;

        Self::new(&proj_str, coefficients)
    }

    pub fn affine(&self) -> &AffineGeoTransform {
        &self.affine
    }

    pub fn proj_str(&self) -> &str {
        &self.proj_str
    }

    fn map_to_geographic(&self, mut point: Point) -> Option<GeoPosition> {
        if self.map.is_latlong() {
            point = point.to_radians();
        }

        transform(&self.map, &self.wgs84, &mut point).ok()?;
        let geo = GeoPosition::from(point.to_degrees());
        geo.is_valid().then_some(geo)
    }

    fn geographic_to_map(&self, geo: GeoPosition) -> Option<Point> {
        if !geo.is_valid() {
            return None;
        }

        let mut point = Point::from(geo).to_radians();
        transform(&self.wgs84, &self.map, &mut point).ok()?;
        if self.map.is_latlong() {
            point = point.to_degrees();
        }

        (point.x().is_finite() && point.y().is_finite()).then_some(point)
    }
}

impl GeoTransform for ProjectedGeoTransform {
    fn to_geographic(&self, pixel: PixelPosition) -> Option<GeoPosition> {
        self.map_to_geographic(self.affine.apply(pixel.x + 0.5, pixel.y + 0.5))
    }

    fn to_pixel(&self, geo: GeoPosition) -> Option<PixelPosition> {
        let corner = self.affine.apply_inverse(self.geographic_to_map(geo)?);
        let pos = PixelPosition::new(corner.x() - 0.5, corner.y() - 0.5);
        pos.is_finite().then_some(pos)
    }
}

impl std::fmt::Debug for ProjectedGeoTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProjectedGeoTransform({}, {:?})", self.proj_str, self.affine)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn belgian_lambert_round_trip() -> Result<()> {
        // 100m cells of Belgian Lambert 72
        let trans = ProjectedGeoTransform::from_epsg(31370, [22000.0, 100.0, 0.0, 245000.0, 0.0, -100.0])?;

        for &(col, row) in &[(0, 0), (100, 250), (2000, 900)] {
            let pixel = PixelPosition::pixel_center(col, row);
            let geo = trans.to_geographic(pixel).expect("valid projection");
            assert!(geo.lat > 49.0 && geo.lat < 52.0, "{geo:?}");
            assert!(geo.lon > 2.0 && geo.lon < 7.0, "{geo:?}");

            // the inverse projection is iterative, allow centimeter deviations
            let back = trans.to_pixel(geo).expect("valid inverse projection");
            assert_relative_eq!(back, pixel, epsilon = 1e-4);
        }

        Ok(())
    }

    #[test]
    fn empty_projection_is_rejected() {
        assert!(ProjectedGeoTransform::new("", [0.0, 1.0, 0.0, 0.0, 0.0, -1.0]).is_err());
    }
}
