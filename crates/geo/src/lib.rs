#![warn(clippy::unwrap_used)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Geo-coding primitives: pixel and geographic positions, pixel rectangles and the
//! transformations between the pixel space of a raster grid and geographic coordinates.

pub type Result<T = ()> = std::result::Result<T, Error>;

mod datatype;
mod error;
mod geotransform;
mod nodata;
mod position;
#[cfg(feature = "proj4rs")]
mod projected;
mod rastergrid;
mod rastersize;
pub mod rect;
mod tiepoint;

#[doc(inline)]
pub use datatype::DataType;
#[doc(inline)]
pub use error::Error;
#[doc(inline)]
pub use geotransform::AffineGeoTransform;
#[doc(inline)]
pub use geotransform::GeoTransform;
pub use nodata::Nodata;
pub use nodata::SampleNum;
#[doc(inline)]
pub use position::GeoPosition;
#[doc(inline)]
pub use position::PixelPosition;
#[cfg(feature = "proj4rs")]
#[cfg_attr(docsrs, doc(cfg(feature = "proj4rs")))]
pub use projected::ProjectedGeoTransform;
#[doc(inline)]
pub use rastergrid::RasterGrid;
#[doc(inline)]
pub use rastersize::RasterSize;
#[doc(inline)]
pub use rect::PixelRect;
#[doc(inline)]
pub use tiepoint::TiePointGeoTransform;

pub type Point<T = f64> = geo_types::Point<T>;
