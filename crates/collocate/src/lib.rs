#![warn(clippy::unwrap_used)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Collocation of geocoded raster products: the bands of one or more slave products are resampled
//! onto the grid of a master product, tile by tile.

pub type Result<T = ()> = std::result::Result<T, Error>;

mod engine;
mod error;
mod mapper;
pub mod naming;
mod options;
mod policy;
mod product;
pub mod resampling;
pub mod sampledata;
mod samplesource;
mod sink;

#[cfg(test)]
mod testutils;

#[doc(inline)]
pub use engine::CancellationToken;
#[doc(inline)]
pub use engine::CollocationEngine;
#[doc(inline)]
pub use engine::RunSummary;
#[doc(inline)]
pub use error::Error;
#[doc(inline)]
pub use mapper::PixelMapper;
#[doc(inline)]
pub use mapper::TileMapping;
#[doc(inline)]
pub use naming::TargetBand;
#[doc(inline)]
pub use naming::TargetBandSource;
#[doc(inline)]
pub use options::CollocationOptions;
#[doc(inline)]
pub use options::NumThreads;
#[doc(inline)]
pub use policy::BandResamplingPolicy;
#[doc(inline)]
pub use product::BandDescriptor;
#[doc(inline)]
pub use product::SampleCoding;
#[doc(inline)]
pub use product::Scaling;
#[doc(inline)]
pub use product::SourceProduct;
#[doc(inline)]
pub use resampling::ResamplingMethod;
#[doc(inline)]
pub use sampledata::SampleBuffer;
#[doc(inline)]
pub use sampledata::SampleData;
#[doc(inline)]
pub use sampledata::SampleDecoder;
#[doc(inline)]
pub use sampledata::SampleWindow;
#[doc(inline)]
pub use samplesource::MemorySampleSource;
#[doc(inline)]
pub use samplesource::SampleSource;
#[doc(inline)]
pub use sink::MemoryTileSink;
#[doc(inline)]
pub use sink::TileSink;
