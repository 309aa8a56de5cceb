#![cfg_attr(docsrs, feature(doc_cfg))]

//! Collocation of geocoded raster products.
//!
//! The [`geo`] crate provides the geo-coding primitives (pixel and geographic positions, the `GeoTransform`
//! implementations), the [`collocate`] crate the resampling kernels and the tile based collocation engine.

pub use collocate;
pub use geo;

pub use collocate::{CancellationToken, CollocationEngine, CollocationOptions, ResamplingMethod, RunSummary};
