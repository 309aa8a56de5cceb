use geo::{PixelRect, RasterSize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Geo(#[from] geo::Error),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Runtime error: {0}")]
    Runtime(String),
    /// A source window outside of the grid was requested, this indicates a bug in the window computation
    #[error("Window {rect} of band '{band}' is outside of grid '{grid}' {grid_size}")]
    GridContractViolation {
        grid: String,
        band: String,
        rect: PixelRect,
        grid_size: RasterSize,
    },
    #[error("Failed to compute tile {tile} of band '{band}': {source}")]
    TileFailed {
        tile: PixelRect,
        band: String,
        source: Box<Error>,
    },
}
