use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Raster dimensions do not match ({}x{}) <-> ({}x{})", .size1.0, .size1.1, .size2.0, .size2.1)]
    SizeMismatch {
        size1: (usize, usize),
        size2: (usize, usize),
    },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Runtime error: {0}")]
    Runtime(String),
    #[cfg(feature = "proj4rs")]
    #[error("Proj4rs error: {0}")]
    Proj4rsError(#[from] proj4rs::errors::Error),
}
