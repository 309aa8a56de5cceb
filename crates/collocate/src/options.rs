use geo::RasterSize;

use crate::{Error, ResamplingMethod, Result};

pub const ORIGINAL_NAME_REFERENCE: &str = "${ORIGINAL_NAME}";
pub const SLAVE_NUMBER_ID_REFERENCE: &str = "${SLAVE_NUMBER_ID}";
pub const DEFAULT_MASTER_COMPONENT_PATTERN: &str = "${ORIGINAL_NAME}_M";
pub const DEFAULT_SLAVE_COMPONENT_PATTERN: &str = "${ORIGINAL_NAME}_S${SLAVE_NUMBER_ID}";
pub const DEFAULT_TILE_SIZE: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NumThreads {
    AllCpus,
    Count(usize),
}

impl NumThreads {
    /// The requested thread count, `None` lets the thread pool decide
    pub fn count(&self) -> Option<usize> {
        match self {
            NumThreads::AllCpus => None,
            NumThreads::Count(val) => Some(*val),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CollocationOptions {
    /// The method used to resample the slave bands onto the master grid, categorical bands always use nearest neighbour
    /// (default = `ResamplingMethod::NearestNeighbour`)
    pub resampling: ResamplingMethod,
    /// Apply the `master_component_pattern` to the names of the master bands (default = true)
    pub rename_master_components: bool,
    /// Apply the `slave_component_pattern` to the names of the slave bands (default = true)
    pub rename_slave_components: bool,
    /// Pattern for renamed master bands, `${ORIGINAL_NAME}` is replaced by the band name (default = `${ORIGINAL_NAME}_M`)
    pub master_component_pattern: String,
    /// Pattern for renamed slave bands, `${ORIGINAL_NAME}` is replaced by the band name and `${SLAVE_NUMBER_ID}`
    /// by the index of the slave when there are multiple slaves (default = `${ORIGINAL_NAME}_S${SLAVE_NUMBER_ID}`)
    pub slave_component_pattern: String,
    /// Size of the tiles the master grid is divided in (default = 512x512)
    pub tile_size: RasterSize,
    /// Configure how many threads to use for processing the tiles (default = `NumThreads::Count(1)`)
    pub num_threads: NumThreads,
    /// Linear interpolation threshold in source pixels for the pixel mapping, 0 transforms every pixel exactly (default = 0.0)
    pub error_threshold: f64,
}

impl Default for CollocationOptions {
    fn default() -> Self {
        Self {
            resampling: ResamplingMethod::default(),
            rename_master_components: true,
            rename_slave_components: true,
            master_component_pattern: DEFAULT_MASTER_COMPONENT_PATTERN.to_string(),
            slave_component_pattern: DEFAULT_SLAVE_COMPONENT_PATTERN.to_string(),
            tile_size: RasterSize::square(DEFAULT_TILE_SIZE),
            num_threads: NumThreads::Count(1),
            error_threshold: 0.0,
        }
    }
}

impl CollocationOptions {
    pub fn validate(&self) -> Result<()> {
        if self.rename_master_components && self.master_component_pattern.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "master_component_pattern must be set to a non-empty pattern when renaming master components".into(),
            ));
        }

        if self.rename_slave_components && self.slave_component_pattern.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "slave_component_pattern must be set to a non-empty pattern when renaming slave components".into(),
            ));
        }

        if self.tile_size.is_empty() {
            return Err(Error::InvalidArgument(format!("Invalid tile size: {}", self.tile_size)));
        }

        if self.num_threads == NumThreads::Count(0) {
            return Err(Error::InvalidArgument("Thread count must be at least 1".into()));
        }

        if !self.error_threshold.is_finite() || self.error_threshold < 0.0 {
            return Err(Error::InvalidArgument(format!("Invalid error threshold: {}", self.error_threshold)));
        }

        self.resampling.validate()
    }
}
