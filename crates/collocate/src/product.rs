use std::sync::Arc;

use geo::{DataType, RasterGrid};

use crate::{SampleDecoder, SampleSource};

/// How the integer samples of a band are to be interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleCoding {
    /// Continuous measurements
    #[default]
    None,
    /// Bit flags
    Flag,
    /// Class codes
    Index,
}

/// Conversion of raw samples to geophysical values: `raw * factor + offset`, raised to the power of 10 for log10 scaled bands.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scaling {
    pub factor: f64,
    pub offset: f64,
    pub log10: bool,
}

impl Default for Scaling {
    fn default() -> Self {
        Scaling {
            factor: 1.0,
            offset: 0.0,
            log10: false,
        }
    }
}

impl Scaling {
    pub fn linear(factor: f64, offset: f64) -> Self {
        Scaling {
            factor,
            offset,
            log10: false,
        }
    }

    pub fn log10(factor: f64, offset: f64) -> Self {
        Scaling { factor, offset, log10: true }
    }

    pub fn is_identity(&self) -> bool {
        self.factor == 1.0 && self.offset == 0.0 && !self.log10
    }

    #[inline]
    pub fn apply(&self, raw: f64) -> f64 {
        let value = raw * self.factor + self.offset;
        if self.log10 { 10f64.powf(value) } else { value }
    }
}

/// Description of a band of a source product
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BandDescriptor {
    pub name: String,
    pub data_type: DataType,
    /// Raw no-data sentinel, only taken into account when `nodata_used` is set
    pub nodata: f64,
    pub nodata_used: bool,
    pub scaling: Scaling,
    pub coding: SampleCoding,
    /// Expression that decides which pixels of the band are valid, evaluated by the producer of the samples
    pub valid_pixel_expression: Option<String>,
}

impl BandDescriptor {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        BandDescriptor {
            name: name.into(),
            data_type,
            nodata: 0.0,
            nodata_used: false,
            scaling: Scaling::default(),
            coding: SampleCoding::None,
            valid_pixel_expression: None,
        }
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = nodata;
        self.nodata_used = true;
        self
    }

    pub fn with_scaling(mut self, scaling: Scaling) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn with_flag_coding(mut self) -> Self {
        self.coding = SampleCoding::Flag;
        self
    }

    pub fn with_index_coding(mut self) -> Self {
        self.coding = SampleCoding::Index;
        self
    }

    pub fn with_valid_pixel_expression(mut self, expression: impl Into<String>) -> Self {
        self.valid_pixel_expression = Some(expression.into());
        self
    }

    /// Categorical bands carry codes or flags that must never be interpolated
    pub fn is_categorical(&self) -> bool {
        self.coding != SampleCoding::None
    }

    pub fn has_valid_pixel_expression(&self) -> bool {
        self.valid_pixel_expression.as_ref().is_some_and(|expr| !expr.trim().is_empty())
    }

    /// The raw no-data sentinel, `None` when no-data is not used for this band
    pub fn raw_nodata(&self) -> Option<f64> {
        self.nodata_used.then_some(self.nodata)
    }

    /// The no-data value expressed in the geophysical domain, NaN when no-data is not used
    pub fn geophysical_nodata(&self) -> f64 {
        self.raw_nodata().map_or(f64::NAN, |nodata| self.scaling.apply(nodata))
    }

    pub fn decoder(&self) -> SampleDecoder {
        SampleDecoder::new(self.raw_nodata(), self.scaling)
    }
}

/// A product taking part in a collocation: its grid, the band descriptions and the sample reader
#[derive(Clone)]
pub struct SourceProduct {
    pub name: String,
    pub grid: RasterGrid,
    pub bands: Vec<BandDescriptor>,
    pub source: Arc<dyn SampleSource>,
}

impl SourceProduct {
    pub fn new(name: impl Into<String>, grid: RasterGrid, bands: Vec<BandDescriptor>, source: Arc<dyn SampleSource>) -> Self {
        SourceProduct {
            name: name.into(),
            grid,
            bands,
            source,
        }
    }
}

impl std::fmt::Debug for SourceProduct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceProduct")
            .field("name", &self.name)
            .field("grid", &self.grid)
            .field("bands", &self.bands)
            .finish_non_exhaustive()
    }
}
