use crate::{BandDescriptor, ResamplingMethod, SampleDecoder};

/// How the samples of a band are resampled: the kernel, the decoding of the raw samples
/// and the value written for pixels without a valid result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandResamplingPolicy {
    pub method: ResamplingMethod,
    pub decoder: SampleDecoder,
    /// No-data value of the destination band in the geophysical domain
    pub nodata: f64,
}

impl BandResamplingPolicy {
    /// Flag and index coded bands, and bands with a valid pixel expression, are never interpolated.
    pub fn resolve(band: &BandDescriptor, configured: ResamplingMethod) -> Self {
        let method = if band.is_categorical() || band.has_valid_pixel_expression() {
            ResamplingMethod::NearestNeighbour
        } else {
            configured
        };

        if method != configured {
            log::debug!("Band '{}' is resampled with {method} instead of {configured}", band.name);
        }

        BandResamplingPolicy {
            method,
            decoder: band.decoder(),
            nodata: band.geophysical_nodata(),
        }
    }

    /// Policy for bands that are copied without resampling
    pub fn copy(band: &BandDescriptor) -> Self {
        Self::resolve(band, ResamplingMethod::NearestNeighbour)
    }

    /// The value to write for a resampling result, invalid and NaN results become no-data
    #[inline]
    pub fn output_value(&self, value: Option<f64>) -> f64 {
        match value {
            Some(v) if !v.is_nan() => v,
            _ => self.nodata,
        }
    }
}
