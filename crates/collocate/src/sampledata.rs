//! Type-erased sample storage and decoding of raw samples to the geophysical domain.

use geo::{DataType, PixelRect, RasterSize, SampleNum};

use crate::{Error, Result, product::Scaling};

/// Macro to dispatch on `SampleData` variants and apply an expression to the inner vector.
///
/// # Example
///
/// ```ignore
/// let len = dispatch_sampledata!(data, vec, vec.len());
/// ```
#[macro_export]
macro_rules! dispatch_sampledata {
    ($data:expr, $var:ident, $expr:expr) => {
        match $data {
            $crate::SampleData::U8($var) => $expr,
            $crate::SampleData::I8($var) => $expr,
            $crate::SampleData::U16($var) => $expr,
            $crate::SampleData::I16($var) => $expr,
            $crate::SampleData::U32($var) => $expr,
            $crate::SampleData::I32($var) => $expr,
            $crate::SampleData::F32($var) => $expr,
            $crate::SampleData::F64($var) => $expr,
        }
    };
}

/// Macro to dispatch on `SampleData` variants and wrap the result back in the same variant.
#[macro_export]
macro_rules! apply_to_sampledata {
    ($data:expr, $var:ident, $expr:expr) => {
        match $data {
            $crate::SampleData::U8($var) => $crate::SampleData::U8($expr),
            $crate::SampleData::I8($var) => $crate::SampleData::I8($expr),
            $crate::SampleData::U16($var) => $crate::SampleData::U16($expr),
            $crate::SampleData::I16($var) => $crate::SampleData::I16($expr),
            $crate::SampleData::U32($var) => $crate::SampleData::U32($expr),
            $crate::SampleData::I32($var) => $crate::SampleData::I32($expr),
            $crate::SampleData::F32($var) => $crate::SampleData::F32($expr),
            $crate::SampleData::F64($var) => $crate::SampleData::F64($expr),
        }
    };
}

/// Dense row-major samples in their native numeric type
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl SampleData {
    pub fn data_type(&self) -> DataType {
        match self {
            SampleData::U8(_) => DataType::Uint8,
            SampleData::I8(_) => DataType::Int8,
            SampleData::U16(_) => DataType::Uint16,
            SampleData::I16(_) => DataType::Int16,
            SampleData::U32(_) => DataType::Uint32,
            SampleData::I32(_) => DataType::Int32,
            SampleData::F32(_) => DataType::Float32,
            SampleData::F64(_) => DataType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        dispatch_sampledata!(self, data, data.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the samples inside `rect` out of a raster with `cols` columns
    pub fn copy_window(&self, cols: usize, rect: PixelRect) -> SampleData {
        apply_to_sampledata!(self, data, copy_window(data, cols, rect))
    }
}

macro_rules! impl_from_vec {
    ( $t:ty, $variant:ident ) => {
        impl From<Vec<$t>> for SampleData {
            fn from(data: Vec<$t>) -> Self {
                SampleData::$variant(data)
            }
        }
    };
}

impl_from_vec!(u8, U8);
impl_from_vec!(i8, I8);
impl_from_vec!(u16, U16);
impl_from_vec!(i16, I16);
impl_from_vec!(u32, U32);
impl_from_vec!(i32, I32);
impl_from_vec!(f32, F32);
impl_from_vec!(f64, F64);

fn copy_window<T: Copy>(data: &[T], cols: usize, rect: PixelRect) -> Vec<T> {
    let width = rect.width as usize;
    let mut result = Vec::with_capacity(rect.pixel_count());
    for row in rect.y..rect.y + rect.height {
        let start = row as usize * cols + rect.x as usize;
        result.extend_from_slice(&data[start..start + width]);
    }

    result
}

/// A window of raw samples read from a band, `rect` locates the window in the grid of the band.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    rect: PixelRect,
    stride: usize,
    data: SampleData,
}

impl SampleBuffer {
    pub fn new(rect: PixelRect, data: SampleData) -> Result<Self> {
        Self::with_stride(rect, rect.width.max(0) as usize, data)
    }

    /// Buffer with `stride` samples between the starts of consecutive rows
    pub fn with_stride(rect: PixelRect, stride: usize, data: SampleData) -> Result<Self> {
        let width = rect.width.max(0) as usize;
        let rows = rect.height.max(0) as usize;
        let required = if rows == 0 { 0 } else { (rows - 1) * stride + width };

        if stride < width || data.len() < required {
            return Err(Error::InvalidArgument(format!(
                "Sample buffer for {rect} with stride {stride} needs {required} samples, got {}",
                data.len()
            )));
        }

        Ok(SampleBuffer { rect, stride, data })
    }

    pub fn rect(&self) -> PixelRect {
        self.rect
    }

    pub fn width(&self) -> usize {
        self.rect.width as usize
    }

    pub fn height(&self) -> usize {
        self.rect.height as usize
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn data(&self) -> &SampleData {
        &self.data
    }

    /// Decodes the raw samples into geophysical values, no-data samples become `None`.
    /// `grid_size` is the size of the grid the samples were read from, kernels clamp their neighbourhood to it.
    pub fn decode(&self, decoder: &SampleDecoder, grid_size: RasterSize) -> SampleWindow {
        let values = dispatch_sampledata!(&self.data, data, decoder.decode_rows(data, self.rect, self.stride));
        SampleWindow {
            rect: self.rect,
            grid_size,
            values,
        }
    }
}

/// Converts raw samples of a band to geophysical values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleDecoder {
    nodata: Option<f64>,
    scaling: Scaling,
}

impl SampleDecoder {
    /// `nodata` is the raw no-data sentinel when no-data is used for the band
    pub fn new(nodata: Option<f64>, scaling: Scaling) -> Self {
        SampleDecoder { nodata, scaling }
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    pub fn scaling(&self) -> Scaling {
        self.scaling
    }

    /// Decodes a single raw sample
    pub fn decode<T: SampleNum>(&self, raw: T) -> Option<f64> {
        let nodata = self.nodata.and_then(native_nodata::<T>);
        decode_sample(raw, nodata, &self.scaling)
    }

    fn decode_rows<T: SampleNum>(&self, data: &[T], rect: PixelRect, stride: usize) -> Vec<Option<f64>> {
        // the sentinel is compared in the native type, NaN sentinels match NaN samples
        let nodata = self.nodata.and_then(native_nodata::<T>);
        let width = rect.width.max(0) as usize;

        let mut values = Vec::with_capacity(rect.pixel_count());
        for row in 0..rect.height.max(0) as usize {
            let start = row * stride;
            values.extend(data[start..start + width].iter().map(|&raw| decode_sample(raw, nodata, &self.scaling)));
        }

        values
    }
}

fn native_nodata<T: SampleNum>(nodata: f64) -> Option<T> {
    if nodata.is_nan() {
        // only floating point types can represent a NaN sentinel
        return T::has_nan().then(|| num::NumCast::from(nodata)).flatten();
    }

    T::nodata_from_f64(nodata)
}

#[inline]
fn decode_sample<T: SampleNum>(raw: T, nodata: Option<T>, scaling: &Scaling) -> Option<f64> {
    if nodata.is_some_and(|nodata| raw.is_nodata_value(nodata)) {
        return None;
    }

    Some(scaling.apply(raw.to_f64()?))
}

/// Decoded window of geophysical samples, the neighbourhood accessor of the resampling kernels
#[derive(Debug, Clone, PartialEq)]
pub struct SampleWindow {
    rect: PixelRect,
    grid_size: RasterSize,
    values: Vec<Option<f64>>,
}

/// A kernel requested a sample that is not part of the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutsideWindow {
    pub col: i32,
    pub row: i32,
}

impl SampleWindow {
    pub fn new(rect: PixelRect, grid_size: RasterSize, values: Vec<Option<f64>>) -> Result<Self> {
        if values.len() != rect.pixel_count() {
            return Err(Error::InvalidArgument(format!(
                "Window {rect} needs {} values, got {}",
                rect.pixel_count(),
                values.len()
            )));
        }

        Ok(SampleWindow { rect, grid_size, values })
    }

    pub fn rect(&self) -> PixelRect {
        self.rect
    }

    pub fn grid_size(&self) -> RasterSize {
        self.grid_size
    }

    /// Sample at the given grid coordinates, indices outside of the grid are clamped to the nearest edge pixel.
    #[inline]
    pub fn clamped_sample(&self, col: i32, row: i32) -> std::result::Result<Option<f64>, OutsideWindow> {
        let col = col.clamp(0, (self.grid_size.cols as i32 - 1).max(0));
        let row = row.clamp(0, (self.grid_size.rows as i32 - 1).max(0));
        self.sample(col, row)
    }

    /// Sample at the given grid coordinates
    #[inline]
    pub fn sample(&self, col: i32, row: i32) -> std::result::Result<Option<f64>, OutsideWindow> {
        if !self.rect.contains_pixel(col, row) {
            return Err(OutsideWindow { col, row });
        }

        let index = (row - self.rect.y) as usize * self.rect.width as usize + (col - self.rect.x) as usize;
        Ok(self.values[index])
    }

    /// The decoded values, row-major
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Consumes the window, returning the decoded values
    pub fn into_values(self) -> Vec<Option<f64>> {
        self.values
    }
}
