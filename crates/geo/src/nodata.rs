use num::{NumCast, ToPrimitive};

use crate::DataType;

/// Trait for types that can carry a no-data sentinel in raster data.
///
/// Unlike a plain `==` comparison, floating point types consider a NaN sample equal to a NaN sentinel.
pub trait Nodata: ToPrimitive + PartialEq + Sized + Copy {
    #[inline]
    fn is_nodata_value(self, nodata: Self) -> bool {
        self == nodata
    }

    fn has_nan() -> bool;
}

/// Sample types that can be stored in a band
pub trait SampleNum: Nodata + NumCast + std::fmt::Debug + Send + Sync + 'static {
    const TYPE: DataType;

    /// Converts a sentinel expressed as f64 to the sample type, `None` if it is not representable
    fn nodata_from_f64(nodata: f64) -> Option<Self> {
        if nodata.is_nan() {
            return None;
        }

        let value: Self = NumCast::from(nodata)?;
        // reject sentinels that would be truncated (e.g. 1.5 for an integer band)
        (value.to_f64()? == nodata).then_some(value)
    }
}

macro_rules! impl_nodata_fixed_point {
    ( $t:ident, $data_type:ident ) => {
        impl Nodata for $t {
            fn has_nan() -> bool {
                false
            }
        }

        impl SampleNum for $t {
            const TYPE: DataType = DataType::$data_type;
        }
    };
}

macro_rules! impl_nodata_floating_point {
    ( $t:ident, $data_type:ident ) => {
        impl Nodata for $t {
            #[inline]
            fn is_nodata_value(self, nodata: Self) -> bool {
                self == nodata || (self.is_nan() && nodata.is_nan())
            }

            fn has_nan() -> bool {
                true
            }
        }

        impl SampleNum for $t {
            const TYPE: DataType = DataType::$data_type;

            fn nodata_from_f64(nodata: f64) -> Option<Self> {
                // floating point sentinels are rounded to the nearest representable value
                Some(nodata as $t)
            }
        }
    };
}

impl_nodata_fixed_point!(u8, Uint8);
impl_nodata_fixed_point!(u16, Uint16);
impl_nodata_fixed_point!(u32, Uint32);
impl_nodata_fixed_point!(i8, Int8);
impl_nodata_fixed_point!(i16, Int16);
impl_nodata_fixed_point!(i32, Int32);

impl_nodata_floating_point!(f32, Float32);
impl_nodata_floating_point!(f64, Float64);
