//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Every element type reserves one value as its *undefined* sentinel:
/// `NaN` for floats and the minimum representable value for integers.
/// Cells holding the sentinel are skipped by statistics and written by
/// operations that cannot produce a value for a cell.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Sentinel marking a cell without a value
    fn undefined() -> Self;

    /// Check if this value is the undefined sentinel
    fn is_undefined(&self) -> bool;

    /// Whether this type is a floating point type
    fn is_float() -> bool;

    /// Convert to f64; the undefined sentinel maps to `NaN`
    fn to_f64(self) -> f64 {
        if self.is_undefined() {
            return f64::NAN;
        }
        NumCast::from(self).unwrap_or(f64::NAN)
    }

    /// Convert from f64, saturating to the representable range.
    ///
    /// `NaN` maps to the undefined sentinel.
    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_raster_element_int {
    ($t:ty) => {
        impl RasterElement for $t {
            fn undefined() -> Self {
                <$t>::MIN
            }

            fn is_undefined(&self) -> bool {
                *self == <$t>::MIN
            }

            fn is_float() -> bool {
                false
            }

            fn from_f64(value: f64) -> Self {
                if value.is_nan() {
                    return Self::undefined();
                }
                // `as` saturates on overflow; MIN stays reserved for undefined
                let v = value as $t;
                if v == <$t>::MIN { v + 1 } else { v }
            }
        }
    };
}

macro_rules! impl_raster_element_unsigned {
    ($t:ty) => {
        impl RasterElement for $t {
            // Unsigned cells have no spare value below zero, so MAX is reserved
            fn undefined() -> Self {
                <$t>::MAX
            }

            fn is_undefined(&self) -> bool {
                *self == <$t>::MAX
            }

            fn is_float() -> bool {
                false
            }

            fn from_f64(value: f64) -> Self {
                if value.is_nan() {
                    return Self::undefined();
                }
                let v = value as $t;
                if v == <$t>::MAX { v - 1 } else { v }
            }
        }
    };
}

macro_rules! impl_raster_element_float {
    ($t:ty) => {
        impl RasterElement for $t {
            fn undefined() -> Self {
                <$t>::NAN
            }

            fn is_undefined(&self) -> bool {
                self.is_nan()
            }

            fn is_float() -> bool {
                true
            }

            fn from_f64(value: f64) -> Self {
                value as $t
            }
        }
    };
}

impl_raster_element_int!(i16);
impl_raster_element_int!(i32);
impl_raster_element_int!(i64);
impl_raster_element_unsigned!(u8);
impl_raster_element_unsigned!(u16);
impl_raster_element_float!(f32);
impl_raster_element_float!(f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_sentinel_is_reserved() {
        assert!(i32::undefined().is_undefined());
        assert_eq!(<i32 as RasterElement>::from_f64(-1e300), i32::MIN + 1);
        assert!(<i32 as RasterElement>::from_f64(f64::NAN).is_undefined());
        assert!(i32::undefined().to_f64().is_nan());
    }

    #[test]
    fn test_u8_saturates_below_sentinel() {
        assert_eq!(<u8 as RasterElement>::from_f64(300.0), 254);
        assert_eq!(<u8 as RasterElement>::from_f64(-5.0), 0);
        assert!(u8::undefined().is_undefined());
    }

    #[test]
    fn test_float_roundtrip() {
        assert_eq!(<f64 as RasterElement>::from_f64(12.5), 12.5);
        assert!(f32::undefined().is_undefined());
    }
}
