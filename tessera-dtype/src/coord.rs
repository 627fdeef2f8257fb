//! Tagged coordinate values.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use num_traits::NumCast;
use paste::paste;

use crate::{DomainType, NativeDomainType, ToBytes};

/// A single coordinate, tagged with its [`DomainType`].
///
/// Used at the typed/untyped boundary of the public API: range endpoints and
/// MBR corners cross it as `CoordValue`s and are cast back to the native type
/// at the per-operation dispatch point.
#[derive(Debug, Clone, Copy)]
pub enum CoordValue {
    /// An `i8` coordinate.
    I8(i8),
    /// An `i16` coordinate.
    I16(i16),
    /// An `i32` coordinate.
    I32(i32),
    /// An `i64` coordinate.
    I64(i64),
    /// A `u8` coordinate.
    U8(u8),
    /// A `u16` coordinate.
    U16(u16),
    /// A `u32` coordinate.
    U32(u32),
    /// A `u64` coordinate.
    U64(u64),
    /// An `f32` coordinate.
    F32(f32),
    /// An `f64` coordinate.
    F64(f64),
}

macro_rules! coord_value_from {
    ($T:ty, $variant:tt) => {
        impl From<$T> for CoordValue {
            fn from(value: $T) -> Self {
                CoordValue::$variant(value)
            }
        }
    };
}

coord_value_from!(i8, I8);
coord_value_from!(i16, I16);
coord_value_from!(i32, I32);
coord_value_from!(i64, I64);
coord_value_from!(u8, U8);
coord_value_from!(u16, U16);
coord_value_from!(u32, U32);
coord_value_from!(u64, U64);
coord_value_from!(f32, F32);
coord_value_from!(f64, F64);

macro_rules! for_each_coord_variant {
    ($self:expr, $v:ident => $body:expr) => {
        match $self {
            CoordValue::I8($v) => $body,
            CoordValue::I16($v) => $body,
            CoordValue::I32($v) => $body,
            CoordValue::I64($v) => $body,
            CoordValue::U8($v) => $body,
            CoordValue::U16($v) => $body,
            CoordValue::U32($v) => $body,
            CoordValue::U64($v) => $body,
            CoordValue::F32($v) => $body,
            CoordValue::F64($v) => $body,
        }
    };
}

macro_rules! as_coord {
    ($T:ty) => {
        paste! {
            #[doc = "Access the coordinate as `" $T "`, `None` if the conversion is lossy."]
            pub fn [<as_ $T>](self) -> Option<$T> {
                self.cast::<$T>()
            }
        }
    };
}

impl CoordValue {
    /// The [`DomainType`] tag of this value.
    pub fn domain_type(&self) -> DomainType {
        match self {
            Self::I8(_) => DomainType::I8,
            Self::I16(_) => DomainType::I16,
            Self::I32(_) => DomainType::I32,
            Self::I64(_) => DomainType::I64,
            Self::U8(_) => DomainType::U8,
            Self::U16(_) => DomainType::U16,
            Self::U32(_) => DomainType::U32,
            Self::U64(_) => DomainType::U64,
            Self::F32(_) => DomainType::F32,
            Self::F64(_) => DomainType::F64,
        }
    }

    /// Cast the value to a native domain type, `None` if the conversion is
    /// not value-preserving.
    pub fn cast<T: NativeDomainType>(self) -> Option<T> {
        for_each_coord_variant!(self, v => <T as NumCast>::from(v))
    }

    as_coord!(u64);
    as_coord!(i64);
    as_coord!(f64);

    /// View the value's bytes in little-endian order.
    pub fn to_le_bytes(&self) -> &[u8] {
        for_each_coord_variant!(self, v => v.to_le_bytes())
    }

    /// Total-order comparison; `None` when the tags differ.
    pub fn total_compare(&self, other: &Self) -> Option<Ordering> {
        macro_rules! same {
            ($($variant:tt),*) => {
                match (self, other) {
                    $( (Self::$variant(a), Self::$variant(b)) => Some(a.total_compare(*b)), )*
                    _ => None,
                }
            };
        }
        same!(I8, I16, I32, I64, U8, U16, U32, U64, F32, F64)
    }
}

impl Display for CoordValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for_each_coord_variant!(self, v => write!(f, "{v}"))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(CoordValue::U8(7), DomainType::U8)]
    #[case(CoordValue::I32(-7), DomainType::I32)]
    #[case(CoordValue::F64(0.5), DomainType::F64)]
    fn tags(#[case] value: CoordValue, #[case] expected: DomainType) {
        assert_eq!(value.domain_type(), expected);
    }

    #[test]
    fn lossless_casts() {
        assert_eq!(CoordValue::U8(200).as_u64(), Some(200));
        assert_eq!(CoordValue::I64(-1).as_i64(), Some(-1));
        assert_eq!(CoordValue::F32(1.5).as_f64(), Some(1.5));
        // Negative to unsigned is lossy.
        assert_eq!(CoordValue::I8(-1).as_u64(), None);
    }

    #[test]
    fn compare_same_tag_only() {
        let a = CoordValue::U64(3);
        let b = CoordValue::U64(9);
        assert_eq!(a.total_compare(&b), Some(Ordering::Less));
        assert_eq!(a.total_compare(&CoordValue::I64(9)), None);
    }

    #[test]
    fn bytes_match_native_encoding() {
        assert_eq!(CoordValue::U16(0x0201).to_le_bytes(), &[0x01, 0x02]);
    }
}
