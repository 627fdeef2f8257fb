//! Domain type definitions and behavior.

use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};
use std::panic::RefUnwindSafe;

use num_traits::{FromPrimitive, Num, NumCast, ToPrimitive};
use tessera_error::TesseraResult;

use crate::CoordValue;

/// The scalar type of an array domain.
///
/// Every dimension of a schema shares the same domain type; ranges on a
/// dimension are pairs of this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainType {
    /// An 8-bit signed integer
    I8,
    /// A 16-bit signed integer
    I16,
    /// A 32-bit signed integer
    I32,
    /// A 64-bit signed integer
    I64,
    /// An 8-bit unsigned integer
    U8,
    /// A 16-bit unsigned integer
    U16,
    /// A 32-bit unsigned integer
    U32,
    /// A 64-bit unsigned integer
    U64,
    /// A 32-bit floating point number
    F32,
    /// A 64-bit floating point number
    F64,
}

/// A trait for native Rust types that correspond 1:1 to a [`DomainType`].
pub trait NativeDomainType:
    Send
    + Sync
    + Clone
    + Copy
    + Debug
    + Display
    + PartialEq
    + PartialOrd
    + Default
    + RefUnwindSafe
    + Num
    + NumCast
    + FromPrimitive
    + ToPrimitive
    + ToBytes
    + TryFromBytes
    + Into<CoordValue>
    + 'static
{
    /// The [`DomainType`] that corresponds to this native type.
    const DOMAIN_TYPE: DomainType;

    /// Whether this instance (`self`) is NaN. Always `false` for integers.
    fn is_nan(self) -> bool;

    /// Compare another instance of this type to `self` with a total ordering.
    fn total_compare(self, other: Self) -> Ordering;
}

macro_rules! native_domain_type {
    ($T:ty, $dt:tt) => {
        impl NativeDomainType for $T {
            const DOMAIN_TYPE: DomainType = DomainType::$dt;

            fn is_nan(self) -> bool {
                false
            }

            fn total_compare(self, other: Self) -> Ordering {
                self.cmp(&other)
            }
        }
    };
}

macro_rules! native_float_domain_type {
    ($T:ty, $dt:tt) => {
        impl NativeDomainType for $T {
            const DOMAIN_TYPE: DomainType = DomainType::$dt;

            fn is_nan(self) -> bool {
                <$T>::is_nan(self)
            }

            fn total_compare(self, other: Self) -> Ordering {
                self.total_cmp(&other)
            }
        }
    };
}

native_domain_type!(i8, I8);
native_domain_type!(i16, I16);
native_domain_type!(i32, I32);
native_domain_type!(i64, I64);
native_domain_type!(u8, U8);
native_domain_type!(u16, U16);
native_domain_type!(u32, U32);
native_domain_type!(u64, U64);
native_float_domain_type!(f32, F32);
native_float_domain_type!(f64, F64);

/// Macro to match over each [`DomainType`], binding the corresponding native
/// type in the body.
#[macro_export]
macro_rules! match_each_domain_type {
    ($self:expr, | $_:tt $enc:ident | $($body:tt)*) => ({
        macro_rules! __with__ {( $_ $enc:ident ) => ( $($body)* )}
        use $crate::DomainType;
        match $self {
            DomainType::I8 => __with__! { i8 },
            DomainType::I16 => __with__! { i16 },
            DomainType::I32 => __with__! { i32 },
            DomainType::I64 => __with__! { i64 },
            DomainType::U8 => __with__! { u8 },
            DomainType::U16 => __with__! { u16 },
            DomainType::U32 => __with__! { u32 },
            DomainType::U64 => __with__! { u64 },
            DomainType::F32 => __with__! { f32 },
            DomainType::F64 => __with__! { f64 },
        }
    })
}

/// Macro to match over each integer [`DomainType`], binding the corresponding
/// native type. Panics on float domain types; callers guard with
/// [`DomainType::is_integer`].
#[macro_export]
macro_rules! match_each_integer_domain_type {
    ($self:expr, | $_:tt $enc:ident | $($body:tt)*) => ({
        macro_rules! __with__ {( $_ $enc:ident ) => ( $($body)* )}
        use $crate::DomainType;
        match $self {
            DomainType::I8 => __with__! { i8 },
            DomainType::I16 => __with__! { i16 },
            DomainType::I32 => __with__! { i32 },
            DomainType::I64 => __with__! { i64 },
            DomainType::U8 => __with__! { u8 },
            DomainType::U16 => __with__! { u16 },
            DomainType::U32 => __with__! { u32 },
            DomainType::U64 => __with__! { u64 },
            other => panic!("unsupported integer domain type {}", other),
        }
    })
}

impl DomainType {
    /// Returns `true` iff this domain type is an unsigned integer type.
    pub const fn is_unsigned_int(self) -> bool {
        matches!(self, Self::U8 | Self::U16 | Self::U32 | Self::U64)
    }

    /// Returns `true` iff this domain type is a signed integer type.
    pub const fn is_signed_int(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    /// Returns `true` iff this domain type is an integer type.
    pub const fn is_integer(self) -> bool {
        self.is_unsigned_int() || self.is_signed_int()
    }

    /// Returns `true` iff this domain type is a floating point type.
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Returns the number of bytes of one value of this domain type.
    pub const fn byte_width(&self) -> u64 {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }
}

impl Display for DomainType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::I8 => write!(f, "i8"),
            Self::I16 => write!(f, "i16"),
            Self::I32 => write!(f, "i32"),
            Self::I64 => write!(f, "i64"),
            Self::U8 => write!(f, "u8"),
            Self::U16 => write!(f, "u16"),
            Self::U32 => write!(f, "u32"),
            Self::U64 => write!(f, "u64"),
            Self::F32 => write!(f, "f32"),
            Self::F64 => write!(f, "f64"),
        }
    }
}

/// A trait for types that can be viewed as a little-endian byte slice.
pub trait ToBytes: Sized {
    /// Returns a view of this value's bytes in little-endian order.
    fn to_le_bytes(&self) -> &[u8];
}

/// A trait for types that can be read from a little-endian byte slice.
pub trait TryFromBytes: Sized {
    /// Attempts to decode a little-endian byte slice into this type.
    fn try_from_le_bytes(bytes: &[u8]) -> TesseraResult<Self>;
}

macro_rules! try_from_bytes {
    ($T:ty) => {
        impl ToBytes for $T {
            #[inline]
            #[allow(clippy::size_of_in_element_count)]
            fn to_le_bytes(&self) -> &[u8] {
                // Relies on the little-endian target enforced at the crate root.
                let raw_ptr = self as *const $T as *const u8;
                unsafe { std::slice::from_raw_parts(raw_ptr, std::mem::size_of::<$T>()) }
            }
        }

        impl TryFromBytes for $T {
            fn try_from_le_bytes(bytes: &[u8]) -> TesseraResult<Self> {
                Ok(<$T>::from_le_bytes(bytes.try_into().map_err(|_| {
                    tessera_error::tessera_err!(
                        Internal: "expected {} bytes for {}, got {}",
                        std::mem::size_of::<$T>(),
                        stringify!($T),
                        bytes.len()
                    )
                })?))
            }
        }
    };
}

try_from_bytes!(u8);
try_from_bytes!(u16);
try_from_bytes!(u32);
try_from_bytes!(u64);
try_from_bytes!(i8);
try_from_bytes!(i16);
try_from_bytes!(i32);
try_from_bytes!(i64);
try_from_bytes!(f32);
try_from_bytes!(f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_round_trip() {
        assert_eq!(u8::try_from_le_bytes(&42_u8.to_le_bytes()).unwrap(), 42);
        assert_eq!(u16::try_from_le_bytes(&42_u16.to_le_bytes()).unwrap(), 42);
        assert_eq!(u32::try_from_le_bytes(&42_u32.to_le_bytes()).unwrap(), 42);
        assert_eq!(u64::try_from_le_bytes(&42_u64.to_le_bytes()).unwrap(), 42);
        assert_eq!(i8::try_from_le_bytes(&(-5_i8).to_le_bytes()).unwrap(), -5);
        assert_eq!(i64::try_from_le_bytes(&(-5_i64).to_le_bytes()).unwrap(), -5);
        assert_eq!(
            f32::try_from_le_bytes(&42.5_f32.to_le_bytes()).unwrap(),
            42.5
        );
        assert_eq!(
            f64::try_from_le_bytes(&42.5_f64.to_le_bytes()).unwrap(),
            42.5
        );
    }

    #[test]
    fn truncated_bytes_error() {
        assert!(u32::try_from_le_bytes(&[1, 2]).is_err());
    }

    #[test]
    fn widths() {
        assert_eq!(DomainType::U8.byte_width(), 1);
        assert_eq!(DomainType::I16.byte_width(), 2);
        assert_eq!(DomainType::U32.byte_width(), 4);
        assert_eq!(DomainType::F32.byte_width(), 4);
        assert_eq!(DomainType::I64.byte_width(), 8);
        assert_eq!(DomainType::F64.byte_width(), 8);
    }

    #[test]
    fn classification() {
        assert!(DomainType::U64.is_unsigned_int());
        assert!(DomainType::I32.is_signed_int());
        assert!(DomainType::I32.is_integer());
        assert!(!DomainType::F64.is_integer());
        assert!(DomainType::F32.is_float());
    }

    #[test]
    fn float_nan_total_order() {
        let a = f32::NAN;
        let b = f32::NAN;
        assert_ne!(a, b);
        assert!(<f32 as NativeDomainType>::is_nan(a));
        assert_eq!(
            <f32 as NativeDomainType>::total_compare(a, b),
            std::cmp::Ordering::Equal
        );
    }

    #[test]
    fn dispatch_binds_native_type() {
        let width = match_each_domain_type!(DomainType::I16, |$T| {
            std::mem::size_of::<$T>()
        });
        assert_eq!(width, 2);

        let int_width = match_each_integer_domain_type!(DomainType::U32, |$T| {
            std::mem::size_of::<$T>()
        });
        assert_eq!(int_width, 4);
    }

    #[test]
    #[should_panic(expected = "unsupported integer domain type")]
    fn integer_dispatch_rejects_floats() {
        match_each_integer_domain_type!(DomainType::F64, |$T| {
            let _ = std::mem::size_of::<$T>();
        });
    }
}
