#![deny(missing_docs)]

//! Error handling for the tessera array engine.
//!
//! Every fallible operation in the workspace returns [`TesseraResult`]. The
//! [`tessera_err!`] and [`tessera_bail!`] macros construct and early-return
//! errors with formatted context; the [`TesseraExpect`] and [`TesseraUnwrap`]
//! extension traits are for unwrapping values that are infallible by
//! construction (lock acquisition, in-bounds indexing) while still logging a
//! useful message if the impossible happens.

use std::fmt::Debug;

/// A [`Result`] whose error type is [`TesseraError`].
pub type TesseraResult<T> = Result<T, TesseraError>;

/// The error type used across the tessera crates.
///
/// Variants correspond to the distinct recoverable failure classes of the
/// read-query core; all of them carry a human-readable message.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TesseraError {
    /// A dimension index was out of bounds for the array schema.
    #[error("invalid dimension: {0}")]
    InvalidDimension(String),
    /// A range was inverted, out of the dimension domain, or NaN-bounded.
    #[error("invalid range: {0}")]
    InvalidRange(String),
    /// An attribute name is unknown, or was used in the wrong
    /// fixed-size/var-size form.
    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),
    /// The coordinate type is not one of the supported scalar types.
    #[error("unsupported domain type: {0}")]
    UnsupportedDomainType(String),
    /// The operation is not available for dense arrays.
    #[error("not supported for dense arrays: {0}")]
    DenseNotSupported(String),
    /// The R-tree failed while computing tile overlap.
    #[error("tile overlap failed: {0}")]
    TileOverlap(String),
    /// Buffers were reset with a capacity below the original capacity.
    #[error("invalid buffer size: {0}")]
    InvalidBufferSize(String),
    /// No whole cell fits in the caller's buffers, even when empty.
    #[error("unsplittable cell: {0}")]
    Unsplittable(String),
    /// An allocation was refused.
    #[error("out of memory: {0}")]
    OutOfMemory(String),
    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Construct a [`TesseraError`] with a formatted message.
///
/// `tessera_err!(Kind: "format", args...)` builds the named variant;
/// `tessera_err!("format", args...)` defaults to [`TesseraError::Internal`].
#[macro_export]
macro_rules! tessera_err {
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::TesseraError::$variant(format!($fmt $(, $arg)*))
    };
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::tessera_err!(Internal: $fmt $(, $arg)*)
    };
}

/// Return early with a [`TesseraError`], as [`tessera_err!`] wrapped in `Err`.
#[macro_export]
macro_rules! tessera_bail {
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        return Err($crate::tessera_err!($variant: $fmt $(, $arg)*))
    };
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        return Err($crate::tessera_err!($fmt $(, $arg)*))
    };
}

/// Extension trait for unwrapping with a message, logging before panicking.
///
/// Reserved for conditions that are unreachable unless an internal invariant
/// is broken; error paths that a caller can hit must propagate
/// [`TesseraError`] instead.
pub trait TesseraExpect {
    /// The unwrapped value type.
    type Output;

    /// Unwrap the value, panicking with `msg` if it is absent.
    fn tessera_expect(self, msg: &str) -> Self::Output;
}

impl<T> TesseraExpect for Option<T> {
    type Output = T;

    #[allow(clippy::panic)]
    fn tessera_expect(self, msg: &str) -> Self::Output {
        match self {
            Some(value) => value,
            None => {
                log::error!("expectation failed: {msg}");
                panic!("expectation failed: {msg}");
            }
        }
    }
}

impl<T, E: Debug> TesseraExpect for Result<T, E> {
    type Output = T;

    #[allow(clippy::panic)]
    fn tessera_expect(self, msg: &str) -> Self::Output {
        match self {
            Ok(value) => value,
            Err(err) => {
                log::error!("expectation failed: {msg}: {err:?}");
                panic!("expectation failed: {msg}: {err:?}");
            }
        }
    }
}

/// Extension trait for unwrapping a [`TesseraResult`] without a message.
pub trait TesseraUnwrap {
    /// The unwrapped value type.
    type Output;

    /// Unwrap the result, panicking with the error's display if it failed.
    fn tessera_unwrap(self) -> Self::Output;
}

impl<T> TesseraUnwrap for TesseraResult<T> {
    type Output = T;

    #[allow(clippy::panic)]
    fn tessera_unwrap(self) -> Self::Output {
        match self {
            Ok(value) => value,
            Err(err) => {
                log::error!("unwrap failed: {err}");
                panic!("unwrap failed: {err}");
            }
        }
    }
}
