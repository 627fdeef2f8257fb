//! Overflow-saturating size arithmetic.
//!
//! Sizes and cell counts never wrap: any product that overflows `u64`
//! saturates to [`u64::MAX`], which doubles as the "uncountable" sentinel for
//! real-typed ranges.

use crate::NativeDomainType;

/// Multiply two sizes, saturating to `u64::MAX` on overflow.
#[inline]
pub fn safe_mul(a: u64, b: u64) -> u64 {
    a.checked_mul(b).unwrap_or(u64::MAX)
}

/// The number of discrete coordinates in the integer range `[lo, hi]`,
/// saturating to `u64::MAX` when the span does not fit.
pub fn range_len<T: NativeDomainType>(lo: T, hi: T) -> u64 {
    let (Some(lo), Some(hi)) = (lo.to_i128(), hi.to_i128()) else {
        return u64::MAX;
    };
    let span = (hi - lo) as u128 + 1;
    u64::try_from(span).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_mul_saturates() {
        assert_eq!(safe_mul(3, 4), 12);
        assert_eq!(safe_mul(u64::MAX, 2), u64::MAX);
        assert_eq!(safe_mul(1 << 63, 2), u64::MAX);
        assert_eq!(safe_mul(0, u64::MAX), 0);
    }

    #[test]
    fn range_len_counts_inclusively() {
        assert_eq!(range_len(1u64, 4u64), 4);
        assert_eq!(range_len(-2i8, 2i8), 5);
        assert_eq!(range_len(5u32, 5u32), 1);
    }

    #[test]
    fn range_len_saturates_on_full_u64_span() {
        assert_eq!(range_len(0u64, u64::MAX), u64::MAX);
        assert_eq!(range_len(i64::MIN, i64::MAX), u64::MAX);
    }
}
