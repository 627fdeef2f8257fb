//! Per-dimension range storage.

use tessera_dtype::{CoordValue, DomainType, NativeDomainType};
use tessera_error::{tessera_bail, tessera_err, TesseraResult};

/// The typed backing store of one dimension's ranges.
///
/// One variant per domain type; every public operation dispatches on the tag
/// once and runs monomorphic from there.
#[derive(Debug, Clone, PartialEq)]
enum RangeStore {
    I8(Vec<[i8; 2]>),
    I16(Vec<[i16; 2]>),
    I32(Vec<[i32; 2]>),
    I64(Vec<[i64; 2]>),
    U8(Vec<[u8; 2]>),
    U16(Vec<[u16; 2]>),
    U32(Vec<[u32; 2]>),
    U64(Vec<[u64; 2]>),
    F32(Vec<[f32; 2]>),
    F64(Vec<[f64; 2]>),
}

macro_rules! match_each_store {
    ($self:expr, |$vec:ident| $($body:tt)*) => {
        match $self {
            RangeStore::I8($vec) => $($body)*,
            RangeStore::I16($vec) => $($body)*,
            RangeStore::I32($vec) => $($body)*,
            RangeStore::I64($vec) => $($body)*,
            RangeStore::U8($vec) => $($body)*,
            RangeStore::U16($vec) => $($body)*,
            RangeStore::U32($vec) => $($body)*,
            RangeStore::U64($vec) => $($body)*,
            RangeStore::F32($vec) => $($body)*,
            RangeStore::F64($vec) => $($body)*,
        }
    };
}

/// The ordered `[lo, hi]` ranges of one dimension.
///
/// Starts out holding the single default range (the full dimension domain);
/// the first user range discards the default.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionRanges {
    store: RangeStore,
    is_default: bool,
}

impl DimensionRanges {
    /// An empty range list for the given domain type.
    pub fn new(dtype: DomainType) -> Self {
        let store = match dtype {
            DomainType::I8 => RangeStore::I8(Vec::new()),
            DomainType::I16 => RangeStore::I16(Vec::new()),
            DomainType::I32 => RangeStore::I32(Vec::new()),
            DomainType::I64 => RangeStore::I64(Vec::new()),
            DomainType::U8 => RangeStore::U8(Vec::new()),
            DomainType::U16 => RangeStore::U16(Vec::new()),
            DomainType::U32 => RangeStore::U32(Vec::new()),
            DomainType::U64 => RangeStore::U64(Vec::new()),
            DomainType::F32 => RangeStore::F32(Vec::new()),
            DomainType::F64 => RangeStore::F64(Vec::new()),
        };
        Self {
            store,
            is_default: false,
        }
    }

    /// The domain type of the stored ranges.
    pub fn domain_type(&self) -> DomainType {
        match &self.store {
            RangeStore::I8(_) => DomainType::I8,
            RangeStore::I16(_) => DomainType::I16,
            RangeStore::I32(_) => DomainType::I32,
            RangeStore::I64(_) => DomainType::I64,
            RangeStore::U8(_) => DomainType::U8,
            RangeStore::U16(_) => DomainType::U16,
            RangeStore::U32(_) => DomainType::U32,
            RangeStore::U64(_) => DomainType::U64,
            RangeStore::F32(_) => DomainType::F32,
            RangeStore::F64(_) => DomainType::F64,
        }
    }

    /// Append a range. Appending a non-default range over a lone default
    /// range replaces the default.
    pub fn add(&mut self, lo: CoordValue, hi: CoordValue, is_default: bool) -> TesseraResult<()> {
        if lo.domain_type() != self.domain_type() || hi.domain_type() != self.domain_type() {
            tessera_bail!(
                UnsupportedDomainType: "range of type {} against a {} dimension",
                lo.domain_type(),
                self.domain_type()
            );
        }
        if !is_default && self.is_default {
            match_each_store!(&mut self.store, |v| v.clear());
            self.is_default = false;
        }
        macro_rules! push {
            ($v:ident, $T:ty) => {{
                let lo = lo
                    .cast::<$T>()
                    .ok_or_else(|| tessera_err!(Internal: "range bound lost in cast"))?;
                let hi = hi
                    .cast::<$T>()
                    .ok_or_else(|| tessera_err!(Internal: "range bound lost in cast"))?;
                $v.push([lo, hi]);
            }};
        }
        match &mut self.store {
            RangeStore::I8(v) => push!(v, i8),
            RangeStore::I16(v) => push!(v, i16),
            RangeStore::I32(v) => push!(v, i32),
            RangeStore::I64(v) => push!(v, i64),
            RangeStore::U8(v) => push!(v, u8),
            RangeStore::U16(v) => push!(v, u16),
            RangeStore::U32(v) => push!(v, u32),
            RangeStore::U64(v) => push!(v, u64),
            RangeStore::F32(v) => push!(v, f32),
            RangeStore::F64(v) => push!(v, f64),
        }
        if is_default {
            self.is_default = true;
        }
        Ok(())
    }

    /// Number of stored ranges.
    pub fn range_num(&self) -> u64 {
        match_each_store!(&self.store, |v| v.len() as u64)
    }

    /// Whether the list still holds only the default range.
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// The range at `idx` as tagged bounds.
    pub fn get(&self, idx: u64) -> TesseraResult<(CoordValue, CoordValue)> {
        let i = usize::try_from(idx)
            .map_err(|_| tessera_err!(InvalidRange: "range index {idx} out of range"))?;
        match_each_store!(&self.store, |v| {
            v.get(i)
                .map(|r| (r[0].into(), r[1].into()))
                .ok_or_else(|| {
                    tessera_err!(InvalidRange: "range index {idx} out of bounds for {} ranges", v.len())
                })
        })
    }

    /// The range at `idx` as the native type `T`.
    pub fn typed_get<T: NativeDomainType>(&self, idx: u64) -> TesseraResult<[T; 2]> {
        if T::DOMAIN_TYPE != self.domain_type() {
            tessera_bail!(
                UnsupportedDomainType: "ranges are of type {}, requested {}",
                self.domain_type(),
                T::DOMAIN_TYPE
            );
        }
        let (lo, hi) = self.get(idx)?;
        match (lo.cast::<T>(), hi.cast::<T>()) {
            (Some(lo), Some(hi)) => Ok([lo, hi]),
            _ => Err(tessera_err!(Internal: "range bound lost in cast")),
        }
    }

    /// Whether the range at `idx` is a point (`lo == hi`, bitwise for reals).
    pub fn is_point(&self, idx: u64) -> TesseraResult<bool> {
        let i = usize::try_from(idx)
            .map_err(|_| tessera_err!(InvalidRange: "range index {idx} out of range"))?;
        match_each_store!(&self.store, |v| {
            v.get(i)
                .map(|r| r[0].total_compare(r[1]).is_eq())
                .ok_or_else(|| {
                    tessera_err!(InvalidRange: "range index {idx} out of bounds for {} ranges", v.len())
                })
        })
    }

    /// Drop all ranges, including a default one.
    pub fn clear(&mut self) {
        match_each_store!(&mut self.store, |v| v.clear());
        self.is_default = false;
    }
}
