//! The subarray: per-dimension range lists over an open array.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, OnceLock};

use tessera_array::{Array, Layout, TileOverlap};
use tessera_dtype::{
    match_each_domain_type, range_len, safe_mul, CoordValue, DomainType, NativeDomainType,
};
use tessera_error::{tessera_bail, tessera_err, TesseraResult};

use crate::{DimensionRanges, EstimationPolicy, ExecDriver, ExecutionMode, ResultSize};

/// An axis-aligned selection: the Cartesian product of per-dimension range
/// lists, with layout-aware linear enumeration and cached read bookkeeping.
///
/// Freshly constructed, a subarray selects the whole domain through one
/// default range per dimension. Adding a range invalidates the cached tile
/// overlap and result-size estimate.
pub struct Subarray {
    pub(crate) array: Arc<Array>,
    pub(crate) layout: Layout,
    pub(crate) ranges: Vec<DimensionRanges>,
    pub(crate) range_offsets: Vec<u64>,
    /// `tile_overlap[fragment][range_idx]`, valid when `overlap_ready`.
    pub(crate) tile_overlap: Vec<Vec<TileOverlap>>,
    pub(crate) est_result_size: HashMap<String, ResultSize>,
    pub(crate) est_size_ready: bool,
    pub(crate) overlap_ready: bool,
    pub(crate) policy: EstimationPolicy,
    pub(crate) exec: Arc<dyn ExecDriver>,
}

impl Clone for Subarray {
    fn clone(&self) -> Self {
        Self {
            array: self.array.clone(),
            layout: self.layout,
            ranges: self.ranges.clone(),
            range_offsets: self.range_offsets.clone(),
            tile_overlap: self.tile_overlap.clone(),
            est_result_size: self.est_result_size.clone(),
            est_size_ready: self.est_size_ready,
            overlap_ready: self.overlap_ready,
            policy: self.policy.clone(),
            exec: self.exec.clone(),
        }
    }
}

impl Debug for Subarray {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subarray")
            .field("layout", &self.layout)
            .field("range_num", &self.range_num())
            .field("overlap_ready", &self.overlap_ready)
            .field("est_size_ready", &self.est_size_ready)
            .finish_non_exhaustive()
    }
}

impl Subarray {
    /// Create a subarray selecting the full domain of `array`.
    pub fn new(array: Arc<Array>, layout: Layout) -> TesseraResult<Self> {
        let schema = array.schema().clone();
        let mut subarray = Self {
            array,
            layout,
            ranges: schema
                .dimensions()
                .iter()
                .map(|d| DimensionRanges::new(d.domain_type()))
                .collect(),
            range_offsets: Vec::new(),
            tile_overlap: Vec::new(),
            est_result_size: HashMap::new(),
            est_size_ready: false,
            overlap_ready: false,
            policy: EstimationPolicy::default(),
            exec: ExecutionMode::Inline.into_driver(),
        };
        for (dim_idx, dim) in schema.dimensions().iter().enumerate() {
            subarray.ranges[dim_idx].add(dim.lo(), dim.hi(), true)?;
        }
        subarray.compute_range_offsets();
        Ok(subarray)
    }

    /// Replace the estimation policy.
    pub fn with_policy(mut self, policy: EstimationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the parallel-for capability.
    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.exec = mode.into_driver();
        self
    }

    /// The array this subarray selects from.
    pub fn array(&self) -> &Arc<Array> {
        &self.array
    }

    /// The enumeration layout.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Number of dimensions.
    pub fn dim_num(&self) -> u32 {
        self.array.schema().dim_num()
    }

    /// The shared domain type.
    pub fn domain_type(&self) -> DomainType {
        self.array.schema().domain_type()
    }

    /// Add `[lo, hi]` on dimension `dim_idx`.
    ///
    /// The range must be of the domain type, lie inside the dimension domain,
    /// be NaN-free and not inverted. Invalidates cached overlap/estimates.
    pub fn add_range<T: NativeDomainType>(
        &mut self,
        dim_idx: u32,
        range: [T; 2],
    ) -> TesseraResult<()> {
        let schema = self.array.schema().clone();
        if dim_idx >= schema.dim_num() {
            tessera_bail!(
                InvalidDimension: "dimension index {dim_idx} out of bounds for {} dimensions",
                schema.dim_num()
            );
        }
        if T::DOMAIN_TYPE != schema.domain_type() {
            tessera_bail!(
                UnsupportedDomainType: "range of type {} against a {} domain",
                T::DOMAIN_TYPE,
                schema.domain_type()
            );
        }
        let [lo, hi] = range;
        if lo.is_nan() || hi.is_nan() {
            tessera_bail!(InvalidRange: "range bounds must not be NaN");
        }
        if lo.total_compare(hi).is_gt() {
            tessera_bail!(
                InvalidRange: "lower bound {lo} cannot be larger than the upper bound {hi}"
            );
        }
        let [dom_lo, dom_hi] = schema.dimension(dim_idx)?.typed_domain::<T>()?;
        if lo.total_compare(dom_lo).is_lt() || hi.total_compare(dom_hi).is_gt() {
            tessera_bail!(
                InvalidRange: "range [{lo}, {hi}] is outside the dimension domain [{dom_lo}, {dom_hi}]"
            );
        }

        self.invalidate();
        self.ranges[dim_idx as usize].add(lo.into(), hi.into(), false)?;
        self.compute_range_offsets();
        Ok(())
    }

    /// Add a tagged range on dimension `dim_idx`, dispatching on its type.
    pub fn add_range_value(
        &mut self,
        dim_idx: u32,
        lo: CoordValue,
        hi: CoordValue,
    ) -> TesseraResult<()> {
        if lo.domain_type() != self.domain_type() || hi.domain_type() != self.domain_type() {
            tessera_bail!(
                UnsupportedDomainType: "range of type {} against a {} domain",
                lo.domain_type(),
                self.domain_type()
            );
        }
        match_each_domain_type!(self.domain_type(), |$T| {
            let lo = lo
                .cast::<$T>()
                .ok_or_else(|| tessera_err!(Internal: "range bound lost in cast"))?;
            let hi = hi
                .cast::<$T>()
                .ok_or_else(|| tessera_err!(Internal: "range bound lost in cast"))?;
            self.add_range::<$T>(dim_idx, [lo, hi])
        })
    }

    /// Number of ranges on dimension `dim_idx`.
    pub fn range_num_for_dim(&self, dim_idx: u32) -> TesseraResult<u64> {
        self.ranges
            .get(dim_idx as usize)
            .map(DimensionRanges::range_num)
            .ok_or_else(|| {
                tessera_err!(
                    InvalidDimension: "dimension index {dim_idx} out of bounds for {} dimensions",
                    self.dim_num()
                )
            })
    }

    /// The range at `(dim_idx, range_idx)` as tagged bounds.
    pub fn get_range(&self, dim_idx: u32, range_idx: u64) -> TesseraResult<(CoordValue, CoordValue)> {
        self.ranges
            .get(dim_idx as usize)
            .ok_or_else(|| {
                tessera_err!(
                    InvalidDimension: "dimension index {dim_idx} out of bounds for {} dimensions",
                    self.dim_num()
                )
            })?
            .get(range_idx)
    }

    /// Total number of ranges: the product of the per-dimension counts.
    pub fn range_num(&self) -> u64 {
        if self.ranges.is_empty() {
            return 0;
        }
        self.ranges
            .iter()
            .fold(1u64, |acc, r| safe_mul(acc, r.range_num()))
    }

    /// Whether the subarray holds no ranges (only after [`Subarray::clear`]).
    pub fn empty(&self) -> bool {
        self.range_num() == 0
    }

    /// Drop all ranges and cached bookkeeping.
    pub fn clear(&mut self) {
        self.ranges.clear();
        self.range_offsets.clear();
        self.invalidate();
    }

    /// Whether the whole subarray is a single point: one range total, each a
    /// point on its dimension.
    ///
    /// Well-defined because all dimensions share the schema's domain type.
    pub fn is_unary(&self) -> bool {
        if self.range_num() != 1 {
            return false;
        }
        self.ranges
            .iter()
            .all(|r| r.is_point(0).unwrap_or(false))
    }

    /// Whether the range at linear `range_idx` is a point on every dimension.
    pub fn is_unary_range(&self, range_idx: u64) -> TesseraResult<bool> {
        let coords = self.get_range_coords(range_idx);
        for (dim, &coord) in self.ranges.iter().zip(coords.iter()) {
            if !dim.is_point(coord)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// The layout that governs linear range enumeration: `Unordered` borrows
    /// the array's cell order, `GlobalOrder` enumerates row-major.
    pub fn offset_layout(&self) -> Layout {
        match self.layout {
            Layout::Unordered => self.array.schema().cell_order(),
            Layout::GlobalOrder => Layout::RowMajor,
            l => l,
        }
    }

    /// Map a linear range index to per-dimension range coordinates.
    pub fn get_range_coords(&self, range_idx: u64) -> Vec<u64> {
        let dim_num = self.ranges.len();
        if self.range_offsets.len() != dim_num {
            return Vec::new();
        }
        let mut coords = Vec::with_capacity(dim_num);
        let mut tmp_idx = range_idx;
        match self.offset_layout() {
            Layout::ColMajor => {
                for i in (0..dim_num).rev() {
                    coords.push(tmp_idx / self.range_offsets[i]);
                    tmp_idx %= self.range_offsets[i];
                }
                coords.reverse();
            }
            _ => {
                for i in 0..dim_num {
                    coords.push(tmp_idx / self.range_offsets[i]);
                    tmp_idx %= self.range_offsets[i];
                }
            }
        }
        coords
    }

    /// Map per-dimension range coordinates back to the linear range index.
    pub fn range_idx(&self, range_coords: &[u64]) -> u64 {
        self.range_offsets
            .iter()
            .zip(range_coords)
            .map(|(off, c)| off * c)
            .sum()
    }

    /// The per-dimension ranges of linear `range_idx`, in axis order, as the
    /// native type `T`.
    pub fn range_slices<T: NativeDomainType>(&self, range_idx: u64) -> TesseraResult<Vec<[T; 2]>> {
        let coords = self.get_range_coords(range_idx);
        self.ranges
            .iter()
            .zip(coords)
            .map(|(dim, coord)| dim.typed_get::<T>(coord))
            .collect()
    }

    /// Number of cells selected by the range at `range_idx`.
    ///
    /// `u64::MAX` for overflowing products and for non-unary real ranges,
    /// whose cell count is undefined.
    pub fn cell_num(&self, range_idx: u64) -> TesseraResult<u64> {
        match_each_domain_type!(self.domain_type(), |$T| {
            self.cell_num_typed::<$T>(range_idx)
        })
    }

    pub(crate) fn cell_num_typed<T: NativeDomainType>(
        &self,
        range_idx: u64,
    ) -> TesseraResult<u64> {
        if self.is_unary_range(range_idx)? {
            return Ok(1);
        }
        if !T::DOMAIN_TYPE.is_integer() {
            return Ok(u64::MAX);
        }
        let mut count = 1u64;
        for range in self.range_slices::<T>(range_idx)? {
            count = safe_mul(range_len(range[0], range[1]), count);
        }
        Ok(count)
    }

    /// Extract the sub-subarray selecting the linear range window
    /// `[start, end]`, copying the axis-wise bounding box of ranges and any
    /// matching cached tile overlap.
    pub fn get_subarray(&self, start: u64, end: u64) -> TesseraResult<Subarray> {
        let range_num = self.range_num();
        if start > end || end >= range_num {
            tessera_bail!(
                InvalidRange: "range window [{start}, {end}] out of bounds for {range_num} ranges"
            );
        }
        let mut ret = Subarray::new(self.array.clone(), self.layout)?;
        ret.policy = self.policy.clone();
        ret.exec = self.exec.clone();

        let start_coords = self.get_range_coords(start);
        let end_coords = self.get_range_coords(end);
        for (dim_idx, ranges) in self.ranges.iter().enumerate() {
            let first = start_coords[dim_idx].min(end_coords[dim_idx]);
            let last = start_coords[dim_idx].max(end_coords[dim_idx]);
            for r in first..=last {
                let (lo, hi) = ranges.get(r)?;
                ret.add_range_value(u32::try_from(dim_idx).unwrap_or(u32::MAX), lo, hi)?;
            }
        }

        // The window's overlap columns transfer only when the extracted grid
        // is exactly the window.
        if self.overlap_ready && ret.range_num() == end - start + 1 {
            let lo = usize::try_from(start)
                .map_err(|_| tessera_err!(Internal: "range window out of addressable range"))?;
            let hi = usize::try_from(end)
                .map_err(|_| tessera_err!(Internal: "range window out of addressable range"))?;
            ret.tile_overlap = self
                .tile_overlap
                .iter()
                .map(|per_fragment| per_fragment[lo..=hi].to_vec())
                .collect();
            ret.overlap_ready = true;
        }
        Ok(ret)
    }

    /// The cached tile overlap, `[fragment][range_idx]`.
    pub fn tile_overlap(&self) -> &[Vec<TileOverlap>] {
        &self.tile_overlap
    }

    /// Whether the tile overlap cache is valid.
    pub fn overlap_ready(&self) -> bool {
        self.overlap_ready
    }

    /// Compute (and cache) the tile overlap for every `(fragment, range)`
    /// pair, in parallel over the 2-D index.
    pub fn compute_tile_overlap(&mut self) -> TesseraResult<()> {
        match_each_domain_type!(self.domain_type(), |$T| {
            self.compute_tile_overlap_typed::<$T>()
        })
    }

    pub(crate) fn compute_tile_overlap_typed<T: NativeDomainType>(
        &mut self,
    ) -> TesseraResult<()> {
        if self.overlap_ready {
            return Ok(());
        }
        self.compute_range_offsets();
        let fragments = self.array.fragments().to_vec();
        let fragment_num = fragments.len() as u64;
        let range_num = self.range_num();

        // (fragment, range) cells are disjoint, so tasks write lock-free.
        let cells: Vec<Vec<OnceLock<TileOverlap>>> = (0..fragment_num)
            .map(|_| (0..range_num).map(|_| OnceLock::new()).collect())
            .collect();
        let exec = self.exec.clone();
        let this = &*self;
        let task = |f: u64, r: u64| -> TesseraResult<()> {
            let fragment = &fragments[usize::try_from(f)
                .map_err(|_| tessera_err!(Internal: "fragment index out of addressable range"))?];
            let range = this.range_slices::<T>(r)?;
            let overlap = fragment.rtree().tile_overlap::<T>(&range)?;
            let cell = &cells[usize::try_from(f)
                .map_err(|_| tessera_err!(Internal: "fragment index out of addressable range"))?]
                [usize::try_from(r)
                    .map_err(|_| tessera_err!(Internal: "range index out of addressable range"))?];
            cell.set(overlap)
                .map_err(|_| tessera_err!(Internal: "tile overlap cell written twice"))
        };
        exec.for_each_2d(0, fragment_num, 0, range_num, &task)?;

        self.tile_overlap = cells
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| cell.into_inner().unwrap_or_default())
                    .collect()
            })
            .collect();
        self.overlap_ready = true;
        log::debug!(
            "computed tile overlap for {fragment_num} fragments x {range_num} ranges"
        );
        Ok(())
    }

    pub(crate) fn invalidate(&mut self) {
        self.est_size_ready = false;
        self.overlap_ready = false;
        self.tile_overlap.clear();
        self.est_result_size.clear();
    }

    pub(crate) fn compute_range_offsets(&mut self) {
        self.range_offsets.clear();
        let dim_num = self.ranges.len();
        if dim_num == 0 {
            return;
        }
        match self.offset_layout() {
            Layout::ColMajor => {
                self.range_offsets.push(1);
                for i in 1..dim_num {
                    let prev = self.range_offsets[i - 1];
                    self.range_offsets
                        .push(safe_mul(prev, self.ranges[i - 1].range_num()));
                }
            }
            _ => {
                self.range_offsets.push(1);
                for i in (0..dim_num - 1).rev() {
                    let prev = *self
                        .range_offsets
                        .last()
                        .unwrap_or(&1);
                    self.range_offsets
                        .push(safe_mul(prev, self.ranges[i + 1].range_num()));
                }
                self.range_offsets.reverse();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tessera_array::{ArraySchema, Attribute, AttributeData, Dimension, Fragment};
    use tessera_dtype::ToBytes;
    use tessera_error::TesseraError;

    use super::*;

    fn packed<T: ToBytes>(values: &[T]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes().to_vec()).collect()
    }

    fn sparse_array() -> Arc<Array> {
        let schema = Arc::new(
            ArraySchema::sparse(
                vec![
                    Dimension::new("d1", [1u64, 4], Some(2)).unwrap(),
                    Dimension::new("d2", [1u64, 4], Some(2)).unwrap(),
                ],
                vec![
                    Attribute::new("a1", tessera_dtype::DomainType::I32),
                    Attribute::new("a2", tessera_dtype::DomainType::U8).var(),
                ],
                Layout::RowMajor,
                Layout::RowMajor,
                2,
            )
            .unwrap(),
        );
        let coords = packed(&[1u64, 1, 1, 2, 1, 4, 2, 3, 3, 1, 4, 2, 3, 3, 3, 4]);
        let a1: Vec<i32> = (0..8).collect();
        let a2_off: Vec<u64> = vec![0, 1, 3, 6, 10, 11, 13, 16];
        let a2_val = b"abbcccddddeffggghhhh".to_vec();
        let fragment = Fragment::sparse(
            schema.clone(),
            coords,
            vec![
                ("a1".to_string(), AttributeData::fixed(packed(&a1))),
                ("a2".to_string(), AttributeData::var(packed(&a2_off), a2_val)),
            ],
        )
        .unwrap();
        Arc::new(Array::new(schema, vec![Arc::new(fragment)]).unwrap())
    }

    fn float_array() -> Arc<Array> {
        let schema = Arc::new(
            ArraySchema::sparse(
                vec![Dimension::new("d1", [0.0f64, 10.0], None).unwrap()],
                vec![Attribute::new("a1", tessera_dtype::DomainType::I32)],
                Layout::RowMajor,
                Layout::RowMajor,
                2,
            )
            .unwrap(),
        );
        Arc::new(Array::new(schema, Vec::new()).unwrap())
    }

    #[test]
    fn construction_selects_the_full_domain() {
        let subarray = Subarray::new(sparse_array(), Layout::RowMajor).unwrap();
        assert_eq!(subarray.range_num(), 1);
        assert_eq!(subarray.dim_num(), 2);
        let (lo, hi) = subarray.get_range(0, 0).unwrap();
        assert_eq!(lo.as_u64(), Some(1));
        assert_eq!(hi.as_u64(), Some(4));
        assert!(!subarray.is_unary());
        assert!(!subarray.empty());
    }

    #[test]
    fn add_range_validation() {
        let mut subarray = Subarray::new(sparse_array(), Layout::RowMajor).unwrap();
        assert!(matches!(
            subarray.add_range(5, [1u64, 2]).unwrap_err(),
            TesseraError::InvalidDimension(_)
        ));
        assert!(matches!(
            subarray.add_range(0, [1i32, 2]).unwrap_err(),
            TesseraError::UnsupportedDomainType(_)
        ));
        assert!(matches!(
            subarray.add_range(0, [3u64, 2]).unwrap_err(),
            TesseraError::InvalidRange(_)
        ));
        assert!(matches!(
            subarray.add_range(0, [0u64, 2]).unwrap_err(),
            TesseraError::InvalidRange(_)
        ));
        assert!(matches!(
            subarray.add_range(0, [2u64, 5]).unwrap_err(),
            TesseraError::InvalidRange(_)
        ));
    }

    #[test]
    fn nan_bounds_are_rejected() {
        let mut subarray = Subarray::new(float_array(), Layout::RowMajor).unwrap();
        assert!(matches!(
            subarray.add_range(0, [f64::NAN, 2.0]).unwrap_err(),
            TesseraError::InvalidRange(_)
        ));
        subarray.add_range(0, [0.5f64, 2.5]).unwrap();
        assert_eq!(subarray.range_num(), 1);
    }

    #[test]
    fn range_enumeration_is_bijective() {
        for layout in [Layout::RowMajor, Layout::ColMajor] {
            let mut subarray = Subarray::new(sparse_array(), layout).unwrap();
            subarray.add_range(0, [1u64, 2]).unwrap();
            subarray.add_range(0, [3u64, 4]).unwrap();
            subarray.add_range(1, [1u64, 1]).unwrap();
            subarray.add_range(1, [2u64, 3]).unwrap();
            subarray.add_range(1, [4u64, 4]).unwrap();
            assert_eq!(subarray.range_num(), 6);
            assert_eq!(subarray.range_num_for_dim(0).unwrap(), 2);
            assert_eq!(subarray.range_num_for_dim(1).unwrap(), 3);

            let mut seen = std::collections::HashSet::new();
            for idx in 0..subarray.range_num() {
                let coords = subarray.get_range_coords(idx);
                assert_eq!(subarray.range_idx(&coords), idx);
                assert!(seen.insert(coords));
            }
        }
    }

    #[test]
    fn row_major_enumeration_varies_last_dimension_fastest() {
        let mut subarray = Subarray::new(sparse_array(), Layout::RowMajor).unwrap();
        subarray.add_range(0, [1u64, 1]).unwrap();
        subarray.add_range(0, [2u64, 2]).unwrap();
        subarray.add_range(1, [3u64, 3]).unwrap();
        subarray.add_range(1, [4u64, 4]).unwrap();
        assert_eq!(subarray.get_range_coords(0), vec![0, 0]);
        assert_eq!(subarray.get_range_coords(1), vec![0, 1]);
        assert_eq!(subarray.get_range_coords(2), vec![1, 0]);

        let slices = subarray.range_slices::<u64>(1).unwrap();
        assert_eq!(slices, vec![[1, 1], [4, 4]]);
    }

    #[test]
    fn col_major_enumeration_varies_first_dimension_fastest() {
        let mut subarray = Subarray::new(sparse_array(), Layout::ColMajor).unwrap();
        subarray.add_range(0, [1u64, 1]).unwrap();
        subarray.add_range(0, [2u64, 2]).unwrap();
        subarray.add_range(1, [3u64, 3]).unwrap();
        subarray.add_range(1, [4u64, 4]).unwrap();
        assert_eq!(subarray.get_range_coords(0), vec![0, 0]);
        assert_eq!(subarray.get_range_coords(1), vec![1, 0]);
        assert_eq!(subarray.get_range_coords(2), vec![0, 1]);
    }

    #[test]
    fn cell_num_counts_and_saturates() {
        let mut subarray = Subarray::new(sparse_array(), Layout::RowMajor).unwrap();
        // Full domain: 4 x 4.
        assert_eq!(subarray.cell_num(0).unwrap(), 16);

        subarray.add_range(0, [1u64, 2]).unwrap();
        subarray.add_range(1, [3u64, 3]).unwrap();
        assert_eq!(subarray.cell_num(0).unwrap(), 2);

        let mut unary = Subarray::new(sparse_array(), Layout::RowMajor).unwrap();
        unary.add_range(0, [2u64, 2]).unwrap();
        unary.add_range(1, [3u64, 3]).unwrap();
        assert!(unary.is_unary());
        assert_eq!(unary.cell_num(0).unwrap(), 1);
    }

    #[test]
    fn real_non_unary_cell_num_is_undefined() {
        let mut subarray = Subarray::new(float_array(), Layout::RowMajor).unwrap();
        subarray.add_range(0, [0.5f64, 2.5]).unwrap();
        assert_eq!(subarray.cell_num(0).unwrap(), u64::MAX);

        let mut point = Subarray::new(float_array(), Layout::RowMajor).unwrap();
        point.add_range(0, [1.5f64, 1.5]).unwrap();
        assert_eq!(point.cell_num(0).unwrap(), 1);
    }

    #[test]
    fn clear_empties_the_subarray() {
        let mut subarray = Subarray::new(sparse_array(), Layout::RowMajor).unwrap();
        assert!(!subarray.empty());
        subarray.clear();
        assert!(subarray.empty());
        assert_eq!(subarray.range_num(), 0);
    }

    #[test]
    fn tile_overlap_over_the_capacity_tiles() {
        let mut subarray = Subarray::new(sparse_array(), Layout::RowMajor).unwrap();
        subarray.compute_tile_overlap().unwrap();
        assert!(subarray.overlap_ready());
        // The full domain covers every sparse tile MBR.
        assert_eq!(subarray.tile_overlap()[0][0].tile_ranges, vec![(0, 3)]);

        // Adding a range invalidates the cache.
        subarray.add_range(0, [1u64, 2]).unwrap();
        assert!(!subarray.overlap_ready());
        subarray.add_range(1, [1u64, 2]).unwrap();
        subarray.compute_tile_overlap().unwrap();
        // Only tile 0 (cells (1,1) and (1,2)) is inside [1,2] x [1,2].
        assert_eq!(subarray.tile_overlap()[0][0].tile_ranges, vec![(0, 0)]);
        assert!(subarray.tile_overlap()[0][0].tiles.is_empty());
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn tile_overlap_is_identical_under_a_thread_pool() {
        let pool = Arc::new(
            rayon::ThreadPoolBuilder::new()
                .num_threads(4)
                .build()
                .unwrap(),
        );
        let mut serial = Subarray::new(sparse_array(), Layout::RowMajor).unwrap();
        let mut parallel = Subarray::new(sparse_array(), Layout::RowMajor)
            .unwrap()
            .with_execution_mode(ExecutionMode::RayonThreadPool(pool));
        for subarray in [&mut serial, &mut parallel] {
            subarray.add_range(0, [1u64, 2]).unwrap();
            subarray.add_range(0, [3u64, 4]).unwrap();
            subarray.add_range(1, [1u64, 4]).unwrap();
            subarray.compute_tile_overlap().unwrap();
        }
        assert_eq!(serial.tile_overlap(), parallel.tile_overlap());
    }

    #[test]
    fn get_subarray_extracts_a_window() {
        let mut subarray = Subarray::new(sparse_array(), Layout::RowMajor).unwrap();
        subarray.add_range(0, [1u64, 1]).unwrap();
        subarray.add_range(0, [2u64, 2]).unwrap();
        subarray.add_range(1, [1u64, 2]).unwrap();
        subarray.add_range(1, [3u64, 4]).unwrap();
        subarray.compute_tile_overlap().unwrap();
        assert_eq!(subarray.range_num(), 4);

        // Window [2, 3]: both d1 ranges? No - coords of 2 and 3 are (1,0) and
        // (1,1), so d1 contributes its second range only.
        let window = subarray.get_subarray(2, 3).unwrap();
        assert_eq!(window.range_num(), 2);
        let (lo, hi) = window.get_range(0, 0).unwrap();
        assert_eq!((lo.as_u64(), hi.as_u64()), (Some(2), Some(2)));
        assert!(window.overlap_ready());
        assert_eq!(window.tile_overlap()[0].len(), 2);
        assert_eq!(
            window.tile_overlap()[0][0],
            subarray.tile_overlap()[0][2]
        );

        assert!(subarray.get_subarray(2, 4).is_err());
    }

    #[test]
    fn clone_preserves_observable_state() {
        let mut subarray = Subarray::new(sparse_array(), Layout::RowMajor).unwrap();
        subarray.add_range(0, [1u64, 2]).unwrap();
        subarray.add_range(1, [2u64, 3]).unwrap();
        subarray.compute_tile_overlap().unwrap();

        let clone = subarray.clone();
        assert_eq!(clone.range_num(), subarray.range_num());
        assert_eq!(clone.layout(), subarray.layout());
        assert_eq!(clone.tile_overlap(), subarray.tile_overlap());
        assert_eq!(clone.cell_num(0).unwrap(), subarray.cell_num(0).unwrap());
        for idx in 0..clone.range_num() {
            assert_eq!(
                clone.get_range_coords(idx),
                subarray.get_range_coords(idx)
            );
        }
    }
}
