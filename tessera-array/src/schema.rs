//! Array schema: dimensions, layout, cell sizing and tiling math.

use itertools::Itertools;
use tessera_dtype::{
    match_each_integer_domain_type, range_len, safe_mul, CoordValue, DomainType, NativeDomainType,
};
use tessera_error::{tessera_bail, tessera_err, TesseraResult};

use crate::{Attribute, COORDS};

/// Cell- or tile-emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Last dimension varies fastest.
    RowMajor,
    /// First dimension varies fastest.
    ColMajor,
    /// No caller-imposed order; the array's cell order applies.
    Unordered,
    /// The array's global (tile, then cell) order.
    GlobalOrder,
}

/// One axis of the coordinate space.
#[derive(Debug, Clone)]
pub struct Dimension {
    name: String,
    lo: CoordValue,
    hi: CoordValue,
    tile_extent: Option<CoordValue>,
}

impl Dimension {
    /// Create a dimension with an inclusive `[lo, hi]` domain and an optional
    /// tile extent (required for dense arrays).
    pub fn new<T: NativeDomainType>(
        name: impl Into<String>,
        domain: [T; 2],
        tile_extent: Option<T>,
    ) -> TesseraResult<Self> {
        let name = name.into();
        let [lo, hi] = domain;
        if lo.is_nan() || hi.is_nan() {
            tessera_bail!(InvalidRange: "domain of dimension {name} must not contain NaN");
        }
        if lo.total_compare(hi).is_gt() {
            tessera_bail!(
                InvalidRange: "domain of dimension {name} is inverted: [{lo}, {hi}]"
            );
        }
        if let Some(extent) = tile_extent {
            if extent <= T::zero() {
                tessera_bail!(InvalidRange: "tile extent of dimension {name} must be positive");
            }
        }
        Ok(Self {
            name,
            lo: lo.into(),
            hi: hi.into(),
            tile_extent: tile_extent.map(Into::into),
        })
    }

    /// The dimension name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The inclusive lower domain bound.
    pub fn lo(&self) -> CoordValue {
        self.lo
    }

    /// The inclusive upper domain bound.
    pub fn hi(&self) -> CoordValue {
        self.hi
    }

    /// The tile extent, if one was declared.
    pub fn tile_extent(&self) -> Option<CoordValue> {
        self.tile_extent
    }

    /// The scalar type of the domain bounds.
    pub fn domain_type(&self) -> DomainType {
        self.lo.domain_type()
    }

    /// The domain bounds as the native type `T`.
    pub fn typed_domain<T: NativeDomainType>(&self) -> TesseraResult<[T; 2]> {
        let lo = self.lo.cast::<T>();
        let hi = self.hi.cast::<T>();
        match (lo, hi) {
            (Some(lo), Some(hi)) => Ok([lo, hi]),
            _ => Err(tessera_err!(
                Internal: "domain of dimension {} is not of type {}",
                self.name,
                T::DOMAIN_TYPE
            )),
        }
    }

    fn typed_extent<T: NativeDomainType>(&self) -> TesseraResult<T> {
        self.tile_extent
            .and_then(CoordValue::cast::<T>)
            .ok_or_else(|| {
                tessera_err!(Internal: "dimension {} has no tile extent of type {}",
                    self.name, T::DOMAIN_TYPE)
            })
    }
}

/// The immutable shape of an array: dimensions, attributes and layout.
///
/// All dimensions share one [`DomainType`]; the constructor rejects mixed
/// domains so that typed operations can dispatch once per call.
#[derive(Debug, Clone)]
pub struct ArraySchema {
    dimensions: Vec<Dimension>,
    attributes: Vec<Attribute>,
    cell_order: Layout,
    tile_order: Layout,
    dense: bool,
    capacity: u64,
}

/// Default number of cells per sparse data tile.
pub const DEFAULT_SPARSE_CAPACITY: u64 = 10_000;

impl ArraySchema {
    /// Create a dense array schema. Every dimension must carry a tile extent
    /// that evenly divides its domain, and the domain must be integral.
    pub fn dense(
        dimensions: Vec<Dimension>,
        attributes: Vec<Attribute>,
        cell_order: Layout,
        tile_order: Layout,
    ) -> TesseraResult<Self> {
        let schema = Self::validated(
            dimensions,
            attributes,
            cell_order,
            tile_order,
            true,
            DEFAULT_SPARSE_CAPACITY,
        )?;
        if !schema.domain_type().is_integer() {
            tessera_bail!(
                UnsupportedDomainType: "dense arrays require an integer domain, got {}",
                schema.domain_type()
            );
        }
        for dim in &schema.dimensions {
            if dim.tile_extent.is_none() {
                tessera_bail!(
                    InvalidRange: "dense dimension {} must declare a tile extent",
                    dim.name
                );
            }
        }
        match_each_integer_domain_type!(schema.domain_type(), |$T| {
            schema.check_extents_divide::<$T>()?
        });
        Ok(schema)
    }

    /// Create a sparse array schema with the given data-tile capacity.
    pub fn sparse(
        dimensions: Vec<Dimension>,
        attributes: Vec<Attribute>,
        cell_order: Layout,
        tile_order: Layout,
        capacity: u64,
    ) -> TesseraResult<Self> {
        if capacity == 0 {
            tessera_bail!(InvalidRange: "sparse tile capacity must be positive");
        }
        Self::validated(
            dimensions,
            attributes,
            cell_order,
            tile_order,
            false,
            capacity,
        )
    }

    fn validated(
        dimensions: Vec<Dimension>,
        attributes: Vec<Attribute>,
        cell_order: Layout,
        tile_order: Layout,
        dense: bool,
        capacity: u64,
    ) -> TesseraResult<Self> {
        if dimensions.is_empty() {
            tessera_bail!(InvalidDimension: "an array needs at least one dimension");
        }
        let domain_type = dimensions[0].domain_type();
        for dim in &dimensions[1..] {
            if dim.domain_type() != domain_type {
                tessera_bail!(
                    UnsupportedDomainType:
                    "all dimensions must share one domain type, got {} and {}",
                    domain_type,
                    dim.domain_type()
                );
            }
        }
        if !matches!(cell_order, Layout::RowMajor | Layout::ColMajor)
            || !matches!(tile_order, Layout::RowMajor | Layout::ColMajor)
        {
            tessera_bail!(Internal: "cell and tile order must be row- or col-major");
        }
        for (i, attr) in attributes.iter().enumerate() {
            if attr.name() == COORDS {
                tessera_bail!(InvalidAttribute: "attribute name {COORDS} is reserved");
            }
            if attributes[..i].iter().any(|a| a.name() == attr.name()) {
                tessera_bail!(InvalidAttribute: "duplicate attribute name {}", attr.name());
            }
        }
        Ok(Self {
            dimensions,
            attributes,
            cell_order,
            tile_order,
            dense,
            capacity,
        })
    }

    fn check_extents_divide<T: NativeDomainType>(&self) -> TesseraResult<()> {
        for dim in &self.dimensions {
            let [lo, hi] = dim.typed_domain::<T>()?;
            let extent = dim.typed_extent::<T>()?;
            let len = range_len(lo, hi);
            let extent = extent
                .to_u64()
                .ok_or_else(|| tessera_err!(Internal: "tile extent out of range"))?;
            if len == u64::MAX || len % extent != 0 {
                tessera_bail!(
                    InvalidRange: "tile extent of dimension {} must evenly divide its domain",
                    dim.name
                );
            }
        }
        Ok(())
    }

    /// Number of dimensions.
    pub fn dim_num(&self) -> u32 {
        u32::try_from(self.dimensions.len()).unwrap_or(u32::MAX)
    }

    /// The shared domain scalar type.
    pub fn domain_type(&self) -> DomainType {
        self.dimensions[0].domain_type()
    }

    /// All dimensions, in axis order.
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// The dimension at `dim_idx`.
    pub fn dimension(&self, dim_idx: u32) -> TesseraResult<&Dimension> {
        self.dimensions.get(dim_idx as usize).ok_or_else(|| {
            tessera_err!(
                InvalidDimension: "dimension index {dim_idx} out of bounds for {} dimensions",
                self.dim_num()
            )
        })
    }

    /// All attributes, in declaration order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Look up an attribute by name. The reserved [`COORDS`] name resolves to
    /// `None`: coordinates are not a declared attribute.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name() == name)
    }

    /// The cell order within tiles.
    pub fn cell_order(&self) -> Layout {
        self.cell_order
    }

    /// The tile order across the tile grid.
    pub fn tile_order(&self) -> Layout {
        self.tile_order
    }

    /// Whether the array is dense.
    pub fn is_dense(&self) -> bool {
        self.dense
    }

    /// Cells per sparse data tile.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Whether the named channel is variable-sized. [`COORDS`] is fixed.
    pub fn var_size(&self, name: &str) -> TesseraResult<bool> {
        if name == COORDS {
            return Ok(false);
        }
        self.attribute(name)
            .map(Attribute::var_size)
            .ok_or_else(|| tessera_err!(InvalidAttribute: "unknown attribute {name}"))
    }

    /// Bytes of one cell of the named channel. For [`COORDS`] this is one
    /// coordinate tuple; variable-sized attributes have no cell size.
    pub fn cell_size(&self, name: &str) -> TesseraResult<u64> {
        if name == COORDS {
            return Ok(u64::from(self.dim_num()) * self.domain_type().byte_width());
        }
        let attr = self
            .attribute(name)
            .ok_or_else(|| tessera_err!(InvalidAttribute: "unknown attribute {name}"))?;
        attr.cell_size().ok_or_else(|| {
            tessera_err!(InvalidAttribute: "attribute {name} is variable-sized")
        })
    }

    /// Total number of cells in the (dense) domain, saturating on overflow.
    pub fn domain_cell_count<T: NativeDomainType>(&self) -> TesseraResult<u64> {
        let mut count = 1u64;
        for dim in &self.dimensions {
            let [lo, hi] = dim.typed_domain::<T>()?;
            count = safe_mul(count, range_len(lo, hi));
        }
        Ok(count)
    }

    /// Per-dimension number of tiles in the dense tile grid.
    pub fn tile_grid<T: NativeDomainType>(&self) -> TesseraResult<Vec<u64>> {
        self.dimensions
            .iter()
            .map(|dim| {
                let [lo, hi] = dim.typed_domain::<T>()?;
                let extent = dim.typed_extent::<T>()?;
                let extent = extent
                    .to_u64()
                    .ok_or_else(|| tessera_err!(Internal: "tile extent out of range"))?;
                Ok(range_len(lo, hi).div_ceil(extent))
            })
            .collect()
    }

    /// Cells per dense tile: the product of the tile extents.
    pub fn cells_per_tile<T: NativeDomainType>(&self) -> TesseraResult<u64> {
        let mut count = 1u64;
        for dim in &self.dimensions {
            let extent = dim.typed_extent::<T>()?;
            let extent = extent
                .to_u64()
                .ok_or_else(|| tessera_err!(Internal: "tile extent out of range"))?;
            count = safe_mul(count, extent);
        }
        Ok(count)
    }

    /// Position of `coords` in the dense global order: tiles laid out in
    /// tile order, cells within a tile in cell order.
    pub fn global_cell_pos<T: NativeDomainType>(&self, coords: &[T]) -> TesseraResult<u64> {
        let grid = self.tile_grid::<T>()?;
        let mut tile_coords = Vec::with_capacity(self.dimensions.len());
        let mut cell_coords = Vec::with_capacity(self.dimensions.len());
        let mut extents = Vec::with_capacity(self.dimensions.len());
        for (dim, &c) in self.dimensions.iter().zip_eq(coords) {
            let [lo, _] = dim.typed_domain::<T>()?;
            let extent = dim.typed_extent::<T>()?;
            let offset = to_index(c) - to_index(lo);
            let extent = extent
                .to_i128()
                .ok_or_else(|| tessera_err!(Internal: "tile extent out of range"))?;
            tile_coords.push(u64::try_from(offset / extent).map_err(|_| {
                tessera_err!(Internal: "coordinate below the dimension domain")
            })?);
            cell_coords.push(u64::try_from(offset % extent).map_err(|_| {
                tessera_err!(Internal: "coordinate below the dimension domain")
            })?);
            extents.push(u64::try_from(extent)
                .map_err(|_| tessera_err!(Internal: "tile extent out of range"))?);
        }
        let tile_idx = linearize(&tile_coords, &grid, self.tile_order);
        let cell_idx = linearize(&cell_coords, &extents, self.cell_order);
        Ok(safe_mul(tile_idx, self.cells_per_tile::<T>()?) + cell_idx)
    }
}

fn to_index<T: NativeDomainType>(value: T) -> i128 {
    // Integer domains only; validated when the dense schema is built.
    value.to_i128().unwrap_or(0)
}

/// Linearize `coords` within a box of per-dimension `sizes` in the given
/// (row- or col-major) order.
pub fn linearize(coords: &[u64], sizes: &[u64], order: Layout) -> u64 {
    let mut idx = 0u64;
    debug_assert_eq!(coords.len(), sizes.len());
    match order {
        Layout::ColMajor => {
            for (c, s) in coords.iter().zip(sizes).rev() {
                idx = safe_mul(idx, *s) + c;
            }
        }
        // Global order tiles are laid out row-major.
        _ => {
            for (c, s) in coords.iter().zip_eq(sizes) {
                idx = safe_mul(idx, *s) + c;
            }
        }
    }
    idx
}

#[cfg(test)]
mod tests {
    use tessera_dtype::DomainType;

    use super::*;
    use crate::CellValNum;

    fn two_by_two() -> ArraySchema {
        ArraySchema::dense(
            vec![
                Dimension::new("d1", [1u64, 4], Some(2)).unwrap(),
                Dimension::new("d2", [1u64, 4], Some(2)).unwrap(),
            ],
            vec![
                Attribute::new("a1", DomainType::I32),
                Attribute::new("a2", DomainType::U8).var(),
                Attribute::new("a3", DomainType::F32).with_cell_val_num(CellValNum::Fixed(2)),
            ],
            Layout::RowMajor,
            Layout::RowMajor,
        )
        .unwrap()
    }

    #[test]
    fn uniform_domain_type_enforced() {
        let err = ArraySchema::sparse(
            vec![
                Dimension::new("d1", [1u64, 4], None).unwrap(),
                Dimension::new("d2", [1i32, 4], None).unwrap(),
            ],
            vec![Attribute::new("a1", DomainType::I32)],
            Layout::RowMajor,
            Layout::RowMajor,
            2,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            tessera_error::TesseraError::UnsupportedDomainType(_)
        ));
    }

    #[test]
    fn dense_requires_dividing_extents() {
        let err = ArraySchema::dense(
            vec![Dimension::new("d1", [1u64, 5], Some(2)).unwrap()],
            vec![Attribute::new("a1", DomainType::I32)],
            Layout::RowMajor,
            Layout::RowMajor,
        )
        .unwrap_err();
        assert!(matches!(err, tessera_error::TesseraError::InvalidRange(_)));
    }

    #[test]
    fn cell_sizes() {
        let schema = two_by_two();
        assert_eq!(schema.cell_size("a1").unwrap(), 4);
        assert_eq!(schema.cell_size("a3").unwrap(), 8);
        assert_eq!(schema.cell_size(COORDS).unwrap(), 16);
        assert!(schema.cell_size("a2").is_err());
        assert!(schema.cell_size("missing").is_err());
        assert!(schema.var_size("a2").unwrap());
        assert!(!schema.var_size(COORDS).unwrap());
    }

    #[test]
    fn global_positions_follow_tile_then_cell_order() {
        let schema = two_by_two();
        // Tile (0,0): cells (1,1) (1,2) (2,1) (2,2) -> 0..3
        assert_eq!(schema.global_cell_pos(&[1u64, 1]).unwrap(), 0);
        assert_eq!(schema.global_cell_pos(&[1u64, 2]).unwrap(), 1);
        assert_eq!(schema.global_cell_pos(&[2u64, 1]).unwrap(), 2);
        assert_eq!(schema.global_cell_pos(&[2u64, 2]).unwrap(), 3);
        // Tile (0,1) starts at 4.
        assert_eq!(schema.global_cell_pos(&[1u64, 3]).unwrap(), 4);
        // Tile (1,0) starts at 8, tile (1,1) at 12.
        assert_eq!(schema.global_cell_pos(&[3u64, 1]).unwrap(), 8);
        assert_eq!(schema.global_cell_pos(&[4u64, 4]).unwrap(), 15);
    }

    #[test]
    fn domain_cell_count_saturates() {
        let schema = ArraySchema::sparse(
            vec![
                Dimension::new("d1", [0u64, u64::MAX - 1], None).unwrap(),
                Dimension::new("d2", [0u64, u64::MAX - 1], None).unwrap(),
            ],
            vec![Attribute::new("a1", DomainType::I32)],
            Layout::RowMajor,
            Layout::RowMajor,
            2,
        )
        .unwrap();
        assert_eq!(schema.domain_cell_count::<u64>().unwrap(), u64::MAX);
    }
}
