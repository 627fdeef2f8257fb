//! Immutable in-memory fragments and their derived tile metadata.
//!
//! A fragment is one batch write. Dense fragments store every attribute in
//! global order (tiles in tile order, cells within a tile in cell order);
//! sparse fragments additionally store the packed coordinate tuples of their
//! cells, in the same global order they were written. Tile metadata (MBRs,
//! per-tile persisted sizes) and the R-tree are derived at construction.

use std::sync::Arc;

use itertools::Itertools;
use tessera_dtype::{
    match_each_domain_type, safe_mul, CoordValue, NativeDomainType, TryFromBytes,
};
use tessera_error::{tessera_bail, tessera_err, TesseraResult};

use crate::{ArraySchema, Attribute, RTree, COORDS, DEFAULT_FANOUT};

/// One attribute's written buffers.
///
/// For fixed-size attributes `data` holds packed values; for var-sized
/// attributes `data` holds packed `u64` start offsets into `var`.
#[derive(Debug, Clone)]
pub struct AttributeData {
    data: Vec<u8>,
    var: Option<Vec<u8>>,
}

impl AttributeData {
    /// Buffers of a fixed-size attribute.
    pub fn fixed(data: Vec<u8>) -> Self {
        Self { data, var: None }
    }

    /// Buffers of a var-sized attribute: packed `u64` offsets plus values.
    pub fn var(offsets: Vec<u8>, values: Vec<u8>) -> Self {
        Self {
            data: offsets,
            var: Some(values),
        }
    }

    fn offset_at(&self, cell: u64) -> TesseraResult<u64> {
        let start = usize::try_from(cell * 8)
            .map_err(|_| tessera_err!(Internal: "cell offset out of addressable range"))?;
        let bytes = self
            .data
            .get(start..start + 8)
            .ok_or_else(|| tessera_err!(Internal: "cell {cell} beyond offsets buffer"))?;
        u64::try_from_le_bytes(bytes)
    }
}

#[derive(Debug)]
struct TileMeta {
    mbr: Vec<(CoordValue, CoordValue)>,
    /// Per attribute `(size, var_size)`, the coords channel last.
    sizes: Vec<(u64, u64)>,
}

/// An immutable layer of cells with derived per-tile metadata.
#[derive(Debug)]
pub struct Fragment {
    schema: Arc<ArraySchema>,
    /// Packed coordinate tuples, sparse fragments only.
    coords: Option<Vec<u8>>,
    attrs: Vec<AttributeData>,
    tiles: Vec<TileMeta>,
    rtree: RTree,
    cell_count: u64,
}

impl Fragment {
    /// Build a dense fragment from per-attribute buffers written in global
    /// order over the full array domain.
    pub fn dense(
        schema: Arc<ArraySchema>,
        writes: Vec<(String, AttributeData)>,
    ) -> TesseraResult<Self> {
        if !schema.is_dense() {
            tessera_bail!(Internal: "dense fragment against a sparse schema");
        }
        match_each_domain_type!(schema.domain_type(), |$T| {
            Self::dense_typed::<$T>(schema, writes)
        })
    }

    /// Build a sparse fragment from packed coordinate tuples and matching
    /// per-attribute buffers, both in the written cell order.
    pub fn sparse(
        schema: Arc<ArraySchema>,
        coords: Vec<u8>,
        writes: Vec<(String, AttributeData)>,
    ) -> TesseraResult<Self> {
        if schema.is_dense() {
            tessera_bail!(Internal: "sparse fragment against a dense schema");
        }
        match_each_domain_type!(schema.domain_type(), |$T| {
            Self::sparse_typed::<$T>(schema, coords, writes)
        })
    }

    fn dense_typed<T: NativeDomainType>(
        schema: Arc<ArraySchema>,
        writes: Vec<(String, AttributeData)>,
    ) -> TesseraResult<Self> {
        let cell_count = schema.domain_cell_count::<T>()?;
        let attrs = collect_attribute_data(&schema, writes, cell_count)?;
        let cells_per_tile = schema.cells_per_tile::<T>()?;
        let tile_num = cell_count / cells_per_tile;
        let grid = schema.tile_grid::<T>()?;

        let mut tiles = Vec::with_capacity(usize::try_from(tile_num).unwrap_or(0));
        for tile in 0..tile_num {
            let mbr = dense_tile_mbr::<T>(&schema, &grid, tile)?;
            let first = tile * cells_per_tile;
            let sizes = tile_sizes(&schema, &attrs, first, cells_per_tile)?;
            tiles.push(TileMeta { mbr, sizes });
        }
        let rtree = RTree::new(tiles.iter().map(|t| t.mbr.clone()).collect(), DEFAULT_FANOUT)?;
        log::debug!(
            "built dense fragment: {cell_count} cells over {tile_num} tiles"
        );
        Ok(Self {
            schema,
            coords: None,
            attrs,
            tiles,
            rtree,
            cell_count,
        })
    }

    fn sparse_typed<T: NativeDomainType>(
        schema: Arc<ArraySchema>,
        coords: Vec<u8>,
        writes: Vec<(String, AttributeData)>,
    ) -> TesseraResult<Self> {
        let tuple_size = schema.cell_size(COORDS)?;
        if tuple_size == 0 || coords.len() as u64 % tuple_size != 0 {
            tessera_bail!(
                Internal: "coords buffer length {} is not a whole number of tuples",
                coords.len()
            );
        }
        let cell_count = coords.len() as u64 / tuple_size;
        let attrs = collect_attribute_data(&schema, writes, cell_count)?;

        let capacity = schema.capacity();
        let tile_num = cell_count.div_ceil(capacity);
        let mut tiles = Vec::with_capacity(usize::try_from(tile_num).unwrap_or(0));
        for tile in 0..tile_num {
            let first = tile * capacity;
            let count = capacity.min(cell_count - first);
            let mbr = sparse_tile_mbr::<T>(&schema, &coords, first, count)?;
            let sizes = tile_sizes(&schema, &attrs, first, count)?;
            tiles.push(TileMeta { mbr, sizes });
        }
        let rtree = RTree::new(tiles.iter().map(|t| t.mbr.clone()).collect(), DEFAULT_FANOUT)?;
        log::debug!(
            "built sparse fragment: {cell_count} cells over {tile_num} tiles"
        );
        Ok(Self {
            schema,
            coords: Some(coords),
            attrs,
            tiles,
            rtree,
            cell_count,
        })
    }

    /// The schema this fragment was written against.
    pub fn schema(&self) -> &Arc<ArraySchema> {
        &self.schema
    }

    /// Whether the fragment is dense.
    pub fn is_dense(&self) -> bool {
        self.coords.is_none()
    }

    /// Number of cells in the fragment.
    pub fn cell_count(&self) -> u64 {
        self.cell_count
    }

    /// Number of data tiles.
    pub fn tile_num(&self) -> u64 {
        self.tiles.len() as u64
    }

    /// The R-tree over this fragment's tile MBRs.
    pub fn rtree(&self) -> &RTree {
        &self.rtree
    }

    /// The MBR of tile `tile_id`.
    pub fn mbr(&self, tile_id: u64) -> TesseraResult<&[(CoordValue, CoordValue)]> {
        self.tile(tile_id).map(|t| t.mbr.as_slice())
    }

    /// Persisted size of `(attr, tile_id)`: packed values for fixed-size
    /// attributes, packed offsets for var-sized ones.
    pub fn tile_size(&self, attr: &str, tile_id: u64) -> TesseraResult<u64> {
        let slot = self.attr_slot(attr)?;
        Ok(self.tile(tile_id)?.sizes[slot].0)
    }

    /// Persisted size of the value bytes of var-sized `(attr, tile_id)`.
    pub fn tile_var_size(&self, attr: &str, tile_id: u64) -> TesseraResult<u64> {
        if !self.schema.var_size(attr)? {
            tessera_bail!(InvalidAttribute: "attribute {attr} is fixed-sized");
        }
        let slot = self.attr_slot(attr)?;
        Ok(self.tile(tile_id)?.sizes[slot].1)
    }

    /// The packed value of fixed-size attribute slot `attr_idx` at `cell`.
    pub fn fixed_cell(&self, attr_idx: usize, cell: u64) -> TesseraResult<&[u8]> {
        let attr = self.attribute_at(attr_idx)?;
        let cell_size = attr.cell_size().ok_or_else(|| {
            tessera_err!(InvalidAttribute: "attribute {} is variable-sized", attr.name())
        })?;
        let start = usize::try_from(cell * cell_size)
            .map_err(|_| tessera_err!(Internal: "cell offset out of addressable range"))?;
        let size = usize::try_from(cell_size)
            .map_err(|_| tessera_err!(Internal: "cell size out of addressable range"))?;
        self.attrs[attr_idx]
            .data
            .get(start..start + size)
            .ok_or_else(|| tessera_err!(Internal: "cell {cell} beyond attribute buffer"))
    }

    /// The value bytes of var-sized attribute slot `attr_idx` at `cell`.
    pub fn var_cell(&self, attr_idx: usize, cell: u64) -> TesseraResult<&[u8]> {
        self.attribute_at(attr_idx)?;
        let data = &self.attrs[attr_idx];
        let values = data
            .var
            .as_ref()
            .ok_or_else(|| tessera_err!(InvalidAttribute: "attribute is fixed-sized"))?;
        let start = data.offset_at(cell)?;
        let end = if cell + 1 < self.cell_count {
            data.offset_at(cell + 1)?
        } else {
            values.len() as u64
        };
        let range = usize::try_from(start)
            .ok()
            .zip(usize::try_from(end).ok())
            .ok_or_else(|| tessera_err!(Internal: "value offset out of addressable range"))?;
        values
            .get(range.0..range.1)
            .ok_or_else(|| tessera_err!(Internal: "value bytes beyond values buffer"))
    }

    /// The packed coordinate tuple at `cell` (sparse fragments only).
    pub fn coords_cell(&self, cell: u64) -> TesseraResult<&[u8]> {
        let coords = self
            .coords
            .as_ref()
            .ok_or_else(|| tessera_err!(Internal: "dense fragments store no coordinates"))?;
        let tuple_size = self.schema.cell_size(COORDS)?;
        let start = usize::try_from(cell * tuple_size)
            .map_err(|_| tessera_err!(Internal: "cell offset out of addressable range"))?;
        let size = usize::try_from(tuple_size)
            .map_err(|_| tessera_err!(Internal: "tuple size out of addressable range"))?;
        coords
            .get(start..start + size)
            .ok_or_else(|| tessera_err!(Internal: "cell {cell} beyond coords buffer"))
    }

    /// The coordinate tuple at `cell`, decoded as the native type `T`.
    pub fn typed_coords<T: NativeDomainType>(&self, cell: u64) -> TesseraResult<Vec<T>> {
        let tuple = self.coords_cell(cell)?;
        let width = usize::try_from(self.schema.domain_type().byte_width())
            .map_err(|_| tessera_err!(Internal: "coordinate width out of range"))?;
        tuple
            .chunks_exact(width)
            .map(T::try_from_le_bytes)
            .collect()
    }

    fn tile(&self, tile_id: u64) -> TesseraResult<&TileMeta> {
        usize::try_from(tile_id)
            .ok()
            .and_then(|t| self.tiles.get(t))
            .ok_or_else(|| tessera_err!(Internal: "tile {tile_id} out of bounds"))
    }

    /// Index of `attr` into the per-tile size table; the coords channel maps
    /// to the trailing slot.
    fn attr_slot(&self, attr: &str) -> TesseraResult<usize> {
        if attr == COORDS {
            return Ok(self.schema.attributes().len());
        }
        self.schema
            .attributes()
            .iter()
            .position(|a| a.name() == attr)
            .ok_or_else(|| tessera_err!(InvalidAttribute: "unknown attribute {attr}"))
    }

    fn attribute_at(&self, attr_idx: usize) -> TesseraResult<&Attribute> {
        self.schema
            .attributes()
            .get(attr_idx)
            .ok_or_else(|| tessera_err!(Internal: "attribute slot {attr_idx} out of bounds"))
    }
}

/// Reorder `writes` into schema attribute order, validating presence and
/// buffer arity/length for `cell_count` cells.
fn collect_attribute_data(
    schema: &ArraySchema,
    writes: Vec<(String, AttributeData)>,
    cell_count: u64,
) -> TesseraResult<Vec<AttributeData>> {
    let mut slots: Vec<Option<AttributeData>> = vec![None; schema.attributes().len()];
    for (name, data) in writes {
        let idx = schema
            .attributes()
            .iter()
            .position(|a| a.name() == name)
            .ok_or_else(|| tessera_err!(InvalidAttribute: "unknown attribute {name}"))?;
        let attr = &schema.attributes()[idx];
        match attr.cell_size() {
            Some(cell_size) => {
                if data.var.is_some() {
                    tessera_bail!(
                        InvalidAttribute: "attribute {name} is fixed-sized but got a values buffer"
                    );
                }
                if data.data.len() as u64 != safe_mul(cell_count, cell_size) {
                    tessera_bail!(
                        InvalidAttribute: "attribute {name} expects {} bytes, got {}",
                        safe_mul(cell_count, cell_size),
                        data.data.len()
                    );
                }
            }
            None => {
                if data.var.is_none() {
                    tessera_bail!(
                        InvalidAttribute: "attribute {name} is var-sized but got no values buffer"
                    );
                }
                if data.data.len() as u64 != cell_count * 8 {
                    tessera_bail!(
                        InvalidAttribute: "attribute {name} expects {cell_count} offsets"
                    );
                }
            }
        }
        slots[idx] = Some(data);
    }
    slots
        .into_iter()
        .zip_eq(schema.attributes())
        .map(|(slot, attr)| {
            slot.ok_or_else(|| {
                tessera_err!(InvalidAttribute: "missing buffers for attribute {}", attr.name())
            })
        })
        .collect()
}

/// Per-attribute `(size, var_size)` of the tile spanning cells
/// `[first, first + count)`, with the coords channel in the trailing slot.
fn tile_sizes(
    schema: &ArraySchema,
    attrs: &[AttributeData],
    first: u64,
    count: u64,
) -> TesseraResult<Vec<(u64, u64)>> {
    let mut sizes = Vec::with_capacity(attrs.len() + 1);
    for (attr, data) in schema.attributes().iter().zip_eq(attrs) {
        match attr.cell_size() {
            Some(cell_size) => sizes.push((safe_mul(count, cell_size), 0)),
            None => {
                let start = data.offset_at(first)?;
                let end_cell = first + count;
                let end = if end_cell * 8 < data.data.len() as u64 {
                    data.offset_at(end_cell)?
                } else {
                    data.var.as_ref().map(|v| v.len() as u64).unwrap_or(0)
                };
                sizes.push((count * 8, end - start));
            }
        }
    }
    sizes.push((safe_mul(count, schema.cell_size(COORDS)?), 0));
    Ok(sizes)
}

fn dense_tile_mbr<T: NativeDomainType>(
    schema: &ArraySchema,
    grid: &[u64],
    tile: u64,
) -> TesseraResult<Vec<(CoordValue, CoordValue)>> {
    let tile_coords = delinearize(tile, grid, schema.tile_order());
    let mut mbr = Vec::with_capacity(grid.len());
    for (dim, tc) in schema.dimensions().iter().zip_eq(tile_coords) {
        let [lo, _] = dim.typed_domain::<T>()?;
        let extent = dim
            .tile_extent()
            .and_then(CoordValue::cast::<T>)
            .ok_or_else(|| tessera_err!(Internal: "dense dimension without tile extent"))?;
        let extent_i = extent
            .to_i128()
            .ok_or_else(|| tessera_err!(Internal: "tile extent out of range"))?;
        let lo_i = lo
            .to_i128()
            .ok_or_else(|| tessera_err!(Internal: "domain bound out of range"))?;
        let tile_lo = lo_i + i128::from(tc) * extent_i;
        let tile_hi = tile_lo + extent_i - 1;
        let tile_lo = T::from_i128(tile_lo)
            .ok_or_else(|| tessera_err!(Internal: "tile bound out of domain type range"))?;
        let tile_hi = T::from_i128(tile_hi)
            .ok_or_else(|| tessera_err!(Internal: "tile bound out of domain type range"))?;
        mbr.push((tile_lo.into(), tile_hi.into()));
    }
    Ok(mbr)
}

fn sparse_tile_mbr<T: NativeDomainType>(
    schema: &ArraySchema,
    coords: &[u8],
    first: u64,
    count: u64,
) -> TesseraResult<Vec<(CoordValue, CoordValue)>> {
    let dim_num = schema.dimensions().len();
    let width = usize::try_from(schema.domain_type().byte_width())
        .map_err(|_| tessera_err!(Internal: "coordinate width out of range"))?;
    let tuple_size = dim_num * width;
    let mut bounds: Vec<Option<(T, T)>> = vec![None; dim_num];
    for cell in first..first + count {
        let start = usize::try_from(cell)
            .map_err(|_| tessera_err!(Internal: "cell index out of addressable range"))?
            * tuple_size;
        let tuple = coords
            .get(start..start + tuple_size)
            .ok_or_else(|| tessera_err!(Internal: "cell {cell} beyond coords buffer"))?;
        for (d, chunk) in tuple.chunks_exact(width).enumerate() {
            let value = T::try_from_le_bytes(chunk)?;
            bounds[d] = Some(match bounds[d] {
                None => (value, value),
                Some((lo, hi)) => (
                    if value.total_compare(lo).is_lt() { value } else { lo },
                    if value.total_compare(hi).is_gt() { value } else { hi },
                ),
            });
        }
    }
    bounds
        .into_iter()
        .map(|b| {
            b.map(|(lo, hi)| (lo.into(), hi.into()))
                .ok_or_else(|| tessera_err!(Internal: "empty tile has no MBR"))
        })
        .collect()
}

/// Inverse of [`crate::linearize`]: split a linear index into per-dimension
/// coordinates within a box of `sizes`.
pub fn delinearize(mut idx: u64, sizes: &[u64], order: crate::Layout) -> Vec<u64> {
    let mut coords = vec![0u64; sizes.len()];
    match order {
        crate::Layout::ColMajor => {
            for (c, s) in coords.iter_mut().zip(sizes) {
                *c = idx % s;
                idx /= s;
            }
        }
        _ => {
            for (c, s) in coords.iter_mut().zip(sizes).rev() {
                *c = idx % s;
                idx /= s;
            }
        }
    }
    coords
}

#[cfg(test)]
mod tests {
    use tessera_dtype::{DomainType, ToBytes};

    use super::*;
    use crate::{CellValNum, Dimension, Layout};

    fn dense_schema() -> Arc<ArraySchema> {
        Arc::new(
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
            .unwrap(),
        )
    }

    fn packed<T: ToBytes>(values: &[T]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes().to_vec()).collect()
    }

    pub(crate) fn dense_writes() -> Vec<(String, AttributeData)> {
        let a1: Vec<i32> = (0..16).collect();
        let a2_off: Vec<u64> = vec![0, 1, 3, 6, 10, 11, 13, 16, 20, 21, 23, 26, 30, 31, 33, 36];
        let a2_val = b"abbcccddddeffggghhhhijjkkkllllmnnooopppp".to_vec();
        let a3: Vec<f32> = (0..16).flat_map(|i| [i as f32 + 0.1, i as f32 + 0.2]).collect();
        vec![
            ("a1".to_string(), AttributeData::fixed(packed(&a1))),
            ("a2".to_string(), AttributeData::var(packed(&a2_off), a2_val)),
            ("a3".to_string(), AttributeData::fixed(packed(&a3))),
        ]
    }

    #[test]
    fn dense_fragment_tile_metadata() {
        let fragment = Fragment::dense(dense_schema(), dense_writes()).unwrap();
        assert_eq!(fragment.cell_count(), 16);
        assert_eq!(fragment.tile_num(), 4);

        // Fixed a1: 4 cells of 4 bytes per tile.
        assert_eq!(fragment.tile_size("a1", 0).unwrap(), 16);
        // Var a2: 4 offsets of 8 bytes; tile 0 holds "a","bb","ccc","dddd".
        assert_eq!(fragment.tile_size("a2", 0).unwrap(), 32);
        assert_eq!(fragment.tile_var_size("a2", 0).unwrap(), 10);
        assert_eq!(fragment.tile_var_size("a2", 3).unwrap(), 10);
        // Coords channel sizes exist even for dense fragments.
        assert_eq!(fragment.tile_size(COORDS, 0).unwrap(), 64);

        assert!(fragment.tile_var_size("a1", 0).is_err());
        assert!(fragment.tile_size("nope", 0).is_err());
    }

    #[test]
    fn dense_fragment_cell_access() {
        let fragment = Fragment::dense(dense_schema(), dense_writes()).unwrap();
        assert_eq!(fragment.fixed_cell(0, 5).unwrap(), 5i32.to_le_bytes());
        assert_eq!(fragment.var_cell(1, 1).unwrap(), b"bb");
        assert_eq!(fragment.var_cell(1, 15).unwrap(), b"pppp");
        assert!(fragment.coords_cell(0).is_err());
    }

    #[test]
    fn dense_mbrs_follow_tile_order() {
        let fragment = Fragment::dense(dense_schema(), dense_writes()).unwrap();
        let mbr = fragment.mbr(1).unwrap();
        assert_eq!(mbr[0].0.as_u64(), Some(1));
        assert_eq!(mbr[0].1.as_u64(), Some(2));
        assert_eq!(mbr[1].0.as_u64(), Some(3));
        assert_eq!(mbr[1].1.as_u64(), Some(4));
    }

    fn sparse_schema() -> Arc<ArraySchema> {
        Arc::new(
            ArraySchema::sparse(
                vec![
                    Dimension::new("d1", [1u64, 4], Some(2)).unwrap(),
                    Dimension::new("d2", [1u64, 4], Some(2)).unwrap(),
                ],
                vec![
                    Attribute::new("a1", DomainType::I32),
                    Attribute::new("a2", DomainType::U8).var(),
                ],
                Layout::RowMajor,
                Layout::RowMajor,
                2,
            )
            .unwrap(),
        )
    }

    pub(crate) fn sparse_coords() -> Vec<u8> {
        packed(&[1u64, 1, 1, 2, 1, 4, 2, 3, 3, 1, 4, 2, 3, 3, 3, 4])
    }

    #[test]
    fn sparse_fragment_capacity_tiles() {
        let a1: Vec<i32> = (0..8).collect();
        let a2_off: Vec<u64> = vec![0, 1, 3, 6, 10, 11, 13, 16];
        let a2_val = b"abbcccddddeffggghhhh".to_vec();
        let fragment = Fragment::sparse(
            sparse_schema(),
            sparse_coords(),
            vec![
                ("a1".to_string(), AttributeData::fixed(packed(&a1))),
                ("a2".to_string(), AttributeData::var(packed(&a2_off), a2_val)),
            ],
        )
        .unwrap();

        assert_eq!(fragment.cell_count(), 8);
        // Capacity 2 slices 8 cells into 4 tiles.
        assert_eq!(fragment.tile_num(), 4);

        // Tile 0 holds (1,1) and (1,2).
        let mbr = fragment.mbr(0).unwrap();
        assert_eq!(mbr[0].0.as_u64(), Some(1));
        assert_eq!(mbr[0].1.as_u64(), Some(1));
        assert_eq!(mbr[1].0.as_u64(), Some(1));
        assert_eq!(mbr[1].1.as_u64(), Some(2));

        // Tile 1 holds (1,4) and (2,3).
        let mbr = fragment.mbr(1).unwrap();
        assert_eq!(mbr[0].0.as_u64(), Some(1));
        assert_eq!(mbr[0].1.as_u64(), Some(2));
        assert_eq!(mbr[1].0.as_u64(), Some(3));
        assert_eq!(mbr[1].1.as_u64(), Some(4));

        assert_eq!(fragment.tile_size("a1", 0).unwrap(), 8);
        assert_eq!(fragment.tile_var_size("a2", 0).unwrap(), 3);
        assert_eq!(fragment.tile_size(COORDS, 0).unwrap(), 32);

        assert_eq!(fragment.typed_coords::<u64>(3).unwrap(), vec![2, 3]);
        assert_eq!(fragment.var_cell(1, 3).unwrap(), b"dddd");
    }

    #[test]
    fn missing_attribute_write_is_rejected() {
        let a1: Vec<i32> = (0..8).collect();
        let err = Fragment::sparse(
            sparse_schema(),
            sparse_coords(),
            vec![("a1".to_string(), AttributeData::fixed(packed(&a1)))],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            tessera_error::TesseraError::InvalidAttribute(_)
        ));
    }

    #[test]
    fn delinearize_row_and_col_major() {
        assert_eq!(delinearize(5, &[2, 2, 2], Layout::RowMajor), vec![1, 0, 1]);
        assert_eq!(delinearize(5, &[2, 2, 2], Layout::ColMajor), vec![1, 0, 1]);
        assert_eq!(delinearize(6, &[2, 4], Layout::RowMajor), vec![1, 2]);
        assert_eq!(delinearize(6, &[2, 4], Layout::ColMajor), vec![0, 3]);
    }
}
