//! Attribute definitions.

use tessera_dtype::DomainType;

/// Reserved name addressing the coordinate tuple of a cell on sparse reads.
pub const COORDS: &str = "__coords";

/// Bytes of one entry in a var-sized attribute's offsets buffer.
pub const CELL_VAR_OFFSET_SIZE: u64 = 8;

/// Number of values per cell of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellValNum {
    /// Exactly `n` values per cell.
    Fixed(u32),
    /// A variable number of values per cell.
    Var,
}

/// Compression codec tag for an attribute's tiles.
///
/// Opaque to the read-query core; carried through so fragment tile sizes can
/// be interpreted as persisted (compressed) sizes by the estimator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compressor {
    /// No compression.
    #[default]
    None,
    /// Blosc with the LZ codec.
    BloscLz,
    /// Gzip.
    Gzip,
    /// Zstandard.
    Zstd,
    /// LZ4.
    Lz4,
}

/// A named per-cell value channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: String,
    dtype: DomainType,
    cell_val_num: CellValNum,
    compressor: Compressor,
}

impl Attribute {
    /// Create a fixed-size attribute holding one value per cell.
    pub fn new(name: impl Into<String>, dtype: DomainType) -> Self {
        Self {
            name: name.into(),
            dtype,
            cell_val_num: CellValNum::Fixed(1),
            compressor: Compressor::default(),
        }
    }

    /// Set the number of values per cell.
    pub fn with_cell_val_num(mut self, cell_val_num: CellValNum) -> Self {
        self.cell_val_num = cell_val_num;
        self
    }

    /// Mark the attribute as variable-sized.
    pub fn var(self) -> Self {
        self.with_cell_val_num(CellValNum::Var)
    }

    /// Set the compressor tag.
    pub fn with_compressor(mut self, compressor: Compressor) -> Self {
        self.compressor = compressor;
        self
    }

    /// The attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The value scalar type.
    pub fn dtype(&self) -> DomainType {
        self.dtype
    }

    /// The number of values per cell.
    pub fn cell_val_num(&self) -> CellValNum {
        self.cell_val_num
    }

    /// The compressor tag.
    pub fn compressor(&self) -> Compressor {
        self.compressor
    }

    /// Whether the attribute is variable-sized.
    pub fn var_size(&self) -> bool {
        matches!(self.cell_val_num, CellValNum::Var)
    }

    /// Bytes of one cell value, `None` for variable-sized attributes.
    pub fn cell_size(&self) -> Option<u64> {
        match self.cell_val_num {
            CellValNum::Fixed(n) => Some(u64::from(n) * self.dtype.byte_width()),
            CellValNum::Var => None,
        }
    }
}
