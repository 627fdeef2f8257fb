#![deny(missing_docs)]

//! Tessera is the read-query core of a multi-dimensional array storage
//! engine: typed array domains, subarray selections with layout-aware range
//! enumeration, parallel tile-overlap computation, result-size estimation,
//! and an incremental read protocol that streams whole cells into caller
//! buffers.
//!
//! This crate re-exports the public surface of the workspace crates.

pub use tessera_array as array;
pub use tessera_dtype as dtype;
pub use tessera_error as error;
pub use tessera_query as query;
pub use tessera_scan as scan;

pub use tessera_array::{
    Array, ArraySchema, Attribute, AttributeData, CellValNum, Compressor, Dimension, Fragment,
    HeapAccountant, Layout, QueryMode, RTree, TileOverlap, COORDS,
};
pub use tessera_dtype::{CoordValue, DomainType, NativeDomainType};
pub use tessera_error::{TesseraError, TesseraResult};
pub use tessera_query::{QueryBuffers, QueryStatus, ReadQuery};
pub use tessera_scan::{
    DimensionRanges, EstimationPolicy, ExecDriver, ExecutionMode, ResultSize, Subarray,
};
