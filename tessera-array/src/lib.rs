//! Array-side collaborators of the tessera read-query core.
//!
//! This crate holds everything the query path consumes but does not own: the
//! array schema (dimensions, attributes, cell/tile layout), immutable
//! in-memory fragments with their derived per-tile metadata (MBRs, tile
//! sizes), the bulk-loaded R-tree used for tile-overlap queries, the open
//! array handle, and the optional heap-accounting capability.

pub use array::*;
pub use attribute::*;
pub use fragment::*;
pub use mem::*;
pub use rtree::*;
pub use schema::*;

mod array;
mod attribute;
mod fragment;
mod mem;
mod rtree;
mod schema;
