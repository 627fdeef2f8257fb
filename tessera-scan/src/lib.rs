//! Subarrays and their derived read bookkeeping.
//!
//! A [`Subarray`] is the Cartesian product of per-dimension range lists over
//! an open array, with layout-aware linear range enumeration. From it the
//! engine derives, per fragment and per range, the set of intersecting tiles
//! ([`Subarray::compute_tile_overlap`]) and folds fragment tile metadata into
//! estimated result sizes and worst-case memory bounds
//! ([`Subarray::compute_est_result_size`]). Both computations fan out through
//! the [`ExecDriver`] parallel-for capability.

pub use exec::*;
pub use estimate::*;
pub use range::*;
pub use subarray::*;

mod exec;
mod estimate;
mod range;
mod subarray;
