//! Incremental read queries.
//!
//! A [`ReadQuery`] binds an open array, a subarray, a layout hint and one
//! caller buffer per fixed-size target (two for var-sized ones). Each
//! [`ReadQuery::submit`] streams whole cells into the buffers until they are
//! exhausted or the result completes; an [`QueryStatus::Incomplete`] query
//! resumes from its cursor on the next submit, and the concatenation of the
//! per-submit buffer contents equals a single large-buffer read.

pub use buffers::*;
pub use query::*;

mod buffers;
mod query;
mod reader;
