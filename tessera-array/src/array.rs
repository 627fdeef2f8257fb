//! The open array handle.

use std::sync::Arc;

use tessera_error::{tessera_bail, TesseraResult};

use crate::{ArraySchema, Fragment, HeapAccountant};

/// The mode an array was opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Read queries only.
    Read,
}

/// An open array: its schema, its fragments, and optional capabilities.
///
/// The handle is the shared immutable view that subarrays and queries hold
/// onto; cloning it is cheap.
pub struct Array {
    schema: Arc<ArraySchema>,
    fragments: Vec<Arc<Fragment>>,
    accountant: Option<HeapAccountant>,
}

impl Array {
    /// Open an array over the given fragments, oldest first.
    pub fn new(schema: Arc<ArraySchema>, fragments: Vec<Arc<Fragment>>) -> TesseraResult<Self> {
        for fragment in &fragments {
            if fragment.is_dense() != schema.is_dense() {
                tessera_bail!(Internal: "fragment density does not match the schema");
            }
            if fragment.schema().domain_type() != schema.domain_type() {
                tessera_bail!(Internal: "fragment domain type does not match the schema");
            }
        }
        Ok(Self {
            schema,
            fragments,
            accountant: None,
        })
    }

    /// Attach a heap-accounting capability.
    pub fn with_accountant(mut self, accountant: HeapAccountant) -> Self {
        self.accountant = Some(accountant);
        self
    }

    /// The array schema.
    pub fn schema(&self) -> &Arc<ArraySchema> {
        &self.schema
    }

    /// The fragment metadata, oldest fragment first.
    pub fn fragments(&self) -> &[Arc<Fragment>] {
        &self.fragments
    }

    /// The heap accountant, if one was attached.
    pub fn accountant(&self) -> Option<&HeapAccountant> {
        self.accountant.as_ref()
    }

    /// Whether the array is dense.
    pub fn dense(&self) -> bool {
        self.schema.is_dense()
    }
}
