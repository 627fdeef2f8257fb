//! The read-query state machine.

use std::sync::Arc;

use tessera_array::{Array, Layout, QueryMode, COORDS};
use tessera_dtype::{match_each_domain_type, CoordValue, NativeDomainType, ToBytes};
use tessera_error::{tessera_bail, tessera_err, TesseraResult};
use tessera_scan::Subarray;

use crate::reader::RangeCells;
use crate::QueryBuffers;

/// Where a read query stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Created, nothing submitted yet.
    Ready,
    /// A submit is executing.
    InProgress,
    /// The caller buffers filled up before the result completed; resubmit to
    /// continue from the cursor.
    Incomplete,
    /// The whole result has been emitted.
    Completed,
    /// A submit failed; only `finalize` is legal now.
    Failed,
}

enum TargetKind {
    Fixed { attr_idx: usize, cell_size: u64 },
    Var { attr_idx: usize },
    Coords { tuple_size: u64 },
}

/// One bound output channel: a buffer entry plus how to fill it.
struct Target {
    entry_idx: usize,
    kind: TargetKind,
}

#[derive(Debug, Default, Clone, Copy)]
struct Cursor {
    range_idx: u64,
    /// Cells already emitted from the current range.
    cell: u64,
}

/// An incremental read over one subarray of an open array.
///
/// The query owns its subarray once built and borrows the caller buffers for
/// its lifetime; between submits the caller inspects results through
/// [`ReadQuery::buffers`]. Submitting is strictly single-threaded from the
/// caller's perspective.
pub struct ReadQuery<'a> {
    array: Arc<Array>,
    layout: Layout,
    bounds: Option<Vec<(CoordValue, CoordValue)>>,
    subarray: Option<Subarray>,
    buffers: Option<QueryBuffers<'a>>,
    targets: Vec<Target>,
    original_capacities: Vec<(u64, Option<u64>)>,
    status: QueryStatus,
    cursor: Cursor,
    finalized: bool,
}

impl<'a> ReadQuery<'a> {
    /// Create a read query against an open array.
    pub fn new(array: Arc<Array>, mode: QueryMode) -> TesseraResult<Self> {
        let QueryMode::Read = mode;
        Ok(Self {
            array,
            layout: Layout::Unordered,
            bounds: None,
            subarray: None,
            buffers: None,
            targets: Vec::new(),
            original_capacities: Vec::new(),
            status: QueryStatus::Ready,
            cursor: Cursor::default(),
            finalized: false,
        })
    }

    /// Restrict the query to the axis-aligned box `bounds`, flattened as
    /// `[lo_0, hi_0, lo_1, hi_1, ...]` over the dimensions.
    pub fn set_subarray<T: NativeDomainType>(&mut self, bounds: &[T]) -> TesseraResult<()> {
        self.ensure_mutable()?;
        let dim_num = self.array.schema().dim_num() as usize;
        if bounds.len() != 2 * dim_num {
            tessera_bail!(
                InvalidRange: "subarray bounds need {} values, got {}",
                2 * dim_num,
                bounds.len()
            );
        }
        // Validate eagerly by building the subarray.
        let mut subarray = Subarray::new(self.array.clone(), self.layout)?;
        let mut tagged = Vec::with_capacity(dim_num);
        for dim_idx in 0..dim_num {
            let pair = [bounds[2 * dim_idx], bounds[2 * dim_idx + 1]];
            subarray.add_range(
                u32::try_from(dim_idx).unwrap_or(u32::MAX),
                pair,
            )?;
            tagged.push((pair[0].into(), pair[1].into()));
        }
        self.bounds = Some(tagged);
        self.subarray = Some(subarray);
        Ok(())
    }

    /// Set the emission layout hint.
    pub fn set_layout(&mut self, layout: Layout) -> TesseraResult<()> {
        self.ensure_mutable()?;
        self.layout = layout;
        // Rebuild the subarray under the new layout at the next submit.
        self.subarray = None;
        Ok(())
    }

    /// Bind the caller buffers, one entry per target attribute (or the
    /// coords channel on sparse reads).
    pub fn set_buffers(&mut self, buffers: QueryBuffers<'a>) -> TesseraResult<()> {
        self.ensure_mutable()?;
        if buffers.is_empty() {
            tessera_bail!(InvalidAttribute: "a read query needs at least one target buffer");
        }
        let schema = self.array.schema().clone();
        let mut targets = Vec::with_capacity(buffers.len());
        let mut capacities = Vec::with_capacity(buffers.len());
        for (entry_idx, entry) in buffers.entries().iter().enumerate() {
            let name = entry.name();
            if buffers.entries()[..entry_idx]
                .iter()
                .any(|other| other.name() == name)
            {
                tessera_bail!(InvalidAttribute: "attribute {name} bound twice");
            }
            let kind = if name == COORDS {
                if self.array.dense() {
                    tessera_bail!(
                        InvalidAttribute: "the {COORDS} channel is only readable from sparse arrays"
                    );
                }
                if entry.is_var() {
                    tessera_bail!(InvalidAttribute: "{COORDS} is fixed-sized");
                }
                TargetKind::Coords {
                    tuple_size: schema.cell_size(COORDS)?,
                }
            } else {
                let (attr_idx, attr) = schema
                    .attributes()
                    .iter()
                    .enumerate()
                    .find(|(_, a)| a.name() == name)
                    .ok_or_else(|| tessera_err!(InvalidAttribute: "unknown attribute {name}"))?;
                match attr.cell_size() {
                    Some(cell_size) => {
                        if entry.is_var() {
                            tessera_bail!(
                                InvalidAttribute: "attribute {name} is fixed-sized, bind one buffer"
                            );
                        }
                        TargetKind::Fixed {
                            attr_idx,
                            cell_size,
                        }
                    }
                    None => {
                        if !entry.is_var() {
                            tessera_bail!(
                                InvalidAttribute:
                                "attribute {name} is var-sized, bind offsets and values buffers"
                            );
                        }
                        TargetKind::Var { attr_idx }
                    }
                }
            };
            capacities.push((entry.data_capacity(), entry.var_capacity()));
            targets.push(Target { entry_idx, kind });
        }
        self.targets = targets;
        self.original_capacities = capacities;
        self.buffers = Some(buffers);
        Ok(())
    }

    /// Swap in fresh buffers between submits, returning the previous ones.
    ///
    /// Capacities must not shrink below the originally bound capacities.
    pub fn reset_buffers(
        &mut self,
        buffers: QueryBuffers<'a>,
    ) -> TesseraResult<QueryBuffers<'a>> {
        let current = self
            .buffers
            .as_ref()
            .ok_or_else(|| tessera_err!(Internal: "no buffers bound to this query"))?;
        if buffers.len() != current.len() {
            tessera_bail!(
                InvalidAttribute: "buffer reset must bind the same {} attributes",
                current.len()
            );
        }
        for ((entry, current_entry), (data_cap, var_cap)) in buffers
            .entries()
            .iter()
            .zip(current.entries())
            .zip(&self.original_capacities)
        {
            if entry.name() != current_entry.name() || entry.is_var() != current_entry.is_var() {
                tessera_bail!(
                    InvalidAttribute: "buffer reset must bind the same attributes in order"
                );
            }
            if entry.data_capacity() < *data_cap
                || entry.var_capacity().unwrap_or(0) < var_cap.unwrap_or(0)
            {
                tessera_bail!(
                    InvalidBufferSize:
                    "buffers for {} cannot shrink below their original capacity",
                    entry.name()
                );
            }
        }
        let previous = self
            .buffers
            .replace(buffers)
            .ok_or_else(|| tessera_err!(Internal: "no buffers bound to this query"))?;
        Ok(previous)
    }

    /// The bound buffers, for inspecting produced bytes between submits.
    pub fn buffers(&self) -> Option<&QueryBuffers<'a>> {
        self.buffers.as_ref()
    }

    /// The current status.
    pub fn status(&self) -> QueryStatus {
        self.status
    }

    /// Run the read until the buffers fill or the result completes.
    pub fn submit(&mut self) -> TesseraResult<QueryStatus> {
        if self.finalized {
            tessera_bail!(Internal: "cannot submit a finalized query");
        }
        match self.status {
            QueryStatus::Failed => {
                tessera_bail!(Internal: "query is in a failed state; only finalize is legal")
            }
            QueryStatus::Completed => return Ok(QueryStatus::Completed),
            _ => {}
        }
        if self.buffers.is_none() {
            tessera_bail!(Internal: "no buffers bound to this query");
        }
        self.ensure_subarray()?;
        self.status = QueryStatus::InProgress;
        if let Some(buffers) = self.buffers.as_mut() {
            buffers.reset_produced();
        }
        let domain_type = self.array.schema().domain_type();
        let outcome = match_each_domain_type!(domain_type, |$T| {
            self.stream_cells::<$T>()
        });
        match outcome {
            Ok(status) => {
                self.status = status;
                Ok(status)
            }
            Err(err) => {
                log::debug!("read submit failed: {err}");
                self.status = QueryStatus::Failed;
                Err(err)
            }
        }
    }

    /// Mark the query finished. Idempotent, and legal from any state.
    pub fn finalize(&mut self) -> TesseraResult<()> {
        self.finalized = true;
        Ok(())
    }

    /// Give back the caller buffers, if any are still bound.
    pub fn take_buffers(&mut self) -> Option<QueryBuffers<'a>> {
        self.buffers.take()
    }

    fn ensure_mutable(&self) -> TesseraResult<()> {
        if self.finalized {
            tessera_bail!(Internal: "query is finalized");
        }
        if !matches!(self.status, QueryStatus::Ready) {
            tessera_bail!(Internal: "query configuration is frozen after the first submit");
        }
        Ok(())
    }

    fn ensure_subarray(&mut self) -> TesseraResult<()> {
        if self.subarray.is_some() {
            return Ok(());
        }
        let mut subarray = Subarray::new(self.array.clone(), self.layout)?;
        if let Some(bounds) = &self.bounds {
            for (dim_idx, (lo, hi)) in bounds.iter().enumerate() {
                subarray.add_range_value(
                    u32::try_from(dim_idx).unwrap_or(u32::MAX),
                    *lo,
                    *hi,
                )?;
            }
        }
        self.subarray = Some(subarray);
        Ok(())
    }

    /// The order cells leave the engine in, derived from the layout hint.
    fn emission_order(&self) -> Layout {
        match self.layout {
            Layout::RowMajor | Layout::ColMajor => self.layout,
            Layout::Unordered | Layout::GlobalOrder => self.array.schema().cell_order(),
        }
    }

    fn stream_cells<T: NativeDomainType>(&mut self) -> TesseraResult<QueryStatus> {
        let cell_order = self.emission_order();
        let subarray = self
            .subarray
            .as_ref()
            .ok_or_else(|| tessera_err!(Internal: "no subarray bound to this query"))?;
        let buffers = self
            .buffers
            .as_mut()
            .ok_or_else(|| tessera_err!(Internal: "no buffers bound to this query"))?;
        let range_num = subarray.range_num();
        let mut cells_written = 0u64;

        while self.cursor.range_idx < range_num {
            let range_cells = RangeCells::<T>::new(subarray, self.cursor.range_idx, cell_order)?;
            let count = range_cells.count();
            while self.cursor.cell < count {
                let cell = range_cells.cell(self.cursor.cell)?;

                let mut fits = true;
                for target in &self.targets {
                    let entry = &buffers.entries()[target.entry_idx];
                    let fit = match &target.kind {
                        TargetKind::Fixed { cell_size, .. } => {
                            entry.data_remaining() >= *cell_size
                        }
                        TargetKind::Coords { tuple_size } => {
                            entry.data_remaining() >= *tuple_size
                        }
                        TargetKind::Var { attr_idx } => {
                            let value = cell.fragment.var_cell(*attr_idx, cell.cell_pos)?;
                            entry.data_remaining() >= 8
                                && entry.var_remaining() >= value.len() as u64
                        }
                    };
                    if !fit {
                        fits = false;
                        break;
                    }
                }
                if !fits {
                    if cells_written > 0 {
                        // The cursor already points at the unwritten cell.
                        return Ok(QueryStatus::Incomplete);
                    }
                    tessera_bail!(
                        Unsplittable:
                        "the next cell does not fit in the caller buffers even when empty"
                    );
                }

                for target in &self.targets {
                    let entry = &mut buffers.entries_mut()[target.entry_idx];
                    match &target.kind {
                        TargetKind::Fixed { attr_idx, .. } => {
                            entry.push_data(cell.fragment.fixed_cell(*attr_idx, cell.cell_pos)?)?;
                        }
                        TargetKind::Var { attr_idx } => {
                            let value = cell.fragment.var_cell(*attr_idx, cell.cell_pos)?;
                            let offset = entry.var_produced();
                            entry.push_data(&offset.to_le_bytes())?;
                            entry.push_var(value)?;
                        }
                        TargetKind::Coords { tuple_size } => {
                            let mut tuple =
                                Vec::with_capacity(usize::try_from(*tuple_size).unwrap_or(0));
                            for coord in &cell.coords {
                                tuple.extend_from_slice(ToBytes::to_le_bytes(coord));
                            }
                            entry.push_data(&tuple)?;
                        }
                    }
                }
                cells_written += 1;
                self.cursor.cell += 1;
            }
            self.cursor.range_idx += 1;
            self.cursor.cell = 0;
        }
        Ok(QueryStatus::Completed)
    }
}
