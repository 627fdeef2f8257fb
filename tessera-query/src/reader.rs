//! Per-range cell sources for the read state machine.
//!
//! Each subarray range resolves to an ordered cell stream: dense ranges
//! enumerate the range rectangle in cell order and address the fragment by
//! global-order position; sparse ranges gather matching cells from every
//! fragment, let the newest fragment win duplicate coordinates, and sort by
//! cell order. Sources are recomputed per submit, so resuming is idempotent.

use std::cmp::Ordering;
use std::sync::Arc;

use tessera_array::{delinearize, Fragment, HeapAccountant, Layout};
use tessera_dtype::{range_len, safe_mul, NativeDomainType};
use tessera_error::{tessera_err, TesseraResult};
use tessera_scan::Subarray;

/// One cell of the result stream: where its payload lives.
pub(crate) struct CellRef<'f, T> {
    pub fragment: &'f Arc<Fragment>,
    /// Cell position within the fragment's buffers.
    pub cell_pos: u64,
    pub coords: Vec<T>,
}

/// The ordered cells of one subarray range.
pub(crate) enum RangeCells<'f, T: NativeDomainType> {
    Empty,
    Dense {
        fragment: &'f Arc<Fragment>,
        rect: Vec<[T; 2]>,
        lens: Vec<u64>,
        count: u64,
        cell_order: Layout,
    },
    Sparse {
        /// `(coords, fragment_idx, cell_idx)`, sorted in cell order.
        cells: Vec<(Vec<T>, usize, u64)>,
        fragments: &'f [Arc<Fragment>],
        accounting: Option<(HeapAccountant, u64)>,
    },
}

impl<'f, T: NativeDomainType> RangeCells<'f, T> {
    pub(crate) fn new(
        subarray: &'f Subarray,
        range_idx: u64,
        cell_order: Layout,
    ) -> TesseraResult<Self> {
        let array = subarray.array();
        let rect = subarray.range_slices::<T>(range_idx)?;
        if array.dense() {
            // The newest dense fragment covers the domain and shadows older ones.
            let Some(fragment) = array.fragments().last() else {
                return Ok(Self::Empty);
            };
            let lens: Vec<u64> = rect.iter().map(|r| range_len(r[0], r[1])).collect();
            let count = lens.iter().fold(1u64, |acc, len| safe_mul(acc, *len));
            return Ok(Self::Dense {
                fragment,
                rect,
                lens,
                count,
                cell_order,
            });
        }

        let mut cells: Vec<(Vec<T>, usize, u64)> = Vec::new();
        for (fragment_idx, fragment) in array.fragments().iter().enumerate() {
            for cell in 0..fragment.cell_count() {
                let coords = fragment.typed_coords::<T>(cell)?;
                if in_rect(&coords, &rect) {
                    cells.push((coords, fragment_idx, cell));
                }
            }
        }
        // Cell order first; equal coordinates keep the newest fragment.
        cells.sort_by(|a, b| cmp_coords(&a.0, &b.0, cell_order).then(b.1.cmp(&a.1)));
        cells.dedup_by(|next, kept| coords_eq(&next.0, &kept.0));

        let accounting = array.accountant().map(|accountant| {
            let bytes = (cells.len() * std::mem::size_of::<(Vec<T>, usize, u64)>()) as u64;
            accountant.record_alloc("sparse read cell index", bytes);
            (accountant.clone(), bytes)
        });
        Ok(Self::Sparse {
            cells,
            fragments: array.fragments(),
            accounting,
        })
    }

    /// Number of cells this range yields.
    pub(crate) fn count(&self) -> u64 {
        match self {
            Self::Empty => 0,
            Self::Dense { count, .. } => *count,
            Self::Sparse { cells, .. } => cells.len() as u64,
        }
    }

    /// The `i`-th cell of the range, in emission order.
    pub(crate) fn cell(&self, i: u64) -> TesseraResult<CellRef<'f, T>> {
        match self {
            Self::Empty => Err(tessera_err!(Internal: "no cells in an empty range")),
            Self::Dense {
                fragment,
                rect,
                lens,
                cell_order,
                ..
            } => {
                let offsets = delinearize(i, lens, *cell_order);
                let mut coords = Vec::with_capacity(rect.len());
                for (r, off) in rect.iter().zip(offsets) {
                    let lo = r[0]
                        .to_i128()
                        .ok_or_else(|| tessera_err!(Internal: "dense bound out of range"))?;
                    let coord = T::from_i128(lo + i128::from(off)).ok_or_else(|| {
                        tessera_err!(Internal: "coordinate out of domain type range")
                    })?;
                    coords.push(coord);
                }
                let cell_pos = fragment.schema().global_cell_pos::<T>(&coords)?;
                Ok(CellRef {
                    fragment,
                    cell_pos,
                    coords,
                })
            }
            Self::Sparse {
                cells, fragments, ..
            } => {
                let idx = usize::try_from(i)
                    .map_err(|_| tessera_err!(Internal: "cell index out of addressable range"))?;
                let (coords, fragment_idx, cell_idx) = cells
                    .get(idx)
                    .ok_or_else(|| tessera_err!(Internal: "cell index {i} out of bounds"))?;
                Ok(CellRef {
                    fragment: &fragments[*fragment_idx],
                    cell_pos: *cell_idx,
                    coords: coords.clone(),
                })
            }
        }
    }
}

impl<T: NativeDomainType> Drop for RangeCells<'_, T> {
    fn drop(&mut self) {
        if let Self::Sparse {
            accounting: Some((accountant, bytes)),
            ..
        } = self
        {
            accountant.record_dealloc("sparse read cell index", *bytes);
        }
    }
}

fn in_rect<T: NativeDomainType>(coords: &[T], rect: &[[T; 2]]) -> bool {
    coords
        .iter()
        .zip(rect)
        .all(|(c, r)| r[0].total_compare(*c).is_le() && c.total_compare(r[1]).is_le())
}

fn coords_eq<T: NativeDomainType>(a: &[T], b: &[T]) -> bool {
    a.iter()
        .zip(b)
        .all(|(x, y)| x.total_compare(*y).is_eq())
}

/// Compare coordinate tuples in row- or col-major cell order.
fn cmp_coords<T: NativeDomainType>(a: &[T], b: &[T], cell_order: Layout) -> Ordering {
    match cell_order {
        Layout::ColMajor => a
            .iter()
            .zip(b)
            .rev()
            .map(|(x, y)| x.total_compare(*y))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal),
        _ => a
            .iter()
            .zip(b)
            .map(|(x, y)| x.total_compare(*y))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal),
    }
}
