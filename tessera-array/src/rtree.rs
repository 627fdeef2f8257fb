//! Bulk-loaded R-tree over tile MBRs.

use tessera_dtype::{range_len, CoordValue, NativeDomainType};
use tessera_error::{tessera_bail, tessera_err, TesseraExpect, TesseraResult};

/// Minimum bounding rectangle: one inclusive `(lo, hi)` pair per dimension.
pub type Mbr = Vec<(CoordValue, CoordValue)>;

/// The tiles of one fragment intersecting one subarray range.
///
/// Fully-covered tiles are coalesced into contiguous inclusive id intervals;
/// partially-covered tiles carry the covered fraction of their MBR.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileOverlap {
    /// Inclusive `[first, last]` tile-id intervals fully inside the range.
    pub tile_ranges: Vec<(u64, u64)>,
    /// `(tile_id, ratio)` pairs for partially covered tiles, `ratio ∈ (0, 1]`.
    pub tiles: Vec<(u64, f64)>,
}

impl TileOverlap {
    /// Whether no tile intersects the range.
    pub fn is_empty(&self) -> bool {
        self.tile_ranges.is_empty() && self.tiles.is_empty()
    }

    fn push_covered(&mut self, first: u64, last: u64) {
        if let Some(prev) = self.tile_ranges.last_mut() {
            if prev.1 + 1 == first {
                prev.1 = last;
                return;
            }
        }
        self.tile_ranges.push((first, last));
    }
}

/// An R-tree bulk-loaded bottom-up from the tile MBRs of a fragment.
///
/// Leaves keep tile order, so a depth-first traversal emits tile ids in
/// ascending order and fully-covered subtrees coalesce into id intervals.
#[derive(Debug, Clone)]
pub struct RTree {
    fanout: usize,
    /// `levels[0]` holds the leaf MBRs; the last level is the root level.
    levels: Vec<Vec<Mbr>>,
}

/// Default R-tree fanout.
pub const DEFAULT_FANOUT: usize = 10;

impl RTree {
    /// Bulk-load a tree from per-tile MBRs.
    pub fn new(leaves: Vec<Mbr>, fanout: usize) -> TesseraResult<Self> {
        if fanout < 2 {
            tessera_bail!(Internal: "r-tree fanout must be at least 2");
        }
        let mut levels = vec![leaves];
        while levels
            .last()
            .tessera_expect("levels is never empty")
            .len()
            > 1
        {
            let below = levels.last().tessera_expect("levels is never empty");
            let mut level = Vec::with_capacity(below.len().div_ceil(fanout));
            for group in below.chunks(fanout) {
                level.push(merge_mbrs(group)?);
            }
            levels.push(level);
        }
        Ok(Self { fanout, levels })
    }

    /// Number of leaf (tile) MBRs.
    pub fn leaf_num(&self) -> u64 {
        self.levels[0].len() as u64
    }

    /// Compute which tiles intersect the axis-aligned box `range`, one
    /// `[lo, hi]` pair per dimension.
    pub fn tile_overlap<T: NativeDomainType>(
        &self,
        range: &[[T; 2]],
    ) -> TesseraResult<TileOverlap> {
        let mut overlap = TileOverlap::default();
        if self.levels[0].is_empty() {
            return Ok(overlap);
        }
        self.visit(range, self.levels.len() - 1, 0, &mut overlap)?;
        Ok(overlap)
    }

    fn visit<T: NativeDomainType>(
        &self,
        range: &[[T; 2]],
        level: usize,
        node: usize,
        overlap: &mut TileOverlap,
    ) -> TesseraResult<()> {
        let mbr = typed_mbr::<T>(&self.levels[level][node])?;
        if !intersects(range, &mbr) {
            return Ok(());
        }
        let (first, last) = self.leaf_span(level, node);
        if contains(range, &mbr) {
            overlap.push_covered(first, last);
            return Ok(());
        }
        if level == 0 {
            let ratio = coverage_ratio(range, &mbr);
            if ratio > 0.0 {
                overlap.tiles.push((first, ratio));
            }
            return Ok(());
        }
        let child_first = node * self.fanout;
        let child_last = ((node + 1) * self.fanout).min(self.levels[level - 1].len());
        for child in child_first..child_last {
            self.visit(range, level - 1, child, overlap)?;
        }
        Ok(())
    }

    /// Inclusive span of leaf ids under node `(level, node)`.
    fn leaf_span(&self, level: usize, node: usize) -> (u64, u64) {
        let width = self.fanout.pow(u32::try_from(level).unwrap_or(u32::MAX));
        let first = node.saturating_mul(width);
        let last = first
            .saturating_add(width)
            .min(self.levels[0].len())
            .saturating_sub(1);
        (first as u64, last as u64)
    }
}

fn merge_mbrs(group: &[Mbr]) -> TesseraResult<Mbr> {
    let mut merged = group[0].clone();
    for mbr in &group[1..] {
        if mbr.len() != merged.len() {
            tessera_bail!(TileOverlap: "tile MBRs disagree on dimensionality");
        }
        for (acc, (lo, hi)) in merged.iter_mut().zip(mbr.iter()) {
            if lo.total_compare(&acc.0).ok_or_else(mixed_types)?.is_lt() {
                acc.0 = *lo;
            }
            if hi.total_compare(&acc.1).ok_or_else(mixed_types)?.is_gt() {
                acc.1 = *hi;
            }
        }
    }
    Ok(merged)
}

fn mixed_types() -> tessera_error::TesseraError {
    tessera_err!(TileOverlap: "tile MBRs mix coordinate types")
}

fn typed_mbr<T: NativeDomainType>(mbr: &Mbr) -> TesseraResult<Vec<[T; 2]>> {
    mbr.iter()
        .map(|(lo, hi)| {
            if lo.domain_type() != T::DOMAIN_TYPE {
                tessera_bail!(
                    TileOverlap: "tile MBR has domain type {}, expected {}",
                    lo.domain_type(),
                    T::DOMAIN_TYPE
                );
            }
            match (lo.cast::<T>(), hi.cast::<T>()) {
                (Some(lo), Some(hi)) => Ok([lo, hi]),
                _ => Err(tessera_err!(
                    TileOverlap: "tile MBR is not of domain type {}", T::DOMAIN_TYPE
                )),
            }
        })
        .collect()
}

fn intersects<T: NativeDomainType>(range: &[[T; 2]], mbr: &[[T; 2]]) -> bool {
    range
        .iter()
        .zip(mbr.iter())
        .all(|(r, m)| r[0].total_compare(m[1]).is_le() && m[0].total_compare(r[1]).is_le())
}

fn contains<T: NativeDomainType>(range: &[[T; 2]], mbr: &[[T; 2]]) -> bool {
    range
        .iter()
        .zip(mbr.iter())
        .all(|(r, m)| r[0].total_compare(m[0]).is_le() && m[1].total_compare(r[1]).is_le())
}

/// Fraction of `mbr` covered by `range`, per-dimension lengths multiplied.
///
/// Integer domains count discrete coordinates; real domains use extents, with
/// degenerate (zero-width) MBR axes counting as fully covered.
fn coverage_ratio<T: NativeDomainType>(range: &[[T; 2]], mbr: &[[T; 2]]) -> f64 {
    let mut ratio = 1.0f64;
    for (r, m) in range.iter().zip(mbr.iter()) {
        let lo = if r[0].total_compare(m[0]).is_gt() {
            r[0]
        } else {
            m[0]
        };
        let hi = if r[1].total_compare(m[1]).is_lt() {
            r[1]
        } else {
            m[1]
        };
        if lo.total_compare(hi).is_gt() {
            return 0.0;
        }
        let dim_ratio = if T::DOMAIN_TYPE.is_integer() {
            range_len(lo, hi) as f64 / range_len(m[0], m[1]) as f64
        } else {
            let width = m[1].to_f64().unwrap_or(0.0) - m[0].to_f64().unwrap_or(0.0);
            if width == 0.0 {
                1.0
            } else {
                (hi.to_f64().unwrap_or(0.0) - lo.to_f64().unwrap_or(0.0)) / width
            }
        };
        ratio *= dim_ratio.clamp(0.0, 1.0);
    }
    ratio
}
