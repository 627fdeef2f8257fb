//! Result-size estimation.
//!
//! Folds the cached tile overlap and fragment tile metadata into, per
//! attribute, a fractional result-size estimate and a worst-case memory
//! bound. Fully-covered tiles contribute their whole persisted size to both;
//! partially-covered tiles contribute proportionally to the estimate but
//! fully to the memory bound. Estimates are calibrated per range against the
//! cell-count ceiling, amplified once, and ceiled on the way out.

use std::sync::Mutex;

use tessera_array::{CELL_VAR_OFFSET_SIZE, COORDS};
use tessera_dtype::{match_each_domain_type, safe_mul, NativeDomainType};
use tessera_error::{tessera_bail, tessera_err, TesseraExpect, TesseraResult};

use crate::Subarray;

/// Estimated result size and worst-case memory of one attribute.
///
/// `size_*` are fractional estimates, ceiled when handed out; `mem_*` are
/// upper bounds and are neither amplified nor ceiled.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResultSize {
    /// Estimated bytes of the fixed-size buffer (offsets, for var-sized).
    pub size_fixed: f64,
    /// Estimated bytes of the var-size values buffer.
    pub size_var: f64,
    /// Worst-case bytes of the fixed-size buffer.
    pub mem_fixed: u64,
    /// Worst-case bytes of the var-size values buffer.
    pub mem_var: u64,
}

/// Tuning knobs for result-size estimation, threaded through the subarray.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimationPolicy {
    /// Scale applied to `size_fixed`/`size_var` after accumulation, `>= 1.0`.
    pub amplification: f64,
}

impl Default for EstimationPolicy {
    fn default() -> Self {
        Self {
            amplification: 1.0,
        }
    }
}

impl Subarray {
    /// Compute (and cache) the estimated result size of every attribute and
    /// the coords channel, in parallel over ranges.
    ///
    /// Sparse arrays only; requires nothing else — tile overlap is computed
    /// on demand.
    pub fn compute_est_result_size(&mut self) -> TesseraResult<()> {
        if self.est_size_ready {
            return Ok(());
        }
        if self.array.dense() {
            tessera_bail!(
                DenseNotSupported: "result-size estimation is not supported for dense arrays yet"
            );
        }
        match_each_domain_type!(self.domain_type(), |$T| {
            self.compute_est_result_size_typed::<$T>()
        })
    }

    fn compute_est_result_size_typed<T: NativeDomainType>(&mut self) -> TesseraResult<()> {
        self.compute_tile_overlap_typed::<T>()?;

        let schema = self.array.schema().clone();
        let attribute_num = schema.attributes().len();
        let range_num = self.range_num();

        let accumulator_bytes = ((attribute_num + 1) * std::mem::size_of::<ResultSize>()) as u64;
        if let Some(accountant) = self.array.accountant() {
            accountant.record_alloc("estimation accumulators", accumulator_bytes);
        }
        let accumulators = Mutex::new(vec![ResultSize::default(); attribute_num + 1]);

        let exec = self.exec.clone();
        let this = &*self;
        let task = |range_idx: u64| -> TesseraResult<()> {
            for a in 0..=attribute_num {
                let (name, var_size) = if a == attribute_num {
                    (COORDS, false)
                } else {
                    let attr = &schema.attributes()[a];
                    (attr.name(), attr.var_size())
                };
                let partial = this.range_result_size::<T>(name, range_idx, var_size)?;
                let mut totals = accumulators
                    .lock()
                    .tessera_expect("estimation accumulator mutex poisoned");
                totals[a].size_fixed += partial.size_fixed;
                totals[a].size_var += partial.size_var;
                totals[a].mem_fixed += partial.mem_fixed;
                totals[a].mem_var += partial.mem_var;
            }
            Ok(())
        };
        exec.for_each(0, range_num, &task)?;

        let mut totals = accumulators
            .into_inner()
            .tessera_expect("estimation accumulator mutex poisoned");
        let amplification = self.policy.amplification;
        if amplification != 1.0 {
            for total in &mut totals {
                total.size_fixed *= amplification;
                total.size_var *= amplification;
            }
        }

        self.est_result_size.clear();
        for (a, total) in totals.into_iter().enumerate() {
            let name = if a == attribute_num {
                COORDS
            } else {
                schema.attributes()[a].name()
            };
            self.est_result_size.insert(name.to_string(), total);
        }
        if let Some(accountant) = self.array.accountant() {
            accountant.record_dealloc("estimation accumulators", accumulator_bytes);
        }
        self.est_size_ready = true;
        log::debug!(
            "estimated result sizes for {} channels over {range_num} ranges",
            attribute_num + 1
        );
        Ok(())
    }

    /// Fold one `(attribute, range)` pair across all fragments, calibrating
    /// the estimate against the range's cell-count ceiling.
    fn range_result_size<T: NativeDomainType>(
        &self,
        name: &str,
        range_idx: u64,
        var_size: bool,
    ) -> TesseraResult<ResultSize> {
        let mut ret = ResultSize::default();
        let range = usize::try_from(range_idx)
            .map_err(|_| tessera_err!(Internal: "range index out of addressable range"))?;

        for (fragment, overlaps) in self.array.fragments().iter().zip(&self.tile_overlap) {
            let overlap = overlaps
                .get(range)
                .ok_or_else(|| tessera_err!(Internal: "tile overlap missing for range {range_idx}"))?;

            for &(first, last) in &overlap.tile_ranges {
                for tile_id in first..=last {
                    let tile_size = fragment.tile_size(name, tile_id)?;
                    ret.size_fixed += tile_size as f64;
                    ret.mem_fixed += tile_size;
                    if var_size {
                        let tile_var_size = fragment.tile_var_size(name, tile_id)?;
                        ret.size_var += tile_var_size as f64;
                        ret.mem_var += tile_var_size;
                    }
                }
            }

            for &(tile_id, ratio) in &overlap.tiles {
                let tile_size = fragment.tile_size(name, tile_id)?;
                ret.size_fixed += tile_size as f64 * ratio;
                ret.mem_fixed += tile_size;
                if var_size {
                    let tile_var_size = fragment.tile_var_size(name, tile_id)?;
                    ret.size_var += tile_var_size as f64 * ratio;
                    ret.mem_var += tile_var_size;
                }
            }
        }

        // Calibrate against the most the range can hold.
        let cell_num = self.cell_num_typed::<T>(range_idx)?;
        let max_fixed = if var_size {
            safe_mul(cell_num, CELL_VAR_OFFSET_SIZE)
        } else {
            safe_mul(cell_num, self.array.schema().cell_size(name)?)
        };
        ret.size_fixed = ret.size_fixed.min(max_fixed as f64);
        ret.size_var = ret.size_var.min(u64::MAX as f64);
        Ok(ret)
    }

    /// Estimated result bytes of a fixed-size attribute (or [`COORDS`]).
    pub fn est_result_size(&mut self, name: &str) -> TesseraResult<u64> {
        self.check_estimable(name, false)?;
        self.compute_est_result_size()?;
        Ok(ceil_to_u64(self.result_size(name)?.size_fixed))
    }

    /// Estimated `(offsets, values)` bytes of a var-sized attribute.
    pub fn est_result_size_var(&mut self, name: &str) -> TesseraResult<(u64, u64)> {
        self.check_estimable(name, true)?;
        self.compute_est_result_size()?;
        let size = self.result_size(name)?;
        Ok((ceil_to_u64(size.size_fixed), ceil_to_u64(size.size_var)))
    }

    /// Worst-case memory of a fixed-size attribute (or [`COORDS`]).
    pub fn max_memory_size(&mut self, name: &str) -> TesseraResult<u64> {
        self.check_estimable(name, false)?;
        self.compute_est_result_size()?;
        Ok(self.result_size(name)?.mem_fixed)
    }

    /// Worst-case `(offsets, values)` memory of a var-sized attribute.
    pub fn max_memory_size_var(&mut self, name: &str) -> TesseraResult<(u64, u64)> {
        self.check_estimable(name, true)?;
        self.compute_est_result_size()?;
        let size = self.result_size(name)?;
        Ok((size.mem_fixed, size.mem_var))
    }

    fn check_estimable(&self, name: &str, want_var: bool) -> TesseraResult<()> {
        if self.array.dense() {
            tessera_bail!(
                DenseNotSupported: "result-size estimation is not supported for dense arrays yet"
            );
        }
        if name == COORDS {
            if want_var {
                tessera_bail!(InvalidAttribute: "{COORDS} is fixed-sized");
            }
            return Ok(());
        }
        let attr = self
            .array
            .schema()
            .attribute(name)
            .ok_or_else(|| tessera_err!(InvalidAttribute: "unknown attribute {name}"))?;
        if attr.var_size() != want_var {
            if want_var {
                tessera_bail!(InvalidAttribute: "attribute {name} must be var-sized");
            }
            tessera_bail!(InvalidAttribute: "attribute {name} must be fixed-sized");
        }
        Ok(())
    }

    fn result_size(&self, name: &str) -> TesseraResult<&ResultSize> {
        self.est_result_size
            .get(name)
            .ok_or_else(|| tessera_err!(Internal: "estimate missing for {name}"))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn ceil_to_u64(value: f64) -> u64 {
    value.ceil() as u64
}
