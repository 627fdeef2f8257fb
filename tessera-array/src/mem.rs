//! Optional heap accounting.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tessera_error::TesseraExpect;

/// Records labelled allocations made on behalf of a query.
///
/// An accountant is an optional capability passed through the array handle;
/// when absent, the engine does no accounting at all. All state sits behind a
/// single mutex, matching the one-lock discipline of the estimator
/// accumulators. The accountant never terminates the process.
#[derive(Debug, Default, Clone)]
pub struct HeapAccountant {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    stats: Mutex<Stats>,
}

#[derive(Debug, Default)]
struct Stats {
    live: BTreeMap<String, u64>,
    in_use: u64,
    peak: u64,
    alloc_count: u64,
}

impl HeapAccountant {
    /// Create an accountant with empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an allocation of `bytes` under `label`.
    pub fn record_alloc(&self, label: &str, bytes: u64) {
        let mut stats = self.lock();
        *stats.live.entry(label.to_string()).or_default() += bytes;
        stats.in_use += bytes;
        stats.peak = stats.peak.max(stats.in_use);
        stats.alloc_count += 1;
    }

    /// Record the release of `bytes` previously recorded under `label`.
    pub fn record_dealloc(&self, label: &str, bytes: u64) {
        let mut stats = self.lock();
        if let Some(live) = stats.live.get_mut(label) {
            *live = live.saturating_sub(bytes);
            if *live == 0 {
                stats.live.remove(label);
            }
        }
        stats.in_use = stats.in_use.saturating_sub(bytes);
    }

    /// Bytes currently recorded as live.
    pub fn in_use(&self) -> u64 {
        self.lock().in_use
    }

    /// High-water mark of live bytes.
    pub fn peak(&self) -> u64 {
        self.lock().peak
    }

    /// Total number of recorded allocations.
    pub fn alloc_count(&self) -> u64 {
        self.lock().alloc_count
    }

    /// Render the live allocations, one `label: bytes` line per label.
    pub fn report(&self) -> String {
        let stats = self.lock();
        let mut out = format!("in_use: {}\npeak: {}\n", stats.in_use, stats.peak);
        for (label, bytes) in &stats.live {
            out.push_str(&format!("{label}: {bytes}\n"));
        }
        out
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Stats> {
        self.inner
            .stats
            .lock()
            .tessera_expect("heap accounting mutex poisoned")
    }
}
