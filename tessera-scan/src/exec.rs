//! The parallel-for capability.

use std::sync::Arc;

use tessera_error::TesseraResult;

/// A task body dispatched by an [`ExecDriver`].
pub type Task1d<'a> = &'a (dyn Fn(u64) -> TesseraResult<()> + Send + Sync);
/// A two-index task body dispatched by an [`ExecDriver`].
pub type Task2d<'a> = &'a (dyn Fn(u64, u64) -> TesseraResult<()> + Send + Sync);

/// Dispatches independent task bodies over index ranges.
///
/// Drivers wait for dispatched tasks and surface the first error. Task bodies
/// must not block on one another; anything shared goes behind its own lock.
pub trait ExecDriver: Send + Sync {
    /// Run `task` for every index in `[lo, hi)`.
    fn for_each(&self, lo: u64, hi: u64, task: Task1d<'_>) -> TesseraResult<()>;

    /// Run `task` for every pair in `[lo1, hi1) × [lo2, hi2)`.
    fn for_each_2d(
        &self,
        lo1: u64,
        hi1: u64,
        lo2: u64,
        hi2: u64,
        task: Task2d<'_>,
    ) -> TesseraResult<()>;
}

/// Describes how parallel-for tasks are executed.
pub enum ExecutionMode {
    /// Executes the tasks inline on the calling thread.
    Inline,
    /// Spawns the tasks onto a provided Rayon thread pool.
    #[cfg(feature = "rayon")]
    RayonThreadPool(Arc<rayon::ThreadPool>),
}

impl ExecutionMode {
    /// Resolve the mode into a driver.
    pub fn into_driver(self) -> Arc<dyn ExecDriver> {
        match self {
            ExecutionMode::Inline => Arc::new(InlineDriver),
            #[cfg(feature = "rayon")]
            ExecutionMode::RayonThreadPool(pool) => Arc::new(RayonDriver(pool)),
        }
    }
}

/// Runs every task on the calling thread, keeping the first error.
pub struct InlineDriver;

impl ExecDriver for InlineDriver {
    fn for_each(&self, lo: u64, hi: u64, task: Task1d<'_>) -> TesseraResult<()> {
        let mut first_err = None;
        for i in lo..hi {
            if let Err(err) = task(i) {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn for_each_2d(
        &self,
        lo1: u64,
        hi1: u64,
        lo2: u64,
        hi2: u64,
        task: Task2d<'_>,
    ) -> TesseraResult<()> {
        let mut first_err = None;
        for i in lo1..hi1 {
            for j in lo2..hi2 {
                if let Err(err) = task(i, j) {
                    first_err.get_or_insert(err);
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// Spawns tasks onto a Rayon thread pool; in-flight tasks finish before the
/// first error is returned, remaining ones are cancelled cooperatively.
#[cfg(feature = "rayon")]
pub struct RayonDriver(pub Arc<rayon::ThreadPool>);

#[cfg(feature = "rayon")]
impl ExecDriver for RayonDriver {
    fn for_each(&self, lo: u64, hi: u64, task: Task1d<'_>) -> TesseraResult<()> {
        use rayon::prelude::*;
        self.0.install(|| (lo..hi).into_par_iter().try_for_each(task))
    }

    fn for_each_2d(
        &self,
        lo1: u64,
        hi1: u64,
        lo2: u64,
        hi2: u64,
        task: Task2d<'_>,
    ) -> TesseraResult<()> {
        use rayon::prelude::*;
        self.0.install(|| {
            (lo1..hi1).into_par_iter().try_for_each(|i| {
                (lo2..hi2).into_par_iter().try_for_each(|j| task(i, j))
            })
        })
    }
}
