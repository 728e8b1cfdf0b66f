use anyhow::{Context, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Where bootstrap draws run: inline, on the global rayon pool, or on a
/// dedicated pool capped at the requested number of cores.
pub enum Workers {
    Sequential,
    Global,
    Pool(ThreadPool),
}

impl Workers {
    pub fn new(parallel: bool, cores: Option<usize>, tasks: usize) -> Result<Self> {
        if !parallel {
            return Ok(Workers::Sequential);
        }
        match resolve_threads(cores, tasks) {
            Some(threads) => {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .context("build bootstrap thread pool")?;
                Ok(Workers::Pool(pool))
            }
            None => Ok(Workers::Global),
        }
    }

    /// Evaluate `f` over `0..n`; output order follows the index.
    pub fn map<T, F>(&self, n: usize, f: F) -> Vec<T>
    where
        F: Fn(usize) -> T + Send + Sync,
        T: Send,
    {
        match self {
            Workers::Sequential => (0..n).map(f).collect(),
            Workers::Global => (0..n).into_par_iter().map(f).collect(),
            Workers::Pool(pool) => pool.install(|| (0..n).into_par_iter().map(f).collect()),
        }
    }
}

pub fn resolve_threads(cores: Option<usize>, tasks: usize) -> Option<usize> {
    if let Some(cores) = cores {
        let capped = cores.min(tasks.max(1)).max(1);
        if cores > capped {
            tracing::warn!(
                "Provided cores ({cores}) greater than number of tasks ({tasks}); using {capped}"
            );
        }
        Some(capped)
    } else {
        None
    }
}

/// Seed of one draw, so results do not depend on thread scheduling.
pub fn draw_seed(base: u64, spec_index: usize, draws: usize, draw: usize) -> u64 {
    base.wrapping_add((spec_index as u64).wrapping_mul(draws as u64))
        .wrapping_add(draw as u64)
}
