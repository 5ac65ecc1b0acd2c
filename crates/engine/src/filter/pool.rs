//! Worker pools for parallel filter runs
//!
//! Pools are built on first use and kept for the life of the session, one
//! per worker count, so repeated runs reuse the same threads.

use docmeta_core::{Error, Result};
use parking_lot::Mutex;
use rayon::ThreadPool;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub(crate) struct WorkerPools {
    pools: Mutex<HashMap<usize, Arc<ThreadPool>>>,
}

impl WorkerPools {
    /// The pool with `workers` threads, building it if needed
    pub(crate) fn get_or_build(&self, workers: usize) -> Result<Arc<ThreadPool>> {
        let mut pools = self.pools.lock();
        if let Some(pool) = pools.get(&workers) {
            return Ok(Arc::clone(pool));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("docmeta-filter-{}", i))
            .build()
            .map(Arc::new)
            .map_err(|e| Error::Internal(format!("failed to build filter pool: {}", e)))?;
        tracing::debug!(target: "docmeta::filter", workers, "worker pool built");
        pools.insert(workers, Arc::clone(&pool));
        Ok(pool)
    }

    /// Number of pools built so far
    pub(crate) fn len(&self) -> usize {
        self.pools.lock().len()
    }
}
