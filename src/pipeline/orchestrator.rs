//! Concurrent fan-out of work items over a bounded rayon pool.
//!
//! Every item is an independent task. `run_all` returns only after all of
//! them finished; outcome order is not part of the contract.

use crate::core::error::QrForgeError;
use crate::pipeline::input::WorkItem;
use crate::pipeline::producer::{ItemOutcome, Producer};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

pub struct Orchestrator {
    pool: ThreadPool,
    workers: usize,
}

impl Orchestrator {
    pub fn new(workers: usize) -> Result<Self, QrForgeError> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("qrforge-worker-{}", i))
            .build()?;
        Ok(Self { pool, workers })
    }

    pub fn run_all(&self, producer: &Producer<'_>, items: Vec<WorkItem>) -> Vec<ItemOutcome> {
        tracing::debug!(items = items.len(), workers = self.workers, "dispatching batch");
        self.pool.install(|| {
            items
                .into_par_iter()
                .map(|item| producer.produce_item(item))
                .collect()
        })
    }
}

/// Single-item path: no pool, the producer runs on the calling thread.
pub fn run_single(producer: &Producer<'_>, item: WorkItem) -> ItemOutcome {
    producer.produce_item(item)
}
