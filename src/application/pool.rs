//! Bounded worker pool with join-all barrier semantics.
//!
//! Each orchestration phase fans its jobs out over a fixed number of
//! threads through a channel and then joins every worker before returning,
//! so callers can rely on a full barrier: when `run` returns, every job has
//! been processed and every result collected. Aggregation is
//! order-independent.

use crossbeam_channel::unbounded;
use log::error;
use std::sync::{Arc, Mutex};
use std::thread;

pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// A pool sized to the machine, capped by the job count.
    pub fn sized_for(jobs: usize, configured: Option<usize>) -> Self {
        let width = configured.unwrap_or_else(num_cpus::get);
        Self::new(width.min(jobs.max(1)))
    }

    /// Runs every job to completion and returns all results. Blocks until
    /// the last worker has drained the queue (the phase barrier).
    pub fn run<J, R, F>(&self, jobs: Vec<J>, worker: F) -> Vec<R>
    where
        J: Send + 'static,
        R: Send + 'static,
        F: Fn(J) -> R + Send + Sync + 'static,
    {
        if jobs.is_empty() {
            return Vec::new();
        }

        let (tx, rx) = unbounded::<J>();
        for job in jobs {
            // Send on an unbounded channel only fails when disconnected,
            // and we hold both ends here.
            let _ = tx.send(job);
        }
        drop(tx);

        let worker = Arc::new(worker);
        let results = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::with_capacity(self.workers);

        for _ in 0..self.workers {
            let rx = rx.clone();
            let worker = worker.clone();
            let results = results.clone();
            handles.push(thread::spawn(move || {
                while let Ok(job) = rx.recv() {
                    let outcome = worker(job);
                    if let Ok(mut r) = results.lock() {
                        r.push(outcome);
                    }
                }
            }));
        }

        for handle in handles {
            if handle.join().is_err() {
                error!("worker thread panicked; its remaining results are lost");
            }
        }

        match Arc::try_unwrap(results) {
            Ok(mutex) => mutex.into_inner().unwrap_or_default(),
            Err(shared) => shared
                .lock()
                .map(|mut r| std::mem::take(&mut *r))
                .unwrap_or_default(),
        }
    }
}
