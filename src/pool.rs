//! Static work-splitting parallel loop driver.
//!
//! Exchange phases dispatch blocking transport calls from worker threads,
//! so the driver runs on a dedicated pool sized to the transport's lane
//! count rather than the shared global pool. Work is split statically:
//! chunk `c` of `chunk` consecutive iterations always runs on worker
//! `c % threads`, so every rank with the same thread count walks the same
//! per-worker iteration order.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::{RedistError, Result};

/// Synchronization handle passed to every loop iteration.
pub struct LoopSync {
    lock: Mutex<()>,
}

impl LoopSync {
    /// Run `f` in a critical section shared by all iterations of the loop.
    pub fn critical<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.lock.lock();
        f()
    }
}

/// Static chunked parallel loop.
///
/// The first iteration error is recorded and returned as the loop error;
/// workers stop picking up new chunks once a failure is flagged, but
/// chunks already in flight run to completion.
pub struct ParallelLoop {
    threads: usize,
    chunk: Option<usize>,
}

impl ParallelLoop {
    pub fn new() -> Self {
        Self {
            threads: 1,
            chunk: None,
        }
    }

    /// Number of worker threads. At least one.
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Iterations per chunk. Defaults to an even block split over the
    /// workers.
    pub fn chunk(mut self, chunk: usize) -> Self {
        self.chunk = Some(chunk.max(1));
        self
    }

    pub fn run<F>(&self, iterations: usize, body: F) -> Result<()>
    where
        F: Fn(usize, &LoopSync) -> Result<()> + Sync,
    {
        if iterations == 0 {
            return Ok(());
        }
        let threads = self.threads.min(iterations);
        let chunk = self.chunk.unwrap_or_else(|| iterations.div_ceil(threads));

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| RedistError::Threading(e.to_string()))?;

        let sync = LoopSync {
            lock: Mutex::new(()),
        };
        let failed = AtomicBool::new(false);
        let first_err: Mutex<Option<RedistError>> = Mutex::new(None);

        pool.scope(|scope| {
            for worker in 0..threads {
                let body = &body;
                let sync = &sync;
                let failed = &failed;
                let first_err = &first_err;
                scope.spawn(move |_| {
                    let mut c = worker;
                    while c * chunk < iterations {
                        if failed.load(Ordering::Acquire) {
                            return;
                        }
                        let start = c * chunk;
                        let end = iterations.min(start + chunk);
                        for i in start..end {
                            if let Err(e) = body(i, sync) {
                                let mut slot = first_err.lock();
                                if slot.is_none() {
                                    *slot = Some(e);
                                }
                                failed.store(true, Ordering::Release);
                                return;
                            }
                        }
                        c += threads;
                    }
                });
            }
        });

        match first_err.into_inner() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for ParallelLoop {
    fn default() -> Self {
        Self::new()
    }
}
