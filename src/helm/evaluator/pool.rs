//! Small fixed-size thread pool for the auxiliary tasks of evaluator calls.
//!
//! The pool is owned by whoever drives the analysis run: it is started before
//! the first evaluation and stopped after the last one.

use std::thread::{self, JoinHandle};

use crossbeam::channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;

use crate::error::PoolError;

/// Default number of worker threads: one stderr drain and one watchdog.
pub const DEFAULT_POOL_SIZE: usize = 2;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Running {
    tx: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

/// Worker pool with explicit start/stop.
pub struct WorkerPool {
    size: usize,
    running: Mutex<Option<Running>>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self {
            size: size.max(1),
            running: Mutex::new(None),
        }
    }

    /// Spawn the worker threads. Starting a running pool does nothing.
    pub fn start(&self) -> Result<(), PoolError> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Ok(());
        }

        let (tx, rx) = unbounded::<Job>();
        let mut workers = Vec::with_capacity(self.size);
        for idx in 0..self.size {
            let rx = rx.clone();
            let handle = thread::Builder::new()
                .name(format!("helm-evaluator-{idx}"))
                .spawn(move || worker_loop(rx));
            match handle {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    drop(tx);
                    join_all(workers);
                    return Err(PoolError::Spawn(e.to_string()));
                }
            }
        }

        log::debug!("Started evaluator worker pool with {} threads", self.size);
        *running = Some(Running { tx, workers });
        Ok(())
    }

    /// Stop accepting jobs and wait for queued jobs to finish.
    pub fn stop(&self) {
        let running = self.running.lock().take();
        if let Some(Running { tx, workers }) = running {
            drop(tx);
            join_all(workers);
            log::debug!("Stopped evaluator worker pool");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Queue `job` for execution on a worker thread.
    pub fn execute<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let running = self.running.lock();
        let Some(running) = running.as_ref() else {
            return Err(PoolError::Stopped);
        };
        running
            .tx
            .send(Box::new(job))
            .map_err(|_| PoolError::Stopped)
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(rx: Receiver<Job>) {
    while let Ok(job) = rx.recv() {
        job();
    }
}

fn join_all(workers: Vec<JoinHandle<()>>) {
    for worker in workers {
        if worker.join().is_err() {
            log::warn!("Evaluator worker thread panicked");
        }
    }
}
