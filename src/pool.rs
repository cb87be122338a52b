//! Bounded worker pool
//!
//! A fixed set of worker threads pulls tasks from a channel. Capacity is
//! enforced by a second, bounded channel used as a counting semaphore:
//! `run` blocks only until it can put a token in, and the token is taken
//! back out when the task body ends, whether it returned or panicked.
//!
//! ```text
//!   run(task) ──token──▶ [slots: bounded(N)]
//!       │
//!       └──task──▶ [jobs] ──▶ worker 0..N ──▶ task() ──▶ SlotGuard::drop
//!                                                          │ take token
//!                                                          └ pending -= 1
//! ```

use crate::error::WorkerError;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{trace, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Counters and the idle signal shared with the workers
#[derive(Debug, Default)]
struct Shared {
    /// Tasks submitted and not yet finished
    pending: Mutex<usize>,
    idle: Condvar,
    completed: AtomicU64,
    panicked: AtomicU64,
}

/// Pool running at most `capacity` tasks at once
pub struct WorkerPool {
    capacity: usize,
    slots_tx: Sender<()>,
    slots_rx: Receiver<()>,
    jobs: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    shared: Arc<Shared>,
}

impl WorkerPool {
    /// Spawn `capacity` workers (at least one)
    pub fn new(capacity: usize) -> Result<Self, WorkerError> {
        let capacity = capacity.max(1);
        let (slots_tx, slots_rx) = bounded(capacity);
        let (jobs_tx, jobs_rx) = unbounded::<Job>();
        let shared = Arc::new(Shared::default());

        let mut workers = Vec::with_capacity(capacity);
        for id in 0..capacity {
            let jobs_rx = jobs_rx.clone();
            let slots_rx = slots_rx.clone();
            let shared = Arc::clone(&shared);

            let handle = thread::Builder::new()
                .name(format!("resolver-{}", id))
                .spawn(move || worker_loop(id, jobs_rx, slots_rx, shared))
                .map_err(|e| WorkerError::InitFailed {
                    id,
                    reason: e.to_string(),
                })?;
            workers.push(handle);
        }

        Ok(Self {
            capacity,
            slots_tx,
            slots_rx,
            jobs: Some(jobs_tx),
            workers,
            shared,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reserve a slot, blocking while all are taken, then hand `task` to a
    /// worker
    pub fn run<F>(&self, task: F) -> Result<(), WorkerError>
    where
        F: FnOnce() + Send + 'static,
    {
        let jobs = self.jobs.as_ref().ok_or(WorkerError::PoolClosed)?;
        self.slots_tx.send(()).map_err(|_| WorkerError::PoolClosed)?;
        *self.shared.pending.lock() += 1;

        if jobs.send(Box::new(task)).is_err() {
            release(&self.slots_rx, &self.shared);
            return Err(WorkerError::PoolClosed);
        }
        Ok(())
    }

    /// Block until every submitted task has finished
    pub fn wait(&self) {
        let mut pending = self.shared.pending.lock();
        while *pending > 0 {
            self.shared.idle.wait(&mut pending);
        }
    }

    /// Tasks currently submitted and not finished
    pub fn pending(&self) -> usize {
        *self.shared.pending.lock()
    }

    /// Tasks that finished normally
    pub fn completed(&self) -> u64 {
        self.shared.completed.load(Ordering::Relaxed)
    }

    /// Tasks that panicked
    pub fn panicked(&self) -> u64 {
        self.shared.panicked.load(Ordering::Relaxed)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the job channel ends every worker loop
        self.jobs.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("Worker thread exited abnormally");
            }
        }
    }
}

/// Returns a slot and marks one task finished when dropped
struct SlotGuard<'a> {
    slots: &'a Receiver<()>,
    shared: &'a Shared,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        release(self.slots, self.shared);
    }
}

fn release(slots: &Receiver<()>, shared: &Shared) {
    let _ = slots.try_recv();
    let mut pending = shared.pending.lock();
    *pending = pending.saturating_sub(1);
    if *pending == 0 {
        shared.idle.notify_all();
    }
}

fn worker_loop(id: usize, jobs: Receiver<Job>, slots: Receiver<()>, shared: Arc<Shared>) {
    for job in jobs.iter() {
        let _guard = SlotGuard {
            slots: &slots,
            shared: &shared,
        };

        match panic::catch_unwind(AssertUnwindSafe(job)) {
            Ok(()) => {
                shared.completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(payload) => {
                shared.panicked.fetch_add(1, Ordering::Relaxed);
                warn!(worker = id, message = %panic_message(payload.as_ref()), "Task panicked");
            }
        }
    }
    trace!(worker = id, "Worker shutting down");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
