//! Fixed-size worker pools.
//!
//! A [`WorkerPool`] owns exactly N long-lived worker threads draining one
//! shared FIFO queue. The threads come from a dedicated
//! [rayon](https://docs.rs/rayon) pool (never the global one) and tasks are
//! queued with `spawn_fifo`, so work submitted from outside the pool is
//! claimed in submission order.
//!
//! ## Submission forms
//!
//! | Method | Returns | Caller blocks? |
//! |---|---|---|
//! | [`WorkerPool::submit`] | `()` | never |
//! | [`WorkerPool::submit_then`] | `()`; `complete` runs on the worker | never |
//! | [`WorkerPool::submit_with_handle`] | [`TaskHandle`] | only in [`TaskHandle::wait`] |
//!
//! Every task runs under `catch_unwind`. A panicking task becomes a
//! [`TaskPanic`] value, is logged, and the worker moves on to the next task.
//! The queue is unbounded: submission never blocks and never rejects while
//! the pool is accepting work.

use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, mpsc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker pool '{0}' is shut down")]
    ShutDown(String),
    #[error("failed to start worker pool '{name}': {reason}")]
    Build { name: String, reason: String },
}

/// A task that panicked on a worker thread.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("task panicked: {message}")]
pub struct TaskPanic {
    pub message: String,
}

impl TaskPanic {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self { message }
    }
}

/// Resolve a configured worker count.
///
/// - `0` → number of available CPU cores
/// - `n` → `n`
pub fn resolve_worker_count(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[derive(Debug)]
struct Counters {
    accepting: bool,
    /// Queued plus running tasks.
    pending: usize,
}

#[derive(Debug)]
struct PoolState {
    counters: Mutex<Counters>,
    drained: Condvar,
}

impl PoolState {
    fn lock(&self) -> MutexGuard<'_, Counters> {
        // Counters are plain integers; a poisoned lock still holds valid data.
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self) {
        let mut counters = self.lock();
        counters.pending -= 1;
        if counters.pending == 0 {
            self.drained.notify_all();
        }
    }
}

/// A fixed set of worker threads consuming a shared FIFO task queue.
pub struct WorkerPool {
    name: Arc<str>,
    pool: ThreadPool,
    state: Arc<PoolState>,
}

impl WorkerPool {
    /// Start a pool of `workers` threads (`0` = one per CPU core).
    ///
    /// Worker threads are named `{name}-{index}`.
    pub fn new(name: &str, workers: usize) -> Result<Self, PoolError> {
        let workers = resolve_worker_count(workers);
        let thread_prefix = name.to_string();
        let handler_name = name.to_string();
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(move |i| format!("{thread_prefix}-{i}"))
            .panic_handler(move |payload| {
                // Tasks are wrapped in catch_unwind; reaching this means the
                // bookkeeping around a task panicked.
                let panic = TaskPanic::from_payload(payload);
                tracing::error!(pool = %handler_name, "worker panic escaped task boundary: {}", panic.message);
            })
            .build()
            .map_err(|e| PoolError::Build {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(pool = name, workers, "worker pool started");

        Ok(Self {
            name: Arc::from(name),
            pool,
            state: Arc::new(PoolState {
                counters: Mutex::new(Counters {
                    accepting: true,
                    pending: 0,
                }),
                drained: Condvar::new(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Tasks queued or running right now.
    pub fn pending(&self) -> usize {
        self.state.lock().pending
    }

    /// Enqueue a fire-and-forget task.
    ///
    /// A panic inside `task` is logged and swallowed.
    pub fn submit<F>(&self, task: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit_then(task, |_| {})
    }

    /// Enqueue `task`, then run `complete` with its result on the same worker.
    ///
    /// `complete` is invoked exactly once, with `Err(TaskPanic)` if `task`
    /// panicked. This is how the pipeline stages chain into each other without
    /// ever blocking a worker.
    pub fn submit_then<T, F, C>(&self, task: F, complete: C) -> Result<(), PoolError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
        C: FnOnce(Result<T, TaskPanic>) + Send + 'static,
    {
        {
            let mut counters = self.state.lock();
            if !counters.accepting {
                return Err(PoolError::ShutDown(self.name.to_string()));
            }
            counters.pending += 1;
        }

        let state = Arc::clone(&self.state);
        let name = Arc::clone(&self.name);
        self.pool.spawn_fifo(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(task)).map_err(TaskPanic::from_payload);
            if let Err(panic) = &result {
                tracing::error!(pool = %name, "task panicked: {}", panic.message);
            }
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || complete(result))) {
                let panic = TaskPanic::from_payload(payload);
                tracing::error!(pool = %name, "task completion panicked: {}", panic.message);
            }
            state.finish();
        });
        Ok(())
    }

    /// Enqueue `task` and return a handle the caller can block on.
    pub fn submit_with_handle<T, F>(&self, task: F) -> Result<TaskHandle<T>, PoolError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel(1);
        self.submit_then(task, move |result| {
            // The handle may have been dropped; nobody is waiting then.
            let _ = sender.send(result);
        })?;
        Ok(TaskHandle { receiver })
    }

    /// Stop accepting work and wait until every queued task has finished.
    ///
    /// Must not be called from one of this pool's own workers.
    pub fn shutdown(&self) {
        let mut counters = self.state.lock();
        counters.accepting = false;
        tracing::debug!(pool = %self.name, pending = counters.pending, "draining worker pool");
        while counters.pending > 0 {
            counters = self
                .state
                .drained
                .wait(counters)
                .unwrap_or_else(PoisonError::into_inner);
        }
        tracing::debug!(pool = %self.name, "worker pool drained");
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("size", &self.size())
            .field("pending", &self.pending())
            .finish()
    }
}

/// Write-once, read-once result of a task submitted with
/// [`WorkerPool::submit_with_handle`].
#[derive(Debug)]
pub struct TaskHandle<T> {
    receiver: mpsc::Receiver<Result<T, TaskPanic>>,
}

impl<T> TaskHandle<T> {
    /// Block until the task has run.
    pub fn wait(self) -> Result<T, TaskPanic> {
        self.receiver.recv().unwrap_or_else(|_| {
            Err(TaskPanic {
                message: "task was dropped before it ran".to_string(),
            })
        })
    }
}
