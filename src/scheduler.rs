//! Task scheduler: chains a fetch into a transform across the two pools.
//!
//! ```text
//! submit ──▶ fetch pool ──(fetch ok)──▶ transform pool ──▶ on_complete
//!                  │
//!                  └──(fetch failed)──────────────────────▶ on_complete
//! ```
//!
//! Each stage's completion enqueues the next stage, so no worker ever blocks
//! waiting on another pool. The completion callback fires exactly once per
//! accepted submission, always on a pool worker.

use crate::fetch::{Downloader, FetchOutcome, HttpClient};
use crate::imaging::{ImageBackend, TransformOptions, transform};
use crate::pool::{PoolError, WorkerPool};
use std::sync::{Arc, Mutex, PoisonError, mpsc};

/// Final result of one request.
///
/// `succeeded` implies `http_status == 200` and non-empty `output_bytes`;
/// otherwise `output_bytes` is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutcome {
    pub succeeded: bool,
    pub output_bytes: Vec<u8>,
    pub error_message: String,
    pub http_status: u16,
}

impl TransformOutcome {
    pub fn success(output_bytes: Vec<u8>) -> Self {
        Self {
            succeeded: true,
            output_bytes,
            error_message: String::new(),
            http_status: 200,
        }
    }

    pub fn failure(http_status: u16, error_message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            output_bytes: Vec::new(),
            error_message: error_message.into(),
            http_status,
        }
    }

    /// Map a failed fetch: no response at all becomes 502, anything else
    /// passes the upstream status through.
    pub fn from_failed_fetch(fetch: &FetchOutcome) -> Self {
        let status = match fetch.http_status {
            0 => 502,
            code => code,
        };
        Self::failure(status, format!("Download failed: {}", fetch.error_message))
    }
}

type Callback = Box<dyn FnOnce(TransformOutcome) + Send>;

/// Holds the request's callback until some stage fires it.
///
/// Whichever path reaches it first (normal completion, panic, or a rejected
/// hand-off) takes the callback; every later call is a no-op.
struct Completion {
    callback: Mutex<Option<Callback>>,
}

impl Completion {
    fn new<C>(on_complete: C) -> Arc<Self>
    where
        C: FnOnce(TransformOutcome) + Send + 'static,
    {
        Arc::new(Self {
            callback: Mutex::new(Some(Box::new(on_complete))),
        })
    }

    fn fire(&self, outcome: TransformOutcome) {
        let callback = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(callback) = callback {
            callback(outcome);
        }
    }
}

/// Owns both pools and the codec backend for the lifetime of the service.
pub struct TaskScheduler {
    downloader: Downloader,
    transform_pool: Arc<WorkerPool>,
    backend: Arc<dyn ImageBackend>,
}

impl TaskScheduler {
    /// Start both pools. A thread count of `0` means one worker per CPU core.
    pub fn new(
        client: Arc<dyn HttpClient>,
        backend: Arc<dyn ImageBackend>,
        fetch_threads: usize,
        transform_threads: usize,
    ) -> Result<Self, PoolError> {
        let downloader = Downloader::new(client, fetch_threads)?;
        let transform_pool = Arc::new(WorkerPool::new("transform", transform_threads)?);
        tracing::info!(
            fetch_threads = downloader.pool().size(),
            transform_threads = transform_pool.size(),
            "scheduler started"
        );
        Ok(Self {
            downloader,
            transform_pool,
            backend,
        })
    }

    pub fn fetch_threads(&self) -> usize {
        self.downloader.pool().size()
    }

    pub fn transform_threads(&self) -> usize {
        self.transform_pool.size()
    }

    /// Queue one request.
    ///
    /// Returns immediately. `on_complete` runs later on a fetch or transform
    /// worker, exactly once. If the fetch pool no longer accepts work the
    /// error is returned here and `on_complete` is dropped without running.
    pub fn submit<C>(
        &self,
        locator: &str,
        options: TransformOptions,
        on_complete: C,
    ) -> Result<(), PoolError>
    where
        C: FnOnce(TransformOutcome) + Send + 'static,
    {
        let completion = Completion::new(on_complete);
        let transform_pool = Arc::clone(&self.transform_pool);
        let backend = Arc::clone(&self.backend);

        self.downloader.fetch_async(locator, move |fetched| {
            if !fetched.succeeded {
                tracing::debug!(
                    status = fetched.http_status,
                    "fetch failed, skipping transform"
                );
                completion.fire(TransformOutcome::from_failed_fetch(&fetched));
                return;
            }

            tracing::debug!(bytes = fetched.payload.len(), "fetch done, queueing transform");
            let on_transformed = Arc::clone(&completion);
            let queued = transform_pool.submit_then(
                move || transform(backend.as_ref(), &fetched.payload, &options),
                move |result| {
                    let outcome = match result {
                        Ok(Ok(bytes)) => TransformOutcome::success(bytes),
                        Ok(Err(e)) => TransformOutcome::failure(500, format!("Processing failed: {e}")),
                        Err(panic) => {
                            TransformOutcome::failure(500, format!("Internal fault: {}", panic.message))
                        }
                    };
                    on_transformed.fire(outcome);
                },
            );
            if let Err(e) = queued {
                tracing::warn!("transform hand-off rejected: {e}");
                completion.fire(TransformOutcome::failure(503, format!("Internal fault: {e}")));
            }
        })
    }

    /// Run one request and block the calling thread until it completes.
    ///
    /// Must not be called from a worker of either pool.
    pub fn process_blocking(
        &self,
        locator: &str,
        options: TransformOptions,
    ) -> Result<TransformOutcome, PoolError> {
        let (sender, receiver) = mpsc::sync_channel(1);
        self.submit(locator, options, move |outcome| {
            let _ = sender.send(outcome);
        })?;
        Ok(receiver.recv().unwrap_or_else(|_| {
            TransformOutcome::failure(500, "Internal fault: request dropped before completion")
        }))
    }

    /// Drain the fetch pool, then the transform pool it feeds.
    pub fn shutdown(&self) {
        self.downloader.shutdown();
        self.transform_pool.shutdown();
        tracing::info!("scheduler stopped");
    }
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("fetch", self.downloader.pool())
            .field("transform", &self.transform_pool)
            .finish()
    }
}
