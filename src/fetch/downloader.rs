//! Asynchronous downloader built on a dedicated worker pool.

use super::{FetchError, FetchOutcome, HttpClient, Locator};
use crate::pool::{PoolError, TaskHandle, WorkerPool};
use std::sync::Arc;

/// Run one retrieval synchronously on the current thread.
///
/// Applies the retrieval policy: a malformed locator fails without touching
/// the network, a transport failure reports status `0`, any status other than
/// 200 fails with that status, and 200 yields the full body.
pub fn retrieve(client: &dyn HttpClient, raw_locator: &str) -> FetchOutcome {
    let locator = match Locator::parse(raw_locator) {
        Ok(locator) => locator,
        Err(e) => {
            tracing::warn!(locator = raw_locator, "rejecting malformed locator");
            return FetchOutcome::failure(&e);
        }
    };

    tracing::info!(host = %locator.host, path = %locator.path, "downloading");

    let response = match client.get(&locator.to_string()) {
        Ok(response) => response,
        Err(e) => return FetchOutcome::failure(&e),
    };

    if response.status != 200 {
        return FetchOutcome::failure(&FetchError::HttpStatus(response.status));
    }

    tracing::debug!(bytes = response.body.len(), "downloaded");
    FetchOutcome::success(response.body)
}

/// Runs retrievals on its own pool and reports each [`FetchOutcome`] exactly once.
pub struct Downloader {
    pool: WorkerPool,
    client: Arc<dyn HttpClient>,
}

impl Downloader {
    pub fn new(client: Arc<dyn HttpClient>, workers: usize) -> Result<Self, PoolError> {
        Ok(Self {
            pool: WorkerPool::new("fetch", workers)?,
            client,
        })
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Queue a retrieval; `on_complete` runs on a fetch worker, never on the caller.
    ///
    /// If the retrieval panics, `on_complete` still receives a failed outcome.
    pub fn fetch_async<C>(&self, locator: &str, on_complete: C) -> Result<(), PoolError>
    where
        C: FnOnce(FetchOutcome) + Send + 'static,
    {
        let client = Arc::clone(&self.client);
        let locator = locator.to_string();
        self.pool.submit_then(
            move || retrieve(client.as_ref(), &locator),
            move |result| {
                let outcome = result.unwrap_or_else(|panic| FetchOutcome::internal_fault(&panic));
                on_complete(outcome);
            },
        )
    }

    /// Queue a retrieval and return a handle to wait on.
    pub fn fetch_with_handle(&self, locator: &str) -> Result<TaskHandle<FetchOutcome>, PoolError> {
        let client = Arc::clone(&self.client);
        let locator = locator.to_string();
        self.pool
            .submit_with_handle(move || retrieve(client.as_ref(), &locator))
    }

    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}
