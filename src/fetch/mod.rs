//! Fetch stage: retrieve source image bytes off the request path.
//!
//! The stage owns its own [`WorkerPool`](crate::pool::WorkerPool), sized for
//! I/O-bound work independently of the transform pool, so a burst of slow
//! downloads never starves image processing and vice versa.
//!
//! - [`Locator`]: `scheme://host/path` parsing
//! - [`HttpClient`]: transport seam; [`ReqwestClient`] is the production client
//! - [`Downloader`]: runs retrievals on the pool and reports a [`FetchOutcome`]
//!
//! Retrieval is a single GET. There are no retries: one failed fetch is
//! terminal for that request.

mod client;
mod downloader;
mod locator;

pub use client::{ClientSettings, HttpClient, HttpResponse, ReqwestClient};
pub use downloader::{Downloader, retrieve};
pub use locator::Locator;

#[cfg(test)]
pub(crate) use client::tests::MockHttpClient;

use crate::pool::TaskPanic;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Invalid URL format")]
    InvalidLocator(String),
    #[error("Failed to connect or download: {0}")]
    Connection(String),
    #[error("HTTP status: {0}")]
    HttpStatus(u16),
    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    /// Upstream status carried by this error, `0` when no response was received.
    pub fn http_status(&self) -> u16 {
        match self {
            FetchError::HttpStatus(code) => *code,
            _ => 0,
        }
    }
}

/// Result of one retrieval.
///
/// `succeeded` implies `http_status == 200`. An empty payload on success is
/// left for the decoder to reject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub succeeded: bool,
    pub http_status: u16,
    pub payload: Vec<u8>,
    pub error_message: String,
}

impl FetchOutcome {
    pub fn success(payload: Vec<u8>) -> Self {
        Self {
            succeeded: true,
            http_status: 200,
            payload,
            error_message: String::new(),
        }
    }

    pub fn failure(error: &FetchError) -> Self {
        Self {
            succeeded: false,
            http_status: error.http_status(),
            payload: Vec::new(),
            error_message: error.to_string(),
        }
    }

    pub fn internal_fault(panic: &TaskPanic) -> Self {
        Self {
            succeeded: false,
            http_status: 0,
            payload: Vec::new(),
            error_message: format!("Internal fault: {}", panic.message),
        }
    }
}
