//! HTTP client abstraction for testability.

use super::FetchError;
use std::time::Duration;

/// Status and body of a completed GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Empty unless `status == 200`.
    pub body: Vec<u8>,
}

/// Transport seam for the fetch stage.
///
/// Implementations follow redirects and enforce their own timeouts. A
/// response with any status code is `Ok`; only transport failures are `Err`.
pub trait HttpClient: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;
}

/// Timeouts and redirect policy for [`ReqwestClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSettings {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub max_redirects: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            max_redirects: 10,
        }
    }
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Build a client. Must be called outside of an async runtime.
    pub fn new(settings: ClientSettings) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.read_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
            .user_agent(concat!("imgboost/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Connection(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            // Body of a non-200 response is never used; skip reading it.
            return Ok(HttpResponse {
                status,
                body: Vec::new(),
            });
        }

        let body = response
            .bytes()
            .map_err(|e| FetchError::Connection(format!("failed to read body: {e}")))?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}
