//! # imgboost
//!
//! An HTTP service that fetches a remote image, resizes it, and returns it as
//! WebP. The caller passes the source URL base64-encoded in `src`, plus
//! optional `width`, `height` and `quality`.
//!
//! # Architecture: Two Pools, One Chain
//!
//! Every request moves through two stages, each on its own fixed-size worker
//! pool:
//!
//! ```text
//! HTTP handler ──▶ fetch pool ──▶ transform pool ──▶ HTTP response
//!                  (download)     (sniff → decode → resize → encode)
//! ```
//!
//! Downloading waits on the network, transforming burns CPU. Separate pools
//! mean a burst of slow upstream servers cannot starve image processing, and
//! a burst of huge images cannot stall downloads. Stages are chained through
//! completion callbacks: when a fetch finishes, its callback enqueues the
//! transform; when the transform finishes, its callback resolves the waiting
//! HTTP request. No worker ever blocks on another pool.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pool`] | Named fixed-size worker pools with panic capture and drain-on-shutdown |
//! | [`fetch`] | Locator parsing, the `HttpClient` seam, and the pooled [`fetch::Downloader`] |
//! | [`imaging`] | Format sniffing, size resolution, bilinear resampling, codec backend |
//! | [`scheduler`] | Chains fetch → transform and reports one [`scheduler::TransformOutcome`] per request |
//! | [`server`] | axum routes, parameter validation, outcome → HTTP response |
//! | [`config`] | TOML service configuration: loading, merging, validation |
//! | [`output`] | Usage text, startup banner, and CLI result formatting |
//!
//! # Failure Model
//!
//! Nothing that goes wrong inside a request escapes its request. Each stage
//! converts failures to an outcome value at its task boundary, and a panic
//! inside a task is caught by the pool and reported as a 500. Status codes:
//!
//! | Failure | Status |
//! |---------|--------|
//! | Bad parameters | 400 |
//! | Upstream unreachable or malformed URL | 502 |
//! | Upstream non-200 | upstream status |
//! | Unknown format, decode or encode failure, task panic | 500 |

pub mod config;
pub mod fetch;
pub mod imaging;
pub mod output;
pub mod pool;
pub mod scheduler;
pub mod server;
