//! HTTP front end.
//!
//! | Route | Response |
//! |---|---|
//! | `GET /?src=<base64 url>&width=&height=&quality=` | WebP image, or status + plain-text error |
//! | `GET /health` | `OK` |
//! | `GET /info` | usage text |
//!
//! Parameters are validated here, before any pool work. A valid request is
//! handed to the [`TaskScheduler`]; its completion callback resolves a
//! `tokio::sync::oneshot` the handler awaits, so the runtime never blocks on
//! a pool.

use crate::config::{ImagesConfig, ServiceConfig};
use crate::imaging::{Quality, TransformOptions};
use crate::output;
use crate::scheduler::{TaskScheduler, TransformOutcome};
use axum::extract::Query;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Router};
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub const CACHE_CONTROL: &str = "public, max-age=31536000";

/// Standard alphabet; trailing `=` padding optional.
const SOURCE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Missing 'src' parameter")]
    MissingSource,
    #[error("Invalid base64 encoded URL")]
    InvalidEncoding,
    #[error("Invalid '{name}' parameter: {value}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("'{name}' must be between 0 and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: i64,
        max: u32,
    },
}

/// Raw query parameters. Everything stays a string so malformed numbers
/// produce our own 400 message instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ImageParams {
    pub src: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub quality: Option<String>,
}

/// A validated image request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub locator: String,
    pub options: TransformOptions,
}

impl ImageRequest {
    pub fn from_params(params: &ImageParams, limits: &ImagesConfig) -> Result<Self, RequestError> {
        // No trimming: trailing spaces are form-decoded `+` characters.
        let src = params
            .src
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(RequestError::MissingSource)?;
        let locator = decode_source(src)?;

        let width = parse_bounded("width", params.width.as_deref(), 0, limits.max_dimension)?;
        let height = parse_bounded("height", params.height.as_deref(), 0, limits.max_dimension)?;
        let quality = parse_bounded(
            "quality",
            params.quality.as_deref(),
            limits.default_quality,
            Quality::MAX as u32,
        )?;

        Ok(Self {
            locator,
            options: TransformOptions::new(width, height, Quality::new(quality)),
        })
    }
}

/// Base64-decode the `src` parameter into a UTF-8 locator.
///
/// Form decoding turns an unescaped `+` into a space; spaces are mapped back
/// before decoding.
pub fn decode_source(src: &str) -> Result<String, RequestError> {
    let normalized = src.replace(' ', "+");
    let bytes = SOURCE_ENGINE
        .decode(normalized.as_bytes())
        .map_err(|_| RequestError::InvalidEncoding)?;
    String::from_utf8(bytes).map_err(|_| RequestError::InvalidEncoding)
}

/// Parse an optional integer parameter in `0..=max`; absent or empty means `default`.
fn parse_bounded(
    name: &'static str,
    raw: Option<&str>,
    default: u32,
    max: u32,
) -> Result<u32, RequestError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(default),
        Some(raw) => raw,
    };
    let value: i64 = raw.parse().map_err(|_| RequestError::InvalidNumber {
        name,
        value: raw.to_string(),
    })?;
    if value < 0 || value > max as i64 {
        return Err(RequestError::OutOfRange { name, value, max });
    }
    Ok(value as u32)
}

// =============================================================================
// Handlers
// =============================================================================

pub async fn handle_image(
    Query(params): Query<ImageParams>,
    Extension(scheduler): Extension<Arc<TaskScheduler>>,
    Extension(config): Extension<Arc<ServiceConfig>>,
) -> Response {
    let request = match ImageRequest::from_params(&params, &config.images) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("rejecting request: {e}");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    tracing::info!(
        locator = %request.locator,
        width = request.options.width,
        height = request.options.height,
        quality = request.options.quality.value(),
        "processing request"
    );

    let (sender, receiver) = oneshot::channel();
    let submitted = scheduler.submit(&request.locator, request.options, move |outcome| {
        // The client may have gone away; nobody is waiting then.
        let _ = sender.send(outcome);
    });
    if let Err(e) = submitted {
        tracing::warn!("scheduler rejected request: {e}");
        return (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response();
    }

    let outcome = receiver.await.unwrap_or_else(|_| {
        TransformOutcome::failure(500, "Internal fault: request dropped before completion")
    });
    outcome_response(outcome)
}

/// Turn a finished request into the HTTP response.
pub fn outcome_response(outcome: TransformOutcome) -> Response {
    if outcome.succeeded {
        tracing::info!(bytes = outcome.output_bytes.len(), "request completed");
        return (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "image/webp"),
                (header::CACHE_CONTROL, CACHE_CONTROL),
            ],
            outcome.output_bytes,
        )
            .into_response();
    }

    tracing::warn!(status = outcome.http_status, "{}", outcome.error_message);
    let status = StatusCode::from_u16(outcome.http_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, outcome.error_message).into_response()
}

pub async fn handle_health() -> &'static str {
    "OK"
}

pub async fn handle_info(Extension(config): Extension<Arc<ServiceConfig>>) -> String {
    let mut text = output::format_usage(&config).join("\n");
    text.push('\n');
    text
}

// =============================================================================
// Router and serve loop
// =============================================================================

pub fn router(scheduler: Arc<TaskScheduler>, config: Arc<ServiceConfig>) -> Router {
    Router::new()
        .route("/", get(handle_image))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(Extension(scheduler))
        .layer(Extension(config))
}

/// Serve until Ctrl-C.
pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown requested"),
        Err(e) => tracing::error!("failed to listen for shutdown signal: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MockHttpClient;
    use crate::imaging::MockBackend;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use base64::engine::general_purpose::STANDARD;
    use tower::ServiceExt;

    const JPEG_HEADER: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F', 0, 1];

    fn params(src: Option<&str>, width: Option<&str>, height: Option<&str>, quality: Option<&str>) -> ImageParams {
        ImageParams {
            src: src.map(String::from),
            width: width.map(String::from),
            height: height.map(String::from),
            quality: quality.map(String::from),
        }
    }

    fn encoded(url: &str) -> String {
        STANDARD.encode(url)
    }

    fn app(client: MockHttpClient, backend: MockBackend) -> Router {
        let scheduler = TaskScheduler::new(Arc::new(client), Arc::new(backend), 1, 1).unwrap();
        router(Arc::new(scheduler), Arc::new(ServiceConfig::default()))
    }

    async fn call(app: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    // =========================================================================
    // Parameter parsing
    // =========================================================================

    #[test]
    fn request_defaults() {
        let src = encoded("http://example.com/a.jpg");
        let request = ImageRequest::from_params(&params(Some(&src), None, Some(""), None), &ImagesConfig::default())
            .unwrap();
        assert_eq!(request.locator, "http://example.com/a.jpg");
        assert_eq!(request.options, TransformOptions::new(0, 0, Quality::new(80)));
    }

    #[test]
    fn request_uses_configured_default_quality() {
        let limits = ImagesConfig {
            default_quality: 55,
            max_dimension: 8192,
        };
        let src = encoded("http://example.com/a.jpg");
        let request = ImageRequest::from_params(&params(Some(&src), Some("640"), None, None), &limits).unwrap();
        assert_eq!(request.options, TransformOptions::new(640, 0, Quality::new(55)));
    }

    #[test]
    fn missing_or_blank_src_is_rejected() {
        let limits = ImagesConfig::default();
        assert_eq!(
            ImageRequest::from_params(&params(None, None, None, None), &limits),
            Err(RequestError::MissingSource)
        );
        assert_eq!(
            ImageRequest::from_params(&params(Some("  "), None, None, None), &limits),
            Err(RequestError::MissingSource)
        );
    }

    #[test]
    fn bad_base64_is_rejected() {
        assert_eq!(decode_source("%%%not-base64"), Err(RequestError::InvalidEncoding));
    }

    #[test]
    fn non_utf8_locator_is_rejected() {
        let src = STANDARD.encode([0xFF, 0xFE, 0xFD]);
        assert_eq!(decode_source(&src), Err(RequestError::InvalidEncoding));
    }

    #[test]
    fn unpadded_base64_is_accepted() {
        let padded = encoded("http://a/b");
        let unpadded = padded.trim_end_matches('=');
        assert_ne!(padded, unpadded);
        assert_eq!(decode_source(unpadded).unwrap(), "http://a/b");
    }

    #[test]
    fn plus_turned_space_is_restored() {
        // "?>>" encodes to "Pz4+", which a form decoder turns into "Pz4 ".
        assert_eq!(STANDARD.encode("?>>"), "Pz4+");
        assert_eq!(decode_source("Pz4 ").unwrap(), "?>>");
    }

    #[test]
    fn trailing_plus_survives_form_decoding() {
        // "http://a/bc~" encodes to "aHR0cDovL2EvYmN+"; the query extractor
        // hands it over as "aHR0cDovL2EvYmN ".
        assert_eq!(encoded("http://a/bc~"), "aHR0cDovL2EvYmN+");
        let request = ImageRequest::from_params(
            &params(Some("aHR0cDovL2EvYmN "), None, None, None),
            &ImagesConfig::default(),
        )
        .unwrap();
        assert_eq!(request.locator, "http://a/bc~");
    }

    #[tokio::test]
    async fn unescaped_trailing_plus_reaches_the_fetcher() {
        let client = Arc::new(MockHttpClient::ok(JPEG_HEADER.to_vec()));
        let scheduler = TaskScheduler::new(client.clone(), Arc::new(MockBackend::decoding_to(2, 2)), 1, 1).unwrap();
        let app = router(Arc::new(scheduler), Arc::new(ServiceConfig::default()));

        let (status, _, _) = call(app, "/?src=aHR0cDovL2EvYmN+").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(client.requested_urls(), vec!["http://a/bc~".to_string()]);
    }

    #[test]
    fn non_numeric_dimension_is_rejected() {
        let src = encoded("http://a/b");
        let err = ImageRequest::from_params(&params(Some(&src), Some("wide"), None, None), &ImagesConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            RequestError::InvalidNumber {
                name: "width",
                value: "wide".into()
            }
        );
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let src = encoded("http://a/b");
        let limits = ImagesConfig::default();

        let err = ImageRequest::from_params(&params(Some(&src), None, Some("8193"), None), &limits).unwrap_err();
        assert_eq!(err.to_string(), "'height' must be between 0 and 8192, got 8193");

        let err = ImageRequest::from_params(&params(Some(&src), Some("-1"), None, None), &limits).unwrap_err();
        assert!(matches!(err, RequestError::OutOfRange { name: "width", .. }));

        let err = ImageRequest::from_params(&params(Some(&src), None, None, Some("101")), &limits).unwrap_err();
        assert!(matches!(err, RequestError::OutOfRange { name: "quality", .. }));
    }

    #[test]
    fn boundary_values_are_accepted() {
        let src = encoded("http://a/b");
        let request = ImageRequest::from_params(
            &params(Some(&src), Some("8192"), Some("0"), Some("100")),
            &ImagesConfig::default(),
        )
        .unwrap();
        assert_eq!(request.options, TransformOptions::new(8192, 0, Quality::new(100)));
    }

    // =========================================================================
    // Responses
    // =========================================================================

    #[test]
    fn failure_outcome_maps_status_and_body() {
        let response = outcome_response(TransformOutcome::failure(404, "Download failed: HTTP status: 404"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(header::CACHE_CONTROL).is_none());
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (status, _, body) = call(app(MockHttpClient::status(500), MockBackend::new()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");
    }

    #[tokio::test]
    async fn info_endpoint_describes_usage() {
        let (status, _, body) = call(app(MockHttpClient::status(500), MockBackend::new()), "/info").await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("GET /?src=<base64 url>"));
    }

    #[tokio::test]
    async fn missing_src_is_400() {
        let (status, _, body) = call(app(MockHttpClient::status(500), MockBackend::new()), "/").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, b"Missing 'src' parameter");
    }

    #[tokio::test]
    async fn invalid_params_never_reach_the_fetcher() {
        let client = Arc::new(MockHttpClient::ok(JPEG_HEADER.to_vec()));
        let scheduler = TaskScheduler::new(client.clone(), Arc::new(MockBackend::new()), 1, 1).unwrap();
        let app = router(Arc::new(scheduler), Arc::new(ServiceConfig::default()));

        let uri = format!("/?src={}&width=abc", encoded("http://a/b.jpg"));
        let (status, _, _) = call(app, &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(client.requested_urls().is_empty());
    }

    #[tokio::test]
    async fn successful_request_returns_webp_with_cache_header() {
        let app = app(MockHttpClient::ok(JPEG_HEADER.to_vec()), MockBackend::decoding_to(4, 4));
        let uri = format!("/?src={}&width=8", encoded("http://a/b.jpg"));

        let (status, headers, body) = call(app, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "image/webp");
        assert_eq!(headers[header::CACHE_CONTROL], CACHE_CONTROL);
        assert_eq!(body, b"RIFF\0\0\0\0WEBPmock");
    }

    #[tokio::test]
    async fn upstream_status_is_passed_through() {
        let app = app(MockHttpClient::status(404), MockBackend::decoding_to(4, 4));
        let uri = format!("/?src={}", encoded("http://a/missing.jpg"));

        let (status, headers, body) = call(app, &uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(headers.get(header::CACHE_CONTROL).is_none());
        assert_eq!(body, b"Download failed: HTTP status: 404");
    }

    #[tokio::test]
    async fn unreachable_upstream_is_502() {
        let app = app(MockHttpClient::failing("connection refused"), MockBackend::new());
        let uri = format!("/?src={}", encoded("http://a/b.jpg"));

        let (status, _, body) = call(app, &uri).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(String::from_utf8(body).unwrap().starts_with("Download failed: "));
    }

    #[tokio::test]
    async fn undecodable_payload_is_500() {
        let app = app(MockHttpClient::ok(b"plain text".to_vec()), MockBackend::new());
        let uri = format!("/?src={}", encoded("http://a/b.jpg"));

        let (status, _, body) = call(app, &uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, b"Processing failed: Unknown image format");
    }
}
