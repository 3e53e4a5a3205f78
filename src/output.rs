//! Human-readable text output.
//!
//! Every block of text is built by a pure `format_*` function returning one
//! `String` per line, so tests can assert on exact lines. The `print_*`
//! wrappers just write them to stdout.
//!
//! # Output Format
//!
//! ## Startup
//!
//! ```text
//! imgboost 0.3.0
//!     Listening: http://0.0.0.0:8080
//!     Fetch workers: 4
//!     Transform workers: 8
//!     Default quality: 80
//! ```
//!
//! ## Convert
//!
//! ```text
//! https://example.com/cat.jpg → cat.webp
//!     Size: 18.2 KB
//! ```

use crate::config::ServiceConfig;
use crate::scheduler::TransformOutcome;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn format_size(bytes: usize) -> String {
    match bytes {
        0..1024 => format!("{bytes} B"),
        1024..1_048_576 => format!("{:.1} KB", bytes as f64 / 1024.0),
        _ => format!("{:.1} MB", bytes as f64 / 1_048_576.0),
    }
}

// ============================================================================
// Service
// ============================================================================

/// Usage description served at `GET /info`.
pub fn format_usage(config: &ServiceConfig) -> Vec<String> {
    let max = config.images.max_dimension;
    vec![
        format!("imgboost {}", env!("CARGO_PKG_VERSION")),
        "On-demand image resizing and WebP conversion.".to_string(),
        String::new(),
        "Usage:".to_string(),
        format!("{}GET /?src=<base64 url>&width=<w>&height=<h>&quality=<q>", indent(1)),
        String::new(),
        "Parameters:".to_string(),
        format!("{}src       Base64-encoded source image URL (required)", indent(1)),
        format!("{}width     Output width, 0-{max} (0 = derive from height or source)", indent(1)),
        format!("{}height    Output height, 0-{max} (0 = derive from width or source)", indent(1)),
        format!(
            "{}quality   WebP quality, 0-100 (default {})",
            indent(1),
            config.images.default_quality
        ),
        String::new(),
        "Supported sources: JPEG, PNG, WebP. Output is always WebP.".to_string(),
        String::new(),
        "Other endpoints:".to_string(),
        format!("{}GET /health  Liveness probe", indent(1)),
        format!("{}GET /info    This text", indent(1)),
    ]
}

pub fn format_startup(config: &ServiceConfig, fetch_threads: usize, transform_threads: usize) -> Vec<String> {
    vec![
        format!("imgboost {}", env!("CARGO_PKG_VERSION")),
        format!("{}Listening: http://{}", indent(1), config.bind_address()),
        format!("{}Fetch workers: {fetch_threads}", indent(1)),
        format!("{}Transform workers: {transform_threads}", indent(1)),
        format!("{}Default quality: {}", indent(1), config.images.default_quality),
    ]
}

pub fn print_startup(config: &ServiceConfig, fetch_threads: usize, transform_threads: usize) {
    for line in format_startup(config, fetch_threads, transform_threads) {
        println!("{}", line);
    }
}

// ============================================================================
// Convert
// ============================================================================

/// Summary of a one-shot `convert` run.
pub fn format_convert_result(source: &str, destination: &Path, outcome: &TransformOutcome) -> Vec<String> {
    if outcome.succeeded {
        vec![
            format!("{source} → {}", destination.display()),
            format!("{}Size: {}", indent(1), format_size(outcome.output_bytes.len())),
        ]
    } else {
        vec![
            format!("{source} → failed"),
            format!("{}Status: {}", indent(1), outcome.http_status),
            format!("{}Error: {}", indent(1), outcome.error_message),
        ]
    }
}

pub fn print_convert_result(source: &str, destination: &Path, outcome: &TransformOutcome) {
    for line in format_convert_result(source, destination, outcome) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
