//! Service configuration.
//!
//! Loaded from an optional TOML file merged over stock defaults. Every key is
//! optional; unknown keys are rejected.
//!
//! ## Configuration Options
//!
//! ```toml
//! log_level = "info"          # tracing filter when RUST_LOG is unset
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8080                 # the PORT environment variable overrides this
//!
//! [pools]
//! fetch_threads = 4           # network-bound download workers
//! # transform_threads = 8     # CPU-bound workers; omit for one per core
//!
//! [fetch]
//! connect_timeout_secs = 10
//! read_timeout_secs = 30
//! max_redirects = 10
//!
//! [images]
//! default_quality = 80        # WebP quality when the request has none
//! max_dimension = 8192        # largest accepted width/height parameter
//! ```
//!
//! Precedence, highest first: CLI flags, `PORT`, the config file, stock
//! defaults. CLI overrides are applied by the binary after [`load_config`].

use crate::fetch::ClientSettings;
use crate::pool::resolve_worker_count;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Default `tracing` filter directive.
    pub log_level: String,
    pub server: ServerConfig,
    pub pools: PoolsConfig,
    pub fetch: FetchConfig,
    pub images: ImagesConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerConfig::default(),
            pools: PoolsConfig::default(),
            fetch: FetchConfig::default(),
            images: ImagesConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Validation("server.host must not be empty".into()));
        }
        if self.pools.fetch_threads == 0 {
            return Err(ConfigError::Validation(
                "pools.fetch_threads must be at least 1".into(),
            ));
        }
        if self.pools.transform_threads == Some(0) {
            return Err(ConfigError::Validation(
                "pools.transform_threads must be at least 1 (omit it for one per core)".into(),
            ));
        }
        if self.fetch.connect_timeout_secs == 0 || self.fetch.read_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "fetch timeouts must be non-zero".into(),
            ));
        }
        if self.images.default_quality > 100 {
            return Err(ConfigError::Validation(
                "images.default_quality must be 0-100".into(),
            ));
        }
        if self.images.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "images.max_dimension must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Apply the `PORT` environment variable, if set.
    ///
    /// An empty value is ignored; anything else must parse as a port number.
    pub fn apply_port_env(&mut self, value: Option<&str>) -> Result<(), ConfigError> {
        match value.map(str::trim) {
            None | Some("") => Ok(()),
            Some(raw) => {
                self.server.port = raw
                    .parse()
                    .map_err(|_| ConfigError::Validation(format!("PORT is not a valid port: {raw}")))?;
                Ok(())
            }
        }
    }

    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Worker pool sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolsConfig {
    /// Download workers. Fetching is network-bound, so this is independent
    /// of the core count.
    pub fetch_threads: usize,
    /// Transform workers. When absent, one per CPU core.
    pub transform_threads: Option<usize>,
}

impl Default for PoolsConfig {
    fn default() -> Self {
        Self {
            fetch_threads: 4,
            transform_threads: None,
        }
    }
}

/// Resolve the effective transform thread count.
///
/// - `None` → all available cores
/// - `Some(n)` → `n`
pub fn effective_transform_threads(config: &PoolsConfig) -> usize {
    resolve_worker_count(config.transform_threads.unwrap_or(0))
}

/// Outbound HTTP settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    pub connect_timeout_secs: u64,
    /// Applies to the whole response, body included.
    pub read_timeout_secs: u64,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            read_timeout_secs: 30,
            max_redirects: 10,
        }
    }
}

impl FetchConfig {
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
            max_redirects: self.max_redirects,
        }
    }
}

/// Request defaults and limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// WebP quality used when a request has no `quality` parameter.
    pub default_quality: u32,
    /// Upper bound for the `width` and `height` parameters.
    pub max_dimension: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            default_quality: 80,
            max_dimension: 8192,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ServiceConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load the config file, or stock defaults when `path` is `None`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            let overlay: toml::Value = toml::from_str(&content)?;
            merge_toml(base, overlay)
        }
        None => base,
    };
    let config: ServiceConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imgboost configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.
#
# Load with: imgboost serve --config imgboost.toml

# Log filter used when RUST_LOG is not set (trace, debug, info, warn, error).
log_level = "info"

# ---------------------------------------------------------------------------
# HTTP listener
# ---------------------------------------------------------------------------
[server]
host = "0.0.0.0"
# The PORT environment variable overrides this; --port overrides both.
port = 8080

# ---------------------------------------------------------------------------
# Worker pools
# ---------------------------------------------------------------------------
[pools]
# Download workers. Downloads wait on the network, so a handful suffices.
fetch_threads = 4
# Decode/resize/encode workers. Omit for one per CPU core.
# transform_threads = 8

# ---------------------------------------------------------------------------
# Outbound fetch
# ---------------------------------------------------------------------------
[fetch]
connect_timeout_secs = 10
# Upper bound for the whole download, body included.
read_timeout_secs = 30
max_redirects = 10

# ---------------------------------------------------------------------------
# Image requests
# ---------------------------------------------------------------------------
[images]
# WebP quality (0-100) when a request does not pass `quality`.
default_quality = 80
# Largest accepted `width` / `height` parameter.
max_dimension = 8192
"##
}
