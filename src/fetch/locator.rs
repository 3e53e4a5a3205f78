//! Source locator parsing.
//!
//! A locator is split on the first `://` into scheme and the rest. The host
//! ends at the first `/`, `?` or `#`; whatever follows is the path. A missing
//! path becomes `/`, placed ahead of any query or fragment.

use super::FetchError;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub scheme: String,
    pub host: String,
    pub path: String,
}

impl Locator {
    pub fn parse(raw: &str) -> Result<Self, FetchError> {
        let (scheme, rest) = raw
            .split_once("://")
            .ok_or_else(|| FetchError::InvalidLocator(raw.to_string()))?;

        let (host, path) = match rest.find(['/', '?', '#']) {
            Some(idx) if rest[idx..].starts_with('/') => (&rest[..idx], rest[idx..].to_string()),
            Some(idx) => (&rest[..idx], format!("/{}", &rest[idx..])),
            None => (rest, "/".to_string()),
        };

        Ok(Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            path,
        })
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.host, self.path)
    }
}
